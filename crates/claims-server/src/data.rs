//! The per-server state bundle.
//!
//! # Locking
//!
//! The party registry lock is always taken before any store lock. Commands
//! that touch both (party claims, dissolution) hold the registry lock for the
//! whole operation, so a party and its claims change together.

use claims_core::{Owner, PlayerId, TickId};
use claims_party::{Party, PartyRegistry};
use claims_protection::ClaimResolver;
use claims_store::{ClaimsSnapshot, ClaimsStore, StoreSnapshot};
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::error::CommandResult;
use crate::tick::TickHandler;

/// Everything persisted for one server.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SavedState {
    pub claims: StoreSnapshot,
    pub parties: Vec<Party>,
}

/// Claims, parties and maintenance state of one server.
#[derive(Debug)]
pub struct ServerData {
    config: ServerConfig,
    store: ClaimsStore,
    parties: RwLock<PartyRegistry>,
    tick_handler: TickHandler,
    startup_failure: Mutex<Option<String>>,
}

impl ServerData {
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let store = ClaimsStore::new(config.store_settings());
        let parties = PartyRegistry::with_max_members(config.parties.max_members);
        Self::from_parts(config, store, parties)
    }

    /// Rebuild a server from persisted state.
    ///
    /// Fails if a player is in two parties, two claims share a cell, or a
    /// claim names a party that is not part of `saved`.
    pub fn restore(config: ServerConfig, saved: SavedState) -> CommandResult<Self> {
        let parties = PartyRegistry::restore(saved.parties, config.parties.max_members)?;
        let store = ClaimsStore::restore(config.store_settings(), saved.claims, |owner| {
            owner.party().is_none_or(|party| parties.contains(party))
        })?;
        info!(
            parties = parties.len(),
            owners = store.claim_owners().len(),
            "server data restored"
        );
        Ok(Self::from_parts(config, store, parties))
    }

    fn from_parts(config: ServerConfig, store: ClaimsStore, parties: PartyRegistry) -> Self {
        Self {
            config,
            store,
            parties: RwLock::new(parties),
            tick_handler: TickHandler::new(),
            startup_failure: Mutex::new(None),
        }
    }

    /// Serializable copy of claims and parties, taken under the registry lock.
    #[must_use]
    pub fn save(&self) -> SavedState {
        let parties = self.parties.read();
        SavedState {
            claims: self.store.export(),
            parties: parties.parties().cloned().collect(),
        }
    }

    // ==================== Accessors ====================

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &ClaimsStore {
        &self.store
    }

    pub fn parties(&self) -> RwLockReadGuard<'_, PartyRegistry> {
        self.parties.read()
    }

    pub(crate) fn parties_lock(&self) -> &RwLock<PartyRegistry> {
        &self.parties
    }

    #[must_use]
    pub fn tick_handler(&self) -> &TickHandler {
        &self.tick_handler
    }

    /// Tick of the most recent `on_tick`.
    #[must_use]
    pub fn current_tick(&self) -> TickId {
        self.tick_handler.current()
    }

    // ==================== Resolution ====================

    /// Run `f` with a resolver over the live store.
    pub fn with_resolver<R>(&self, f: impl FnOnce(&ClaimResolver<'_, ClaimsStore>) -> R) -> R {
        let parties = self.parties.read();
        f(&ClaimResolver::new(&self.store, &parties, &self.config.protection))
    }

    /// Run `f` with a resolver over a snapshot taken now. Parties stay
    /// read-locked for the duration, so the whole batch sees one state.
    pub fn with_snapshot_resolver<R>(
        &self,
        f: impl FnOnce(&ClaimResolver<'_, ClaimsSnapshot>) -> R,
    ) -> R {
        let parties = self.parties.read();
        let snapshot = self.store.snapshot();
        f(&ClaimResolver::new(&snapshot, &parties, &self.config.protection))
    }

    // ==================== Activity ====================

    /// Record that `player` was active, refreshing expiry for the player and
    /// for their party.
    pub fn on_player_activity(&self, player: PlayerId) {
        let tick = self.current_tick();
        let parties = self.parties.read();
        self.store.touch(Owner::Player(player), tick);
        if let Some(party) = parties.party_of(player) {
            self.store.touch(Owner::Party(party.id()), tick);
        }
    }

    // ==================== Startup ====================

    /// Record a failure from startup; surfaced by the first tick.
    pub fn record_startup_failure(&self, message: impl Into<String>) {
        let message = message.into();
        error!(%message, "startup failure recorded");
        *self.startup_failure.lock() = Some(message);
    }

    pub(crate) fn startup_failure(&self) -> Option<String> {
        self.startup_failure.lock().clone()
    }
}
