//! Effective ownership and permission evaluation.

use claims_core::{ChunkPos, DimensionId, Owner, Permission, PlayerId};
use claims_party::PartyRegistry;
use claims_store::ClaimView;
use tracing::trace;

use crate::config::ProtectionConfig;

/// Answers "who owns this cell" and "may this actor do that here".
///
/// Borrowed for the duration of one decision (or one batch). `V` is either
/// the live store or a snapshot of it.
#[derive(Debug)]
pub struct ClaimResolver<'a, V: ClaimView> {
    claims: &'a V,
    parties: &'a PartyRegistry,
    config: &'a ProtectionConfig,
}

impl<'a, V: ClaimView> ClaimResolver<'a, V> {
    #[must_use]
    pub const fn new(claims: &'a V, parties: &'a PartyRegistry, config: &'a ProtectionConfig) -> Self {
        Self {
            claims,
            parties,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &'a ProtectionConfig {
        self.config
    }

    #[must_use]
    pub const fn parties(&self) -> &'a PartyRegistry {
        self.parties
    }

    /// Owner of `pos`, or `None` when unclaimed.
    ///
    /// Claims held by a party that no longer exists resolve to `None`.
    #[must_use]
    pub fn effective_owner(&self, dimension: &DimensionId, pos: ChunkPos) -> Option<Owner> {
        match self.claims.owner_at(dimension, pos)? {
            Owner::Party(party) if !self.parties.contains(party) => {
                trace!(%dimension, %pos, %party, "claim of missing party treated as unclaimed");
                None
            }
            owner => Some(owner),
        }
    }

    /// Whether `actor` may perform `permission` at `pos`.
    ///
    /// `None` as actor means the action has no responsible player and is
    /// judged by the owner's environment toggles.
    #[must_use]
    pub fn has_permission(
        &self,
        actor: Option<PlayerId>,
        dimension: &DimensionId,
        pos: ChunkPos,
        permission: Permission,
    ) -> bool {
        let Some(owner) = self.effective_owner(dimension, pos) else {
            return !self.config.claims_only.allows(permission);
        };
        match actor {
            Some(player) => self.player_allowed(player, owner, permission),
            None => self.environment_allowed(owner, permission),
        }
    }

    /// Whether an action originating at `source` may affect `target`.
    ///
    /// Used for block-driven actions (fluids, pistons, dispensers, machines).
    /// Same-owner movement is always allowed; otherwise the target owner's
    /// environment toggles decide. A `None` source is treated as unclaimed.
    #[must_use]
    pub fn can_affect(
        &self,
        dimension: &DimensionId,
        source: Option<ChunkPos>,
        target: ChunkPos,
        permission: Permission,
    ) -> bool {
        let Some(target_owner) = self.effective_owner(dimension, target) else {
            return !self.config.claims_only.allows(permission);
        };
        let source_owner = source.and_then(|pos| self.effective_owner(dimension, pos));
        if source_owner == Some(target_owner) {
            return true;
        }
        self.environment_allowed(target_owner, permission)
    }

    fn player_allowed(&self, player: PlayerId, owner: Owner, permission: Permission) -> bool {
        match owner {
            Owner::Player(id) if id == player => return true,
            Owner::Party(party) => {
                let required = self.config.min_ranks.get(permission);
                if self
                    .parties
                    .rank_in(party, player)
                    .is_some_and(|rank| rank >= required)
                {
                    return true;
                }
            }
            Owner::Player(_) => {}
        }

        self.claims
            .with_permissions(owner, |toggles| {
                toggles.public.allows(permission)
                    || toggles.friend(player).allows(permission)
                    || (toggles.party.allows(permission) && self.shares_party(owner, player))
            })
            .unwrap_or(false)
    }

    fn environment_allowed(&self, owner: Owner, permission: Permission) -> bool {
        self.claims
            .with_permissions(owner, |toggles| toggles.environment.allows(permission))
            .unwrap_or(false)
    }

    /// Whether `player` is in the same party as a player owner.
    fn shares_party(&self, owner: Owner, player: PlayerId) -> bool {
        owner
            .player()
            .and_then(|id| self.parties.party_of(id))
            .is_some_and(|party| party.is_member(player))
    }
}
