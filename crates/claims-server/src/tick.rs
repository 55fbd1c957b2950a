//! Per-tick maintenance.
//!
//! ```text
//! tick 1      : startup self-check (once)
//! every tick  : cache eviction by age
//! every N     : expiry sweep of inactive owners
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use claims_core::{Owner, TickId};
use tracing::{debug, error, info, warn};

use crate::data::ServerData;
use crate::error::{TickError, TickResult};
use crate::gateway::ServerHandle;

/// Receives tick faults. Faults never stop later ticks.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, handle: ServerHandle, error: &TickError);
}

/// Logs faults with `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, handle: ServerHandle, error: &TickError) {
        error!(server = handle.0, %error, "claims tick fault");
    }
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub tick: TickId,
    /// Cache entries evicted by age.
    pub evicted: usize,
    /// Claims removed by the expiry sweep.
    pub expired: usize,
    /// Claims removed by the startup self-check.
    pub repaired: usize,
}

/// Tick counter plus once-only and periodic maintenance state.
#[derive(Debug, Default)]
pub struct TickHandler {
    tick: AtomicU64,
    self_checked: AtomicBool,
    last_expiry: AtomicU64,
}

impl TickHandler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn current(&self) -> TickId {
        self.tick.load(Ordering::Acquire)
    }

    /// Advance one tick and run maintenance for `data`.
    pub fn on_tick(&self, data: &ServerData) -> TickResult<TickReport> {
        let tick = self.tick.fetch_add(1, Ordering::AcqRel) + 1;
        let mut report = TickReport {
            tick,
            ..TickReport::default()
        };

        if !self.self_checked.swap(true, Ordering::AcqRel) {
            report.repaired = self_check(data)?;
        }

        report.evicted = data.store().cache().evict(tick);

        let interval = data.config().maintenance.expiry_check_interval;
        let last = self.last_expiry.load(Ordering::Acquire);
        if tick.saturating_sub(last) >= interval {
            self.last_expiry.store(tick, Ordering::Release);
            report.expired = expire(data, tick);
        }

        if report.evicted > 0 || report.expired > 0 {
            debug!(tick, evicted = report.evicted, expired = report.expired, "tick maintenance");
        }
        Ok(report)
    }
}

/// Drop claims whose party is gone, then surface a recorded startup failure.
fn self_check(data: &ServerData) -> TickResult<usize> {
    let parties = data.parties();
    let dangling: Vec<Owner> = data
        .store()
        .claim_owners()
        .into_iter()
        .filter(|owner| owner.party().is_some_and(|party| !parties.contains(party)))
        .collect();

    let mut repaired = 0;
    for owner in dangling {
        let removed = data.store().remove_all_of(owner);
        data.store().forget_owner(owner);
        warn!(%owner, claims = removed.len(), "removed claims of missing party");
        repaired += removed.len();
    }

    info!(
        parties = parties.len(),
        owners = data.store().claim_owners().len(),
        repaired,
        "claims self-check complete"
    );
    drop(parties);

    match data.startup_failure() {
        Some(message) => Err(TickError::StartupFailed(message)),
        None => Ok(repaired),
    }
}

fn expire(data: &ServerData, now: TickId) -> usize {
    let Some(expiration) = data.config().claims.expiration_ticks else {
        return 0;
    };
    let exempt = &data.config().claims.expiration_exempt;
    let _parties = data.parties();
    data.store()
        .expire_inactive(now, expiration, |owner| exempt.contains(&owner))
        .len()
}
