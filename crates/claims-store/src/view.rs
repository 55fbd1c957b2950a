//! Read access shared by the live store and snapshots.

use claims_core::{ChunkPos, DimensionId, Owner};

use crate::owner::ClaimPermissions;
use crate::snapshot::ClaimsSnapshot;
use crate::store::ClaimsStore;

/// Ownership and permission lookups the resolver needs.
pub trait ClaimView {
    /// Raw owner of a cell; `None` when unclaimed.
    fn owner_at(&self, dimension: &DimensionId, pos: ChunkPos) -> Option<Owner>;

    /// Run `f` against the owner's permission toggles, if it has a record.
    fn with_permissions<R>(&self, owner: Owner, f: impl FnOnce(&ClaimPermissions) -> R)
    -> Option<R>;
}

impl ClaimView for ClaimsStore {
    fn owner_at(&self, dimension: &DimensionId, pos: ChunkPos) -> Option<Owner> {
        Self::owner_at(self, dimension, pos)
    }

    fn with_permissions<R>(
        &self,
        owner: Owner,
        f: impl FnOnce(&ClaimPermissions) -> R,
    ) -> Option<R> {
        self.with_owner(owner, |info| f(&info.permissions))
    }
}

impl ClaimView for ClaimsSnapshot {
    fn owner_at(&self, dimension: &DimensionId, pos: ChunkPos) -> Option<Owner> {
        Self::owner_at(self, dimension, pos)
    }

    fn with_permissions<R>(
        &self,
        owner: Owner,
        f: impl FnOnce(&ClaimPermissions) -> R,
    ) -> Option<R> {
        self.owner_info(owner).map(|info| f(&info.permissions))
    }
}
