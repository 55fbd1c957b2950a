//! Point-in-time views of the store, for batch queries and persistence.

use std::sync::Arc;

use claims_core::{ChunkPos, DimensionId, Owner, TickId};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::claim::{Claim, RegionClaim};
use crate::dimension::DimensionClaims;
use crate::owner::{ClaimPermissions, OwnerClaimInfo};
use crate::store::OwnerTable;

/// Immutable view of every partition and the owner table, captured at once.
///
/// Later mutations of the store are invisible to a snapshot.
#[derive(Debug, Clone)]
pub struct ClaimsSnapshot {
    dimensions: HashMap<DimensionId, Arc<DimensionClaims>>,
    owners: Arc<OwnerTable>,
}

impl ClaimsSnapshot {
    pub(crate) fn new(
        dimensions: HashMap<DimensionId, Arc<DimensionClaims>>,
        owners: Arc<OwnerTable>,
    ) -> Self {
        Self { dimensions, owners }
    }

    #[must_use]
    pub fn get(&self, dimension: &DimensionId, pos: ChunkPos) -> Option<&Claim> {
        self.dimensions.get(dimension)?.get(pos)
    }

    #[must_use]
    pub fn owner_at(&self, dimension: &DimensionId, pos: ChunkPos) -> Option<Owner> {
        self.get(dimension, pos).map(|claim| claim.owner)
    }

    #[must_use]
    pub fn owner_info(&self, owner: Owner) -> Option<&OwnerClaimInfo> {
        self.owners.get(&owner)
    }

    pub fn claims(&self) -> impl Iterator<Item = &Claim> {
        self.dimensions.values().flat_map(|claims| claims.claims())
    }

    pub fn regions(&self) -> impl Iterator<Item = &RegionClaim> {
        self.dimensions.values().flat_map(|claims| claims.regions())
    }

    /// Serializable copy, sorted for stable output.
    #[must_use]
    pub fn export(&self) -> StoreSnapshot {
        let mut claims: Vec<Claim> = self.claims().cloned().collect();
        claims.sort_by(|a, b| (&a.dimension, a.pos).cmp(&(&b.dimension, b.pos)));

        let mut regions: Vec<RegionClaim> = self.regions().cloned().collect();
        regions.sort_by_key(|region| region.id);

        let mut owners: Vec<OwnerRecord> = self
            .owners
            .iter()
            .map(|(owner, info)| OwnerRecord::from_info(*owner, info))
            .collect();
        owners.sort_by_key(|record| record.owner);

        StoreSnapshot {
            claims,
            regions,
            owners,
        }
    }
}

/// Persisted form of an owner's record. Claim sets are rebuilt from claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRecord {
    pub owner: Owner,
    #[serde(default)]
    pub permissions: ClaimPermissions,
    #[serde(default)]
    pub bonus_limit: u32,
    #[serde(default)]
    pub last_active: TickId,
}

/// Everything a persistence collaborator needs to rebuild the store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub claims: Vec<Claim>,
    #[serde(default)]
    pub regions: Vec<RegionClaim>,
    #[serde(default)]
    pub owners: Vec<OwnerRecord>,
}
