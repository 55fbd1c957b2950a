//! One dimension's partition of the claims store.

use std::collections::BTreeMap;

use claims_core::{ChunkPos, DimensionId, Owner};
use hashbrown::HashMap;

use crate::claim::{Claim, RegionClaim, RegionId};

/// Claims and region records of a single dimension.
///
/// Held behind `Arc` so a snapshot is a pointer copy; writers go through
/// `Arc::make_mut`.
#[derive(Debug, Clone)]
pub struct DimensionClaims {
    dimension: DimensionId,
    claims: HashMap<ChunkPos, Claim>,
    regions: BTreeMap<RegionId, RegionClaim>,
}

impl DimensionClaims {
    #[must_use]
    pub fn new(dimension: DimensionId) -> Self {
        Self {
            dimension,
            claims: HashMap::new(),
            regions: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, pos: ChunkPos) -> Option<&Claim> {
        self.claims.get(&pos)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    pub fn claims(&self) -> impl Iterator<Item = &Claim> {
        self.claims.values()
    }

    pub fn regions(&self) -> impl Iterator<Item = &RegionClaim> {
        self.regions.values()
    }

    pub(crate) fn insert(&mut self, claim: Claim) -> Option<Claim> {
        self.claims.insert(claim.pos, claim)
    }

    pub(crate) fn get_mut(&mut self, pos: ChunkPos) -> Option<&mut Claim> {
        self.claims.get_mut(&pos)
    }

    pub(crate) fn insert_region(&mut self, region: RegionClaim) {
        self.regions.insert(region.id, region);
    }

    /// Remove a claim, releasing its slot in the region record it belongs to.
    pub(crate) fn remove(&mut self, pos: ChunkPos) -> Option<Claim> {
        let claim = self.claims.remove(&pos)?;
        if let Some(id) = claim.region {
            self.release_region_cell(id);
        }
        Some(claim)
    }

    pub(crate) fn release_region_cell(&mut self, id: RegionId) {
        let emptied = match self.regions.get_mut(&id) {
            Some(region) => {
                region.cells = region.cells.saturating_sub(1);
                region.cells == 0
            }
            None => false,
        };
        if emptied {
            self.regions.remove(&id);
        }
    }

    /// Count a restored claim against its region record. Returns false when
    /// the record is missing or does not cover the claim.
    pub(crate) fn adopt_region_cell(&mut self, id: RegionId, owner: Owner, pos: ChunkPos) -> bool {
        match self.regions.get_mut(&id) {
            Some(region) if region.owner == owner && region.contains(pos) => {
                region.cells += 1;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn drop_empty_regions(&mut self) {
        self.regions.retain(|_, region| region.cells > 0);
    }

    pub(crate) fn clear(&mut self) -> Vec<Claim> {
        self.regions.clear();
        self.claims.drain().map(|(_, claim)| claim).collect()
    }
}
