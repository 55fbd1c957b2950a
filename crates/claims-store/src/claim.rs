//! Claim and region claim records.

use claims_core::{ChunkPos, DimensionId, Owner, TickId};
use serde::{Deserialize, Serialize};

/// Identifier of a region claim within the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(pub u64);

/// Per-claim sub-flags.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClaimFlags {
    /// Keep the chunk loaded while the server runs.
    #[serde(default)]
    pub forceload: bool,
    /// Shown to players entering the claim.
    #[serde(default)]
    pub greeting: Option<String>,
}

impl ClaimFlags {
    #[must_use]
    pub fn forceloaded() -> Self {
        Self {
            forceload: true,
            greeting: None,
        }
    }
}

/// Ownership record binding one chunk to a player or party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub owner: Owner,
    pub dimension: DimensionId,
    pub pos: ChunkPos,
    pub created_tick: TickId,
    #[serde(default)]
    pub flags: ClaimFlags,
    /// Region batch this claim was created in, if any.
    #[serde(default)]
    pub region: Option<RegionId>,
}

/// Administrative record for a rectangle of claims created together.
///
/// Aggregates claims; never overrides per-cell ownership. Cells unclaimed
/// one by one leave the record in place until it holds none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionClaim {
    pub id: RegionId,
    pub owner: Owner,
    pub dimension: DimensionId,
    pub min: ChunkPos,
    pub max: ChunkPos,
    pub created_tick: TickId,
    /// Cells of the rectangle still claimed under this record.
    pub cells: u32,
}

impl RegionClaim {
    #[must_use]
    pub fn contains(&self, pos: ChunkPos) -> bool {
        pos.x >= self.min.x && pos.x <= self.max.x && pos.z >= self.min.z && pos.z <= self.max.z
    }
}
