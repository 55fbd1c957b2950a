//! Claim error types.

use claims_core::{ChunkPos, DimensionId, Owner};
use thiserror::Error;

/// Recoverable outcome of a claim command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    /// The cell is held by a different owner.
    #[error("chunk {pos} is already claimed by {owner}")]
    AlreadyClaimed { pos: ChunkPos, owner: Owner },

    /// The owner would exceed its claim cap.
    #[error("{owner} has reached the claim limit of {limit}")]
    LimitExceeded { owner: Owner, limit: u32 },

    /// Coordinates outside the dimension's addressable range.
    #[error("chunk {pos} is outside the addressable range of {dimension}")]
    InvalidCell { dimension: DimensionId, pos: ChunkPos },

    #[error("chunk {pos} is not claimed")]
    NotClaimed { pos: ChunkPos },

    /// The cell is claimed, but not by the owner the command named.
    #[error("chunk {pos} is not owned by {expected}")]
    NotOwner { pos: ChunkPos, expected: Owner },

    #[error("region of {area} chunks exceeds the maximum of {max}")]
    RegionTooLarge { area: u64, max: u64 },

    /// Restored data references an owner that does not exist.
    #[error("claim owner {0} does not exist")]
    UnknownOwner(Owner),
}

/// Result type for claim operations.
pub type ClaimResult<T> = Result<T, ClaimError>;
