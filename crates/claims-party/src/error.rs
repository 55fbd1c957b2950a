//! Party error types.

use claims_core::{PartyId, PlayerId, Rank};
use thiserror::Error;

/// Recoverable outcome of a party command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartyError {
    #[error("party not found: {0}")]
    PartyNotFound(PartyId),

    #[error("insufficient rank: requires {required:?}, has {actual:?}")]
    InsufficientRank { required: Rank, actual: Rank },

    #[error("player {0} is not a member of this party")]
    NotAMember(PlayerId),

    #[error("player {0} is already in a party")]
    AlreadyInParty(PlayerId),

    #[error("player {0} has no pending invite")]
    NotInvited(PlayerId),

    #[error("party is full ({limit} members)")]
    PartyFull { limit: usize },

    /// Owner is only assigned through ownership transfer; Ally is never stored.
    #[error("rank {0:?} cannot be assigned directly")]
    InvalidRank(Rank),

    #[error("party {0} appears more than once")]
    DuplicateParty(PartyId),

    #[error("party {0} cannot ally itself")]
    SelfAlliance(PartyId),
}

/// Result type for party operations.
pub type PartyResult<T> = Result<T, PartyError>;
