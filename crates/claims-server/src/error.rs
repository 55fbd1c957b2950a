//! Server-level error types.

use std::io;
use std::path::PathBuf;

use claims_core::PlayerId;
use claims_party::PartyError;
use claims_store::ClaimError;
use thiserror::Error;

/// Failure to load or validate `ServerConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Recoverable outcome of a player or admin command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error(transparent)]
    Claim(#[from] ClaimError),

    #[error(transparent)]
    Party(#[from] PartyError),

    #[error("claims are disabled on this server")]
    ClaimsDisabled,

    #[error("parties are disabled on this server")]
    PartiesDisabled,

    /// A party-scoped command from a player outside any party.
    #[error("player {0} is not in a party")]
    NoParty(PlayerId),
}

/// Fault raised while running one tick's maintenance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TickError {
    #[error("startup failed: {0}")]
    StartupFailed(String),

    #[error("tick {tick} panicked: {message}")]
    Panicked { tick: u64, message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
pub type CommandResult<T> = Result<T, CommandError>;
pub type TickResult<T> = Result<T, TickError>;
