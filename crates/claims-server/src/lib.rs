//! Claims server - composition root for claims, parties and protection
//!
//! # Architecture
//!
//! ```text
//! host hook ──► ServerCore::*(gateway, handle, ...)
//!                   │
//!                   ▼
//!            SessionGateway::resolve_state(handle) ── None ──► allow
//!                   │ Some(ServerData)
//!                   ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  ServerData                                                  │
//! │    - ServerConfig                                            │
//! │    - RwLock<PartyRegistry>   (taken before any store lock)   │
//! │    - ClaimsStore                                             │
//! │    - TickHandler             (self-check, eviction, expiry)  │
//! └──────────────────────────────────────────────────────────────┘
//!                   │ with_resolver / with_snapshot_resolver
//!                   ▼
//!            ChunkProtection::on_* ──► verdict
//! ```
//!
//! Commands (`claim`, `unclaim`, `create_party`, ...) are methods on
//! `ServerData` returning `CommandResult`.

mod commands;
mod config;
mod data;
mod error;
mod gateway;
mod handshake;
mod host;
mod tick;

pub use commands::PermissionTarget;
pub use config::{ClaimsConfig, MaintenanceConfig, PartiesConfig, ServerConfig};
pub use data::{SavedState, ServerData};
pub use error::{
    CommandError, CommandResult, ConfigError, ConfigResult, TickError, TickResult,
};
pub use gateway::{ServerHandle, ServerRegistry, SessionGateway};
pub use handshake::{ClientboundHandshake, PacketSink};
pub use host::ServerCore;
pub use tick::{DiagnosticSink, TickHandler, TickReport, TracingSink};
