//! Claims store.
//!
//! Maps `(dimension, chunk)` to at most one `Claim`, tracks what every owner
//! holds, and enforces per-owner limits.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  ClaimsStore                                                 │
//! │    - one partition per dimension, independently locked       │
//! │    - owner table: claim sets, permission toggles, limits     │
//! │    - ClaimCache: chunk → owner, invalidated on every write   │
//! └──────────────────────────────────────────────────────────────┘
//!                              │ snapshot()
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  ClaimsSnapshot                                              │
//! │    - Arc clones of every partition + owner table             │
//! │    - immune to later writes; export() for persistence        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let store = ClaimsStore::new(StoreSettings::default());
//! let owner = Owner::Player(player);
//!
//! store.set_claim(&DimensionId::overworld(), ChunkPos::new(0, 0), owner, ClaimFlags::default(), tick)?;
//! assert_eq!(store.owner_at(&DimensionId::overworld(), ChunkPos::new(0, 0)), Some(owner));
//! ```

mod cache;
mod claim;
mod dimension;
mod error;
mod owner;
mod snapshot;
mod store;
mod view;

pub use cache::{CacheStats, ClaimCache};
pub use claim::{Claim, ClaimFlags, RegionClaim, RegionId};
pub use dimension::DimensionClaims;
pub use error::{ClaimError, ClaimResult};
pub use owner::{ClaimPermissions, OwnerClaimInfo};
pub use snapshot::{ClaimsSnapshot, OwnerRecord, StoreSnapshot};
pub use store::{ClaimLimits, ClaimsStore, StoreSettings};
pub use view::ClaimView;
