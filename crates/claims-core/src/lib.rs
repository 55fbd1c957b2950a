//! Claims core - value types shared by every claims crate
//!
//! This crate provides:
//! - `DimensionId`, `ChunkPos`, `BlockPos`, `Direction` - world addressing
//! - `PlayerId`, `PartyId`, `Owner` - who can hold a claim
//! - `Permission`, `PermissionSet`, `Rank` - what an actor may do
//!
//! NO LOGIC beyond coordinate math - stores and resolvers live elsewhere.

mod id;
mod permission;
mod pos;

pub use id::{Owner, PartyId, PlayerId};
pub use permission::{Permission, PermissionSet, Rank};
pub use pos::{BlockPos, CHUNK_SIZE, ChunkPos, DimensionId, Direction};

/// A tick counter (monotonically increasing, one per host world tick).
pub type TickId = u64;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BlockPos, ChunkPos, DimensionId, Direction, Owner, PartyId, Permission, PermissionSet,
        PlayerId, Rank, TickId,
    };
}
