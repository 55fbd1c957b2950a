//! Claim resolution and protection decisions.
//!
//! # Decision Flow
//!
//! ```text
//! host hook ──► ChunkProtection::on_*  (one per action class, returns "should protect")
//!                   │
//!                   ▼
//!               ClaimResolver          (effective owner, ranks, toggles)
//!                   │
//!          ┌────────┴────────┐
//!          ▼                 ▼
//!   ClaimView (store     PartyRegistry
//!   or snapshot)
//! ```
//!
//! Every decision is a pure function of its arguments and the state the
//! resolver reads. Nothing here mutates claims or parties, and nothing fails:
//! inconsistent data resolves to "unclaimed".

mod config;
mod engine;
mod resolver;

pub use config::{MinRanks, ProtectionConfig};
pub use engine::{ChunkProtection, EffectSource, EffectTarget, ItemUse, ModContext, PistonMove};
pub use resolver::ClaimResolver;
