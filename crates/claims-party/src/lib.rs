//! Party registry.
//!
//! A party is a named group of players sharing collective claim ownership.
//! Every player belongs to at most one party. Ranks order what a member may
//! do, both inside the party (invite, kick, promote) and on the party's claims.
//!
//! The registry knows nothing about claims. Revoking a dissolved party's
//! claims is the caller's job, done while it still holds exclusive access to
//! the registry so the two steps are observed as one.

mod error;
mod party;
mod registry;

pub use error::{PartyError, PartyResult};
pub use party::{Party, PartyMember};
pub use registry::{MemberRemoval, PartyRegistry};
