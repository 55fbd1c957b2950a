//! Permission kinds and party ranks.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// A single kind of world action that a claim can protect against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Placing, breaking or moving blocks.
    Build,
    /// Using items on blocks, opening containers, pressing buttons.
    Interact,
    /// Hurting entities or applying effects to them.
    EntityDamage,
    /// Fire spreading into the claim.
    FireSpread,
    /// Fluids flowing into the claim.
    FluidSpread,
    /// Redstone machines and third-party contraptions.
    ModMachine,
}

impl Permission {
    pub const ALL: [Self; 6] = [
        Self::Build,
        Self::Interact,
        Self::EntityDamage,
        Self::FireSpread,
        Self::FluidSpread,
        Self::ModMachine,
    ];

    #[must_use]
    pub const fn flag(self) -> PermissionSet {
        match self {
            Self::Build => PermissionSet::BUILD,
            Self::Interact => PermissionSet::INTERACT,
            Self::EntityDamage => PermissionSet::ENTITY_DAMAGE,
            Self::FireSpread => PermissionSet::FIRE_SPREAD,
            Self::FluidSpread => PermissionSet::FLUID_SPREAD,
            Self::ModMachine => PermissionSet::MOD_MACHINE,
        }
    }
}

bitflags! {
    /// A set of permission kinds. Unknown bits are kept so newer kinds
    /// survive a round-trip through older data.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct PermissionSet: u16 {
        const BUILD = 1 << 0;
        const INTERACT = 1 << 1;
        const ENTITY_DAMAGE = 1 << 2;
        const FIRE_SPREAD = 1 << 3;
        const FLUID_SPREAD = 1 << 4;
        const MOD_MACHINE = 1 << 5;

        const _ = !0;
    }
}

impl PermissionSet {
    #[must_use]
    pub const fn allows(self, permission: Permission) -> bool {
        self.contains(permission.flag())
    }
}

impl From<Permission> for PermissionSet {
    fn from(value: Permission) -> Self {
        value.flag()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::empty(), |set, permission| set | permission.flag())
    }
}

/// Rank of a player within a party. Ordered from least to most privileged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    /// Member of an allied party; never stored on a member record.
    Ally,
    #[default]
    Member,
    Officer,
    Owner,
}
