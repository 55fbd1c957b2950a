//! Protection policy knobs.

use claims_core::{Permission, PermissionSet, Rank};
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

/// Minimum party rank required per permission kind on party claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinRanks {
    pub build: Rank,
    pub interact: Rank,
    pub entity_damage: Rank,
    pub fire_spread: Rank,
    pub fluid_spread: Rank,
    pub mod_machine: Rank,
}

impl Default for MinRanks {
    fn default() -> Self {
        Self {
            build: Rank::Member,
            interact: Rank::Ally,
            entity_damage: Rank::Member,
            fire_spread: Rank::Member,
            fluid_spread: Rank::Member,
            mod_machine: Rank::Member,
        }
    }
}

impl MinRanks {
    #[must_use]
    pub const fn get(&self, permission: Permission) -> Rank {
        match permission {
            Permission::Build => self.build,
            Permission::Interact => self.interact,
            Permission::EntityDamage => self.entity_damage,
            Permission::FireSpread => self.fire_spread,
            Permission::FluidSpread => self.fluid_spread,
            Permission::ModMachine => self.mod_machine,
        }
    }
}

/// Policy applied by the resolver and the decision functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionConfig {
    /// Kinds denied on unclaimed land too (e.g. claims-only fire spread).
    pub claims_only: PermissionSet,
    pub min_ranks: MinRanks,
    /// Items usable anywhere regardless of claims.
    pub item_use_exceptions: HashSet<String>,
    /// Blocks anyone may interact with inside claims.
    pub interact_exceptions: HashSet<String>,
    /// Whether mod machine checks may extend to neighboring blocks.
    pub check_neighbor_blocks: bool,
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self {
            claims_only: PermissionSet::empty(),
            min_ranks: MinRanks::default(),
            item_use_exceptions: ["minecraft:map", "minecraft:filled_map", "minecraft:written_book"]
                .into_iter()
                .map(String::from)
                .collect(),
            interact_exceptions: ["minecraft:crafting_table", "minecraft:ender_chest"]
                .into_iter()
                .map(String::from)
                .collect(),
            check_neighbor_blocks: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: ProtectionConfig =
            serde_json::from_str(r#"{ "min_ranks": { "build": "officer" } }"#).unwrap();
        assert_eq!(config.min_ranks.get(Permission::Build), Rank::Officer);
        assert_eq!(config.min_ranks.get(Permission::Interact), Rank::Ally);
        assert!(config.check_neighbor_blocks);
        assert!(config.item_use_exceptions.contains("minecraft:map"));
    }
}
