//! Per-owner claim bookkeeping and permission toggles.

use claims_core::{ChunkPos, DimensionId, Permission, PermissionSet, PlayerId, TickId};
use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

/// Permission toggles an owner applies to all of its claims.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClaimPermissions {
    /// Granted to every player.
    #[serde(default)]
    pub public: PermissionSet,
    /// Granted to ownerless sources: fire, fluids, pistons, dispensers and
    /// machines coming from land of a different owner.
    #[serde(default)]
    pub environment: PermissionSet,
    /// Granted to members of the owning player's party.
    #[serde(default)]
    pub party: PermissionSet,
    /// Granted to individual friends.
    #[serde(default)]
    pub friends: HashMap<PlayerId, PermissionSet>,
}

impl ClaimPermissions {
    #[must_use]
    pub fn friend(&self, player: PlayerId) -> PermissionSet {
        self.friends.get(&player).copied().unwrap_or_default()
    }

    /// Grant or revoke `permission` for `player`. Empty entries are dropped.
    pub fn set_friend(&mut self, player: PlayerId, permission: Permission, granted: bool) {
        let set = self.friends.entry(player).or_default();
        set.set(permission.flag(), granted);
        if set.is_empty() {
            self.friends.remove(&player);
        }
    }
}

/// Everything the store tracks for one owner (player or party).
#[derive(Debug, Clone, Default)]
pub struct OwnerClaimInfo {
    pub(crate) claims: HashMap<DimensionId, HashSet<ChunkPos>>,
    pub permissions: ClaimPermissions,
    /// Added on top of the base limit for this owner's kind.
    pub bonus_limit: u32,
    /// Last tick the owner (or, for parties, any member) was active.
    pub last_active: TickId,
}

impl OwnerClaimInfo {
    /// Claims held across all dimensions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.claims.values().map(HashSet::len).sum()
    }

    pub fn claims_in(&self, dimension: &DimensionId) -> impl Iterator<Item = ChunkPos> + '_ {
        self.claims.get(dimension).into_iter().flatten().copied()
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &DimensionId> {
        self.claims.keys()
    }

    pub(crate) fn add(&mut self, dimension: &DimensionId, pos: ChunkPos) {
        self.claims
            .entry(dimension.clone())
            .or_default()
            .insert(pos);
    }

    pub(crate) fn remove(&mut self, dimension: &DimensionId, pos: ChunkPos) {
        if let Some(cells) = self.claims.get_mut(dimension) {
            cells.remove(&pos);
            if cells.is_empty() {
                self.claims.remove(dimension);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_info_counts_across_dimensions() {
        let mut info = OwnerClaimInfo::default();
        info.add(&DimensionId::overworld(), ChunkPos::new(0, 0));
        info.add(&DimensionId::overworld(), ChunkPos::new(1, 0));
        info.add(&DimensionId::nether(), ChunkPos::new(0, 0));
        assert_eq!(info.count(), 3);

        info.remove(&DimensionId::nether(), ChunkPos::new(0, 0));
        assert_eq!(info.count(), 2);
        assert_eq!(info.dimensions().count(), 1);
    }

    #[test]
    fn test_set_friend_drops_empty_entries() {
        let friend = PlayerId::from_u128(7);
        let mut permissions = ClaimPermissions::default();

        permissions.set_friend(friend, Permission::Build, true);
        assert!(permissions.friend(friend).allows(Permission::Build));

        permissions.set_friend(friend, Permission::Build, false);
        assert!(permissions.friends.is_empty());
    }
}
