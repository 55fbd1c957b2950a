//! A single party record.

use claims_core::{PartyId, PlayerId, Rank, TickId};
use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

/// Membership record of one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyMember {
    pub player: PlayerId,
    pub rank: Rank,
    /// Join order within the party, used to pick a successor owner.
    pub joined: u64,
}

/// A named group of players with ranks.
///
/// Serializable as-is; this is the record handed to persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub(crate) id: PartyId,
    pub(crate) name: String,
    pub(crate) created_tick: TickId,
    pub(crate) members: HashMap<PlayerId, PartyMember>,
    pub(crate) invites: HashSet<PlayerId>,
    pub(crate) allies: HashSet<PartyId>,
    pub(crate) next_join: u64,
}

impl Party {
    pub(crate) fn new(id: PartyId, name: String, founder: PlayerId, created_tick: TickId) -> Self {
        let mut party = Self {
            id,
            name,
            created_tick,
            members: HashMap::new(),
            invites: HashSet::new(),
            allies: HashSet::new(),
            next_join: 0,
        };
        party.insert_member(founder, Rank::Owner);
        party
    }

    pub(crate) fn insert_member(&mut self, player: PlayerId, rank: Rank) {
        let joined = self.next_join;
        self.next_join += 1;
        self.members.insert(
            player,
            PartyMember {
                player,
                rank,
                joined,
            },
        );
    }

    #[must_use]
    pub fn id(&self) -> PartyId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn created_tick(&self) -> TickId {
        self.created_tick
    }

    /// The member holding `Rank::Owner`.
    #[must_use]
    pub fn owner(&self) -> Option<PlayerId> {
        self.members
            .values()
            .find(|m| m.rank == Rank::Owner)
            .map(|m| m.player)
    }

    #[must_use]
    pub fn rank_of(&self, player: PlayerId) -> Option<Rank> {
        self.members.get(&player).map(|m| m.rank)
    }

    #[must_use]
    pub fn is_member(&self, player: PlayerId) -> bool {
        self.members.contains_key(&player)
    }

    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn members(&self) -> impl Iterator<Item = &PartyMember> {
        self.members.values()
    }

    #[must_use]
    pub fn is_invited(&self, player: PlayerId) -> bool {
        self.invites.contains(&player)
    }

    #[must_use]
    pub fn is_allied_with(&self, other: PartyId) -> bool {
        self.allies.contains(&other)
    }

    pub fn allies(&self) -> impl Iterator<Item = PartyId> + '_ {
        self.allies.iter().copied()
    }

    /// Highest-ranked member other than `leaving`, earliest joiner first.
    pub(crate) fn successor(&self, leaving: PlayerId) -> Option<PlayerId> {
        self.members
            .values()
            .filter(|m| m.player != leaving)
            .max_by(|a, b| a.rank.cmp(&b.rank).then(b.joined.cmp(&a.joined)))
            .map(|m| m.player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(n: u128) -> PlayerId {
        PlayerId::from_u128(n)
    }

    #[test]
    fn test_founder_is_owner() {
        let party = Party::new(PartyId::from_u128(1), "Miners".into(), player(1), 0);
        assert_eq!(party.owner(), Some(player(1)));
        assert_eq!(party.rank_of(player(1)), Some(Rank::Owner));
        assert_eq!(party.member_count(), 1);
    }

    #[test]
    fn test_successor_prefers_rank_then_join_order() {
        let mut party = Party::new(PartyId::from_u128(1), "Miners".into(), player(1), 0);
        party.insert_member(player(2), Rank::Member);
        party.insert_member(player(3), Rank::Officer);
        party.insert_member(player(4), Rank::Officer);

        assert_eq!(party.successor(player(1)), Some(player(3)));

        party.members.remove(&player(3));
        assert_eq!(party.successor(player(1)), Some(player(4)));
    }

    #[test]
    fn test_successor_none_when_alone() {
        let party = Party::new(PartyId::from_u128(1), "Solo".into(), player(1), 0);
        assert_eq!(party.successor(player(1)), None);
    }
}
