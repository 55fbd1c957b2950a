//! The party registry: lifecycle and membership commands.

use claims_core::{PartyId, PlayerId, Rank, TickId};
use hashbrown::HashMap;
use tracing::{debug, info};

use crate::error::{PartyError, PartyResult};
use crate::party::Party;

/// What happened to the party after a member was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberRemoval {
    /// The player is gone, the party is otherwise unchanged.
    Removed,
    /// The owner left; ownership passed to the given member.
    OwnerChanged(PlayerId),
    /// The last member left and the party no longer exists.
    Dissolved(Party),
}

/// Owns every party and the player → party index.
#[derive(Debug, Clone, Default)]
pub struct PartyRegistry {
    parties: HashMap<PartyId, Party>,
    player_parties: HashMap<PlayerId, PartyId>,
    /// Member cap per party; `0` means unlimited.
    max_members: usize,
}

impl PartyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_members(max_members: usize) -> Self {
        Self {
            max_members,
            ..Self::default()
        }
    }

    /// Rebuild a registry from persisted records.
    ///
    /// Fails with `DuplicateParty` if a party id repeats, and with
    /// `AlreadyInParty` if a player appears in two parties.
    pub fn restore(
        parties: impl IntoIterator<Item = Party>,
        max_members: usize,
    ) -> PartyResult<Self> {
        let mut registry = Self::with_max_members(max_members);
        for party in parties {
            if registry.parties.contains_key(&party.id) {
                return Err(PartyError::DuplicateParty(party.id));
            }
            for member in party.members() {
                if registry.player_parties.insert(member.player, party.id).is_some() {
                    return Err(PartyError::AlreadyInParty(member.player));
                }
            }
            registry.parties.insert(party.id, party);
        }
        Ok(registry)
    }

    // ==================== Queries ====================

    #[must_use]
    pub fn get(&self, id: PartyId) -> Option<&Party> {
        self.parties.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: PartyId) -> bool {
        self.parties.contains_key(&id)
    }

    #[must_use]
    pub fn party_of(&self, player: PlayerId) -> Option<&Party> {
        self.player_parties
            .get(&player)
            .and_then(|id| self.parties.get(id))
    }

    /// Effective rank of `player` on claims of party `id`.
    ///
    /// Members get their stored rank; members of an allied party get
    /// `Rank::Ally`. Everyone else gets `None`.
    #[must_use]
    pub fn rank_in(&self, id: PartyId, player: PlayerId) -> Option<Rank> {
        let party = self.parties.get(&id)?;
        if let Some(rank) = party.rank_of(player) {
            return Some(rank);
        }
        let theirs = self.player_parties.get(&player)?;
        party.is_allied_with(*theirs).then_some(Rank::Ally)
    }

    pub fn parties(&self) -> impl Iterator<Item = &Party> {
        self.parties.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parties.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parties.is_empty()
    }

    // ==================== Lifecycle ====================

    /// Create a party with `founder` as its owner.
    pub fn create_party(
        &mut self,
        founder: PlayerId,
        name: impl Into<String>,
        tick: TickId,
    ) -> PartyResult<PartyId> {
        if self.player_parties.contains_key(&founder) {
            return Err(PartyError::AlreadyInParty(founder));
        }

        let mut id = PartyId::random();
        while self.parties.contains_key(&id) {
            id = PartyId::random();
        }

        let party = Party::new(id, name.into(), founder, tick);
        info!(party = %id, name = party.name(), %founder, "party created");

        self.parties.insert(id, party);
        self.player_parties.insert(founder, id);
        Ok(id)
    }

    /// Remove a party and every index entry pointing at it.
    ///
    /// Callers that track party-owned claims must revoke them before
    /// releasing their exclusive access to the registry.
    pub fn dissolve(&mut self, id: PartyId) -> PartyResult<Party> {
        let party = self
            .parties
            .remove(&id)
            .ok_or(PartyError::PartyNotFound(id))?;

        for member in party.members() {
            self.player_parties.remove(&member.player);
        }
        for other in self.parties.values_mut() {
            other.allies.remove(&id);
        }

        info!(party = %id, name = party.name(), members = party.member_count(), "party dissolved");
        Ok(party)
    }

    // ==================== Membership ====================

    /// Invite `player` to the party. Requires `Rank::Officer`.
    pub fn invite(&mut self, id: PartyId, by: PlayerId, player: PlayerId) -> PartyResult<()> {
        let in_party = self.player_parties.contains_key(&player);
        let party = self.party_mut(id)?;
        require_rank(party, by, Rank::Officer)?;
        if in_party {
            return Err(PartyError::AlreadyInParty(player));
        }

        party.invites.insert(player);
        debug!(party = %id, %by, %player, "invite sent");
        Ok(())
    }

    pub fn revoke_invite(&mut self, id: PartyId, by: PlayerId, player: PlayerId) -> PartyResult<()> {
        let party = self.party_mut(id)?;
        require_rank(party, by, Rank::Officer)?;
        if !party.invites.remove(&player) {
            return Err(PartyError::NotInvited(player));
        }
        Ok(())
    }

    /// Accept a pending invite.
    pub fn join(&mut self, player: PlayerId, id: PartyId) -> PartyResult<()> {
        if self.player_parties.contains_key(&player) {
            return Err(PartyError::AlreadyInParty(player));
        }
        let max_members = self.max_members;
        let party = self.party_mut(id)?;
        if !party.is_invited(player) {
            return Err(PartyError::NotInvited(player));
        }
        check_capacity(party, max_members)?;

        party.invites.remove(&player);
        party.insert_member(player, Rank::Member);
        self.player_parties.insert(player, id);
        debug!(party = %id, %player, "player joined party");
        Ok(())
    }

    /// Add `player` directly with `rank`, bypassing invitations.
    ///
    /// `by` must be an officer and may only grant ranks below its own.
    pub fn add_member(
        &mut self,
        id: PartyId,
        by: PlayerId,
        player: PlayerId,
        rank: Rank,
    ) -> PartyResult<()> {
        if !matches!(rank, Rank::Member | Rank::Officer) {
            return Err(PartyError::InvalidRank(rank));
        }
        if self.player_parties.contains_key(&player) {
            return Err(PartyError::AlreadyInParty(player));
        }
        let max_members = self.max_members;
        let party = self.party_mut(id)?;
        let actor = require_rank(party, by, Rank::Officer)?;
        require_above(actor, rank)?;
        check_capacity(party, max_members)?;

        party.invites.remove(&player);
        party.insert_member(player, rank);
        self.player_parties.insert(player, id);
        debug!(party = %id, %by, %player, ?rank, "member added");
        Ok(())
    }

    /// Remove `player` from the party.
    ///
    /// A player may always remove themself. Removing someone else requires
    /// `Rank::Officer` and a rank strictly above the target's. When the owner
    /// leaves, ownership passes to the highest-ranked, earliest-joined member;
    /// when the last member leaves, the party is dissolved.
    pub fn remove_member(
        &mut self,
        id: PartyId,
        by: PlayerId,
        player: PlayerId,
    ) -> PartyResult<MemberRemoval> {
        let party = self.party_mut(id)?;
        let target = party
            .rank_of(player)
            .ok_or(PartyError::NotAMember(player))?;

        if by != player {
            let actor = require_rank(party, by, Rank::Officer)?;
            require_above(actor, target)?;
        }

        if party.member_count() == 1 {
            let dissolved = self.dissolve(id)?;
            return Ok(MemberRemoval::Dissolved(dissolved));
        }

        let successor = if target == Rank::Owner {
            party.successor(player)
        } else {
            None
        };
        party.members.remove(&player);
        if let Some(next) = successor {
            if let Some(member) = party.members.get_mut(&next) {
                member.rank = Rank::Owner;
            }
        }
        self.player_parties.remove(&player);

        debug!(party = %id, %by, %player, "member removed");
        Ok(match successor {
            Some(next) => {
                info!(party = %id, owner = %next, "party ownership handed over");
                MemberRemoval::OwnerChanged(next)
            }
            None => MemberRemoval::Removed,
        })
    }

    /// Set a member's rank to `Member` or `Officer`.
    ///
    /// `by` must outrank both the target's current and new rank.
    pub fn change_rank(
        &mut self,
        id: PartyId,
        by: PlayerId,
        player: PlayerId,
        rank: Rank,
    ) -> PartyResult<()> {
        if !matches!(rank, Rank::Member | Rank::Officer) {
            return Err(PartyError::InvalidRank(rank));
        }
        let party = self.party_mut(id)?;
        let actor = require_rank(party, by, Rank::Officer)?;
        let current = party
            .rank_of(player)
            .ok_or(PartyError::NotAMember(player))?;
        require_above(actor, current)?;
        require_above(actor, rank)?;

        if let Some(member) = party.members.get_mut(&player) {
            member.rank = rank;
        }
        debug!(party = %id, %by, %player, ?rank, "rank changed");
        Ok(())
    }

    /// Hand ownership to another member. The previous owner becomes an officer.
    pub fn transfer_ownership(
        &mut self,
        id: PartyId,
        by: PlayerId,
        new_owner: PlayerId,
    ) -> PartyResult<()> {
        let party = self.party_mut(id)?;
        require_rank(party, by, Rank::Owner)?;
        if !party.is_member(new_owner) {
            return Err(PartyError::NotAMember(new_owner));
        }
        if by == new_owner {
            return Ok(());
        }

        if let Some(member) = party.members.get_mut(&by) {
            member.rank = Rank::Officer;
        }
        if let Some(member) = party.members.get_mut(&new_owner) {
            member.rank = Rank::Owner;
        }
        info!(party = %id, from = %by, to = %new_owner, "party ownership transferred");
        Ok(())
    }

    // ==================== Alliances ====================

    /// Ally `other`: its members act with `Rank::Ally` on this party's claims.
    ///
    /// Alliances are one-directional.
    pub fn ally(&mut self, id: PartyId, by: PlayerId, other: PartyId) -> PartyResult<()> {
        if id == other {
            return Err(PartyError::SelfAlliance(id));
        }
        if !self.parties.contains_key(&other) {
            return Err(PartyError::PartyNotFound(other));
        }
        let party = self.party_mut(id)?;
        require_rank(party, by, Rank::Officer)?;
        party.allies.insert(other);
        debug!(party = %id, ally = %other, "alliance added");
        Ok(())
    }

    pub fn remove_ally(&mut self, id: PartyId, by: PlayerId, other: PartyId) -> PartyResult<()> {
        let party = self.party_mut(id)?;
        require_rank(party, by, Rank::Officer)?;
        party.allies.remove(&other);
        debug!(party = %id, ally = %other, "alliance removed");
        Ok(())
    }

    fn party_mut(&mut self, id: PartyId) -> PartyResult<&mut Party> {
        self.parties
            .get_mut(&id)
            .ok_or(PartyError::PartyNotFound(id))
    }
}

/// Rank of `by` in `party`, failing unless it is at least `required`.
fn require_rank(party: &Party, by: PlayerId, required: Rank) -> PartyResult<Rank> {
    let actual = party.rank_of(by).ok_or(PartyError::NotAMember(by))?;
    if actual < required {
        return Err(PartyError::InsufficientRank { required, actual });
    }
    Ok(actual)
}

/// Fails unless `actor` strictly outranks `target`.
fn require_above(actor: Rank, target: Rank) -> PartyResult<()> {
    if actor <= target {
        let required = match target {
            Rank::Ally => Rank::Member,
            Rank::Member => Rank::Officer,
            Rank::Officer | Rank::Owner => Rank::Owner,
        };
        return Err(PartyError::InsufficientRank {
            required,
            actual: actor,
        });
    }
    Ok(())
}

fn check_capacity(party: &Party, max_members: usize) -> PartyResult<()> {
    if max_members != 0 && party.member_count() >= max_members {
        return Err(PartyError::PartyFull { limit: max_members });
    }
    Ok(())
}
