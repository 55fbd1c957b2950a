//! Player and admin commands.
//!
//! Each command checks the feature switches, resolves who is acting for which
//! owner, then calls the store or registry. Party-scoped commands hold the
//! registry lock across the store call.

use claims_core::{ChunkPos, DimensionId, Owner, PartyId, Permission, PlayerId, Rank};
use claims_party::{MemberRemoval, PartyError, PartyRegistry};
use claims_store::{Claim, ClaimError, ClaimFlags, RegionClaim};
use tracing::info;

use crate::data::ServerData;
use crate::error::{CommandError, CommandResult};

/// Who a permission toggle applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionTarget {
    Public,
    /// Fire, fluids and block-driven actions from other owners' land.
    Environment,
    /// Members of the owning player's party.
    Party,
    Friend(PlayerId),
}

impl ServerData {
    // ==================== Claims ====================

    /// Claim a chunk for `player`, or for their party when `as_party`.
    pub fn claim(
        &self,
        player: PlayerId,
        dimension: &DimensionId,
        pos: ChunkPos,
        as_party: bool,
        flags: ClaimFlags,
    ) -> CommandResult<Claim> {
        self.require_claims()?;
        let parties = self.parties_lock().read();
        let owner = self.acting_owner(&parties, player, as_party)?;
        Ok(self
            .store()
            .set_claim(dimension, pos, owner, flags, self.current_tick())?)
    }

    /// Unclaim a chunk held by `player` or, with `as_party`, by their party.
    pub fn unclaim(
        &self,
        player: PlayerId,
        dimension: &DimensionId,
        pos: ChunkPos,
        as_party: bool,
    ) -> CommandResult<Claim> {
        self.require_claims()?;
        let parties = self.parties_lock().read();
        let owner = self.acting_owner(&parties, player, as_party)?;
        self.require_owned(dimension, pos, owner)?;
        Ok(self.store().remove_claim(dimension, pos)?)
    }

    /// Give one of the acting owner's claims to `to`.
    pub fn transfer(
        &self,
        player: PlayerId,
        dimension: &DimensionId,
        pos: ChunkPos,
        as_party: bool,
        to: Owner,
    ) -> CommandResult<Claim> {
        self.require_claims()?;
        let parties = self.parties_lock().read();
        let from = self.acting_owner(&parties, player, as_party)?;
        if let Owner::Party(party) = to {
            if !parties.contains(party) {
                return Err(PartyError::PartyNotFound(party).into());
            }
        }
        Ok(self.store().transfer_claim(dimension, pos, from, to)?)
    }

    pub fn claim_region(
        &self,
        player: PlayerId,
        dimension: &DimensionId,
        corners: (ChunkPos, ChunkPos),
        as_party: bool,
        flags: ClaimFlags,
    ) -> CommandResult<RegionClaim> {
        self.require_claims()?;
        let parties = self.parties_lock().read();
        let owner = self.acting_owner(&parties, player, as_party)?;
        let (a, b) = corners;
        let region =
            self.store()
                .claim_region(dimension, a, b, owner, flags, self.current_tick())?;
        info!(%player, %owner, id = region.id.0, cells = region.cells, "region claimed by command");
        Ok(region)
    }

    /// Unclaim every chunk of the rectangle. Fails without change if any of
    /// them belongs to another owner.
    pub fn unclaim_region(
        &self,
        player: PlayerId,
        dimension: &DimensionId,
        corners: (ChunkPos, ChunkPos),
        as_party: bool,
    ) -> CommandResult<Vec<Claim>> {
        self.require_claims()?;
        let parties = self.parties_lock().read();
        let owner = self.acting_owner(&parties, player, as_party)?;
        let (a, b) = corners;
        Ok(self.store().remove_region(dimension, a, b, Some(owner))?)
    }

    /// Grant or revoke one permission kind on all of the acting owner's claims.
    pub fn toggle_permission(
        &self,
        player: PlayerId,
        as_party: bool,
        target: PermissionTarget,
        permission: Permission,
        granted: bool,
    ) -> CommandResult<()> {
        self.require_claims()?;
        let parties = self.parties_lock().read();
        let owner = self.acting_owner(&parties, player, as_party)?;
        self.store().update_permissions(owner, |toggles| match target {
            PermissionTarget::Public => toggles.public.set(permission.flag(), granted),
            PermissionTarget::Environment => toggles.environment.set(permission.flag(), granted),
            PermissionTarget::Party => toggles.party.set(permission.flag(), granted),
            PermissionTarget::Friend(friend) => toggles.set_friend(friend, permission, granted),
        });
        info!(%owner, ?target, ?permission, granted, "permission toggled");
        Ok(())
    }

    /// Chunks flagged for force-loading in `dimension`.
    #[must_use]
    pub fn forceloaded_cells(&self, dimension: &DimensionId) -> Vec<ChunkPos> {
        self.store().forceloaded(dimension)
    }

    // ==================== Parties ====================

    pub fn create_party(&self, founder: PlayerId, name: impl Into<String>) -> CommandResult<PartyId> {
        self.require_parties()?;
        let tick = self.current_tick();
        Ok(self.parties_lock().write().create_party(founder, name, tick)?)
    }

    pub fn invite(&self, by: PlayerId, player: PlayerId) -> CommandResult<()> {
        self.require_parties()?;
        let mut parties = self.parties_lock().write();
        let party = party_id_of(&parties, by)?;
        Ok(parties.invite(party, by, player)?)
    }

    pub fn join_party(&self, player: PlayerId, party: PartyId) -> CommandResult<()> {
        self.require_parties()?;
        Ok(self.parties_lock().write().join(player, party)?)
    }

    /// Leave the current party. The last member leaving dissolves it.
    pub fn leave_party(&self, player: PlayerId) -> CommandResult<MemberRemoval> {
        self.remove_from_party(player, player)
    }

    /// Remove another member. Requires an officer strictly above the target.
    pub fn kick(&self, by: PlayerId, player: PlayerId) -> CommandResult<MemberRemoval> {
        self.remove_from_party(by, player)
    }

    pub fn set_rank(&self, by: PlayerId, player: PlayerId, rank: Rank) -> CommandResult<()> {
        self.require_parties()?;
        let mut parties = self.parties_lock().write();
        let party = party_id_of(&parties, by)?;
        Ok(parties.change_rank(party, by, player, rank)?)
    }

    pub fn transfer_party(&self, by: PlayerId, new_owner: PlayerId) -> CommandResult<()> {
        self.require_parties()?;
        let mut parties = self.parties_lock().write();
        let party = party_id_of(&parties, by)?;
        Ok(parties.transfer_ownership(party, by, new_owner)?)
    }

    pub fn ally(&self, by: PlayerId, other: PartyId) -> CommandResult<()> {
        self.require_parties()?;
        let mut parties = self.parties_lock().write();
        let party = party_id_of(&parties, by)?;
        Ok(parties.ally(party, by, other)?)
    }

    pub fn remove_ally(&self, by: PlayerId, other: PartyId) -> CommandResult<()> {
        self.require_parties()?;
        let mut parties = self.parties_lock().write();
        let party = party_id_of(&parties, by)?;
        Ok(parties.remove_ally(party, by, other)?)
    }

    /// Disband `by`'s party. Only the owner may. Its claims are released
    /// before the registry lock is.
    pub fn disband(&self, by: PlayerId) -> CommandResult<Vec<Claim>> {
        self.require_parties()?;
        let mut parties = self.parties_lock().write();
        let party = party_id_of(&parties, by)?;
        let rank = parties
            .rank_in(party, by)
            .ok_or(PartyError::NotAMember(by))?;
        if rank < Rank::Owner {
            return Err(PartyError::InsufficientRank {
                required: Rank::Owner,
                actual: rank,
            }
            .into());
        }
        parties.dissolve(party)?;
        Ok(self.revoke_party_claims(party))
    }

    fn remove_from_party(&self, by: PlayerId, player: PlayerId) -> CommandResult<MemberRemoval> {
        self.require_parties()?;
        let mut parties = self.parties_lock().write();
        let party = party_id_of(&parties, player)?;
        let removal = parties.remove_member(party, by, player)?;
        if matches!(removal, MemberRemoval::Dissolved(_)) {
            self.revoke_party_claims(party);
        }
        Ok(removal)
    }

    /// Caller must hold the registry write lock.
    fn revoke_party_claims(&self, party: PartyId) -> Vec<Claim> {
        let owner = Owner::Party(party);
        let claims = self.store().remove_all_of(owner);
        self.store().forget_owner(owner);
        info!(%party, claims = claims.len(), "party claims revoked");
        claims
    }

    // ==================== Admin ====================

    /// Remove every claim in `dimension`.
    pub fn admin_reset_dimension(&self, dimension: &DimensionId) -> Vec<Claim> {
        self.store().reset_dimension(dimension)
    }

    /// Remove every claim of `owner` and forget its record.
    pub fn admin_reset_owner(&self, owner: Owner) -> Vec<Claim> {
        let _parties = self.parties_lock().read();
        let claims = self.store().remove_all_of(owner);
        self.store().forget_owner(owner);
        claims
    }

    pub fn admin_set_bonus_limit(&self, owner: Owner, bonus: u32) {
        self.store().set_bonus_limit(owner, bonus);
        info!(%owner, bonus, "bonus claim limit set");
    }

    // ==================== Helpers ====================

    fn require_claims(&self) -> CommandResult<()> {
        if self.config().claims_enabled {
            Ok(())
        } else {
            Err(CommandError::ClaimsDisabled)
        }
    }

    fn require_parties(&self) -> CommandResult<()> {
        if self.config().parties_enabled {
            Ok(())
        } else {
            Err(CommandError::PartiesDisabled)
        }
    }

    /// The owner `player` acts for. Acting for a party requires officer rank.
    fn acting_owner(
        &self,
        parties: &PartyRegistry,
        player: PlayerId,
        as_party: bool,
    ) -> CommandResult<Owner> {
        if !as_party {
            return Ok(Owner::Player(player));
        }
        self.require_parties()?;
        let party = party_id_of(parties, player)?;
        let actual = parties
            .rank_in(party, player)
            .ok_or(PartyError::NotAMember(player))?;
        if actual < Rank::Officer {
            return Err(PartyError::InsufficientRank {
                required: Rank::Officer,
                actual,
            }
            .into());
        }
        Ok(Owner::Party(party))
    }

    fn require_owned(&self, dimension: &DimensionId, pos: ChunkPos, owner: Owner) -> CommandResult<()> {
        match self.store().owner_at(dimension, pos) {
            None => Err(ClaimError::NotClaimed { pos }.into()),
            Some(current) if current != owner => Err(ClaimError::NotOwner {
                pos,
                expected: owner,
            }
            .into()),
            Some(_) => Ok(()),
        }
    }
}

fn party_id_of(parties: &PartyRegistry, player: PlayerId) -> CommandResult<PartyId> {
    parties
        .party_of(player)
        .map(|party| party.id())
        .ok_or(CommandError::NoParty(player))
}
