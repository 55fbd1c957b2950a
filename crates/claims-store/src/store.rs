//! The claims store: per-dimension partitions plus the owner table.
//!
//! # Locking
//!
//! ```text
//! dimensions (RwLock<HashMap>)      - only written when a dimension first appears
//!   └── partition (RwLock<Arc<DimensionClaims>>)  - one per dimension
//! owners (RwLock<Arc<OwnerTable>>)  - claim sets, permissions, limits
//! ```
//!
//! Locks are always taken in that order. Partitions are independent, so
//! queries in one dimension never wait on writes in another. Both the
//! partitions and the owner table are copy-on-write: a snapshot is a set of
//! `Arc` clones and a writer only copies data a snapshot still references.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use claims_core::{ChunkPos, DimensionId, Owner, TickId};
use hashbrown::HashMap;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::cache::ClaimCache;
use crate::claim::{Claim, ClaimFlags, RegionClaim, RegionId};
use crate::dimension::DimensionClaims;
use crate::error::{ClaimError, ClaimResult};
use crate::owner::{ClaimPermissions, OwnerClaimInfo};
use crate::snapshot::{ClaimsSnapshot, OwnerRecord, StoreSnapshot};

pub(crate) type OwnerTable = HashMap<Owner, OwnerClaimInfo>;
type Partition = Arc<RwLock<Arc<DimensionClaims>>>;

/// Base claim caps by owner kind. Per-owner bonuses are added on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimLimits {
    pub player_claims: u32,
    pub party_claims: u32,
}

impl Default for ClaimLimits {
    fn default() -> Self {
        Self {
            player_claims: 500,
            party_claims: 1000,
        }
    }
}

/// Store-wide settings derived from server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub limits: ClaimLimits,
    /// Largest absolute chunk coordinate that can be claimed.
    pub world_border: i32,
    /// Largest rectangle accepted by region operations.
    pub max_region_area: u64,
    pub cache_capacity: usize,
    pub cache_ttl: TickId,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            limits: ClaimLimits::default(),
            // 30,000,000 blocks / 16
            world_border: 1_875_000,
            max_region_area: 1024,
            cache_capacity: 4096,
            cache_ttl: 1200,
        }
    }
}

/// Spatial index of every claim, partitioned by dimension.
#[derive(Debug)]
pub struct ClaimsStore {
    settings: StoreSettings,
    dimensions: RwLock<HashMap<DimensionId, Partition>>,
    owners: RwLock<Arc<OwnerTable>>,
    cache: ClaimCache,
    next_region: AtomicU64,
}

impl Default for ClaimsStore {
    fn default() -> Self {
        Self::new(StoreSettings::default())
    }
}

impl ClaimsStore {
    #[must_use]
    pub fn new(settings: StoreSettings) -> Self {
        let cache = ClaimCache::new(settings.cache_capacity, settings.cache_ttl);
        Self {
            settings,
            dimensions: RwLock::new(HashMap::new()),
            owners: RwLock::new(Arc::new(OwnerTable::new())),
            cache,
            next_region: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    #[must_use]
    pub fn cache(&self) -> &ClaimCache {
        &self.cache
    }

    fn partition(&self, dimension: &DimensionId) -> Option<Partition> {
        self.dimensions.read().get(dimension).cloned()
    }

    fn partition_or_create(&self, dimension: &DimensionId) -> Partition {
        if let Some(partition) = self.partition(dimension) {
            return partition;
        }
        let mut dimensions = self.dimensions.write();
        Arc::clone(dimensions.entry(dimension.clone()).or_insert_with(|| {
            debug!(%dimension, "claims partition created");
            Arc::new(RwLock::new(Arc::new(DimensionClaims::new(dimension.clone()))))
        }))
    }

    fn check_cell(&self, dimension: &DimensionId, pos: ChunkPos) -> ClaimResult<()> {
        if pos.is_within(self.settings.world_border) {
            Ok(())
        } else {
            Err(ClaimError::InvalidCell {
                dimension: dimension.clone(),
                pos,
            })
        }
    }

    fn check_area(&self, a: ChunkPos, b: ChunkPos) -> ClaimResult<u64> {
        let area = ChunkPos::rect_area(a, b);
        let max = self.settings.max_region_area;
        if area > max {
            return Err(ClaimError::RegionTooLarge { area, max });
        }
        Ok(area)
    }

    // ==================== Queries ====================

    #[must_use]
    pub fn get_claim(&self, dimension: &DimensionId, pos: ChunkPos) -> Option<Claim> {
        let dimensions = self.dimensions.read();
        let claims = dimensions.get(dimension)?.read();
        claims.get(pos).cloned()
    }

    /// Raw owner of a cell, served from the lookup cache when possible.
    #[must_use]
    pub fn owner_at(&self, dimension: &DimensionId, pos: ChunkPos) -> Option<Owner> {
        if let Some(cached) = self.cache.get(dimension, pos) {
            return cached;
        }
        // Insert while the read guards are held: writers invalidate under the
        // partition write guard and create partitions under the map write guard.
        let dimensions = self.dimensions.read();
        let Some(partition) = dimensions.get(dimension) else {
            self.cache.insert(dimension, pos, None);
            return None;
        };
        let claims = partition.read();
        let owner = claims.get(pos).map(|claim| claim.owner);
        self.cache.insert(dimension, pos, owner);
        owner
    }

    /// Run `f` against an owner's record, if the store knows the owner.
    pub fn with_owner<R>(&self, owner: Owner, f: impl FnOnce(&OwnerClaimInfo) -> R) -> Option<R> {
        self.owners.read().get(&owner).map(f)
    }

    #[must_use]
    pub fn permissions(&self, owner: Owner) -> ClaimPermissions {
        self.with_owner(owner, |info| info.permissions.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn claim_count(&self, owner: Owner) -> usize {
        self.with_owner(owner, OwnerClaimInfo::count).unwrap_or(0)
    }

    /// Effective cap for `owner`: base limit of its kind plus its bonus.
    #[must_use]
    pub fn claim_limit(&self, owner: Owner) -> u32 {
        limit_for(&self.owners.read(), owner, self.settings.limits)
    }

    /// Cells `owner` holds in `dimension`.
    #[must_use]
    pub fn claims_of(&self, owner: Owner, dimension: &DimensionId) -> Vec<ChunkPos> {
        self.with_owner(owner, |info| info.claims_in(dimension).collect())
            .unwrap_or_default()
    }

    /// Owners that currently hold at least one claim.
    #[must_use]
    pub fn claim_owners(&self) -> Vec<Owner> {
        self.owners
            .read()
            .iter()
            .filter(|(_, info)| info.count() > 0)
            .map(|(owner, _)| *owner)
            .collect()
    }

    #[must_use]
    pub fn dimensions(&self) -> Vec<DimensionId> {
        self.dimensions.read().keys().cloned().collect()
    }

    #[must_use]
    pub fn regions(&self, dimension: &DimensionId) -> Vec<RegionClaim> {
        self.partition(dimension)
            .map(|partition| partition.read().regions().cloned().collect())
            .unwrap_or_default()
    }

    /// Cells flagged for force-loading in `dimension`.
    #[must_use]
    pub fn forceloaded(&self, dimension: &DimensionId) -> Vec<ChunkPos> {
        self.partition(dimension)
            .map(|partition| {
                partition
                    .read()
                    .claims()
                    .filter(|claim| claim.flags.forceload)
                    .map(|claim| claim.pos)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Capture a consistent view of every dimension and the owner table.
    #[must_use]
    pub fn snapshot(&self) -> ClaimsSnapshot {
        let dimensions = self.dimensions.read();
        let claims = dimensions
            .iter()
            .map(|(id, partition)| (id.clone(), Arc::clone(&*partition.read())))
            .collect::<HashMap<_, _>>();
        let owners = Arc::clone(&*self.owners.read());
        ClaimsSnapshot::new(claims, owners)
    }

    // ==================== Claim mutation ====================

    /// Claim `pos` for `owner`.
    ///
    /// Re-claiming a cell the owner already holds replaces its flags.
    pub fn set_claim(
        &self,
        dimension: &DimensionId,
        pos: ChunkPos,
        owner: Owner,
        flags: ClaimFlags,
        tick: TickId,
    ) -> ClaimResult<Claim> {
        self.check_cell(dimension, pos)?;
        let partition = self.partition_or_create(dimension);
        let mut claims = partition.write();

        match claims.get(pos).map(|claim| claim.owner) {
            Some(current) if current != owner => {
                return Err(ClaimError::AlreadyClaimed {
                    pos,
                    owner: current,
                });
            }
            Some(_) => {
                let claims = Arc::make_mut(&mut *claims);
                if let Some(claim) = claims.get_mut(pos) {
                    claim.flags = flags;
                    return Ok(claim.clone());
                }
            }
            None => {}
        }

        let mut owners = self.owners.write();
        let limit = limit_for(&owners, owner, self.settings.limits);
        let count = owners.get(&owner).map_or(0, OwnerClaimInfo::count);
        if count >= limit as usize {
            return Err(ClaimError::LimitExceeded { owner, limit });
        }

        let claim = Claim {
            owner,
            dimension: dimension.clone(),
            pos,
            created_tick: tick,
            flags,
            region: None,
        };
        Arc::make_mut(&mut *claims).insert(claim.clone());
        let info = Arc::make_mut(&mut *owners).entry(owner).or_default();
        info.add(dimension, pos);
        info.last_active = info.last_active.max(tick);
        self.cache.invalidate(dimension, pos);

        debug!(%dimension, %pos, %owner, "chunk claimed");
        Ok(claim)
    }

    /// Unclaim `pos`, returning the removed claim.
    pub fn remove_claim(&self, dimension: &DimensionId, pos: ChunkPos) -> ClaimResult<Claim> {
        let partition = self
            .partition(dimension)
            .ok_or(ClaimError::NotClaimed { pos })?;
        let mut claims = partition.write();
        if claims.get(pos).is_none() {
            return Err(ClaimError::NotClaimed { pos });
        }

        let claim = Arc::make_mut(&mut *claims)
            .remove(pos)
            .ok_or(ClaimError::NotClaimed { pos })?;
        let mut owners = self.owners.write();
        if let Some(info) = Arc::make_mut(&mut *owners).get_mut(&claim.owner) {
            info.remove(dimension, pos);
        }
        self.cache.invalidate(dimension, pos);

        debug!(%dimension, %pos, owner = %claim.owner, "chunk unclaimed");
        Ok(claim)
    }

    /// Move a claim from `from` to `to`. The claim leaves any region record.
    pub fn transfer_claim(
        &self,
        dimension: &DimensionId,
        pos: ChunkPos,
        from: Owner,
        to: Owner,
    ) -> ClaimResult<Claim> {
        let partition = self
            .partition(dimension)
            .ok_or(ClaimError::NotClaimed { pos })?;
        let mut claims = partition.write();
        let current = claims
            .get(pos)
            .ok_or(ClaimError::NotClaimed { pos })?
            .clone();
        if current.owner != from {
            return Err(ClaimError::NotOwner {
                pos,
                expected: from,
            });
        }
        if from == to {
            return Ok(current);
        }

        let mut owners = self.owners.write();
        let limit = limit_for(&owners, to, self.settings.limits);
        let count = owners.get(&to).map_or(0, OwnerClaimInfo::count);
        if count >= limit as usize {
            return Err(ClaimError::LimitExceeded { owner: to, limit });
        }

        let claims = Arc::make_mut(&mut *claims);
        if let Some(region) = current.region {
            claims.release_region_cell(region);
        }
        let mut moved = current;
        moved.owner = to;
        moved.region = None;
        claims.insert(moved.clone());

        let table = Arc::make_mut(&mut *owners);
        if let Some(info) = table.get_mut(&from) {
            info.remove(dimension, pos);
        }
        table.entry(to).or_default().add(dimension, pos);
        self.cache.invalidate(dimension, pos);

        debug!(%dimension, %pos, %from, %to, "chunk claim transferred");
        Ok(moved)
    }

    // ==================== Region mutation ====================

    /// Claim every cell of the rectangle spanned by `a` and `b` for `owner`.
    ///
    /// All-or-nothing: if any cell is out of range, held by a different owner,
    /// or the owner's limit cannot fit the new cells, nothing changes. Cells
    /// the owner already holds join the new region record.
    pub fn claim_region(
        &self,
        dimension: &DimensionId,
        a: ChunkPos,
        b: ChunkPos,
        owner: Owner,
        flags: ClaimFlags,
        tick: TickId,
    ) -> ClaimResult<RegionClaim> {
        let area = self.check_area(a, b)?;
        let min = ChunkPos::new(a.x.min(b.x), a.z.min(b.z));
        let max = ChunkPos::new(a.x.max(b.x), a.z.max(b.z));
        self.check_cell(dimension, min)?;
        self.check_cell(dimension, max)?;

        let partition = self.partition_or_create(dimension);
        let mut claims = partition.write();

        let mut new_cells = 0usize;
        for pos in ChunkPos::rect(min, max) {
            match claims.get(pos) {
                Some(claim) if claim.owner != owner => {
                    return Err(ClaimError::AlreadyClaimed {
                        pos,
                        owner: claim.owner,
                    });
                }
                Some(_) => {}
                None => new_cells += 1,
            }
        }

        let mut owners = self.owners.write();
        let limit = limit_for(&owners, owner, self.settings.limits);
        let count = owners.get(&owner).map_or(0, OwnerClaimInfo::count);
        if count + new_cells > limit as usize {
            return Err(ClaimError::LimitExceeded { owner, limit });
        }

        let id = RegionId(self.next_region.fetch_add(1, Ordering::Relaxed));
        let claims = Arc::make_mut(&mut *claims);
        let info = Arc::make_mut(&mut *owners).entry(owner).or_default();
        for pos in ChunkPos::rect(min, max) {
            let previous = claims.get_mut(pos).and_then(|claim| claim.region.replace(id));
            match previous {
                Some(old) => claims.release_region_cell(old),
                None if claims.get(pos).is_some() => {}
                None => {
                    claims.insert(Claim {
                        owner,
                        dimension: dimension.clone(),
                        pos,
                        created_tick: tick,
                        flags: flags.clone(),
                        region: Some(id),
                    });
                    info.add(dimension, pos);
                    self.cache.invalidate(dimension, pos);
                }
            }
        }
        info.last_active = info.last_active.max(tick);

        let region = RegionClaim {
            id,
            owner,
            dimension: dimension.clone(),
            min,
            max,
            created_tick: tick,
            cells: u32::try_from(area).unwrap_or(u32::MAX),
        };
        claims.insert_region(region.clone());

        info!(%dimension, %min, %max, %owner, new_cells, "region claimed");
        Ok(region)
    }

    /// Unclaim every claimed cell in the rectangle spanned by `a` and `b`.
    ///
    /// With `owner` set, fails without mutation if any claimed cell in the
    /// rectangle belongs to someone else.
    pub fn remove_region(
        &self,
        dimension: &DimensionId,
        a: ChunkPos,
        b: ChunkPos,
        owner: Option<Owner>,
    ) -> ClaimResult<Vec<Claim>> {
        self.check_area(a, b)?;
        let Some(partition) = self.partition(dimension) else {
            return Ok(Vec::new());
        };
        let mut claims = partition.write();

        let mut targets = Vec::new();
        for pos in ChunkPos::rect(a, b) {
            if let Some(claim) = claims.get(pos) {
                if let Some(expected) = owner.filter(|expected| *expected != claim.owner) {
                    return Err(ClaimError::NotOwner { pos, expected });
                }
                targets.push(pos);
            }
        }
        if targets.is_empty() {
            return Ok(Vec::new());
        }

        let mut owners = self.owners.write();
        let claims = Arc::make_mut(&mut *claims);
        let table = Arc::make_mut(&mut *owners);
        let removed: Vec<Claim> = targets
            .into_iter()
            .filter_map(|pos| claims.remove(pos))
            .inspect(|claim| {
                if let Some(info) = table.get_mut(&claim.owner) {
                    info.remove(dimension, claim.pos);
                }
                self.cache.invalidate(dimension, claim.pos);
            })
            .collect();

        info!(%dimension, removed = removed.len(), "region unclaimed");
        Ok(removed)
    }

    // ==================== Bulk mutation ====================

    /// Remove every claim `owner` holds, in every dimension.
    pub fn remove_all_of(&self, owner: Owner) -> Vec<Claim> {
        let held: Vec<(DimensionId, Vec<ChunkPos>)> = self
            .with_owner(owner, |info| {
                info.dimensions()
                    .map(|dimension| (dimension.clone(), info.claims_in(dimension).collect()))
                    .collect()
            })
            .unwrap_or_default();

        let mut removed = Vec::new();
        for (dimension, cells) in held {
            let Some(partition) = self.partition(&dimension) else {
                continue;
            };
            let mut claims = partition.write();
            let mut owners = self.owners.write();
            let claims = Arc::make_mut(&mut *claims);
            let mut info = Arc::make_mut(&mut *owners).get_mut(&owner);
            for pos in cells {
                if claims.get(pos).is_some_and(|claim| claim.owner == owner) {
                    if let Some(claim) = claims.remove(pos) {
                        removed.push(claim);
                    }
                }
                if let Some(info) = info.as_mut() {
                    info.remove(&dimension, pos);
                }
                self.cache.invalidate(&dimension, pos);
            }
        }

        if !removed.is_empty() {
            debug!(%owner, removed = removed.len(), "all claims of owner removed");
        }
        removed
    }

    /// Drop an owner's record entirely (permissions, bonus, activity).
    /// Its claims must already be gone.
    pub fn forget_owner(&self, owner: Owner) {
        let mut owners = self.owners.write();
        if owners.contains_key(&owner) {
            Arc::make_mut(&mut *owners).remove(&owner);
        }
    }

    /// Administrative reset of a whole dimension.
    pub fn reset_dimension(&self, dimension: &DimensionId) -> Vec<Claim> {
        let Some(partition) = self.partition(dimension) else {
            return Vec::new();
        };
        let mut claims = partition.write();
        let mut owners = self.owners.write();
        let removed = Arc::make_mut(&mut *claims).clear();
        let table = Arc::make_mut(&mut *owners);
        for claim in &removed {
            if let Some(info) = table.get_mut(&claim.owner) {
                info.remove(dimension, claim.pos);
            }
        }
        self.cache.invalidate_dimension(dimension);

        info!(%dimension, removed = removed.len(), "dimension claims reset");
        removed
    }

    /// Remove all claims of owners inactive for at least `expiration` ticks.
    ///
    /// `exempt` owners are skipped.
    pub fn expire_inactive(
        &self,
        now: TickId,
        expiration: TickId,
        exempt: impl Fn(Owner) -> bool,
    ) -> Vec<Claim> {
        let expired: Vec<Owner> = self
            .owners
            .read()
            .iter()
            .filter(|(owner, info)| {
                info.count() > 0
                    && now.saturating_sub(info.last_active) >= expiration
                    && !exempt(**owner)
            })
            .map(|(owner, _)| *owner)
            .collect();

        let mut removed = Vec::new();
        for owner in expired {
            let claims = self.remove_all_of(owner);
            info!(%owner, claims = claims.len(), "claims expired");
            removed.extend(claims);
        }
        removed
    }

    // ==================== Owner records ====================

    /// Record activity for an owner the store already tracks.
    pub fn touch(&self, owner: Owner, tick: TickId) {
        let mut owners = self.owners.write();
        let stale = owners
            .get(&owner)
            .is_some_and(|info| info.last_active < tick);
        if stale {
            if let Some(info) = Arc::make_mut(&mut *owners).get_mut(&owner) {
                info.last_active = tick;
            }
        }
    }

    pub fn set_bonus_limit(&self, owner: Owner, bonus: u32) {
        let mut owners = self.owners.write();
        Arc::make_mut(&mut *owners).entry(owner).or_default().bonus_limit = bonus;
    }

    /// Edit an owner's permission toggles, creating its record if needed.
    pub fn update_permissions<R>(
        &self,
        owner: Owner,
        f: impl FnOnce(&mut ClaimPermissions) -> R,
    ) -> R {
        let mut owners = self.owners.write();
        f(&mut Arc::make_mut(&mut *owners).entry(owner).or_default().permissions)
    }

    // ==================== Persistence ====================

    /// Enumerable, serializable copy of the whole store.
    #[must_use]
    pub fn export(&self) -> StoreSnapshot {
        self.snapshot().export()
    }

    /// Rebuild a store from persisted records.
    ///
    /// Rejects duplicate cells, out-of-range cells and claims whose owner
    /// `owner_exists` does not recognize. Limits are not re-applied. Region
    /// cell counts are recomputed from the claims that reference them.
    pub fn restore(
        settings: StoreSettings,
        snapshot: StoreSnapshot,
        owner_exists: impl Fn(Owner) -> bool,
    ) -> ClaimResult<Self> {
        let store = Self::new(settings);
        let mut partitions: HashMap<DimensionId, DimensionClaims> = HashMap::new();
        let mut owners = OwnerTable::new();

        for record in snapshot.owners {
            let info = owners.entry(record.owner).or_default();
            info.permissions = record.permissions;
            info.bonus_limit = record.bonus_limit;
            info.last_active = record.last_active;
        }

        let mut next_region = 0;
        for mut region in snapshot.regions {
            next_region = next_region.max(region.id.0);
            region.cells = 0;
            partitions
                .entry(region.dimension.clone())
                .or_insert_with(|| DimensionClaims::new(region.dimension.clone()))
                .insert_region(region);
        }

        for mut claim in snapshot.claims {
            store.check_cell(&claim.dimension, claim.pos)?;
            if !owner_exists(claim.owner) {
                return Err(ClaimError::UnknownOwner(claim.owner));
            }
            let partition = partitions
                .entry(claim.dimension.clone())
                .or_insert_with(|| DimensionClaims::new(claim.dimension.clone()));
            if let Some(existing) = partition.get(claim.pos) {
                return Err(ClaimError::AlreadyClaimed {
                    pos: claim.pos,
                    owner: existing.owner,
                });
            }
            let (owner, pos) = (claim.owner, claim.pos);
            claim.region = claim
                .region
                .filter(|id| partition.adopt_region_cell(*id, owner, pos));
            owners
                .entry(claim.owner)
                .or_default()
                .add(&claim.dimension, claim.pos);
            partition.insert(claim);
        }

        for partition in partitions.values_mut() {
            partition.drop_empty_regions();
        }

        let restored: usize = partitions.values().map(DimensionClaims::len).sum();
        *store.dimensions.write() = partitions
            .into_iter()
            .map(|(id, claims)| (id, Arc::new(RwLock::new(Arc::new(claims)))))
            .collect();
        *store.owners.write() = Arc::new(owners);
        store.next_region.store(next_region + 1, Ordering::Relaxed);

        info!(claims = restored, "claims store restored");
        Ok(store)
    }
}

fn limit_for(owners: &OwnerTable, owner: Owner, limits: ClaimLimits) -> u32 {
    let base = match owner {
        Owner::Player(_) => limits.player_claims,
        Owner::Party(_) => limits.party_claims,
    };
    let bonus = owners.get(&owner).map_or(0, |info| info.bonus_limit);
    base.saturating_add(bonus)
}

impl OwnerRecord {
    pub(crate) fn from_info(owner: Owner, info: &OwnerClaimInfo) -> Self {
        Self {
            owner,
            permissions: info.permissions.clone(),
            bonus_limit: info.bonus_limit,
            last_active: info.last_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use claims_core::{PartyId, Permission, PlayerId};

    use super::*;

    fn alice() -> Owner {
        Owner::Player(PlayerId::from_u128(1))
    }

    fn bob() -> Owner {
        Owner::Player(PlayerId::from_u128(2))
    }

    fn overworld() -> DimensionId {
        DimensionId::overworld()
    }

    fn small_store(player_claims: u32) -> ClaimsStore {
        ClaimsStore::new(StoreSettings {
            limits: ClaimLimits {
                player_claims,
                party_claims: 100,
            },
            world_border: 100,
            max_region_area: 64,
            ..StoreSettings::default()
        })
    }

    #[test]
    fn test_set_get_remove_roundtrip() {
        let store = ClaimsStore::default();
        let pos = ChunkPos::new(3, -4);

        let claim = store
            .set_claim(&overworld(), pos, alice(), ClaimFlags::default(), 7)
            .unwrap();
        assert_eq!(claim.owner, alice());
        assert_eq!(claim.created_tick, 7);
        assert_eq!(store.get_claim(&overworld(), pos).map(|c| c.owner), Some(alice()));
        assert_eq!(store.claim_count(alice()), 1);

        store.remove_claim(&overworld(), pos).unwrap();
        assert!(store.get_claim(&overworld(), pos).is_none());
        assert_eq!(store.claim_count(alice()), 0);
    }

    #[test]
    fn test_foreign_claim_is_rejected_without_mutation() {
        let store = ClaimsStore::default();
        let pos = ChunkPos::new(0, 0);
        let flags = ClaimFlags {
            forceload: false,
            greeting: Some("welcome".into()),
        };
        store.set_claim(&overworld(), pos, alice(), flags.clone(), 0).unwrap();

        let result = store.set_claim(&overworld(), pos, bob(), ClaimFlags::forceloaded(), 1);
        assert_eq!(
            result,
            Err(ClaimError::AlreadyClaimed {
                pos,
                owner: alice()
            })
        );

        let claim = store.get_claim(&overworld(), pos).unwrap();
        assert_eq!(claim.owner, alice());
        assert_eq!(claim.flags, flags);
        assert_eq!(store.claim_count(bob()), 0);
    }

    #[test]
    fn test_reclaim_by_same_owner_updates_flags() {
        let store = small_store(1);
        let pos = ChunkPos::new(0, 0);
        store.set_claim(&overworld(), pos, alice(), ClaimFlags::default(), 0).unwrap();

        // At the limit, but the cell is already ours
        let claim = store
            .set_claim(&overworld(), pos, alice(), ClaimFlags::forceloaded(), 5)
            .unwrap();
        assert!(claim.flags.forceload);
        assert_eq!(claim.created_tick, 0);
        assert_eq!(store.forceloaded(&overworld()), vec![pos]);
    }

    #[test]
    fn test_limit_exceeded() {
        let store = small_store(2);
        store.set_claim(&overworld(), ChunkPos::new(0, 0), alice(), ClaimFlags::default(), 0).unwrap();
        store.set_claim(&DimensionId::nether(), ChunkPos::new(0, 0), alice(), ClaimFlags::default(), 0).unwrap();

        assert_eq!(
            store.set_claim(&overworld(), ChunkPos::new(1, 0), alice(), ClaimFlags::default(), 0),
            Err(ClaimError::LimitExceeded {
                owner: alice(),
                limit: 2
            })
        );

        store.set_bonus_limit(alice(), 1);
        assert_eq!(store.claim_limit(alice()), 3);
        assert!(store
            .set_claim(&overworld(), ChunkPos::new(1, 0), alice(), ClaimFlags::default(), 0)
            .is_ok());
    }

    #[test]
    fn test_invalid_cell() {
        let store = small_store(10);
        let pos = ChunkPos::new(101, 0);
        assert_eq!(
            store.set_claim(&overworld(), pos, alice(), ClaimFlags::default(), 0),
            Err(ClaimError::InvalidCell {
                dimension: overworld(),
                pos
            })
        );
    }

    #[test]
    fn test_remove_unclaimed() {
        let store = ClaimsStore::default();
        let pos = ChunkPos::new(0, 0);
        assert_eq!(
            store.remove_claim(&overworld(), pos),
            Err(ClaimError::NotClaimed { pos })
        );
    }

    #[test]
    fn test_claim_mutation_invalidates_cache() {
        let store = ClaimsStore::default();
        let pos = ChunkPos::new(2, 2);

        assert_eq!(store.owner_at(&overworld(), pos), None);
        assert_eq!(store.cache().len(), 1);

        store.set_claim(&overworld(), pos, alice(), ClaimFlags::default(), 0).unwrap();
        assert_eq!(store.owner_at(&overworld(), pos), Some(alice()));

        store.remove_claim(&overworld(), pos).unwrap();
        assert_eq!(store.owner_at(&overworld(), pos), None);
    }

    #[test]
    fn test_transfer_claim() {
        let store = ClaimsStore::default();
        let pos = ChunkPos::new(1, 1);
        store.set_claim(&overworld(), pos, alice(), ClaimFlags::default(), 0).unwrap();

        assert_eq!(
            store.transfer_claim(&overworld(), pos, bob(), alice()),
            Err(ClaimError::NotOwner {
                pos,
                expected: bob()
            })
        );

        let moved = store.transfer_claim(&overworld(), pos, alice(), bob()).unwrap();
        assert_eq!(moved.owner, bob());
        assert_eq!(store.owner_at(&overworld(), pos), Some(bob()));
        assert_eq!(store.claim_count(alice()), 0);
        assert_eq!(store.claim_count(bob()), 1);
    }

    #[test]
    fn test_region_claim_all_or_nothing() {
        let store = small_store(100);
        store.set_claim(&overworld(), ChunkPos::new(2, 2), bob(), ClaimFlags::default(), 0).unwrap();

        let result = store.claim_region(
            &overworld(),
            ChunkPos::new(0, 0),
            ChunkPos::new(3, 3),
            alice(),
            ClaimFlags::default(),
            0,
        );
        assert_eq!(
            result,
            Err(ClaimError::AlreadyClaimed {
                pos: ChunkPos::new(2, 2),
                owner: bob()
            })
        );

        for pos in ChunkPos::rect(ChunkPos::new(0, 0), ChunkPos::new(3, 3)) {
            let owner = store.get_claim(&overworld(), pos).map(|c| c.owner);
            if pos == ChunkPos::new(2, 2) {
                assert_eq!(owner, Some(bob()));
            } else {
                assert_eq!(owner, None, "cell {pos} must stay unclaimed");
            }
        }
        assert_eq!(store.claim_count(alice()), 0);
        assert!(store.regions(&overworld()).is_empty());
    }

    #[test]
    fn test_region_claim_respects_limit() {
        let store = small_store(3);
        let result = store.claim_region(
            &overworld(),
            ChunkPos::new(0, 0),
            ChunkPos::new(1, 1),
            alice(),
            ClaimFlags::default(),
            0,
        );
        assert_eq!(
            result,
            Err(ClaimError::LimitExceeded {
                owner: alice(),
                limit: 3
            })
        );
        assert_eq!(store.claim_count(alice()), 0);
    }

    #[test]
    fn test_region_too_large() {
        let store = small_store(1000);
        assert_eq!(
            store
                .claim_region(
                    &overworld(),
                    ChunkPos::new(0, 0),
                    ChunkPos::new(8, 7),
                    alice(),
                    ClaimFlags::default(),
                    0,
                )
                .map(|r| r.cells),
            Err(ClaimError::RegionTooLarge { area: 72, max: 64 })
        );
    }

    #[test]
    fn test_region_adopts_own_cells_and_tracks_count() {
        let store = small_store(100);
        store.set_claim(&overworld(), ChunkPos::new(0, 0), alice(), ClaimFlags::default(), 0).unwrap();

        let region = store
            .claim_region(
                &overworld(),
                ChunkPos::new(0, 0),
                ChunkPos::new(1, 1),
                alice(),
                ClaimFlags::forceloaded(),
                3,
            )
            .unwrap();
        assert_eq!(region.cells, 4);
        assert_eq!(store.claim_count(alice()), 4);
        assert_eq!(
            store.get_claim(&overworld(), ChunkPos::new(0, 0)).unwrap().region,
            Some(region.id)
        );

        store.remove_claim(&overworld(), ChunkPos::new(1, 1)).unwrap();
        assert_eq!(store.regions(&overworld())[0].cells, 3);

        let removed = store
            .remove_region(&overworld(), ChunkPos::new(0, 0), ChunkPos::new(1, 1), Some(alice()))
            .unwrap();
        assert_eq!(removed.len(), 3);
        assert!(store.regions(&overworld()).is_empty());
        assert_eq!(store.claim_count(alice()), 0);
    }

    #[test]
    fn test_remove_region_rejects_foreign_cells() {
        let store = small_store(100);
        store.set_claim(&overworld(), ChunkPos::new(0, 0), alice(), ClaimFlags::default(), 0).unwrap();
        store.set_claim(&overworld(), ChunkPos::new(1, 0), bob(), ClaimFlags::default(), 0).unwrap();

        assert_eq!(
            store.remove_region(&overworld(), ChunkPos::new(0, 0), ChunkPos::new(1, 0), Some(alice())),
            Err(ClaimError::NotOwner {
                pos: ChunkPos::new(1, 0),
                expected: alice()
            })
        );
        assert!(store.get_claim(&overworld(), ChunkPos::new(0, 0)).is_some());
    }

    #[test]
    fn test_remove_all_of_spans_dimensions() {
        let store = ClaimsStore::default();
        let party = Owner::Party(PartyId::from_u128(9));
        store.set_claim(&overworld(), ChunkPos::new(0, 0), party, ClaimFlags::default(), 0).unwrap();
        store.set_claim(&DimensionId::end(), ChunkPos::new(5, 5), party, ClaimFlags::default(), 0).unwrap();
        store.set_claim(&overworld(), ChunkPos::new(1, 0), alice(), ClaimFlags::default(), 0).unwrap();

        let removed = store.remove_all_of(party);
        assert_eq!(removed.len(), 2);
        assert!(store.get_claim(&overworld(), ChunkPos::new(0, 0)).is_none());
        assert!(store.get_claim(&DimensionId::end(), ChunkPos::new(5, 5)).is_none());
        assert!(store.get_claim(&overworld(), ChunkPos::new(1, 0)).is_some());

        store.forget_owner(party);
        assert!(store.with_owner(party, |_| ()).is_none());
    }

    #[test]
    fn test_snapshot_isolated_from_later_mutation() {
        let store = ClaimsStore::default();
        let pos = ChunkPos::new(0, 0);
        store.set_claim(&overworld(), pos, alice(), ClaimFlags::default(), 0).unwrap();

        let snapshot = store.snapshot();
        store.remove_claim(&overworld(), pos).unwrap();

        assert_eq!(snapshot.owner_at(&overworld(), pos), Some(alice()));
        assert_eq!(store.owner_at(&overworld(), pos), None);
    }

    #[test]
    fn test_expire_inactive() {
        let store = ClaimsStore::default();
        store.set_claim(&overworld(), ChunkPos::new(0, 0), alice(), ClaimFlags::default(), 0).unwrap();
        store.set_claim(&overworld(), ChunkPos::new(1, 0), bob(), ClaimFlags::default(), 0).unwrap();
        store.touch(bob(), 900);

        let removed = store.expire_inactive(1000, 500, |_| false);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].owner, alice());
        assert!(store.get_claim(&overworld(), ChunkPos::new(1, 0)).is_some());

        // Permissions survive expiry
        assert!(store.with_owner(alice(), |_| ()).is_some());
    }

    #[test]
    fn test_expire_respects_exemption() {
        let store = ClaimsStore::default();
        store.set_claim(&overworld(), ChunkPos::new(0, 0), alice(), ClaimFlags::default(), 0).unwrap();
        assert!(store.expire_inactive(1000, 10, |owner| owner == alice()).is_empty());
    }

    #[test]
    fn test_reset_dimension() {
        let store = ClaimsStore::default();
        store.set_claim(&overworld(), ChunkPos::new(0, 0), alice(), ClaimFlags::default(), 0).unwrap();
        store.set_claim(&DimensionId::nether(), ChunkPos::new(0, 0), alice(), ClaimFlags::default(), 0).unwrap();

        assert_eq!(store.reset_dimension(&overworld()).len(), 1);
        assert_eq!(store.claim_count(alice()), 1);
        assert!(store.get_claim(&DimensionId::nether(), ChunkPos::new(0, 0)).is_some());
    }

    #[test]
    fn test_export_restore() {
        let store = small_store(100);
        store
            .claim_region(&overworld(), ChunkPos::new(0, 0), ChunkPos::new(1, 0), alice(), ClaimFlags::default(), 0)
            .unwrap();
        store.set_claim(&DimensionId::nether(), ChunkPos::new(4, 4), bob(), ClaimFlags::forceloaded(), 2).unwrap();
        store.update_permissions(alice(), |p| p.public.insert(Permission::Interact.flag()));

        let json = serde_json::to_string(&store.export()).unwrap();
        let snapshot: StoreSnapshot = serde_json::from_str(&json).unwrap();
        let restored = ClaimsStore::restore(store.settings().clone(), snapshot, |_| true).unwrap();

        assert_eq!(restored.claim_count(alice()), 2);
        assert_eq!(restored.regions(&overworld())[0].cells, 2);
        assert_eq!(restored.forceloaded(&DimensionId::nether()), vec![ChunkPos::new(4, 4)]);
        assert!(restored.permissions(alice()).public.allows(Permission::Interact));

        // Fresh region ids never collide with restored ones
        let next = restored
            .claim_region(&overworld(), ChunkPos::new(5, 5), ChunkPos::new(5, 5), alice(), ClaimFlags::default(), 3)
            .unwrap();
        assert!(next.id > restored.regions(&overworld()).iter().map(|r| r.id).min().unwrap());
    }

    #[test]
    fn test_restore_rejects_unknown_owner() {
        let store = ClaimsStore::default();
        let party = Owner::Party(PartyId::from_u128(3));
        store.set_claim(&overworld(), ChunkPos::new(0, 0), party, ClaimFlags::default(), 0).unwrap();

        let result = ClaimsStore::restore(StoreSettings::default(), store.export(), |owner| {
            owner.party().is_none()
        });
        assert_eq!(result.map(|_| ()), Err(ClaimError::UnknownOwner(party)));
    }

    #[test]
    fn test_cache_agrees_with_store_under_concurrent_reads() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let store = small_store(10);
        let pos = ChunkPos::new(3, 3);
        let done = AtomicBool::new(false);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                while !done.load(Ordering::Relaxed) {
                    let _ = store.owner_at(&overworld(), pos);
                }
            });

            for round in 0..2000 {
                store
                    .set_claim(&overworld(), pos, alice(), ClaimFlags::default(), 0)
                    .unwrap();
                assert_eq!(store.owner_at(&overworld(), pos), Some(alice()), "round {round}");
                store.remove_claim(&overworld(), pos).unwrap();
                assert_eq!(store.owner_at(&overworld(), pos), None, "round {round}");
            }
            done.store(true, Ordering::Relaxed);
        });
    }
}
