//! Cache of chunk ownership lookups.
//!
//! Entries are invalidated per cell by every claim mutation and evicted by
//! age from the tick coordinator.

use claims_core::{ChunkPos, DimensionId, Owner, TickId};
use hashbrown::HashMap;
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    owner: Option<Owner>,
    last_used: TickId,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<DimensionId, HashMap<ChunkPos, CacheEntry>>,
    len: usize,
    now: TickId,
    hits: u64,
    misses: u64,
}

/// Hit/miss counters and current size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
}

/// Bounded map of `(dimension, chunk) → owner`, including negative results.
#[derive(Debug)]
pub struct ClaimCache {
    inner: Mutex<CacheInner>,
    /// Maximum entries; `0` disables caching.
    capacity: usize,
    /// Entries unused for this many ticks are evicted.
    ttl: TickId,
}

impl ClaimCache {
    #[must_use]
    pub fn new(capacity: usize, ttl: TickId) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            capacity,
            ttl,
        }
    }

    /// `Some(owner)` on a hit (where `owner` may itself be `None` for
    /// unclaimed), `None` on a miss.
    pub fn get(&self, dimension: &DimensionId, pos: ChunkPos) -> Option<Option<Owner>> {
        if self.capacity == 0 {
            return None;
        }
        let mut inner = self.inner.lock();
        let now = inner.now;
        let hit = inner
            .entries
            .get_mut(dimension)
            .and_then(|cells| cells.get_mut(&pos))
            .map(|entry| {
                entry.last_used = now;
                entry.owner
            });
        match hit {
            Some(_) => inner.hits += 1,
            None => inner.misses += 1,
        }
        hit
    }

    /// Record a lookup result. Dropped silently when the cache is full.
    pub fn insert(&self, dimension: &DimensionId, pos: ChunkPos, owner: Option<Owner>) {
        let mut inner = self.inner.lock();
        if inner.len >= self.capacity {
            return;
        }
        let last_used = inner.now;
        let entry = CacheEntry { owner, last_used };
        let fresh = match inner.entries.get_mut(dimension) {
            Some(cells) => cells.insert(pos, entry).is_none(),
            None => {
                let mut cells = HashMap::new();
                cells.insert(pos, entry);
                inner.entries.insert(dimension.clone(), cells);
                true
            }
        };
        if fresh {
            inner.len += 1;
        }
    }

    pub fn invalidate(&self, dimension: &DimensionId, pos: ChunkPos) {
        let mut inner = self.inner.lock();
        let removed = inner
            .entries
            .get_mut(dimension)
            .and_then(|cells| cells.remove(&pos))
            .is_some();
        if removed {
            inner.len -= 1;
        }
    }

    pub fn invalidate_dimension(&self, dimension: &DimensionId) {
        let mut inner = self.inner.lock();
        if let Some(cells) = inner.entries.remove(dimension) {
            inner.len -= cells.len();
        }
    }

    /// Advance the cache clock to `now` and drop entries unused for longer
    /// than the TTL. Returns how many entries were evicted.
    pub fn evict(&self, now: TickId) -> usize {
        let ttl = self.ttl;
        let mut inner = self.inner.lock();
        inner.now = now;

        let mut evicted = 0;
        inner.entries.retain(|_, cells| {
            let before = cells.len();
            cells.retain(|_, entry| now.saturating_sub(entry.last_used) <= ttl);
            evicted += before - cells.len();
            !cells.is_empty()
        });
        inner.len -= evicted;
        evicted
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            len: inner.len,
        }
    }
}
