//! # Derived Caches
//!
//! Read-through caches layered on the grid's region, each falling back to the
//! authoritative [`WorldGeometry`](crate::WorldGeometry) on a miss.
//!
//! ## Concurrency
//!
//! ```text
//! reader A ──┐  get(k): miss ──> compute ──> insert(k, v_a) ─┐
//!            │                                                ├─> last write wins
//! reader B ──┘  get(k): miss ──> compute ──> insert(k, v_b) ─┘
//! ```
//!
//! Nobody waits on another thread's recompute; both values are equivalent
//! within the TTL window. Shard locks are held only for the map operation
//! itself, never across a recompute.

mod los;
mod path;
mod terrain;

pub use los::LosCache;
pub use path::{PathCache, PathKind, PathResult};
pub use terrain::{LiquidKind, TerrainCache, TerrainInfo};

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::error::GridError;
use crate::stats::{CacheCounters, CacheStats};

/// Answer of a cache lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct Lookup<V> {
    /// The value, fresh, recomputed or a conservative default.
    pub value: V,
    /// True if no recompute was needed.
    pub was_hit: bool,
}

impl<V> Lookup<V> {
    pub(crate) const fn hit(value: V) -> Self {
        Self { value, was_hit: true }
    }

    pub(crate) const fn miss(value: V) -> Self {
        Self { value, was_hit: false }
    }
}

/// A cached value and when it was built.
#[derive(Debug)]
pub struct CacheEntry<V> {
    /// Cached value.
    pub value: V,
    /// When the recompute producing `value` started.
    pub built_at: Instant,
    /// Nanoseconds since the owning map's epoch, refreshed on every hit.
    last_used: AtomicU64,
}

impl<V> CacheEntry<V> {
    /// Age of the entry at `now`.
    #[must_use]
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.built_at)
    }

    /// True while the entry may be trusted.
    #[must_use]
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        self.age(now) <= ttl
    }
}

/// How a bounded map picks its victims.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Eviction {
    /// No bound; entries only leave through expiry or `clear`.
    Unbounded,
    /// Drop the entries with the oldest `built_at`.
    Oldest(usize),
    /// Drop the entries with the oldest last access.
    LeastRecentlyUsed(usize),
}

/// The sharded TTL map every cache is built on.
pub(crate) struct TtlMap<K, V> {
    name: &'static str,
    entries: DashMap<K, CacheEntry<V>>,
    ttl: Duration,
    eviction: Eviction,
    epoch: Instant,
    pub counters: CacheCounters,
}

impl<K, V> TtlMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(name: &'static str, ttl: Duration, eviction: Eviction) -> Self {
        Self {
            name,
            entries: DashMap::new(),
            ttl,
            eviction,
            epoch: Instant::now(),
            counters: CacheCounters::default(),
        }
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    fn stamp(&self, now: Instant) -> u64 {
        u64::try_from(now.saturating_duration_since(self.epoch).as_nanos()).unwrap_or(u64::MAX)
    }

    /// Fresh value for `key`, counting the hit. Expired entries count as a
    /// miss and are left for the recompute to overwrite.
    pub fn get_fresh(&self, key: &K, now: Instant) -> Option<V> {
        let found = self.entries.get(key).map(|entry| {
            if entry.is_fresh(now, self.ttl) {
                entry.last_used.store(self.stamp(now), Ordering::Relaxed);
                Some(entry.value.clone())
            } else {
                None
            }
        });
        match found {
            Some(Some(hit)) => {
                CacheCounters::bump(&self.counters.hits);
                Some(hit)
            }
            Some(None) => {
                CacheCounters::bump(&self.counters.expired);
                CacheCounters::bump(&self.counters.misses);
                None
            }
            None => {
                CacheCounters::bump(&self.counters.misses);
                None
            }
        }
    }

    /// Stores a freshly computed value. Last write wins.
    pub fn insert(&self, key: K, value: V, built_at: Instant) {
        if !self.entries.contains_key(&key) {
            self.make_room(built_at);
        }
        let entry = CacheEntry {
            value,
            built_at,
            last_used: AtomicU64::new(self.stamp(built_at)),
        };
        self.entries.insert(key, entry);
    }

    fn make_room(&self, now: Instant) {
        let (capacity, by_last_use) = match self.eviction {
            Eviction::Unbounded => return,
            Eviction::Oldest(capacity) => (capacity, false),
            Eviction::LeastRecentlyUsed(capacity) => (capacity, true),
        };
        if self.entries.len() < capacity {
            return;
        }
        // Expired entries go first; live ones are only evicted if that is not enough.
        if self.purge_expired(now) > 0 && self.entries.len() < capacity {
            return;
        }
        tracing::trace!(
            "{}",
            GridError::CapacityExceeded {
                cache: self.name,
                capacity,
            }
        );

        // Evict a slice at once so a full cache does not rescan per insert.
        let batch = (capacity / 16).max(1);
        let mut candidates: Vec<(u64, K)> = self
            .entries
            .iter()
            .map(|entry| {
                let rank = if by_last_use {
                    entry.last_used.load(Ordering::Relaxed)
                } else {
                    self.stamp(entry.built_at)
                };
                (rank, entry.key().clone())
            })
            .collect();
        let excess = self.entries.len().saturating_sub(capacity);
        let batch = (batch + excess).min(candidates.len());
        if batch == 0 {
            return;
        }
        if batch < candidates.len() {
            candidates.select_nth_unstable_by_key(batch - 1, |(rank, _)| *rank);
        }
        for (_, key) in candidates.into_iter().take(batch) {
            if self.entries.remove(&key).is_some() {
                CacheCounters::bump(&self.counters.evictions);
            }
        }
    }

    /// Drops every entry older than the TTL.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now, self.ttl));
        before.saturating_sub(self.entries.len())
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.entries.len())
    }
}

/// Floors `value / step` into an integer bucket, saturating at the `i32` range.
#[inline]
pub(crate) fn quantize(value: f32, step: f32) -> i32 {
    // `as` saturates and maps NaN to 0.
    (value / step).floor() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_expiry() {
        let map: TtlMap<u32, u32> = TtlMap::new("test", Duration::from_secs(5), Eviction::Unbounded);
        let t0 = Instant::now();
        map.insert(1, 10, t0);
        assert_eq!(map.get_fresh(&1, t0 + Duration::from_secs(5)), Some(10));
        assert!(map.get_fresh(&1, t0 + Duration::from_secs(6)).is_none());
        let stats = map.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expired, 1);
    }

    #[test]
    fn test_oldest_eviction() {
        let map: TtlMap<u32, u32> = TtlMap::new("test", Duration::from_secs(60), Eviction::Oldest(4));
        let t0 = Instant::now();
        for i in 0..4 {
            map.insert(i, i, t0 + Duration::from_millis(u64::from(i)));
        }
        map.insert(99, 99, t0 + Duration::from_millis(10));
        assert_eq!(map.stats().entries, 4);
        assert!(map.get_fresh(&0, t0 + Duration::from_millis(20)).is_none());
        assert!(map.get_fresh(&99, t0 + Duration::from_millis(20)).is_some());
        assert_eq!(map.stats().evictions, 1);
    }

    #[test]
    fn test_lru_eviction_keeps_recently_used() {
        let map: TtlMap<u32, u32> =
            TtlMap::new("test", Duration::from_secs(60), Eviction::LeastRecentlyUsed(3));
        let t0 = Instant::now();
        map.insert(1, 1, t0);
        map.insert(2, 2, t0 + Duration::from_millis(1));
        map.insert(3, 3, t0 + Duration::from_millis(2));
        // Touch the oldest entry so it becomes most recently used.
        assert!(map.get_fresh(&1, t0 + Duration::from_millis(3)).is_some());
        map.insert(4, 4, t0 + Duration::from_millis(4));

        let later = t0 + Duration::from_millis(5);
        assert!(map.get_fresh(&1, later).is_some());
        assert!(map.get_fresh(&2, later).is_none());
        assert!(map.get_fresh(&4, later).is_some());
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let map: TtlMap<u32, u32> = TtlMap::new("test", Duration::from_secs(60), Eviction::Oldest(2));
        let t0 = Instant::now();
        map.insert(1, 1, t0);
        map.insert(2, 2, t0);
        map.insert(2, 20, t0 + Duration::from_millis(1));
        assert_eq!(map.stats().entries, 2);
        assert_eq!(map.stats().evictions, 0);
    }

    #[test]
    fn test_full_map_drops_expired_before_live() {
        let map: TtlMap<u32, u32> = TtlMap::new("test", Duration::from_secs(1), Eviction::Oldest(4));
        let t0 = Instant::now();
        for i in 0..4 {
            map.insert(i, i, t0);
        }
        let later = t0 + Duration::from_secs(2);
        map.insert(10, 10, later);
        assert_eq!(map.stats().entries, 1);
        assert_eq!(map.stats().evictions, 0);
        assert!(map.get_fresh(&10, later).is_some());
    }

    #[test]
    fn test_purge_expired() {
        let map: TtlMap<u32, u32> = TtlMap::new("test", Duration::from_secs(1), Eviction::Unbounded);
        let t0 = Instant::now();
        map.insert(1, 1, t0);
        map.insert(2, 2, t0 + Duration::from_secs(2));
        assert_eq!(map.purge_expired(t0 + Duration::from_millis(2500)), 1);
        assert_eq!(map.stats().entries, 1);
    }

    #[test]
    fn test_quantize() {
        assert_eq!(quantize(4.9, 5.0), 0);
        assert_eq!(quantize(5.0, 5.0), 1);
        assert_eq!(quantize(-0.1, 5.0), -1);
        assert_eq!(quantize(f32::NAN, 5.0), 0);
    }
}
