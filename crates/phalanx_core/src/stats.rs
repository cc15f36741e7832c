//! # Statistics
//!
//! Counters are plain atomics bumped with `Relaxed` ordering: they feed an
//! operator dashboard, not control flow.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use phalanx_shared::RegionId;

use crate::snapshot::KIND_COUNT;

/// Writer-side counters of one grid.
#[derive(Debug, Default)]
pub(crate) struct GridCounters {
    pub rebuilds: AtomicU64,
    pub swaps: AtomicU64,
    pub last_rebuild_us: AtomicU64,
    pub max_rebuild_us: AtomicU64,
    pub total_rebuild_us: AtomicU64,
    pub soft_budget_overruns: AtomicU64,
    pub skipped_objects: AtomicU64,
    pub replaced_objects: AtomicU64,
    pub buffer_reallocations: AtomicU64,
}

impl GridCounters {
    pub fn record_rebuild(&self, elapsed: Duration, over_budget: bool, skipped: u64, replaced: u64) {
        let us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.rebuilds.fetch_add(1, Ordering::Relaxed);
        self.last_rebuild_us.store(us, Ordering::Relaxed);
        self.max_rebuild_us.fetch_max(us, Ordering::Relaxed);
        self.total_rebuild_us.fetch_add(us, Ordering::Relaxed);
        self.skipped_objects.fetch_add(skipped, Ordering::Relaxed);
        self.replaced_objects.fetch_add(replaced, Ordering::Relaxed);
        if over_budget {
            self.soft_budget_overruns.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Point-in-time view of a grid's health.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GridStats {
    /// Generation currently published.
    pub generation: u64,
    /// Snapshots in the published buffer.
    pub population: usize,
    /// Published population per kind, in `EntityKind::ALL` order.
    pub population_by_kind: [usize; KIND_COUNT],
    /// Completed rebuilds.
    pub rebuilds: u64,
    /// Completed swaps.
    pub swaps: u64,
    /// Duration of the latest rebuild.
    pub last_rebuild: Duration,
    /// Longest rebuild observed.
    pub max_rebuild: Duration,
    /// Mean rebuild duration.
    pub avg_rebuild: Duration,
    /// Rebuilds that exceeded the soft budget.
    pub soft_budget_overruns: u64,
    /// Enumerated objects that could not be indexed.
    pub skipped_objects: u64,
    /// Objects superseded by a duplicate GUID in the same enumeration.
    pub replaced_objects: u64,
    /// Swaps where a reader still pinned the retired buffer.
    pub buffer_reallocations: u64,
}

impl GridStats {
    pub(crate) fn from_counters(
        counters: &GridCounters,
        generation: u64,
        population_by_kind: [usize; KIND_COUNT],
    ) -> Self {
        let rebuilds = counters.rebuilds.load(Ordering::Relaxed);
        let total_us = counters.total_rebuild_us.load(Ordering::Relaxed);
        Self {
            generation,
            population: population_by_kind.iter().sum(),
            population_by_kind,
            rebuilds,
            swaps: counters.swaps.load(Ordering::Relaxed),
            last_rebuild: Duration::from_micros(counters.last_rebuild_us.load(Ordering::Relaxed)),
            max_rebuild: Duration::from_micros(counters.max_rebuild_us.load(Ordering::Relaxed)),
            avg_rebuild: Duration::from_micros(total_us.checked_div(rebuilds).unwrap_or(0)),
            soft_budget_overruns: counters.soft_budget_overruns.load(Ordering::Relaxed),
            skipped_objects: counters.skipped_objects.load(Ordering::Relaxed),
            replaced_objects: counters.replaced_objects.load(Ordering::Relaxed),
            buffer_reallocations: counters.buffer_reallocations.load(Ordering::Relaxed),
        }
    }
}

/// Reader-side counters of one cache.
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub expired: AtomicU64,
    pub evictions: AtomicU64,
    pub compute_failures: AtomicU64,
    pub shortcut_hits: AtomicU64,
}

impl CacheCounters {
    #[inline]
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, entries: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            compute_failures: self.compute_failures.load(Ordering::Relaxed),
            shortcut_hits: self.shortcut_hits.load(Ordering::Relaxed),
            entries,
        }
    }
}

/// Point-in-time view of a cache's effectiveness.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from a fresh entry.
    pub hits: u64,
    /// Lookups that had to recompute (includes `expired`).
    pub misses: u64,
    /// Misses caused by an entry older than its TTL.
    pub expired: u64,
    /// Entries dropped to stay within capacity.
    pub evictions: u64,
    /// Recomputes that failed and returned a conservative default.
    pub compute_failures: u64,
    /// Answers given without any lookup (LOS same-cell rule).
    pub shortcut_hits: u64,
    /// Entries currently stored.
    pub entries: usize,
}

impl CacheStats {
    /// Fraction of lookups answered without a recompute, shortcuts included.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let answered = self.hits + self.shortcut_hits;
        let total = answered + self.misses;
        if total == 0 {
            0.0
        } else {
            answered as f64 / total as f64
        }
    }
}

/// Everything an operator tool wants to know about one region.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionStats {
    /// Region.
    pub region: RegionId,
    /// Grid counters.
    pub grid: GridStats,
    /// Terrain cache counters.
    pub terrain: CacheStats,
    /// Line-of-sight cache counters.
    pub los: CacheStats,
    /// Path cache counters.
    pub path: CacheStats,
}
