//! Two-tier line-of-sight cache.
//!
//! ```text
//! has_los(a, b)
//!   │
//!   ├─ same shortcut cell? ──yes──> visible (no lookup)
//!   │
//!   └─ canonical pair key ──> TTL map ──miss──> raycast, store
//! ```
//!
//! Tier 1 is an approximation: two points sharing a small cell are treated as
//! visible to each other without asking the geometry.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use phalanx_shared::Vec3;
use tracing::warn;

use super::{quantize, Eviction, Lookup, TtlMap};
use crate::config::LosCacheConfig;
use crate::error::{GeometryError, GridError};
use crate::stats::{CacheCounters, CacheStats};
use crate::world::WorldGeometry;

type PointKey = (i32, i32, i32);

/// Read-through line-of-sight cache.
pub struct LosCache {
    map: TtlMap<(PointKey, PointKey), bool>,
    same_cell_size: f32,
    key_precision: f32,
    geometry: Arc<dyn WorldGeometry>,
}

impl LosCache {
    /// Creates an empty cache over `geometry`.
    #[must_use]
    pub fn new(config: &LosCacheConfig, geometry: Arc<dyn WorldGeometry>) -> Self {
        Self {
            map: TtlMap::new(
                "los",
                Duration::from_millis(config.ttl_ms),
                Eviction::Oldest(config.capacity),
            ),
            same_cell_size: config.same_cell_size,
            key_precision: config.key_precision,
            geometry,
        }
    }

    /// True if `a` and `b` can see each other. Symmetric in its arguments.
    ///
    /// Failures of the underlying raycast answer "not visible".
    pub fn has_los(&self, a: Vec3, b: Vec3) -> Lookup<bool> {
        self.has_los_at(a, b, Instant::now())
    }

    /// [`LosCache::has_los`] evaluated at `now`.
    pub fn has_los_at(&self, a: Vec3, b: Vec3, now: Instant) -> Lookup<bool> {
        if !a.is_finite() || !b.is_finite() {
            return self.fail(GeometryError::InvalidGeometry(format!("line of sight {a:?} -> {b:?}")));
        }

        if self.same_cell(a, b) {
            CacheCounters::bump(&self.map.counters.shortcut_hits);
            return Lookup::hit(true);
        }

        let (key, from, to) = self.canonical(a, b);
        if let Some(visible) = self.map.get_fresh(&key, now) {
            return Lookup::hit(visible);
        }

        match self.geometry.line_of_sight(from, to) {
            Ok(visible) => {
                self.map.insert(key, visible, now);
                Lookup::miss(visible)
            }
            Err(source) => self.fail(source),
        }
    }

    fn fail(&self, source: GeometryError) -> Lookup<bool> {
        CacheCounters::bump(&self.map.counters.compute_failures);
        warn!("{}", GridError::ComputeFailure { cache: "los", source });
        Lookup::miss(false)
    }

    fn same_cell(&self, a: Vec3, b: Vec3) -> bool {
        quantize(a.x, self.same_cell_size) == quantize(b.x, self.same_cell_size)
            && quantize(a.y, self.same_cell_size) == quantize(b.y, self.same_cell_size)
    }

    fn point_key(&self, p: Vec3) -> PointKey {
        (
            (p.x / self.key_precision).round() as i32,
            (p.y / self.key_precision).round() as i32,
            (p.z / self.key_precision).round() as i32,
        )
    }

    /// Orders the pair so `(a, b)` and `(b, a)` share a key and raycast the
    /// same segment.
    fn canonical(&self, a: Vec3, b: Vec3) -> ((PointKey, PointKey), Vec3, Vec3) {
        let (ka, kb) = (self.point_key(a), self.point_key(b));
        let order = ka.cmp(&kb).then_with(|| {
            a.x.total_cmp(&b.x)
                .then_with(|| a.y.total_cmp(&b.y))
                .then_with(|| a.z.total_cmp(&b.z))
        });
        if order == Ordering::Greater {
            ((kb, ka), b, a)
        } else {
            ((ka, kb), a, b)
        }
    }

    /// Drops expired pairs, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.map.purge_expired(Instant::now())
    }

    /// Drops every pair.
    pub fn clear(&self) {
        self.map.clear();
    }

    /// Configured time-to-live.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.map.ttl()
    }

    /// Counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.map.stats()
    }
}
