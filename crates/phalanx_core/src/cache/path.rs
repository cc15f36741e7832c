//! Path cache keyed by coarsely quantized endpoints.
//!
//! Endpoints are floored to a grid of `quantization_step` units, so agents
//! heading to roughly the same place from roughly the same place share one
//! computed polyline. The map is bounded and evicts the least recently used
//! paths first.

use std::sync::Arc;
use std::time::{Duration, Instant};

use phalanx_shared::Vec3;
use tracing::warn;

use super::{quantize, Eviction, Lookup, TtlMap};
use crate::config::PathCacheConfig;
use crate::error::{GeometryError, GridError};
use crate::stats::{CacheCounters, CacheStats};
use crate::world::WorldGeometry;

type EndpointKey = (i32, i32, i32);

/// Where a path came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathKind {
    /// Computed by the world geometry.
    Computed,
    /// Direct segment substituted after a failed computation.
    StraightLine,
}

/// A walkable polyline.
#[derive(Clone, Debug, PartialEq)]
pub struct PathResult {
    /// Waypoints, start and end included.
    pub points: Vec<Vec3>,
    /// Sum of segment lengths.
    pub length: f32,
    /// Provenance.
    pub kind: PathKind,
}

impl PathResult {
    /// Wraps a computed polyline.
    #[must_use]
    pub fn computed(points: Vec<Vec3>) -> Self {
        let length = polyline_length(&points);
        Self {
            points,
            length,
            kind: PathKind::Computed,
        }
    }

    /// The direct segment `from -> to`.
    #[must_use]
    pub fn straight_line(from: Vec3, to: Vec3) -> Self {
        Self {
            points: vec![from, to],
            length: from.distance(to),
            kind: PathKind::StraightLine,
        }
    }

    /// First waypoint.
    #[must_use]
    pub fn start(&self) -> Option<Vec3> {
        self.points.first().copied()
    }

    /// Last waypoint.
    #[must_use]
    pub fn end(&self) -> Option<Vec3> {
        self.points.last().copied()
    }

    /// True if this is a fallback rather than a real path.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.kind == PathKind::StraightLine
    }
}

fn polyline_length(points: &[Vec3]) -> f32 {
    points.windows(2).map(|pair| pair[0].distance(pair[1])).sum()
}

/// Read-through path cache.
pub struct PathCache {
    map: TtlMap<(EndpointKey, EndpointKey), Arc<PathResult>>,
    step: f32,
    geometry: Arc<dyn WorldGeometry>,
}

impl PathCache {
    /// Creates an empty cache over `geometry`.
    #[must_use]
    pub fn new(config: &PathCacheConfig, geometry: Arc<dyn WorldGeometry>) -> Self {
        Self {
            map: TtlMap::new(
                "path",
                Duration::from_millis(config.ttl_ms),
                Eviction::LeastRecentlyUsed(config.capacity),
            ),
            step: config.quantization_step,
            geometry,
        }
    }

    /// Path from `from` to `to`. A failed computation yields an uncached
    /// straight line.
    pub fn find_path(&self, from: Vec3, to: Vec3) -> Lookup<Arc<PathResult>> {
        self.find_path_at(from, to, Instant::now())
    }

    /// [`PathCache::find_path`] evaluated at `now`.
    pub fn find_path_at(&self, from: Vec3, to: Vec3, now: Instant) -> Lookup<Arc<PathResult>> {
        if !from.is_finite() || !to.is_finite() {
            return self.fail(
                from,
                to,
                GeometryError::InvalidGeometry(format!("path {from:?} -> {to:?}")),
            );
        }

        let key = (self.endpoint_key(from), self.endpoint_key(to));
        if let Some(path) = self.map.get_fresh(&key, now) {
            return Lookup::hit(path);
        }

        match self.geometry.find_path(from, to) {
            Ok(points) if points.is_empty() => self.fail(from, to, GeometryError::NoPath),
            Ok(points) => {
                let path = Arc::new(PathResult::computed(points));
                self.map.insert(key, Arc::clone(&path), now);
                Lookup::miss(path)
            }
            Err(source) => self.fail(from, to, source),
        }
    }

    fn fail(&self, from: Vec3, to: Vec3, source: GeometryError) -> Lookup<Arc<PathResult>> {
        CacheCounters::bump(&self.map.counters.compute_failures);
        warn!("{}", GridError::ComputeFailure { cache: "path", source });
        Lookup::miss(Arc::new(PathResult::straight_line(from, to)))
    }

    fn endpoint_key(&self, p: Vec3) -> EndpointKey {
        (
            quantize(p.x, self.step),
            quantize(p.y, self.step),
            quantize(p.z, self.step),
        )
    }

    /// Drops expired paths, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.map.purge_expired(Instant::now())
    }

    /// Drops every path.
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
