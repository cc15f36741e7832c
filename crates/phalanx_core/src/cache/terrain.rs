//! Terrain height and liquid samples keyed by a coarse ground-plane cell.
//!
//! World geometry rarely changes, so entries live long and expire passively:
//! staleness is checked on access, there is no sweeper thread. The map is
//! capped; a full map drops expired cells first, then the oldest samples.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{quantize, Eviction, Lookup, TtlMap};
use crate::config::TerrainCacheConfig;
use crate::error::GridError;
use crate::stats::{CacheCounters, CacheStats};
use crate::world::WorldGeometry;

/// Liquid covering a terrain sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiquidKind {
    /// Dry ground.
    #[default]
    None,
    /// Rivers and lakes.
    Water,
    /// Deep sea.
    Ocean,
    /// Lava.
    Magma,
    /// Toxic sludge.
    Slime,
}

/// Ground height and liquid at a point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainInfo {
    /// Ground height.
    pub height: f32,
    /// Surface of the liquid, meaningless when `liquid` is `None`.
    pub water_level: f32,
    /// Liquid type.
    pub liquid: LiquidKind,
}

impl TerrainInfo {
    /// Sentinel for "no usable sample".
    pub const UNKNOWN: Self = Self {
        height: f32::MIN,
        water_level: f32::MIN,
        liquid: LiquidKind::None,
    };

    /// Dry ground at `height`.
    #[must_use]
    pub const fn dry(height: f32) -> Self {
        Self {
            height,
            water_level: f32::MIN,
            liquid: LiquidKind::None,
        }
    }

    /// Ground at `height` covered by `liquid` up to `water_level`.
    #[must_use]
    pub const fn submerged(height: f32, water_level: f32, liquid: LiquidKind) -> Self {
        Self {
            height,
            water_level,
            liquid,
        }
    }

    /// False for [`TerrainInfo::UNKNOWN`].
    #[must_use]
    pub fn is_known(&self) -> bool {
        self.height != f32::MIN
    }

    /// True if a point at height `z` is below the liquid surface.
    #[must_use]
    pub fn is_underwater(&self, z: f32) -> bool {
        self.liquid != LiquidKind::None && z < self.water_level
    }
}

/// Read-through terrain cache.
pub struct TerrainCache {
    map: TtlMap<(i32, i32), TerrainInfo>,
    cell_size: f32,
    geometry: Arc<dyn WorldGeometry>,
}

impl TerrainCache {
    /// Creates an empty cache over `geometry`.
    #[must_use]
    pub fn new(config: &TerrainCacheConfig, geometry: Arc<dyn WorldGeometry>) -> Self {
        Self {
            map: TtlMap::new(
                "terrain",
                Duration::from_millis(config.ttl_ms),
                Eviction::Oldest(config.capacity),
            ),
            cell_size: config.cell_size,
            geometry,
        }
    }

    /// Terrain at `(x, y)`, [`TerrainInfo::UNKNOWN`] if it cannot be computed.
    pub fn get(&self, x: f32, y: f32) -> Lookup<TerrainInfo> {
        self.get_at(x, y, TerrainInfo::UNKNOWN, Instant::now())
    }

    /// Terrain at `(x, y)`, `last_known` if it cannot be computed.
    pub fn get_or_last_known(&self, x: f32, y: f32, last_known: TerrainInfo) -> Lookup<TerrainInfo> {
        self.get_at(x, y, last_known, Instant::now())
    }

    /// [`TerrainCache::get_or_last_known`] evaluated at `now`.
    pub fn get_at(&self, x: f32, y: f32, fallback: TerrainInfo, now: Instant) -> Lookup<TerrainInfo> {
        let key = (quantize(x, self.cell_size), quantize(y, self.cell_size));
        if let Some(info) = self.map.get_fresh(&key, now) {
            return Lookup::hit(info);
        }

        // Sample at the cell center so every point of the cell agrees.
        let sample_x = (key.0 as f32 + 0.5) * self.cell_size;
        let sample_y = (key.1 as f32 + 0.5) * self.cell_size;
        match self.geometry.terrain_at(sample_x, sample_y) {
            Ok(info) => {
                self.map.insert(key, info, now);
                Lookup::miss(info)
            }
            Err(source) => {
                CacheCounters::bump(&self.map.counters.compute_failures);
                warn!("{}", GridError::ComputeFailure { cache: "terrain", source });
                Lookup::miss(fallback)
            }
        }
    }

    /// Drops expired samples, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.map.purge_expired(Instant::now())
    }

    /// Drops every sample.
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
