//! # Spatial Core Configuration
//!
//! Plain serde structs. The facade crate loads them from TOML; tests build
//! them in code. Every field has a default, and validation happens once, at
//! region registration.

use std::time::Duration;

use phalanx_shared::constants::{
    DEFAULT_LOS_CAPACITY, DEFAULT_LOS_KEY_PRECISION, DEFAULT_LOS_SAME_CELL_SIZE,
    DEFAULT_LOS_TTL_MS, DEFAULT_PATH_CAPACITY, DEFAULT_PATH_QUANTIZATION_STEP,
    DEFAULT_PATH_TTL_MS, DEFAULT_TERRAIN_CAPACITY, DEFAULT_TERRAIN_CELL_SIZE, DEFAULT_TERRAIN_TTL_MS,
};
use phalanx_shared::{DEFAULT_CELL_SIZE, DEFAULT_REBUILD_BUDGET_MS, DEFAULT_REBUILD_INTERVAL_MS};
use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult};

/// Rebuild cadence and default partitioning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Interval between rebuild/swap cycles (ms).
    pub rebuild_interval_ms: u64,
    /// Soft time budget for one rebuild (ms).
    pub rebuild_budget_ms: u64,
    /// Cell size used when a region does not specify its own.
    pub default_cell_size: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rebuild_interval_ms: DEFAULT_REBUILD_INTERVAL_MS,
            rebuild_budget_ms: DEFAULT_REBUILD_BUDGET_MS,
            default_cell_size: DEFAULT_CELL_SIZE,
        }
    }
}

impl GridConfig {
    /// Rebuild interval as a `Duration`.
    #[must_use]
    pub const fn rebuild_interval(&self) -> Duration {
        Duration::from_millis(self.rebuild_interval_ms)
    }

    /// Soft budget as a `Duration`.
    #[must_use]
    pub const fn rebuild_budget(&self) -> Duration {
        Duration::from_millis(self.rebuild_budget_ms)
    }

    /// Checks the values for programmer errors.
    pub fn validate(&self) -> GridResult<()> {
        if self.rebuild_interval_ms == 0 {
            return Err(GridError::InvalidConfig(
                "rebuild_interval_ms must be greater than zero".into(),
            ));
        }
        validate_positive("default_cell_size", self.default_cell_size)
    }
}

/// Terrain cache tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainCacheConfig {
    /// Time-to-live of a sample (ms).
    pub ttl_ms: u64,
    /// Quantization of keys in world units.
    pub cell_size: f32,
    /// Maximum number of cached cells.
    pub capacity: usize,
}

impl Default for TerrainCacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_TERRAIN_TTL_MS,
            cell_size: DEFAULT_TERRAIN_CELL_SIZE,
            capacity: DEFAULT_TERRAIN_CAPACITY,
        }
    }
}

/// Line-of-sight cache tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LosCacheConfig {
    /// Time-to-live of a cached pair (ms).
    pub ttl_ms: u64,
    /// Maximum number of cached pairs.
    pub capacity: usize,
    /// Size of the "same cell means visible" shortcut cells.
    pub same_cell_size: f32,
    /// Resolution of pair keys in world units.
    pub key_precision: f32,
}

impl Default for LosCacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_LOS_TTL_MS,
            capacity: DEFAULT_LOS_CAPACITY,
            same_cell_size: DEFAULT_LOS_SAME_CELL_SIZE,
            key_precision: DEFAULT_LOS_KEY_PRECISION,
        }
    }
}

/// Path cache tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathCacheConfig {
    /// Time-to-live of a cached path (ms).
    pub ttl_ms: u64,
    /// Maximum number of cached paths.
    pub capacity: usize,
    /// Quantization step for endpoints.
    pub quantization_step: f32,
}

impl Default for PathCacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_PATH_TTL_MS,
            capacity: DEFAULT_PATH_CAPACITY,
            quantization_step: DEFAULT_PATH_QUANTIZATION_STEP,
        }
    }
}

/// The three derived caches of one region.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Terrain cache.
    pub terrain: TerrainCacheConfig,
    /// Line-of-sight cache.
    pub los: LosCacheConfig,
    /// Path cache.
    pub path: PathCacheConfig,
}

impl CacheConfig {
    /// Checks the values for programmer errors.
    pub fn validate(&self) -> GridResult<()> {
        validate_positive("terrain.cell_size", self.terrain.cell_size)?;
        validate_positive("los.same_cell_size", self.los.same_cell_size)?;
        validate_positive("los.key_precision", self.los.key_precision)?;
        validate_positive("path.quantization_step", self.path.quantization_step)?;
        for (name, ttl) in [
            ("terrain.ttl_ms", self.terrain.ttl_ms),
            ("los.ttl_ms", self.los.ttl_ms),
            ("path.ttl_ms", self.path.ttl_ms),
        ] {
            if ttl == 0 {
                return Err(GridError::InvalidConfig(format!("{name} must be greater than zero")));
            }
        }
        for (name, capacity) in [
            ("terrain.capacity", self.terrain.capacity),
            ("los.capacity", self.los.capacity),
            ("path.capacity", self.path.capacity),
        ] {
            if capacity == 0 {
                return Err(GridError::InvalidConfig(format!("{name} must be greater than zero")));
            }
        }
        Ok(())
    }
}

pub(crate) fn validate_positive(name: &str, value: f32) -> GridResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GridError::InvalidConfig(format!(
            "{name} must be a positive finite number, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(GridConfig::default().validate().is_ok());
        assert!(CacheConfig::default().validate().is_ok());
        assert_eq!(GridConfig::default().rebuild_interval(), Duration::from_millis(200));
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut caches = CacheConfig::default();
        caches.path.quantization_step = 0.0;
        assert!(matches!(caches.validate(), Err(GridError::InvalidConfig(_))));

        let mut caches = CacheConfig::default();
        caches.los.capacity = 0;
        assert!(caches.validate().is_err());

        let grid = GridConfig {
            default_cell_size: f32::NAN,
            ..GridConfig::default()
        };
        assert!(grid.validate().is_err());
    }
}
