//! Process configuration, loaded once at startup from TOML.
//!
//! ```toml
//! [grid]
//! rebuild_interval_ms = 200
//! rebuild_budget_ms = 50
//! default_cell_size = 64.0
//!
//! [los_cache]
//! ttl_ms = 5000
//!
//! [logging]
//! level = "info"
//!
//! [[regions]]
//! id = 0
//! min_x = -8192.0
//! min_y = -8192.0
//! max_x = 8192.0
//! max_y = 8192.0
//! ```
//!
//! Every section and field is optional. TTLs and the rebuild interval are
//! independent knobs; nothing here derives one from another.

use std::collections::HashSet;
use std::path::Path;

use phalanx_core::{
    CacheConfig, GridConfig, GridError, LosCacheConfig, PathCacheConfig, RegionBounds, TerrainCacheConfig,
};
use phalanx_shared::RegionId;
use serde::{Deserialize, Serialize};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse TOML content.
    #[error("failed to parse config TOML: {source}")]
    Toml {
        /// The underlying parse error.
        #[from]
        source: toml::de::Error,
    },

    /// The content parsed but describes an unusable setup.
    #[error("invalid config: {0}")]
    Invalid(#[from] GridError),
}

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhalanxConfig {
    /// Rebuild cadence and default cell size.
    pub grid: GridConfig,
    /// Terrain cache tuning.
    pub terrain_cache: TerrainCacheConfig,
    /// Line-of-sight cache tuning.
    pub los_cache: LosCacheConfig,
    /// Path cache tuning.
    pub path_cache: PathCacheConfig,
    /// Log output.
    pub logging: LoggingConfig,
    /// Regions registered at startup.
    pub regions: Vec<RegionConfig>,
}

impl PhalanxConfig {
    /// Loads and validates the file at `path`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`PhalanxConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Toml`] for malformed TOML, [`ConfigError::Invalid`] for
    /// values that fail validation.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml)?;
        config.validate()?;
        Ok(config)
    }

    /// The three cache sections bundled for the grid manager.
    #[must_use]
    pub fn caches(&self) -> CacheConfig {
        CacheConfig {
            terrain: self.terrain_cache.clone(),
            los: self.los_cache.clone(),
            path: self.path_cache.clone(),
        }
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// [`GridError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<(), GridError> {
        self.grid.validate()?;
        self.caches().validate()?;

        let mut seen = HashSet::new();
        for region in &self.regions {
            if !seen.insert(region.id) {
                return Err(GridError::InvalidConfig(format!("{} listed twice", region.id)));
            }
            let extent_ok = region.max_x > region.min_x && region.max_y > region.min_y;
            if !extent_ok {
                return Err(GridError::InvalidConfig(format!("{} has an empty extent", region.id)));
            }
            let cell_size = region.cell_size(&self.grid);
            if !(cell_size.is_finite() && cell_size > 0.0) {
                return Err(GridError::InvalidConfig(format!(
                    "{} cell_size must be a positive finite number, got {cell_size}",
                    region.id
                )));
            }
        }
        Ok(())
    }
}

/// Log output settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    pub level: String,
    /// Print the module path of each event.
    pub with_target: bool,
    /// One line per event, fields inline.
    pub compact: bool,
    /// Colour escape codes.
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            with_target: true,
            compact: false,
            ansi: true,
        }
    }
}

/// A region to register at startup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Region id.
    pub id: RegionId,
    /// West edge.
    pub min_x: f32,
    /// South edge.
    pub min_y: f32,
    /// East edge.
    pub max_x: f32,
    /// North edge.
    pub max_y: f32,
    /// Cell size; the grid default when absent.
    #[serde(default)]
    pub cell_size: Option<f32>,
}

impl RegionConfig {
    /// Bounds of the region.
    #[must_use]
    pub const fn bounds(&self) -> RegionBounds {
        RegionBounds::new(self.min_x, self.min_y, self.max_x, self.max_y)
    }

    /// Effective cell size.
    #[must_use]
    pub fn cell_size(&self, grid: &GridConfig) -> f32 {
        self.cell_size.unwrap_or(grid.default_cell_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = PhalanxConfig::from_toml_str("").unwrap();
        assert_eq!(config, PhalanxConfig::default());
        assert_eq!(config.grid.rebuild_interval_ms, 200);
        assert_eq!(config.los_cache.capacity, 65_536);
    }

    #[test]
    fn test_full_document() {
        let config = PhalanxConfig::from_toml_str(
            r#"
            [grid]
            rebuild_interval_ms = 100
            rebuild_budget_ms = 20

            [terrain_cache]
            ttl_ms = 120000
            cell_size = 2.0
            capacity = 50000

            [los_cache]
            ttl_ms = 2500
            capacity = 1024

            [path_cache]
            quantization_step = 10.0

            [logging]
            level = "phalanx=debug"
            with_target = false
            compact = true

            [[regions]]
            id = 0
            min_x = 0.0
            min_y = 0.0
            max_x = 4096.0
            max_y = 4096.0

            [[regions]]
            id = 1
            min_x = -512.0
            min_y = -512.0
            max_x = 512.0
            max_y = 512.0
            cell_size = 32.0
            "#,
        )
        .unwrap();

        assert_eq!(config.grid.rebuild_interval_ms, 100);
        assert_eq!(config.grid.default_cell_size, 64.0);
        assert_eq!(config.terrain_cache.cell_size, 2.0);
        assert_eq!(config.terrain_cache.capacity, 50_000);
        assert_eq!(config.los_cache.capacity, 1_024);
        assert_eq!(config.los_cache.same_cell_size, 8.0);
        assert_eq!(config.path_cache.quantization_step, 10.0);
        assert_eq!(config.logging.level, "phalanx=debug");
        assert!(config.logging.compact);
        assert!(config.logging.ansi);
        assert_eq!(config.regions.len(), 2);
        assert_eq!(config.regions[0].cell_size(&config.grid), 64.0);
        assert_eq!(config.regions[1].cell_size(&config.grid), 32.0);
        assert_eq!(config.regions[1].id, RegionId(1));
    }

    #[test]
    fn test_duplicate_region_rejected() {
        let err = PhalanxConfig::from_toml_str(
            r"
            [[regions]]
            id = 3
            min_x = 0.0
            min_y = 0.0
            max_x = 10.0
            max_y = 10.0

            [[regions]]
            id = 3
            min_x = 0.0
            min_y = 0.0
            max_x = 10.0
            max_y = 10.0
            ",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(GridError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let err = PhalanxConfig::from_toml_str("[path_cache]\nttl_ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = PhalanxConfig::from_toml_str("[grid\nrebuild_interval_ms = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = PhalanxConfig::load("/nonexistent/phalanx.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
