//! # PHALANX
//!
//! Process-level wiring of the spatial core: configuration, logging and the
//! region registry a host simulation and its agent workers share.
//!
//! ## Example
//!
//! ```rust,ignore
//! let config = PhalanxConfig::load("phalanx.toml")?;
//! phalanx::telemetry::init(&config.logging);
//!
//! let mut runtime = Phalanx::new(config, |region| navmesh.geometry_for(region))?;
//! let mut writer = runtime.take_writer(RegionId(0)).unwrap();
//! let mut clock = runtime.rebuild_clock();
//!
//! // World thread
//! loop {
//!     if clock.should_rebuild() {
//!         let start = clock.begin();
//!         writer.rebuild_and_swap(world.objects());
//!         clock.end(start);
//!     }
//!     clock.wait_for_next();
//! }
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod simulation;
pub mod telemetry;

use std::collections::HashMap;
use std::sync::Arc;

use phalanx_core::{GridError, GridManager, GridWriter, RebuildClock, Region, WorldGeometry};
use phalanx_shared::RegionId;
use tracing::info;

pub use config::{ConfigError, LoggingConfig, PhalanxConfig, RegionConfig};
pub use error::PhalanxError;

/// The spatial core of one process.
pub struct Phalanx {
    config: PhalanxConfig,
    manager: Arc<GridManager>,
    writers: HashMap<RegionId, GridWriter>,
}

impl Phalanx {
    /// Validates `config` and registers every configured region, asking
    /// `geometry_for` for each region's geometry source.
    ///
    /// # Errors
    ///
    /// [`PhalanxError::Config`] for invalid settings, [`PhalanxError::Grid`]
    /// if a region cannot be registered.
    pub fn new<F>(config: PhalanxConfig, mut geometry_for: F) -> Result<Self, PhalanxError>
    where
        F: FnMut(RegionId) -> Arc<dyn WorldGeometry>,
    {
        config.validate().map_err(ConfigError::from)?;
        let manager = Arc::new(GridManager::new(config.grid.clone(), config.caches())?);

        let mut writers = HashMap::with_capacity(config.regions.len());
        for region in &config.regions {
            let writer = manager.register_region(
                region.id,
                region.bounds(),
                region.cell_size(&config.grid),
                geometry_for(region.id),
            )?;
            writers.insert(region.id, writer);
        }
        info!(
            regions = writers.len(),
            rebuild_interval_ms = config.grid.rebuild_interval_ms,
            "spatial core ready"
        );

        Ok(Self {
            config,
            manager,
            writers,
        })
    }

    /// Configuration the runtime was built from.
    #[must_use]
    pub const fn config(&self) -> &PhalanxConfig {
        &self.config
    }

    /// The region registry, for handing to worker threads.
    #[must_use]
    pub fn manager(&self) -> &Arc<GridManager> {
        &self.manager
    }

    /// Shorthand for `manager().get_grid(id)`.
    #[must_use]
    pub fn region(&self, id: RegionId) -> Option<Arc<Region>> {
        self.manager.get_grid(id)
    }

    /// Hands out the writer of a configured region. Each writer can be taken
    /// once; the world thread owns it from then on.
    pub fn take_writer(&mut self, id: RegionId) -> Option<GridWriter> {
        self.writers.remove(&id)
    }

    /// Registers a region loaded after startup and returns its writer.
    ///
    /// # Errors
    ///
    /// As [`GridManager::register_region`].
    pub fn load_region(
        &self,
        region: &RegionConfig,
        geometry: Arc<dyn WorldGeometry>,
    ) -> Result<GridWriter, GridError> {
        self.manager.register_region(
            region.id,
            region.bounds(),
            region.cell_size(&self.config.grid),
            geometry,
        )
    }

    /// Drops a region's grid and caches. Returns `false` if it was not loaded.
    pub fn unload_region(&mut self, id: RegionId) -> bool {
        self.writers.remove(&id);
        self.manager.unregister_region(id)
    }

    /// A clock ticking at the configured rebuild interval.
    #[must_use]
    pub fn rebuild_clock(&self) -> RebuildClock {
        RebuildClock::new(self.config.grid.rebuild_interval())
    }
}
