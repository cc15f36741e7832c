//! # Grid Manager
//!
//! Owns one [`Region`] per loaded world region: its double-buffered grid and
//! the three derived caches, created together and torn down together.
//!
//! ```text
//! GridManager
//!   regions: RwLock<HashMap<RegionId, Arc<Region>>>   (registration only)
//!                 │
//!                 ▼
//!   Region ── grid: Arc<DoubleBufferedGrid> ──> GridView (readers)
//!          ├─ terrain: TerrainCache
//!          ├─ los:     LosCache
//!          └─ path:    PathCache
//! ```
//!
//! The registry lock is taken on register, unregister and lookup. Workers
//! resolve their `Arc<Region>` once and query through it afterwards, so
//! queries never touch the registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use phalanx_shared::{ObjectGuid, RegionId, Vec3};
use tracing::{debug, info};

use crate::cache::{LosCache, Lookup, PathCache, PathResult, TerrainCache, TerrainInfo};
use crate::config::{CacheConfig, GridConfig};
use crate::error::{GridError, GridResult};
use crate::grid::{DoubleBufferedGrid, GridGeometry, GridView, GridWriter, RegionBounds};
use crate::snapshot::{EntitySnapshot, KindMask};
use crate::stats::RegionStats;
use crate::world::{RegionGeometry, WorldGeometry};

/// A registered region: grid, caches and geometry source.
pub struct Region {
    grid: Arc<DoubleBufferedGrid>,
    terrain: TerrainCache,
    los: LosCache,
    path: PathCache,
    geometry: Arc<RegionGeometry>,
}

impl Region {
    fn new(grid: Arc<DoubleBufferedGrid>, caches: &CacheConfig, geometry: Arc<dyn WorldGeometry>) -> Self {
        let geometry = Arc::new(RegionGeometry::new(geometry));
        let source: Arc<dyn WorldGeometry> = geometry.clone();
        Self {
            grid,
            terrain: TerrainCache::new(&caches.terrain, Arc::clone(&source)),
            los: LosCache::new(&caches.los, Arc::clone(&source)),
            path: PathCache::new(&caches.path, source),
            geometry,
        }
    }

    /// Region id.
    #[must_use]
    pub fn id(&self) -> RegionId {
        self.grid.region()
    }

    /// The double-buffered grid.
    #[must_use]
    pub fn grid(&self) -> &Arc<DoubleBufferedGrid> {
        &self.grid
    }

    /// Pins the current front buffer.
    #[must_use]
    pub fn load(&self) -> GridView {
        self.grid.load()
    }

    /// See [`DoubleBufferedGrid::query_radius`].
    #[must_use]
    pub fn query_radius(&self, center: Vec3, radius: f32, mask: KindMask) -> Vec<EntitySnapshot> {
        self.grid.query_radius(center, radius, mask)
    }

    /// See [`DoubleBufferedGrid::query_by_guid`].
    #[must_use]
    pub fn query_by_guid(&self, guid: ObjectGuid) -> Option<EntitySnapshot> {
        self.grid.query_by_guid(guid)
    }

    /// Terrain cache.
    #[must_use]
    pub fn terrain(&self) -> &TerrainCache {
        &self.terrain
    }

    /// Line-of-sight cache.
    #[must_use]
    pub fn los(&self) -> &LosCache {
        &self.los
    }

    /// Path cache.
    #[must_use]
    pub fn path(&self) -> &PathCache {
        &self.path
    }

    /// Shorthand for `terrain().get(x, y)`.
    pub fn terrain_at(&self, x: f32, y: f32) -> Lookup<TerrainInfo> {
        self.terrain.get(x, y)
    }

    /// Shorthand for `los().has_los(a, b)`.
    pub fn has_los(&self, a: Vec3, b: Vec3) -> Lookup<bool> {
        self.los.has_los(a, b)
    }

    /// Shorthand for `path().find_path(from, to)`.
    pub fn find_path(&self, from: Vec3, to: Vec3) -> Lookup<Arc<PathResult>> {
        self.path.find_path(from, to)
    }

    /// True once the region has been unregistered.
    #[must_use]
    pub fn is_unloaded(&self) -> bool {
        self.grid.is_retired()
    }

    /// Counters of the grid and all caches.
    #[must_use]
    pub fn stats(&self) -> RegionStats {
        RegionStats {
            region: self.id(),
            grid: self.grid.stats(),
            terrain: self.terrain.stats(),
            los: self.los.stats(),
            path: self.path.stats(),
        }
    }

    fn unload(&self) {
        self.grid.retire();
        self.geometry.mark_unloaded();
        self.terrain.clear();
        self.los.clear();
        self.path.clear();
    }
}

/// Registry of the grids of all loaded regions.
pub struct GridManager {
    regions: RwLock<HashMap<RegionId, Arc<Region>>>,
    grid_config: GridConfig,
    cache_config: CacheConfig,
}

impl GridManager {
    /// Creates an empty manager.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidConfig`] if either configuration is unusable.
    pub fn new(grid_config: GridConfig, cache_config: CacheConfig) -> GridResult<Self> {
        grid_config.validate()?;
        cache_config.validate()?;
        Ok(Self {
            regions: RwLock::new(HashMap::new()),
            grid_config,
            cache_config,
        })
    }

    /// Grid settings.
    #[must_use]
    pub const fn grid_config(&self) -> &GridConfig {
        &self.grid_config
    }

    /// Cache settings.
    #[must_use]
    pub const fn cache_config(&self) -> &CacheConfig {
        &self.cache_config
    }

    /// Creates the grid and caches of `id` and returns its unique writer.
    ///
    /// # Errors
    ///
    /// - [`GridError::AlreadyRegistered`] if `id` already has a grid.
    /// - [`GridError::InvalidConfig`] if `bounds` and `cell_size` do not
    ///   describe a usable grid.
    pub fn register_region(
        &self,
        id: RegionId,
        bounds: RegionBounds,
        cell_size: f32,
        geometry: Arc<dyn WorldGeometry>,
    ) -> GridResult<GridWriter> {
        let layout = GridGeometry::new(bounds, cell_size)?;

        let mut regions = self.regions.write();
        if regions.contains_key(&id) {
            return Err(GridError::AlreadyRegistered(id));
        }
        let (grid, writer) = DoubleBufferedGrid::new(id, layout, self.grid_config.rebuild_budget());
        regions.insert(id, Arc::new(Region::new(grid, &self.cache_config, geometry)));
        drop(regions);

        info!(
            "Registered {} ({}x{} cells of {} units)",
            id,
            layout.dim_x(),
            layout.dim_y(),
            cell_size
        );
        Ok(writer)
    }

    /// The region's grid, or `None` if nothing is registered under `id`.
    #[must_use]
    pub fn get_grid(&self, id: RegionId) -> Option<Arc<Region>> {
        self.regions.read().get(&id).cloned()
    }

    /// Drops the region's grid and caches.
    ///
    /// Views and region handles loaded earlier stay valid until dropped; cache
    /// misses through them degrade to defaults. Returns `false` if `id` was
    /// not registered.
    pub fn unregister_region(&self, id: RegionId) -> bool {
        let removed = self.regions.write().remove(&id);
        match removed {
            Some(region) => {
                region.unload();
                info!("Unregistered {}", id);
                true
            }
            None => {
                debug!("{}", GridError::RegionNotFound(id));
                false
            }
        }
    }

    /// Ids of all registered regions, sorted.
    #[must_use]
    pub fn region_ids(&self) -> Vec<RegionId> {
        let mut ids: Vec<RegionId> = self.regions.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.read().len()
    }

    /// True if no region is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.read().is_empty()
    }

    /// Counters of every registered region, sorted by id.
    #[must_use]
    pub fn stats(&self) -> Vec<RegionStats> {
        let regions: Vec<Arc<Region>> = self.regions.read().values().cloned().collect();
        let mut stats: Vec<RegionStats> = regions.iter().map(|region| region.stats()).collect();
        stats.sort_unstable_by_key(|s| s.region);
        stats
    }
}
