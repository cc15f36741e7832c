//! # PHALANX Core
//!
//! Double-buffered spatial snapshot store for thousands of agent workers
//! reading a world owned by one single-threaded simulation.
//!
//! - Hundreds of reader threads query every few milliseconds
//! - One writer republishes the whole world every rebuild interval
//! - Readers never wait on a rebuild, and never see one half-done
//!
//! ## Architecture Rules
//!
//! 1. **Readers hold snapshots, never live objects** - everything a worker
//!    sees is a copied-out value tagged with its generation
//! 2. **One writer per region** - enforced by the non-`Clone` [`GridWriter`]
//! 3. **Degrade, don't fail** - cache recomputes that fail answer with a
//!    conservative default; only configuration errors return `Err`
//!
//! ## Example
//!
//! ```rust,ignore
//! use phalanx_core::{CacheConfig, GridConfig, GridManager, KindMask, RegionBounds};
//!
//! let manager = GridManager::new(GridConfig::default(), CacheConfig::default())?;
//! let mut writer = manager.register_region(id, RegionBounds::square(0.0, 0.0, 64.0, 256), 64.0, geometry)?;
//!
//! // World thread, every rebuild interval
//! writer.rebuild_and_swap(world.objects());
//!
//! // Any worker thread
//! let region = manager.get_grid(id).unwrap();
//! let hostiles = region.query_radius(bot_position, 30.0, KindMask::CREATURE);
//! ```

#![deny(unsafe_code)]

pub mod cache;
pub mod config;
pub mod error;
pub mod grid;
pub mod manager;
pub mod query;
pub mod schedule;
pub mod snapshot;
pub mod stats;
pub mod world;

pub use cache::{
    CacheEntry, LiquidKind, LosCache, Lookup, PathCache, PathKind, PathResult, TerrainCache, TerrainInfo,
};
pub use config::{CacheConfig, GridConfig, LosCacheConfig, PathCacheConfig, TerrainCacheConfig};
pub use error::{GeometryError, GridError, GridResult};
pub use grid::{
    CellCoord, CellRange, DoubleBufferedGrid, GridBuffer, GridCell, GridGeometry, GridView, GridWriter,
    RebuildReport, RegionBounds,
};
pub use manager::{GridManager, Region};
pub use schedule::{CadenceStats, RebuildClock};
pub use snapshot::{
    CreatureSnapshot, EntityKind, EntitySnapshot, GameObjectSnapshot, KindMask, PlayerSnapshot, SnapshotHeader,
    StatusFlags, TransientEffectSnapshot, TriggerVolumeSnapshot, WorldObject,
};
pub use stats::{CacheStats, GridStats, RegionStats};
pub use world::{FlatGeometry, WorldGeometry};

pub use phalanx_shared::{ObjectGuid, Position, RegionId, Vec3};
