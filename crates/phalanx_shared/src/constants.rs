//! # Tuning Defaults
//!
//! Every value here is only a default. Operators override all of them through
//! configuration; none of the TTLs is derived from the rebuild interval.

// =============================================================================
// GRID
// =============================================================================

/// Interval between two rebuild/swap cycles of a region's grid.
pub const DEFAULT_REBUILD_INTERVAL_MS: u64 = 200;

/// Soft time budget for one rebuild. Overruns are logged, never aborted.
pub const DEFAULT_REBUILD_BUDGET_MS: u64 = 50;

/// Edge length of one grid cell in world units.
pub const DEFAULT_CELL_SIZE: f32 = 64.0;

// =============================================================================
// TERRAIN CACHE
// =============================================================================

/// Terrain samples are long lived: world geometry rarely changes.
pub const DEFAULT_TERRAIN_TTL_MS: u64 = 60_000;

/// Quantization of terrain keys in world units.
pub const DEFAULT_TERRAIN_CELL_SIZE: f32 = 4.0;

/// Maximum number of cached terrain cells.
pub const DEFAULT_TERRAIN_CAPACITY: usize = 262_144;

// =============================================================================
// LINE-OF-SIGHT CACHE
// =============================================================================

/// Doors open and close, so visibility answers go stale quickly.
pub const DEFAULT_LOS_TTL_MS: u64 = 5_000;

/// Maximum number of cached position pairs.
pub const DEFAULT_LOS_CAPACITY: usize = 65_536;

/// Two points in the same cell of this size are assumed visible.
pub const DEFAULT_LOS_SAME_CELL_SIZE: f32 = 8.0;

/// Resolution used to turn a position pair into a hash key.
pub const DEFAULT_LOS_KEY_PRECISION: f32 = 0.5;

// =============================================================================
// PATH CACHE
// =============================================================================

/// Paths go stale as obstacles move.
pub const DEFAULT_PATH_TTL_MS: u64 = 30_000;

/// Maximum number of cached paths.
pub const DEFAULT_PATH_CAPACITY: usize = 8_192;

/// Coarse quantization step for "roughly the same place" queries.
pub const DEFAULT_PATH_QUANTIZATION_STEP: f32 = 5.0;
