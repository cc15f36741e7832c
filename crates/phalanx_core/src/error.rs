//! # Spatial Core Error Types
//!
//! Only configuration errors ever reach a caller as `Err`, and only at region
//! registration. Everything else in this taxonomy is a condition that gets
//! logged and degraded into an empty result or a conservative default.

use std::time::Duration;

use phalanx_shared::RegionId;
use thiserror::Error;

/// Errors and degradation conditions of the spatial core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    /// A grid for this region is already registered.
    #[error("{0} is already registered")]
    AlreadyRegistered(RegionId),

    /// The region is not registered (or was unloaded).
    #[error("{0} is not registered")]
    RegionNotFound(RegionId),

    /// Programmer or configuration error, fatal at registration time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A rebuild ran longer than its soft budget. It still completed.
    #[error("rebuild of {region} took {elapsed:?}, soft budget {budget:?}")]
    SoftBudgetExceeded {
        /// Region being rebuilt.
        region: RegionId,
        /// Wall time of the rebuild.
        elapsed: Duration,
        /// Configured soft budget.
        budget: Duration,
    },

    /// A cache reached its bound and evicted an entry.
    #[error("{cache} cache at capacity {capacity}, evicting")]
    CapacityExceeded {
        /// Which cache.
        cache: &'static str,
        /// Configured capacity.
        capacity: usize,
    },

    /// The authoritative computation behind a cache failed.
    #[error("{cache} recompute failed: {source}")]
    ComputeFailure {
        /// Which cache.
        cache: &'static str,
        /// What went wrong.
        #[source]
        source: GeometryError,
    },
}

/// Failures of the authoritative (slow) world geometry queries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// The region was unloaded while the query was running.
    #[error("region unloaded")]
    RegionUnloaded,

    /// Input or map data is not usable (NaN coordinate, missing tile, ...).
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// No path exists between the two points.
    #[error("no path between endpoints")]
    NoPath,

    /// The geometry backend is temporarily unavailable.
    #[error("geometry backend unavailable")]
    Unavailable,
}

/// Result type for spatial core operations.
pub type GridResult<T> = Result<T, GridError>;
