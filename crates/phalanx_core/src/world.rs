//! Seam to the host simulation's authoritative world geometry.
//!
//! The caches fall back to these calls on a miss. Implementations must be
//! safe to call from many reader threads at once and must not touch the
//! grid.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use phalanx_shared::Vec3;

use crate::cache::TerrainInfo;
use crate::error::GeometryError;

/// Slow, authoritative geometry queries (height maps, raycasts, navmesh).
pub trait WorldGeometry: Send + Sync {
    /// Ground height and liquid at a ground-plane point.
    fn terrain_at(&self, x: f32, y: f32) -> Result<TerrainInfo, GeometryError>;

    /// True if nothing static blocks the segment `from -> to`.
    fn line_of_sight(&self, from: Vec3, to: Vec3) -> Result<bool, GeometryError>;

    /// Walkable polyline from `from` to `to`, both endpoints included.
    fn find_path(&self, from: Vec3, to: Vec3) -> Result<Vec<Vec3>, GeometryError>;
}

/// Geometry wrapper that starts failing once its region is unloaded.
///
/// Caches hold this instead of the raw source, so a miss that races with
/// unregistration degrades to a default instead of reading freed map data.
pub(crate) struct RegionGeometry {
    inner: Arc<dyn WorldGeometry>,
    unloaded: AtomicBool,
}

impl RegionGeometry {
    pub fn new(inner: Arc<dyn WorldGeometry>) -> Self {
        Self {
            inner,
            unloaded: AtomicBool::new(false),
        }
    }

    pub fn mark_unloaded(&self) {
        self.unloaded.store(true, Ordering::Release);
    }

    fn check(&self) -> Result<(), GeometryError> {
        if self.unloaded.load(Ordering::Acquire) {
            Err(GeometryError::RegionUnloaded)
        } else {
            Ok(())
        }
    }
}

impl WorldGeometry for RegionGeometry {
    fn terrain_at(&self, x: f32, y: f32) -> Result<TerrainInfo, GeometryError> {
        self.check()?;
        self.inner.terrain_at(x, y)
    }

    fn line_of_sight(&self, from: Vec3, to: Vec3) -> Result<bool, GeometryError> {
        self.check()?;
        self.inner.line_of_sight(from, to)
    }

    fn find_path(&self, from: Vec3, to: Vec3) -> Result<Vec<Vec3>, GeometryError> {
        self.check()?;
        self.inner.find_path(from, to)
    }
}

/// Geometry of an empty, flat, fully visible world at height zero.
///
/// Useful for regions whose real geometry is not wired up yet.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlatGeometry;

impl WorldGeometry for FlatGeometry {
    fn terrain_at(&self, x: f32, y: f32) -> Result<TerrainInfo, GeometryError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(GeometryError::InvalidGeometry(format!("terrain sample at ({x}, {y})")));
        }
        Ok(TerrainInfo::dry(0.0))
    }

    fn line_of_sight(&self, _from: Vec3, _to: Vec3) -> Result<bool, GeometryError> {
        Ok(true)
    }

    fn find_path(&self, from: Vec3, to: Vec3) -> Result<Vec<Vec3>, GeometryError> {
        Ok(vec![from, to])
    }
}
