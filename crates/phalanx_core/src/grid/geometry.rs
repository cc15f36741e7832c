//! Grid geometry: how world coordinates map onto cells.
//!
//! Cell assignment is a pure function of position and geometry, so two
//! rebuilds of the same input always bucket identically.

use phalanx_shared::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::validate_positive;
use crate::error::{GridError, GridResult};

/// Axis-aligned ground-plane extent of a region.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionBounds {
    /// Minimum X.
    pub min_x: f32,
    /// Minimum Y.
    pub min_y: f32,
    /// Maximum X.
    pub max_x: f32,
    /// Maximum Y.
    pub max_y: f32,
}

impl RegionBounds {
    /// Creates bounds from the two corners.
    #[must_use]
    pub const fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Square bounds of `dimension` cells of `cell_size`, starting at the origin.
    #[must_use]
    pub fn square(origin_x: f32, origin_y: f32, cell_size: f32, dimension: u32) -> Self {
        let extent = cell_size * dimension as f32;
        Self::new(origin_x, origin_y, origin_x + extent, origin_y + extent)
    }

    /// True if the point lies inside (inclusive).
    #[must_use]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// Integer cell coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl CellCoord {
    /// Creates a coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Inclusive rectangular range of cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRange {
    /// Lowest corner.
    pub min: CellCoord,
    /// Highest corner (inclusive).
    pub max: CellCoord,
}

impl CellRange {
    /// Number of cells covered.
    #[must_use]
    pub const fn len(&self) -> usize {
        ((self.max.x - self.min.x + 1) * (self.max.y - self.min.y + 1)) as usize
    }

    /// Never true; a range always covers at least one cell.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Iterates row by row.
    pub fn iter(self) -> impl Iterator<Item = CellCoord> {
        (self.min.y..=self.max.y)
            .flat_map(move |y| (self.min.x..=self.max.x).map(move |x| CellCoord::new(x, y)))
    }
}

/// Partitioning of a region into square cells.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridGeometry {
    bounds: RegionBounds,
    cell_size: f32,
    inv_cell_size: f32,
    dim_x: u32,
    dim_y: u32,
}

impl GridGeometry {
    /// Builds the geometry, validating it.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for a non-positive or non-finite cell size, inverted or
    /// non-finite bounds, or a resulting dimension of zero.
    pub fn new(bounds: RegionBounds, cell_size: f32) -> GridResult<Self> {
        validate_positive("cell_size", cell_size)?;
        let extent_x = bounds.max_x - bounds.min_x;
        let extent_y = bounds.max_y - bounds.min_y;
        if !extent_x.is_finite() || !extent_y.is_finite() || !bounds.min_x.is_finite() || !bounds.min_y.is_finite() {
            return Err(GridError::InvalidConfig(format!("non-finite region bounds {bounds:?}")));
        }
        let dim_x = (extent_x / cell_size).ceil();
        let dim_y = (extent_y / cell_size).ceil();
        if dim_x < 1.0 || dim_y < 1.0 {
            return Err(GridError::InvalidConfig(format!(
                "region bounds {bounds:?} give a zero grid dimension at cell size {cell_size}"
            )));
        }
        if dim_x > u32::from(u16::MAX) as f32 || dim_y > u32::from(u16::MAX) as f32 {
            return Err(GridError::InvalidConfig(format!(
                "grid of {dim_x}x{dim_y} cells is too large, raise the cell size"
            )));
        }
        Ok(Self {
            bounds,
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            dim_x: dim_x as u32,
            dim_y: dim_y as u32,
        })
    }

    /// Region bounds.
    #[must_use]
    pub const fn bounds(&self) -> RegionBounds {
        self.bounds
    }

    /// Cell edge length.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Cells along X.
    #[must_use]
    pub const fn dim_x(&self) -> u32 {
        self.dim_x
    }

    /// Cells along Y.
    #[must_use]
    pub const fn dim_y(&self) -> u32 {
        self.dim_y
    }

    /// Total cell count.
    #[must_use]
    pub const fn cell_count(&self) -> usize {
        self.dim_x as usize * self.dim_y as usize
    }

    #[inline]
    fn axis_cell(value: f32, origin: f32, inv_cell: f32, dim: u32) -> u32 {
        let raw = ((value - origin) * inv_cell).floor();
        // NaN falls to the `else` branch and lands in cell 0.
        if raw >= dim as f32 {
            dim - 1
        } else if raw > 0.0 {
            raw as u32
        } else {
            0
        }
    }

    /// Cell containing the point, clamped to `[0, dimension)` on both axes.
    #[inline]
    #[must_use]
    pub fn cell_of(&self, x: f32, y: f32) -> CellCoord {
        CellCoord::new(
            Self::axis_cell(x, self.bounds.min_x, self.inv_cell_size, self.dim_x),
            Self::axis_cell(y, self.bounds.min_y, self.inv_cell_size, self.dim_y),
        )
    }

    /// Flat index of a cell.
    #[inline]
    #[must_use]
    pub const fn index_of(&self, cell: CellCoord) -> usize {
        cell.y as usize * self.dim_x as usize + cell.x as usize
    }

    /// Clamps a point into the region bounds.
    #[must_use]
    pub fn clamp_point(&self, x: f32, y: f32) -> Vec2 {
        Vec2::new(
            x.clamp(self.bounds.min_x, self.bounds.max_x),
            y.clamp(self.bounds.min_y, self.bounds.max_y),
        )
    }

    /// Moves a query center that lies outside the region onto the nearest
    /// point of its bounds. Height is kept.
    #[inline]
    #[must_use]
    pub fn clamp_center(&self, center: Vec3) -> Vec3 {
        if self.bounds.contains(center.x, center.y) {
            return center;
        }
        let p = self.clamp_point(center.x, center.y);
        Vec3::new(p.x, p.y, center.z)
    }

    /// Cells whose area intersects the square of half-width `radius` around
    /// the point. The square is clamped to the region first, so a point far
    /// outside still yields the nearest edge cells.
    #[must_use]
    pub fn cells_in_square(&self, x: f32, y: f32, radius: f32) -> CellRange {
        let r = radius.max(0.0);
        let lo = self.clamp_point(x - r, y - r);
        let hi = self.clamp_point(x + r, y + r);
        CellRange {
            min: self.cell_of(lo.x, lo.y),
            max: self.cell_of(hi.x, hi.y),
        }
    }
}
