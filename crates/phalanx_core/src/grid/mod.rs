//! # Spatial Grid
//!
//! Snapshots bucketed by quantized ground-plane position, published in whole
//! generations.
//!
//! ```text
//! Cycle N:
//!   Writer rebuilds back buffer (gen N+1) from the world enumerator
//!   Readers query front buffer (gen N)
//!
//! Swap:
//!   back -> front (pointer exchange), generation N+1 visible
//!   old front -> next back buffer (if no reader still pins it)
//! ```

mod buffer;
mod double_buffer;
mod geometry;

pub use buffer::{GridBuffer, GridCell};
pub use double_buffer::{DoubleBufferedGrid, GridView, GridWriter, RebuildReport};
pub use geometry::{CellCoord, CellRange, GridGeometry, RegionBounds};
