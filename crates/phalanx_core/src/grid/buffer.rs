//! One buffer of the double-buffered grid.
//!
//! A buffer is an arena of snapshots, a flat array of cells holding indices
//! into the arena (one list per entity kind) and a GUID table. Rebuilding
//! clears every list in place so the allocations survive from one cycle to
//! the next.

use std::collections::HashMap;

use phalanx_shared::{ObjectGuid, Vec3};

use super::geometry::{CellCoord, GridGeometry};
use crate::snapshot::{EntityKind, EntitySnapshot, KindMask, KIND_COUNT};

/// Snapshot indices of one cell, bucketed by kind.
#[derive(Clone, Debug, Default)]
pub struct GridCell {
    by_kind: [Vec<u32>; KIND_COUNT],
}

impl GridCell {
    /// Indices of one kind.
    #[inline]
    #[must_use]
    pub fn indices(&self, kind: EntityKind) -> &[u32] {
        &self.by_kind[kind.index()]
    }

    /// Number of snapshots of every kind in this cell.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_kind.iter().map(Vec::len).sum()
    }

    /// True if the cell holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_kind.iter().all(Vec::is_empty)
    }

    fn clear(&mut self) {
        for list in &mut self.by_kind {
            list.clear();
        }
    }

    fn push(&mut self, kind: EntityKind, index: u32) {
        self.by_kind[kind.index()].push(index);
    }

    fn remove(&mut self, kind: EntityKind, index: u32) {
        let list = &mut self.by_kind[kind.index()];
        if let Some(at) = list.iter().position(|i| *i == index) {
            list.swap_remove(at);
        }
    }
}

/// What happened to one object handed to [`GridBuffer::insert`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum InsertOutcome {
    Inserted,
    Replaced,
    Skipped,
}

/// Snapshot arena plus cell and GUID indices, for one generation.
#[derive(Debug)]
pub struct GridBuffer {
    geometry: GridGeometry,
    generation: u64,
    snapshots: Vec<EntitySnapshot>,
    /// Arena slots superseded by a duplicate GUID; skipped by iteration.
    dead: Vec<bool>,
    cells: Box<[GridCell]>,
    guid_index: HashMap<ObjectGuid, u32>,
    population: [usize; KIND_COUNT],
}

impl GridBuffer {
    /// Creates an empty buffer with every cell allocated.
    #[must_use]
    pub fn new(geometry: GridGeometry) -> Self {
        Self {
            geometry,
            generation: 0,
            snapshots: Vec::new(),
            dead: Vec::new(),
            cells: vec![GridCell::default(); geometry.cell_count()].into_boxed_slice(),
            guid_index: HashMap::new(),
            population: [0; KIND_COUNT],
        }
    }

    /// Generation this buffer was built for.
    #[inline]
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Geometry the cells were laid out with.
    #[inline]
    #[must_use]
    pub const fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Number of live snapshots.
    #[must_use]
    pub fn population(&self) -> usize {
        self.population.iter().sum()
    }

    /// Number of live snapshots of one kind.
    #[must_use]
    pub const fn population_of(&self, kind: EntityKind) -> usize {
        self.population[kind.index()]
    }

    /// Per-kind population, in [`EntityKind::ALL`] order.
    #[must_use]
    pub const fn population_by_kind(&self) -> [usize; KIND_COUNT] {
        self.population
    }

    /// The cell at a coordinate, if it is inside the grid.
    #[must_use]
    pub fn cell(&self, coord: CellCoord) -> Option<&GridCell> {
        if coord.x >= self.geometry.dim_x() || coord.y >= self.geometry.dim_y() {
            return None;
        }
        self.cells.get(self.geometry.index_of(coord))
    }

    /// Snapshot by GUID.
    #[inline]
    #[must_use]
    pub fn get(&self, guid: ObjectGuid) -> Option<&EntitySnapshot> {
        let index = *self.guid_index.get(&guid)?;
        self.snapshots.get(index as usize)
    }

    /// Iterates every live snapshot.
    pub fn iter(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.snapshots
            .iter()
            .zip(self.dead.iter())
            .filter_map(|(snapshot, dead)| (!dead).then_some(snapshot))
    }

    /// Visits every snapshot of the selected kinds within `radius` of `center`.
    ///
    /// Only cells intersecting the bounding square are scanned. A center
    /// outside the region is clamped onto its bounds first, so a bot past the
    /// map edge gets the answers of the nearest valid point. Distance is
    /// measured in 3D.
    pub fn for_each_within<'a>(
        &'a self,
        center: Vec3,
        radius: f32,
        mask: KindMask,
        mut visit: impl FnMut(&'a EntitySnapshot),
    ) {
        if mask.is_empty() || !center.is_finite() || radius.is_nan() || radius < 0.0 {
            return;
        }
        let center = self.geometry.clamp_center(center);
        let radius_sq = radius * radius;
        let range = self.geometry.cells_in_square(center.x, center.y, radius);
        for coord in range.iter() {
            let Some(cell) = self.cells.get(self.geometry.index_of(coord)) else {
                continue;
            };
            for kind in mask.kinds() {
                for &index in cell.indices(kind) {
                    let Some(snapshot) = self.snapshots.get(index as usize) else {
                        continue;
                    };
                    if snapshot.distance_squared_to(center) <= radius_sq {
                        visit(snapshot);
                    }
                }
            }
        }
    }

    /// Empties the buffer for a new generation, keeping allocations.
    pub(crate) fn reset(&mut self, generation: u64) {
        self.generation = generation;
        self.snapshots.clear();
        self.dead.clear();
        self.guid_index.clear();
        self.population = [0; KIND_COUNT];
        for cell in self.cells.iter_mut() {
            cell.clear();
        }
    }

    /// Adds one snapshot, stamping it with this buffer's generation.
    ///
    /// A second snapshot with an already indexed GUID replaces the first.
    pub(crate) fn insert(&mut self, mut snapshot: EntitySnapshot) -> InsertOutcome {
        let guid = snapshot.guid();
        let position = snapshot.position();
        if guid.is_empty() || !position.point().is_finite() {
            return InsertOutcome::Skipped;
        }
        let Ok(index) = u32::try_from(self.snapshots.len()) else {
            return InsertOutcome::Skipped;
        };

        snapshot.header_mut().generation = self.generation;
        let kind = snapshot.kind();
        let cell = self.geometry.index_of(self.geometry.cell_of(position.x, position.y));

        let outcome = match self.guid_index.insert(guid, index) {
            Some(previous) => {
                self.retire(previous);
                InsertOutcome::Replaced
            }
            None => InsertOutcome::Inserted,
        };

        self.snapshots.push(snapshot);
        self.dead.push(false);
        self.cells[cell].push(kind, index);
        self.population[kind.index()] += 1;
        outcome
    }

    fn retire(&mut self, index: u32) {
        let Some(old) = self.snapshots.get(index as usize).copied() else {
            return;
        };
        let position = old.position();
        let cell = self.geometry.index_of(self.geometry.cell_of(position.x, position.y));
        self.cells[cell].remove(old.kind(), index);
        self.dead[index as usize] = true;
        self.population[old.kind().index()] -= 1;
    }
}
