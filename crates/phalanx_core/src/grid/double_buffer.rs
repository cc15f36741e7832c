//! # Double-Buffered Grid
//!
//! One writer rebuilds, any number of readers query, nobody waits on a rebuild.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌────────────────────────────────────┐
//!                 │         DoubleBufferedGrid         │
//!                 │                                    │
//!                 │   front: Arc<GridBuffer> (gen N)   │◄──── load() ──── readers
//!                 │   generation: N                    │      (pin gen N, query
//!                 └──────────────────▲─────────────────┘       as long as they like)
//!                                    │ swap (pointer exchange)
//!                 ┌──────────────────┴─────────────────┐
//!                 │             GridWriter             │
//!                 │   back: GridBuffer (gen N+1)       │◄──── rebuild(enumerator)
//!                 │   owned, never visible to readers  │      (single world thread)
//!                 └────────────────────────────────────┘
//! ```
//!
//! ## Thread Safety
//!
//! - `GridWriter`: the only way to fill a back buffer or publish one. It is
//!   not `Clone`, so a region has exactly one writer by construction.
//! - `GridView`: a reference-counted pin of one published buffer. It stays
//!   valid after later swaps and after the region is unregistered.
//! - The front slot is an `ArcSwap`: readers take a strong reference without
//!   any lock and the writer publishes with a single atomic exchange. Readers
//!   never wait on the writer, nor the writer on readers.

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use phalanx_shared::{ObjectGuid, RegionId, Vec3};

use super::buffer::{GridBuffer, InsertOutcome};
use super::geometry::GridGeometry;
use crate::error::GridError;
use crate::snapshot::{EntitySnapshot, KindMask, WorldObject};
use crate::stats::{GridCounters, GridStats};

/// A pinned, immutable published buffer.
///
/// Every query made through one view sees exactly one generation, no matter
/// how many swaps happen meanwhile.
#[derive(Clone, Debug)]
pub struct GridView {
    buffer: Arc<GridBuffer>,
}

impl GridView {
    /// Snapshots of the selected kinds within `radius` of `center`.
    #[must_use]
    pub fn query_radius(&self, center: Vec3, radius: f32, mask: KindMask) -> Vec<&EntitySnapshot> {
        let mut out = Vec::new();
        self.buffer.for_each_within(center, radius, mask, |s| out.push(s));
        out
    }

    /// Snapshot by GUID.
    #[inline]
    #[must_use]
    pub fn query_by_guid(&self, guid: ObjectGuid) -> Option<&EntitySnapshot> {
        self.buffer.get(guid)
    }

    /// True if both views pin the very same buffer.
    #[must_use]
    pub fn same_buffer(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }
}

impl Deref for GridView {
    type Target = GridBuffer;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

/// Read half of a region's grid. Shared by every reader thread.
#[derive(Debug)]
pub struct DoubleBufferedGrid {
    region: RegionId,
    geometry: GridGeometry,
    front: ArcSwap<GridBuffer>,
    generation: AtomicU64,
    retired: AtomicBool,
    counters: GridCounters,
}

impl DoubleBufferedGrid {
    /// Creates the grid and its unique writer.
    ///
    /// The initial front buffer is empty at generation 0.
    #[must_use]
    pub fn new(region: RegionId, geometry: GridGeometry, rebuild_budget: Duration) -> (Arc<Self>, GridWriter) {
        let grid = Arc::new(Self {
            region,
            geometry,
            front: ArcSwap::from_pointee(GridBuffer::new(geometry)),
            generation: AtomicU64::new(0),
            retired: AtomicBool::new(false),
            counters: GridCounters::default(),
        });
        let writer = GridWriter {
            grid: Arc::clone(&grid),
            back: Some(GridBuffer::new(geometry)),
            back_ready: false,
            budget: rebuild_budget,
        };
        (grid, writer)
    }

    /// Region this grid covers.
    #[inline]
    #[must_use]
    pub const fn region(&self) -> RegionId {
        self.region
    }

    /// Cell layout.
    #[inline]
    #[must_use]
    pub const fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Generation currently published.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Pins the current front buffer.
    #[inline]
    #[must_use]
    pub fn load(&self) -> GridView {
        GridView {
            buffer: self.front.load_full(),
        }
    }

    /// Copies of the snapshots of the selected kinds within `radius` of
    /// `center`. The front buffer is captured once for the whole scan.
    #[must_use]
    pub fn query_radius(&self, center: Vec3, radius: f32, mask: KindMask) -> Vec<EntitySnapshot> {
        let view = self.load();
        let mut out = Vec::new();
        view.for_each_within(center, radius, mask, |s| out.push(*s));
        out
    }

    /// Copy of the snapshot with this GUID in the current front buffer.
    #[must_use]
    pub fn query_by_guid(&self, guid: ObjectGuid) -> Option<EntitySnapshot> {
        self.load().get(guid).copied()
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> GridStats {
        let view = self.load();
        GridStats::from_counters(&self.counters, view.generation(), view.population_by_kind())
    }

    /// True once the region has been unregistered.
    #[must_use]
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    pub(crate) fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }
}

/// Outcome of one rebuild.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RebuildReport {
    /// Generation the back buffer will publish as.
    pub generation: u64,
    /// Snapshots indexed.
    pub population: usize,
    /// Objects that declined capture.
    pub not_captured: usize,
    /// Objects rejected by the grid (null GUID, non-finite position).
    pub skipped: usize,
    /// Objects replaced by a later duplicate GUID.
    pub replaced: usize,
    /// Wall time of the rebuild.
    pub elapsed: Duration,
    /// True if `elapsed` exceeded the soft budget.
    pub over_budget: bool,
}

/// Write half of a region's grid.
///
/// Owned by the single world thread. Holds the back buffer by value, so no
/// reader can ever observe it under construction.
#[derive(Debug)]
pub struct GridWriter {
    grid: Arc<DoubleBufferedGrid>,
    /// `None` after a swap where a reader still pinned the retired front.
    back: Option<GridBuffer>,
    back_ready: bool,
    budget: Duration,
}

impl GridWriter {
    /// The read half this writer publishes into.
    #[must_use]
    pub fn grid(&self) -> &Arc<DoubleBufferedGrid> {
        &self.grid
    }

    /// Soft budget per rebuild.
    #[must_use]
    pub const fn budget(&self) -> Duration {
        self.budget
    }

    /// True once the region has been unregistered; the world thread should
    /// stop driving this writer.
    #[must_use]
    pub fn is_retired(&self) -> bool {
        self.grid.is_retired()
    }

    /// Fills the back buffer from one pass over the enumerator.
    ///
    /// The enumerator is consumed exactly once. A rebuild that overruns its
    /// soft budget still completes; the overrun is logged and counted.
    pub fn rebuild_back_buffer<I>(&mut self, objects: I) -> RebuildReport
    where
        I: IntoIterator,
        I::Item: WorldObject,
    {
        let start = Instant::now();
        let generation = self.grid.generation() + 1;
        let geometry = self.grid.geometry;
        let back = self.back.get_or_insert_with(|| GridBuffer::new(geometry));
        back.reset(generation);

        let mut not_captured = 0usize;
        let mut skipped = 0usize;
        let mut replaced = 0usize;
        for object in objects {
            let Some(snapshot) = object.capture() else {
                not_captured += 1;
                continue;
            };
            match back.insert(snapshot) {
                InsertOutcome::Inserted => {}
                InsertOutcome::Replaced => replaced += 1,
                InsertOutcome::Skipped => skipped += 1,
            }
        }
        let population = back.population();
        self.back_ready = true;

        let elapsed = start.elapsed();
        let over_budget = elapsed > self.budget;
        self.grid
            .counters
            .record_rebuild(elapsed, over_budget, skipped as u64, replaced as u64);
        if over_budget {
            let err = GridError::SoftBudgetExceeded {
                region: self.grid.region,
                elapsed,
                budget: self.budget,
            };
            tracing::warn!(region = %self.grid.region, generation, population, "{err}");
        }
        if skipped > 0 {
            tracing::debug!(region = %self.grid.region, generation, skipped, "objects without a usable guid or position");
        }

        RebuildReport {
            generation,
            population,
            not_captured,
            skipped,
            replaced,
            elapsed,
            over_budget,
        }
    }

    /// Publishes the back buffer and returns the new generation.
    ///
    /// The retired front becomes the next back buffer when no reader still
    /// pins it. Without a rebuild since the last swap this is a no-op that
    /// returns the current generation.
    pub fn swap_buffers(&mut self) -> u64 {
        if !self.back_ready {
            return self.grid.generation();
        }
        let Some(back) = self.back.take() else {
            return self.grid.generation();
        };
        let generation = back.generation();
        let published = Arc::new(back);

        let retired = self.grid.front.swap(published);
        self.grid.generation.store(generation, Ordering::Release);
        self.back_ready = false;
        self.grid.counters.swaps.fetch_add(1, Ordering::Relaxed);
        if generation % 1_000 == 0 {
            tracing::info!(region = %self.grid.region, generation, "published");
        }

        match Arc::try_unwrap(retired) {
            Ok(buffer) => self.back = Some(buffer),
            Err(pinned) => {
                // Readers still hold the old generation; it is freed when the
                // last of them lets go.
                drop(pinned);
                self.grid.counters.buffer_reallocations.fetch_add(1, Ordering::Relaxed);
            }
        }
        generation
    }

    /// Rebuild followed by swap.
    pub fn rebuild_and_swap<I>(&mut self, objects: I) -> RebuildReport
    where
        I: IntoIterator,
        I::Item: WorldObject,
    {
        let report = self.rebuild_back_buffer(objects);
        self.swap_buffers();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::geometry::RegionBounds;
    use crate::snapshot::{CreatureSnapshot, SnapshotHeader, StatusFlags};
    use phalanx_shared::{HighGuid, Position};

    fn grid() -> (Arc<DoubleBufferedGrid>, GridWriter) {
        let geometry = GridGeometry::new(RegionBounds::square(0.0, 0.0, 64.0, 16), 64.0).unwrap();
        DoubleBufferedGrid::new(RegionId(1), geometry, Duration::from_secs(1))
    }

    fn creature(counter: u64, x: f32, y: f32) -> EntitySnapshot {
        EntitySnapshot::Creature(CreatureSnapshot {
            header: SnapshotHeader::new(
                ObjectGuid::new(HighGuid::Creature, counter),
                Position::at(x, y, 0.0),
                StatusFlags::ALIVE | StatusFlags::HOSTILE,
            ),
            entry: 1,
            level: 10,
            health: 1.0,
            faction: 14,
            elite: false,
            target: ObjectGuid::EMPTY,
        })
    }

    #[test]
    fn test_initial_state() {
        let (grid, _writer) = grid();
        assert_eq!(grid.generation(), 0);
        assert_eq!(grid.load().population(), 0);
        assert!(grid.query_radius(Vec3::new(10.0, 10.0, 0.0), 100.0, KindMask::ALL).is_empty());
    }

    #[test]
    fn test_rebuild_is_invisible_until_swap() {
        let (grid, mut writer) = grid();
        let report = writer.rebuild_back_buffer([creature(1, 100.0, 100.0)]);
        assert_eq!(report.generation, 1);
        assert_eq!(report.population, 1);
        assert!(grid.query_by_guid(ObjectGuid::new(HighGuid::Creature, 1)).is_none());

        assert_eq!(writer.swap_buffers(), 1);
        assert_eq!(grid.generation(), 1);
        let found = grid.query_by_guid(ObjectGuid::new(HighGuid::Creature, 1)).unwrap();
        assert_eq!(found.generation(), 1);
    }

    #[test]
    fn test_swap_without_rebuild_is_noop() {
        let (grid, mut writer) = grid();
        writer.rebuild_and_swap([creature(1, 100.0, 100.0)]);
        assert_eq!(writer.swap_buffers(), 1);
        assert_eq!(grid.load().population(), 1);
    }

    #[test]
    fn test_buffer_reuse_when_unpinned() {
        let (grid, mut writer) = grid();
        for i in 0..5 {
            writer.rebuild_and_swap([creature(1, 10.0 * i as f32, 10.0)]);
        }
        let stats = grid.stats();
        assert_eq!(stats.generation, 5);
        assert_eq!(stats.swaps, 5);
        assert_eq!(stats.buffer_reallocations, 0);
    }

    #[test]
    fn test_pinned_view_survives_swaps() {
        let (grid, mut writer) = grid();
        writer.rebuild_and_swap([creature(1, 100.0, 100.0)]);
        let pinned = grid.load();

        writer.rebuild_and_swap([creature(2, 200.0, 200.0)]);
        writer.rebuild_and_swap([creature(3, 300.0, 300.0)]);

        assert_eq!(pinned.generation(), 1);
        assert!(pinned.query_by_guid(ObjectGuid::new(HighGuid::Creature, 1)).is_some());
        assert!(pinned.query_by_guid(ObjectGuid::new(HighGuid::Creature, 3)).is_none());
        assert_eq!(grid.stats().buffer_reallocations, 1);

        let current = grid.load();
        assert_eq!(current.generation(), 3);
        assert!(!current.same_buffer(&pinned));
    }

    #[test]
    fn test_over_budget_still_swaps() {
        let geometry = GridGeometry::new(RegionBounds::square(0.0, 0.0, 64.0, 16), 64.0).unwrap();
        let (grid, mut writer) = DoubleBufferedGrid::new(RegionId(2), geometry, Duration::ZERO);
        let slow = (0..1000u64).map(|i| creature(i + 1, (i % 1000) as f32, 5.0));
        let report = writer.rebuild_and_swap(slow);
        assert!(report.over_budget);
        assert_eq!(grid.generation(), 1);
        assert_eq!(grid.stats().soft_budget_overruns, 1);
    }
}
