//! Many readers, one writer, one region.
//!
//! ```text
//!  writer thread                       reader threads (N)
//!  ┌───────────────────────┐           ┌──────────────────────────────┐
//!  │ clock.should_rebuild  │           │ view = region.load()         │
//!  │ world.step            │  swap ──► │ radius / nearest / LOS /     │
//!  │ rebuild_and_swap      │           │ terrain / path queries       │
//!  └───────────┬───────────┘           │ check generation stamps      │
//!              │                       └──────────────┬───────────────┘
//!              └────── stop (channel closed) ─────────┘
//!                                  reports ──► main thread
//! ```

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, TryRecvError};
use phalanx_core::{query, CadenceStats, GridError, KindMask, Region, RegionStats, WorldGeometry};
use phalanx_shared::{RegionId, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, info};

use super::geometry::SyntheticGeometry;
use super::world::{SyntheticWorld, SyntheticWorldConfig};
use crate::config::{PhalanxConfig, RegionConfig};
use crate::{Phalanx, PhalanxError};

/// Region the swarm runs in.
pub const SWARM_REGION: RegionId = RegionId(0);

/// Shape of one soak run.
#[derive(Clone, Debug)]
pub struct SwarmConfig {
    /// Reader threads.
    pub readers: usize,
    /// Wall time of the run.
    pub duration: Duration,
    /// Population and arena.
    pub world: SyntheticWorldConfig,
    /// Pillars in the arena.
    pub pillars: usize,
    /// Switch the geometry into failing mode halfway through.
    pub degrade_midway: bool,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            readers: 64,
            duration: Duration::from_secs(10),
            world: SyntheticWorldConfig::default(),
            pillars: 400,
            degrade_midway: false,
        }
    }
}

/// What one reader thread saw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReaderReport {
    /// Radius queries issued.
    pub queries: u64,
    /// Snapshots whose generation differed from their view's.
    pub torn_reads: u64,
    /// Times a later view had a lower generation than an earlier one.
    pub backwards: u64,
    /// First generation observed.
    pub first_generation: u64,
    /// Last generation observed.
    pub last_generation: u64,
    /// Line-of-sight checks issued.
    pub los_checks: u64,
    /// Paths requested.
    pub paths: u64,
}

/// Outcome of a soak run.
#[derive(Clone, Debug)]
pub struct SwarmReport {
    /// Wall time.
    pub elapsed: Duration,
    /// Per-reader reports.
    pub readers: Vec<ReaderReport>,
    /// Writer cadence.
    pub cadence: CadenceStats,
    /// Final grid and cache counters.
    pub region: RegionStats,
    /// Reader or writer threads that panicked instead of reporting.
    pub panicked_threads: usize,
}

impl SwarmReport {
    /// Radius queries across all readers.
    #[must_use]
    pub fn total_queries(&self) -> u64 {
        self.readers.iter().map(|r| r.queries).sum()
    }

    /// Torn reads across all readers. Anything but zero is a bug.
    #[must_use]
    pub fn torn_reads(&self) -> u64 {
        self.readers.iter().map(|r| r.torn_reads).sum()
    }

    /// Backwards generation steps across all readers. Anything but zero is a bug.
    #[must_use]
    pub fn backwards(&self) -> u64 {
        self.readers.iter().map(|r| r.backwards).sum()
    }

    /// True if every thread finished and every read saw one generation.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.panicked_threads == 0 && self.torn_reads() == 0 && self.backwards() == 0
    }

    /// Radius queries per second.
    #[must_use]
    pub fn queries_per_sec(&self) -> f64 {
        self.total_queries() as f64 / self.elapsed.as_secs_f64().max(f64::EPSILON)
    }
}

/// Runs one soak: a writer rebuilding at `config.grid`'s cadence and
/// `swarm.readers` workers querying until `swarm.duration` has passed.
///
/// `config.regions` is replaced by a single region covering the arena.
///
/// # Errors
///
/// Returns an error if `config` is invalid or a thread cannot be spawned.
pub fn run_swarm(config: &PhalanxConfig, swarm: &SwarmConfig) -> Result<SwarmReport, PhalanxError> {
    let arena = swarm.world.arena_size;
    let mut config = config.clone();
    config.regions = vec![RegionConfig {
        id: SWARM_REGION,
        min_x: 0.0,
        min_y: 0.0,
        max_x: arena,
        max_y: arena,
        cell_size: None,
    }];

    let geometry = Arc::new(SyntheticGeometry::random(swarm.world.seed, arena, swarm.pillars));
    let source: Arc<dyn WorldGeometry> = geometry.clone();
    let mut runtime = Phalanx::new(config, |_| Arc::clone(&source))?;
    let region = runtime
        .region(SWARM_REGION)
        .ok_or(GridError::RegionNotFound(SWARM_REGION))?;
    let mut writer = runtime
        .take_writer(SWARM_REGION)
        .ok_or(GridError::RegionNotFound(SWARM_REGION))?;
    let mut clock = runtime.rebuild_clock();

    // Publish a first generation so readers start on real data.
    let mut world = SyntheticWorld::new(swarm.world.clone());
    writer.rebuild_and_swap(world.objects());

    info!(
        readers = swarm.readers,
        population = world.live_count(),
        duration_ms = swarm.duration.as_millis() as u64,
        "swarm starting"
    );

    let (stop_tx, stop_rx) = unbounded::<()>();
    let (report_tx, report_rx) = unbounded::<ReaderReport>();

    let writer_stop = stop_rx.clone();
    let writer_thread = thread::Builder::new()
        .name("world".to_owned())
        .spawn(move || {
            let dt = clock.interval().as_secs_f32();
            while writer_stop.try_recv() != Err(TryRecvError::Disconnected) {
                if clock.should_rebuild() {
                    let start = clock.begin();
                    world.step(dt);
                    writer.rebuild_and_swap(world.objects());
                    clock.end(start);
                }
                clock.wait_for_next();
            }
            *clock.stats()
        })?;

    let mut reader_threads = Vec::with_capacity(swarm.readers);
    for index in 0..swarm.readers {
        let region = Arc::clone(&region);
        let stop = stop_rx.clone();
        let reports = report_tx.clone();
        let seed = swarm.world.seed ^ (index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        let handle = thread::Builder::new()
            .name(format!("reader-{index}"))
            .spawn(move || {
                let report = read_until_stopped(&region, &stop, seed, arena);
                // The receiver outlives every reader.
                let _ = reports.send(report);
            })?;
        reader_threads.push(handle);
    }
    drop(report_tx);
    drop(stop_rx);

    let start = Instant::now();
    if swarm.degrade_midway {
        thread::sleep(swarm.duration / 2);
        info!("geometry entering failing mode");
        geometry.set_failing(true);
        thread::sleep(swarm.duration - swarm.duration / 2);
    } else {
        thread::sleep(swarm.duration);
    }
    drop(stop_tx);

    let readers: Vec<ReaderReport> = report_rx.iter().collect();
    let (_, mut panicked_threads) = join_all(reader_threads);
    let (cadence, writer_panicked) = join_all(vec![writer_thread]);
    panicked_threads += writer_panicked;
    let cadence = cadence.into_iter().next().unwrap_or_default();
    let elapsed = start.elapsed();
    if panicked_threads > 0 {
        error!(panicked_threads, "swarm threads panicked");
    }

    let report = SwarmReport {
        elapsed,
        readers,
        cadence,
        region: region.stats(),
        panicked_threads,
    };
    info!(
        queries = report.total_queries(),
        torn_reads = report.torn_reads(),
        generation = report.region.grid.generation,
        passed = report.passed(),
        "swarm finished"
    );
    Ok(report)
}

/// Joins every handle, returning the values of the threads that finished and
/// the number that panicked.
fn join_all<T>(handles: Vec<JoinHandle<T>>) -> (Vec<T>, usize) {
    let mut finished = Vec::with_capacity(handles.len());
    let mut panicked = 0;
    for handle in handles {
        match handle.join() {
            Ok(value) => finished.push(value),
            Err(_) => panicked += 1,
        }
    }
    (finished, panicked)
}

fn read_until_stopped(region: &Region, stop: &Receiver<()>, seed: u64, arena: f32) -> ReaderReport {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut report = ReaderReport::default();
    let mut first = true;

    while stop.try_recv() != Err(TryRecvError::Disconnected) {
        let view = region.load();
        let generation = view.generation();
        if first {
            report.first_generation = generation;
            first = false;
        } else if generation < report.last_generation {
            report.backwards += 1;
        }
        report.last_generation = generation;

        let me = Vec3::new(rng.gen_range(0.0..arena), rng.gen_range(0.0..arena), 0.0);
        let around = query::within_radius(&view, me, 40.0, KindMask::ALL);
        report.torn_reads += around.iter().filter(|s| s.generation() != generation).count() as u64;
        report.queries += 1;

        let target = query::nearest(&view, me, 40.0, KindMask::CREATURE, |s| s.is_alive() && s.is_hostile());
        if let Some(target) = target {
            if target.generation() != generation {
                report.torn_reads += 1;
            }
            let there = target.position().point();
            let _ = region.has_los(me, there);
            report.los_checks += 1;
            if report.queries % 16 == 0 {
                let _ = region.find_path(me, there);
                report.paths += 1;
            }
        }
        let _ = region.terrain_at(me.x, me.y);
    }

    debug!(
        queries = report.queries,
        first = report.first_generation,
        last = report.last_generation,
        "reader stopped"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_swarm(degrade_midway: bool) -> SwarmConfig {
        SwarmConfig {
            readers: 8,
            duration: Duration::from_millis(400),
            world: SyntheticWorldConfig {
                arena_size: 1_024.0,
                creatures: 500,
                players: 50,
                game_objects: 100,
                effects: 10,
                ..SyntheticWorldConfig::default()
            },
            pillars: 40,
            degrade_midway,
        }
    }

    fn fast_config() -> PhalanxConfig {
        let mut config = PhalanxConfig::default();
        config.grid.rebuild_interval_ms = 20;
        config
    }

    #[test]
    fn test_swarm_has_no_torn_reads() {
        let report = run_swarm(&fast_config(), &short_swarm(false)).unwrap();
        assert_eq!(report.readers.len(), 8);
        assert_eq!(report.torn_reads(), 0);
        assert_eq!(report.backwards(), 0);
        assert!(report.total_queries() > 0);
        assert!(report.region.grid.generation >= 2);
        assert_eq!(report.panicked_threads, 0);
        assert!(report.passed());
    }

    #[test]
    fn test_join_all_counts_panics() {
        let handles = vec![
            thread::spawn(|| 1_u32),
            thread::spawn(|| -> u32 { panic!("reader died") }),
            thread::spawn(|| 3_u32),
        ];
        let (finished, panicked) = join_all(handles);
        assert_eq!(finished, vec![1, 3]);
        assert_eq!(panicked, 1);
    }

    #[test]
    fn test_panicked_thread_fails_the_run() {
        let mut report = run_swarm(
            &fast_config(),
            &SwarmConfig {
                readers: 2,
                duration: Duration::from_millis(50),
                ..short_swarm(false)
            },
        )
        .unwrap();
        assert!(report.passed());

        report.panicked_threads = 1;
        assert!(!report.passed());
        assert_eq!(report.torn_reads(), 0);
    }

    #[test]
    fn test_swarm_survives_failing_geometry() {
        let report = run_swarm(&fast_config(), &short_swarm(true)).unwrap();
        assert_eq!(report.torn_reads(), 0);
        let failures =
            report.region.terrain.compute_failures + report.region.los.compute_failures + report.region.path.compute_failures;
        assert!(failures > 0);
    }
}
