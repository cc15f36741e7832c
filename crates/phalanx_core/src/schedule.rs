//! # Rebuild Cadence
//!
//! Fixed-interval controller for the world thread that drives a
//! [`GridWriter`](crate::GridWriter).
//!
//! ```text
//! loop {
//!     if clock.should_rebuild() {
//!         let start = clock.begin();
//!         writer.rebuild_and_swap(world.objects());
//!         clock.end(start);
//!     }
//!     clock.wait_for_next();
//! }
//! ```
//!
//! Unlike a simulation tick, missed rebuilds are not caught up: a snapshot is
//! only as good as the latest one, so at most one rebuild is ever pending.

use std::time::{Duration, Instant};

/// Rebuild timing statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CadenceStats {
    /// Shortest rebuild observed.
    pub min: Duration,
    /// Longest rebuild observed.
    pub max: Duration,
    /// Rolling average (1/16 weight per sample).
    pub avg: Duration,
    /// Rebuilds that took longer than the interval.
    pub late_cycles: u64,
    /// Rebuilds measured.
    pub cycles: u64,
}

impl CadenceStats {
    fn empty(interval: Duration) -> Self {
        Self {
            min: Duration::MAX,
            max: Duration::ZERO,
            avg: interval,
            late_cycles: 0,
            cycles: 0,
        }
    }
}

/// Fixed-interval rebuild controller.
#[derive(Debug)]
pub struct RebuildClock {
    interval: Duration,
    last_poll: Instant,
    accumulator: Duration,
    cycle_count: u64,
    stats: CadenceStats,
}

impl RebuildClock {
    /// Creates a clock firing every `interval`.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_poll: Instant::now(),
            accumulator: Duration::ZERO,
            cycle_count: 0,
            stats: CadenceStats::empty(interval),
        }
    }

    /// True if a rebuild is due.
    #[must_use]
    pub fn should_rebuild(&mut self) -> bool {
        let now = Instant::now();
        self.accumulator += now.duration_since(self.last_poll);
        self.last_poll = now;
        // Never queue more than one overdue rebuild.
        self.accumulator = self.accumulator.min(self.interval);
        self.accumulator >= self.interval
    }

    /// Marks the start of a rebuild and returns its start time.
    #[must_use]
    pub fn begin(&mut self) -> Instant {
        self.accumulator = self.accumulator.saturating_sub(self.interval);
        self.cycle_count += 1;
        Instant::now()
    }

    /// Marks the end of the rebuild started at `start`.
    pub fn end(&mut self, start: Instant) {
        self.record(start.elapsed());
    }

    fn record(&mut self, duration: Duration) {
        let stats = &mut self.stats;
        stats.cycles += 1;
        stats.min = stats.min.min(duration);
        stats.max = stats.max.max(duration);
        stats.avg = (stats.avg * 15 + duration) / 16;
        if duration > self.interval {
            stats.late_cycles += 1;
        }
    }

    /// Sleeps until the next rebuild is due.
    pub fn wait_for_next(&self) {
        let elapsed = self.last_poll.elapsed() + self.accumulator;
        if elapsed < self.interval {
            std::thread::sleep(self.interval - elapsed);
        }
    }

    /// Rebuilds started so far.
    #[must_use]
    pub const fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Timing statistics.
    #[must_use]
    pub const fn stats(&self) -> &CadenceStats {
        &self.stats
    }

    /// Target interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Clears the statistics.
    pub fn reset_stats(&mut self) {
        self.stats = CadenceStats::empty(self.interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_creation() {
        let clock = RebuildClock::new(Duration::from_millis(200));
        assert_eq!(clock.cycle_count(), 0);
        assert_eq!(clock.interval(), Duration::from_millis(200));
        assert_eq!(clock.stats().cycles, 0);
    }

    #[test]
    fn test_rebuild_becomes_due() {
        let mut clock = RebuildClock::new(Duration::from_millis(50));
        std::thread::sleep(Duration::from_millis(120));
        assert!(clock.should_rebuild());
        let start = clock.begin();
        clock.end(start);
        assert_eq!(clock.cycle_count(), 1);
        // The overdue backlog was capped at one interval.
        assert!(!clock.should_rebuild());
    }

    #[test]
    fn test_late_cycles_counted() {
        let mut clock = RebuildClock::new(Duration::from_millis(10));
        clock.record(Duration::from_millis(4));
        clock.record(Duration::from_millis(25));
        let stats = clock.stats();
        assert_eq!(stats.cycles, 2);
        assert_eq!(stats.late_cycles, 1);
        assert_eq!(stats.min, Duration::from_millis(4));
        assert_eq!(stats.max, Duration::from_millis(25));
        clock.reset_stats();
        assert_eq!(clock.stats().cycles, 0);
    }
}
