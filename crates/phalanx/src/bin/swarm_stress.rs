//! # Swarm Stress
//!
//! One writer rebuilding a region at the configured cadence while many agent
//! threads hammer it with radius, nearest, line-of-sight, terrain and path
//! queries. Prints throughput, cache hit rates and rebuild timings, and exits
//! non-zero if any reader ever saw a torn or backwards generation, or if any
//! thread panicked.

use std::process::ExitCode;
use std::time::Duration;

use phalanx::simulation::{run_swarm, SwarmConfig, SwarmReport};
use phalanx::{telemetry, PhalanxConfig};
use phalanx_core::CacheStats;

fn main() -> ExitCode {
    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║         PHALANX - SWARM STRESS                                   ║");
    println!("║         ONE WRITER, MANY AGENTS                                  ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();

    let args: Vec<String> = std::env::args().collect();
    let mut swarm = SwarmConfig::default();
    let mut config_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--readers" | "-r" => {
                if i + 1 < args.len() {
                    swarm.readers = args[i + 1].parse().unwrap_or(64);
                    i += 1;
                }
            }
            "--seconds" | "-s" => {
                if i + 1 < args.len() {
                    swarm.duration = Duration::from_secs(args[i + 1].parse().unwrap_or(10));
                    i += 1;
                }
            }
            "--population" | "-p" => {
                if i + 1 < args.len() {
                    swarm.world.creatures = args[i + 1].parse().unwrap_or(5_000);
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--degrade" => swarm.degrade_midway = true,
            "--help" | "-h" => {
                println!("Usage: swarm_stress [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -r, --readers <N>      Agent threads (default: 64)");
                println!("  -s, --seconds <N>      Run time (default: 10)");
                println!("  -p, --population <N>  Creatures (default: 5000)");
                println!("  -c, --config <PATH>    TOML configuration");
                println!("      --degrade          Fail geometry halfway through");
                return ExitCode::SUCCESS;
            }
            _ => {}
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => match PhalanxConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{path}: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => PhalanxConfig::default(),
    };
    telemetry::init(&config.logging);

    println!("┌─ CONFIGURATION ─────────────────────────────────────────────────┐");
    println!("│ Readers:            {}", swarm.readers);
    println!("│ Duration:           {} seconds", swarm.duration.as_secs());
    println!("│ Creatures:          {}", swarm.world.creatures);
    println!("│ Players:            {}", swarm.world.players);
    println!("│ Arena Size:         {}x{}", swarm.world.arena_size, swarm.world.arena_size);
    println!("│ Rebuild Interval:   {} ms", config.grid.rebuild_interval_ms);
    println!("│ Cell Size:          {}", config.grid.default_cell_size);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();
    println!("Running...");

    let report = match run_swarm(&config, &swarm) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("swarm failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    print_report(&report, config.grid.rebuild_interval());

    let passed = report.passed();
    println!("╔══════════════════════════════════════════════════════════════════╗");
    if passed {
        println!("║  ✓ EVERY READ SAW EXACTLY ONE GENERATION                        ║");
    } else if report.panicked_threads > 0 {
        println!("║  ✗ SWARM THREADS PANICKED                                       ║");
    } else {
        println!("║  ✗ TORN OR BACKWARDS READS DETECTED                             ║");
    }
    println!("╚══════════════════════════════════════════════════════════════════╝");

    if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_report(report: &SwarmReport, interval: Duration) {
    println!();
    println!("┌─ QUERIES ───────────────────────────────────────────────────────┐");
    println!("│ Radius Queries:     {}", report.total_queries());
    println!("│ Queries / sec:      {:.0}", report.queries_per_sec());
    println!("│ LOS Checks:         {}", report.readers.iter().map(|r| r.los_checks).sum::<u64>());
    println!("│ Paths:              {}", report.readers.iter().map(|r| r.paths).sum::<u64>());
    println!("│ Torn Reads:         {}", report.torn_reads());
    println!("│ Backwards Steps:    {}", report.backwards());
    println!("│ Panicked Threads:   {}", report.panicked_threads);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    let grid = &report.region.grid;
    println!("┌─ REBUILDS ──────────────────────────────────────────────────────┐");
    println!("│ Generation:         {}", grid.generation);
    println!("│ Population:         {}", grid.population);
    println!("│ Budget:             {} μs", interval.as_micros());
    println!("│ Min Rebuild:        {} μs", report.cadence.min.as_micros());
    println!("│ Max Rebuild:        {} μs", report.cadence.max.as_micros());
    println!("│ Avg Rebuild:        {} μs", report.cadence.avg.as_micros());
    println!("│ Late Rebuilds:      {} / {}", report.cadence.late_cycles, report.cadence.cycles);
    println!("│ Buffer Reallocs:    {}", grid.buffer_reallocations);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    println!("┌─ CACHES ────────────────────────────────────────────────────────┐");
    print_cache("Terrain", &report.region.terrain);
    print_cache("LOS", &report.region.los);
    print_cache("Path", &report.region.path);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();
}

fn print_cache(name: &str, stats: &CacheStats) {
    println!(
        "│ {name:<8} hit {:>6.2}%  entries {:>7}  evicted {:>7}  failed {:>5}",
        stats.hit_rate() * 100.0,
        stats.entries,
        stats.evictions,
        stats.compute_failures
    );
}
