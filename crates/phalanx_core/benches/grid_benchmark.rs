//! # Grid Benchmark
//!
//! Measures the two costs that matter:
//! 1. Radius queries against a populated front buffer (reader hot path)
//! 2. A full rebuild + swap of a region (writer, once per interval)
//!
//! Target: a 30-unit query well under 10 µs at 10k entities per region.

#![allow(missing_docs)]

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use phalanx_core::{
    query, CacheConfig, CreatureSnapshot, EntitySnapshot, FlatGeometry, GridConfig, GridManager, KindMask,
    RegionBounds, SnapshotHeader, StatusFlags,
};
use phalanx_shared::{HighGuid, ObjectGuid, Position, RegionId, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const EXTENT: f32 = 4_096.0;

fn population(count: usize, seed: u64) -> Vec<EntitySnapshot> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            EntitySnapshot::Creature(CreatureSnapshot {
                header: SnapshotHeader::new(
                    ObjectGuid::new(HighGuid::Creature, i as u64 + 1),
                    Position::at(rng.gen_range(0.0..EXTENT), rng.gen_range(0.0..EXTENT), 0.0),
                    StatusFlags::ALIVE,
                ),
                entry: 1,
                level: 1,
                health: 1.0,
                faction: 7,
                elite: false,
                target: ObjectGuid::EMPTY,
            })
        })
        .collect()
}

fn bench_query_radius(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_query_radius");

    for entity_count in [1_000, 10_000, 50_000] {
        let manager = GridManager::new(GridConfig::default(), CacheConfig::default()).unwrap();
        let mut writer = manager
            .register_region(RegionId(1), RegionBounds::square(0.0, 0.0, 64.0, 64), 64.0, Arc::new(FlatGeometry))
            .unwrap();
        writer.rebuild_and_swap(population(entity_count, 42));
        let region = manager.get_grid(RegionId(1)).unwrap();
        let view = region.load();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        group.bench_with_input(BenchmarkId::new("radius_30", entity_count), &entity_count, |b, _| {
            b.iter(|| {
                let center = Vec3::new(rng.gen_range(0.0..EXTENT), rng.gen_range(0.0..EXTENT), 0.0);
                black_box(query::count_within(&view, black_box(center), 30.0, KindMask::CREATURE))
            });
        });

        group.bench_with_input(BenchmarkId::new("load_and_query", entity_count), &entity_count, |b, _| {
            b.iter(|| {
                let center = Vec3::new(rng.gen_range(0.0..EXTENT), rng.gen_range(0.0..EXTENT), 0.0);
                black_box(region.query_radius(black_box(center), 30.0, KindMask::ALL))
            });
        });
    }

    group.finish();
}

fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_rebuild_and_swap");
    group.sample_size(20);

    for entity_count in [1_000, 10_000, 50_000] {
        let manager = GridManager::new(GridConfig::default(), CacheConfig::default()).unwrap();
        let mut writer = manager
            .register_region(RegionId(1), RegionBounds::square(0.0, 0.0, 64.0, 64), 64.0, Arc::new(FlatGeometry))
            .unwrap();
        let objects = population(entity_count, 42);

        group.bench_with_input(BenchmarkId::from_parameter(entity_count), &entity_count, |b, _| {
            b.iter(|| black_box(writer.rebuild_and_swap(objects.iter().copied())));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_query_radius, bench_rebuild);
criterion_main!(benches);
