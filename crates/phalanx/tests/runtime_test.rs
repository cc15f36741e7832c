//! The runtime wired up from TOML, driven by the synthetic world.

use std::sync::Arc;
use std::time::Duration;

use phalanx::simulation::{SyntheticGeometry, SyntheticWorld, SyntheticWorldConfig};
use phalanx::{Phalanx, PhalanxConfig, PhalanxError, RegionConfig};
use phalanx_core::{FlatGeometry, GridError, KindMask, TerrainInfo, WorldGeometry};
use phalanx_shared::{RegionId, Vec3};

const CONFIG: &str = r#"
[grid]
rebuild_interval_ms = 100
default_cell_size = 64.0

[los_cache]
ttl_ms = 60000

[path_cache]
ttl_ms = 60000

[[regions]]
id = 0
min_x = 0.0
min_y = 0.0
max_x = 1024.0
max_y = 1024.0

[[regions]]
id = 1
min_x = -512.0
min_y = -512.0
max_x = 512.0
max_y = 512.0
cell_size = 32.0
"#;

fn small_world() -> SyntheticWorld {
    SyntheticWorld::new(SyntheticWorldConfig {
        seed: 3,
        arena_size: 1_024.0,
        creatures: 300,
        players: 20,
        game_objects: 40,
        effects: 8,
        churn: 0.0,
    })
}

fn flat(_: RegionId) -> Arc<dyn WorldGeometry> {
    Arc::new(FlatGeometry)
}

#[test]
fn test_startup_registers_configured_regions() {
    let config = PhalanxConfig::from_toml_str(CONFIG).unwrap();
    let mut runtime = Phalanx::new(config, flat).unwrap();

    assert_eq!(runtime.manager().region_ids(), vec![RegionId(0), RegionId(1)]);
    assert_eq!(runtime.rebuild_clock().interval(), Duration::from_millis(100));

    let small = runtime.region(RegionId(1)).unwrap();
    assert!((small.grid().geometry().cell_size() - 32.0).abs() < f32::EPSILON);

    assert!(runtime.take_writer(RegionId(0)).is_some());
    assert!(runtime.take_writer(RegionId(0)).is_none());
    assert!(runtime.take_writer(RegionId(7)).is_none());
}

#[test]
fn test_world_thread_publishes_to_agents() {
    let config = PhalanxConfig::from_toml_str(CONFIG).unwrap();
    let mut runtime = Phalanx::new(config, flat).unwrap();
    let mut writer = runtime.take_writer(RegionId(0)).unwrap();
    let region = runtime.region(RegionId(0)).unwrap();

    let mut world = small_world();
    let report = writer.rebuild_and_swap(world.objects());
    assert_eq!(report.population, world.live_count());

    let view = region.load();
    assert_eq!(view.generation(), 1);
    assert_eq!(view.population(), world.live_count());

    world.step(0.1);
    writer.rebuild_and_swap(world.objects());

    // The old view still answers from generation 1.
    assert_eq!(view.generation(), 1);
    assert_eq!(region.load().generation(), 2);

    let everything = region.query_radius(Vec3::new(512.0, 512.0, 0.0), 2_000.0, KindMask::ALL);
    assert_eq!(everything.len(), world.live_count());
    assert!(everything.iter().all(|s| s.generation() == 2));
}

#[test]
fn test_invalid_document_is_a_config_error() {
    let duplicate = r#"
[[regions]]
id = 4
min_x = 0.0
min_y = 0.0
max_x = 10.0
max_y = 10.0

[[regions]]
id = 4
min_x = 0.0
min_y = 0.0
max_x = 10.0
max_y = 10.0
"#;
    assert!(PhalanxConfig::from_toml_str(duplicate).is_err());

    let mut config = PhalanxConfig::default();
    config.grid.rebuild_interval_ms = 0;
    let err = Phalanx::new(config, flat).err().unwrap();
    assert!(matches!(err, PhalanxError::Config(_)));
}

#[test]
fn test_unload_and_reload_region() {
    let config = PhalanxConfig::from_toml_str(CONFIG).unwrap();
    let mut runtime = Phalanx::new(config.clone(), flat).unwrap();
    let writer = runtime.take_writer(RegionId(1)).unwrap();
    let region = runtime.region(RegionId(1)).unwrap();

    assert!(runtime.unload_region(RegionId(1)));
    assert!(!runtime.unload_region(RegionId(1)));
    assert!(runtime.region(RegionId(1)).is_none());
    assert!(writer.is_retired());
    assert!(region.is_unloaded());

    let reloaded = runtime.load_region(&config.regions[1], Arc::new(FlatGeometry)).unwrap();
    assert!(!reloaded.is_retired());

    let err = runtime.load_region(&config.regions[1], Arc::new(FlatGeometry)).err().unwrap();
    assert_eq!(err, GridError::AlreadyRegistered(RegionId(1)));
}

#[test]
fn test_failing_geometry_degrades_and_recovers() {
    let geometry = Arc::new(SyntheticGeometry::random(11, 1_024.0, 0));
    let source: Arc<dyn WorldGeometry> = geometry.clone();

    let mut config = PhalanxConfig::default();
    config.regions.push(RegionConfig {
        id: RegionId(0),
        min_x: 0.0,
        min_y: 0.0,
        max_x: 1_024.0,
        max_y: 1_024.0,
        cell_size: None,
    });
    let runtime = Phalanx::new(config, |_| Arc::clone(&source)).unwrap();
    let region = runtime.region(RegionId(0)).unwrap();

    let a = Vec3::new(10.0, 10.0, 0.0);
    let b = Vec3::new(900.0, 900.0, 0.0);

    geometry.set_failing(true);
    let los = region.has_los(a, b);
    assert!(!los.value);
    assert!(!los.was_hit);
    assert_eq!(region.terrain_at(300.0, 300.0).value, TerrainInfo::UNKNOWN);
    let path = region.find_path(a, b).value;
    assert!(path.is_fallback());
    assert_eq!(path.end(), Some(b));

    // Nothing from the outage was cached.
    let stats = region.stats();
    assert_eq!(stats.los.entries, 0);
    assert_eq!(stats.terrain.entries, 0);
    assert_eq!(stats.path.entries, 0);
    assert_eq!(stats.los.compute_failures, 1);

    geometry.set_failing(false);
    // No pillars: the way is clear.
    let los = region.has_los(a, b);
    assert!(los.value);
    assert!(!los.was_hit);
    assert!(region.has_los(b, a).was_hit);
    assert!(region.terrain_at(300.0, 300.0).value.is_known());
    assert!(!region.find_path(a, b).value.is_fallback());
}
