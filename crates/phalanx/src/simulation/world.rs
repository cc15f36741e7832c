//! A seeded population of wandering objects standing in for the host world.

use phalanx_core::{
    CreatureSnapshot, EntityKind, EntitySnapshot, GameObjectSnapshot, PlayerSnapshot, SnapshotHeader,
    StatusFlags, TransientEffectSnapshot, WorldObject,
};
use phalanx_shared::{HighGuid, ObjectGuid, Position, Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Population and arena of a synthetic world.
#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticWorldConfig {
    /// RNG seed; equal seeds give equal worlds.
    pub seed: u64,
    /// Side of the square arena, starting at the origin.
    pub arena_size: f32,
    /// Wandering creatures.
    pub creatures: usize,
    /// Wandering players.
    pub players: usize,
    /// Static game objects.
    pub game_objects: usize,
    /// Short-lived ground effects, respawned elsewhere when they expire.
    pub effects: usize,
    /// Per-step chance that a creature dies or respawns.
    pub churn: f64,
}

impl Default for SyntheticWorldConfig {
    fn default() -> Self {
        Self {
            seed: 0xB07,
            arena_size: 4_096.0,
            creatures: 5_000,
            players: 500,
            game_objects: 2_000,
            effects: 200,
            churn: 0.002,
        }
    }
}

/// One object of the synthetic world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyntheticObject {
    /// Identity.
    pub guid: ObjectGuid,
    /// Kind.
    pub kind: EntityKind,
    /// Current position.
    pub position: Position,
    /// Ground-plane speed in units per second.
    pub velocity: Vec2,
    /// Status bits.
    pub flags: StatusFlags,
    /// Remaining lifetime of an effect in milliseconds.
    pub remaining_ms: u32,
    /// Not present in the world right now.
    pub despawned: bool,
}

impl WorldObject for SyntheticObject {
    fn capture(&self) -> Option<EntitySnapshot> {
        if self.despawned {
            return None;
        }
        let header = SnapshotHeader::new(self.guid, self.position, self.flags);
        let counter = self.guid.counter() as u32;
        Some(match self.kind {
            EntityKind::Creature => EntitySnapshot::Creature(CreatureSnapshot {
                header,
                entry: 1_000 + counter % 50,
                level: (counter % 60) as u8 + 1,
                health: 1.0,
                faction: if self.flags.contains(StatusFlags::HOSTILE) { 14 } else { 35 },
                elite: counter % 97 == 0,
                target: ObjectGuid::EMPTY,
            }),
            EntityKind::Player => EntitySnapshot::Player(PlayerSnapshot {
                header,
                level: (counter % 60) as u8 + 1,
                class: (counter % 9) as u8 + 1,
                health: 1.0,
                power: 1.0,
                faction: 1,
                group: counter / 5,
            }),
            EntityKind::TransientEffect => EntitySnapshot::TransientEffect(TransientEffectSnapshot {
                header,
                spell_id: 2_120,
                caster: ObjectGuid::EMPTY,
                radius: 8.0,
                remaining_ms: self.remaining_ms,
            }),
            EntityKind::GameObject | EntityKind::TriggerVolume => {
                EntitySnapshot::GameObject(GameObjectSnapshot {
                    header,
                    entry: 1_617 + counter % 20,
                    object_type: 3,
                    interaction_range: 5.0,
                    state: 1,
                })
            }
        })
    }
}

/// The synthetic world. Owned and stepped by one thread, like a real host.
#[derive(Debug)]
pub struct SyntheticWorld {
    config: SyntheticWorldConfig,
    rng: ChaCha8Rng,
    objects: Vec<SyntheticObject>,
    steps: u64,
}

impl SyntheticWorld {
    /// Spawns the configured population.
    #[must_use]
    pub fn new(config: SyntheticWorldConfig) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut objects = Vec::with_capacity(config.creatures + config.players + config.game_objects + config.effects);

        let spawns = [
            (EntityKind::Creature, HighGuid::Creature, config.creatures),
            (EntityKind::Player, HighGuid::Player, config.players),
            (EntityKind::GameObject, HighGuid::GameObject, config.game_objects),
            (EntityKind::TransientEffect, HighGuid::DynamicObject, config.effects),
        ];
        for (kind, high, count) in spawns {
            for i in 0..count {
                let position = Self::random_position_with(&mut rng, config.arena_size);
                let speed = match kind {
                    EntityKind::Creature => 3.0,
                    EntityKind::Player => 7.0,
                    _ => 0.0,
                };
                let heading: f32 = rng.gen_range(0.0..std::f32::consts::TAU);
                let flags = match kind {
                    EntityKind::Creature if rng.gen_bool(0.6) => StatusFlags::ALIVE | StatusFlags::HOSTILE,
                    EntityKind::Creature | EntityKind::Player => StatusFlags::ALIVE,
                    _ => StatusFlags::LOOTABLE,
                };
                objects.push(SyntheticObject {
                    guid: ObjectGuid::new(high, i as u64 + 1),
                    kind,
                    position,
                    velocity: Vec2::new(heading.cos() * speed, heading.sin() * speed),
                    flags,
                    remaining_ms: rng.gen_range(1_000..30_000),
                    despawned: false,
                });
            }
        }

        Self {
            config,
            rng,
            objects,
            steps: 0,
        }
    }

    fn random_position_with(rng: &mut ChaCha8Rng, arena_size: f32) -> Position {
        let x = rng.gen_range(0.0..arena_size);
        let y = rng.gen_range(0.0..arena_size);
        Position::at(x, y, 0.0)
    }

    /// A uniformly random point of the arena.
    pub fn random_point(&mut self) -> Vec3 {
        Self::random_position_with(&mut self.rng, self.config.arena_size).point()
    }

    /// Advances the world by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        let size = self.config.arena_size;
        let elapsed_ms = (dt * 1_000.0) as u32;
        for object in &mut self.objects {
            match object.kind {
                EntityKind::Creature | EntityKind::Player => {
                    let mut x = object.position.x + object.velocity.x * dt;
                    let mut y = object.position.y + object.velocity.y * dt;
                    if !(0.0..size).contains(&x) {
                        object.velocity.x = -object.velocity.x;
                        x = x.clamp(0.0, size);
                    }
                    if !(0.0..size).contains(&y) {
                        object.velocity.y = -object.velocity.y;
                        y = y.clamp(0.0, size);
                    }
                    object.position.x = x;
                    object.position.y = y;
                    object.position.orientation = object.velocity.y.atan2(object.velocity.x);
                }
                EntityKind::TransientEffect => {
                    if object.remaining_ms <= elapsed_ms {
                        object.position = Self::random_position_with(&mut self.rng, size);
                        object.remaining_ms = self.rng.gen_range(1_000..30_000);
                    } else {
                        object.remaining_ms -= elapsed_ms;
                    }
                }
                EntityKind::GameObject | EntityKind::TriggerVolume => {}
            }
            if object.kind == EntityKind::Creature && self.rng.gen_bool(self.config.churn) {
                object.despawned = !object.despawned;
            }
        }
        self.steps += 1;
    }

    /// Every object, despawned ones included; feed this to a rebuild.
    #[must_use]
    pub fn objects(&self) -> &[SyntheticObject] {
        &self.objects
    }

    /// Objects currently present.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.objects.iter().filter(|o| !o.despawned).count()
    }

    /// Steps taken.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Configuration.
    #[must_use]
    pub const fn config(&self) -> &SyntheticWorldConfig {
        &self.config
    }
}
