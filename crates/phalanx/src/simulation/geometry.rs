//! Analytic stand-in for height maps, raycasts and a navmesh.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use phalanx_core::{GeometryError, LiquidKind, TerrainInfo, WorldGeometry};
use phalanx_shared::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A vertical cylinder blocking sight and movement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pillar {
    /// Ground-plane center.
    pub center: Vec2,
    /// Radius.
    pub radius: f32,
}

impl Pillar {
    /// True if the ground-plane segment `a -> b` passes through the pillar.
    #[must_use]
    pub fn blocks(&self, a: Vec3, b: Vec3) -> bool {
        let closest = closest_point_on_segment(self.center, a.xy(), b.xy());
        closest.distance_squared(self.center) < self.radius * self.radius
    }
}

fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f32::EPSILON {
        return a;
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    Vec2::new(a.x + t * dx, a.y + t * dy)
}

/// Rolling hills, a flooded basin and a field of pillars.
#[derive(Debug)]
pub struct SyntheticGeometry {
    pillars: Vec<Pillar>,
    water_level: f32,
    failing: AtomicBool,
    calls: AtomicU64,
}

impl SyntheticGeometry {
    /// Geometry with explicit pillars and water level.
    #[must_use]
    pub fn new(pillars: Vec<Pillar>, water_level: f32) -> Self {
        Self {
            pillars,
            water_level,
            failing: AtomicBool::new(false),
            calls: AtomicU64::new(0),
        }
    }

    /// `pillar_count` random pillars scattered over a square arena.
    #[must_use]
    pub fn random(seed: u64, arena_size: f32, pillar_count: usize) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let pillars = (0..pillar_count)
            .map(|_| Pillar {
                center: Vec2::new(rng.gen_range(0.0..arena_size), rng.gen_range(0.0..arena_size)),
                radius: rng.gen_range(2.0..12.0),
            })
            .collect();
        Self::new(pillars, -4.0)
    }

    /// Makes every subsequent query fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Authoritative queries answered so far, failed ones included.
    #[must_use]
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// The pillars.
    #[must_use]
    pub fn pillars(&self) -> &[Pillar] {
        &self.pillars
    }

    /// Ground height at a point.
    #[must_use]
    pub fn height_at(x: f32, y: f32) -> f32 {
        10.0 * (x / 97.0).sin() + 8.0 * (y / 61.0).cos()
    }

    fn enter(&self) -> Result<(), GeometryError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.failing.load(Ordering::Relaxed) {
            Err(GeometryError::Unavailable)
        } else {
            Ok(())
        }
    }

    fn first_blocker(&self, from: Vec3, to: Vec3) -> Option<&Pillar> {
        self.pillars.iter().find(|pillar| pillar.blocks(from, to))
    }
}

impl WorldGeometry for SyntheticGeometry {
    fn terrain_at(&self, x: f32, y: f32) -> Result<TerrainInfo, GeometryError> {
        self.enter()?;
        if !x.is_finite() || !y.is_finite() {
            return Err(GeometryError::InvalidGeometry(format!("terrain sample at ({x}, {y})")));
        }
        let height = Self::height_at(x, y);
        if height < self.water_level {
            Ok(TerrainInfo::submerged(height, self.water_level, LiquidKind::Water))
        } else {
            Ok(TerrainInfo::dry(height))
        }
    }

    fn line_of_sight(&self, from: Vec3, to: Vec3) -> Result<bool, GeometryError> {
        self.enter()?;
        Ok(self.first_blocker(from, to).is_none())
    }

    fn find_path(&self, from: Vec3, to: Vec3) -> Result<Vec<Vec3>, GeometryError> {
        self.enter()?;
        let Some(pillar) = self.first_blocker(from, to) else {
            return Ok(vec![from, to]);
        };

        // Step around the pillar on the side the segment already leans to.
        let closest = closest_point_on_segment(pillar.center, from.xy(), to.xy());
        let (mut nx, mut ny) = (closest.x - pillar.center.x, closest.y - pillar.center.y);
        let len = (nx * nx + ny * ny).sqrt();
        if len <= f32::EPSILON {
            // Dead center: use the segment's left normal.
            let (dx, dy) = (to.x - from.x, to.y - from.y);
            let dlen = (dx * dx + dy * dy).sqrt().max(f32::EPSILON);
            (nx, ny) = (-dy / dlen, dx / dlen);
        } else {
            (nx, ny) = (nx / len, ny / len);
        }
        let offset = pillar.radius * 1.5;
        let detour = Vec3::new(
            pillar.center.x + nx * offset,
            pillar.center.y + ny * offset,
            (from.z + to.z) * 0.5,
        );
        Ok(vec![from, detour, to])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_pillar() -> SyntheticGeometry {
        SyntheticGeometry::new(
            vec![Pillar {
                center: Vec2::new(50.0, 0.0),
                radius: 5.0,
            }],
            -4.0,
        )
    }

    #[test]
    fn test_pillar_blocks_sight() {
        let geometry = one_pillar();
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(100.0, 0.0, 0.0);
        assert_eq!(geometry.line_of_sight(a, b), Ok(false));
        assert_eq!(geometry.line_of_sight(b, a), Ok(false));
        assert_eq!(geometry.line_of_sight(a, Vec3::new(0.0, 100.0, 0.0)), Ok(true));
    }

    #[test]
    fn test_path_detours_around_pillar() {
        let geometry = one_pillar();
        let a = Vec3::new(0.0, 1.0, 0.0);
        let b = Vec3::new(100.0, 1.0, 0.0);
        let path = geometry.find_path(a, b).unwrap();
        assert_eq!(path.len(), 3);
        let detour = path[1];
        assert!(detour.y > 5.0, "detour should pass north of the pillar: {detour:?}");
        let pillar = geometry.pillars()[0];
        assert!(!pillar.blocks(path[0], path[1]));
        assert!(!pillar.blocks(path[1], path[2]));
    }

    #[test]
    fn test_water_below_level() {
        let geometry = SyntheticGeometry::new(Vec::new(), 100.0);
        let info = geometry.terrain_at(0.0, 0.0).unwrap();
        assert_eq!(info.liquid, LiquidKind::Water);
        assert!(info.is_underwater(info.height + 1.0));
    }

    #[test]
    fn test_failing_mode() {
        let geometry = one_pillar();
        geometry.set_failing(true);
        assert_eq!(geometry.terrain_at(0.0, 0.0), Err(GeometryError::Unavailable));
        geometry.set_failing(false);
        assert!(geometry.terrain_at(0.0, 0.0).is_ok());
        assert_eq!(geometry.calls(), 2);
    }
}
