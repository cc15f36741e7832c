//! Mathematical types shared by the grid, the caches and their callers.
//!
//! World space is right handed with `z` up; the grid partitions the `x`/`y`
//! plane only.

use serde::{Deserialize, Serialize};

/// 3D Vector - world position or direction
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component (height)
    pub z: f32,
}

impl Vec3 {
    /// Creates a new Vec3
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Converts to array
    #[must_use]
    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Projection onto the ground plane.
    #[must_use]
    pub const fn xy(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Dot product
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Length squared (avoids sqrt)
    #[must_use]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Length
    #[must_use]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Distance to another point
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Distance squared (avoids sqrt)
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f32 {
        (self - other).length_squared()
    }

    /// Linear interpolation towards `other`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }

    /// True when every component is finite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// 2D Vector - ground plane coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
}

impl Vec2 {
    /// Creates a new Vec2
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Distance squared on the ground plane.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// World position with facing.
///
/// `orientation` is in radians, `0` facing +X, counter-clockwise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate
    pub x: f32,
    /// Y coordinate
    pub y: f32,
    /// Z coordinate (height)
    pub z: f32,
    /// Facing in radians
    pub orientation: f32,
}

impl Position {
    /// Creates a new position.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32, orientation: f32) -> Self {
        Self { x, y, z, orientation }
    }

    /// Position without facing.
    #[must_use]
    pub const fn at(x: f32, y: f32, z: f32) -> Self {
        Self::new(x, y, z, 0.0)
    }

    /// The point part of this position.
    #[must_use]
    pub const fn point(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// 3D distance to a point.
    #[must_use]
    pub fn distance_to(self, other: Vec3) -> f32 {
        self.point().distance(other)
    }

    /// Angle from this position to `target`, relative to the facing,
    /// normalised to `(-PI, PI]`.
    #[must_use]
    pub fn relative_angle(self, target: Vec3) -> f32 {
        let absolute = (target.y - self.y).atan2(target.x - self.x);
        let mut delta = absolute - self.orientation;
        while delta <= -std::f32::consts::PI {
            delta += std::f32::consts::TAU;
        }
        while delta > std::f32::consts::PI {
            delta -= std::f32::consts::TAU;
        }
        delta
    }

    /// True if `target` lies within the frontal arc of `arc` radians.
    #[must_use]
    pub fn has_in_arc(self, target: Vec3, arc: f32) -> bool {
        self.relative_angle(target).abs() <= arc / 2.0
    }
}

impl From<Vec3> for Position {
    fn from(v: Vec3) -> Self {
        Self::at(v.x, v.y, v.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_operations() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);

        let sum = a + b;
        assert_eq!(sum.x, 5.0);
        assert_eq!(sum.y, 7.0);
        assert_eq!(sum.z, 9.0);

        let dot = a.dot(b);
        assert_eq!(dot, 32.0); // 1*4 + 2*5 + 3*6
    }

    #[test]
    fn test_distance() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 4.0, 0.0);
        assert_eq!(a.distance(b), 5.0);
        assert_eq!(a.distance_squared(b), 25.0);
        assert_eq!(a.xy().distance_squared(b.xy()), 25.0);
    }

    #[test]
    fn test_frontal_arc() {
        let me = Position::new(0.0, 0.0, 0.0, 0.0);
        assert!(me.has_in_arc(Vec3::new(10.0, 1.0, 0.0), std::f32::consts::FRAC_PI_2));
        assert!(!me.has_in_arc(Vec3::new(-10.0, 0.0, 0.0), std::f32::consts::FRAC_PI_2));
    }

    #[test]
    fn test_non_finite_detection() {
        assert!(Vec3::new(1.0, 2.0, 3.0).is_finite());
        assert!(!Vec3::new(f32::NAN, 0.0, 0.0).is_finite());
    }
}
