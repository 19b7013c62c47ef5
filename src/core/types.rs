use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_DENSITY, DEFAULT_FRICTION};
use crate::utils::math::inverse_rotate;

/// Position and orientation of a body origin in simulation space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec2,
    /// Rotation in radians, unbounded.
    pub angle: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            angle: 0.0,
        }
    }
}

impl Transform {
    pub fn new(position: Vec2, angle: f32) -> Self {
        Self { position, angle }
    }

    /// Unit complex number `(cos, sin)` for the current angle.
    #[inline]
    pub fn rotation(&self) -> Vec2 {
        Vec2::from_angle(self.angle)
    }

    /// Maps a body-local point into world space.
    #[inline]
    pub fn apply(&self, local: Vec2) -> Vec2 {
        self.position + self.rotation().rotate(local)
    }

    /// Maps a world point into body-local space.
    #[inline]
    pub fn apply_inverse(&self, world: Vec2) -> Vec2 {
        inverse_rotate(self.rotation(), world - self.position)
    }

    #[inline]
    pub fn rotate_vector(&self, v: Vec2) -> Vec2 {
        self.rotation().rotate(v)
    }

    #[inline]
    pub fn inverse_rotate_vector(&self, v: Vec2) -> Vec2 {
        inverse_rotate(self.rotation(), v)
    }

    /// Expresses `other` in the frame of `self`.
    pub fn inverse_mul(&self, other: &Transform) -> Transform {
        Transform {
            position: self.apply_inverse(other.position),
            angle: other.angle - self.angle,
        }
    }
}

/// Linear and angular velocity of a body's center of mass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub linear: Vec2,
    /// Radians per second, counter-clockwise positive.
    pub angular: f32,
}

/// Mass, centroid and rotational inertia of a shape or body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MassData {
    pub mass: f32,
    /// Center of mass relative to the shape or body origin.
    pub center: Vec2,
    /// Rotational inertia about the origin.
    pub inertia: f32,
}

/// Surface coefficients of a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            density: DEFAULT_DENSITY,
            friction: DEFAULT_FRICTION,
            restitution: 0.0,
        }
    }
}

impl Material {
    pub fn bouncy() -> Self {
        Self {
            restitution: 0.8,
            ..Self::default()
        }
    }

    /// Geometric mean so a frictionless surface stays frictionless.
    pub fn mix_friction(&self, other: &Material) -> f32 {
        (self.friction * other.friction).sqrt()
    }

    pub fn mix_restitution(&self, other: &Material) -> f32 {
        self.restitution.max(other.restitution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn transform_round_trips_points() {
        let xf = Transform::new(Vec2::new(3.0, -1.0), 0.7);
        let local = Vec2::new(0.25, 2.0);
        let world = xf.apply(local);
        let back = xf.apply_inverse(world);
        assert_relative_eq!(back.x, local.x, epsilon = 1e-5);
        assert_relative_eq!(back.y, local.y, epsilon = 1e-5);
    }

    #[test]
    fn inverse_mul_matches_composed_mapping() {
        let a = Transform::new(Vec2::new(1.0, 2.0), 0.3);
        let b = Transform::new(Vec2::new(-2.0, 0.5), -1.1);
        let rel = a.inverse_mul(&b);
        let p = Vec2::new(0.4, -0.6);
        let expected = a.apply_inverse(b.apply(p));
        let actual = rel.apply(p);
        assert_relative_eq!(actual.x, expected.x, epsilon = 1e-5);
        assert_relative_eq!(actual.y, expected.y, epsilon = 1e-5);
    }

    #[test]
    fn default_material_matches_entity_fixture_defaults() {
        let m = Material::default();
        assert_eq!(m.density, 1.0);
        assert_eq!(m.friction, 0.1);
        assert_eq!(m.restitution, 0.0);
        assert_relative_eq!(m.mix_friction(&Material::default()), 0.1, epsilon = 1e-6);
    }
}
