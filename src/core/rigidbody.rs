use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::{
    collider::{BodyHandle, Collider, ColliderHandle},
    types::{Transform, Velocity},
};
use crate::utils::{allocator::Arena, math::cross_sv};

/// How a body takes part in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BodyType {
    /// Never moves.
    Static,
    /// Moves only by its own velocity, unaffected by forces, impulses and contacts.
    Kinematic,
    /// Fully simulated.
    #[default]
    Dynamic,
}

/// Creation parameters for a [`RigidBody`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyDef {
    pub body_type: BodyType,
    pub position: Vec2,
    pub angle: f32,
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub gravity_scale: f32,
    pub allow_sleep: bool,
    pub awake: bool,
    pub enabled: bool,
    /// Opaque owner key, typically the bits of an entity handle.
    pub user_data: Option<u64>,
}

impl Default for BodyDef {
    fn default() -> Self {
        Self {
            body_type: BodyType::Dynamic,
            position: Vec2::ZERO,
            angle: 0.0,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            gravity_scale: 1.0,
            allow_sleep: true,
            awake: true,
            enabled: true,
            user_data: None,
        }
    }
}

/// Core rigid body storing kinematic state and mass properties.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub id: BodyHandle,
    pub(crate) body_type: BodyType,
    /// Origin of the body frame.
    pub(crate) transform: Transform,
    pub(crate) local_center: Vec2,
    /// World position of the center of mass.
    pub(crate) center: Vec2,
    pub(crate) velocity: Velocity,
    pub(crate) force: Vec2,
    pub(crate) torque: f32,
    pub(crate) mass: f32,
    pub(crate) inverse_mass: f32,
    /// Rotational inertia about the center of mass.
    pub(crate) inertia: f32,
    pub(crate) inverse_inertia: f32,
    pub gravity_scale: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub(crate) allow_sleep: bool,
    pub(crate) is_awake: bool,
    pub(crate) is_enabled: bool,
    pub(crate) sleep_time: f32,
    pub user_data: Option<u64>,
    pub(crate) colliders: Vec<ColliderHandle>,
}

impl RigidBody {
    pub(crate) fn from_def(id: BodyHandle, def: &BodyDef) -> Self {
        let transform = Transform::new(def.position, def.angle);
        let mut body = Self {
            id,
            body_type: def.body_type,
            transform,
            local_center: Vec2::ZERO,
            center: transform.position,
            velocity: Velocity::default(),
            force: Vec2::ZERO,
            torque: 0.0,
            mass: 0.0,
            inverse_mass: 0.0,
            inertia: 0.0,
            inverse_inertia: 0.0,
            gravity_scale: def.gravity_scale,
            linear_damping: def.linear_damping,
            angular_damping: def.angular_damping,
            allow_sleep: def.allow_sleep,
            is_awake: def.awake || !def.allow_sleep,
            is_enabled: def.enabled,
            sleep_time: 0.0,
            user_data: def.user_data,
            colliders: Vec::new(),
        };
        if body.body_type == BodyType::Dynamic {
            body.mass = 1.0;
            body.inverse_mass = 1.0;
        }
        if body.body_type != BodyType::Static {
            body.velocity.linear = def.linear_velocity;
            body.velocity.angular = def.angular_velocity;
        }
        body
    }

    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn position(&self) -> Vec2 {
        self.transform.position
    }

    pub fn angle(&self) -> f32 {
        self.transform.angle
    }

    pub fn world_center(&self) -> Vec2 {
        self.center
    }

    pub fn local_center(&self) -> Vec2 {
        self.local_center
    }

    pub fn linear_velocity(&self) -> Vec2 {
        self.velocity.linear
    }

    pub fn angular_velocity(&self) -> f32 {
        self.velocity.angular
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn inverse_mass(&self) -> f32 {
        self.inverse_mass
    }

    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    pub fn is_awake(&self) -> bool {
        self.is_awake
    }

    pub fn is_enabled(&self) -> bool {
        self.is_enabled
    }

    pub fn allows_sleep(&self) -> bool {
        self.allow_sleep
    }

    /// Fixtures in creation order.
    pub fn colliders(&self) -> &[ColliderHandle] {
        &self.colliders
    }

    pub fn local_point(&self, world_point: Vec2) -> Vec2 {
        self.transform.apply_inverse(world_point)
    }

    pub fn world_point(&self, local_point: Vec2) -> Vec2 {
        self.transform.apply(local_point)
    }

    pub fn linear_velocity_at_world_point(&self, world_point: Vec2) -> Vec2 {
        self.velocity.linear + cross_sv(self.velocity.angular, world_point - self.center)
    }

    /// At least one side must be dynamic for a contact to exist.
    pub fn should_collide(&self, other: &RigidBody) -> bool {
        self.body_type == BodyType::Dynamic || other.body_type == BodyType::Dynamic
    }

    pub(crate) fn set_transform(&mut self, position: Vec2, angle: f32) {
        self.transform = Transform::new(position, angle);
        self.center = self.transform.apply(self.local_center);
    }

    /// Recomputes the origin from the integrated center of mass and angle.
    pub(crate) fn synchronize_transform(&mut self, center: Vec2, angle: f32) {
        self.center = center;
        self.transform.angle = angle;
        self.transform.position = center - self.transform.rotate_vector(self.local_center);
    }

    pub(crate) fn set_awake(&mut self, awake: bool) {
        if self.body_type == BodyType::Static {
            return;
        }
        self.sleep_time = 0.0;
        if awake {
            self.is_awake = true;
        } else {
            self.is_awake = false;
            self.velocity = Velocity::default();
            self.force = Vec2::ZERO;
            self.torque = 0.0;
        }
    }

    pub(crate) fn apply_linear_impulse(&mut self, impulse: Vec2, point: Vec2, wake: bool) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        if wake && !self.is_awake {
            self.set_awake(true);
        }
        if self.is_awake {
            self.velocity.linear += self.inverse_mass * impulse;
            self.velocity.angular += self.inverse_inertia * (point - self.center).perp_dot(impulse);
        }
    }

    pub(crate) fn apply_force(&mut self, force: Vec2, point: Vec2, wake: bool) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        if wake && !self.is_awake {
            self.set_awake(true);
        }
        if self.is_awake {
            self.force += force;
            self.torque += (point - self.center).perp_dot(force);
        }
    }

    pub(crate) fn clear_forces(&mut self) {
        self.force = Vec2::ZERO;
        self.torque = 0.0;
    }

    /// Recomputes mass, center of mass and inertia from the attached fixtures.
    pub(crate) fn reset_mass_data(&mut self, colliders: &Arena<Collider>) {
        self.mass = 0.0;
        self.inverse_mass = 0.0;
        self.inertia = 0.0;
        self.inverse_inertia = 0.0;
        self.local_center = Vec2::ZERO;

        if self.body_type != BodyType::Dynamic {
            self.center = self.transform.position;
            return;
        }

        let mut local_center = Vec2::ZERO;
        let mut rotational_inertia = 0.0;
        for handle in &self.colliders {
            let Some(collider) = colliders.get(*handle) else {
                continue;
            };
            if collider.material.density == 0.0 {
                continue;
            }
            let mass_data = collider.mass_data();
            self.mass += mass_data.mass;
            local_center += mass_data.mass * mass_data.center;
            rotational_inertia += mass_data.inertia;
        }

        if self.mass > 0.0 {
            self.inverse_mass = 1.0 / self.mass;
            local_center *= self.inverse_mass;
        } else {
            self.mass = 1.0;
            self.inverse_mass = 1.0;
        }

        if rotational_inertia > 0.0 {
            self.inertia = rotational_inertia - self.mass * local_center.dot(local_center);
            if self.inertia > 0.0 {
                self.inverse_inertia = 1.0 / self.inertia;
            } else {
                self.inertia = 0.0;
            }
        }

        let old_center = self.center;
        self.local_center = local_center;
        self.center = self.transform.apply(local_center);
        self.velocity.linear += cross_sv(self.velocity.angular, self.center - old_center);
    }

    pub(crate) fn set_body_type(&mut self, body_type: BodyType, colliders: &Arena<Collider>) {
        self.body_type = body_type;
        self.reset_mass_data(colliders);
        if body_type == BodyType::Static {
            self.velocity = Velocity::default();
        }
        self.clear_forces();
        self.set_awake(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::collider::ColliderShape, utils::allocator::Arena};
    use approx::assert_relative_eq;

    fn body_with_circle(radius: f32) -> (RigidBody, Arena<Collider>) {
        let mut bodies: Arena<RigidBody> = Arena::new();
        let id = bodies.insert_with(|id| RigidBody::from_def(id, &BodyDef::default()));
        let mut colliders = Arena::new();
        let collider = colliders.insert_with(|cid| {
            Collider::builder(ColliderShape::circle(radius)).build(cid, id)
        });
        let mut body = bodies.remove(id).expect("just inserted");
        body.colliders.push(collider);
        body.reset_mass_data(&colliders);
        (body, colliders)
    }

    #[test]
    fn mass_follows_fixture_density() {
        let (body, _) = body_with_circle(1.0);
        assert_relative_eq!(body.mass(), std::f32::consts::PI, epsilon = 1e-5);
        assert_relative_eq!(body.inertia(), 0.5 * std::f32::consts::PI, epsilon = 1e-5);
    }

    #[test]
    fn impulse_at_center_only_changes_linear_velocity() {
        let (mut body, _) = body_with_circle(1.0);
        body.apply_linear_impulse(Vec2::new(std::f32::consts::PI, 0.0), Vec2::ZERO, true);
        assert_relative_eq!(body.linear_velocity().x, 1.0, epsilon = 1e-5);
        assert_eq!(body.angular_velocity(), 0.0);
    }

    #[test]
    fn off_center_impulse_spins_and_wakes() {
        let (mut body, _) = body_with_circle(1.0);
        body.allow_sleep = true;
        body.set_awake(false);
        body.apply_linear_impulse(Vec2::new(0.0, 1.0), Vec2::new(1.0, 0.0), true);
        assert!(body.is_awake());
        assert!(body.angular_velocity() > 0.0);
    }

    #[test]
    fn kinematic_bodies_ignore_impulses() {
        let (mut body, colliders) = body_with_circle(1.0);
        body.set_body_type(BodyType::Kinematic, &colliders);
        body.apply_linear_impulse(Vec2::X, Vec2::ZERO, true);
        assert_eq!(body.linear_velocity(), Vec2::ZERO);
        assert_eq!(body.inverse_mass(), 0.0);
    }
}
