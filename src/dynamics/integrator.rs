use glam::Vec2;

use crate::{
    config::{MAX_ROTATION, MAX_TRANSLATION},
    core::{
        collider::BodyHandle,
        rigidbody::{BodyType, RigidBody},
        types::Transform,
    },
};

/// Per-step copy of a body's state used by the solver and integrator.
#[derive(Debug, Clone, Copy)]
pub struct SolverBody {
    pub handle: BodyHandle,
    pub body_type: BodyType,
    pub center: Vec2,
    pub angle: f32,
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
    pub inverse_mass: f32,
    pub inverse_inertia: f32,
    pub local_center: Vec2,
    pub force: Vec2,
    pub torque: f32,
    pub gravity_scale: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
}

impl SolverBody {
    pub fn from_body(body: &RigidBody) -> Self {
        Self {
            handle: body.id,
            body_type: body.body_type,
            center: body.center,
            angle: body.transform.angle,
            linear_velocity: body.velocity.linear,
            angular_velocity: body.velocity.angular,
            inverse_mass: body.inverse_mass,
            inverse_inertia: body.inverse_inertia,
            local_center: body.local_center,
            force: body.force,
            torque: body.torque,
            gravity_scale: body.gravity_scale,
            linear_damping: body.linear_damping,
            angular_damping: body.angular_damping,
        }
    }

    /// Body-origin transform for the current center and angle.
    pub fn transform(&self) -> Transform {
        let rotation = Vec2::from_angle(self.angle);
        Transform::new(self.center - rotation.rotate(self.local_center), self.angle)
    }
}

/// Semi-implicit Euler integrator for the solver's body copies.
#[derive(Debug, Clone)]
pub struct Integrator {
    pub gravity: Vec2,
}

impl Integrator {
    pub fn new(gravity: Vec2) -> Self {
        Self { gravity }
    }

    /// Applies gravity, forces and damping to dynamic bodies.
    pub fn integrate_velocity(&self, body: &mut SolverBody, dt: f32) {
        if body.body_type != BodyType::Dynamic {
            return;
        }

        body.linear_velocity +=
            dt * (body.gravity_scale * self.gravity + body.inverse_mass * body.force);
        body.angular_velocity += dt * body.inverse_inertia * body.torque;

        // Pade approximation of exp(-damping * dt), stable for any step size.
        body.linear_velocity *= 1.0 / (1.0 + dt * body.linear_damping);
        body.angular_velocity *= 1.0 / (1.0 + dt * body.angular_damping);
    }

    /// Advances the center and angle, clamping runaway motion.
    pub fn integrate_position(&self, body: &mut SolverBody, dt: f32) {
        if body.body_type == BodyType::Static {
            return;
        }

        let translation = dt * body.linear_velocity;
        if translation.length_squared() > MAX_TRANSLATION * MAX_TRANSLATION {
            body.linear_velocity *= MAX_TRANSLATION / translation.length();
        }
        let rotation = dt * body.angular_velocity;
        if rotation * rotation > MAX_ROTATION * MAX_ROTATION {
            body.angular_velocity *= MAX_ROTATION / rotation.abs();
        }

        body.center += dt * body.linear_velocity;
        body.angle += dt * body.angular_velocity;
    }
}
