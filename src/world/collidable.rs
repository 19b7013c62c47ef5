use std::ops::{Deref, DerefMut};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{
    config::{CIRCLE_OUTLINE_SEGMENTS, PIXELS_PER_METER},
    core::{
        collider::{BodyHandle, ColliderShape},
        rigidbody::RigidBody,
    },
    utils::{
        allocator::GenerationalId,
        units::{degrees_to_radians, radians_to_degrees, to_display, to_sim},
    },
    world::{
        shape_builder::{self, ShapeDef},
        PhysicsWorld,
    },
};

/// Stable identifier of a collidable entity. Stored as the body's user data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CollidableId(pub(crate) GenerationalId);

impl CollidableId {
    pub fn to_bits(self) -> u64 {
        self.0.to_bits()
    }

    pub fn from_bits(bits: u64) -> Self {
        Self(GenerationalId::from_bits(bits))
    }
}

/// Collision hook implemented by the entity payload type.
///
/// Both sides of a touching pair receive the call once per step, after the
/// contact walk has finished. Enum payloads dispatch on their own variants.
pub trait CollisionHandler: Sized {
    fn collision(pair: CollisionPair<'_, Self>) {
        let _ = pair;
    }
}

/// One side of a touching pair as seen from `this`, with access to both bodies.
pub struct CollisionPair<'a, T> {
    this: &'a mut Collidable<T>,
    other: &'a mut Collidable<T>,
    world: &'a mut PhysicsWorld,
}

impl<'a, T> CollisionPair<'a, T> {
    pub(crate) fn new(
        this: &'a mut Collidable<T>,
        other: &'a mut Collidable<T>,
        world: &'a mut PhysicsWorld,
    ) -> Self {
        Self { this, other, world }
    }

    pub fn this(&self) -> CollidableRef<'_, T> {
        CollidableRef::new(&*self.this, &*self.world)
    }

    pub fn other(&self) -> CollidableRef<'_, T> {
        CollidableRef::new(&*self.other, &*self.world)
    }

    pub fn this_mut(&mut self) -> CollidableMut<'_, T> {
        CollidableMut::new(&mut *self.this, &mut *self.world)
    }

    pub fn other_mut(&mut self) -> CollidableMut<'_, T> {
        CollidableMut::new(&mut *self.other, &mut *self.world)
    }

    /// Both entity records at once, for payload and flag updates.
    pub fn entities(&mut self) -> (&mut Collidable<T>, &mut Collidable<T>) {
        (&mut *self.this, &mut *self.other)
    }

    pub fn world(&self) -> &PhysicsWorld {
        &*self.world
    }
}

impl CollisionHandler for () {}

/// Game entity bound to at most one physics body.
#[derive(Debug, Clone)]
pub struct Collidable<T> {
    id: CollidableId,
    body: Option<BodyHandle>,
    physics_enabled: bool,
    static_physics: bool,
    destroyed: bool,
    payload: T,
}

impl<T> Collidable<T> {
    pub(crate) fn new(id: CollidableId, payload: T) -> Self {
        Self {
            id,
            body: None,
            physics_enabled: false,
            static_physics: false,
            destroyed: false,
            payload,
        }
    }

    pub fn id(&self) -> CollidableId {
        self.id
    }

    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    pub(crate) fn set_body(&mut self, body: Option<BodyHandle>) {
        self.body = body;
    }

    /// Solid (`true`) or sensor (`false`) fixtures.
    pub fn physics_enabled(&self) -> bool {
        self.physics_enabled
    }

    /// Kinematic (`true`) or dynamic (`false`) body.
    pub fn static_physics(&self) -> bool {
        self.static_physics
    }

    /// Marks the entity for removal. The body is released by the collision pass.
    pub fn destroy(&mut self) {
        self.destroyed = true;
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut T {
        &mut self.payload
    }

    pub(crate) fn into_payload(self) -> T {
        self.payload
    }
}

/// Read-only view of an entity together with the world holding its body.
pub struct CollidableRef<'a, T> {
    entity: &'a Collidable<T>,
    world: &'a PhysicsWorld,
}

impl<'a, T> Clone for CollidableRef<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for CollidableRef<'a, T> {}

impl<'a, T> Deref for CollidableRef<'a, T> {
    type Target = Collidable<T>;

    fn deref(&self) -> &Self::Target {
        self.entity
    }
}

impl<'a, T> CollidableRef<'a, T> {
    pub(crate) fn new(entity: &'a Collidable<T>, world: &'a PhysicsWorld) -> Self {
        Self { entity, world }
    }

    fn rigid(&self) -> Option<&'a RigidBody> {
        self.world.body(self.entity.body?)
    }

    /// Body origin in display units.
    pub fn position(&self) -> Vec2 {
        self.rigid()
            .map(|body| to_display(body.position()))
            .unwrap_or_default()
    }

    /// Body angle in degrees.
    pub fn rotation(&self) -> f32 {
        self.rigid()
            .map(|body| radians_to_degrees(body.angle()))
            .unwrap_or_default()
    }

    /// Display units per second.
    pub fn velocity(&self) -> Vec2 {
        self.rigid()
            .map(|body| to_display(body.linear_velocity()))
            .unwrap_or_default()
    }

    /// Degrees per second.
    pub fn angular_velocity(&self) -> f32 {
        self.rigid()
            .map(|body| radians_to_degrees(body.angular_velocity()))
            .unwrap_or_default()
    }

    pub fn to_local_space(&self, point: Vec2) -> Vec2 {
        self.rigid()
            .map(|body| to_display(body.local_point(to_sim(point))))
            .unwrap_or_default()
    }

    pub fn to_world_space(&self, point: Vec2) -> Vec2 {
        self.rigid()
            .map(|body| to_display(body.world_point(to_sim(point))))
            .unwrap_or_default()
    }

    /// Outline of the first fixture in body space, display units.
    pub fn collision_shape(&self) -> Vec<Vec2> {
        self.collision_outlines()
            .into_iter()
            .next()
            .unwrap_or_default()
    }

    /// One outline per fixture, in creation order.
    pub fn collision_outlines(&self) -> Vec<Vec<Vec2>> {
        let Some(body) = self.rigid() else {
            return Vec::new();
        };
        body.colliders()
            .iter()
            .filter_map(|handle| self.world.collider(*handle))
            .map(|collider| outline(&collider.shape))
            .collect()
    }
}

fn outline(shape: &ColliderShape) -> Vec<Vec2> {
    match shape {
        ColliderShape::Circle { center, radius } => {
            let step = std::f32::consts::TAU / CIRCLE_OUTLINE_SEGMENTS as f32;
            (0..CIRCLE_OUTLINE_SEGMENTS)
                .map(|n| {
                    let (sin, cos) = (step * n as f32).sin_cos();
                    (*center + Vec2::new(sin, cos) * *radius) * PIXELS_PER_METER
                })
                .collect()
        }
        ColliderShape::Polygon(polygon) => polygon
            .vertices()
            .iter()
            .map(|v| *v * PIXELS_PER_METER)
            .collect(),
    }
}

/// Mutable view of an entity; setters write through to its body.
pub struct CollidableMut<'a, T> {
    entity: &'a mut Collidable<T>,
    world: &'a mut PhysicsWorld,
}

impl<'a, T> Deref for CollidableMut<'a, T> {
    type Target = Collidable<T>;

    fn deref(&self) -> &Self::Target {
        &*self.entity
    }
}

impl<'a, T> DerefMut for CollidableMut<'a, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.entity
    }
}

impl<'a, T> CollidableMut<'a, T> {
    pub(crate) fn new(entity: &'a mut Collidable<T>, world: &'a mut PhysicsWorld) -> Self {
        Self { entity, world }
    }

    pub fn view(&self) -> CollidableRef<'_, T> {
        CollidableRef::new(&*self.entity, &*self.world)
    }

    pub fn position(&self) -> Vec2 {
        self.view().position()
    }

    pub fn rotation(&self) -> f32 {
        self.view().rotation()
    }

    pub fn velocity(&self) -> Vec2 {
        self.view().velocity()
    }

    pub fn angular_velocity(&self) -> f32 {
        self.view().angular_velocity()
    }

    pub fn collision_shape(&self) -> Vec<Vec2> {
        self.view().collision_shape()
    }

    pub fn set_position(&mut self, position: Vec2) {
        let Some(body) = self.entity.body else {
            return;
        };
        let Some(angle) = self.world.body(body).map(|b| b.angle()) else {
            return;
        };
        self.world.set_transform(body, to_sim(position), angle);
    }

    pub fn set_rotation(&mut self, degrees: f32) {
        let Some(body) = self.entity.body else {
            return;
        };
        let Some(position) = self.world.body(body).map(|b| b.position()) else {
            return;
        };
        self.world
            .set_transform(body, position, degrees_to_radians(degrees));
    }

    pub fn set_velocity(&mut self, velocity: Vec2) {
        if let Some(body) = self.entity.body {
            self.world.set_linear_velocity(body, to_sim(velocity));
        }
    }

    pub fn set_angular_velocity(&mut self, degrees_per_second: f32) {
        if let Some(body) = self.entity.body {
            self.world
                .set_angular_velocity(body, degrees_to_radians(degrees_per_second));
        }
    }

    /// Linear impulse at a world point, both in display units. Wakes the body.
    pub fn apply_impulse(&mut self, at: Vec2, impulse: Vec2) {
        if let Some(body) = self.entity.body {
            self.world
                .apply_linear_impulse(body, to_sim(impulse), to_sim(at), true);
        }
    }

    /// Stores the solid/sensor and kinematic/dynamic flags and applies them to an existing body.
    pub fn set_physics_mode(&mut self, physics_enabled: bool, static_physics: bool) {
        self.entity.physics_enabled = physics_enabled;
        self.entity.static_physics = static_physics;

        let Some(body) = self.entity.body else {
            return;
        };
        let colliders = match self.world.body(body) {
            Some(rigid) => rigid.colliders().to_vec(),
            None => return,
        };
        for collider in colliders {
            self.world.set_sensor(collider, !physics_enabled);
        }
        self.world
            .set_body_type(body, shape_builder::entity_body_type(static_physics));
    }

    /// Replaces the body's fixtures with a circle of `radius` display units.
    pub fn set_circle(&mut self, radius: f32) {
        shape_builder::set_circle(&mut *self.world, &mut *self.entity, radius);
    }

    pub fn set_box(&mut self, size: Vec2, origin: Vec2) {
        shape_builder::set_box(&mut *self.world, &mut *self.entity, size, origin);
    }

    /// Replaces the body's fixtures with the convex fan of `points`.
    ///
    /// Fewer than three points leaves the entity untouched.
    pub fn set_polygon(&mut self, points: &[Vec2]) {
        shape_builder::set_polygon(&mut *self.world, &mut *self.entity, points);
    }

    pub fn set_shape(&mut self, shape: &ShapeDef) {
        shape_builder::apply_shape(&mut *self.world, &mut *self.entity, shape);
    }
}
