use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::{
    rigidbody::RigidBody,
    types::{MassData, Material, Transform},
};
use crate::{
    collision::{
        aabb::Aabb,
        broadphase::Proxy,
        shapes::{circle_aabb, circle_mass, PolygonShape},
    },
    utils::allocator::Handle,
};

pub type BodyHandle = Handle<RigidBody>;
pub type ColliderHandle = Handle<Collider>;

/// Enumeration of supported fixture geometries, in body-local simulation units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    Circle { center: Vec2, radius: f32 },
    Polygon(PolygonShape),
}

impl ColliderShape {
    pub fn circle(radius: f32) -> Self {
        ColliderShape::Circle {
            center: Vec2::ZERO,
            radius,
        }
    }

    pub fn cuboid(half_width: f32, half_height: f32) -> Self {
        ColliderShape::Polygon(PolygonShape::new_box(
            half_width,
            half_height,
            Vec2::ZERO,
            0.0,
        ))
    }

    /// Collision radius: the circle radius or the polygon skin.
    pub fn radius(&self) -> f32 {
        match self {
            ColliderShape::Circle { radius, .. } => *radius,
            ColliderShape::Polygon(polygon) => polygon.radius(),
        }
    }

    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        match self {
            ColliderShape::Circle { center, radius } => circle_aabb(*center, *radius, xf),
            ColliderShape::Polygon(polygon) => polygon.compute_aabb(xf),
        }
    }

    pub fn compute_mass(&self, density: f32) -> MassData {
        match self {
            ColliderShape::Circle { center, radius } => circle_mass(*center, *radius, density),
            ColliderShape::Polygon(polygon) => polygon.compute_mass(density),
        }
    }

    pub fn bounding_radius(&self) -> f32 {
        match self {
            ColliderShape::Circle { center, radius } => center.length() + radius,
            ColliderShape::Polygon(polygon) => polygon
                .vertices()
                .iter()
                .map(|v| v.length())
                .fold(0.0, f32::max),
        }
    }

    /// Whether `point` (body-local) lies inside the shape.
    pub fn contains_local(&self, point: Vec2) -> bool {
        match self {
            ColliderShape::Circle { center, radius } => {
                point.distance_squared(*center) <= radius * radius
            }
            ColliderShape::Polygon(polygon) => polygon
                .vertices()
                .iter()
                .zip(polygon.normals())
                .all(|(v, n)| n.dot(point - *v) <= 0.0),
        }
    }
}

/// Fixture: a convex shape attached to a rigid body.
#[derive(Debug, Clone)]
pub struct Collider {
    pub id: ColliderHandle,
    pub rigidbody_id: BodyHandle,
    pub shape: ColliderShape,
    pub material: Material,
    pub is_sensor: bool,
    pub(crate) proxy: Option<Handle<Proxy>>,
}

impl Collider {
    pub fn builder(shape: ColliderShape) -> ColliderBuilder {
        ColliderBuilder::new(shape)
    }

    pub fn aabb(&self, body_transform: &Transform) -> Aabb {
        self.shape.compute_aabb(body_transform)
    }

    pub fn mass_data(&self) -> MassData {
        self.shape.compute_mass(self.material.density)
    }
}

/// Description of a fixture before it is attached to a body.
#[derive(Debug, Clone)]
pub struct ColliderBuilder {
    shape: ColliderShape,
    material: Material,
    is_sensor: bool,
}

impl ColliderBuilder {
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            material: Material::default(),
            is_sensor: false,
        }
    }

    pub fn density(mut self, density: f32) -> Self {
        self.material.density = density;
        self
    }

    pub fn friction(mut self, friction: f32) -> Self {
        self.material.friction = friction;
        self
    }

    pub fn restitution(mut self, restitution: f32) -> Self {
        self.material.restitution = restitution;
        self
    }

    pub fn material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn sensor(mut self, is_sensor: bool) -> Self {
        self.is_sensor = is_sensor;
        self
    }

    pub(crate) fn build(self, id: ColliderHandle, rigidbody_id: BodyHandle) -> Collider {
        Collider {
            id,
            rigidbody_id,
            shape: self.shape,
            material: self.material,
            is_sensor: self.is_sensor,
            proxy: None,
        }
    }
}
