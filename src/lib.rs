//! Collidable – collision bodies for game entities on a compact 2D rigid-body core.
//!
//! Entities live in a [`CollisionManager`], each bound to at most one body in
//! the owned [`PhysicsWorld`]. Every step advances the simulation, reports each
//! touching pair of live entities exactly once per side through
//! [`CollisionHandler`], and then releases the bodies of entities marked
//! destroyed. Game code works in display units (20 per meter) and degrees.

pub mod collision;
pub mod config;
pub mod core;
#[cfg(feature = "debug-draw")]
pub mod debug_draw;
pub mod dynamics;
pub mod error;
pub mod utils;
pub mod world;

pub use glam::Vec2;

pub use collision::{aabb::Aabb, contact::Contact, shapes::PolygonShape};
pub use config::{CleanupPolicy, WorldConfig, PIXELS_PER_METER};
pub use core::{
    collider::{BodyHandle, Collider, ColliderBuilder, ColliderHandle, ColliderShape},
    rigidbody::{BodyDef, BodyType, RigidBody},
    types::{Material, Transform, Velocity},
};
#[cfg(feature = "debug-draw")]
pub use debug_draw::{Color, DebugDraw, DisplayScaled, DrawFlags};
pub use error::GeometryError;
pub use utils::{
    allocator::{Arena, GenerationalId, Handle},
    profiling::StepProfile,
};
pub use world::{
    collidable::{
        Collidable, CollidableId, CollidableMut, CollidableRef, CollisionHandler, CollisionPair,
    },
    collision_manager::CollisionManager,
    shape_builder::{partition_fan, ShapeDef},
    PhysicsWorld,
};
