//! Collision detection modules: bounding boxes, broad-phase, narrow-phase and contact manifolds.

pub mod aabb;
pub mod broadphase;
pub mod clipping;
pub mod contact;
pub mod narrowphase;
pub mod shapes;

pub use aabb::Aabb;
pub use broadphase::{BroadPhase, SpatialGrid};
pub use contact::{Contact, ContactHandle, Manifold, ManifoldKind, WorldManifold};
pub use narrowphase::NarrowPhase;
pub use shapes::PolygonShape;
