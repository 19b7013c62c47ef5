//! Core types describing bodies, fixtures and shared math data.

pub mod collider;
pub mod rigidbody;
pub mod types;

pub use collider::{BodyHandle, Collider, ColliderBuilder, ColliderHandle, ColliderShape};
pub use rigidbody::{BodyDef, BodyType, RigidBody};
pub use types::{MassData, Material, Transform, Velocity};
