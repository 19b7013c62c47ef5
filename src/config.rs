//! Global configuration constants and the serializable world configuration.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Display units per simulation unit (pixels per meter).
pub const PIXELS_PER_METER: f32 = 20.0;

/// Velocity iterations performed by the contact solver per step.
pub const VELOCITY_ITERATIONS: u32 = 4;

/// Position correction iterations performed per step.
pub const POSITION_ITERATIONS: u32 = 8;

/// Maximum number of vertices a single convex polygon fixture can hold.
pub const MAX_POLYGON_VERTICES: usize = 8;

/// Number of points used when a circle is reported as an outline.
pub const CIRCLE_OUTLINE_SEGMENTS: usize = 32;

/// Number of segments used by debug drawers that tessellate circles.
pub const DEBUG_CIRCLE_SEGMENTS: usize = 16;

/// Density assigned to fixtures created for collidable entities.
pub const DEFAULT_DENSITY: f32 = 1.0;

/// Friction assigned to fixtures created for collidable entities.
pub const DEFAULT_FRICTION: f32 = 0.1;

/// Collision and constraint tolerance (meters).
pub const LINEAR_SLOP: f32 = 0.005;

/// Skin radius around polygons used to keep resting contacts stable.
pub const POLYGON_RADIUS: f32 = 2.0 * LINEAR_SLOP;

/// Fattening applied to broadphase proxies so small motions skip re-insertion.
pub const AABB_MARGIN: f32 = 0.1;

/// Predictive fattening multiplier applied to the frame displacement.
pub const AABB_DISPLACEMENT_MULTIPLIER: f32 = 2.0;

/// Largest position correction applied in one position iteration.
pub const MAX_LINEAR_CORRECTION: f32 = 0.2;

/// Fraction of overlap resolved per position iteration.
pub const BAUMGARTE: f32 = 0.2;

/// Relative normal speed under which collisions are treated as inelastic.
pub const VELOCITY_THRESHOLD: f32 = 1.0;

/// Maximum translation of a body in a single step (meters).
pub const MAX_TRANSLATION: f32 = 2.0;

/// Maximum rotation of a body in a single step (radians).
pub const MAX_ROTATION: f32 = 0.5 * std::f32::consts::PI;

/// Time a body must rest before it falls asleep (seconds).
pub const TIME_TO_SLEEP: f32 = 0.5;

/// Linear speed under which a body counts as resting.
pub const LINEAR_SLEEP_TOLERANCE: f32 = 0.01;

/// Angular speed under which a body counts as resting (radians/sec).
pub const ANGULAR_SLEEP_TOLERANCE: f32 = 2.0 / 180.0 * std::f32::consts::PI;

/// Default cell size for the broad-phase uniform grid (meters).
pub const DEFAULT_BROADPHASE_CELL_SIZE: f32 = 4.0;

/// Which destroyed entities the collision pass releases at the end of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CleanupPolicy {
    /// Only the last destroyed participant met during the contact walk.
    LastContacting,
    /// Every destroyed participant of a touching contact.
    #[default]
    AllContacting,
    /// Every destroyed entity, touching or not.
    AllDestroyed,
}

/// Tunables for a [`crate::world::PhysicsWorld`] and its collision manager.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Gravity in simulation units per second squared.
    pub gravity: Vec2,
    pub velocity_iterations: u32,
    pub position_iterations: u32,
    pub cleanup: CleanupPolicy,
    pub broadphase_cell_size: f32,
    /// Warn when a single manager step exceeds this many milliseconds.
    pub frame_budget_ms: Option<f32>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::ZERO,
            velocity_iterations: VELOCITY_ITERATIONS,
            position_iterations: POSITION_ITERATIONS,
            cleanup: CleanupPolicy::default(),
            broadphase_cell_size: DEFAULT_BROADPHASE_CELL_SIZE,
            frame_budget_ms: None,
        }
    }
}

impl WorldConfig {
    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_cleanup(mut self, cleanup: CleanupPolicy) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn with_frame_budget(mut self, budget_ms: f32) -> Self {
        self.frame_budget_ms = Some(budget_ms);
        self
    }
}
