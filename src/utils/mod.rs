//! Utility helpers: generational arena, unit conversion, math extensions, logging and profiling.

pub mod allocator;
pub mod logging;
pub mod math;
pub mod profiling;
pub mod units;

pub use allocator::{Arena, GenerationalId, Handle};
pub use math::*;
pub use profiling::StepProfile;
