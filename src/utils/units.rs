//! Conversion between display units (pixels, degrees) and simulation units (meters, radians).

use glam::Vec2;

use crate::config::PIXELS_PER_METER;

#[inline]
pub fn to_sim(v: Vec2) -> Vec2 {
    v / PIXELS_PER_METER
}

#[inline]
pub fn to_display(v: Vec2) -> Vec2 {
    v * PIXELS_PER_METER
}

#[inline]
pub fn length_to_sim(length: f32) -> f32 {
    length / PIXELS_PER_METER
}

#[inline]
pub fn length_to_display(length: f32) -> f32 {
    length * PIXELS_PER_METER
}

/// Converts degrees to radians without wrapping into any canonical range.
#[inline]
pub fn degrees_to_radians(degrees: f32) -> f32 {
    degrees / 180.0 * std::f32::consts::PI
}

#[inline]
pub fn radians_to_degrees(radians: f32) -> f32 {
    radians / std::f32::consts::PI * 180.0
}
