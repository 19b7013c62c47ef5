//! Debug overlay: a draw-callback trait and a read-only traversal of the world.

use std::ops::{BitOr, BitOrAssign};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{
    config::{DEBUG_CIRCLE_SEGMENTS, PIXELS_PER_METER},
    core::{
        collider::ColliderShape,
        rigidbody::{BodyType, RigidBody},
        types::Transform,
    },
    world::PhysicsWorld,
};

/// Normalised RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::rgb(1.0, 1.0, 1.0)
    }
}

pub const DISABLED_COLOR: Color = Color::rgb(0.5, 0.5, 0.3);
pub const STATIC_COLOR: Color = Color::rgb(0.5, 0.9, 0.5);
pub const KINEMATIC_COLOR: Color = Color::rgb(0.5, 0.5, 0.9);
pub const ASLEEP_COLOR: Color = Color::rgb(0.6, 0.6, 0.6);
pub const DYNAMIC_COLOR: Color = Color::rgb(0.9, 0.7, 0.7);
pub const AABB_COLOR: Color = Color::rgb(0.9, 0.3, 0.9);
pub const PAIR_COLOR: Color = Color::rgb(0.3, 0.9, 0.9);

/// Which layers [`PhysicsWorld::draw_debug`] emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DrawFlags(u32);

impl DrawFlags {
    pub const SHAPES: Self = Self(1);
    pub const AABBS: Self = Self(1 << 1);
    pub const CENTER_OF_MASS: Self = Self(1 << 2);
    pub const PAIRS: Self = Self(1 << 3);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn all() -> Self {
        Self(Self::SHAPES.0 | Self::AABBS.0 | Self::CENTER_OF_MASS.0 | Self::PAIRS.0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for DrawFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for DrawFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Receiver of debug geometry. Every method defaults to doing nothing.
pub trait DebugDraw {
    fn draw_polygon(&mut self, vertices: &[Vec2], color: Color) {
        let _ = (vertices, color);
    }

    fn draw_solid_polygon(&mut self, vertices: &[Vec2], color: Color) {
        let _ = (vertices, color);
    }

    fn draw_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        let _ = (center, radius, color);
    }

    /// `axis` is a unit vector showing the body's rotation.
    fn draw_solid_circle(&mut self, center: Vec2, radius: f32, axis: Vec2, color: Color) {
        let _ = (center, radius, axis, color);
    }

    fn draw_segment(&mut self, p1: Vec2, p2: Vec2, color: Color) {
        let _ = (p1, p2, color);
    }

    /// Angle in radians.
    fn draw_transform(&mut self, position: Vec2, angle: f32) {
        let _ = (position, angle);
    }
}

/// Forwards draw calls with positions and lengths converted to display units.
pub struct DisplayScaled<'a, D: DebugDraw + ?Sized> {
    inner: &'a mut D,
}

impl<'a, D: DebugDraw + ?Sized> DisplayScaled<'a, D> {
    pub fn new(inner: &'a mut D) -> Self {
        Self { inner }
    }

    fn scale_all(vertices: &[Vec2]) -> Vec<Vec2> {
        vertices.iter().map(|v| *v * PIXELS_PER_METER).collect()
    }
}

impl<'a, D: DebugDraw + ?Sized> DebugDraw for DisplayScaled<'a, D> {
    fn draw_polygon(&mut self, vertices: &[Vec2], color: Color) {
        self.inner.draw_polygon(&Self::scale_all(vertices), color);
    }

    fn draw_solid_polygon(&mut self, vertices: &[Vec2], color: Color) {
        self.inner
            .draw_solid_polygon(&Self::scale_all(vertices), color);
    }

    fn draw_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.inner
            .draw_circle(center * PIXELS_PER_METER, radius * PIXELS_PER_METER, color);
    }

    fn draw_solid_circle(&mut self, center: Vec2, radius: f32, axis: Vec2, color: Color) {
        self.inner.draw_solid_circle(
            center * PIXELS_PER_METER,
            radius * PIXELS_PER_METER,
            axis,
            color,
        );
    }

    fn draw_segment(&mut self, p1: Vec2, p2: Vec2, color: Color) {
        self.inner
            .draw_segment(p1 * PIXELS_PER_METER, p2 * PIXELS_PER_METER, color);
    }

    fn draw_transform(&mut self, position: Vec2, angle: f32) {
        self.inner.draw_transform(position * PIXELS_PER_METER, angle);
    }
}

pub fn body_color(body: &RigidBody) -> Color {
    if !body.is_enabled() {
        DISABLED_COLOR
    } else if body.body_type() == BodyType::Static {
        STATIC_COLOR
    } else if body.body_type() == BodyType::Kinematic {
        KINEMATIC_COLOR
    } else if !body.is_awake() {
        ASLEEP_COLOR
    } else {
        DYNAMIC_COLOR
    }
}

/// Regular polygon approximation of a circle, for drawers without circle primitives.
pub fn circle_vertices(center: Vec2, radius: f32) -> Vec<Vec2> {
    let step = std::f32::consts::TAU / DEBUG_CIRCLE_SEGMENTS as f32;
    (0..DEBUG_CIRCLE_SEGMENTS)
        .map(|i| center + radius * Vec2::from_angle(step * i as f32))
        .collect()
}

fn draw_shape<D: DebugDraw + ?Sized>(
    drawer: &mut D,
    shape: &ColliderShape,
    xf: &Transform,
    color: Color,
) {
    match shape {
        ColliderShape::Circle { center, radius } => {
            let axis = xf.rotate_vector(Vec2::X);
            drawer.draw_solid_circle(xf.apply(*center), *radius, axis, color);
        }
        ColliderShape::Polygon(polygon) => {
            let vertices: Vec<Vec2> = polygon.vertices().iter().map(|v| xf.apply(*v)).collect();
            drawer.draw_solid_polygon(&vertices, color);
        }
    }
}

impl PhysicsWorld {
    /// Emits the layers selected by `flags`, in simulation units.
    pub fn draw_debug<D: DebugDraw + ?Sized>(&self, drawer: &mut D, flags: DrawFlags) {
        if flags.contains(DrawFlags::SHAPES) {
            for (_, body) in self.bodies() {
                let xf = body.transform();
                let color = body_color(body);
                for handle in body.colliders() {
                    if let Some(collider) = self.collider(*handle) {
                        draw_shape(drawer, &collider.shape, &xf, color);
                    }
                }
            }
        }

        if flags.contains(DrawFlags::PAIRS) {
            for contact in self.contacts() {
                let (a, b) = contact.colliders();
                if let (Some(fat_a), Some(fat_b)) = (self.fat_aabb(a), self.fat_aabb(b)) {
                    drawer.draw_segment(fat_a.center(), fat_b.center(), PAIR_COLOR);
                }
            }
        }

        if flags.contains(DrawFlags::AABBS) {
            for (_, body) in self.bodies() {
                if !body.is_enabled() {
                    continue;
                }
                for handle in body.colliders() {
                    if let Some(fat) = self.fat_aabb(*handle) {
                        drawer.draw_polygon(&fat.corners(), AABB_COLOR);
                    }
                }
            }
        }

        if flags.contains(DrawFlags::CENTER_OF_MASS) {
            for (_, body) in self.bodies() {
                drawer.draw_transform(body.world_center(), body.angle());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        segments: Vec<(Vec2, Vec2)>,
        circles: Vec<(Vec2, f32)>,
    }

    impl DebugDraw for Recorder {
        fn draw_segment(&mut self, p1: Vec2, p2: Vec2, _color: Color) {
            self.segments.push((p1, p2));
        }

        fn draw_circle(&mut self, center: Vec2, radius: f32, _color: Color) {
            self.circles.push((center, radius));
        }
    }

    #[test]
    fn flags_combine_and_test_membership() {
        let mut flags = DrawFlags::SHAPES | DrawFlags::CENTER_OF_MASS;
        assert!(flags.contains(DrawFlags::SHAPES));
        assert!(!flags.contains(DrawFlags::AABBS));
        flags.insert(DrawFlags::AABBS);
        flags.remove(DrawFlags::SHAPES);
        assert!(flags.contains(DrawFlags::AABBS | DrawFlags::CENTER_OF_MASS));
        assert!(!flags.contains(DrawFlags::SHAPES));
        assert!(DrawFlags::all().contains(DrawFlags::PAIRS));
        assert_eq!(DrawFlags::empty().bits(), 0);
    }

    #[test]
    fn display_scaled_converts_positions_and_lengths() {
        let mut recorder = Recorder::default();
        {
            let mut scaled = DisplayScaled::new(&mut recorder);
            scaled.draw_segment(Vec2::ZERO, Vec2::new(1.0, 0.5), Color::default());
            scaled.draw_circle(Vec2::new(0.5, 0.5), 0.25, Color::default());
            scaled.draw_polygon(&[Vec2::ONE], Color::default());
        }
        assert_eq!(recorder.segments, vec![(Vec2::ZERO, Vec2::new(20.0, 10.0))]);
        assert_eq!(recorder.circles, vec![(Vec2::new(10.0, 10.0), 5.0)]);
    }

    #[test]
    fn circle_vertices_lie_on_the_circle() {
        let vertices = circle_vertices(Vec2::new(1.0, 2.0), 3.0);
        assert_eq!(vertices.len(), DEBUG_CIRCLE_SEGMENTS);
        for v in vertices {
            assert!(((v - Vec2::new(1.0, 2.0)).length() - 3.0).abs() < 1e-5);
        }
    }
}
