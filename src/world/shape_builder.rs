//! Turns display-space shape descriptions into fixtures on an entity's body.
//!
//! Circles and boxes map onto a single fixture. Polygon chains are cut into a
//! fan of convex windows that all share the chain's first point, so arbitrarily
//! long outlines fit the per-fixture vertex limit.

use glam::Vec2;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    collision::shapes::PolygonShape,
    config::{DEFAULT_DENSITY, DEFAULT_FRICTION, MAX_POLYGON_VERTICES, PIXELS_PER_METER},
    core::{
        collider::{BodyHandle, ColliderBuilder, ColliderShape},
        rigidbody::{BodyDef, BodyType},
    },
    error::GeometryError,
    utils::{
        math::format_points,
        units::{length_to_sim, to_sim},
    },
    world::{
        collidable::{Collidable, CollidableId},
        PhysicsWorld,
    },
};

/// Shape description in display units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeDef {
    Circle { radius: f32 },
    /// Axis-aligned box of full `size`, centred on `origin` in body space.
    Box { size: Vec2, origin: Vec2 },
    /// Outline chain; convex fans are built from point 0.
    Polygon(Vec<Vec2>),
}

/// Splits a chain into fan windows of at most `max_vertices` points anchored at `points[0]`.
///
/// Windows shorter than three points are dropped, so chains under three points
/// yield nothing.
pub fn partition_fan(points: &[Vec2], max_vertices: usize) -> Vec<Vec<Vec2>> {
    let mut windows = Vec::new();
    if points.len() < 3 || max_vertices < 3 {
        return windows;
    }

    let stride = max_vertices - 2;
    let mut offset = 1;
    while offset < points.len() {
        let len = max_vertices.min(points.len() - offset + 1);
        if len < 3 {
            break;
        }
        let mut window = Vec::with_capacity(len);
        window.push(points[0]);
        window.extend_from_slice(&points[offset..offset + len - 1]);
        windows.push(window);
        offset += stride;
    }
    windows
}

pub(crate) fn apply_shape<T>(world: &mut PhysicsWorld, entity: &mut Collidable<T>, shape: &ShapeDef) {
    match shape {
        ShapeDef::Circle { radius } => set_circle(world, entity, *radius),
        ShapeDef::Box { size, origin } => set_box(world, entity, *size, *origin),
        ShapeDef::Polygon(points) => set_polygon(world, entity, points),
    }
}

pub(crate) fn set_circle<T>(world: &mut PhysicsWorld, entity: &mut Collidable<T>, radius: f32) {
    let shape = ColliderShape::Circle {
        center: Vec2::ZERO,
        radius: length_to_sim(radius),
    };
    if let Some(body) = prepare_body(world, entity) {
        add_fixture(world, entity, body, shape);
    }
}

pub(crate) fn set_box<T>(world: &mut PhysicsWorld, entity: &mut Collidable<T>, size: Vec2, origin: Vec2) {
    let half = to_sim(size) * 0.5;
    let shape = ColliderShape::Polygon(PolygonShape::new_box(half.x, half.y, to_sim(origin), 0.0));
    if let Some(body) = prepare_body(world, entity) {
        add_fixture(world, entity, body, shape);
    }
}

pub(crate) fn set_polygon<T>(world: &mut PhysicsWorld, entity: &mut Collidable<T>, points: &[Vec2]) {
    let mut body = None;
    for (index, window) in partition_fan(points, MAX_POLYGON_VERTICES).iter().enumerate() {
        let local: Vec<Vec2> = window.iter().map(|p| to_sim(*p)).collect();
        let shape = match PolygonShape::new(&local) {
            Ok(polygon) => ColliderShape::Polygon(polygon),
            Err(err) => {
                warn!("{}", invalid_polygon_report(entity.id(), index, &err, points));
                entity.destroy();
                let half = 1.0 / PIXELS_PER_METER;
                ColliderShape::Polygon(PolygonShape::new_box(half, half, local[0], 0.0))
            }
        };

        if index == 0 {
            body = prepare_body(world, entity);
        }
        if let Some(body) = body {
            add_fixture(world, entity, body, shape);
        }
    }
}

/// Warning text for a rejected fan window; carries the whole input chain.
fn invalid_polygon_report(
    id: CollidableId,
    window: usize,
    err: &GeometryError,
    points: &[Vec2],
) -> String {
    format!(
        "entity {:?}: invalid polygon fixture {window} ({err}) from {} points: {}",
        id,
        points.len(),
        format_points(points)
    )
}

/// Empties the existing body or creates a new one for a fresh shape.
fn prepare_body<T>(world: &mut PhysicsWorld, entity: &mut Collidable<T>) -> Option<BodyHandle> {
    if let Some(body) = entity.body() {
        if world.body(body).is_some() {
            world.clear_colliders(body);
            return Some(body);
        }
    }

    let def = BodyDef {
        body_type: entity_body_type(entity.static_physics()),
        allow_sleep: false,
        user_data: Some(entity.id().to_bits()),
        ..Default::default()
    };
    let body = world.create_body(&def);
    debug!("entity {:?} bound to body {:?}", entity.id(), body);
    entity.set_body(Some(body));
    Some(body)
}

fn add_fixture<T>(world: &mut PhysicsWorld, entity: &Collidable<T>, body: BodyHandle, shape: ColliderShape) {
    let builder = ColliderBuilder::new(shape)
        .density(DEFAULT_DENSITY)
        .friction(DEFAULT_FRICTION)
        .restitution(0.0)
        .sensor(!entity.physics_enabled());
    world.create_collider(body, builder);
}

pub(crate) fn entity_body_type(static_physics: bool) -> BodyType {
    if static_physics {
        BodyType::Kinematic
    } else {
        BodyType::Dynamic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(n: usize) -> Vec<Vec2> {
        (0..n).map(|i| Vec2::new(i as f32, (i * i) as f32)).collect()
    }

    #[test]
    fn short_chains_produce_no_windows() {
        assert!(partition_fan(&chain(0), 8).is_empty());
        assert!(partition_fan(&chain(2), 8).is_empty());
        assert_eq!(partition_fan(&chain(3), 8).len(), 1);
    }

    #[test]
    fn windows_share_the_anchor_and_overlap_by_one_edge() {
        let points = chain(15);
        let windows = partition_fan(&points, 8);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].len(), 8);
        assert_eq!(windows[1].len(), 8);
        assert_eq!(windows[2].len(), 3);
        for window in &windows {
            assert_eq!(window[0], points[0]);
        }
        assert_eq!(&windows[0][1..], &points[1..8]);
        assert_eq!(&windows[1][1..], &points[7..14]);
        assert_eq!(&windows[2][1..], &points[13..15]);
    }

    #[test]
    fn trailing_window_below_three_points_is_dropped() {
        // offset 7 leaves p7 alone with the anchor
        let windows = partition_fan(&chain(8), 8);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].len(), 8);
        assert_eq!(partition_fan(&chain(14), 8).len(), 2);
    }

    #[test]
    fn invalid_polygon_report_lists_the_whole_chain() {
        let points = chain(40);
        let err = GeometryError::NonConvex { index: 2 };
        let report = invalid_polygon_report(CollidableId::from_bits(5), 3, &err, &points);

        assert!(report.contains("fixture 3"));
        assert!(report.contains("from 40 points"));
        assert!(report.contains(&format_points(&points)));
        assert!(report.contains("(39.000, 1521.000)"));
    }

    #[test]
    fn matches_ceiling_formula_when_last_window_is_full_enough() {
        for n in [3usize, 5, 7, 9, 10, 13, 19, 25] {
            let expected = (n - 1).div_ceil(6);
            assert_eq!(partition_fan(&chain(n), 8).len(), expected, "n = {n}");
        }
    }
}
