use glam::Vec2;

use crate::{
    collision::{
        clipping::{clip_segment_to_line, ClipVertex, ContactFeature, FeatureType},
        contact::{Manifold, ManifoldKind, ManifoldPoint},
        shapes::PolygonShape,
    },
    config::LINEAR_SLOP,
    core::{collider::ColliderShape, types::Transform},
    utils::math::cross_vs,
};

/// Exact shape-pair tests producing body-local contact manifolds.
pub struct NarrowPhase;

impl NarrowPhase {
    /// Evaluates the manifold between two posed shapes. Empty when separated.
    pub fn collide(
        shape_a: &ColliderShape,
        xf_a: &Transform,
        shape_b: &ColliderShape,
        xf_b: &Transform,
    ) -> Manifold {
        match (shape_a, shape_b) {
            (
                ColliderShape::Circle {
                    center: center_a,
                    radius: radius_a,
                },
                ColliderShape::Circle {
                    center: center_b,
                    radius: radius_b,
                },
            ) => collide_circles(*center_a, *radius_a, xf_a, *center_b, *radius_b, xf_b),
            (ColliderShape::Polygon(polygon), ColliderShape::Circle { center, radius }) => {
                collide_polygon_circle(polygon, xf_a, *center, *radius, xf_b)
            }
            (ColliderShape::Circle { center, radius }, ColliderShape::Polygon(polygon)) => {
                // Same frames with roles swapped: a face on B.
                let mut manifold = collide_polygon_circle(polygon, xf_b, *center, *radius, xf_a);
                if manifold.kind == ManifoldKind::FaceA {
                    manifold.kind = ManifoldKind::FaceB;
                }
                manifold
            }
            (ColliderShape::Polygon(poly_a), ColliderShape::Polygon(poly_b)) => {
                collide_polygons(poly_a, xf_a, poly_b, xf_b)
            }
        }
    }

    pub fn test_overlap(
        shape_a: &ColliderShape,
        xf_a: &Transform,
        shape_b: &ColliderShape,
        xf_b: &Transform,
    ) -> bool {
        !Self::collide(shape_a, xf_a, shape_b, xf_b).is_empty()
    }
}

fn collide_circles(
    center_a: Vec2,
    radius_a: f32,
    xf_a: &Transform,
    center_b: Vec2,
    radius_b: f32,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::default();
    let p_a = xf_a.apply(center_a);
    let p_b = xf_b.apply(center_b);
    let radius = radius_a + radius_b;
    if p_a.distance_squared(p_b) > radius * radius {
        return manifold;
    }

    manifold.kind = ManifoldKind::Circles;
    manifold.local_point = center_a;
    manifold.local_normal = Vec2::ZERO;
    manifold.push(ManifoldPoint {
        local_point: center_b,
        ..Default::default()
    });
    manifold
}

fn collide_polygon_circle(
    polygon: &PolygonShape,
    xf_a: &Transform,
    center: Vec2,
    circle_radius: f32,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::default();

    // Circle center in the polygon frame.
    let c_local = xf_a.apply_inverse(xf_b.apply(center));

    let radius = polygon.radius() + circle_radius;
    let vertices = polygon.vertices();
    let normals = polygon.normals();
    let count = vertices.len();

    let mut normal_index = 0;
    let mut separation = f32::MIN;
    for i in 0..count {
        let s = normals[i].dot(c_local - vertices[i]);
        if s > radius {
            return manifold;
        }
        if s > separation {
            separation = s;
            normal_index = i;
        }
    }

    let v1 = vertices[normal_index];
    let v2 = vertices[(normal_index + 1) % count];
    manifold.kind = ManifoldKind::FaceA;
    let point = ManifoldPoint {
        local_point: center,
        ..Default::default()
    };

    // Center inside the polygon.
    if separation < f32::EPSILON {
        manifold.local_normal = normals[normal_index];
        manifold.local_point = 0.5 * (v1 + v2);
        manifold.push(point);
        return manifold;
    }

    let u1 = (c_local - v1).dot(v2 - v1);
    let u2 = (c_local - v2).dot(v1 - v2);
    if u1 <= 0.0 {
        if c_local.distance_squared(v1) > radius * radius {
            return Manifold::default();
        }
        manifold.local_normal = (c_local - v1).normalize_or_zero();
        manifold.local_point = v1;
    } else if u2 <= 0.0 {
        if c_local.distance_squared(v2) > radius * radius {
            return Manifold::default();
        }
        manifold.local_normal = (c_local - v2).normalize_or_zero();
        manifold.local_point = v2;
    } else {
        let face_center = 0.5 * (v1 + v2);
        if (c_local - face_center).dot(normals[normal_index]) > radius {
            return Manifold::default();
        }
        manifold.local_normal = normals[normal_index];
        manifold.local_point = face_center;
    }
    manifold.push(point);
    manifold
}

/// Edge of `poly1` with the largest separation from `poly2`.
fn find_max_separation(
    poly1: &PolygonShape,
    xf1: &Transform,
    poly2: &PolygonShape,
    xf2: &Transform,
) -> (usize, f32) {
    // Work in the frame of poly2.
    let xf = xf2.inverse_mul(xf1);
    let mut best_index = 0;
    let mut max_separation = f32::MIN;

    for (i, (n1, v1)) in poly1.normals().iter().zip(poly1.vertices()).enumerate() {
        let n = xf.rotate_vector(*n1);
        let v = xf.apply(*v1);
        let si = poly2
            .vertices()
            .iter()
            .map(|v2| n.dot(*v2 - v))
            .fold(f32::MAX, f32::min);
        if si > max_separation {
            max_separation = si;
            best_index = i;
        }
    }
    (best_index, max_separation)
}

/// Edge of `poly2` most anti-parallel to the reference normal, in world space.
fn find_incident_edge(
    poly1: &PolygonShape,
    xf1: &Transform,
    edge1: usize,
    poly2: &PolygonShape,
    xf2: &Transform,
) -> [ClipVertex; 2] {
    let normal1 = xf2.inverse_rotate_vector(xf1.rotate_vector(poly1.normals()[edge1]));

    let mut index = 0;
    let mut min_dot = f32::MAX;
    for (i, n2) in poly2.normals().iter().enumerate() {
        let dot = normal1.dot(*n2);
        if dot < min_dot {
            min_dot = dot;
            index = i;
        }
    }

    let i1 = index;
    let i2 = (i1 + 1) % poly2.vertex_count();
    let vertices2 = poly2.vertices();
    [
        ClipVertex {
            point: xf2.apply(vertices2[i1]),
            id: ContactFeature {
                index_a: edge1 as u8,
                index_b: i1 as u8,
                type_a: FeatureType::Face,
                type_b: FeatureType::Vertex,
            },
        },
        ClipVertex {
            point: xf2.apply(vertices2[i2]),
            id: ContactFeature {
                index_a: edge1 as u8,
                index_b: i2 as u8,
                type_a: FeatureType::Face,
                type_b: FeatureType::Vertex,
            },
        },
    ]
}

/// Separating-axis test followed by clipping the incident edge against the reference face.
fn collide_polygons(
    poly_a: &PolygonShape,
    xf_a: &Transform,
    poly_b: &PolygonShape,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::default();
    let total_radius = poly_a.radius() + poly_b.radius();

    let (edge_a, separation_a) = find_max_separation(poly_a, xf_a, poly_b, xf_b);
    if separation_a > total_radius {
        return manifold;
    }
    let (edge_b, separation_b) = find_max_separation(poly_b, xf_b, poly_a, xf_a);
    if separation_b > total_radius {
        return manifold;
    }

    let tolerance = 0.1 * LINEAR_SLOP;
    let (poly1, xf1, poly2, xf2, edge1, flip) = if separation_b > separation_a + tolerance {
        manifold.kind = ManifoldKind::FaceB;
        (poly_b, xf_b, poly_a, xf_a, edge_b, true)
    } else {
        manifold.kind = ManifoldKind::FaceA;
        (poly_a, xf_a, poly_b, xf_b, edge_a, false)
    };

    let incident = find_incident_edge(poly1, xf1, edge1, poly2, xf2);

    let vertices1 = poly1.vertices();
    let iv1 = edge1;
    let iv2 = (edge1 + 1) % vertices1.len();
    let local_v11 = vertices1[iv1];
    let local_v12 = vertices1[iv2];

    let local_tangent = (local_v12 - local_v11).normalize_or_zero();
    let local_normal = cross_vs(local_tangent, 1.0);
    let plane_point = 0.5 * (local_v11 + local_v12);

    let tangent = xf1.rotate_vector(local_tangent);
    let normal = cross_vs(tangent, 1.0);

    let v11 = xf1.apply(local_v11);
    let v12 = xf1.apply(local_v12);

    let front_offset = normal.dot(v11);
    let side_offset1 = -tangent.dot(v11) + total_radius;
    let side_offset2 = tangent.dot(v12) + total_radius;

    let (clip1, count1) = clip_segment_to_line(&incident, -tangent, side_offset1, iv1 as u8);
    if count1 < 2 {
        return Manifold::default();
    }
    let (clip2, count2) = clip_segment_to_line(&clip1, tangent, side_offset2, iv2 as u8);
    if count2 < 2 {
        return Manifold::default();
    }

    manifold.local_normal = local_normal;
    manifold.local_point = plane_point;

    for clip in clip2.iter() {
        let separation = normal.dot(clip.point) - front_offset;
        if separation <= total_radius {
            manifold.push(ManifoldPoint {
                local_point: xf2.apply_inverse(clip.point),
                id: if flip { clip.id.flipped() } else { clip.id },
                ..Default::default()
            });
        }
    }

    manifold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{collision::contact::WorldManifold, config::POLYGON_RADIUS};
    use approx::assert_relative_eq;

    fn at(x: f32, y: f32) -> Transform {
        Transform::new(Vec2::new(x, y), 0.0)
    }

    #[test]
    fn circles_touch_only_when_radii_overlap() {
        let a = ColliderShape::circle(0.5);
        let b = ColliderShape::circle(0.5);
        assert!(NarrowPhase::test_overlap(&a, &at(0.0, 0.0), &b, &at(0.9, 0.0)));
        assert!(!NarrowPhase::test_overlap(&a, &at(0.0, 0.0), &b, &at(1.1, 0.0)));
    }

    #[test]
    fn box_resting_on_box_yields_two_points() {
        let ground = ColliderShape::cuboid(5.0, 0.5);
        let crate_box = ColliderShape::cuboid(0.5, 0.5);
        let xf_a = at(0.0, 0.0);
        let xf_b = at(0.0, 0.95);
        let manifold = NarrowPhase::collide(&ground, &xf_a, &crate_box, &xf_b);
        assert_eq!(manifold.point_count, 2);

        let world = WorldManifold::new(&manifold, &xf_a, POLYGON_RADIUS, &xf_b, POLYGON_RADIUS);
        assert_relative_eq!(world.normal.y, 1.0, epsilon = 1e-5);
        for separation in &world.separations[..world.point_count] {
            assert_relative_eq!(*separation, -0.05 - 2.0 * POLYGON_RADIUS, epsilon = 1e-4);
        }
    }

    #[test]
    fn separated_boxes_have_no_manifold() {
        let a = ColliderShape::cuboid(0.5, 0.5);
        let b = ColliderShape::cuboid(0.5, 0.5);
        let manifold = NarrowPhase::collide(&a, &at(0.0, 0.0), &b, &at(1.5, 0.0));
        assert!(manifold.is_empty());
    }

    #[test]
    fn circle_against_polygon_face_in_either_order() {
        let polygon = ColliderShape::cuboid(1.0, 1.0);
        let circle = ColliderShape::circle(0.5);
        let xf_poly = at(0.0, 0.0);
        let xf_circle = at(1.3, 0.0);

        let forward = NarrowPhase::collide(&polygon, &xf_poly, &circle, &xf_circle);
        assert_eq!(forward.kind, ManifoldKind::FaceA);
        let world = WorldManifold::new(&forward, &xf_poly, POLYGON_RADIUS, &xf_circle, 0.5);
        assert_relative_eq!(world.normal.x, 1.0, epsilon = 1e-5);

        let reverse = NarrowPhase::collide(&circle, &xf_circle, &polygon, &xf_poly);
        assert_eq!(reverse.kind, ManifoldKind::FaceB);
        let world = WorldManifold::new(&reverse, &xf_circle, 0.5, &xf_poly, POLYGON_RADIUS);
        assert_relative_eq!(world.normal.x, -1.0, epsilon = 1e-5);
        assert!(world.separations[0] < 0.0);
    }

    #[test]
    fn circle_near_polygon_corner_uses_vertex_normal() {
        let polygon = ColliderShape::cuboid(1.0, 1.0);
        let circle = ColliderShape::circle(0.5);
        let manifold = NarrowPhase::collide(&polygon, &at(0.0, 0.0), &circle, &at(1.3, 1.3));
        assert_eq!(manifold.point_count, 1);
        assert_relative_eq!(manifold.local_point.x, 1.0);
        assert_relative_eq!(manifold.local_normal.x, manifold.local_normal.y, epsilon = 1e-5);
    }
}
