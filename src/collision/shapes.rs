use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{
    collision::aabb::Aabb,
    config::{LINEAR_SLOP, MAX_POLYGON_VERTICES, POLYGON_RADIUS},
    core::types::{MassData, Transform},
    error::GeometryError,
    utils::math::cross_vs,
};

/// Points closer than this are welded together during polygon construction.
const WELD_DISTANCE: f32 = 0.5 * LINEAR_SLOP;

/// Relative tolerance for treating a turn as straight instead of concave.
const CONVEXITY_TOLERANCE: f32 = 1e-4;

/// Convex polygon stored counter-clockwise in body-local coordinates.
///
/// The first input point is kept as vertex 0, so fan fixtures built from the
/// same chain all start at their shared anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonShape {
    vertices: Vec<Vec2>,
    normals: Vec<Vec2>,
    centroid: Vec2,
    radius: f32,
}

impl PolygonShape {
    pub fn new(points: &[Vec2]) -> Result<Self, GeometryError> {
        if points.len() < 3 {
            return Err(GeometryError::TooFewVertices {
                count: points.len(),
            });
        }
        if points.len() > MAX_POLYGON_VERTICES {
            return Err(GeometryError::TooManyVertices {
                count: points.len(),
                max: MAX_POLYGON_VERTICES,
            });
        }

        let mut vertices: Vec<Vec2> = Vec::with_capacity(points.len());
        for &p in points {
            if !p.is_finite() {
                return Err(GeometryError::Degenerate);
            }
            let unique = vertices
                .iter()
                .all(|q| p.distance_squared(*q) > WELD_DISTANCE * WELD_DISTANCE);
            if unique {
                vertices.push(p);
            }
        }
        if vertices.len() < 3 {
            return Err(GeometryError::TooFewVertices {
                count: vertices.len(),
            });
        }

        let area2 = twice_signed_area(&vertices);
        if area2.abs() <= f32::EPSILON {
            return Err(GeometryError::Degenerate);
        }
        if area2 < 0.0 {
            vertices[1..].reverse();
        }

        check_convex(&vertices)?;

        let count = vertices.len();
        let normals = (0..count)
            .map(|i| {
                let edge = vertices[(i + 1) % count] - vertices[i];
                cross_vs(edge, 1.0).normalize_or_zero()
            })
            .collect();
        let centroid = compute_centroid(&vertices);

        Ok(Self {
            vertices,
            normals,
            centroid,
            radius: POLYGON_RADIUS,
        })
    }

    /// Oriented box with the given half extents, centred at `center` and rotated by `angle`.
    pub fn new_box(half_width: f32, half_height: f32, center: Vec2, angle: f32) -> Self {
        let xf = Transform::new(center, angle);
        let vertices = vec![
            xf.apply(Vec2::new(-half_width, -half_height)),
            xf.apply(Vec2::new(half_width, -half_height)),
            xf.apply(Vec2::new(half_width, half_height)),
            xf.apply(Vec2::new(-half_width, half_height)),
        ];
        let normals = vec![
            xf.rotate_vector(Vec2::new(0.0, -1.0)),
            xf.rotate_vector(Vec2::new(1.0, 0.0)),
            xf.rotate_vector(Vec2::new(0.0, 1.0)),
            xf.rotate_vector(Vec2::new(-1.0, 0.0)),
        ];
        Self {
            vertices,
            normals,
            centroid: center,
            radius: POLYGON_RADIUS,
        }
    }

    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    pub fn normals(&self) -> &[Vec2] {
        &self.normals
    }

    pub fn centroid(&self) -> Vec2 {
        self.centroid
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        let mut min = xf.apply(self.vertices[0]);
        let mut max = min;
        for v in &self.vertices[1..] {
            let p = xf.apply(*v);
            min = min.min(p);
            max = max.max(p);
        }
        Aabb::new(min, max).expanded(self.radius)
    }

    /// Mass properties for a uniform density, inertia taken about the shape origin.
    pub fn compute_mass(&self, density: f32) -> MassData {
        let reference = self.vertices[0];
        let count = self.vertices.len();
        let mut area = 0.0;
        let mut center = Vec2::ZERO;
        let mut inertia = 0.0;
        let third = 1.0 / 3.0;

        for i in 0..count {
            let e1 = self.vertices[i] - reference;
            let e2 = self.vertices[(i + 1) % count] - reference;
            let d = e1.perp_dot(e2);
            let triangle_area = 0.5 * d;
            area += triangle_area;
            center += triangle_area * third * (e1 + e2);

            let int_x2 = e1.x * e1.x + e2.x * e1.x + e2.x * e2.x;
            let int_y2 = e1.y * e1.y + e2.y * e1.y + e2.y * e2.y;
            inertia += (0.25 * third * d) * (int_x2 + int_y2);
        }

        if area <= f32::EPSILON {
            return MassData {
                center: reference,
                ..MassData::default()
            };
        }

        let mass = density * area;
        center /= area;
        let world_center = center + reference;
        // Shift the inertia from the reference vertex to the shape origin.
        let inertia = density * inertia
            + mass * (world_center.dot(world_center) - center.dot(center));

        MassData {
            mass,
            center: world_center,
            inertia,
        }
    }
}

/// Mass properties of a solid disk.
pub fn circle_mass(center: Vec2, radius: f32, density: f32) -> MassData {
    let mass = density * std::f32::consts::PI * radius * radius;
    MassData {
        mass,
        center,
        inertia: mass * (0.5 * radius * radius + center.dot(center)),
    }
}

pub fn circle_aabb(center: Vec2, radius: f32, xf: &Transform) -> Aabb {
    let p = xf.apply(center);
    Aabb::new(p - Vec2::splat(radius), p + Vec2::splat(radius))
}

fn twice_signed_area(vertices: &[Vec2]) -> f32 {
    let origin = vertices[0];
    vertices
        .windows(2)
        .skip(1)
        .map(|w| (w[0] - origin).perp_dot(w[1] - origin))
        .sum()
}

fn compute_centroid(vertices: &[Vec2]) -> Vec2 {
    let origin = vertices[0];
    let mut area = 0.0;
    let mut centroid = Vec2::ZERO;
    for w in vertices.windows(2).skip(1) {
        let e1 = w[0] - origin;
        let e2 = w[1] - origin;
        let a = 0.5 * e1.perp_dot(e2);
        area += a;
        centroid += a * (e1 + e2) / 3.0;
    }
    origin + centroid / area
}

/// Rejects reflex corners and outlines that wind around more than once.
fn check_convex(vertices: &[Vec2]) -> Result<(), GeometryError> {
    let count = vertices.len();
    let mut turning = 0.0;
    for i in 0..count {
        let prev = vertices[(i + count - 1) % count];
        let current = vertices[i];
        let next = vertices[(i + 1) % count];
        let e0 = current - prev;
        let e1 = next - current;
        let cross = e0.perp_dot(e1);
        if cross < -CONVEXITY_TOLERANCE * e0.length() * e1.length() {
            return Err(GeometryError::NonConvex { index: i });
        }
        turning += cross.atan2(e0.dot(e1));
    }

    if turning > std::f32::consts::TAU + 0.1 {
        return Err(GeometryError::NonConvex { index: 0 });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(half: f32) -> Vec<Vec2> {
        vec![
            Vec2::new(-half, -half),
            Vec2::new(half, -half),
            Vec2::new(half, half),
            Vec2::new(-half, half),
        ]
    }

    #[test]
    fn clockwise_input_is_rewound_keeping_anchor_first() {
        let mut points = square(1.0);
        points.reverse();
        let anchor = points[0];
        let polygon = PolygonShape::new(&points).expect("square is valid");
        assert_eq!(polygon.vertices()[0], anchor);
        assert!(twice_signed_area(polygon.vertices()) > 0.0);
    }

    #[test]
    fn rejects_bad_outlines() {
        assert_eq!(
            PolygonShape::new(&[Vec2::ZERO, Vec2::X]),
            Err(GeometryError::TooFewVertices { count: 2 })
        );
        assert_eq!(
            PolygonShape::new(&[Vec2::ZERO, Vec2::X, Vec2::new(2.0, 0.0)]),
            Err(GeometryError::Degenerate)
        );
        assert_eq!(
            PolygonShape::new(&[Vec2::ZERO, Vec2::ZERO, Vec2::X]),
            Err(GeometryError::TooFewVertices { count: 2 })
        );
        let dart = [
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 1.0),
            Vec2::new(0.0, 2.0),
            Vec2::new(0.5, 1.0),
        ];
        assert!(matches!(
            PolygonShape::new(&dart),
            Err(GeometryError::NonConvex { .. })
        ));
        let nine: Vec<Vec2> = (0..9)
            .map(|i| Vec2::from_angle(i as f32 * 0.6))
            .collect();
        assert!(matches!(
            PolygonShape::new(&nine),
            Err(GeometryError::TooManyVertices { count: 9, .. })
        ));
    }

    #[test]
    fn rejects_pentagram() {
        let star: Vec<Vec2> = (0..5)
            .map(|i| Vec2::from_angle(i as f32 * 2.0 * std::f32::consts::TAU / 5.0))
            .collect();
        assert!(PolygonShape::new(&star).is_err());
    }

    #[test]
    fn square_mass_properties() {
        let polygon = PolygonShape::new(&square(1.0)).expect("valid");
        let mass = polygon.compute_mass(2.0);
        assert_relative_eq!(mass.mass, 8.0, epsilon = 1e-4);
        assert_relative_eq!(mass.center.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(mass.center.y, 0.0, epsilon = 1e-5);
        // m * (w^2 + h^2) / 12
        assert_relative_eq!(mass.inertia, 8.0 * 8.0 / 12.0, epsilon = 1e-3);
    }

    #[test]
    fn box_matches_explicit_square() {
        let boxed = PolygonShape::new_box(1.0, 1.0, Vec2::ZERO, 0.0);
        let explicit = PolygonShape::new(&square(1.0)).expect("valid");
        assert_eq!(boxed.vertices(), explicit.vertices());
        for (a, b) in boxed.normals().iter().zip(explicit.normals()) {
            assert_relative_eq!(a.x, b.x, epsilon = 1e-6);
            assert_relative_eq!(a.y, b.y, epsilon = 1e-6);
        }
    }

    #[test]
    fn aabb_includes_skin() {
        let polygon = PolygonShape::new_box(0.5, 0.25, Vec2::ZERO, 0.0);
        let aabb = polygon.compute_aabb(&Transform::new(Vec2::new(1.0, 1.0), 0.0));
        assert_relative_eq!(aabb.min.x, 0.5 - POLYGON_RADIUS, epsilon = 1e-6);
        assert_relative_eq!(aabb.max.y, 1.25 + POLYGON_RADIUS, epsilon = 1e-6);
    }
}
