use glam::Vec2;

use crate::{
    collision::clipping::ContactFeature,
    core::{
        collider::{BodyHandle, ColliderHandle},
        types::Transform,
    },
    utils::allocator::Handle,
};

pub type ContactHandle = Handle<Contact>;

/// Reference frame a manifold is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManifoldKind {
    /// Circle centers; `local_point` is A's center, point 0 holds B's center.
    #[default]
    Circles,
    /// Reference face on A; normal and plane point are A-local, points are B-local.
    FaceA,
    /// Reference face on B; normal and plane point are B-local, points are A-local.
    FaceB,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ManifoldPoint {
    pub local_point: Vec2,
    pub normal_impulse: f32,
    pub tangent_impulse: f32,
    pub id: ContactFeature,
}

/// Contact manifold for a fixture pair in body-local form, at most two points.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Manifold {
    pub kind: ManifoldKind,
    pub local_normal: Vec2,
    pub local_point: Vec2,
    pub points: [ManifoldPoint; 2],
    pub point_count: usize,
}

impl Manifold {
    pub fn points(&self) -> &[ManifoldPoint] {
        &self.points[..self.point_count]
    }

    pub fn is_empty(&self) -> bool {
        self.point_count == 0
    }

    pub(crate) fn push(&mut self, point: ManifoldPoint) {
        if self.point_count < self.points.len() {
            self.points[self.point_count] = point;
            self.point_count += 1;
        }
    }

    /// Copies accumulated impulses from `old` where feature ids match.
    pub(crate) fn warm_start_from(&mut self, old: &Manifold) {
        for point in self.points[..self.point_count].iter_mut() {
            point.normal_impulse = 0.0;
            point.tangent_impulse = 0.0;
            if let Some(previous) = old.points().iter().find(|p| p.id == point.id) {
                point.normal_impulse = previous.normal_impulse;
                point.tangent_impulse = previous.tangent_impulse;
            }
        }
    }
}

/// Manifold resolved into world space: normal from A to B, one point per contact.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorldManifold {
    pub normal: Vec2,
    pub points: [Vec2; 2],
    pub separations: [f32; 2],
    pub point_count: usize,
}

impl WorldManifold {
    pub fn new(
        manifold: &Manifold,
        xf_a: &Transform,
        radius_a: f32,
        xf_b: &Transform,
        radius_b: f32,
    ) -> Self {
        let mut world = WorldManifold {
            point_count: manifold.point_count,
            ..Default::default()
        };
        if manifold.point_count == 0 {
            return world;
        }

        match manifold.kind {
            ManifoldKind::Circles => {
                let point_a = xf_a.apply(manifold.local_point);
                let point_b = xf_b.apply(manifold.points[0].local_point);
                let mut normal = Vec2::X;
                if point_a.distance_squared(point_b) > f32::EPSILON * f32::EPSILON {
                    normal = (point_b - point_a).normalize();
                }
                let c_a = point_a + radius_a * normal;
                let c_b = point_b - radius_b * normal;
                world.normal = normal;
                world.points[0] = 0.5 * (c_a + c_b);
                world.separations[0] = (c_b - c_a).dot(normal);
            }
            ManifoldKind::FaceA => {
                let normal = xf_a.rotate_vector(manifold.local_normal);
                let plane_point = xf_a.apply(manifold.local_point);
                for i in 0..manifold.point_count {
                    let clip_point = xf_b.apply(manifold.points[i].local_point);
                    let c_a = clip_point
                        + (radius_a - (clip_point - plane_point).dot(normal)) * normal;
                    let c_b = clip_point - radius_b * normal;
                    world.points[i] = 0.5 * (c_a + c_b);
                    world.separations[i] = (c_b - c_a).dot(normal);
                }
                world.normal = normal;
            }
            ManifoldKind::FaceB => {
                let normal = xf_b.rotate_vector(manifold.local_normal);
                let plane_point = xf_b.apply(manifold.local_point);
                for i in 0..manifold.point_count {
                    let clip_point = xf_a.apply(manifold.points[i].local_point);
                    let c_b = clip_point
                        + (radius_b - (clip_point - plane_point).dot(normal)) * normal;
                    let c_a = clip_point - radius_a * normal;
                    world.points[i] = 0.5 * (c_a + c_b);
                    world.separations[i] = (c_a - c_b).dot(normal);
                }
                world.normal = -normal;
            }
        }
        world
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points[..self.point_count]
    }
}

/// Persistent record that two fixtures' fat boxes overlap.
///
/// `touching` reflects the last narrowphase evaluation; `enabled` is false
/// while either body is disabled.
#[derive(Debug, Clone)]
pub struct Contact {
    pub id: ContactHandle,
    pub(crate) collider_a: ColliderHandle,
    pub(crate) collider_b: ColliderHandle,
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,
    pub(crate) manifold: Manifold,
    pub(crate) touching: bool,
    pub(crate) enabled: bool,
    pub(crate) is_sensor: bool,
    pub(crate) friction: f32,
    pub(crate) restitution: f32,
}

impl Contact {
    pub(crate) fn new(
        id: ContactHandle,
        colliders: (ColliderHandle, ColliderHandle),
        bodies: (BodyHandle, BodyHandle),
        friction: f32,
        restitution: f32,
    ) -> Self {
        Self {
            id,
            collider_a: colliders.0,
            collider_b: colliders.1,
            body_a: bodies.0,
            body_b: bodies.1,
            manifold: Manifold::default(),
            touching: false,
            enabled: true,
            is_sensor: false,
            friction,
            restitution,
        }
    }

    pub fn colliders(&self) -> (ColliderHandle, ColliderHandle) {
        (self.collider_a, self.collider_b)
    }

    pub fn bodies(&self) -> (BodyHandle, BodyHandle) {
        (self.body_a, self.body_b)
    }

    pub fn involves_body(&self, body: BodyHandle) -> bool {
        self.body_a == body || self.body_b == body
    }

    pub fn is_touching(&self) -> bool {
        self.touching
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_sensor(&self) -> bool {
        self.is_sensor
    }

    pub fn manifold(&self) -> &Manifold {
        &self.manifold
    }

    /// Stores a fresh narrowphase result. Returns `true` when the touching state flipped.
    pub(crate) fn apply_update(&mut self, update: ContactUpdate) -> bool {
        let was_touching = self.touching;
        self.is_sensor = update.is_sensor;
        self.enabled = update.enabled;

        if update.is_sensor {
            self.touching = update.manifold.point_count > 0;
            self.manifold = Manifold::default();
        } else {
            let old = self.manifold;
            self.manifold = update.manifold;
            self.manifold.warm_start_from(&old);
            self.touching = self.manifold.point_count > 0;
        }

        was_touching != self.touching
    }
}

/// Result of evaluating one contact against the current body poses.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ContactUpdate {
    pub handle: ContactHandle,
    pub manifold: Manifold,
    pub is_sensor: bool,
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::clipping::FeatureType;
    use approx::assert_relative_eq;

    #[test]
    fn circles_world_manifold_reports_overlap_as_negative_separation() {
        let mut manifold = Manifold {
            kind: ManifoldKind::Circles,
            ..Default::default()
        };
        manifold.push(ManifoldPoint::default());

        let xf_a = Transform::default();
        let xf_b = Transform::new(Vec2::new(1.5, 0.0), 0.0);
        let world = WorldManifold::new(&manifold, &xf_a, 1.0, &xf_b, 1.0);
        assert_eq!(world.point_count, 1);
        assert_relative_eq!(world.normal.x, 1.0);
        assert_relative_eq!(world.separations[0], -0.5, epsilon = 1e-6);
        assert_relative_eq!(world.points[0].x, 0.75, epsilon = 1e-6);
    }

    #[test]
    fn warm_start_keeps_impulses_of_matching_features() {
        let feature = ContactFeature {
            index_a: 1,
            index_b: 2,
            type_a: FeatureType::Face,
            type_b: FeatureType::Vertex,
        };
        let mut old = Manifold::default();
        old.push(ManifoldPoint {
            normal_impulse: 3.0,
            tangent_impulse: -1.0,
            id: feature,
            ..Default::default()
        });

        let mut fresh = Manifold::default();
        fresh.push(ManifoldPoint {
            id: feature,
            ..Default::default()
        });
        fresh.push(ManifoldPoint {
            id: feature.flipped(),
            normal_impulse: 9.0,
            ..Default::default()
        });
        fresh.warm_start_from(&old);

        assert_eq!(fresh.points()[0].normal_impulse, 3.0);
        assert_eq!(fresh.points()[0].tangent_impulse, -1.0);
        assert_eq!(fresh.points()[1].normal_impulse, 0.0);
    }
}
