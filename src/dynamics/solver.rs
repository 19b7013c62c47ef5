use glam::Vec2;

use crate::{
    collision::contact::{ContactHandle, Manifold, ManifoldKind, WorldManifold},
    config::{BAUMGARTE, LINEAR_SLOP, MAX_LINEAR_CORRECTION, VELOCITY_THRESHOLD},
    core::types::Transform,
    dynamics::integrator::SolverBody,
    utils::math::{cross_sv, cross_vs},
};

/// Everything the solver needs about one touching, solid contact.
#[derive(Debug, Clone, Copy)]
pub struct ContactConstraintInput {
    pub contact: ContactHandle,
    pub manifold: Manifold,
    pub index_a: usize,
    pub index_b: usize,
    pub radius_a: f32,
    pub radius_b: f32,
    pub friction: f32,
    pub restitution: f32,
}

#[derive(Debug, Clone, Copy, Default)]
struct VelocityPoint {
    r_a: Vec2,
    r_b: Vec2,
    normal_impulse: f32,
    tangent_impulse: f32,
    normal_mass: f32,
    tangent_mass: f32,
    velocity_bias: f32,
}

#[derive(Debug, Clone, Copy)]
struct VelocityConstraint {
    contact: ContactHandle,
    points: [VelocityPoint; 2],
    point_count: usize,
    normal: Vec2,
    index_a: usize,
    index_b: usize,
    friction: f32,
}

#[derive(Debug, Clone, Copy)]
struct PositionConstraint {
    manifold: Manifold,
    index_a: usize,
    index_b: usize,
    radius_a: f32,
    radius_b: f32,
}

/// Sequential-impulse contact solver with warm starting and position correction.
#[derive(Debug, Default)]
pub struct ContactSolver {
    velocity: Vec<VelocityConstraint>,
    position: Vec<PositionConstraint>,
}

impl ContactSolver {
    pub fn new(inputs: &[ContactConstraintInput], bodies: &[SolverBody]) -> Self {
        let mut solver = Self {
            velocity: Vec::with_capacity(inputs.len()),
            position: Vec::with_capacity(inputs.len()),
        };

        for input in inputs {
            let body_a = &bodies[input.index_a];
            let body_b = &bodies[input.index_b];
            let world = WorldManifold::new(
                &input.manifold,
                &body_a.transform(),
                input.radius_a,
                &body_b.transform(),
                input.radius_b,
            );

            let normal = world.normal;
            let tangent = cross_vs(normal, 1.0);
            let mut constraint = VelocityConstraint {
                contact: input.contact,
                points: [VelocityPoint::default(); 2],
                point_count: input.manifold.point_count,
                normal,
                index_a: input.index_a,
                index_b: input.index_b,
                friction: input.friction,
            };

            for (j, manifold_point) in input.manifold.points().iter().enumerate() {
                let r_a = world.points[j] - body_a.center;
                let r_b = world.points[j] - body_b.center;

                let rn_a = r_a.perp_dot(normal);
                let rn_b = r_b.perp_dot(normal);
                let k_normal = body_a.inverse_mass
                    + body_b.inverse_mass
                    + body_a.inverse_inertia * rn_a * rn_a
                    + body_b.inverse_inertia * rn_b * rn_b;

                let rt_a = r_a.perp_dot(tangent);
                let rt_b = r_b.perp_dot(tangent);
                let k_tangent = body_a.inverse_mass
                    + body_b.inverse_mass
                    + body_a.inverse_inertia * rt_a * rt_a
                    + body_b.inverse_inertia * rt_b * rt_b;

                let relative = body_b.linear_velocity
                    + cross_sv(body_b.angular_velocity, r_b)
                    - body_a.linear_velocity
                    - cross_sv(body_a.angular_velocity, r_a);
                let v_rel = normal.dot(relative);

                constraint.points[j] = VelocityPoint {
                    r_a,
                    r_b,
                    normal_impulse: manifold_point.normal_impulse,
                    tangent_impulse: manifold_point.tangent_impulse,
                    normal_mass: if k_normal > 0.0 { 1.0 / k_normal } else { 0.0 },
                    tangent_mass: if k_tangent > 0.0 { 1.0 / k_tangent } else { 0.0 },
                    velocity_bias: if v_rel < -VELOCITY_THRESHOLD {
                        -input.restitution * v_rel
                    } else {
                        0.0
                    },
                };
            }

            solver.velocity.push(constraint);
            solver.position.push(PositionConstraint {
                manifold: input.manifold,
                index_a: input.index_a,
                index_b: input.index_b,
                radius_a: input.radius_a,
                radius_b: input.radius_b,
            });
        }

        solver
    }

    pub fn constraint_count(&self) -> usize {
        self.velocity.len()
    }

    /// Applies last frame's impulses so resting contacts converge quickly.
    pub fn warm_start(&self, bodies: &mut [SolverBody]) {
        for constraint in &self.velocity {
            let tangent = cross_vs(constraint.normal, 1.0);
            for point in &constraint.points[..constraint.point_count] {
                let impulse =
                    point.normal_impulse * constraint.normal + point.tangent_impulse * tangent;
                apply_impulse(bodies, constraint.index_a, constraint.index_b, point, impulse);
            }
        }
    }

    pub fn solve_velocity_constraints(&mut self, bodies: &mut [SolverBody]) {
        for constraint in self.velocity.iter_mut() {
            let normal = constraint.normal;
            let tangent = cross_vs(normal, 1.0);
            let count = constraint.point_count;
            let (index_a, index_b) = (constraint.index_a, constraint.index_b);

            // Friction first so the normal constraint has the final say.
            for point in constraint.points[..count].iter_mut() {
                let dv = relative_velocity(bodies, index_a, index_b, point);
                let lambda = point.tangent_mass * -dv.dot(tangent);
                let max_friction = constraint.friction * point.normal_impulse;
                let new_impulse =
                    (point.tangent_impulse + lambda).clamp(-max_friction, max_friction);
                let lambda = new_impulse - point.tangent_impulse;
                point.tangent_impulse = new_impulse;
                apply_impulse(bodies, index_a, index_b, point, lambda * tangent);
            }

            for point in constraint.points[..count].iter_mut() {
                let dv = relative_velocity(bodies, index_a, index_b, point);
                let vn = dv.dot(normal);
                let lambda = -point.normal_mass * (vn - point.velocity_bias);
                let new_impulse = (point.normal_impulse + lambda).max(0.0);
                let lambda = new_impulse - point.normal_impulse;
                point.normal_impulse = new_impulse;
                apply_impulse(bodies, index_a, index_b, point, lambda * normal);
            }
        }
    }

    /// Accumulated impulses per contact, to be written back for warm starting.
    pub fn impulses(&self) -> impl Iterator<Item = (ContactHandle, [(f32, f32); 2])> + '_ {
        self.velocity.iter().map(|constraint| {
            let mut out = [(0.0, 0.0); 2];
            for (slot, point) in out
                .iter_mut()
                .zip(&constraint.points[..constraint.point_count])
            {
                *slot = (point.normal_impulse, point.tangent_impulse);
            }
            (constraint.contact, out)
        })
    }

    /// One pass of overlap correction. Returns `true` once penetration is within tolerance.
    pub fn solve_position_constraints(&self, bodies: &mut [SolverBody]) -> bool {
        let mut min_separation: f32 = 0.0;

        for constraint in &self.position {
            let (index_a, index_b) = (constraint.index_a, constraint.index_b);
            for j in 0..constraint.manifold.point_count {
                let body_a = bodies[index_a];
                let body_b = bodies[index_b];
                let (normal, point, separation) = position_manifold(
                    constraint,
                    &body_a.transform(),
                    &body_b.transform(),
                    j,
                );

                let r_a = point - body_a.center;
                let r_b = point - body_b.center;
                min_separation = min_separation.min(separation);

                let correction = (BAUMGARTE * (separation + LINEAR_SLOP))
                    .clamp(-MAX_LINEAR_CORRECTION, 0.0);

                let rn_a = r_a.perp_dot(normal);
                let rn_b = r_b.perp_dot(normal);
                let k = body_a.inverse_mass
                    + body_b.inverse_mass
                    + body_a.inverse_inertia * rn_a * rn_a
                    + body_b.inverse_inertia * rn_b * rn_b;
                let impulse = if k > 0.0 { -correction / k } else { 0.0 };
                let p = impulse * normal;

                let a = &mut bodies[index_a];
                a.center -= a.inverse_mass * p;
                a.angle -= a.inverse_inertia * r_a.perp_dot(p);
                let b = &mut bodies[index_b];
                b.center += b.inverse_mass * p;
                b.angle += b.inverse_inertia * r_b.perp_dot(p);
            }
        }

        min_separation >= -3.0 * LINEAR_SLOP
    }
}

fn relative_velocity(
    bodies: &[SolverBody],
    index_a: usize,
    index_b: usize,
    point: &VelocityPoint,
) -> Vec2 {
    let a = &bodies[index_a];
    let b = &bodies[index_b];
    b.linear_velocity + cross_sv(b.angular_velocity, point.r_b)
        - a.linear_velocity
        - cross_sv(a.angular_velocity, point.r_a)
}

fn apply_impulse(
    bodies: &mut [SolverBody],
    index_a: usize,
    index_b: usize,
    point: &VelocityPoint,
    impulse: Vec2,
) {
    let a = &mut bodies[index_a];
    a.linear_velocity -= a.inverse_mass * impulse;
    a.angular_velocity -= a.inverse_inertia * point.r_a.perp_dot(impulse);
    let b = &mut bodies[index_b];
    b.linear_velocity += b.inverse_mass * impulse;
    b.angular_velocity += b.inverse_inertia * point.r_b.perp_dot(impulse);
}

/// Normal, point and separation of manifold point `index` at the current poses.
fn position_manifold(
    constraint: &PositionConstraint,
    xf_a: &Transform,
    xf_b: &Transform,
    index: usize,
) -> (Vec2, Vec2, f32) {
    let manifold = &constraint.manifold;
    let radii = constraint.radius_a + constraint.radius_b;
    match manifold.kind {
        ManifoldKind::Circles => {
            let point_a = xf_a.apply(manifold.local_point);
            let point_b = xf_b.apply(manifold.points[0].local_point);
            let delta = point_b - point_a;
            let normal = if delta.length_squared() > f32::EPSILON * f32::EPSILON {
                delta.normalize()
            } else {
                Vec2::X
            };
            let separation = delta.dot(normal) - radii;
            (normal, 0.5 * (point_a + point_b), separation)
        }
        ManifoldKind::FaceA => {
            let normal = xf_a.rotate_vector(manifold.local_normal);
            let plane_point = xf_a.apply(manifold.local_point);
            let clip_point = xf_b.apply(manifold.points[index].local_point);
            let separation = (clip_point - plane_point).dot(normal) - radii;
            (normal, clip_point, separation)
        }
        ManifoldKind::FaceB => {
            let normal = xf_b.rotate_vector(manifold.local_normal);
            let plane_point = xf_b.apply(manifold.local_point);
            let clip_point = xf_a.apply(manifold.points[index].local_point);
            let separation = (clip_point - plane_point).dot(normal) - radii;
            (-normal, clip_point, separation)
        }
    }
}
