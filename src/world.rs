use std::collections::HashMap;
use std::time::Instant;

use glam::Vec2;
use log::{debug, trace};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{
    collision::{
        aabb::Aabb,
        broadphase::BroadPhase,
        contact::{Contact, ContactHandle, ContactUpdate},
        narrowphase::NarrowPhase,
    },
    config::{
        WorldConfig, ANGULAR_SLEEP_TOLERANCE, LINEAR_SLEEP_TOLERANCE, TIME_TO_SLEEP,
    },
    core::{
        collider::{BodyHandle, Collider, ColliderBuilder, ColliderHandle},
        rigidbody::{BodyDef, BodyType, RigidBody},
    },
    dynamics::{
        integrator::{Integrator, SolverBody},
        solver::{ContactConstraintInput, ContactSolver},
    },
    utils::{
        allocator::Arena,
        logging::ScopedTimer,
        profiling::{PhaseTimer, StepProfile},
    },
};

pub mod collidable;
pub mod collision_manager;
pub mod shape_builder;

/// Central simulation container: bodies, fixtures, the persistent contact list and the pipeline.
pub struct PhysicsWorld {
    config: WorldConfig,
    bodies: Arena<RigidBody>,
    colliders: Arena<Collider>,
    contacts: Arena<Contact>,
    contact_lookup: HashMap<(ColliderHandle, ColliderHandle), ContactHandle>,
    broadphase: BroadPhase,
    integrator: Integrator,
    profile: StepProfile,
    new_fixture: bool,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

impl PhysicsWorld {
    pub fn new(config: WorldConfig) -> Self {
        Self {
            config,
            bodies: Arena::new(),
            colliders: Arena::new(),
            contacts: Arena::new(),
            contact_lookup: HashMap::new(),
            broadphase: BroadPhase::new(config.broadphase_cell_size),
            integrator: Integrator::new(config.gravity),
            profile: StepProfile::default(),
            new_fixture: false,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn gravity(&self) -> Vec2 {
        self.integrator.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.config.gravity = gravity;
        self.integrator.gravity = gravity;
    }

    /// Timings and counts of the most recent step.
    pub fn profile(&self) -> &StepProfile {
        &self.profile
    }

    pub fn create_body(&mut self, def: &BodyDef) -> BodyHandle {
        let handle = self
            .bodies
            .insert_with(|id| RigidBody::from_def(id, def));
        debug!("created {:?} body {:?}", def.body_type, handle);
        handle
    }

    /// Removes a body together with its fixtures and every contact touching it.
    pub fn destroy_body(&mut self, handle: BodyHandle) -> Option<RigidBody> {
        let colliders = self.bodies.get(handle)?.colliders.clone();
        self.destroy_contacts_where(|contact| contact.involves_body(handle));
        for collider in colliders {
            if let Some(removed) = self.colliders.remove(collider) {
                if let Some(proxy) = removed.proxy {
                    self.broadphase.destroy_proxy(proxy);
                }
            }
        }
        let body = self.bodies.remove(handle);
        debug!("destroyed body {:?}", handle);
        body
    }

    pub fn create_collider(
        &mut self,
        body: BodyHandle,
        builder: ColliderBuilder,
    ) -> Option<ColliderHandle> {
        let transform = self.bodies.get(body)?.transform;
        let handle = self
            .colliders
            .insert_with(|id| builder.build(id, body));

        if let Some(collider) = self.colliders.get_mut(handle) {
            let aabb = collider.aabb(&transform);
            collider.proxy = Some(self.broadphase.create_proxy(aabb, handle));
        }
        if let Some(rigid) = self.bodies.get_mut(body) {
            rigid.colliders.push(handle);
            rigid.reset_mass_data(&self.colliders);
        }
        self.new_fixture = true;
        Some(handle)
    }

    pub fn destroy_collider(&mut self, handle: ColliderHandle) -> Option<Collider> {
        let body = self.colliders.get(handle)?.rigidbody_id;
        self.destroy_contacts_where(|contact| {
            contact.collider_a == handle || contact.collider_b == handle
        });

        let removed = self.colliders.remove(handle)?;
        if let Some(proxy) = removed.proxy {
            self.broadphase.destroy_proxy(proxy);
        }
        if let Some(rigid) = self.bodies.get_mut(body) {
            rigid.colliders.retain(|c| *c != handle);
            rigid.reset_mass_data(&self.colliders);
        }
        Some(removed)
    }

    /// Removes every fixture of a body, keeping the body itself.
    pub fn clear_colliders(&mut self, body: BodyHandle) {
        let Some(rigid) = self.bodies.get(body) else {
            return;
        };
        for collider in rigid.colliders.clone() {
            self.destroy_collider(collider);
        }
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> + '_ {
        self.bodies.iter()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn collider(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.colliders.get(handle)
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    pub fn contact(&self, handle: ContactHandle) -> Option<&Contact> {
        self.contacts.get(handle)
    }

    /// Live contact list, in storage order.
    pub fn contacts(&self) -> impl Iterator<Item = &Contact> + '_ {
        self.contacts.values()
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    /// Fattened broadphase box of a fixture.
    pub fn fat_aabb(&self, collider: ColliderHandle) -> Option<Aabb> {
        let proxy = self.colliders.get(collider)?.proxy?;
        self.broadphase.fat_aabb(proxy)
    }

    pub fn set_transform(&mut self, handle: BodyHandle, position: Vec2, angle: f32) {
        let Some(body) = self.bodies.get_mut(handle) else {
            return;
        };
        body.set_transform(position, angle);
        self.synchronize_fixtures(handle, Vec2::ZERO);
    }

    pub fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec2) {
        let Some(body) = self.bodies.get_mut(handle) else {
            return;
        };
        if body.body_type == BodyType::Static {
            return;
        }
        if velocity.length_squared() > 0.0 {
            body.set_awake(true);
        }
        body.velocity.linear = velocity;
    }

    pub fn set_angular_velocity(&mut self, handle: BodyHandle, omega: f32) {
        let Some(body) = self.bodies.get_mut(handle) else {
            return;
        };
        if body.body_type == BodyType::Static {
            return;
        }
        if omega * omega > 0.0 {
            body.set_awake(true);
        }
        body.velocity.angular = omega;
    }

    pub fn apply_linear_impulse(
        &mut self,
        handle: BodyHandle,
        impulse: Vec2,
        point: Vec2,
        wake: bool,
    ) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.apply_linear_impulse(impulse, point, wake);
        }
    }

    /// Accumulates a force for the next step only.
    pub fn apply_force(&mut self, handle: BodyHandle, force: Vec2, point: Vec2, wake: bool) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.apply_force(force, point, wake);
        }
    }

    pub fn set_body_type(&mut self, handle: BodyHandle, body_type: BodyType) {
        let Some(body) = self.bodies.get_mut(handle) else {
            return;
        };
        if body.body_type == body_type {
            return;
        }
        body.set_body_type(body_type, &self.colliders);
        let colliders = body.colliders.clone();

        // Pairing rules depend on the type, so contacts are rebuilt from the broadphase.
        self.destroy_contacts_where(|contact| contact.involves_body(handle));
        for collider in colliders {
            if let Some(proxy) = self.colliders.get(collider).and_then(|c| c.proxy) {
                self.broadphase.touch_proxy(proxy);
            }
        }
        self.new_fixture = true;
    }

    pub fn set_sensor(&mut self, handle: ColliderHandle, is_sensor: bool) {
        let Some(collider) = self.colliders.get_mut(handle) else {
            return;
        };
        if collider.is_sensor == is_sensor {
            return;
        }
        collider.is_sensor = is_sensor;
        let body = collider.rigidbody_id;
        if let Some(rigid) = self.bodies.get_mut(body) {
            rigid.set_awake(true);
        }
    }

    pub fn set_awake(&mut self, handle: BodyHandle, awake: bool) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_awake(awake);
        }
    }

    /// Disabled bodies keep their fixtures but are neither simulated nor reported as colliding.
    pub fn set_body_enabled(&mut self, handle: BodyHandle, enabled: bool) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.is_enabled = enabled;
        }
    }

    /// Visits fixtures whose current bounds overlap `aabb` until the callback returns `false`.
    pub fn query_aabb<F>(&self, aabb: &Aabb, mut callback: F)
    where
        F: FnMut(ColliderHandle) -> bool,
    {
        self.broadphase.query(aabb, |_, proxy| {
            let Some(collider) = self.colliders.get(proxy.collider) else {
                return true;
            };
            let Some(body) = self.bodies.get(collider.rigidbody_id) else {
                return true;
            };
            if !collider.aabb(&body.transform).overlaps(aabb) {
                return true;
            }
            callback(proxy.collider)
        });
    }

    /// Advances the simulation by `dt` seconds. Non-positive steps are ignored.
    pub fn step(&mut self, dt: f32, velocity_iterations: u32, position_iterations: u32) {
        if !(dt > 0.0) {
            trace!("world step skipped for dt = {dt}");
            return;
        }

        let _timer = ScopedTimer::new("world::step");
        let start = Instant::now();
        let mut profile = StepProfile::default();

        if self.new_fixture {
            let _phase = PhaseTimer::new(&mut profile.broad_phase_time);
            self.find_new_contacts();
            self.new_fixture = false;
        }

        {
            let _phase = PhaseTimer::new(&mut profile.narrow_phase_time);
            self.collide();
        }

        self.solve(dt, velocity_iterations, position_iterations, &mut profile);

        {
            let _phase = PhaseTimer::new(&mut profile.broad_phase_time);
            self.find_new_contacts();
        }

        for (_, body) in self.bodies.iter_mut() {
            body.clear_forces();
        }

        profile.body_count = self.bodies.len();
        profile.contact_count = self.contacts.len();
        profile.touching_count = self.contacts.values().filter(|c| c.touching).count();
        profile.total_step_time = start.elapsed();
        self.profile = profile;
    }

    fn find_new_contacts(&mut self) {
        for (a, b) in self.broadphase.update_pairs() {
            self.add_pair(a, b);
        }
    }

    fn add_pair(&mut self, a: ColliderHandle, b: ColliderHandle) {
        if self.contact_lookup.contains_key(&(a, b)) {
            return;
        }
        let (Some(collider_a), Some(collider_b)) = (self.colliders.get(a), self.colliders.get(b))
        else {
            return;
        };
        if collider_a.rigidbody_id == collider_b.rigidbody_id {
            return;
        }
        let (Some(body_a), Some(body_b)) = (
            self.bodies.get(collider_a.rigidbody_id),
            self.bodies.get(collider_b.rigidbody_id),
        ) else {
            return;
        };
        if !body_a.should_collide(body_b) {
            return;
        }

        let friction = collider_a.material.mix_friction(&collider_b.material);
        let restitution = collider_a.material.mix_restitution(&collider_b.material);
        let bodies = (collider_a.rigidbody_id, collider_b.rigidbody_id);
        let handle = self
            .contacts
            .insert_with(|id| Contact::new(id, (a, b), bodies, friction, restitution));
        self.contact_lookup.insert((a, b), handle);
    }

    fn destroy_contacts_where<F>(&mut self, predicate: F)
    where
        F: Fn(&Contact) -> bool,
    {
        let doomed: Vec<ContactHandle> = self
            .contacts
            .iter()
            .filter(|(_, contact)| predicate(contact))
            .map(|(handle, _)| handle)
            .collect();
        for handle in doomed {
            self.destroy_contact(handle);
        }
    }

    fn destroy_contact(&mut self, handle: ContactHandle) {
        let Some(contact) = self.contacts.remove(handle) else {
            return;
        };
        self.contact_lookup
            .remove(&(contact.collider_a, contact.collider_b));
        if contact.touching && !contact.is_sensor {
            self.wake_pair(contact.body_a, contact.body_b);
        }
    }

    fn wake_pair(&mut self, a: BodyHandle, b: BodyHandle) {
        for handle in [a, b] {
            if let Some(body) = self.bodies.get_mut(handle) {
                body.set_awake(true);
            }
        }
    }

    /// Narrowphase update of the persistent contact list.
    fn collide(&mut self) {
        let mut stale = Vec::new();
        let mut active = Vec::new();

        for (handle, contact) in self.contacts.iter() {
            let (Some(collider_a), Some(collider_b)) = (
                self.colliders.get(contact.collider_a),
                self.colliders.get(contact.collider_b),
            ) else {
                stale.push(handle);
                continue;
            };
            let (Some(body_a), Some(body_b)) = (
                self.bodies.get(contact.body_a),
                self.bodies.get(contact.body_b),
            ) else {
                stale.push(handle);
                continue;
            };
            if !body_a.should_collide(body_b) {
                stale.push(handle);
                continue;
            }

            let active_a = body_a.is_awake && body_a.body_type != BodyType::Static;
            let active_b = body_b.is_awake && body_b.body_type != BodyType::Static;
            if !active_a && !active_b {
                continue;
            }

            let overlap = match (collider_a.proxy, collider_b.proxy) {
                (Some(a), Some(b)) => self.broadphase.test_overlap(a, b),
                _ => false,
            };
            if !overlap {
                stale.push(handle);
                continue;
            }
            active.push(handle);
        }

        for handle in stale {
            self.destroy_contact(handle);
        }

        let updates = self.evaluate_contacts(&active);
        for update in updates {
            let Some(contact) = self.contacts.get_mut(update.handle) else {
                continue;
            };
            let flipped = contact.apply_update(update);
            if flipped && !update.is_sensor {
                let (a, b) = contact.bodies();
                self.wake_pair(a, b);
            }
        }
    }

    fn evaluate_contacts(&self, handles: &[ContactHandle]) -> Vec<ContactUpdate> {
        #[cfg(feature = "parallel")]
        {
            handles
                .par_iter()
                .filter_map(|handle| self.evaluate_contact(*handle))
                .collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            handles
                .iter()
                .filter_map(|handle| self.evaluate_contact(*handle))
                .collect()
        }
    }

    fn evaluate_contact(&self, handle: ContactHandle) -> Option<ContactUpdate> {
        let contact = self.contacts.get(handle)?;
        let collider_a = self.colliders.get(contact.collider_a)?;
        let collider_b = self.colliders.get(contact.collider_b)?;
        let body_a = self.bodies.get(contact.body_a)?;
        let body_b = self.bodies.get(contact.body_b)?;

        let manifold = NarrowPhase::collide(
            &collider_a.shape,
            &body_a.transform,
            &collider_b.shape,
            &body_b.transform,
        );
        Some(ContactUpdate {
            handle,
            manifold,
            is_sensor: collider_a.is_sensor || collider_b.is_sensor,
            enabled: body_a.is_enabled && body_b.is_enabled,
        })
    }

    fn solve(
        &mut self,
        dt: f32,
        velocity_iterations: u32,
        position_iterations: u32,
        profile: &mut StepProfile,
    ) {
        let solver_timer = Instant::now();

        // Sleeping bodies pressed by an awake one rejoin the simulation.
        let mut wake = Vec::new();
        for contact in self.contacts.values() {
            if !contact.touching || !contact.enabled || contact.is_sensor {
                continue;
            }
            let (Some(a), Some(b)) = (
                self.bodies.get(contact.body_a),
                self.bodies.get(contact.body_b),
            ) else {
                continue;
            };
            let moving_a = a.is_awake && a.body_type != BodyType::Static;
            let moving_b = b.is_awake && b.body_type != BodyType::Static;
            if moving_a && !b.is_awake && b.body_type == BodyType::Dynamic {
                wake.push(contact.body_b);
            }
            if moving_b && !a.is_awake && a.body_type == BodyType::Dynamic {
                wake.push(contact.body_a);
            }
        }
        for handle in wake {
            if let Some(body) = self.bodies.get_mut(handle) {
                body.set_awake(true);
            }
        }

        let mut solver_bodies = Vec::new();
        let mut index_of: HashMap<BodyHandle, usize> = HashMap::new();
        for (handle, body) in self.bodies.iter() {
            if body.body_type == BodyType::Static || !body.is_awake || !body.is_enabled {
                continue;
            }
            index_of.insert(handle, solver_bodies.len());
            solver_bodies.push(SolverBody::from_body(body));
        }

        let mut inputs = Vec::new();
        for (handle, contact) in self.contacts.iter() {
            if !contact.touching || !contact.enabled || contact.is_sensor {
                continue;
            }
            if !index_of.contains_key(&contact.body_a) && !index_of.contains_key(&contact.body_b)
            {
                continue;
            }
            let (Some(collider_a), Some(collider_b)) = (
                self.colliders.get(contact.collider_a),
                self.colliders.get(contact.collider_b),
            ) else {
                continue;
            };

            let mut index_for = |body: BodyHandle| -> Option<usize> {
                if let Some(index) = index_of.get(&body) {
                    return Some(*index);
                }
                // Static or resting kinematic participant: immovable for this step.
                let rigid = self.bodies.get(body)?;
                let index = solver_bodies.len();
                solver_bodies.push(SolverBody::from_body(rigid));
                index_of.insert(body, index);
                Some(index)
            };
            let (Some(index_a), Some(index_b)) =
                (index_for(contact.body_a), index_for(contact.body_b))
            else {
                continue;
            };

            inputs.push(ContactConstraintInput {
                contact: handle,
                manifold: contact.manifold,
                index_a,
                index_b,
                radius_a: collider_a.shape.radius(),
                radius_b: collider_b.shape.radius(),
                friction: contact.friction,
                restitution: contact.restitution,
            });
        }

        let integrator = &self.integrator;
        for body in solver_bodies.iter_mut() {
            if is_simulated(body, &self.bodies) {
                integrator.integrate_velocity(body, dt);
            }
        }

        let mut contact_solver = ContactSolver::new(&inputs, &solver_bodies);
        contact_solver.warm_start(&mut solver_bodies);
        for _ in 0..velocity_iterations {
            contact_solver.solve_velocity_constraints(&mut solver_bodies);
        }
        for (handle, impulses) in contact_solver.impulses() {
            if let Some(contact) = self.contacts.get_mut(handle) {
                let count = contact.manifold.point_count;
                for (point, (normal, tangent)) in contact.manifold.points[..count]
                    .iter_mut()
                    .zip(impulses)
                {
                    point.normal_impulse = normal;
                    point.tangent_impulse = tangent;
                }
            }
        }
        profile.solver_time += solver_timer.elapsed();

        {
            let _phase = PhaseTimer::new(&mut profile.integrator_time);
            for body in solver_bodies.iter_mut() {
                if is_simulated(body, &self.bodies) {
                    self.integrator.integrate_position(body, dt);
                }
            }
        }

        {
            let _phase = PhaseTimer::new(&mut profile.solver_time);
            for _ in 0..position_iterations {
                if contact_solver.solve_position_constraints(&mut solver_bodies) {
                    break;
                }
            }
        }

        let _phase = PhaseTimer::new(&mut profile.integrator_time);
        for solved in &solver_bodies {
            let Some(body) = self.bodies.get_mut(solved.handle) else {
                continue;
            };
            if body.body_type == BodyType::Static || !body.is_awake || !body.is_enabled {
                continue;
            }
            let previous = body.transform.position;
            body.velocity.linear = solved.linear_velocity;
            body.velocity.angular = solved.angular_velocity;
            body.synchronize_transform(solved.center, solved.angle);
            let displacement = body.transform.position - previous;
            self.update_sleep(solved.handle, dt);
            self.synchronize_fixtures(solved.handle, displacement);
        }
    }

    fn update_sleep(&mut self, handle: BodyHandle, dt: f32) {
        let Some(body) = self.bodies.get_mut(handle) else {
            return;
        };
        if !body.allow_sleep {
            body.sleep_time = 0.0;
            return;
        }
        let resting = body.velocity.linear.length_squared()
            <= LINEAR_SLEEP_TOLERANCE * LINEAR_SLEEP_TOLERANCE
            && body.velocity.angular * body.velocity.angular
                <= ANGULAR_SLEEP_TOLERANCE * ANGULAR_SLEEP_TOLERANCE;
        if resting {
            body.sleep_time += dt;
            if body.sleep_time >= TIME_TO_SLEEP {
                body.set_awake(false);
            }
        } else {
            body.sleep_time = 0.0;
        }
    }

    fn synchronize_fixtures(&mut self, handle: BodyHandle, displacement: Vec2) {
        let Some(body) = self.bodies.get(handle) else {
            return;
        };
        for collider_handle in &body.colliders {
            let Some(collider) = self.colliders.get(*collider_handle) else {
                continue;
            };
            if let Some(proxy) = collider.proxy {
                let aabb = collider.aabb(&body.transform);
                self.broadphase.move_proxy(proxy, aabb, displacement);
            }
        }
    }
}

/// Participants borrowed only as contact anchors keep their state.
fn is_simulated(body: &SolverBody, bodies: &Arena<RigidBody>) -> bool {
    bodies
        .get(body.handle)
        .map(|rigid| rigid.body_type != BodyType::Static && rigid.is_awake && rigid.is_enabled)
        .unwrap_or(false)
}
