use std::collections::HashSet;

use glam::Vec2;
use log::{debug, trace};

use crate::{
    collision::aabb::Aabb,
    config::{CleanupPolicy, WorldConfig},
    core::collider::ColliderHandle,
    utils::{
        allocator::{Arena, Handle},
        logging::{warn_if_frame_budget_exceeded, ScopedTimer},
        units::to_sim,
    },
    world::{
        collidable::{
            Collidable, CollidableId, CollidableMut, CollidableRef, CollisionHandler, CollisionPair,
        },
        shape_builder::ShapeDef,
        PhysicsWorld,
    },
};

#[cfg(feature = "debug-draw")]
use crate::debug_draw::{DebugDraw, DisplayScaled, DrawFlags};

type EntityHandle<T> = Handle<Collidable<T>>;

fn handle_of<T>(id: CollidableId) -> EntityHandle<T> {
    Handle::from_raw(id.0)
}

/// Owns the simulation and the entities bound to its bodies.
///
/// Each [`CollisionManager::step`] advances the world, then reports every
/// touching pair of live entities to [`CollisionHandler::collision`] on both
/// sides, then releases bodies of entities that were marked destroyed.
pub struct CollisionManager<T> {
    world: PhysicsWorld,
    entities: Arena<Collidable<T>>,
    #[cfg(feature = "debug-draw")]
    draw_flags: DrawFlags,
}

impl<T> Default for CollisionManager<T> {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

impl<T> CollisionManager<T> {
    pub fn new(config: WorldConfig) -> Self {
        Self {
            world: PhysicsWorld::new(config),
            entities: Arena::new(),
            #[cfg(feature = "debug-draw")]
            draw_flags: DrawFlags::SHAPES | DrawFlags::CENTER_OF_MASS,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        self.world.config()
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.world
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Adds an entity without a body; it gets one with its first shape.
    pub fn insert(&mut self, payload: T) -> CollidableId {
        let handle = self
            .entities
            .insert_with(|handle| Collidable::new(CollidableId(handle.raw()), payload));
        CollidableId(handle.raw())
    }

    pub fn spawn(&mut self, payload: T, shape: ShapeDef) -> CollidableId {
        let id = self.insert(payload);
        if let Some(mut entity) = self.get_mut(id) {
            entity.set_shape(&shape);
        }
        id
    }

    pub fn contains(&self, id: CollidableId) -> bool {
        self.entities.contains(handle_of(id))
    }

    pub fn get(&self, id: CollidableId) -> Option<CollidableRef<'_, T>> {
        let entity = self.entities.get(handle_of(id))?;
        Some(CollidableRef::new(entity, &self.world))
    }

    pub fn get_mut(&mut self, id: CollidableId) -> Option<CollidableMut<'_, T>> {
        let entity = self.entities.get_mut(handle_of(id))?;
        Some(CollidableMut::new(entity, &mut self.world))
    }

    pub fn iter(&self) -> impl Iterator<Item = CollidableRef<'_, T>> + '_ {
        self.entities
            .values()
            .map(move |entity| CollidableRef::new(entity, &self.world))
    }

    /// Flags an entity for removal. Returns `false` for unknown ids.
    pub fn destroy(&mut self, id: CollidableId) -> bool {
        match self.entities.get_mut(handle_of(id)) {
            Some(entity) => {
                entity.destroy();
                true
            }
            None => false,
        }
    }

    /// Deletes an entity and its body right away, returning the payload.
    pub fn remove(&mut self, id: CollidableId) -> Option<T> {
        let entity = self.entities.remove(handle_of(id))?;
        if let Some(body) = entity.body() {
            self.world.destroy_body(body);
        }
        Some(entity.into_payload())
    }

    /// Releases the body of every destroyed entity. Returns how many were released.
    pub fn purge_destroyed(&mut self) -> usize {
        let doomed: Vec<CollidableId> = self
            .entities
            .values()
            .filter(|entity| entity.is_destroyed() && entity.has_body())
            .map(|entity| entity.id())
            .collect();
        for id in &doomed {
            self.release_body(*id);
        }
        doomed.len()
    }

    /// Entities owning a fixture whose bounds overlap the display-space rectangle.
    pub fn query_area(&self, lower: Vec2, upper: Vec2) -> Vec<CollidableId> {
        let region = Aabb::from_corners(to_sim(lower), to_sim(upper));
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        self.world.query_aabb(&region, |collider| {
            if let Some(id) = self.entity_of_collider(collider) {
                if seen.insert(id) {
                    found.push(id);
                }
            }
            true
        });
        found
    }

    #[cfg(feature = "debug-draw")]
    pub fn draw_flags(&self) -> DrawFlags {
        self.draw_flags
    }

    #[cfg(feature = "debug-draw")]
    pub fn set_draw_flags(&mut self, flags: DrawFlags) {
        self.draw_flags = flags;
    }

    /// Renders the world through `drawer` in display units.
    #[cfg(feature = "debug-draw")]
    pub fn draw_debug<D: DebugDraw>(&self, drawer: &mut D) {
        let mut scaled = DisplayScaled::new(drawer);
        self.world.draw_debug(&mut scaled, self.draw_flags);
    }

    fn entity_of_collider(&self, collider: ColliderHandle) -> Option<CollidableId> {
        let body = self.world.collider(collider)?.rigidbody_id;
        let bits = self.world.body(body)?.user_data?;
        let id = CollidableId::from_bits(bits);
        let entity = self.entities.get(handle_of(id))?;
        (entity.body() == Some(body)).then_some(id)
    }

    fn release_body(&mut self, id: CollidableId) {
        let Some(entity) = self.entities.get_mut(handle_of(id)) else {
            return;
        };
        if let Some(body) = entity.body() {
            entity.set_body(None);
            self.world.destroy_body(body);
            debug!("released body {:?} of destroyed entity {:?}", body, id);
        }
    }

    /// Walks the contact list once. Returns live pairs and destroyed participants to release.
    fn harvest(&self, policy: CleanupPolicy) -> (Vec<(CollidableId, CollidableId)>, Vec<CollidableId>) {
        let mut pairs = Vec::new();
        let mut seen = HashSet::new();
        let mut doomed = Vec::new();
        let mut last_doomed = None;

        for contact in self.world.contacts() {
            if !contact.is_touching() || !contact.is_enabled() {
                continue;
            }
            let (collider_a, collider_b) = contact.colliders();
            let (Some(a), Some(b)) = (
                self.entity_of_collider(collider_a),
                self.entity_of_collider(collider_b),
            ) else {
                continue;
            };
            if a == b {
                continue;
            }

            let a_destroyed = self.is_destroyed(a);
            let b_destroyed = self.is_destroyed(b);
            if !a_destroyed && !b_destroyed {
                let key = if a < b { (a, b) } else { (b, a) };
                if seen.insert(key) {
                    pairs.push((a, b));
                }
                continue;
            }

            for (id, destroyed) in [(a, a_destroyed), (b, b_destroyed)] {
                if !destroyed {
                    continue;
                }
                match policy {
                    CleanupPolicy::LastContacting => last_doomed = Some(id),
                    CleanupPolicy::AllContacting | CleanupPolicy::AllDestroyed => {
                        if !doomed.contains(&id) {
                            doomed.push(id);
                        }
                    }
                }
            }
        }

        doomed.extend(last_doomed);
        (pairs, doomed)
    }

    fn is_destroyed(&self, id: CollidableId) -> bool {
        self.entities
            .get(handle_of(id))
            .map(|entity| entity.is_destroyed())
            .unwrap_or(true)
    }
}

impl<T: CollisionHandler> CollisionManager<T> {
    /// Advances the world by `dt` seconds and resolves this frame's collisions.
    ///
    /// Non-positive or NaN steps leave everything untouched.
    pub fn step(&mut self, dt: f32) {
        if !(dt > 0.0) {
            trace!("collision step skipped for dt = {dt}");
            return;
        }

        let timer = ScopedTimer::new("collision_manager::step");
        let config = *self.world.config();
        self.world
            .step(dt, config.velocity_iterations, config.position_iterations);

        let (pairs, doomed) = self.harvest(config.cleanup);

        for (a, b) in pairs {
            if let Some((this, other)) = self.entities.get2_mut(handle_of(a), handle_of(b)) {
                T::collision(CollisionPair::new(&mut *this, &mut *other, &mut self.world));
                T::collision(CollisionPair::new(other, this, &mut self.world));
            }
        }

        for id in doomed {
            self.release_body(id);
        }
        if config.cleanup == CleanupPolicy::AllDestroyed {
            self.purge_destroyed();
        }

        if let Some(budget) = config.frame_budget_ms {
            warn_if_frame_budget_exceeded(timer.elapsed(), budget);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_survive_the_user_data_round_trip() {
        let mut manager: CollisionManager<()> = CollisionManager::default();
        let id = manager.spawn((), ShapeDef::Circle { radius: 10.0 });
        let body = manager.get(id).and_then(|e| e.body()).expect("body");
        let bits = manager.world().body(body).and_then(|b| b.user_data);
        assert_eq!(bits, Some(id.to_bits()));
    }

    #[test]
    fn stale_ids_are_rejected_after_removal() {
        let mut manager: CollisionManager<u32> = CollisionManager::default();
        let id = manager.insert(7);
        assert_eq!(manager.remove(id), Some(7));
        assert!(manager.get(id).is_none());
        assert!(!manager.destroy(id));

        let reused = manager.insert(8);
        assert_ne!(reused, id);
        assert!(manager.get(id).is_none());
    }
}
