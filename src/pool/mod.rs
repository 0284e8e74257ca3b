//! Object Pools
//!
//! Pre-created entities that are recycled instead of destroyed. Every
//! pooled entity sits in exactly one of two sets:
//! - available: parked, components attached but deactivated
//! - active: handed out by `spawn`, live in the game
//!
//! Pools grow on demand when `available` runs dry, up to an optional
//! `max_capacity`. Entities are never destroyed by the pool, so
//! `available + active == total` always holds and `total` never shrinks.

pub mod bullet;
pub mod particle;

pub use bullet::{BulletHit, BulletPool};
pub use particle::{ParticleEmitter, ParticleEmitterDef, ParticlePool};

use std::collections::HashMap;

use log::{debug, warn};

use crate::config::PoolConfig;
use crate::game::entity::Entity;
use crate::game::scene::Scene;

/// How a specific pool builds and recycles its entities.
pub trait PoolPolicy {
    /// Tag given to entities created by the pool
    fn entity_name(&self) -> &str;

    /// Attach the pool's component set to a freshly created entity and
    /// leave it in the parked state.
    fn prepare(&mut self, scene: &mut Scene, entity: Entity);

    /// Clear any state that must not leak into the next spawn.
    fn reset(&mut self, scene: &mut Scene, entity: Entity);
}

pub struct ObjectPool<P: PoolPolicy> {
    policy: P,
    available: Vec<Entity>,
    active: Vec<Entity>,
    /// Position of each active entity in `active`
    active_slots: HashMap<Entity, usize>,
    total: usize,
    max_capacity: Option<usize>,
}

impl<P: PoolPolicy> ObjectPool<P> {
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            available: Vec::new(),
            active: Vec::new(),
            active_slots: HashMap::new(),
            total: 0,
            max_capacity: None,
        }
    }

    /// Cap the total number of pooled entities. `None` grows without bound.
    pub fn with_max_capacity(mut self, max_capacity: Option<usize>) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    /// Pool sized from config, pre-filled with `initial_capacity` entities.
    pub fn from_config(scene: &mut Scene, policy: P, config: &PoolConfig) -> Self {
        let mut pool = Self::new(policy).with_max_capacity(config.max_capacity);
        pool.init(scene, config.initial_capacity);
        pool
    }

    /// Pre-create entities until the pool holds `initial_capacity`.
    pub fn init(&mut self, scene: &mut Scene, initial_capacity: usize) {
        let target = match self.max_capacity {
            Some(max) => initial_capacity.min(max),
            None => initial_capacity,
        };
        while self.total < target {
            let entity = self.create(scene);
            self.available.push(entity);
        }
    }

    fn create(&mut self, scene: &mut Scene) -> Entity {
        let entity = scene.create_entity(self.policy.entity_name());
        self.policy.prepare(scene, entity);
        self.total += 1;
        entity
    }

    /// Move one entity to the active set.
    ///
    /// Returns `None` only when the pool is capped and fully active. The
    /// caller (or the specialized pool) initializes the entity's state.
    pub fn spawn(&mut self, scene: &mut Scene) -> Option<Entity> {
        let entity = loop {
            match self.available.pop() {
                Some(entity) if scene.is_valid(entity) => break entity,
                // Destroyed behind the pool's back; rebuild the slot in place
                Some(_) => {
                    self.total -= 1;
                    break self.create(scene);
                }
                None => {
                    if self.max_capacity.is_some_and(|max| self.total >= max) {
                        warn!(
                            "{} pool exhausted at {} entities",
                            self.policy.entity_name(),
                            self.total
                        );
                        return None;
                    }
                    let entity = self.create(scene);
                    debug!("{} pool grew to {} entities", self.policy.entity_name(), self.total);
                    break entity;
                }
            }
        };

        self.active_slots.insert(entity, self.active.len());
        self.active.push(entity);
        Some(entity)
    }

    /// Move an active entity back to the available set, resetting it.
    /// Returns false if the entity is not active in this pool.
    pub fn return_entity(&mut self, scene: &mut Scene, entity: Entity) -> bool {
        let Some(slot) = self.active_slots.remove(&entity) else {
            return false;
        };
        self.active.swap_remove(slot);
        if let Some(&moved) = self.active.get(slot) {
            self.active_slots.insert(moved, slot);
        }

        if scene.is_valid(entity) {
            self.policy.reset(scene, entity);
        }
        self.available.push(entity);
        true
    }

    /// Return every active entity (level reset). Nothing is destroyed.
    pub fn clear(&mut self, scene: &mut Scene) {
        for entity in self.active.drain(..) {
            if scene.is_valid(entity) {
                self.policy.reset(scene, entity);
            }
            self.available.push(entity);
        }
        self.active_slots.clear();
    }

    pub fn is_active(&self, entity: Entity) -> bool {
        self.active_slots.contains_key(&entity)
    }

    /// Active entities in no particular order
    pub fn active(&self) -> &[Entity] {
        &self.active
    }

    pub fn available_count(&self) -> usize {
        self.available.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn total_count(&self) -> usize {
        self.total
    }

    pub fn max_capacity(&self) -> Option<usize> {
        self.max_capacity
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut P {
        &mut self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use crate::game::components::Tag;
    use crate::game::registry::ComponentRegistry;

    /// Counts pooled uses through a plain `u32` component
    #[derive(Default)]
    struct Counter {
        resets: usize,
    }

    impl PoolPolicy for Counter {
        fn entity_name(&self) -> &str {
            "Pooled"
        }

        fn prepare(&mut self, scene: &mut Scene, entity: Entity) {
            scene.add_component(entity, 0u32);
        }

        fn reset(&mut self, scene: &mut Scene, entity: Entity) {
            self.resets += 1;
            if let Some(uses) = scene.get_component_mut::<u32>(entity) {
                *uses = 0;
            }
        }
    }

    fn scene() -> Scene {
        Scene::new(Rc::new(ComponentRegistry::with_builtins()))
    }

    fn assert_conserved<P: PoolPolicy>(pool: &ObjectPool<P>) {
        assert_eq!(pool.available_count() + pool.active_count(), pool.total_count());
    }

    #[test]
    fn test_init_prefills() {
        let mut scene = scene();
        let mut pool = ObjectPool::new(Counter::default());
        pool.init(&mut scene, 8);
        assert_eq!(pool.available_count(), 8);
        assert_eq!(scene.entity_count(), 8);
        assert_eq!(scene.view::<u32>().count(), 8);
        assert!(scene.view::<Tag>().all(|(_, t)| t.as_str() == "Pooled"));
    }

    #[test]
    fn test_conservation_over_spawn_return_sequence() {
        let mut scene = scene();
        let mut pool = ObjectPool::new(Counter::default());
        pool.init(&mut scene, 2);

        let mut live = Vec::new();
        let mut last_total = pool.total_count();
        for step in 0..40 {
            if step % 3 == 2 && !live.is_empty() {
                let e = live.remove(0);
                assert!(pool.return_entity(&mut scene, e));
                assert!(!pool.return_entity(&mut scene, e));
            } else {
                live.push(pool.spawn(&mut scene).unwrap());
            }
            assert_conserved(&pool);
            assert!(pool.total_count() >= last_total);
            last_total = pool.total_count();
        }
        assert_eq!(pool.active_count(), live.len());
        assert!(live.iter().all(|e| pool.is_active(*e)));
        assert_eq!(scene.entity_count(), pool.total_count());
    }

    #[test]
    fn test_return_resets_and_reuses() {
        let mut scene = scene();
        let mut pool = ObjectPool::new(Counter::default());
        pool.init(&mut scene, 1);

        let e = pool.spawn(&mut scene).unwrap();
        *scene.get_component_mut::<u32>(e).unwrap() = 9;
        pool.return_entity(&mut scene, e);
        assert_eq!(scene.get_component::<u32>(e), Some(&0));
        assert!(scene.is_valid(e));

        assert_eq!(pool.spawn(&mut scene), Some(e));
        assert_eq!(pool.total_count(), 1);
        assert_eq!(pool.policy().resets, 1);
    }

    #[test]
    fn test_cap_stops_growth() {
        let mut scene = scene();
        let mut pool = ObjectPool::new(Counter::default()).with_max_capacity(Some(3));
        pool.init(&mut scene, 10);
        assert_eq!(pool.total_count(), 3);

        for _ in 0..3 {
            assert!(pool.spawn(&mut scene).is_some());
        }
        assert_eq!(pool.spawn(&mut scene), None);
        assert_conserved(&pool);
    }

    #[test]
    fn test_clear_returns_everything() {
        let mut scene = scene();
        let mut pool = ObjectPool::from_config(
            &mut scene,
            Counter::default(),
            &PoolConfig { initial_capacity: 4, max_capacity: None },
        );
        for _ in 0..6 {
            pool.spawn(&mut scene);
        }
        pool.clear(&mut scene);
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.available_count(), 6);
        assert_eq!(scene.entity_count(), 6);
        assert_conserved(&pool);
    }

    #[test]
    fn test_externally_destroyed_slot_is_rebuilt() {
        let mut scene = scene();
        let mut pool = ObjectPool::new(Counter::default());
        pool.init(&mut scene, 1);
        let parked = scene.entities_with::<u32>()[0];
        scene.destroy_entity(parked);

        let e = pool.spawn(&mut scene).unwrap();
        assert!(scene.is_valid(e));
        assert_eq!(pool.total_count(), 1);
        assert_conserved(&pool);
    }
}
