//! Bullet Pool
//!
//! Bullets are light entities: `Velocity` + `Bullet`, no rigid body. They
//! hit heavy entities by raycasting the segment they will cover this tick
//! against the physics world. Movement itself is left to
//! `systems::integrate_velocities`, so call `BulletPool::update` before it.

use log::trace;

use super::{ObjectPool, PoolPolicy};
use crate::config::PoolConfig;
use crate::game::components::{Bullet, SpriteRenderer, Velocity};
use crate::game::entity::Entity;
use crate::game::scene::Scene;
use crate::game::transform::Transform;
use crate::math::Vec2;
use crate::physics::{BodyHandle, PhysicsWorld};

/// A bullet that struck a physics body this tick. The bullet has already
/// been returned to the pool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BulletHit {
    pub bullet: Entity,
    pub body: BodyHandle,
    pub point: Vec2,
    pub normal: Vec2,
    pub damage: f32,
}

#[derive(Debug, Default)]
pub struct BulletPolicy;

impl PoolPolicy for BulletPolicy {
    fn entity_name(&self) -> &str {
        "Bullet"
    }

    fn prepare(&mut self, scene: &mut Scene, entity: Entity) {
        scene.add_component(entity, Velocity::default());
        scene.add_component(entity, Bullet::default());
        scene.add_component(entity, SpriteRenderer { visible: false, ..SpriteRenderer::default() });
    }

    fn reset(&mut self, scene: &mut Scene, entity: Entity) {
        if let Some(transform) = scene.get_component_mut::<Transform>(entity) {
            *transform = Transform::IDENTITY;
        }
        if let Some(velocity) = scene.get_component_mut::<Velocity>(entity) {
            *velocity = Velocity::default();
        }
        if let Some(bullet) = scene.get_component_mut::<Bullet>(entity) {
            *bullet = Bullet::default();
        }
        if let Some(sprite) = scene.get_component_mut::<SpriteRenderer>(entity) {
            sprite.visible = false;
        }
    }
}

pub struct BulletPool {
    pool: ObjectPool<BulletPolicy>,
}

impl BulletPool {
    pub fn new(scene: &mut Scene, initial_capacity: usize) -> Self {
        let mut pool = ObjectPool::new(BulletPolicy);
        pool.init(scene, initial_capacity);
        Self { pool }
    }

    pub fn from_config(scene: &mut Scene, config: &PoolConfig) -> Self {
        Self {
            pool: ObjectPool::from_config(scene, BulletPolicy, config),
        }
    }

    /// Fire a bullet. `None` if the pool is capped and exhausted.
    pub fn spawn(&mut self, scene: &mut Scene, position: Vec2, velocity: Vec2, damage: f32, lifetime: f32) -> Option<Entity> {
        let entity = self.pool.spawn(scene)?;

        if let Some(transform) = scene.get_component_mut::<Transform>(entity) {
            *transform = Transform::from_position(position);
            // Face the direction of travel
            transform.rotation = velocity.y.atan2(velocity.x);
        }
        if let Some(v) = scene.get_component_mut::<Velocity>(entity) {
            *v = Velocity { velocity, angular: 0.0 };
        }
        if let Some(bullet) = scene.get_component_mut::<Bullet>(entity) {
            *bullet = Bullet { damage, lifetime, age: 0.0, active: true };
        }
        if let Some(sprite) = scene.get_component_mut::<SpriteRenderer>(entity) {
            sprite.visible = true;
        }
        Some(entity)
    }

    pub fn return_bullet(&mut self, scene: &mut Scene, entity: Entity) -> bool {
        self.pool.return_entity(scene, entity)
    }

    /// Age bullets and test this tick's travel against the physics world.
    ///
    /// Expired and hit bullets are collected first and returned after the
    /// scan.
    pub fn update(&mut self, scene: &mut Scene, dt: f32, world: &dyn PhysicsWorld) -> Vec<BulletHit> {
        let mut hits = Vec::new();
        let mut finished = Vec::new();

        for &entity in self.pool.active() {
            let Some(bullet) = scene.get_component_mut::<Bullet>(entity) else {
                continue;
            };
            bullet.age += dt;
            if bullet.is_expired() {
                finished.push(entity);
                continue;
            }
            let damage = bullet.damage;

            let from = scene.get_component::<Transform>(entity).map_or(Vec2::ZERO, |t| t.position);
            let velocity = scene.get_component::<Velocity>(entity).map_or(Vec2::ZERO, |v| v.velocity);
            let to = from + velocity * dt;
            if to == from {
                continue;
            }

            if let Some(hit) = world.raycast(from, to) {
                trace!("bullet {} hit body {:?} at {:?}", entity, hit.body, hit.point);
                hits.push(BulletHit {
                    bullet: entity,
                    body: hit.body,
                    point: hit.point,
                    normal: hit.normal,
                    damage,
                });
                finished.push(entity);
            }
        }

        for entity in finished {
            self.pool.return_entity(scene, entity);
        }
        hits
    }

    pub fn clear(&mut self, scene: &mut Scene) {
        self.pool.clear(scene);
    }

    pub fn active(&self) -> &[Entity] {
        self.pool.active()
    }

    pub fn available_count(&self) -> usize {
        self.pool.available_count()
    }

    pub fn active_count(&self) -> usize {
        self.pool.active_count()
    }

    pub fn total_count(&self) -> usize {
        self.pool.total_count()
    }
}
