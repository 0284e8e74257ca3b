//! Particle Pool
//!
//! Cosmetic particles as pooled light entities. Emission picks a random
//! direction inside a cone around +Y; `update` ages particles, applies
//! gravity to their velocity and fades their sprite color. Movement comes
//! from `systems::integrate_velocities`.

use std::f32::consts::FRAC_PI_2;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{ObjectPool, PoolPolicy};
use crate::config::PoolConfig;
use crate::game::components::{Particle, SpriteRenderer, Velocity};
use crate::game::entity::Entity;
use crate::game::scene::Scene;
use crate::game::transform::Transform;
use crate::math::Vec2;

/// Definition for a particle emitter (design-time data, stored in assets)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleEmitterDef {
    /// Particles to emit per second (0 = burst only)
    pub spawn_rate: f32,
    pub speed_min: f32,
    pub speed_max: f32,
    /// Spread half-angle in radians around +Y (PI = full circle)
    pub spread: f32,
    /// Gravity multiplier (1.0 = normal gravity, 0.0 = none, -1.0 = floats up)
    pub gravity: f32,
    pub life_min: f32,
    pub life_max: f32,
    /// RGBA 0-255
    pub color_start: [u8; 4],
    /// RGBA 0-255
    pub color_end: [u8; 4],
    /// Sprite scale
    pub size: f32,
}

impl Default for ParticleEmitterDef {
    fn default() -> Self {
        Self {
            spawn_rate: 10.0,
            speed_min: 100.0,
            speed_max: 300.0,
            spread: 0.5,
            gravity: 1.0,
            life_min: 0.3,
            life_max: 1.0,
            color_start: [255, 200, 50, 255],
            color_end: [200, 50, 0, 0],
            size: 1.0,
        }
    }
}

/// Common particle effect presets
impl ParticleEmitterDef {
    /// Hit effect (red, fast, short-lived)
    pub fn blood() -> Self {
        Self {
            spawn_rate: 0.0,
            speed_min: 200.0,
            speed_max: 600.0,
            spread: 1.0,
            gravity: 1.5,
            life_min: 0.2,
            life_max: 0.5,
            color_start: [200, 20, 20, 255],
            color_end: [80, 0, 0, 0],
            size: 1.0,
        }
    }

    /// Impact sparks (yellow-white, very fast)
    pub fn sparks() -> Self {
        Self {
            spawn_rate: 0.0,
            speed_min: 400.0,
            speed_max: 800.0,
            spread: 0.8,
            gravity: 0.5,
            life_min: 0.1,
            life_max: 0.3,
            color_start: [255, 255, 200, 255],
            color_end: [255, 150, 0, 0],
            size: 1.0,
        }
    }

    /// Dust/debris (gray, slow, drifts up)
    pub fn dust() -> Self {
        Self {
            spawn_rate: 5.0,
            speed_min: 20.0,
            speed_max: 80.0,
            spread: std::f32::consts::PI,
            gravity: -0.2,
            life_min: 0.5,
            life_max: 1.5,
            color_start: [150, 140, 130, 200],
            color_end: [80, 75, 70, 0],
            size: 2.0,
        }
    }

    /// Fire/torch (orange-yellow, rises)
    pub fn fire() -> Self {
        Self {
            spawn_rate: 20.0,
            speed_min: 50.0,
            speed_max: 150.0,
            spread: 0.3,
            gravity: -0.8,
            life_min: 0.3,
            life_max: 0.8,
            color_start: [255, 200, 50, 255],
            color_end: [200, 50, 0, 0],
            size: 2.0,
        }
    }
}

/// Continuous emitter state
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleEmitter {
    pub def: ParticleEmitterDef,
    /// Accumulated fractional particles
    pub spawn_accumulator: f32,
    pub active: bool,
}

impl ParticleEmitter {
    pub fn new(def: ParticleEmitterDef) -> Self {
        Self {
            def,
            spawn_accumulator: 0.0,
            active: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct ParticlePolicy;

impl PoolPolicy for ParticlePolicy {
    fn entity_name(&self) -> &str {
        "Particle"
    }

    fn prepare(&mut self, scene: &mut Scene, entity: Entity) {
        scene.add_component(entity, Velocity::default());
        scene.add_component(entity, Particle::default());
        scene.add_component(entity, SpriteRenderer { visible: false, ..SpriteRenderer::default() });
    }

    fn reset(&mut self, scene: &mut Scene, entity: Entity) {
        if let Some(transform) = scene.get_component_mut::<Transform>(entity) {
            *transform = Transform::IDENTITY;
        }
        if let Some(velocity) = scene.get_component_mut::<Velocity>(entity) {
            *velocity = Velocity::default();
        }
        if let Some(particle) = scene.get_component_mut::<Particle>(entity) {
            *particle = Particle::default();
        }
        if let Some(sprite) = scene.get_component_mut::<SpriteRenderer>(entity) {
            sprite.visible = false;
        }
    }
}

pub struct ParticlePool {
    pool: ObjectPool<ParticlePolicy>,
    rng: StdRng,
    /// World gravity, units per second squared (pulls toward -Y)
    pub gravity: f32,
}

impl ParticlePool {
    pub fn new(scene: &mut Scene, initial_capacity: usize) -> Self {
        let mut pool = ObjectPool::new(ParticlePolicy);
        pool.init(scene, initial_capacity);
        Self::with_pool(pool, StdRng::from_entropy())
    }

    pub fn from_config(scene: &mut Scene, config: &PoolConfig) -> Self {
        Self::with_pool(ObjectPool::from_config(scene, ParticlePolicy, config), StdRng::from_entropy())
    }

    /// Reproducible emission, for tests and replays
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    fn with_pool(pool: ObjectPool<ParticlePolicy>, rng: StdRng) -> Self {
        Self { pool, rng, gravity: 980.0 }
    }

    fn random_range(&mut self, min: f32, max: f32) -> f32 {
        if max > min {
            self.rng.gen_range(min..=max)
        } else {
            min
        }
    }

    /// Spawn one particle. `None` if the pool is capped and exhausted.
    pub fn emit(&mut self, scene: &mut Scene, def: &ParticleEmitterDef, origin: Vec2) -> Option<Entity> {
        let speed = self.random_range(def.speed_min, def.speed_max);
        let life = self.random_range(def.life_min, def.life_max);
        let angle = FRAC_PI_2 + self.random_range(-def.spread, def.spread);
        let velocity = Vec2::new(angle.cos(), angle.sin()) * speed;

        let entity = self.pool.spawn(scene)?;
        if let Some(transform) = scene.get_component_mut::<Transform>(entity) {
            *transform = Transform {
                position: origin,
                rotation: 0.0,
                scale: Vec2::new(def.size, def.size),
            };
        }
        if let Some(v) = scene.get_component_mut::<Velocity>(entity) {
            *v = Velocity { velocity, angular: 0.0 };
        }
        if let Some(particle) = scene.get_component_mut::<Particle>(entity) {
            *particle = Particle {
                life,
                max_life: life,
                color_start: def.color_start,
                color_end: def.color_end,
                gravity: def.gravity,
                size: def.size,
                active: true,
            };
        }
        if let Some(sprite) = scene.get_component_mut::<SpriteRenderer>(entity) {
            sprite.color = def.color_start;
            sprite.visible = true;
        }
        Some(entity)
    }

    /// One-shot burst. Returns how many particles were actually spawned.
    pub fn emit_burst(&mut self, scene: &mut Scene, def: &ParticleEmitterDef, origin: Vec2, count: usize) -> usize {
        (0..count)
            .take_while(|_| self.emit(scene, def, origin).is_some())
            .count()
    }

    /// Emit from a continuous emitter for `dt` seconds of its spawn rate.
    pub fn emit_over_time(&mut self, scene: &mut Scene, emitter: &mut ParticleEmitter, origin: Vec2, dt: f32) -> usize {
        if !emitter.active || emitter.def.spawn_rate <= 0.0 {
            return 0;
        }
        emitter.spawn_accumulator += emitter.def.spawn_rate * dt;
        let count = emitter.spawn_accumulator.floor();
        emitter.spawn_accumulator -= count;
        self.emit_burst(scene, &emitter.def, origin, count as usize)
    }

    /// Age particles, apply gravity and fade colors. Expired particles are
    /// returned to the pool after the scan.
    pub fn update(&mut self, scene: &mut Scene, dt: f32) {
        let mut expired = Vec::new();

        for &entity in self.pool.active() {
            let Some(particle) = scene.get_component_mut::<Particle>(entity) else {
                continue;
            };
            particle.life -= dt;
            if particle.life <= 0.0 {
                expired.push(entity);
                continue;
            }
            let fall = self.gravity * particle.gravity * dt;
            let color = particle.current_color();

            if let Some(velocity) = scene.get_component_mut::<Velocity>(entity) {
                velocity.velocity.y -= fall;
            }
            if let Some(sprite) = scene.get_component_mut::<SpriteRenderer>(entity) {
                sprite.color = color;
            }
        }

        for entity in expired {
            self.pool.return_entity(scene, entity);
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use approx::assert_relative_eq;

    use crate::game::registry::ComponentRegistry;

    fn scene() -> Scene {
        Scene::new(Rc::new(ComponentRegistry::with_builtins()))
    }

    #[test]
    fn test_burst_respects_cone_and_ranges() {
        let mut scene = scene();
        let mut pool = ParticlePool::new(&mut scene, 16).with_seed(7);
        let def = ParticleEmitterDef::sparks();

        assert_eq!(pool.emit_burst(&mut scene, &def, Vec2::new(3.0, 4.0), 12), 12);
        for &e in pool.active() {
            let v = scene.get_component::<Velocity>(e).unwrap().velocity;
            let speed = v.len();
            assert!(speed >= def.speed_min - 1e-2 && speed <= def.speed_max + 1e-2);
            let off_axis = (v.y / speed).clamp(-1.0, 1.0).acos();
            assert!(off_axis <= def.spread + 1e-4);

            let p = scene.get_component::<Particle>(e).unwrap();
            assert!(p.active && p.life >= def.life_min && p.life <= def.life_max);
            assert_eq!(scene.get_component::<Transform>(e).unwrap().position, Vec2::new(3.0, 4.0));
        }
    }

    #[test]
    fn test_burst_stops_at_cap() {
        let mut scene = scene();
        let config = PoolConfig { initial_capacity: 2, max_capacity: Some(5) };
        let mut pool = ParticlePool::from_config(&mut scene, &config).with_seed(1);
        assert_eq!(pool.emit_burst(&mut scene, &ParticleEmitterDef::blood(), Vec2::ZERO, 10), 5);
        assert_eq!(pool.total_count(), 5);
    }

    #[test]
    fn test_update_applies_gravity_and_expires() {
        let mut scene = scene();
        let mut pool = ParticlePool::new(&mut scene, 1).with_seed(3);
        pool.gravity = 10.0;
        let def = ParticleEmitterDef {
            speed_min: 0.0,
            speed_max: 0.0,
            life_min: 1.0,
            life_max: 1.0,
            gravity: 2.0,
            color_start: [200, 0, 0, 255],
            color_end: [0, 0, 200, 0],
            ..ParticleEmitterDef::default()
        };
        let e = pool.emit(&mut scene, &def, Vec2::ZERO).unwrap();

        pool.update(&mut scene, 0.5);
        assert_relative_eq!(scene.get_component::<Velocity>(e).unwrap().velocity.y, -10.0);
        assert_eq!(scene.get_component::<SpriteRenderer>(e).unwrap().color, [100, 0, 100, 127]);

        pool.update(&mut scene, 0.6);
        assert_eq!(pool.active_count(), 0);
        assert!(!scene.get_component::<SpriteRenderer>(e).unwrap().visible);
        assert!(!scene.get_component::<Particle>(e).unwrap().active);
        assert_eq!(pool.available_count() + pool.active_count(), pool.total_count());
    }

    #[test]
    fn test_emit_over_time_accumulates() {
        let mut scene = scene();
        let mut pool = ParticlePool::new(&mut scene, 8).with_seed(5);
        let mut emitter = ParticleEmitter::new(ParticleEmitterDef::fire());

        assert_eq!(pool.emit_over_time(&mut scene, &mut emitter, Vec2::ZERO, 0.03), 0);
        assert_eq!(pool.emit_over_time(&mut scene, &mut emitter, Vec2::ZERO, 0.03), 1);
        emitter.active = false;
        assert_eq!(pool.emit_over_time(&mut scene, &mut emitter, Vec2::ZERO, 1.0), 0);
    }
}
