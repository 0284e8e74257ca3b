//! Light-entity systems
//!
//! Light entities carry a `Velocity` and no `Rigidbody2D`. They are moved
//! here by explicit Euler with no collision response; heavy entities are
//! left to the physics world.

use super::components::{Rigidbody2D, Velocity};
use super::scene::Scene;
use super::transform::Transform;

/// Advance every light entity by `dt` seconds. Returns how many moved.
pub fn integrate_velocities(scene: &mut Scene, dt: f32) -> usize {
    let movers: Vec<_> = scene
        .view::<Velocity>()
        .filter(|(e, _)| !scene.has_component::<Rigidbody2D>(*e))
        .map(|(e, v)| (e, *v))
        .collect();

    let mut moved = 0;
    for (entity, velocity) in movers {
        if let Some(transform) = scene.get_component_mut::<Transform>(entity) {
            transform.translate(velocity.velocity * dt);
            transform.rotate(velocity.angular * dt);
            moved += 1;
        }
    }
    moved
}
