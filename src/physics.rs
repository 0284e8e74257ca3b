//! Physics World Contract
//!
//! The solver itself lives outside this crate. Heavy entities
//! (`Rigidbody2D` + `BoxCollider2D`) get a body in an external world through
//! the `PhysicsWorld` trait; light entities never do. Projectiles hit heavy
//! entities through `PhysicsWorld::raycast`.
//!
//! Bodies are native resources of the external world, so every
//! `Rigidbody2D` that leaves a Scene must release its body. That is wired
//! up once per Scene with `install_destruction_hook`.

use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::game::components::{BodyType, BoxCollider2D, Rigidbody2D};
use crate::game::entity::Entity;
use crate::game::scene::Scene;
use crate::game::transform::Transform;
use crate::game::uuid::Uuid;
use crate::math::Vec2;

/// Opaque handle to a body in the physics world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BodyHandle(pub u64);

/// Description for creating a body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodySpec {
    pub position: Vec2,
    pub rotation: f32,
    pub body_type: BodyType,
    pub fixed_rotation: bool,
    /// Box collider half extents
    pub half_extents: Vec2,
    /// Collider offset from the body origin
    pub offset: Vec2,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    /// Identity of the owning entity, for looking it up from a hit
    pub owner: Uuid,
}

impl BodySpec {
    pub fn from_components(transform: &Transform, rigidbody: &Rigidbody2D, collider: &BoxCollider2D, owner: Uuid) -> Self {
        Self {
            position: transform.position,
            rotation: transform.rotation,
            body_type: rigidbody.body_type,
            fixed_rotation: rigidbody.fixed_rotation,
            half_extents: Vec2::new(
                collider.size.x * transform.scale.x.abs(),
                collider.size.y * transform.scale.y.abs(),
            ),
            offset: collider.offset,
            density: collider.density,
            friction: collider.friction,
            restitution: collider.restitution,
            owner,
        }
    }
}

/// First body hit along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    pub body: BodyHandle,
    pub point: Vec2,
    pub normal: Vec2,
    /// Position along the ray, 0 = start, 1 = end
    pub fraction: f32,
}

/// The slice of a physics engine this crate consumes.
pub trait PhysicsWorld {
    fn create_body(&mut self, spec: &BodySpec) -> BodyHandle;

    fn destroy_body(&mut self, body: BodyHandle);

    /// Closest hit on the segment `from -> to`, if any.
    fn raycast(&self, from: Vec2, to: Vec2) -> Option<RaycastHit>;
}

/// Physics world shared between a Scene's destruction hook and game code.
pub type SharedPhysicsWorld = Rc<RefCell<dyn PhysicsWorld>>;

/// Release a `Rigidbody2D`'s body whenever it leaves the Scene.
///
/// The hook runs before the entity handle is invalidated and clears the
/// component's body reference. The world must not be borrowed by the caller
/// while it destroys entities.
pub fn install_destruction_hook(scene: &mut Scene, world: SharedPhysicsWorld) {
    scene.on_destroy::<Rigidbody2D>(move |entity, rigidbody| {
        if let Some(body) = rigidbody.body.take() {
            trace!("releasing body {:?} of entity {}", body, entity);
            world.borrow_mut().destroy_body(body);
        }
    });
}

/// Create bodies for every heavy entity that does not have one yet.
///
/// Entities without a `BoxCollider2D` get a default collider shape.
/// Returns how many bodies were created.
pub fn create_bodies(scene: &mut Scene, world: &mut dyn PhysicsWorld) -> usize {
    let mut created = 0;
    for entity in scene.entities_with::<Rigidbody2D>() {
        let spec = {
            let Some(rigidbody) = scene.get_component::<Rigidbody2D>(entity) else {
                continue;
            };
            if rigidbody.body.is_some() {
                continue;
            }
            let transform = scene.get_component::<Transform>(entity).copied().unwrap_or_default();
            let collider = scene.get_component::<BoxCollider2D>(entity).copied().unwrap_or_default();
            let owner = scene.uuid_of(entity).unwrap_or(Uuid::NIL);
            BodySpec::from_components(&transform, rigidbody, &collider, owner)
        };

        let body = world.create_body(&spec);
        if let Some(rigidbody) = scene.get_component_mut::<Rigidbody2D>(entity) {
            rigidbody.body = Some(body);
            created += 1;
        }
    }
    if created > 0 {
        debug!("created {} physics bodies", created);
    }
    created
}

/// The entity owning a body, if any. Linear scan.
pub fn body_owner(scene: &Scene, body: BodyHandle) -> Option<Entity> {
    scene
        .view::<Rigidbody2D>()
        .find(|(_, rb)| rb.body == Some(body))
        .map(|(e, _)| e)
}

/// Test double: axis-aligned boxes, raycast by slab test.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    #[derive(Default)]
    pub(crate) struct BoxWorld {
        next_handle: u64,
        pub(crate) bodies: Vec<(BodyHandle, BodySpec)>,
        pub(crate) destroyed: Vec<BodyHandle>,
    }

    impl PhysicsWorld for BoxWorld {
        fn create_body(&mut self, spec: &BodySpec) -> BodyHandle {
            self.next_handle += 1;
            let handle = BodyHandle(self.next_handle);
            self.bodies.push((handle, spec.clone()));
            handle
        }

        fn destroy_body(&mut self, body: BodyHandle) {
            self.bodies.retain(|(h, _)| *h != body);
            self.destroyed.push(body);
        }

        fn raycast(&self, from: Vec2, to: Vec2) -> Option<RaycastHit> {
            let dir = to - from;
            let mut best: Option<RaycastHit> = None;
            for (handle, spec) in &self.bodies {
                let center = spec.position + spec.offset;
                let min = center - spec.half_extents;
                let max = center + spec.half_extents;

                let mut t_enter = 0.0f32;
                let mut t_exit = 1.0f32;
                let mut normal = Vec2::ZERO;
                let mut missed = false;
                for (o, d, lo, hi, axis) in [
                    (from.x, dir.x, min.x, max.x, Vec2::new(1.0, 0.0)),
                    (from.y, dir.y, min.y, max.y, Vec2::new(0.0, 1.0)),
                ] {
                    if d.abs() < f32::EPSILON {
                        if o < lo || o > hi {
                            missed = true;
                        }
                        continue;
                    }
                    let (t0, t1) = ((lo - o) / d, (hi - o) / d);
                    let (near, far, n) = if t0 < t1 { (t0, t1, -axis) } else { (t1, t0, axis) };
                    if near > t_enter {
                        t_enter = near;
                        normal = n;
                    }
                    t_exit = t_exit.min(far);
                }
                if missed || t_enter > t_exit {
                    continue;
                }
                if best.map_or(true, |b| t_enter < b.fraction) {
                    best = Some(RaycastHit {
                        body: *handle,
                        point: from + dir * t_enter,
                        normal,
                        fraction: t_enter,
                    });
                }
            }
            best
        }
    }
}
