//! Scene
//!
//! The Scene owns every live entity and its component data:
//! - Entity allocation and lifetime tracking
//! - Type-keyed component storage
//! - Destruction hooks for components that own external resources
//! - Deferred destroy (collect-then-destroy, to avoid invalidating a scan)
//!
//! Every entity created through the Scene carries a `Tag`, a `Transform`
//! and a `Uuid`. Parent links are stored by UUID in `Hierarchy` and resolved
//! at the point of use.

use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

use log::trace;

use super::component::{Component, ComponentStore};
use super::components::{Hierarchy, Tag};
use super::entity::{Entity, EntityAllocator, SceneId};
use super::registry::ComponentRegistry;
use super::transform::Transform;
use super::uuid::Uuid;

const DEFAULT_ENTITY_NAME: &str = "Entity";

struct DestroyHook {
    type_id: TypeId,
    callback: Box<dyn FnMut(Entity, &mut dyn Any)>,
}

/// Container for all entities of one level.
pub struct Scene {
    id: SceneId,
    name: String,
    entities: EntityAllocator,
    components: ComponentStore,
    registry: Rc<ComponentRegistry>,
    destroy_hooks: Vec<DestroyHook>,
    /// Entities queued by `queue_destroy`
    destroy_queue: Vec<Entity>,
}

impl Scene {
    pub fn new(registry: Rc<ComponentRegistry>) -> Self {
        Self::with_name("Untitled", registry)
    }

    pub fn with_name(name: impl Into<String>, registry: Rc<ComponentRegistry>) -> Self {
        let id = SceneId::next();
        Self {
            id,
            name: name.into(),
            entities: EntityAllocator::new(id),
            components: ComponentStore::new(),
            registry,
            destroy_hooks: Vec::new(),
            destroy_queue: Vec::new(),
        }
    }

    pub fn id(&self) -> SceneId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// The registry this Scene was built with
    pub fn registry(&self) -> &Rc<ComponentRegistry> {
        &self.registry
    }

    // =========================================================================
    // Entity lifecycle
    // =========================================================================

    /// Create an entity with a fresh random UUID.
    pub fn create_entity(&mut self, name: &str) -> Entity {
        self.create_entity_with_uuid(Uuid::new(), name)
    }

    /// Create an entity with a caller-supplied UUID.
    /// A nil UUID is replaced by a fresh one.
    pub fn create_entity_with_uuid(&mut self, uuid: Uuid, name: &str) -> Entity {
        let uuid = if uuid.is_nil() { Uuid::new() } else { uuid };
        let name = if name.is_empty() { DEFAULT_ENTITY_NAME } else { name };

        let entity = self.entities.allocate();
        self.components.storage_or_insert::<Tag>().insert(entity, Tag::new(name));
        self.components.storage_or_insert::<Transform>().insert(entity, Transform::IDENTITY);
        self.components.storage_or_insert::<Uuid>().insert(entity, uuid);
        entity
    }

    /// Destroy an entity and all of its components immediately.
    ///
    /// Destruction hooks run first, once per hooked component the entity
    /// carries, while the handle is still valid. Returns false if the
    /// entity was not alive in this Scene.
    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        if !self.entities.is_alive(entity) {
            return false;
        }

        let index = entity.index();
        for hook in &mut self.destroy_hooks {
            let Some(storage) = self.components.erased_mut(hook.type_id) else {
                continue;
            };
            if let Some(component) = storage.get_any_mut(index) {
                trace!("destroy hook firing for entity {}", entity);
                (hook.callback)(entity, component);
            }
        }

        self.components.clear_entity(index);
        self.entities.free(entity);
        true
    }

    /// Queue an entity for destruction at the next `flush_destroyed`.
    pub fn queue_destroy(&mut self, entity: Entity) {
        if self.entities.is_alive(entity) {
            self.destroy_queue.push(entity);
        }
    }

    /// Destroy every queued entity. Returns how many were destroyed.
    pub fn flush_destroyed(&mut self) -> usize {
        let queued = std::mem::take(&mut self.destroy_queue);
        queued.into_iter().filter(|&e| self.destroy_entity(e)).count()
    }

    /// Register a hook that runs whenever a `T` leaves the Scene, either
    /// by entity destruction or `remove_component`.
    pub fn on_destroy<T: Component>(&mut self, mut hook: impl FnMut(Entity, &mut T) + 'static) {
        self.destroy_hooks.push(DestroyHook {
            type_id: TypeId::of::<T>(),
            callback: Box::new(move |entity, component: &mut dyn Any| {
                if let Some(component) = component.downcast_mut::<T>() {
                    hook(entity, component);
                }
            }),
        });
    }

    /// Destroy every entity through the normal destruction path.
    pub fn clear(&mut self) {
        let all: Vec<Entity> = self.entities.iter().collect();
        for entity in all {
            self.destroy_entity(entity);
        }
        self.destroy_queue.clear();
    }

    pub fn is_valid(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.alive_count() as usize
    }

    /// Live entities in slot order
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter()
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Attach a component. Panics if the entity is dead or already has one.
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) -> &mut T {
        assert!(self.is_valid(entity), "add_component on invalid entity {}", entity);
        assert!(
            !self.has_component::<T>(entity),
            "entity {} already has a {}",
            entity,
            std::any::type_name::<T>()
        );
        self.insert_component(entity, component)
    }

    /// Attach a component. A replaced component goes through the `T`
    /// destruction hooks before it is dropped.
    pub fn add_or_replace_component<T: Component>(&mut self, entity: Entity, component: T) -> &mut T {
        assert!(self.is_valid(entity), "add_or_replace_component on invalid entity {}", entity);
        self.insert_component(entity, component)
    }

    fn insert_component<T: Component>(&mut self, entity: Entity, component: T) -> &mut T {
        let previous = self.components.storage_or_insert::<T>().insert(entity, component);
        if let Some(mut old) = previous {
            let type_id = TypeId::of::<T>();
            for hook in self.destroy_hooks.iter_mut().filter(|h| h.type_id == type_id) {
                trace!("destroy hook firing for entity {} (component replaced)", entity);
                (hook.callback)(entity, &mut old);
            }
        }
        match self.components.storage_mut::<T>().and_then(|s| s.get_mut(entity)) {
            Some(component) => component,
            None => unreachable!("component missing right after insert"),
        }
    }

    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        if !self.is_valid(entity) {
            return None;
        }
        self.components.storage::<T>()?.get(entity)
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.is_valid(entity) {
            return None;
        }
        self.components.storage_mut::<T>()?.get_mut(entity)
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.is_valid(entity) && self.components.contains(TypeId::of::<T>(), entity.index())
    }

    /// Detach a component, firing destruction hooks for `T` first.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Option<T> {
        if !self.has_component::<T>(entity) {
            return None;
        }

        let type_id = TypeId::of::<T>();
        for hook in self.destroy_hooks.iter_mut().filter(|h| h.type_id == type_id) {
            if let Some(component) = self
                .components
                .erased_mut(type_id)
                .and_then(|s| s.get_any_mut(entity.index()))
            {
                trace!("destroy hook firing for entity {} (component removed)", entity);
                (hook.callback)(entity, component);
            }
        }

        self.components.storage_mut::<T>()?.remove(entity)
    }

    /// Whether the slot holds a component of the given runtime type.
    pub(crate) fn has_component_id(&self, entity: Entity, type_id: TypeId) -> bool {
        self.is_valid(entity) && self.components.contains(type_id, entity.index())
    }

    /// Iterate over every live entity carrying a `T`.
    pub fn view<T: Component>(&self) -> impl Iterator<Item = (Entity, &T)> + '_ {
        let entities = &self.entities;
        self.components
            .storage::<T>()
            .into_iter()
            .flat_map(|storage| storage.iter())
            .filter_map(move |(index, c)| entities.entity_at(index).map(|e| (e, c)))
    }

    /// Mutable variant of `view`.
    pub fn view_mut<T: Component>(&mut self) -> impl Iterator<Item = (Entity, &mut T)> + '_ {
        let entities = &self.entities;
        self.components
            .storage_mut::<T>()
            .into_iter()
            .flat_map(|storage| storage.iter_mut())
            .filter_map(move |(index, c)| entities.entity_at(index).map(|e| (e, c)))
    }

    /// Snapshot of entities carrying a `T`, safe to mutate the Scene over.
    pub fn entities_with<T: Component>(&self) -> Vec<Entity> {
        self.view::<T>().map(|(e, _)| e).collect()
    }

    // =========================================================================
    // Identity & hierarchy
    // =========================================================================

    pub fn uuid_of(&self, entity: Entity) -> Option<Uuid> {
        self.get_component::<Uuid>(entity).copied()
    }

    pub fn name_of(&self, entity: Entity) -> Option<&str> {
        self.get_component::<Tag>(entity).map(Tag::as_str)
    }

    /// Linear scan, O(n).
    pub fn find_entity_by_uuid(&self, uuid: Uuid) -> Option<Entity> {
        self.view::<Uuid>().find(|(_, id)| **id == uuid).map(|(e, _)| e)
    }

    /// First entity with a matching tag. Linear scan, O(n).
    pub fn find_entity_by_name(&self, name: &str) -> Option<Entity> {
        self.view::<Tag>().find(|(_, tag)| tag.as_str() == name).map(|(e, _)| e)
    }

    /// Link `child` under `parent` by UUID.
    pub fn set_parent(&mut self, child: Entity, parent: Entity) {
        if let Some(parent_uuid) = self.uuid_of(parent) {
            if self.is_valid(child) {
                self.add_or_replace_component(child, Hierarchy::child_of(parent_uuid));
            }
        }
    }

    /// Resolve the parent link of an entity, if the parent is alive.
    pub fn parent_of(&self, entity: Entity) -> Option<Entity> {
        let parent_uuid = self.get_component::<Hierarchy>(entity)?.parent_uuid?;
        self.find_entity_by_uuid(parent_uuid)
    }

    /// Direct children of the entity with the given UUID, in slot order.
    pub fn children_of(&self, parent: Uuid) -> Vec<Entity> {
        self.view::<Hierarchy>()
            .filter(|(_, h)| h.parent_uuid == Some(parent))
            .map(|(e, _)| e)
            .collect()
    }

    /// Copy an entity through the registry.
    ///
    /// The copy gets a fresh UUID and the source's name. Only components
    /// whose registration has a copy function are duplicated; the rest are
    /// left off on purpose.
    pub fn duplicate_entity(&mut self, source: Entity) -> Option<Entity> {
        let name = self.name_of(source)?.to_string();
        let copy = self.create_entity(&name);

        let registry = Rc::clone(&self.registry);
        for registration in registry.registrations() {
            if registration.can_copy() && self.has_component_id(source, registration.type_id()) {
                registration.copy(self, source, copy);
            }
        }
        Some(copy)
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("entities", &self.entity_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::game::components::{BodyType, Rigidbody2D, Velocity};
    use crate::math::Vec2;
    use crate::physics::BodyHandle;

    fn scene() -> Scene {
        Scene::new(Rc::new(ComponentRegistry::with_builtins()))
    }

    #[test]
    fn test_create_attaches_core_components() {
        let mut scene = scene();
        let e = scene.create_entity("Player");

        assert_eq!(scene.name_of(e), Some("Player"));
        assert_eq!(scene.get_component::<Transform>(e), Some(&Transform::IDENTITY));
        assert!(!scene.uuid_of(e).unwrap().is_nil());
        assert_eq!(scene.entity_count(), 1);
    }

    #[test]
    fn test_create_with_uuid() {
        let mut scene = scene();
        let e = scene.create_entity_with_uuid(Uuid(42), "");
        assert_eq!(scene.uuid_of(e), Some(Uuid(42)));
        assert_eq!(scene.name_of(e), Some("Entity"));

        let nil = scene.create_entity_with_uuid(Uuid::NIL, "nil");
        assert!(!scene.uuid_of(nil).unwrap().is_nil());
    }

    #[test]
    fn test_destroy_invalidates_handle() {
        let mut scene = scene();
        let e = scene.create_entity("gone");
        assert!(scene.destroy_entity(e));
        assert!(!scene.is_valid(e));
        assert!(scene.get_component::<Tag>(e).is_none());
        assert!(!scene.destroy_entity(e));

        // Reused slot doesn't resurrect old handle's components
        let e2 = scene.create_entity("new");
        assert_eq!(e2.index(), e.index());
        assert!(scene.get_component::<Tag>(e).is_none());
        assert_eq!(scene.name_of(e2), Some("new"));
    }

    #[test]
    fn test_handles_are_scene_scoped() {
        let mut a = scene();
        let b = scene();
        let e = a.create_entity("only in a");
        assert!(!b.is_valid(e));
        assert!(b.get_component::<Tag>(e).is_none());
    }

    #[test]
    fn test_destroy_hook_fires_once_before_invalidation() {
        let mut scene = scene();
        let released: Rc<RefCell<Vec<BodyHandle>>> = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&released);
        scene.on_destroy::<Rigidbody2D>(move |_, rb| {
            if let Some(body) = rb.body.take() {
                sink.borrow_mut().push(body);
            }
        });

        let heavy = scene.create_entity("crate");
        let mut rb = Rigidbody2D::new(BodyType::Dynamic);
        rb.body = Some(BodyHandle(9));
        scene.add_component(heavy, rb);
        let light = scene.create_entity("dust");

        scene.destroy_entity(heavy);
        scene.destroy_entity(light);
        scene.destroy_entity(heavy);
        assert_eq!(*released.borrow(), vec![BodyHandle(9)]);
    }

    #[test]
    fn test_remove_component_fires_hook() {
        let mut scene = scene();
        let fired = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&fired);
        scene.on_destroy::<Velocity>(move |_, _| *counter.borrow_mut() += 1);

        let e = scene.create_entity("mover");
        scene.add_component(e, Velocity::new(1.0, 0.0));
        let removed = scene.remove_component::<Velocity>(e);
        assert_eq!(removed, Some(Velocity::new(1.0, 0.0)));
        assert_eq!(*fired.borrow(), 1);
        assert_eq!(scene.remove_component::<Velocity>(e), None);
        assert_eq!(*fired.borrow(), 1);
    }

    #[test]
    #[should_panic]
    fn test_duplicate_add_panics() {
        let mut scene = scene();
        let e = scene.create_entity("twice");
        scene.add_component(e, Velocity::default());
        scene.add_component(e, Velocity::default());
    }

    #[test]
    fn test_find_by_uuid_and_name() {
        let mut scene = scene();
        let a = scene.create_entity_with_uuid(Uuid(1), "a");
        let b = scene.create_entity_with_uuid(Uuid(2), "b");
        assert_eq!(scene.find_entity_by_uuid(Uuid(2)), Some(b));
        assert_eq!(scene.find_entity_by_name("a"), Some(a));
        assert_eq!(scene.find_entity_by_uuid(Uuid(3)), None);
        assert_eq!(scene.find_entity_by_name("c"), None);
    }

    #[test]
    fn test_duplicate_skips_uncopyable() {
        let mut scene = scene();
        let src = scene.create_entity("crate");
        scene.add_component(src, Velocity::new(3.0, 4.0));
        scene.add_component(src, Rigidbody2D::new(BodyType::Static));
        scene.get_component_mut::<Transform>(src).unwrap().position = Vec2::new(5.0, 6.0);

        let dup = scene.duplicate_entity(src).unwrap();
        assert_ne!(scene.uuid_of(dup), scene.uuid_of(src));
        assert_eq!(scene.name_of(dup), Some("crate"));
        assert_eq!(scene.get_component::<Velocity>(dup), Some(&Velocity::new(3.0, 4.0)));
        assert_eq!(scene.get_component::<Transform>(dup).unwrap().position, Vec2::new(5.0, 6.0));
        assert!(!scene.has_component::<Rigidbody2D>(dup));
    }

    #[test]
    fn test_hierarchy_by_uuid() {
        let mut scene = scene();
        let parent = scene.create_entity("parent");
        let c1 = scene.create_entity("c1");
        let c2 = scene.create_entity("c2");
        scene.set_parent(c1, parent);
        scene.set_parent(c2, parent);

        let parent_uuid = scene.uuid_of(parent).unwrap();
        assert_eq!(scene.children_of(parent_uuid), vec![c1, c2]);
        assert_eq!(scene.parent_of(c1), Some(parent));

        scene.destroy_entity(parent);
        assert_eq!(scene.parent_of(c1), None);
    }

    #[test]
    fn test_view_and_deferred_destroy() {
        let mut scene = scene();
        for i in 0..4 {
            let e = scene.create_entity("v");
            scene.add_component(e, Velocity::new(i as f32, 0.0));
        }
        for e in scene.entities_with::<Velocity>() {
            if scene.get_component::<Velocity>(e).unwrap().velocity.x < 2.0 {
                scene.queue_destroy(e);
            }
        }
        assert_eq!(scene.flush_destroyed(), 2);
        assert_eq!(scene.view::<Velocity>().count(), 2);

        for (_, v) in scene.view_mut::<Velocity>() {
            v.velocity.y = 1.0;
        }
        assert!(scene.view::<Velocity>().all(|(_, v)| v.velocity.y == 1.0));
    }

    #[test]
    fn test_clear_runs_hooks() {
        let mut scene = scene();
        let fired = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&fired);
        scene.on_destroy::<Tag>(move |_, _| *counter.borrow_mut() += 1);
        scene.create_entity("a");
        scene.create_entity("b");
        scene.clear();
        assert_eq!(scene.entity_count(), 0);
        assert_eq!(*fired.borrow(), 2);
    }
}
