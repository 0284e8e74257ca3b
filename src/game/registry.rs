//! Component Registry
//!
//! Maps a stable string key to type-erased serialize / deserialize / copy
//! functions for one component type. Generic tooling (scene serializer,
//! prefabs, entity duplication) only ever talks to the registry and never
//! names concrete component types.
//!
//! The key is the only persisted identifier of a component type. Renaming
//! the Rust type must not change its key.
//!
//! The registry is built once at startup and then shared read-only
//! (`Rc<ComponentRegistry>`) with every Scene and serializer.

use std::any::{type_name, TypeId};
use std::collections::HashMap;

use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::component::Component;
use super::components::{
    BoxCollider2D, Bullet, Hierarchy, Particle, Rigidbody2D, SpriteRenderer, Velocity,
};
use super::entity::Entity;
use super::scene::Scene;
use super::transform::Transform;

/// Produces the JSON form of the component, or `None` if the entity lacks it.
pub type SerializeFn = Box<dyn Fn(&Scene, Entity) -> Option<Value>>;
/// Attaches a component decoded from JSON to the entity.
pub type DeserializeFn = Box<dyn Fn(&mut Scene, Entity, &Value) -> Result<(), serde_json::Error>>;
/// Copies the component from `src` to `dst`.
pub type CopyFn = Box<dyn Fn(&mut Scene, Entity, Entity)>;

/// Built-in registry keys
pub mod keys {
    pub const TRANSFORM: &str = "transform";
    pub const VELOCITY: &str = "velocity";
    pub const SPRITE_RENDERER: &str = "sprite_renderer";
    pub const HIERARCHY: &str = "hierarchy";
    pub const RIGIDBODY_2D: &str = "rigidbody_2d";
    pub const BOX_COLLIDER_2D: &str = "box_collider_2d";
    pub const BULLET: &str = "bullet";
    pub const PARTICLE: &str = "particle";
}

/// The type-erased function triple registered for one component type.
pub struct ComponentRegistration {
    key: String,
    type_id: TypeId,
    type_name: &'static str,
    serialize: SerializeFn,
    deserialize: DeserializeFn,
    copy: Option<CopyFn>,
}

impl ComponentRegistration {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust type name, for diagnostics only
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn serialize(&self, scene: &Scene, entity: Entity) -> Option<Value> {
        (self.serialize)(scene, entity)
    }

    pub fn deserialize(&self, scene: &mut Scene, entity: Entity, value: &Value) -> Result<(), serde_json::Error> {
        (self.deserialize)(scene, entity, value)
    }

    /// Whether this component participates in entity duplication
    pub fn can_copy(&self) -> bool {
        self.copy.is_some()
    }

    /// Run the copy function. Returns false if none is registered.
    pub fn copy(&self, scene: &mut Scene, src: Entity, dst: Entity) -> bool {
        match &self.copy {
            Some(copy) => {
                copy(scene, src, dst);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for ComponentRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistration")
            .field("key", &self.key)
            .field("type_name", &self.type_name)
            .field("can_copy", &self.can_copy())
            .finish()
    }
}

/// Table of component registrations keyed by stable string key.
#[derive(Default)]
pub struct ComponentRegistry {
    registrations: HashMap<String, ComponentRegistration>,
    keys_by_type: HashMap<TypeId, String>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in component registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_builtins();
        registry
    }

    /// Store the function triple for `T` under `key`.
    ///
    /// Re-registering an existing key silently replaces the previous entry,
    /// so "ensure registered" calls can be repeated. Registering `T` under a
    /// new key removes its old key. Keys must be unique
    /// across independently registered modules; nothing checks that here.
    pub fn register<T: Component>(
        &mut self,
        key: impl Into<String>,
        serialize: impl Fn(&Scene, Entity) -> Option<Value> + 'static,
        deserialize: impl Fn(&mut Scene, Entity, &Value) -> Result<(), serde_json::Error> + 'static,
        copy: Option<CopyFn>,
    ) {
        let key = key.into();
        let type_id = TypeId::of::<T>();

        // A type lives under one key; moving it drops the old entry
        if let Some(old_key) = self.keys_by_type.get(&type_id) {
            if *old_key != key {
                self.registrations.remove(old_key);
            }
        }

        let previous = self.registrations.insert(
            key.clone(),
            ComponentRegistration {
                key: key.clone(),
                type_id,
                type_name: type_name::<T>(),
                serialize: Box::new(serialize),
                deserialize: Box::new(deserialize),
                copy,
            },
        );

        if let Some(previous) = previous {
            if previous.type_id != type_id && self.keys_by_type.get(&previous.type_id) == Some(&key) {
                self.keys_by_type.remove(&previous.type_id);
            }
        }
        self.keys_by_type.insert(type_id, key);
    }

    /// Register a serde-backed component whose copy is a plain `Clone`.
    pub fn register_serde<T>(&mut self, key: impl Into<String>)
    where
        T: Component + Serialize + DeserializeOwned + Clone,
    {
        let copy: CopyFn = Box::new(|scene: &mut Scene, src: Entity, dst: Entity| {
            if let Some(component) = scene.get_component::<T>(src).cloned() {
                scene.add_or_replace_component(dst, component);
            }
        });
        self.register::<T>(key, serialize_with_serde::<T>, deserialize_with_serde::<T>, Some(copy));
    }

    /// Register a serde-backed component that must never be duplicated
    /// (e.g. components wrapping externally owned resources).
    pub fn register_serde_no_copy<T>(&mut self, key: impl Into<String>)
    where
        T: Component + Serialize + DeserializeOwned,
    {
        self.register::<T>(key, serialize_with_serde::<T>, deserialize_with_serde::<T>, None);
    }

    /// Register every built-in component. Safe to call repeatedly.
    pub fn register_builtins(&mut self) {
        self.register_serde::<Transform>(keys::TRANSFORM);
        self.register_serde::<Velocity>(keys::VELOCITY);
        self.register_serde::<SpriteRenderer>(keys::SPRITE_RENDERER);
        self.register_serde::<Hierarchy>(keys::HIERARCHY);
        self.register_serde_no_copy::<Rigidbody2D>(keys::RIGIDBODY_2D);
        self.register_serde::<BoxCollider2D>(keys::BOX_COLLIDER_2D);
        self.register_serde::<Bullet>(keys::BULLET);
        self.register_serde::<Particle>(keys::PARTICLE);
    }

    pub fn get_registration(&self, key: &str) -> Option<&ComponentRegistration> {
        self.registrations.get(key)
    }

    /// All registrations. Iteration order is unspecified; use
    /// `sorted_keys` when output must be deterministic.
    pub fn registrations(&self) -> impl Iterator<Item = &ComponentRegistration> {
        self.registrations.values()
    }

    /// Registered keys in lexicographic order
    pub fn sorted_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.registrations.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// The key `T` was registered under
    pub fn key_of<T: Component>(&self) -> Option<&str> {
        self.keys_by_type.get(&TypeId::of::<T>()).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.registrations.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

fn serialize_with_serde<T: Component + Serialize>(scene: &Scene, entity: Entity) -> Option<Value> {
    let component = scene.get_component::<T>(entity)?;
    match serde_json::to_value(component) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("failed to serialize {} on entity {}: {}", type_name::<T>(), entity, e);
            None
        }
    }
}

fn deserialize_with_serde<T: Component + DeserializeOwned>(
    scene: &mut Scene,
    entity: Entity,
    value: &Value,
) -> Result<(), serde_json::Error> {
    let component = T::deserialize(value)?;
    scene.add_or_replace_component(entity, component);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::math::Vec2;

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Score(u32);

    #[test]
    fn test_builtins_registered_and_idempotent() {
        let mut registry = ComponentRegistry::with_builtins();
        let count = registry.len();
        registry.register_builtins();
        assert_eq!(registry.len(), count);
        assert_eq!(registry.key_of::<Velocity>(), Some(keys::VELOCITY));
        assert!(!registry.get_registration(keys::RIGIDBODY_2D).unwrap().can_copy());
        assert!(registry.get_registration(keys::TRANSFORM).unwrap().can_copy());
    }

    #[test]
    fn test_sorted_keys() {
        let registry = ComponentRegistry::with_builtins();
        let keys = registry.sorted_keys();
        let mut expected = keys.clone();
        expected.sort();
        assert_eq!(keys, expected);
        assert!(keys.contains(&"bullet"));
    }

    #[test]
    fn test_reregistering_key_overwrites() {
        let calls = Rc::new(Cell::new(0));
        let mut registry = ComponentRegistry::new();
        registry.register_serde::<Score>("score");

        let counter = Rc::clone(&calls);
        registry.register::<Score>(
            "score",
            move |_, _| {
                counter.set(counter.get() + 1);
                Some(Value::Null)
            },
            |_, _, _| Ok(()),
            None,
        );
        assert_eq!(registry.len(), 1);

        let registry = Rc::new(registry);
        let mut scene = Scene::new(Rc::clone(&registry));
        let e = scene.create_entity("scored");
        scene.add_component(e, Score(3));

        let reg = registry.get_registration("score").unwrap();
        assert_eq!(reg.serialize(&scene, e), Some(Value::Null));
        assert_eq!(calls.get(), 1);
        assert!(!reg.can_copy());
    }

    #[test]
    fn test_moving_type_to_new_key() {
        let mut registry = ComponentRegistry::new();
        registry.register_serde::<Score>("score_v1");
        registry.register_serde::<Score>("score");
        assert_eq!(registry.key_of::<Score>(), Some("score"));
        assert!(!registry.contains("score_v1"));
        assert_eq!(registry.len(), 1);

        let registry = Rc::new(registry);
        let mut scene = Scene::new(Rc::clone(&registry));
        let e = scene.create_entity("scored");
        scene.add_component(e, Score(7));
        let serialized: Vec<&str> = registry
            .registrations()
            .filter(|reg| reg.serialize(&scene, e).is_some())
            .map(ComponentRegistration::key)
            .collect();
        assert_eq!(serialized, vec!["score"]);
    }

    #[test]
    fn test_serde_registration_roundtrip_through_scene() {
        let registry = Rc::new(ComponentRegistry::with_builtins());
        let mut scene = Scene::new(Rc::clone(&registry));
        let e = scene.create_entity("mover");
        scene.add_component(e, Velocity::new(2.0, 0.0));

        let reg = registry.get_registration(keys::VELOCITY).unwrap();
        let json = reg.serialize(&scene, e).unwrap();
        assert_eq!(json["velocity"], serde_json::json!([2.0, 0.0]));

        let other = scene.create_entity("other");
        assert_eq!(reg.serialize(&scene, other), None);
        reg.deserialize(&mut scene, other, &json).unwrap();
        assert_eq!(scene.get_component::<Velocity>(other).unwrap().velocity, Vec2::new(2.0, 0.0));
    }

    #[test]
    fn test_deserialize_rejects_bad_shape() {
        let registry = Rc::new(ComponentRegistry::with_builtins());
        let mut scene = Scene::new(Rc::clone(&registry));
        let e = scene.create_entity("bad");
        let reg = registry.get_registration(keys::VELOCITY).unwrap();
        assert!(reg.deserialize(&mut scene, e, &serde_json::json!("fast")).is_err());
        assert!(!scene.has_component::<Velocity>(e));
    }
}
