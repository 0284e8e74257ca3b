//! Prefabs
//!
//! A prefab is a captured entity subtree. Capture walks `Hierarchy` links
//! breadth-first by parent UUID starting at the root, so the root is always
//! the first record and creation order of the source entities does not
//! matter.
//!
//! Instantiation either reuses the captured UUIDs (`preserve_uuids`) or
//! gives every entity a fresh UUID and rewrites the parent links inside the
//! subtree through an old -> new map. The root's link to a parent outside
//! the subtree is dropped, or pointed at `InstantiateOptions::parent`.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::rc::Rc;

use log::{error, info, warn};
use serde_json::Value;

use super::codec::{self, Format};
use super::document::{capture_entity, migrate, restore_entity, validate, EntityRecord, PrefabDocument, PrefabMeta};
use super::{MigrationFn, SerializeError, FORMAT_VERSION, PREFAB_SCHEMA};
use crate::config::EngineConfig;
use crate::game::components::Hierarchy;
use crate::game::entity::Entity;
use crate::game::registry::ComponentRegistry;
use crate::game::scene::Scene;
use crate::game::uuid::Uuid;
use crate::storage::LocalStorage;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InstantiateOptions {
    /// Reuse the captured UUIDs instead of generating fresh ones.
    /// Instantiating twice into the same Scene then yields duplicate UUIDs.
    pub preserve_uuids: bool,
    /// Parent the instantiated root under this entity UUID
    pub parent: Option<Uuid>,
}

pub struct PrefabSerializer {
    registry: Rc<ComponentRegistry>,
    target_version: String,
    migration: Option<Box<MigrationFn>>,
}

impl PrefabSerializer {
    pub fn new(registry: Rc<ComponentRegistry>) -> Self {
        Self {
            registry,
            target_version: FORMAT_VERSION.to_string(),
            migration: None,
        }
    }

    pub fn from_config(registry: Rc<ComponentRegistry>, config: &EngineConfig) -> Self {
        Self::new(registry).with_target_version(config.scene_version.as_str())
    }

    pub fn with_target_version(mut self, version: impl Into<String>) -> Self {
        self.target_version = version.into();
        self
    }

    pub fn set_migration(&mut self, migration: impl Fn(&mut Value, &str, &str) + 'static) {
        self.migration = Some(Box::new(migration));
    }

    /// Capture `root` (and, with `include_children`, all its descendants).
    pub fn capture(&self, scene: &Scene, root: Entity, include_children: bool, name: &str) -> Result<PrefabDocument, SerializeError> {
        let root_uuid = scene.uuid_of(root).ok_or(SerializeError::EntityNotFound)?;

        let mut entities = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([root]);

        while let Some(entity) = queue.pop_front() {
            let Some(record) = capture_entity(scene, &self.registry, entity) else {
                continue;
            };
            // A hierarchy cycle would otherwise walk forever
            if !visited.insert(record.uuid) {
                continue;
            }
            if include_children {
                queue.extend(scene.children_of(record.uuid));
            }
            entities.push(record);
        }

        Ok(PrefabDocument {
            prefab: PrefabMeta {
                name: name.to_string(),
                root: root_uuid,
                version: self.target_version.clone(),
                schema: PREFAB_SCHEMA.to_string(),
            },
            entities,
        })
    }

    /// Build the subtree in `scene`. Returns the instantiated root.
    pub fn instantiate(&self, scene: &mut Scene, prefab: &PrefabDocument, options: InstantiateOptions) -> Result<Entity, SerializeError> {
        check_prefab(prefab)?;

        let remap: HashMap<Uuid, Uuid> = prefab
            .entities
            .iter()
            .filter(|r| !r.uuid.is_nil())
            .map(|r| {
                let new = if options.preserve_uuids { r.uuid } else { Uuid::new() };
                (r.uuid, new)
            })
            .collect();

        let mut root = None;
        for record in &prefab.entities {
            let uuid = remap.get(&record.uuid).copied().unwrap_or(Uuid::NIL);
            let entity = restore_entity(scene, &self.registry, uuid, record);

            if record.uuid == prefab.prefab.root {
                root = Some(entity);
                relink_root(scene, entity, options.parent);
            } else {
                relink_child(scene, entity, &remap);
            }
        }

        root.ok_or_else(|| SerializeError::InvalidDocument("root entity missing".into()))
    }

    /// Decode, migrate and parse a raw prefab document.
    pub fn from_value(&self, mut document: Value) -> Result<PrefabDocument, SerializeError> {
        migrate(&mut document, "prefab", &self.target_version, self.migration.as_deref())?;
        let prefab: PrefabDocument = serde_json::from_value(document)?;
        check_prefab(&prefab)?;
        Ok(prefab)
    }

    pub fn to_bytes(&self, prefab: &PrefabDocument, format: Format) -> Result<Vec<u8>, SerializeError> {
        codec::encode(&serde_json::to_value(prefab)?, format)
    }

    pub fn from_bytes(&self, bytes: &[u8], format: Format) -> Result<PrefabDocument, SerializeError> {
        self.from_value(codec::decode(bytes, format)?)
    }

    pub fn save(&self, prefab: &PrefabDocument, storage: &LocalStorage, path: impl AsRef<Path>, format: Format) -> Result<(), SerializeError> {
        let path = path.as_ref();
        let result = self
            .to_bytes(prefab, format)
            .and_then(|bytes| Ok(storage.write(path, &bytes)?));

        match &result {
            Ok(()) => info!("saved prefab '{}' ({} entities) to {}", prefab.prefab.name, prefab.entities.len(), path.display()),
            Err(e) => error!("failed to save prefab '{}' to {}: {}", prefab.prefab.name, path.display(), e),
        }
        result
    }

    pub fn load(&self, storage: &LocalStorage, path: impl AsRef<Path>) -> Result<PrefabDocument, SerializeError> {
        let path = path.as_ref();
        let result = storage
            .read(path)
            .map_err(SerializeError::from)
            .and_then(|bytes| self.from_bytes(&bytes, Format::detect(&bytes)));

        match &result {
            Ok(prefab) => info!("loaded prefab '{}' from {}", prefab.prefab.name, path.display()),
            Err(e) => error!("failed to load prefab from {}: {}", path.display(), e),
        }
        result
    }
}

fn check_prefab(prefab: &PrefabDocument) -> Result<(), SerializeError> {
    if prefab.prefab.schema != PREFAB_SCHEMA {
        return Err(SerializeError::InvalidDocument(format!("unexpected schema `{}`", prefab.prefab.schema)));
    }
    validate(&prefab.prefab.name, &prefab.entities)?;
    let has_root = prefab
        .entities
        .iter()
        .any(|r: &EntityRecord| !r.uuid.is_nil() && r.uuid == prefab.prefab.root);
    if !has_root {
        return Err(SerializeError::InvalidDocument("root entity missing".into()));
    }
    Ok(())
}

fn relink_root(scene: &mut Scene, root: Entity, parent: Option<Uuid>) {
    match parent {
        Some(parent) => {
            scene.add_or_replace_component(root, Hierarchy::child_of(parent));
        }
        None => {
            scene.remove_component::<Hierarchy>(root);
        }
    }
}

fn relink_child(scene: &mut Scene, entity: Entity, remap: &HashMap<Uuid, Uuid>) {
    let Some(hierarchy) = scene.get_component_mut::<Hierarchy>(entity) else {
        return;
    };
    let Some(old_parent) = hierarchy.parent_uuid else {
        return;
    };
    match remap.get(&old_parent) {
        Some(new_parent) => hierarchy.parent_uuid = Some(*new_parent),
        None => {
            warn!("prefab entity {} points outside the captured subtree, link dropped", entity);
            hierarchy.parent_uuid = None;
        }
    }
}
