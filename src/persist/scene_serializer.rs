//! Scene Serializer
//!
//! Whole-scene save/load. Entities are written in slot order with their
//! component keys sorted, so saving the same Scene twice produces the same
//! bytes.

use std::path::Path;
use std::rc::Rc;

use log::{error, info};
use serde_json::Value;

use super::codec::{self, Format};
use super::document::{capture_entity, migrate, restore_entity, validate, SceneDocument, SceneMeta};
use super::{MigrationFn, SerializeError, FORMAT_VERSION};
use crate::config::EngineConfig;
use crate::game::registry::ComponentRegistry;
use crate::game::scene::Scene;
use crate::storage::LocalStorage;

pub struct SceneSerializer {
    registry: Rc<ComponentRegistry>,
    target_version: String,
    migration: Option<Box<MigrationFn>>,
}

impl SceneSerializer {
    pub fn new(registry: Rc<ComponentRegistry>) -> Self {
        Self {
            registry,
            target_version: FORMAT_VERSION.to_string(),
            migration: None,
        }
    }

    /// Serializer targeting the configured scene version
    pub fn from_config(registry: Rc<ComponentRegistry>, config: &EngineConfig) -> Self {
        Self::new(registry).with_target_version(config.scene_version.as_str())
    }

    /// Version stamped on save and expected on load
    pub fn with_target_version(mut self, version: impl Into<String>) -> Self {
        self.target_version = version.into();
        self
    }

    pub fn target_version(&self) -> &str {
        &self.target_version
    }

    /// Install the callback that upgrades documents whose version differs
    /// from the target. It runs on the raw tree before any entity is built.
    pub fn set_migration(&mut self, migration: impl Fn(&mut Value, &str, &str) + 'static) {
        self.migration = Some(Box::new(migration));
    }

    /// Build the document tree for every live entity.
    pub fn serialize(&self, scene: &Scene) -> Result<Value, SerializeError> {
        let entities = scene
            .entities()
            .filter_map(|e| capture_entity(scene, &self.registry, e))
            .collect();
        let document = SceneDocument {
            scene: SceneMeta {
                name: scene.name().to_string(),
                version: self.target_version.clone(),
            },
            entities,
        };
        Ok(serde_json::to_value(&document)?)
    }

    pub fn serialize_to_bytes(&self, scene: &Scene, format: Format) -> Result<Vec<u8>, SerializeError> {
        codec::encode(&self.serialize(scene)?, format)
    }

    /// Replace the contents of `scene` with the document.
    ///
    /// The document is migrated, parsed and validated first; on any error
    /// the Scene is left untouched.
    pub fn deserialize(&self, scene: &mut Scene, document: Value) -> Result<(), SerializeError> {
        let document = self.parse(document)?;

        scene.clear();
        scene.set_name(document.scene.name);
        for record in &document.entities {
            restore_entity(scene, &self.registry, record.uuid, record);
        }
        Ok(())
    }

    pub fn deserialize_bytes(&self, scene: &mut Scene, bytes: &[u8], format: Format) -> Result<(), SerializeError> {
        let document = codec::decode(bytes, format)?;
        self.deserialize(scene, document)
    }

    fn parse(&self, mut document: Value) -> Result<SceneDocument, SerializeError> {
        migrate(&mut document, "scene", &self.target_version, self.migration.as_deref())?;
        let document: SceneDocument = serde_json::from_value(document)?;
        validate(&document.scene.name, &document.entities)?;
        Ok(document)
    }

    /// Encode the Scene fully in memory, then write it in one call.
    pub fn save(&self, scene: &Scene, storage: &LocalStorage, path: impl AsRef<Path>, format: Format) -> Result<(), SerializeError> {
        let path = path.as_ref();
        let result = self
            .serialize_to_bytes(scene, format)
            .and_then(|bytes| Ok(storage.write(path, &bytes)?));

        match &result {
            Ok(()) => info!("saved scene '{}' ({} entities) to {}", scene.name(), scene.entity_count(), path.display()),
            Err(e) => error!("failed to save scene '{}' to {}: {}", scene.name(), path.display(), e),
        }
        result
    }

    /// Load a scene file, detecting JSON or binary from its contents.
    pub fn load(&self, scene: &mut Scene, storage: &LocalStorage, path: impl AsRef<Path>) -> Result<(), SerializeError> {
        let path = path.as_ref();
        let result = storage
            .read(path)
            .map_err(SerializeError::from)
            .and_then(|bytes| self.deserialize_bytes(scene, &bytes, Format::detect(&bytes)));

        match &result {
            Ok(()) => info!("loaded scene '{}' ({} entities) from {}", scene.name(), scene.entity_count(), path.display()),
            Err(e) => error!("failed to load scene from {}: {}", path.display(), e),
        }
        result
    }
}
