//! Document shapes and the helpers shared by scene and prefab serializers.
//!
//! ```text
//! { "scene":  { "name", "version" },                     "entities": [...] }
//! { "prefab": { "name", "root", "version", "schema" },   "entities": [...] }
//! entity: { "uuid": u64, "tag": string, "<component key>": {...}, ... }
//! ```

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{limits, MigrationFn, SerializeError};
use crate::game::entity::Entity;
use crate::game::registry::ComponentRegistry;
use crate::game::scene::Scene;
use crate::game::uuid::Uuid;

/// Keys of an entity record that are not component keys
const RESERVED_KEYS: [&str; 2] = ["uuid", "tag"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneMeta {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefabMeta {
    pub name: String,
    /// UUID of the captured root entity
    pub root: Uuid,
    pub version: String,
    pub schema: String,
}

/// One serialized entity. Component entries are flattened next to
/// `uuid` and `tag`, keyed by registry key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    #[serde(default = "nil_uuid")]
    pub uuid: Uuid,
    #[serde(default)]
    pub tag: String,
    #[serde(flatten)]
    pub components: Map<String, Value>,
}

fn nil_uuid() -> Uuid {
    Uuid::NIL
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    pub scene: SceneMeta,
    pub entities: Vec<EntityRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefabDocument {
    pub prefab: PrefabMeta,
    pub entities: Vec<EntityRecord>,
}

/// Build the record of one live entity. Component keys are visited in
/// sorted order so output does not depend on registration order.
pub(crate) fn capture_entity(scene: &Scene, registry: &ComponentRegistry, entity: Entity) -> Option<EntityRecord> {
    let uuid = scene.uuid_of(entity)?;
    let tag = scene.name_of(entity).unwrap_or_default().to_string();

    let mut components = Map::new();
    for key in registry.sorted_keys() {
        if RESERVED_KEYS.contains(&key) {
            warn!("component key `{}` collides with a record field, skipped", key);
            continue;
        }
        let Some(registration) = registry.get_registration(key) else {
            continue;
        };
        if let Some(value) = registration.serialize(scene, entity) {
            components.insert(key.to_string(), value);
        }
    }

    Some(EntityRecord { uuid, tag, components })
}

/// Create an entity for a record and attach every registered component.
///
/// Unknown keys and components that fail to decode are logged and
/// skipped; the entity keeps whatever decoded successfully.
pub(crate) fn restore_entity(scene: &mut Scene, registry: &ComponentRegistry, uuid: Uuid, record: &EntityRecord) -> Entity {
    let entity = scene.create_entity_with_uuid(uuid, &record.tag);

    for (key, value) in &record.components {
        match registry.get_registration(key) {
            Some(registration) => {
                if let Err(e) = registration.deserialize(scene, entity, value) {
                    warn!("entity {} ({}): failed to decode `{}`: {}", uuid, record.tag, key, e);
                }
            }
            None => warn!("entity {} ({}): unknown component key `{}`", uuid, record.tag, key),
        }
    }
    entity
}

/// Run the migration callback if the document's version differs from the
/// target. `envelope` names the metadata object (`scene` or `prefab`).
pub(crate) fn migrate(
    document: &mut Value,
    envelope: &'static str,
    target_version: &str,
    migration: Option<&MigrationFn>,
) -> Result<(), SerializeError> {
    let meta = document
        .get(envelope)
        .filter(|m| m.is_object())
        .ok_or(SerializeError::MissingEnvelope(envelope))?;
    let file_version = meta
        .get("version")
        .and_then(Value::as_str)
        .ok_or(SerializeError::MissingEnvelope("version"))?
        .to_string();

    if file_version == target_version {
        return Ok(());
    }
    match migration {
        Some(migrate) => migrate(document, &file_version, target_version),
        None => warn!(
            "{} document version {} differs from {} and no migration is installed",
            envelope, file_version, target_version
        ),
    }
    Ok(())
}

/// Reject documents outside the validation limits.
pub(crate) fn validate(name: &str, records: &[EntityRecord]) -> Result<(), SerializeError> {
    if name.len() > limits::MAX_STRING_LEN {
        return Err(SerializeError::InvalidDocument(format!(
            "name too long ({} > {})",
            name.len(),
            limits::MAX_STRING_LEN
        )));
    }
    if records.len() > limits::MAX_ENTITIES {
        return Err(SerializeError::InvalidDocument(format!(
            "too many entities ({} > {})",
            records.len(),
            limits::MAX_ENTITIES
        )));
    }
    for (i, record) in records.iter().enumerate() {
        if record.tag.len() > limits::MAX_STRING_LEN {
            return Err(SerializeError::InvalidDocument(format!("entity {}: tag too long", i)));
        }
    }
    Ok(())
}
