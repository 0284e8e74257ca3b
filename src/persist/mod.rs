//! Scene and Prefab Persistence
//!
//! Documents are built as a `serde_json::Value` tree and written either as
//! JSON text (human-editable) or as MessagePack (compact binary form of the
//! same tree). Component data is produced and consumed only through the
//! Component Registry.
//!
//! Loading is all-or-nothing up to entity reconstruction: the document is
//! decoded, migrated and validated before the target Scene is touched.

pub mod codec;
pub mod document;
pub mod prefab;
pub mod scene_serializer;

pub use codec::Format;
pub use document::{EntityRecord, PrefabDocument, PrefabMeta, SceneDocument, SceneMeta};
pub use prefab::{InstantiateOptions, PrefabSerializer};
pub use scene_serializer::SceneSerializer;

use serde_json::Value;
use thiserror::Error;

use crate::storage::StorageError;

/// Version written into new documents
pub const FORMAT_VERSION: &str = "1.0";

/// Schema marker carried by prefab documents
pub const PREFAB_SCHEMA: &str = "prefab";

/// Rewrites a raw document in place: `(document, file_version, target_version)`.
pub type MigrationFn = dyn Fn(&mut Value, &str, &str);

/// Validation limits to reject runaway documents
pub mod limits {
    /// Maximum number of entity records in one document
    pub const MAX_ENTITIES: usize = 1 << 20;
    /// Maximum length of a tag or document name
    pub const MAX_STRING_LEN: usize = 1024;
}

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("binary encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("binary decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("document is missing `{0}`")]
    MissingEnvelope(&'static str),
    #[error("invalid document: {0}")]
    InvalidDocument(String),
    #[error("entity is not alive in this scene")]
    EntityNotFound,
}
