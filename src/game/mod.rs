//! Game Foundation Module
//!
//! Entity/component store with a type-erased serialization registry.
//!
//! Key concepts:
//! - Entity: Generational index scoped to the Scene that created it
//! - Component: Plain data structs attached to entities
//! - Scene: Container for all entities and their components
//! - Registry: Stable string keys mapped to serialize/deserialize/copy
//!
//! Design philosophy:
//! - Components are registered at startup, not hard-coded into tooling
//! - Parent links go through UUIDs, never through handles
//! - Heavy entities belong to the physics world, light ones to `systems`

pub mod entity;
pub mod component;
pub mod components;
pub mod transform;
pub mod uuid;
pub mod registry;
pub mod scene;
pub mod systems;

// Re-export main types
pub use entity::{Entity, SceneId};
pub use component::Component;
pub use components::*;
pub use registry::{ComponentRegistration, ComponentRegistry};
pub use scene::Scene;
pub use transform::Transform;
pub use uuid::Uuid;
