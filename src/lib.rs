//! VESPER: data and runtime core for 2D games
//!
//! - Scenes of generational entities with plain-data components
//! - A component registry driving generic save/load and duplication
//! - Scene and prefab documents in JSON or MessagePack, with migration
//! - Recyclable entity pools for bullets and particles
//! - A uniform spatial hash for proximity queries
//!
//! Rendering, audio and the physics solver live outside this crate; the
//! physics world is consumed through `physics::PhysicsWorld`.

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod game;
pub mod math;
pub mod persist;
pub mod physics;
pub mod pool;
pub mod spatial;
pub mod storage;

pub use config::EngineConfig;
pub use game::{ComponentRegistry, Entity, Scene, Uuid};
pub use math::Vec2;
pub use persist::{Format, InstantiateOptions, PrefabSerializer, SceneSerializer, SerializeError};
pub use pool::{BulletPool, ObjectPool, ParticlePool};
pub use spatial::SpatialHashGrid;
