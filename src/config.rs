//! Engine configuration
//!
//! Read from a RON file. Every field has a default, so a partial file such
//! as `(bullet_pool: (initial_capacity: 256))` is valid.

use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::persist::FORMAT_VERSION;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("failed to write config: {0}")]
    Serialize(#[from] ron::Error),
}

/// Sizing for one object pool
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Entities pre-created at init
    pub initial_capacity: usize,
    /// Hard cap on total entities; `None` grows without bound
    pub max_capacity: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            max_capacity: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// World units per grid cell
    pub cell_size: f32,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self { cell_size: 64.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Version stamped into saved documents and targeted by migration
    pub scene_version: String,
    /// Root for asset-relative scene and prefab paths
    pub assets_dir: PathBuf,
    pub bullet_pool: PoolConfig,
    pub particle_pool: PoolConfig,
    pub spatial: SpatialConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scene_version: FORMAT_VERSION.to_string(),
            assets_dir: PathBuf::from("assets"),
            bullet_pool: PoolConfig::default(),
            particle_pool: PoolConfig {
                initial_capacity: 256,
                max_capacity: Some(4096),
            },
            spatial: SpatialConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(s)?)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        let config = ron::ser::PrettyConfig::new().indentor("  ".to_string());
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron_str(&contents)?;
        info!("loaded engine config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_ron_string()?;
        std::fs::write(path, contents).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
