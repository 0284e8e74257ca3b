//! Storage
//!
//! Resolves asset-relative paths and performs the blocking file I/O behind
//! scene and prefab save/load:
//! - `AssetPaths` maps a relative asset path to a filesystem location
//! - `LocalStorage` is the filesystem backend rooted at an assets directory

pub mod local;

pub use local::LocalStorage;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Storage error types
#[derive(Debug, Error)]
pub enum StorageError {
    /// File or directory not found
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),
    /// Any other I/O failure
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    pub(crate) fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound(path.to_path_buf())
        } else {
            StorageError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Asset path resolver.
///
/// Opaque string-to-path mapping used only to pick save/load locations.
pub trait AssetPaths {
    /// Root directory holding all assets
    fn assets_directory(&self) -> &Path;

    /// Absolute location of an asset-relative path
    fn asset_path(&self, relative: &str) -> PathBuf {
        self.assets_directory().join(relative)
    }
}
