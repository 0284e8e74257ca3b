//! Local filesystem storage backend
//!
//! All operations block and complete immediately.

use std::path::{Path, PathBuf};

use log::debug;

use super::{AssetPaths, StorageError};
use crate::config::EngineConfig;

/// Filesystem storage rooted at a base directory.
///
/// Relative paths resolve against the base directory; absolute paths are
/// used as-is.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    /// Base directory for relative paths
    base_dir: PathBuf,
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl LocalStorage {
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Storage rooted at the configured assets directory
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::with_base_dir(config.assets_dir.clone())
    }

    /// Resolve a path relative to the base directory
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.base_dir.join(path)
    }

    /// List file names (not full paths) in a directory
    pub fn list(&self, path: impl AsRef<Path>) -> Result<Vec<String>, StorageError> {
        let full_path = self.resolve(path);
        let entries = std::fs::read_dir(&full_path).map_err(|e| StorageError::from_io(&full_path, e))?;
        let mut files: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        files.sort();
        Ok(files)
    }

    pub fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, StorageError> {
        let full_path = self.resolve(path);
        std::fs::read(&full_path).map_err(|e| StorageError::from_io(&full_path, e))
    }

    /// Create or overwrite a file, creating parent directories as needed.
    pub fn write(&self, path: impl AsRef<Path>, data: &[u8]) -> Result<(), StorageError> {
        let full_path = self.resolve(path);

        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::from_io(parent, e))?;
        }

        std::fs::write(&full_path, data).map_err(|e| StorageError::from_io(&full_path, e))?;
        debug!("wrote {} bytes to {}", data.len(), full_path.display());
        Ok(())
    }

    /// Delete a file. Deleting a missing file is not an error.
    pub fn delete(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        let full_path = self.resolve(path);
        match std::fs::remove_file(&full_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::from_io(&full_path, e)),
        }
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.resolve(path).exists()
    }
}

impl AssetPaths for LocalStorage {
    fn assets_directory(&self) -> &Path {
        &self.base_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_dir() -> (TempDir, LocalStorage) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::with_base_dir(dir.path());
        (dir, storage)
    }

    #[test]
    fn test_write_and_read() {
        let (_dir, storage) = setup_test_dir();
        storage.write("level.json", b"{}").unwrap();
        assert_eq!(storage.read("level.json").unwrap(), b"{}");
    }

    #[test]
    fn test_read_not_found() {
        let (_dir, storage) = setup_test_dir();
        let err = storage.read("missing.json").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let (_dir, storage) = setup_test_dir();
        storage.write("scenes/act1/intro.bin", b"data").unwrap();
        assert!(storage.exists("scenes/act1/intro.bin"));
    }

    #[test]
    fn test_list_and_delete() {
        let (dir, storage) = setup_test_dir();
        std::fs::write(dir.path().join("b.json"), "b").unwrap();
        std::fs::write(dir.path().join("a.json"), "a").unwrap();
        std::fs::create_dir(dir.path().join("prefabs")).unwrap();

        assert_eq!(storage.list(".").unwrap(), vec!["a.json", "b.json"]);

        storage.delete("a.json").unwrap();
        storage.delete("a.json").unwrap();
        assert!(!storage.exists("a.json"));
    }

    #[test]
    fn test_asset_path() {
        let (dir, storage) = setup_test_dir();
        assert_eq!(storage.assets_directory(), dir.path());
        assert_eq!(storage.asset_path("scenes/a.json"), dir.path().join("scenes/a.json"));
    }

    #[test]
    fn test_default_follows_config() {
        assert_eq!(LocalStorage::default().assets_directory(), EngineConfig::default().assets_dir.as_path());
    }
}
