//! File-backed cart store.

use crate::domain::{StorageError, StorageKey};
use crate::ports::CartStore;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Stores each cart as a JSON file below a root directory.
///
/// Writes go to a temp file that is synced and renamed over the target, so
/// a crash never leaves a half-written cart behind.
#[derive(Debug, Clone)]
pub struct FileCartStore {
    root: PathBuf,
}

impl FileCartStore {
    /// Create a store rooted at `root`. Directories are created on write.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of the file for `key`.
    pub fn path_for(&self, key: &StorageKey) -> PathBuf {
        self.root.join(key.relative_path())
    }
}

impl CartStore for FileCartStore {
    fn read(&self, key: &StorageKey) -> Result<Option<Vec<u8>>, StorageError> {
        match std::fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &StorageKey, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("json.tmp");
        let mut file = std::fs::File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        std::fs::rename(&temp_path, &path)?;

        debug!(path = %path.display(), bytes = bytes.len(), "[sg-02] Cart file written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Environment;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_reads_none() {
        let dir = TempDir::new().expect("tempdir");
        let store = FileCartStore::new(dir.path());
        let key = StorageKey::new(Environment::Testing, "shop");
        assert_eq!(store.read(&key), Ok(None));
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().expect("tempdir");
        let store = FileCartStore::new(dir.path());
        let key = StorageKey::new(Environment::Testing, "shop");

        store.write(&key, b"{\"a\":1}").expect("write");
        store.write(&key, b"{\"a\":2}").expect("overwrite");

        assert_eq!(store.read(&key), Ok(Some(b"{\"a\":2}".to_vec())));
        assert!(dir
            .path()
            .join("testing")
            .join("shop")
            .join("shopping_cart.json")
            .exists());
        assert!(!store.path_for(&key).with_extension("json.tmp").exists());
    }

    #[test]
    fn test_keys_are_isolated() {
        let dir = TempDir::new().expect("tempdir");
        let store = FileCartStore::new(dir.path());
        let a = StorageKey::new(Environment::Testing, "a");
        let b = StorageKey::new(Environment::Production, "a");

        store.write(&a, b"one").expect("write");
        assert_eq!(store.read(&b), Ok(None));
        assert_eq!(store.read(&a), Ok(Some(b"one".to_vec())));
    }

    #[test]
    fn test_unreadable_path_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let store = FileCartStore::new(dir.path());
        let key = StorageKey::new(Environment::Testing, "shop");
        // A directory where the file should be
        std::fs::create_dir_all(store.path_for(&key)).expect("mkdir");

        assert!(matches!(store.read(&key), Err(StorageError::Io { .. })));
    }
}
