use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use super::{KeyValueStore, StorageError};

/// Storage file name in cache directory
const STORAGE_FILE: &str = "storage.json";

/// Key-value store persisted as one JSON object on disk.
///
/// The whole document is loaded on open and rewritten on every mutation.
/// Mutations go through a temp file and a rename so a crash mid-write
/// leaves the previous document in place.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store under `cache_dir`.
    pub fn open(cache_dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(cache_dir)?;
        let path = cache_dir.join(STORAGE_FILE);

        let entries = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Self::parse(&path, &contents)
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), entries = entries.len(), "Storage opened");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// A document that does not parse is treated like any other unusable
    /// cache: start empty and let the next fetch rewrite it.
    fn parse(path: &Path, contents: &str) -> BTreeMap<String, String> {
        if contents.trim().is_empty() {
            return BTreeMap::new();
        }
        match serde_json::from_str(contents) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Storage file is corrupt, starting empty");
                BTreeMap::new()
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let contents = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::keys;

    #[test]
    fn test_file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let store = FileStore::open(dir.path()).unwrap();
        store.set(keys::UID, "20BCS1234").unwrap();
        store.set(keys::TIMESTAMP, "1700000000000").unwrap();
        drop(store);

        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get(keys::UID).unwrap().as_deref(), Some("20BCS1234"));
        assert_eq!(
            reopened.get(keys::TIMESTAMP).unwrap().as_deref(),
            Some("1700000000000")
        );
    }

    #[test]
    fn test_file_store_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set(keys::ATTENDANCE, "[]").unwrap();
        store.remove(keys::ATTENDANCE).unwrap();
        // Removing a missing key is not an error
        store.remove(keys::ATTENDANCE).unwrap();

        let reopened = FileStore::open(dir.path()).unwrap();
        assert!(reopened.get(keys::ATTENDANCE).unwrap().is_none());
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(&dir.path().join("nested")).unwrap();
        assert!(store.get(keys::UID).unwrap().is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(STORAGE_FILE), "not json").unwrap();

        let store = FileStore::open(dir.path()).unwrap();
        assert!(store.get(keys::UID).unwrap().is_none());

        // The next write replaces the corrupt document
        store.set(keys::UID, "20BCS1234").unwrap();
        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get(keys::UID).unwrap().as_deref(), Some("20BCS1234"));
    }
}
