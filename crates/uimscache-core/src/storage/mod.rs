//! Persisted key-value storage.
//!
//! The dashboard never reaches for ambient storage; a `KeyValueStore` is
//! handed to every component that reads or writes persisted state. Two
//! implementations are provided:
//!
//! - `MemoryStore`: process-local map, used by tests and ephemeral runs
//! - `FileStore`: a single JSON document in the cache directory
//!
//! All values are strings. Payloads are JSON text and the timestamp is a
//! decimal epoch-millisecond string, matching what the fetch side writes.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;

/// Well-known storage keys.
pub mod keys {
    /// Session marker. Presence-tested only.
    pub const UID: &str = "uid";
    pub const ATTENDANCE: &str = "attendance";
    pub const FULL_ATTENDANCE: &str = "fullattendance";
    pub const TIMETABLE: &str = "timetable";
    /// Epoch milliseconds of the last payload refresh.
    pub const TIMESTAMP: &str = "timestamp";

    /// The three payload keys, in the order they are checked.
    pub const PAYLOADS: [&str; 3] = [ATTENDANCE, FULL_ATTENDANCE, TIMETABLE];
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// A string-keyed, string-valued persistent store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Read a key, treating an empty value the same as a missing one.
    fn get_present(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get(key)?.filter(|v| !v.is_empty()))
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}
