//! Key-value cache persisted as one JSON file per key.
//!
//! Reads never fail: a missing or malformed file yields the caller's
//! default. Writes are best-effort and only logged on failure.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Well-known keys.
pub mod keys {
    pub const TODOS: &str = "todos";
    pub const REMINDERS: &str = "reminders";
    pub const NOTES: &str = "notes";
    pub const STATS: &str = "stats";
    pub const SETTINGS: &str = "settings";
    pub const MIGRATED_TO_REMOTE: &str = "migrated_to_remote";
    pub const SKIP_LOGIN: &str = "skip_login";
    pub const SESSION: &str = "session";
}

#[derive(Debug, Clone)]
pub struct LocalStore {
    data_dir: PathBuf,
}

impl LocalStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns the file backing a key.
    pub fn path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", key))
    }

    pub fn exists(&self, key: &str) -> bool {
        self.path(key).exists()
    }

    /// Loads a value, returning `default` if the key is missing or unreadable.
    pub fn load_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.try_load(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding unreadable local value");
                default
            }
        }
    }

    pub fn load<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        self.load_or(key, T::default())
    }

    /// Loads a value, distinguishing a missing key from a malformed one.
    pub fn try_load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let path = self.path(key);
        match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StorageError::ParseError(path, e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::IoError(path, e)),
        }
    }

    /// Persists a value, logging instead of returning failures.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        if let Err(e) = self.try_save(key, value) {
            tracing::warn!(key, error = %e, "failed to persist local value");
        }
    }

    /// Persists a value via a temporary file and rename.
    pub fn try_save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| StorageError::IoError(self.data_dir.clone(), e))?;

        let path = self.path(key);
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|e| StorageError::SerializeError(key.to_string(), e))?;

        let tmp = self.data_dir.join(format!(".{}.json.tmp", key));
        fs::write(&tmp, bytes).map_err(|e| StorageError::IoError(tmp.clone(), e))?;
        fs::rename(&tmp, &path).map_err(|e| StorageError::IoError(path, e))?;

        Ok(())
    }

    pub fn flag(&self, key: &str) -> bool {
        self.load_or(key, false)
    }

    pub fn set_flag(&self, key: &str, value: bool) {
        self.save(key, &value);
    }

    /// Deletes a key. Missing keys are not an error.
    pub fn remove(&self, key: &str) {
        match fs::remove_file(self.path(key)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(key, error = %e, "failed to remove local value"),
        }
    }
}

/// Errors raised by the fallible `try_*` operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error reading or writing a file.
    IoError(PathBuf, io::Error),
    /// File content is not valid JSON for the requested type.
    ParseError(PathBuf, serde_json::Error),
    /// Value could not be serialized.
    SerializeError(String, serde_json::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            StorageError::ParseError(path, e) => {
                write!(f, "Malformed content in {}: {}", path.display(), e)
            }
            StorageError::SerializeError(key, e) => {
                write!(f, "Failed to serialize '{}': {}", key, e)
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::IoError(_, e) => Some(e),
            StorageError::ParseError(_, e) => Some(e),
            StorageError::SerializeError(_, e) => Some(e),
        }
    }
}
