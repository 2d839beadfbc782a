//! Durable client-side key/value storage.
//!
//! A single JSON object on disk, read and rewritten on every access. Values
//! are arbitrary JSON; callers pick their own keys.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::StorageError;

/// Key holding the signed-in user while running without a backend
pub const MOCK_USER_KEY: &str = "mockUser";
/// Key holding the live auth session between runs
pub const SESSION_KEY: &str = "supabase.session";

#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and decode one entry. A value that no longer decodes as `T` is
    /// treated as missing.
    pub fn get_item<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let mut entries = self.load()?;
        let Some(value) = entries.remove(key) else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(item) => Ok(Some(item)),
            Err(e) => {
                warn!(key, error = %e, "Ignoring unreadable storage entry");
                Ok(None)
            }
        }
    }

    pub fn set_item<T: Serialize>(&self, key: &str, item: &T) -> Result<(), StorageError> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), serde_json::to_value(item)?);
        self.save(&entries)?;
        debug!(key, path = %self.path.display(), "Stored item");
        Ok(())
    }

    /// Returns whether the key was present
    pub fn remove_item(&self, key: &str) -> Result<bool, StorageError> {
        let mut entries = self.load()?;
        let existed = entries.remove(key).is_some();
        if existed {
            self.save(&entries)?;
            debug!(key, "Removed item");
        }
        Ok(existed)
    }

    fn load(&self) -> Result<Map<String, Value>, StorageError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let data = std::fs::read_to_string(&self.path)?;
        if data.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&data)?)
    }

    fn save(&self, entries: &Map<String, Value>) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}
