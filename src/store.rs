//! Token persistence.
//!
//! The session saves the negotiated token under a fixed key so the next
//! start can reconnect without asking the node for a new one.
//!
//! | Store | Backing |
//! |-------|---------|
//! | [`MemoryStore`] | Process-local map |
//! | [`FileStore`] | JSON object on disk |

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Key the session token is stored under.
pub const TOKEN_KEY: &str = "sysuiToken";

/// Stored value meaning "no token yet, ask the node for one".
pub const SENTINEL_TOKEN: &str = "initial";

/// Directory name under the user's config directory.
const APP_DIR: &str = "secure-api";

/// File name of the default store.
const STORE_FILE: &str = "store.json";

// ============================================================================
// TokenStore
// ============================================================================

/// Key/value persistence for the session token.
pub trait TokenStore: Send + Sync {
    /// Reads the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory store. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<FxHashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding a single entry.
    #[must_use]
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::new();
        store.entries.lock().insert(key.into(), value.into());
        store
    }
}

impl TokenStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ============================================================================
// FileStore
// ============================================================================

/// Store persisted as a flat JSON object of strings.
///
/// A missing file reads as empty. Writes rewrite the whole file and
/// create parent directories as needed.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl FileStore {
    /// Creates a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Creates a store at `<config dir>/secure-api/store.json`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the platform has no config directory.
    pub fn default_location() -> Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| Error::storage("Could not determine config directory"))?;

        Ok(Self::new(dir.join(APP_DIR).join(STORE_FILE)))
    }

    /// Returns the backing file path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&contents)? {
            Value::Object(map) => Ok(map),
            _ => Err(Error::storage(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))),
        }
    }
}

impl TokenStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock();
        let map = self.read_all()?;

        Ok(map.get(key).and_then(Value::as_str).map(str::to_string))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut map = self.read_all()?;
        map.insert(key.to_string(), Value::String(value.to_string()));

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.path, serde_json::to_string_pretty(&Value::Object(map))?)?;
        debug!(path = %self.path.display(), key, "Store written");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get(TOKEN_KEY).expect("get"), None);

        store.set(TOKEN_KEY, "abc123").expect("set");
        assert_eq!(store.get(TOKEN_KEY).expect("get").as_deref(), Some("abc123"));
    }

    #[test]
    fn test_memory_store_with_entry() {
        let store = MemoryStore::with_entry(TOKEN_KEY, SENTINEL_TOKEN);
        assert_eq!(
            store.get(TOKEN_KEY).expect("get").as_deref(),
            Some(SENTINEL_TOKEN)
        );
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join("absent.json"));
        assert_eq!(store.get(TOKEN_KEY).expect("get"), None);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("store.json");

        FileStore::new(&path).set(TOKEN_KEY, "abc123").expect("set");
        FileStore::new(&path).set("other", "value").expect("set");

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get(TOKEN_KEY).expect("get").as_deref(), Some("abc123"));
        assert_eq!(reopened.get("other").expect("get").as_deref(), Some("value"));
    }

    #[test]
    fn test_file_store_rejects_non_object() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.json");
        fs::write(&path, "[1, 2, 3]").expect("write");

        let err = FileStore::new(&path).get(TOKEN_KEY).expect_err("not an object");
        assert!(matches!(err, Error::Storage { .. }));
    }
}
