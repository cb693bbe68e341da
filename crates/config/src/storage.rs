//! Local key-value storage.
//!
//! A flat string-to-string map persisted as one JSON object in
//! `<config_dir>/storage.json` (0600 on Unix). Writes go straight to disk so
//! another process sees them immediately.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ConfigError;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError>;
    /// Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), ConfigError>;
}

/// Store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location.
    pub fn open_default() -> Result<Self, ConfigError> {
        let dir = crate::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::new(dir.join("storage.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or corrupt file reads as an empty map.
    fn read_map(&self) -> BTreeMap<String, String> {
        let Ok(contents) = fs::read_to_string(&self.path) else {
            return BTreeMap::new();
        };
        serde_json::from_str(&contents).unwrap_or_else(|e| {
            log::warn!("Discarding unreadable storage file {}: {}", self.path.display(), e);
            BTreeMap::new()
        })
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let contents =
            serde_json::to_string_pretty(map).map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(&self.path, contents).map_err(|e| ConfigError::Io(e.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&self.path, permissions)
                .map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.read_map().remove(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut map = self.read_map();
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&mut self, key: &str) -> Result<(), ConfigError> {
        let mut map = self.read_map();
        if map.remove(key).is_none() {
            return Ok(());
        }
        if map.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(ConfigError::Io(e.to_string())),
            };
        }
        self.write_map(&map)
    }
}

/// Non-persistent store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    map: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), ConfigError> {
        self.map.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("storage.json"));

        assert_eq!(store.get("authToken"), None);
        store.set("authToken", "tok").unwrap();
        store.set("currentUser", r#"{"username":"kim"}"#).unwrap();

        // A second handle sees the same data
        let other = FileStore::new(store.path().to_path_buf());
        assert_eq!(other.get("authToken").as_deref(), Some("tok"));
        assert_eq!(other.get("currentUser").as_deref(), Some(r#"{"username":"kim"}"#));
    }

    #[test]
    fn test_file_store_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let mut store = FileStore::new(&path);

        store.remove("authToken").unwrap();
        store.set("authToken", "tok").unwrap();
        store.remove("authToken").unwrap();
        store.remove("authToken").unwrap();
        assert_eq!(store.get("authToken"), None);
        // last key gone -> file gone
        assert!(!path.exists());
    }

    #[test]
    fn test_file_store_corrupt_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "garbage").unwrap();
        let mut store = FileStore::new(&path);
        assert_eq!(store.get("authToken"), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").as_deref(), Some("v"));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let mut store = FileStore::new(&path);
        store.set("authToken", "secret").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        store.set("a", "1").unwrap();
        assert_eq!(store.len(), 1);
        store.remove("a").unwrap();
        store.remove("a").unwrap();
        assert!(store.is_empty());
    }
}
