//! File-backed durable store.

use crate::{KeyValueStore, StorageError, StorageResult};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Durable store persisted as a single JSON object file.
///
/// Every access re-reads the file so separate processes sharing the path see
/// each other's writes. Mutations rewrite the whole file through a temporary
/// sibling and an atomic rename, so a reader never observes a half-written
/// file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> StorageResult<Map<String, Value>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StorageError::Encoding(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(StorageError::Encoding(e.to_string())),
        }
    }

    /// Read the map for a mutation. An unparseable file is replaced rather
    /// than blocking every later write; the flag reports that it was dropped.
    fn read_map_for_write(&self) -> StorageResult<(Map<String, Value>, bool)> {
        match self.read_map() {
            Ok(map) => Ok((map, false)),
            Err(StorageError::Encoding(reason)) => {
                warn!(
                    path = %self.path.display(),
                    reason = %reason,
                    "Durable store is unreadable, starting it over"
                );
                Ok((Map::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(map)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self.write_lock.lock();
        let (mut map, _) = self.read_map_for_write()?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write_map(&map)?;
        debug!(path = %self.path.display(), key = %key, "Durable entry written");
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let map = self.read_map()?;
        Ok(match map.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let _guard = self.write_lock.lock();
        let (mut map, discarded) = self.read_map_for_write()?;
        let removed = map.remove(key).is_some();
        if !removed && !discarded {
            return Ok(false);
        }
        self.write_map(&map)?;
        debug!(path = %self.path.display(), key = %key, "Durable entry deleted");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nope.json"));
        assert_eq!(store.get("user").unwrap(), None);
        assert!(!store.delete("user").unwrap());
    }

    #[test]
    fn test_values_survive_new_instance() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage").join("durable.json");

        FileStore::new(&path).set("accessToken", "tok").unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get("accessToken").unwrap(), Some("tok".to_string()));
    }

    #[test]
    fn test_delete_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("durable.json");
        let store = FileStore::new(&path);
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();

        assert!(store.delete("a").unwrap());
        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get("a").unwrap(), None);
        assert_eq!(reopened.get("b").unwrap(), Some("2".to_string()));
    }

    #[test]
    fn test_corrupt_file_is_encoding_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("durable.json");
        fs::write(&path, "{ not json").unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(store.get("user"), Err(StorageError::Encoding(_))));
    }

    #[test]
    fn test_set_replaces_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("durable.json");
        fs::write(&path, "{ truncated").unwrap();

        let store = FileStore::new(&path);
        store.set("accessToken", "tok").unwrap();

        assert_eq!(store.get("accessToken").unwrap(), Some("tok".to_string()));
        let on_disk: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, serde_json::json!({ "accessToken": "tok" }));
    }

    #[test]
    fn test_delete_resets_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("durable.json");
        fs::write(&path, "[1, 2").unwrap();

        let store = FileStore::new(&path);
        assert!(!store.delete("user").unwrap());
        assert_eq!(store.get("user").unwrap(), None);
    }

    #[test]
    fn test_non_string_values_are_stringified() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("durable.json");
        fs::write(&path, r#"{"deviceId": 42, "user": null}"#).unwrap();

        let store = FileStore::new(&path);
        assert_eq!(store.get("deviceId").unwrap(), Some("42".to_string()));
        assert_eq!(store.get("user").unwrap(), None);
    }
}
