//! File-backed storage: a flat JSON object of string keys and values.

use crate::{StorageError, StorageResult, TokenStorage};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Storage persisted as a JSON object at `path`.
///
/// Every mutation rewrites the whole file through a temporary sibling and a
/// rename, so readers never observe a half-written file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    /// Open (or lazily create) storage at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> StorageResult<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                warn!(path = %self.path.display(), error = %e, "Storage file is corrupt");
                StorageError::from(e)
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, serde_json::to_vec_pretty(map)?)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl TokenStorage for FileStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self.lock.lock();
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)?;
        debug!(key, "Stored value");
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.read_map()?.get(key).cloned())
    }

    /// Remove `key`. A corrupt file is reset to an empty object, since none
    /// of its values can be read back.
    fn delete(&self, key: &str) -> StorageResult<bool> {
        let _guard = self.lock.lock();
        let mut map = match self.read_map() {
            Ok(map) => map,
            Err(StorageError::Encoding(_)) => {
                warn!(path = %self.path.display(), "Resetting corrupt storage file");
                self.write_map(&BTreeMap::new())?;
                return Ok(true);
            }
            Err(e) => return Err(e),
        };
        let existed = map.remove(key).is_some();
        if existed {
            self.write_map(&map)?;
            debug!(key, "Deleted value");
        }
        Ok(existed)
    }
}
