//! Local persistence adapter.
//!
//! A string key-value store that survives restarts. Callers see a
//! [`LocalStore`] that never fails: read faults become "no value" and
//! write faults become "write skipped", both logged. The fallible
//! operations are still available on [`FileStore`] for tooling.
//!
//! # Directory Structure
//!
//! ```text
//! <data dir>/
//!   allSheets.json        # persisted sheet collection (JSON array)
//!   allSheets.json.lock   # advisory lock for the file above
//!   allTasks.json
//!   allTasks.json.lock
//!   allTasksPending.json  # "true" while local tasks have not reached the remote
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::{Error, Result};
use crate::lock::{self, DEFAULT_LOCK_TIMEOUT_MS};
use crate::model::{self, CollectionKind, Record};

/// Durable string key-value store; both operations are infallible.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str);
}

/// Read a persisted collection; empty when absent or unparseable.
pub fn load_collection<T: Record>(store: &dyn LocalStore) -> Vec<T> {
    let key = T::KIND.storage_key();
    match store.get(key) {
        Some(raw) => model::parse_collection(&raw).unwrap_or_else(|| {
            tracing::warn!(key, "stored collection is not a JSON array; ignoring");
            Vec::new()
        }),
        None => Vec::new(),
    }
}

/// Persist a collection under its storage key.
pub fn save_collection<T: Record>(store: &dyn LocalStore, records: &[T]) {
    let key = T::KIND.storage_key();
    match serde_json::to_string(records) {
        Ok(json) => store.set(key, &json),
        Err(err) => tracing::warn!(key, "skipping write, serialization failed: {err}"),
    }
}

fn pending_key(kind: CollectionKind) -> String {
    format!("{}Pending", kind.storage_key())
}

/// Whether the stored `kind` collection holds changes the remote never accepted.
pub fn is_pending(store: &dyn LocalStore, kind: CollectionKind) -> bool {
    matches!(store.get(&pending_key(kind)).as_deref().map(str::trim), Some("true"))
}

pub fn set_pending(store: &dyn LocalStore, kind: CollectionKind, pending: bool) {
    if pending != is_pending(store, kind) {
        store.set(&pending_key(kind), if pending { "true" } else { "false" });
    }
}

/// One JSON file per key inside a data directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    pub fn try_get(&self, key: &str) -> Result<Option<String>> {
        let key = validate_key(key)?;
        match lock::read_locked(self.path_for(key), DEFAULT_LOCK_TIMEOUT_MS)? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|err| Error::Storage(format!("{key}: not valid UTF-8: {err}"))),
            None => Ok(None),
        }
    }

    pub fn try_set(&self, key: &str, value: &str) -> Result<()> {
        let key = validate_key(key)?;
        lock::write_atomic_locked(self.path_for(key), value.as_bytes(), DEFAULT_LOCK_TIMEOUT_MS)
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key, dir = %self.dir.display(), "local read failed: {err}");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) {
        if let Err(err) = self.try_set(key, value) {
            tracing::warn!(key, dir = %self.dir.display(), "local write skipped: {err}");
        }
    }
}

/// Process-local store for ephemeral sessions and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }
}

fn validate_key(key: &str) -> Result<&str> {
    let trimmed = key.trim();
    if trimmed.is_empty()
        || !trimmed
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
    {
        return Err(Error::Storage(format!("invalid storage key '{key}'")));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Task;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn file_store_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path().join("data"));

        assert!(store.get("allTasks").is_none());
        store.set("allTasks", "[]");
        assert_eq!(store.get("allTasks").as_deref(), Some("[]"));
        assert!(store.path_for("allTasks").exists());
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());

        assert!(store.try_set("../escape", "x").is_err());
        store.set("../escape", "x");
        assert!(store.get("../escape").is_none());
    }

    #[test]
    fn unwritable_dir_is_swallowed() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        fs::write(&blocker, "not a dir").unwrap();
        let store = FileStore::new(blocker.join("data"));

        store.set("allSheets", "[]");
        assert!(store.get("allSheets").is_none());
    }

    #[test]
    fn collection_helpers_ignore_garbage() {
        let store = MemoryStore::new();
        store.set("allTasks", "{not json");
        assert!(load_collection::<Task>(&store).is_empty());

        save_collection(&store, &crate::defaults::default_tasks());
        assert_eq!(load_collection::<Task>(&store).len(), 3);
    }

    #[test]
    fn pending_marker_is_per_collection() {
        let store = MemoryStore::new();
        assert!(!is_pending(&store, CollectionKind::Tasks));

        set_pending(&store, CollectionKind::Tasks, true);
        assert!(is_pending(&store, CollectionKind::Tasks));
        assert!(!is_pending(&store, CollectionKind::Sheets));
        assert_eq!(store.get("allTasksPending").as_deref(), Some("true"));

        set_pending(&store, CollectionKind::Tasks, false);
        assert!(!is_pending(&store, CollectionKind::Tasks));
    }

    #[test]
    fn clearing_an_unset_marker_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());

        set_pending(&store, CollectionKind::Sheets, false);
        assert!(!store.path_for("allSheetsPending").exists());
    }
}
