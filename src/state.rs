//! Fetch state store for resumable batch runs.
//!
//! Persisted as a single JSON object:
//!
//! ```json
//! { "done": { "<identity>@<version>": { "ok": true, "schemaPath": "...", "updatedAt": "..." } } }
//! ```
//!
//! A key recorded with `ok: true` is skipped by every later run until the
//! store is reset. A key recorded with `ok: false` is retried on the next
//! run; there is no staleness expiry in either direction.
//!
//! The driver calls [`FetchStateStore::record`] after every outcome, which
//! rewrites the file (temp file + rename), so an interrupted run loses at
//! most the item that was in flight.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{HarvestError, HarvestResult};
use crate::models::FetchStateRecord;

/// Build the `identity@version` key used by the store.
pub fn state_key(identity: &str, version: &str) -> String {
    format!("{}@{}", identity, version)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchState {
    #[serde(default)]
    pub done: BTreeMap<String, FetchStateRecord>,
}

/// Key → outcome mapping, optionally backed by a file.
#[derive(Debug)]
pub struct FetchStateStore {
    path: Option<PathBuf>,
    state: FetchState,
}

impl FetchStateStore {
    /// A store that never touches disk. Every key starts out pending.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: FetchState::default(),
        }
    }

    /// Open a durable store. A missing file starts empty; an unreadable or
    /// corrupt one is logged and replaced on the next flush.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<FetchState>(&content) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "fetch state unreadable, starting fresh");
                    FetchState::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FetchState::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "fetch state unreadable, starting fresh");
                FetchState::default()
            }
        };
        Self {
            path: Some(path),
            state,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether the key already completed successfully.
    pub fn is_done(&self, key: &str) -> bool {
        self.state.done.get(key).map(|r| r.ok).unwrap_or(false)
    }

    pub fn get(&self, key: &str) -> Option<&FetchStateRecord> {
        self.state.done.get(key)
    }

    pub fn records(&self) -> impl Iterator<Item = (&String, &FetchStateRecord)> {
        self.state.done.iter()
    }

    pub fn len(&self) -> usize {
        self.state.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.done.is_empty()
    }

    /// Store an outcome and flush it immediately.
    pub fn record(&mut self, key: impl Into<String>, record: FetchStateRecord) -> HarvestResult<()> {
        self.state.done.insert(key.into(), record);
        self.flush()
    }

    /// Forget every outcome, removing the backing file if there is one.
    pub fn reset(&mut self) -> HarvestResult<()> {
        self.state = FetchState::default();
        if let Some(path) = &self.path {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(HarvestError::Internal(format!(
                        "removing {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }
        Ok(())
    }

    fn flush(&self) -> HarvestResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut body = serde_json::to_string_pretty(&self.state)
            .map_err(|e| HarvestError::Internal(e.to_string()))?;
        body.push('\n');

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, body)
            .map_err(|e| HarvestError::Internal(format!("writing {}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, path)
            .map_err(|e| HarvestError::Internal(format!("replacing {}: {}", path.display(), e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn key_format() {
        assert_eq!(state_key("acme", "v1"), "acme@v1");
    }

    #[test]
    fn ok_records_are_done_failures_are_not() {
        let mut store = FetchStateStore::in_memory();
        store
            .record("a@1", FetchStateRecord::success("schemas/a/1.json"))
            .unwrap();
        store
            .record("b@1", FetchStateRecord::failure("boom"))
            .unwrap();
        assert!(store.is_done("a@1"));
        assert!(!store.is_done("b@1"));
        assert!(!store.is_done("c@1"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn every_record_is_flushed_to_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(".cache/state.json");

        let mut store = FetchStateStore::open(&path);
        store
            .record("a@1", FetchStateRecord::success("schemas/a/1.json"))
            .unwrap();

        let reopened = FetchStateStore::open(&path);
        assert!(reopened.is_done("a@1"));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["done"]["a@1"]["ok"], serde_json::json!(true));
        assert_eq!(
            raw["done"]["a@1"]["schemaPath"],
            serde_json::json!("schemas/a/1.json")
        );
    }

    #[test]
    fn failure_can_be_overwritten_by_success() {
        let mut store = FetchStateStore::in_memory();
        store.record("a@1", FetchStateRecord::failure("503")).unwrap();
        store
            .record("a@1", FetchStateRecord::success("schemas/a/1.json"))
            .unwrap();
        let record = store.get("a@1").unwrap();
        assert!(record.ok);
        assert!(record.error.is_none());
    }

    #[test]
    fn corrupt_file_starts_fresh() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();
        let store = FetchStateStore::open(&path);
        assert!(store.is_empty());
    }

    #[test]
    fn reset_removes_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state.json");
        let mut store = FetchStateStore::open(&path);
        store
            .record("a@1", FetchStateRecord::success("x"))
            .unwrap();
        assert!(path.exists());
        store.reset().unwrap();
        assert!(!path.exists());
        assert!(!store.is_done("a@1"));
    }
}
