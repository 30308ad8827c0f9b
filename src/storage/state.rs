//! State snapshot store
//!
//! The snapshot is one JSON document mapping each tracked repository to its
//! alert record. It is loaded once per cycle and written back once.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{write_atomic_async, StateError};
use crate::alerts::{AlertRecord, StateSnapshot};

/// File-backed store for the alert state snapshot
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot; a missing file is an empty snapshot.
    ///
    /// A file that exists but does not parse is an error, never an empty
    /// snapshot: guessing would re-alert every repository.
    pub async fn load(&self) -> Result<StateSnapshot, StateError> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No state file, starting empty");
                return Ok(StateSnapshot::new());
            }
            Err(e) => return Err(StateError::Io(e)),
        };

        decode(&data).map_err(|reason| StateError::Corrupt {
            path: self.path.clone(),
            reason,
        })
    }

    /// Write the snapshot and return the exact bytes written
    pub async fn save(&self, snapshot: &StateSnapshot) -> Result<Vec<u8>, StateError> {
        let bytes = encode(snapshot)?;
        // A crash mid-write must never leave a half-written snapshot
        write_atomic_async(&self.path, bytes.clone()).await?;
        Ok(bytes)
    }
}

/// Ensure every tracked entity has a record. Never removes records.
///
/// Returns the number of records inserted.
pub fn reconcile<S: AsRef<str>>(snapshot: &mut StateSnapshot, entities: &[S]) -> usize {
    let mut inserted = 0;
    for entity in entities {
        let entity = entity.as_ref();
        if !snapshot.contains_key(entity) {
            snapshot.insert(entity.to_string(), AlertRecord::pending());
            inserted += 1;
        }
    }
    inserted
}

/// Deterministic encoding: sorted keys, two-space indent, trailing newline
pub fn encode(snapshot: &StateSnapshot) -> Result<Vec<u8>, StateError> {
    let mut bytes = serde_json::to_vec_pretty(snapshot)
        .map_err(|e| StateError::Serialization(e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parse snapshot bytes
pub fn decode(data: &[u8]) -> Result<StateSnapshot, String> {
    serde_json::from_slice(data).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn snapshot(entries: &[(&str, bool)]) -> StateSnapshot {
        entries
            .iter()
            .map(|(k, sent)| (k.to_string(), AlertRecord { alert_sent: *sent }))
            .collect()
    }

    #[tokio::test]
    async fn test_load_missing_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = StateStore::new(temp_dir.path().join("state.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = StateStore::new(temp_dir.path().join("nested/state.json"));

        let state = snapshot(&[("b/y", false), ("a/x", true)]);
        store.save(&state).await.unwrap();

        assert_eq!(store.load().await.unwrap(), state);
        assert!(!temp_dir.path().join("nested/state.json.tmp").exists());
    }

    #[test]
    fn test_encoding_format() {
        let state = snapshot(&[("b/y", false), ("a/x", true)]);
        let bytes = encode(&state).unwrap();

        let expected = "{\n  \"a/x\": {\n    \"alert_sent\": true\n  },\n  \"b/y\": {\n    \"alert_sent\": false\n  }\n}\n";
        assert_eq!(String::from_utf8(bytes).unwrap(), expected);
    }

    #[tokio::test]
    async fn test_repeated_saves_identical() {
        let temp_dir = TempDir::new().unwrap();
        let store = StateStore::new(temp_dir.path().join("state.json"));

        let state = snapshot(&[("a/x", true), ("c/z", false)]);
        let first = store.save(&state).await.unwrap();
        let reloaded = store.load().await.unwrap();
        let second = store.save(&reloaded).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read(store.path()).unwrap(), first);
    }

    #[tokio::test]
    async fn test_corrupt_state_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");
        let store = StateStore::new(&path);

        for contents in ["", "   ", "{not json", "[1, 2]", r#"{"a/x": {"sent": true}}"#] {
            std::fs::write(&path, contents).unwrap();
            let err = store.load().await.unwrap_err();
            assert!(
                matches!(err, StateError::Corrupt { .. }),
                "{:?} should be corrupt",
                contents
            );
        }
    }

    #[test]
    fn test_reconcile_inserts_missing_only() {
        let mut state = snapshot(&[("a/x", true), ("old/gone", true)]);

        let inserted = reconcile(&mut state, &["a/x", "b/y"]);
        assert_eq!(inserted, 1);
        assert_eq!(state.len(), 3);
        assert_eq!(state["a/x"], AlertRecord::sent());
        assert_eq!(state["b/y"], AlertRecord::pending());
        // Entities dropped from config keep their record
        assert_eq!(state["old/gone"], AlertRecord::sent());
    }

    #[test]
    fn test_reconcile_idempotent() {
        let mut state = StateSnapshot::new();
        let entities = vec!["a/x".to_string(), "b/y".to_string()];

        assert_eq!(reconcile(&mut state, &entities), 2);
        let after_first = state.clone();
        assert_eq!(reconcile(&mut state, &entities), 0);
        assert_eq!(state, after_first);
    }
}
