//! Last reading position per document.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

/// A document's saved place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingPosition {
    pub document_id: String,
    pub word_ordinal: usize,
}

/// Where reading positions live.
///
/// Both operations are fire-and-forget: a store that cannot persist logs the
/// failure and carries on, and writes are last-write-wins per document.
pub trait PositionStore {
    fn get_last_position(&self, document_id: &str) -> Option<usize>;
    fn set_last_position(&mut self, document_id: &str, ordinal: usize);
}

/// Positions held in memory only.
#[derive(Debug, Clone, Default)]
pub struct MemoryPositionStore {
    positions: BTreeMap<String, usize>,
}

impl MemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positions(&self) -> impl Iterator<Item = ReadingPosition> + '_ {
        self.positions.iter().map(|(id, &ordinal)| ReadingPosition {
            document_id: id.clone(),
            word_ordinal: ordinal,
        })
    }
}

impl PositionStore for MemoryPositionStore {
    fn get_last_position(&self, document_id: &str) -> Option<usize> {
        self.positions.get(document_id).copied()
    }

    fn set_last_position(&mut self, document_id: &str, ordinal: usize) {
        self.positions.insert(document_id.to_string(), ordinal);
    }
}

impl<P: PositionStore + ?Sized> PositionStore for &mut P {
    fn get_last_position(&self, document_id: &str) -> Option<usize> {
        (**self).get_last_position(document_id)
    }

    fn set_last_position(&mut self, document_id: &str, ordinal: usize) {
        (**self).set_last_position(document_id, ordinal);
    }
}

/// Positions kept in a JSON file, rewritten on every update.
#[derive(Debug)]
pub struct JsonPositionStore {
    path: PathBuf,
    memory: MemoryPositionStore,
}

impl JsonPositionStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut memory = MemoryPositionStore::new();
        if path.exists() {
            let data = fs::read(&path)?;
            let entries: Vec<ReadingPosition> = serde_json::from_slice(&data)?;
            for entry in entries {
                memory.set_last_position(&entry.document_id, entry.word_ordinal);
            }
        }
        debug!(path = %path.display(), "opened position store");
        Ok(Self { path, memory })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self) -> Result<()> {
        let entries: Vec<ReadingPosition> = self.memory.positions().collect();
        let data = serde_json::to_vec_pretty(&entries)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

impl PositionStore for JsonPositionStore {
    fn get_last_position(&self, document_id: &str) -> Option<usize> {
        self.memory.get_last_position(document_id)
    }

    fn set_last_position(&mut self, document_id: &str, ordinal: usize) {
        self.memory.set_last_position(document_id, ordinal);
        if let Err(e) = self.write() {
            warn!(path = %self.path.display(), error = %e, "failed to persist reading position");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_document_has_no_position() {
        let store = MemoryPositionStore::new();
        assert_eq!(store.get_last_position("missing"), None);
    }

    #[test]
    fn test_last_write_wins() {
        let mut store = MemoryPositionStore::new();
        store.set_last_position("a", 3);
        store.set_last_position("a", 7);
        store.set_last_position("b", 1);
        assert_eq!(store.get_last_position("a"), Some(7));
        assert_eq!(store.positions().count(), 2);
    }

    #[test]
    fn test_json_store_persists_across_opens() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("positions.json");
        {
            let mut store = JsonPositionStore::open(&path).expect("open");
            assert_eq!(store.get_last_position("book"), None);
            store.set_last_position("book", 42);
        }
        let store = JsonPositionStore::open(&path).expect("reopen");
        assert_eq!(store.get_last_position("book"), Some(42));
    }

    #[test]
    fn test_json_store_rejects_garbage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("positions.json");
        fs::write(&path, b"not json").expect("write");
        assert!(JsonPositionStore::open(&path).is_err());
    }

    #[test]
    fn test_unwritable_store_keeps_positions_in_memory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing").join("positions.json");
        let mut store = JsonPositionStore::open(&path).expect("open");
        store.set_last_position("book", 5);
        assert_eq!(store.get_last_position("book"), Some(5));
    }
}
