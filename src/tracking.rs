//! Persisted record of which files have been indexed.
//!
//! The tracking store is a single JSON file mapping filename to the
//! fingerprint it was indexed under and the chunk ids the index assigned.
//! It is the only place the file to chunk linkage exists; the vector store
//! itself has no notion of file ownership. The whole mapping is loaded
//! into memory on open and rewritten atomically on every mutation, so a
//! concurrent reader never sees a half-written file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// One indexed file: the fingerprint its chunks were produced from and the
/// backend-assigned ids of those chunks, in page order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedFile {
    pub fingerprint: String,
    pub chunk_ids: Vec<String>,
    pub indexed_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct TrackingStore {
    path: PathBuf,
    files: BTreeMap<String, TrackedFile>,
}

impl TrackingStore {
    /// Open the tracking store at `path`.
    ///
    /// A missing file is a fresh start and yields an empty store. A file
    /// that exists but does not parse is surfaced as
    /// [`Error::CorruptState`], never discarded.
    pub fn load(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            return Ok(Self {
                path: path.to_path_buf(),
                files: BTreeMap::new(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let files = serde_json::from_str(&content).map_err(|e| Error::CorruptState {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            files,
        })
    }

    /// Rewrite the persisted mapping.
    ///
    /// Serializes into a temporary file in the destination directory, then
    /// renames it over the target, so the file on disk is always either
    /// the old state or the new one in full.
    pub fn save(&self) -> Result<(), Error> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;

        let json = serde_json::to_string_pretty(&self.files)
            .map_err(|e| Error::io(&self.path, e.into()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| Error::io(&dir, e))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| Error::io(&self.path, e))?;
        tmp.as_file().sync_all().map_err(|e| Error::io(&self.path, e))?;
        tmp.persist(&self.path)
            .map_err(|e| Error::io(&self.path, e.error))?;

        Ok(())
    }

    pub fn get(&self, filename: &str) -> Option<&TrackedFile> {
        self.files.get(filename)
    }

    /// Replace or create the entry for `filename`, then persist.
    ///
    /// This is the durability point of ingestion: a file counts as indexed
    /// only once this returns. If persisting fails the in-memory entry is
    /// rolled back so memory never claims more than the disk holds.
    pub fn upsert(
        &mut self,
        filename: &str,
        fingerprint: &str,
        chunk_ids: Vec<String>,
    ) -> Result<(), Error> {
        let previous = self.files.insert(
            filename.to_string(),
            TrackedFile {
                fingerprint: fingerprint.to_string(),
                chunk_ids,
                indexed_at: Utc::now(),
            },
        );

        if let Err(e) = self.save() {
            match previous {
                Some(prev) => self.files.insert(filename.to_string(), prev),
                None => self.files.remove(filename),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Delete the entry if present, then persist. Absent filenames are a
    /// no-op, not an error. Returns whether an entry was removed.
    pub fn remove(&mut self, filename: &str) -> Result<bool, Error> {
        let Some(prev) = self.files.remove(filename) else {
            return Ok(false);
        };

        if let Err(e) = self.save() {
            self.files.insert(filename.to_string(), prev);
            return Err(e);
        }
        Ok(true)
    }

    /// Replace the whole mapping with an empty one and persist.
    pub fn clear(&mut self) -> Result<(), Error> {
        let previous = std::mem::take(&mut self.files);
        if let Err(e) = self.save() {
            self.files = previous;
            return Err(e);
        }
        Ok(())
    }

    pub fn filenames(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_at(dir: &tempfile::TempDir) -> TrackingStore {
        TrackingStore::load(&dir.path().join("file_tracking.json")).unwrap()
    }

    #[test]
    fn missing_file_yields_empty_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store_at(&dir);
        assert!(store.is_empty());
        assert!(store.filenames().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store = store_at(&dir);

        store
            .upsert("doc1.pdf", "h1", vec!["a".into(), "b".into()])
            .unwrap();
        store.upsert("doc2.pdf", "h2", vec![]).unwrap();

        let reloaded = TrackingStore::load(store.path()).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("doc1.pdf"), store.get("doc1.pdf"));
        assert_eq!(reloaded.get("doc2.pdf"), store.get("doc2.pdf"));
    }

    #[test]
    fn upsert_replaces_existing_entry() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store = store_at(&dir);

        store.upsert("doc.pdf", "h1", vec!["a".into()]).unwrap();
        store
            .upsert("doc.pdf", "h2", vec!["c".into(), "d".into()])
            .unwrap();

        let entry = store.get("doc.pdf").unwrap();
        assert_eq!(entry.fingerprint, "h2");
        assert_eq!(entry.chunk_ids, vec!["c", "d"]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_absent_is_noop() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store = store_at(&dir);

        assert!(!store.remove("ghost.pdf").unwrap());

        store.upsert("doc.pdf", "h1", vec![]).unwrap();
        assert!(store.remove("doc.pdf").unwrap());
        assert!(store.get("doc.pdf").is_none());

        let reloaded = TrackingStore::load(store.path()).unwrap();
        assert!(reloaded.is_empty());
    }

    #[test]
    fn clear_persists_empty_mapping() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store = store_at(&dir);

        store.upsert("doc.pdf", "h1", vec!["a".into()]).unwrap();
        store.clear().unwrap();

        let reloaded = TrackingStore::load(store.path()).unwrap();
        assert!(reloaded.is_empty());
    }

    #[test]
    fn corrupt_state_is_not_discarded() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("file_tracking.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = TrackingStore::load(&path).unwrap_err();
        assert!(matches!(err, Error::CorruptState { .. }));

        // The unreadable file must survive the failed load.
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn filenames_are_sorted() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store = store_at(&dir);

        store.upsert("zeta.pdf", "h", vec![]).unwrap();
        store.upsert("alpha.pdf", "h", vec![]).unwrap();

        assert_eq!(store.filenames(), vec!["alpha.pdf", "zeta.pdf"]);
    }
}
