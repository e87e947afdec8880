//! Filesystem-backed identity store.
//!
//! One directory per identity (lower-cased name), holding a single
//! pretty-printed JSON record:
//!
//! ```text
//! <root>/
//!   alice/face_embedding.json
//!   bob/face_embedding.json
//! ```

use crate::types::{Descriptor, EmbeddingRecord};
use chrono::Utc;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

const RECORD_FILE: &str = "face_embedding.json";
const TEMP_RECORD_FILE: &str = ".face_embedding.json.tmp";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid identity name: {0:?}")]
    InvalidName(String),
    #[error("storage I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode record for {name}: {source}")]
    Encode {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A record together with the file it was written to.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub record: EmbeddingRecord,
    pub path: PathBuf,
}

/// Durable mapping from identity name to one embedding record.
pub trait IdentityStore {
    /// Write or replace the record for `name`.
    fn put(
        &self,
        name: &str,
        descriptor: Descriptor,
        image_source: &str,
        confidence: f32,
    ) -> Result<StoredRecord, StoreError>;

    /// All records that currently parse. Order is unspecified.
    fn get_all(&self) -> Result<Vec<EmbeddingRecord>, StoreError>;
}

/// Identity store rooted at a directory, one subdirectory per identity.
#[derive(Debug, Clone)]
pub struct FsIdentityStore {
    root: PathBuf,
}

impl FsIdentityStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the record for `name`.
    pub fn identity_dir(&self, name: &str) -> Result<PathBuf, StoreError> {
        let key = name.to_lowercase();
        if key.trim().is_empty()
            || key == "."
            || key == ".."
            || key.contains(['/', '\\', '\0'])
        {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(key))
    }

    fn read_record(path: &Path) -> Result<EmbeddingRecord, String> {
        let raw = fs::read_to_string(path).map_err(|e| e.to_string())?;
        serde_json::from_str(&raw).map_err(|e| e.to_string())
    }
}

impl IdentityStore for FsIdentityStore {
    fn put(
        &self,
        name: &str,
        descriptor: Descriptor,
        image_source: &str,
        confidence: f32,
    ) -> Result<StoredRecord, StoreError> {
        let dir = self.identity_dir(name)?;
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let record = EmbeddingRecord {
            name: name.to_string(),
            registered_at: Utc::now(),
            descriptor,
            image_source: image_source.to_string(),
            confidence,
        };
        let json = serde_json::to_string_pretty(&record).map_err(|source| StoreError::Encode {
            name: name.to_string(),
            source,
        })?;

        // Write beside the target and rename over it: readers see either the
        // old record or the new one, never a partial file.
        let tmp_path = dir.join(TEMP_RECORD_FILE);
        let path = dir.join(RECORD_FILE);
        {
            let mut file = fs::File::create(&tmp_path).map_err(|e| StoreError::io(&tmp_path, e))?;
            file.write_all(json.as_bytes())
                .and_then(|_| file.sync_all())
                .map_err(|e| StoreError::io(&tmp_path, e))?;
        }
        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(StoreError::io(&path, e));
        }

        tracing::debug!(name, path = %path.display(), dims = record.descriptor.len(), "record written");

        Ok(StoredRecord { record, path })
    }

    fn get_all(&self) -> Result<Vec<EmbeddingRecord>, StoreError> {
        if !self.root.exists() {
            tracing::debug!(root = %self.root.display(), "store root absent; no records");
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::io(&self.root, e))?;
        let mut records = Vec::new();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(root = %self.root.display(), error = %e, "skipping unreadable store entry");
                    continue;
                }
            };

            let dir = entry.path();
            let path = dir.join(RECORD_FILE);
            if !dir.is_dir() || !path.is_file() {
                continue;
            }

            match Self::read_record(&path) {
                Ok(record) => records.push(record),
                Err(error) => {
                    tracing::warn!(
                        identity = %entry.file_name().to_string_lossy(),
                        path = %path.display(),
                        %error,
                        "failed to load embedding; skipping"
                    );
                }
            }
        }

        tracing::debug!(count = records.len(), "loaded records");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn descriptor(values: &[f32]) -> Descriptor {
        Descriptor::new(values.to_vec())
    }

    #[test]
    fn test_get_all_absent_root_is_empty() {
        let dir = tempdir().unwrap();
        let store = FsIdentityStore::new(dir.path().join("people"));
        assert!(store.get_all().unwrap().is_empty());
    }

    #[test]
    fn test_put_creates_lowercase_directory() {
        let dir = tempdir().unwrap();
        let store = FsIdentityStore::new(dir.path().join("people"));

        let stored = store.put("Alice", descriptor(&[0.1, 0.2]), "alice.jpg", 0.98).unwrap();

        assert_eq!(stored.path, dir.path().join("people/alice/face_embedding.json"));
        assert!(stored.path.is_file());
        assert!(!stored.path.with_file_name(TEMP_RECORD_FILE).exists());
        assert_eq!(stored.record.name, "Alice");

        let all = store.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], stored.record);
    }

    #[test]
    fn test_put_overwrites_by_name() {
        let dir = tempdir().unwrap();
        let store = FsIdentityStore::new(dir.path());

        store.put("Carol", descriptor(&[0.1]), "old.jpg", 0.8).unwrap();
        store.put("carol", descriptor(&[0.9]), "new.jpg", 0.9).unwrap();

        let all = store.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].image_source, "new.jpg");
        assert_eq!(all[0].descriptor, descriptor(&[0.9]));
    }

    #[test]
    fn test_get_all_skips_corrupt_records() {
        let dir = tempdir().unwrap();
        let store = FsIdentityStore::new(dir.path());

        store.put("good", descriptor(&[0.5, 0.5]), "good.jpg", 0.9).unwrap();
        let bad_dir = dir.path().join("broken");
        fs::create_dir_all(&bad_dir).unwrap();
        fs::write(bad_dir.join(RECORD_FILE), "{ not json").unwrap();

        let all = store.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "good");
    }

    #[test]
    fn test_get_all_ignores_stray_files_and_empty_dirs() {
        let dir = tempdir().unwrap();
        let store = FsIdentityStore::new(dir.path());

        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();
        store.put("dave", descriptor(&[1.0]), "dave.jpg", 0.7).unwrap();

        let all = store.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "dave");
    }

    #[test]
    fn test_record_file_is_human_readable_json() {
        let dir = tempdir().unwrap();
        let store = FsIdentityStore::new(dir.path());
        let stored = store.put("Eve", descriptor(&[0.25]), "/tmp/eve.png", 0.5).unwrap();

        let raw = fs::read_to_string(&stored.path).unwrap();
        assert!(raw.contains('\n'), "record should be pretty-printed");
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["name"], "Eve");
        assert_eq!(value["imageSource"], "/tmp/eve.png");
        assert!(value["registeredAt"].is_string());
        assert!(value["descriptor"].is_array());
    }

    #[test]
    fn test_invalid_names_rejected() {
        let dir = tempdir().unwrap();
        let store = FsIdentityStore::new(dir.path());
        for name in ["", "  ", ".", "..", "a/b", "..\\up"] {
            let err = store.put(name, descriptor(&[0.0]), "x.jpg", 0.5).unwrap_err();
            assert!(matches!(err, StoreError::InvalidName(_)), "{name:?} accepted");
        }
        assert!(store.get_all().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_put_unwritable_root_is_storage_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();
        let store = FsIdentityStore::new(&blocker);

        let err = store.put("frank", descriptor(&[0.0]), "f.jpg", 0.5).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }
}
