//! JSON file storage backend.
//!
//! # Responsibility
//! - Track records in memory keyed by `<TypeName>.<id>`.
//! - Serialize the whole tracked set to one JSON object on commit.
//!
//! # Invariants
//! - Registered records are visible to lookups before commit.
//! - The file only ever holds committed state; `forget` rewrites the last
//!   committed set, never pending registrations.
//! - The file is replaced via write-then-rename, never truncated in place.
//! - A missing file loads as an empty store.

use super::{RecordKey, Storage, StorageError, StorageResult};
use crate::model::field::FieldMap;
use log::{error, info};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Storage backend persisting every record into one JSON file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    objects: BTreeMap<RecordKey, FieldMap>,
    /// What the file held after the last commit or reload.
    committed: BTreeMap<RecordKey, FieldMap>,
}

impl FileStorage {
    /// Creates an empty store bound to `path` without reading it.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            objects: BTreeMap::new(),
            committed: BTreeMap::new(),
        }
    }

    /// Creates a store bound to `path` and loads its current content.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let mut storage = Self::new(path);
        storage.reload()?;
        Ok(storage)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_file(&self, objects: &BTreeMap<RecordKey, FieldMap>) -> StorageResult<()> {
        let started_at = Instant::now();
        let document: BTreeMap<String, &FieldMap> = objects
            .iter()
            .map(|(key, fields)| (key.to_string(), fields))
            .collect();
        let bytes = serde_json::to_vec(&document)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        let tmp_path = self.tmp_path();
        let written = fs::write(&tmp_path, bytes).and_then(|()| fs::rename(&tmp_path, &self.path));

        match written {
            Ok(()) => {
                info!(
                    "event=storage_commit module=storage backend=file status=ok records={} duration_ms={}",
                    objects.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(source) => {
                error!(
                    "event=storage_commit module=storage backend=file status=error error={}",
                    source
                );
                Err(self.io_error(source))
            }
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "storage".to_string());
        self.path.with_file_name(format!(".{file_name}.tmp"))
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl Storage for FileStorage {
    fn register(&mut self, key: &RecordKey, fields: FieldMap) -> StorageResult<()> {
        key.ensure_addressable()?;
        self.objects.insert(key.clone(), fields);
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        self.write_file(&self.objects)?;
        self.committed = self.objects.clone();
        Ok(())
    }

    fn forget(&mut self, key: &RecordKey) -> StorageResult<()> {
        let tracked = self.objects.remove(key);
        let Some(fields) = self.committed.remove(key) else {
            return Ok(());
        };
        if let Err(err) = self.write_file(&self.committed) {
            self.committed.insert(key.clone(), fields);
            if let Some(tracked) = tracked {
                self.objects.insert(key.clone(), tracked);
            }
            return Err(err);
        }
        Ok(())
    }

    fn lookup(&self, key: &RecordKey) -> StorageResult<Option<FieldMap>> {
        Ok(self.objects.get(key).cloned())
    }

    fn all(&self, type_name: Option<&str>) -> StorageResult<Vec<(RecordKey, FieldMap)>> {
        Ok(self
            .objects
            .iter()
            .filter(|(key, _)| type_name.map_or(true, |name| key.type_name() == name))
            .map(|(key, fields)| (key.clone(), fields.clone()))
            .collect())
    }

    fn count(&self, type_name: Option<&str>) -> StorageResult<usize> {
        Ok(self
            .objects
            .keys()
            .filter(|key| type_name.map_or(true, |name| key.type_name() == name))
            .count())
    }

    fn reload(&mut self) -> StorageResult<()> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                self.objects.clear();
                self.committed.clear();
                return Ok(());
            }
            Err(source) => return Err(self.io_error(source)),
        };

        let document: BTreeMap<String, FieldMap> = serde_json::from_slice(&bytes)?;
        let mut objects = BTreeMap::new();
        for (text, fields) in document {
            let key = RecordKey::parse(&text).ok_or_else(|| StorageError::InvalidDocument {
                key: text.clone(),
                message: "key must be `<TypeName>.<id>`".to_string(),
            })?;
            objects.insert(key, fields);
        }

        info!(
            "event=storage_reload module=storage backend=file status=ok records={}",
            objects.len()
        );
        self.committed = objects.clone();
        self.objects = objects;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::FileStorage;
    use crate::storage::{RecordKey, Storage, StorageError};
    use serde_json::{json, Value};

    fn fields(value: Value) -> crate::model::field::FieldMap {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("absent.json")).unwrap();
        assert_eq!(storage.count(None).unwrap(), 0);
    }

    #[test]
    fn commit_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("file.json");
        let mut storage = FileStorage::new(&path);
        storage
            .register(&RecordKey::new("BaseRecord", "1"), fields(json!({ "id": "1" })))
            .unwrap();
        storage.commit().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn reload_rejects_keys_without_type_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.json");
        std::fs::write(&path, r#"{"no-dot": {"id": "1"}}"#).unwrap();

        let err = FileStorage::open(&path).unwrap_err();
        assert!(matches!(err, StorageError::InvalidDocument { ref key, .. } if key == "no-dot"));
    }

    #[test]
    fn reload_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.json");
        std::fs::write(&path, "not json").unwrap();

        let err = FileStorage::open(&path).unwrap_err();
        assert!(matches!(err, StorageError::Json(_)));
    }

    #[test]
    fn forget_of_uncommitted_record_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.json");
        let mut storage = FileStorage::new(&path);
        let key = RecordKey::new("BaseRecord", "1");
        storage.register(&key, fields(json!({ "id": "1" }))).unwrap();

        storage.forget(&key).unwrap();

        assert_eq!(storage.lookup(&key).unwrap(), None);
        assert!(!path.exists());
    }

    #[test]
    fn register_rejects_dotted_type_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path().join("file.json"));
        let err = storage
            .register(&RecordKey::new("app.User", "1"), fields(json!({ "id": "1" })))
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidDocument { .. }));
        assert_eq!(storage.count(None).unwrap(), 0);
    }

    #[test]
    fn forget_unknown_key_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.json");
        let mut storage = FileStorage::new(&path);
        storage.forget(&RecordKey::new("BaseRecord", "missing")).unwrap();
        assert!(!path.exists());
    }
}
