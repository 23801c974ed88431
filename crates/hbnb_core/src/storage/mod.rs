//! Storage collaborator contract and backends.
//!
//! # Responsibility
//! - Define what records need from a durable store (`register`, `commit`,
//!   `forget`) plus the lookups callers use to load them back.
//! - Provide file (JSON) and SQLite implementations.
//!
//! # Invariants
//! - Records are addressed by `<TypeName>.<id>`.
//! - `register` is an idempotent upsert; nothing is durable before `commit`.
//! - `forget` on an unknown key is a no-op.

use crate::config::{AppConfig, StorageKind};
use crate::model::field::FieldMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod file_storage;
pub mod sqlite_storage;

pub use file_storage::FileStorage;
pub use sqlite_storage::SqliteStorage;

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage-layer error surfaced verbatim to record callers.
#[derive(Debug)]
pub enum StorageError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json(serde_json::Error),
    Sqlite(rusqlite::Error),
    /// The database file was migrated by a newer build.
    SchemaTooNew {
        found: u32,
        supported: u32,
    },
    InvalidDocument {
        key: String,
        message: String,
    },
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "storage io error at `{}`: {source}", path.display())
            }
            Self::Json(err) => write!(f, "storage json error: {err}"),
            Self::Sqlite(err) => write!(f, "storage sqlite error: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "record store schema version {found} is newer than supported {supported}"
            ),
            Self::InvalidDocument { key, message } => {
                write!(f, "invalid stored record `{key}`: {message}")
            }
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
            Self::Sqlite(err) => Some(err),
            Self::SchemaTooNew { .. } | Self::InvalidDocument { .. } => None,
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Storage address of one record: concrete type name plus id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    type_name: String,
    id: String,
}

impl RecordKey {
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.into(),
        }
    }

    /// Parses `<TypeName>.<id>`. The type name never contains a dot; the id may.
    pub fn parse(text: &str) -> Option<Self> {
        let (type_name, id) = text.split_once('.')?;
        if type_name.is_empty() || id.is_empty() {
            return None;
        }
        Some(Self::new(type_name, id))
    }

    /// Rejects keys whose `<TypeName>.<id>` text would not parse back to them.
    pub fn ensure_addressable(&self) -> StorageResult<()> {
        let message = if self.type_name.is_empty() {
            "type name must not be empty"
        } else if self.type_name.contains('.') {
            "type name must not contain `.`"
        } else if self.id.is_empty() {
            "id must not be empty"
        } else {
            return Ok(());
        };
        Err(StorageError::InvalidDocument {
            key: self.to_string(),
            message: message.to_string(),
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Display for RecordKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.type_name, self.id)
    }
}

/// Durable store consumed by records.
///
/// `register` rejects keys that fail [`RecordKey::ensure_addressable`].
///
/// Whether registered-but-uncommitted records are visible to `lookup`/`all`
/// is backend-defined.
pub trait Storage {
    /// Tracks (upserts) the exported fields of a record.
    fn register(&mut self, key: &RecordKey, fields: FieldMap) -> StorageResult<()>;

    /// Flushes all tracked changes to durable storage.
    fn commit(&mut self) -> StorageResult<()>;

    /// Removes a record from tracking and from durable storage.
    fn forget(&mut self, key: &RecordKey) -> StorageResult<()>;

    fn lookup(&self, key: &RecordKey) -> StorageResult<Option<FieldMap>>;

    /// Lists records, optionally restricted to one type name.
    fn all(&self, type_name: Option<&str>) -> StorageResult<Vec<(RecordKey, FieldMap)>>;

    fn count(&self, type_name: Option<&str>) -> StorageResult<usize> {
        Ok(self.all(type_name)?.len())
    }

    /// Drops in-memory state and re-reads durable storage.
    fn reload(&mut self) -> StorageResult<()>;
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn register(&mut self, key: &RecordKey, fields: FieldMap) -> StorageResult<()> {
        (**self).register(key, fields)
    }

    fn commit(&mut self) -> StorageResult<()> {
        (**self).commit()
    }

    fn forget(&mut self, key: &RecordKey) -> StorageResult<()> {
        (**self).forget(key)
    }

    fn lookup(&self, key: &RecordKey) -> StorageResult<Option<FieldMap>> {
        (**self).lookup(key)
    }

    fn all(&self, type_name: Option<&str>) -> StorageResult<Vec<(RecordKey, FieldMap)>> {
        (**self).all(type_name)
    }

    fn count(&self, type_name: Option<&str>) -> StorageResult<usize> {
        (**self).count(type_name)
    }

    fn reload(&mut self) -> StorageResult<()> {
        (**self).reload()
    }
}

/// Opens the backend selected by `config`, loading any existing state.
pub fn open_storage(config: &AppConfig) -> StorageResult<Box<dyn Storage>> {
    match config.storage {
        StorageKind::File => Ok(Box::new(FileStorage::open(&config.file_path)?)),
        StorageKind::Db => Ok(Box::new(SqliteStorage::open(&config.db_path)?)),
    }
}
