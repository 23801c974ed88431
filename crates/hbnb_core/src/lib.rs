//! Core record layer for the hbnb clone.
//! This crate owns record identity, timestamps, the serialized layout and
//! the storage contract records are persisted through.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod storage;

pub use config::{AppConfig, ConfigError, StorageKind};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::base_record::{BaseRecord, RecordError, RecordResult};
pub use model::entity::Entity;
pub use model::field::{FieldDescriptor, FieldKind, FieldMap, CLASS_KEY};
pub use model::timestamp::{format_timestamp, parse_timestamp, TIMESTAMP_FORMAT};
pub use service::record_service::{RecordService, ServiceError, ServiceResult};
pub use storage::{
    open_storage, FileStorage, RecordKey, SqliteStorage, Storage, StorageError, StorageResult,
};

/// Minimal health-check API for wiring probes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
