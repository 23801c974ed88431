//! Application configuration for storage and logging.
//!
//! # Responsibility
//! - Select the storage backend and its location.
//! - Carry logging level and directory for `init_logging`.
//!
//! # Invariants
//! - Unset values fall back to [`AppConfig::default`].
//! - Unknown storage kinds are rejected, never silently defaulted.

use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_STORAGE: &str = "HBNB_TYPE_STORAGE";
pub const ENV_FILE_PATH: &str = "HBNB_FILE_PATH";
pub const ENV_DB_PATH: &str = "HBNB_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "HBNB_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "HBNB_LOG_DIR";

const DEFAULT_FILE_PATH: &str = "file.json";
const DEFAULT_DB_PATH: &str = "hbnb.db";

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
    Json(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for `{key}`")
            }
            Self::Json(err) => write!(f, "invalid config json: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

/// Storage backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// One JSON file holding every record.
    File,
    /// SQLite database.
    #[serde(alias = "sqlite")]
    Db,
}

impl StorageKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => Some(Self::File),
            "db" | "sqlite" => Some(Self::Db),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageKind,
    pub file_path: PathBuf,
    pub db_path: PathBuf,
    pub log_level: String,
    /// File logging is enabled only when a directory is configured.
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageKind::File,
            file_path: PathBuf::from(DEFAULT_FILE_PATH),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Reads `HBNB_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(value) = get(ENV_STORAGE) {
            config.storage = StorageKind::parse(&value).ok_or(ConfigError::InvalidValue {
                key: ENV_STORAGE,
                value,
            })?;
        }
        if let Some(value) = get(ENV_FILE_PATH) {
            config.file_path = PathBuf::from(value);
        }
        if let Some(value) = get(ENV_DB_PATH) {
            config.db_path = PathBuf::from(value);
        }
        if let Some(value) = get(ENV_LOG_LEVEL) {
            config.log_level = value;
        }
        if let Some(value) = get(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(value));
        }

        Ok(config)
    }

    /// Parses a JSON config document; missing keys keep their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(ConfigError::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, StorageKind, ENV_DB_PATH, ENV_STORAGE};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_lookup_yields_defaults() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.storage, StorageKind::File);
        assert_eq!(config.file_path, PathBuf::from("file.json"));
    }

    #[test]
    fn db_storage_is_selected_from_lookup() {
        let config =
            AppConfig::from_lookup(lookup(&[(ENV_STORAGE, "DB"), (ENV_DB_PATH, "/tmp/x.db")]))
                .unwrap();
        assert_eq!(config.storage, StorageKind::Db);
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.db"));
    }

    #[test]
    fn unknown_storage_kind_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[(ENV_STORAGE, "redis")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == ENV_STORAGE));
    }

    #[test]
    fn json_config_keeps_defaults_for_missing_keys() {
        let config = AppConfig::from_json_str(r#"{"storage": "db"}"#).unwrap();
        assert_eq!(config.storage, StorageKind::Db);
        assert_eq!(config.db_path, PathBuf::from("hbnb.db"));
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn json_and_env_accept_the_same_storage_names() {
        for name in ["file", "db", "sqlite"] {
            let from_env = AppConfig::from_lookup(lookup(&[(ENV_STORAGE, name)])).unwrap();
            let from_json =
                AppConfig::from_json_str(&format!(r#"{{"storage": "{name}"}}"#)).unwrap();
            assert_eq!(from_json.storage, from_env.storage, "storage name `{name}`");
        }
        let config = AppConfig::from_json_str(r#"{"storage": "sqlite"}"#).unwrap();
        assert_eq!(config.storage, StorageKind::Db);
    }
}
