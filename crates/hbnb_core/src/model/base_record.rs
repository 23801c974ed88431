//! Base record: identity, timestamps and forward-compatible fields.
//!
//! # Responsibility
//! - Build records either fresh or by rehydrating a stored field mapping.
//! - Keep unrecognized stored fields so they survive a load/save cycle.
//!
//! # Invariants
//! - `id` is never empty.
//! - A fresh record takes both timestamps from one clock read, so
//!   `created_at == updated_at` right after construction.
//! - `id` and `created_at` are only ever set during construction.
//! - `extra` never holds a reserved key.

use crate::model::field::{
    is_reserved_key, FieldMap, CLASS_KEY, CREATED_AT_KEY, ID_KEY, UPDATED_AT_KEY,
};
use crate::model::timestamp::{now, parse_timestamp};
use chrono::NaiveDateTime;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RecordResult<T> = Result<T, RecordError>;

/// Construction and field assignment errors for records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// A stored timestamp is not `YYYY-MM-DDTHH:MM:SS.ffffff`.
    MalformedTimestamp { field: &'static str, value: String },
    /// A value does not fit the field it is assigned to.
    InvalidField { field: String, expected: &'static str },
}

impl Display for RecordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedTimestamp { field, value } => write!(
                f,
                "malformed timestamp in `{field}`: `{value}` (expected YYYY-MM-DDTHH:MM:SS.ffffff)"
            ),
            Self::InvalidField { field, expected } => {
                write!(f, "invalid value for field `{field}`: expected {expected}")
            }
        }
    }
}

impl Error for RecordError {}

/// Identity and timestamp state shared by every record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseRecord {
    id: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
    extra: FieldMap,
}

impl BaseRecord {
    /// Creates a fresh record with a generated id and one clock read for
    /// both timestamps.
    pub fn new() -> Self {
        let stamp = now();
        Self {
            id: generate_id(),
            created_at: stamp,
            updated_at: stamp,
            extra: FieldMap::new(),
        }
    }

    /// Rehydrates a record from previously stored fields.
    ///
    /// `__class__` is skipped, timestamps are parsed from their exact text
    /// form and every other key lands in the extra field mapping. A missing
    /// or null `id` is generated; if either timestamp is missing both are
    /// set to now. An empty mapping behaves like [`BaseRecord::new`].
    ///
    /// # Errors
    /// - `MalformedTimestamp` when a timestamp is not the exact text pattern.
    /// - `InvalidField` when `id` is neither a string nor a number.
    pub fn from_fields(fields: FieldMap) -> RecordResult<Self> {
        let mut id = None;
        let mut created_at = None;
        let mut updated_at = None;
        let mut extra = FieldMap::new();

        for (key, value) in fields {
            match key.as_str() {
                CLASS_KEY => {}
                ID_KEY => id = coerce_id(value)?,
                CREATED_AT_KEY => created_at = parse_timestamp_value(CREATED_AT_KEY, value)?,
                UPDATED_AT_KEY => updated_at = parse_timestamp_value(UPDATED_AT_KEY, value)?,
                _ => {
                    extra.insert(key, value);
                }
            }
        }

        let (created_at, updated_at) = match (created_at, updated_at) {
            (Some(created_at), Some(updated_at)) => (created_at, updated_at),
            _ => {
                let stamp = now();
                (stamp, stamp)
            }
        };

        Ok(Self {
            id: id.unwrap_or_else(generate_id),
            created_at,
            updated_at,
            extra,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }

    pub fn updated_at(&self) -> NaiveDateTime {
        self.updated_at
    }

    /// Fields carried without a declaration, in insertion order.
    pub fn extra(&self) -> &FieldMap {
        &self.extra
    }

    /// Sets an undeclared field.
    ///
    /// Only the base layout is checked here; typed entities go through
    /// [`Entity::set_extra`](crate::model::entity::Entity::set_extra), which
    /// also refuses their declared names.
    ///
    /// # Errors
    /// - `InvalidField` when `name` is reserved by the base layout.
    pub fn set_extra(&mut self, name: impl Into<String>, value: Value) -> RecordResult<()> {
        let name = name.into();
        if is_reserved_key(&name) {
            return Err(RecordError::InvalidField {
                field: name,
                expected: "a non-reserved field name",
            });
        }
        self.extra.insert(name, value);
        Ok(())
    }

    pub fn remove_extra(&mut self, name: &str) -> Option<Value> {
        self.extra.remove(name)
    }

    /// Moves `updated_at` to the current time.
    pub(crate) fn touch(&mut self) {
        self.updated_at = now();
    }

    pub(crate) fn take_extra(&mut self) -> FieldMap {
        std::mem::take(&mut self.extra)
    }

    pub(crate) fn replace_extra(&mut self, extra: FieldMap) {
        self.extra = extra;
    }
}

impl Default for BaseRecord {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

fn coerce_id(value: Value) -> RecordResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) if text.is_empty() => Ok(None),
        Value::String(text) => Ok(Some(text)),
        Value::Number(number) => Ok(Some(number.to_string())),
        _ => Err(RecordError::InvalidField {
            field: ID_KEY.to_string(),
            expected: "string",
        }),
    }
}

fn parse_timestamp_value(
    field: &'static str,
    value: Value,
) -> RecordResult<Option<NaiveDateTime>> {
    let text = match value {
        Value::Null => return Ok(None),
        Value::String(text) => text,
        other => {
            return Err(RecordError::MalformedTimestamp {
                field,
                value: other.to_string(),
            });
        }
    };

    match parse_timestamp(&text) {
        Some(parsed) => Ok(Some(parsed)),
        None => Err(RecordError::MalformedTimestamp { field, value: text }),
    }
}
