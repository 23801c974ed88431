//! Explicit field registry for record types.
//!
//! # Responsibility
//! - Describe declared (name, kind) pairs for concrete entity types.
//! - Hold the ordered mapping shape shared by rehydration and export.
//!
//! # Invariants
//! - Declared field names never collide with the reserved keys
//!   (`__class__`, `id`, `created_at`, `updated_at`).
//! - `FieldMap` preserves insertion order.

use serde_json::Value;

/// Ordered field name to value mapping used on the wire and on disk.
pub type FieldMap = serde_json::Map<String, Value>;

/// Reserved key carrying the concrete type name in serialized form.
pub const CLASS_KEY: &str = "__class__";
/// Identity key.
pub const ID_KEY: &str = "id";
/// Creation timestamp key.
pub const CREATED_AT_KEY: &str = "created_at";
/// Last-save timestamp key.
pub const UPDATED_AT_KEY: &str = "updated_at";

const RESERVED_KEYS: &[&str] = &[CLASS_KEY, ID_KEY, CREATED_AT_KEY, UPDATED_AT_KEY];

/// Returns whether `name` is owned by the base record layout.
pub fn is_reserved_key(name: &str) -> bool {
    RESERVED_KEYS.contains(&name)
}

/// Value kind accepted by a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Boolean,
    /// Any JSON value, including nested arrays and objects.
    Json,
}

impl FieldKind {
    /// Returns whether `value` can be stored in a field of this kind.
    ///
    /// `null` is accepted by every kind and means "not set".
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Text, Value::String(_)) => true,
            (Self::Integer, Value::Number(number)) => number.is_i64() || number.is_u64(),
            (Self::Float, Value::Number(_)) => true,
            (Self::Boolean, Value::Bool(_)) => true,
            (Self::Json, _) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Json => "json",
        }
    }
}

/// One declared field of an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// Finds the descriptor for `name` in `schema`.
pub fn find_field<'a>(schema: &'a [FieldDescriptor], name: &str) -> Option<&'a FieldDescriptor> {
    schema.iter().find(|field| field.name == name)
}
