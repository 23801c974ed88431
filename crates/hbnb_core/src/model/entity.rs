//! Entity contract shared by every persisted record type.
//!
//! # Responsibility
//! - Let concrete types declare their discriminator and field registry.
//! - Provide rehydration, export, description and save/delete on top of
//!   [`BaseRecord`].
//!
//! # Invariants
//! - `to_mapping` output rehydrates into an equal entity.
//! - Extra fields never shadow declared ones: [`Entity::set_extra`] refuses
//!   declared names and exports always carry the declared value.
//! - Storage failures from `save`/`delete` reach the caller unchanged.

use crate::model::base_record::{BaseRecord, RecordError, RecordResult};
use crate::model::field::{
    find_field, FieldDescriptor, FieldMap, CLASS_KEY, CREATED_AT_KEY, ID_KEY, UPDATED_AT_KEY,
};
use crate::model::timestamp::format_timestamp;
use crate::storage::{RecordKey, Storage, StorageResult};
use chrono::{Datelike, NaiveDateTime, Timelike};
use log::{error, info};
use serde_json::Value;
use std::time::Instant;

/// A persisted record type built on [`BaseRecord`].
pub trait Entity: Sized {
    /// Discriminator written under `__class__`. Must be a constant.
    ///
    /// Storage keys are `<TypeName>.<id>`, so the name must be non-empty and
    /// must not contain `.`; backends refuse to register such records.
    fn type_name() -> &'static str;

    /// Declared fields beyond the base layout.
    fn schema() -> &'static [FieldDescriptor] {
        &[]
    }

    /// Wraps `base` with every declared field at its default.
    fn with_base(base: BaseRecord) -> Self;

    fn base(&self) -> &BaseRecord;

    fn base_mut(&mut self) -> &mut BaseRecord;

    /// Current values of declared fields, in schema order.
    fn declared_values(&self) -> FieldMap {
        FieldMap::new()
    }

    /// Assigns a declared field. `value` already matches the declared kind.
    fn assign(&mut self, name: &str, _value: Value) -> RecordResult<()> {
        Err(RecordError::InvalidField {
            field: name.to_string(),
            expected: "a declared field",
        })
    }

    /// Creates a fresh entity with a new id and timestamps.
    fn create() -> Self {
        Self::with_base(BaseRecord::new())
    }

    /// Rebuilds an entity from a stored field mapping.
    ///
    /// Declared fields are type-checked and assigned; undeclared ones are
    /// kept as extra fields.
    fn rehydrate(fields: FieldMap) -> RecordResult<Self> {
        let mut base = BaseRecord::from_fields(fields)?;
        let schema = Self::schema();
        let mut declared = Vec::new();
        let mut undeclared = FieldMap::new();

        for (name, value) in base.take_extra() {
            match find_field(schema, &name) {
                Some(field) if !field.kind.accepts(&value) => {
                    return Err(RecordError::InvalidField {
                        field: name,
                        expected: field.kind.as_str(),
                    });
                }
                Some(_) => declared.push((name, value)),
                None => {
                    undeclared.insert(name, value);
                }
            }
        }
        base.replace_extra(undeclared);

        let mut entity = Self::with_base(base);
        for (name, value) in declared {
            entity.assign(&name, value)?;
        }
        Ok(entity)
    }

    /// Sets an undeclared field. Declared and reserved names are rejected.
    fn set_extra(&mut self, name: impl Into<String>, value: Value) -> RecordResult<()> {
        let name = name.into();
        if find_field(Self::schema(), &name).is_some() {
            return Err(RecordError::InvalidField {
                field: name,
                expected: "an undeclared field name",
            });
        }
        self.base_mut().set_extra(name, value)
    }

    fn id(&self) -> &str {
        self.base().id()
    }

    fn key(&self) -> RecordKey {
        RecordKey::new(Self::type_name(), self.id())
    }

    /// Human-readable `[<TypeName>] (<id>) <field-map>` line for diagnostics.
    fn describe(&self) -> String {
        let base = self.base();
        let mut entries: Vec<(String, String)> = vec![
            (ID_KEY.to_string(), quote(base.id())),
            (CREATED_AT_KEY.to_string(), render_datetime(&base.created_at())),
            (UPDATED_AT_KEY.to_string(), render_datetime(&base.updated_at())),
        ];
        for (name, value) in self.declared_values().iter().chain(undeclared::<Self>(base)) {
            entries.push((name.clone(), render_value(value)));
        }

        let fields = entries
            .iter()
            .map(|(name, value)| format!("{}: {value}", quote(name)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("[{}] ({}) {{{fields}}}", Self::type_name(), base.id())
    }

    /// Exports the entity as a flat mapping suitable for storage.
    fn to_mapping(&self) -> FieldMap {
        let base = self.base();
        let mut fields = FieldMap::new();
        fields.insert(
            CLASS_KEY.to_string(),
            Value::String(Self::type_name().to_string()),
        );
        fields.insert(ID_KEY.to_string(), Value::String(base.id().to_string()));
        fields.insert(
            CREATED_AT_KEY.to_string(),
            Value::String(format_timestamp(&base.created_at())),
        );
        fields.insert(
            UPDATED_AT_KEY.to_string(),
            Value::String(format_timestamp(&base.updated_at())),
        );
        for (name, value) in self.declared_values() {
            fields.insert(name, value);
        }
        for (name, value) in undeclared::<Self>(base) {
            fields.insert(name.clone(), value.clone());
        }
        fields
    }

    /// Bumps `updated_at`, registers the entity and commits the storage.
    fn save<S: Storage + ?Sized>(&mut self, storage: &mut S) -> StorageResult<()> {
        let started_at = Instant::now();
        self.base_mut().touch();
        let key = self.key();

        let result = storage
            .register(&key, self.to_mapping())
            .and_then(|()| storage.commit());
        match &result {
            Ok(()) => info!(
                "event=record_save module=model status=ok type={} id={} duration_ms={}",
                key.type_name(),
                key.id(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=record_save module=model status=error type={} id={} error={}",
                key.type_name(),
                key.id(),
                err
            ),
        }
        result
    }

    /// Asks the storage to forget this entity.
    fn delete<S: Storage + ?Sized>(&self, storage: &mut S) -> StorageResult<()> {
        let key = self.key();
        let result = storage.forget(&key);
        match &result {
            Ok(()) => info!(
                "event=record_delete module=model status=ok type={} id={}",
                key.type_name(),
                key.id()
            ),
            Err(err) => error!(
                "event=record_delete module=model status=error type={} id={} error={}",
                key.type_name(),
                key.id(),
                err
            ),
        }
        result
    }
}

impl Entity for BaseRecord {
    fn type_name() -> &'static str {
        "BaseRecord"
    }

    fn with_base(base: BaseRecord) -> Self {
        base
    }

    fn base(&self) -> &BaseRecord {
        self
    }

    fn base_mut(&mut self) -> &mut BaseRecord {
        self
    }
}

impl std::fmt::Display for BaseRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Extra fields whose names are not declared by `E`.
fn undeclared<E: Entity>(base: &BaseRecord) -> impl Iterator<Item = (&String, &Value)> {
    base.extra()
        .iter()
        .filter(|(name, _)| find_field(E::schema(), name).is_none())
}

fn render_datetime(value: &NaiveDateTime) -> String {
    format!(
        "datetime({},{},{},{},{},{},{})",
        value.year(),
        value.month(),
        value.day(),
        value.hour(),
        value.minute(),
        value.second(),
        value.nanosecond() / 1_000
    )
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => quote(text),
        Value::Array(items) => {
            let items = items.iter().map(render_value).collect::<Vec<_>>();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let entries = map
                .iter()
                .map(|(name, value)| format!("{}: {}", quote(name), render_value(value)))
                .collect::<Vec<_>>();
            format!("{{{}}}", entries.join(", "))
        }
        other => other.to_string(),
    }
}

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('\'');
    for ch in text.chars() {
        match ch {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '\n' => quoted.push_str("\\n"),
            other => quoted.push(other),
        }
    }
    quoted.push('\'');
    quoted
}

#[cfg(test)]
mod tests {
    use super::{quote, render_value};
    use serde_json::json;

    #[test]
    fn quote_escapes_quotes_and_backslashes() {
        assert_eq!(quote("it's"), r"'it\'s'");
        assert_eq!(quote(r"a\b"), r"'a\\b'");
    }

    #[test]
    fn render_value_handles_nested_json() {
        let rendered = render_value(&json!({ "tags": ["a", 1, true, null] }));
        assert_eq!(rendered, "{'tags': ['a', 1, true, null]}");
    }
}
