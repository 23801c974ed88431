#![allow(dead_code)]

use hbnb_core::{BaseRecord, Entity, FieldDescriptor, FieldKind, FieldMap, RecordResult};
use serde_json::{json, Value};

/// Small concrete entity with declared fields, used to exercise the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub base: BaseRecord,
    pub name: String,
    pub number_rooms: i64,
    pub latitude: Option<f64>,
}

const PLACE_SCHEMA: &[FieldDescriptor] = &[
    FieldDescriptor::new("name", FieldKind::Text),
    FieldDescriptor::new("number_rooms", FieldKind::Integer),
    FieldDescriptor::new("latitude", FieldKind::Float),
];

impl Entity for Place {
    fn type_name() -> &'static str {
        "Place"
    }

    fn schema() -> &'static [FieldDescriptor] {
        PLACE_SCHEMA
    }

    fn with_base(base: BaseRecord) -> Self {
        Self {
            base,
            name: String::new(),
            number_rooms: 0,
            latitude: None,
        }
    }

    fn base(&self) -> &BaseRecord {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseRecord {
        &mut self.base
    }

    fn declared_values(&self) -> FieldMap {
        let mut values = FieldMap::new();
        values.insert("name".to_string(), json!(self.name));
        values.insert("number_rooms".to_string(), json!(self.number_rooms));
        values.insert("latitude".to_string(), json!(self.latitude));
        values
    }

    fn assign(&mut self, name: &str, value: Value) -> RecordResult<()> {
        match name {
            "name" => self.name = value.as_str().unwrap_or_default().to_string(),
            "number_rooms" => self.number_rooms = value.as_i64().unwrap_or_default(),
            "latitude" => self.latitude = value.as_f64(),
            _ => unreachable!("schema only declares name, number_rooms and latitude"),
        }
        Ok(())
    }
}

pub fn fields(value: Value) -> FieldMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}
