#![allow(dead_code)]

use route_binder::error::ErrorRecord;
use route_binder::schema::{ParamSource, SchemaField};
use serde_json::Value;

/// Builds a schema-backed field with the builder defaults.
pub fn field(name: &str, source: ParamSource, schema: Value) -> SchemaField {
    SchemaField::builder(name, source, schema)
        .build()
        .unwrap()
}

/// Builds a body field that keeps its alias as a wrapping key.
pub fn embedded_body(name: &str, schema: Value) -> SchemaField {
    SchemaField::builder(name, ParamSource::Body, schema)
        .embed(true)
        .build()
        .unwrap()
}

/// `(loc, type)` pairs, as the wire format would show them.
pub fn loc_types(errors: &[ErrorRecord]) -> Vec<(Value, String)> {
    errors
        .iter()
        .map(|e| (serde_json::to_value(&e.loc).unwrap(), e.error_type.clone()))
        .collect()
}

pub fn locs(errors: &[ErrorRecord]) -> Vec<Value> {
    errors
        .iter()
        .map(|e| serde_json::to_value(&e.loc).unwrap())
        .collect()
}
