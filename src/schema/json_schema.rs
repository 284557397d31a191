//! JSON Schema backed field descriptor.
//!
//! [`SchemaField`] validates in lax mode: string inputs coming from the path,
//! query string, headers or form bodies are first coerced to the types the
//! schema declares, object members missing from the input are filled from
//! `properties.*.default`, and the result is checked with a compiled
//! [`jsonschema::Validator`]. Violations are reported relative to the field
//! and classified into the canonical error types from
//! [`crate::error::error_types`].

use super::field::{FieldDescriptor, FieldSerializer, Serialization, Validated};
use super::types::{NestedModel, ParamSource, SubField};
use crate::error::{error_types, pointer_to_location, FieldError, SchemaViolation};
use crate::response::{apply_options, SerializeOptions};
use crate::validator_cache::ValidatorCache;
use jsonschema::{Draft, Validator};
use serde_json::{Map, Number, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Vendor extension naming a property's internal field name.
pub const FIELD_NAME_EXTENSION: &str = "x-field-name";
/// Vendor extension allowing lookup of structured parameter sub-fields by
/// internal name.
pub const POPULATE_BY_NAME_EXTENSION: &str = "x-populate-by-name";

/// A schema document could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid JSON Schema for field '{}': {}", self.field, self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Compiles `schema` with the draft used throughout the crate.
pub(crate) fn compile_schema(schema: &Value) -> Result<Validator, String> {
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .map_err(|e| e.to_string())
}

/// Field descriptor backed by a JSON Schema document.
#[derive(Clone)]
pub struct SchemaField {
    name: String,
    alias: String,
    source: ParamSource,
    required: bool,
    default: Option<Value>,
    multiple: bool,
    embed: bool,
    nested: Option<NestedModel>,
    schema: Arc<Value>,
    validator: Arc<Validator>,
}

impl fmt::Debug for SchemaField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaField")
            .field("name", &self.name)
            .field("alias", &self.alias)
            .field("source", &self.source)
            .field("required", &self.required)
            .field("default", &self.default)
            .field("multiple", &self.multiple)
            .field("embed", &self.embed)
            .field("schema", &self.schema)
            .finish()
    }
}

impl SchemaField {
    pub fn builder(
        name: impl Into<String>,
        source: ParamSource,
        schema: Value,
    ) -> SchemaFieldBuilder {
        SchemaFieldBuilder::new(name, source, schema)
    }

    #[must_use]
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    fn violations(&self, raw: &Value, coerced: &Value) -> Vec<FieldError> {
        let mut errors = Vec::new();
        // `required` and `additionalProperties` fire once per object; the
        // member-level records are produced on the first hit.
        let mut expanded: HashSet<(String, &'static str)> = HashSet::new();

        for error in self.validator.iter_errors(coerced) {
            let instance_path = error.instance_path.to_string();
            let schema_path = error.schema_path.to_string();
            let (parent, keyword) = schema_path.rsplit_once('/').unwrap_or(("", ""));
            let node = self.schema.pointer(parent);

            match keyword {
                "required" => {
                    if expanded.insert((instance_path.clone(), "required")) {
                        let input = coerced.pointer(&instance_path).cloned();
                        let object_loc = pointer_to_location(&instance_path, coerced);
                        for member in missing_members(node, coerced.pointer(&instance_path)) {
                            errors.push(FieldError::Schema(SchemaViolation {
                                loc: object_loc.child(member),
                                error_type: error_types::MISSING.to_string(),
                                message: "Field required".to_string(),
                                input: input.clone(),
                                ctx: None,
                            }));
                        }
                    }
                }
                "additionalProperties" => {
                    if expanded.insert((instance_path.clone(), "additionalProperties")) {
                        let object = coerced.pointer(&instance_path);
                        let object_loc = pointer_to_location(&instance_path, coerced);
                        for (member, value) in extra_members(node, object) {
                            errors.push(FieldError::Schema(SchemaViolation {
                                loc: object_loc.child(member),
                                error_type: error_types::EXTRA_FORBIDDEN.to_string(),
                                message: "Extra inputs are not permitted".to_string(),
                                input: Some(value),
                                ctx: None,
                            }));
                        }
                    }
                }
                _ => {
                    let (error_type, message, ctx) = classify(keyword, node, error.to_string());
                    let input = raw
                        .pointer(&instance_path)
                        .or_else(|| coerced.pointer(&instance_path))
                        .cloned();
                    errors.push(FieldError::Schema(SchemaViolation {
                        loc: pointer_to_location(&instance_path, coerced),
                        error_type: error_type.to_string(),
                        message,
                        input,
                        ctx,
                    }));
                }
            }
        }
        errors
    }
}

impl FieldDescriptor for SchemaField {
    fn name(&self) -> &str {
        &self.name
    }

    fn alias(&self) -> &str {
        &self.alias
    }

    fn source(&self) -> ParamSource {
        self.source
    }

    fn required(&self) -> bool {
        self.required
    }

    fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    fn accepts_multiple(&self) -> bool {
        self.multiple
    }

    fn embed(&self) -> bool {
        self.embed
    }

    fn nested(&self) -> Option<&NestedModel> {
        self.nested.as_ref()
    }

    fn validate(&self, value: Value) -> Result<Validated, Vec<FieldError>> {
        let mut defaulted = Vec::new();
        let coerced = coerce(value.clone(), &self.schema, "", &mut defaulted);
        let errors = self.violations(&value, &coerced);
        if errors.is_empty() {
            Ok(Validated {
                value: coerced,
                defaulted,
            })
        } else {
            Err(errors)
        }
    }

    fn serialization(&self) -> Serialization<'_> {
        Serialization::Custom(self)
    }
}

impl FieldSerializer for SchemaField {
    fn serialize(&self, validated: &Validated, options: &SerializeOptions) -> Value {
        let mut value = validated.value.clone();
        if options.exclude_defaults {
            prune_schema_defaults(&mut value, &self.schema);
        }
        apply_options(value, &validated.defaulted, options)
    }
}

/// Builder for [`SchemaField`].
#[derive(Debug, Clone)]
pub struct SchemaFieldBuilder {
    name: String,
    alias: Option<String>,
    source: ParamSource,
    schema: Value,
    required: Option<bool>,
    default: Option<Value>,
    multiple: Option<bool>,
    embed: bool,
}

impl SchemaFieldBuilder {
    pub fn new(name: impl Into<String>, source: ParamSource, schema: Value) -> Self {
        Self {
            name: name.into(),
            alias: None,
            source,
            schema,
            required: None,
            default: None,
            multiple: None,
            embed: false,
        }
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Overrides the default rule (required unless a default exists).
    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    #[must_use]
    pub fn default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Overrides multiplicity; defaults to `schema.type == "array"`.
    #[must_use]
    pub fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = Some(multiple);
        self
    }

    #[must_use]
    pub fn embed(mut self, embed: bool) -> Self {
        self.embed = embed;
        self
    }

    pub fn build(self) -> Result<SchemaField, SchemaError> {
        let validator = compile_schema(&self.schema).map_err(|message| SchemaError {
            field: self.name.clone(),
            message,
        })?;
        Ok(self.finish(Arc::new(validator)))
    }

    /// Like [`build`](Self::build), reusing validators already compiled for
    /// an identical schema document.
    pub fn build_with_cache(self, cache: &ValidatorCache) -> Result<SchemaField, SchemaError> {
        let validator = cache.get_or_compile(&self.schema).map_err(|message| SchemaError {
            field: self.name.clone(),
            message,
        })?;
        Ok(self.finish(validator))
    }

    fn finish(self, validator: Arc<Validator>) -> SchemaField {
        let default = self.default.or_else(|| self.schema.get("default").cloned());
        let required = self.required.unwrap_or(default.is_none());
        let multiple = self
            .multiple
            .unwrap_or_else(|| schema_types(&self.schema).contains(&"array"));
        let nested = if multiple {
            None
        } else {
            derive_nested(&self.schema)
        };
        SchemaField {
            alias: self.alias.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            source: self.source,
            required,
            default,
            multiple,
            embed: self.embed,
            nested,
            schema: Arc::new(self.schema),
            validator,
        }
    }
}

fn schema_types(schema: &Value) -> Vec<&str> {
    match schema.get("type") {
        Some(Value::String(t)) => vec![t.as_str()],
        Some(Value::Array(ts)) => ts.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn derive_nested(schema: &Value) -> Option<NestedModel> {
    if !schema_types(schema).contains(&"object") {
        return None;
    }
    let properties = schema.get("properties")?.as_object()?;
    let fields = properties
        .iter()
        .map(|(alias, property)| {
            let name = property
                .get(FIELD_NAME_EXTENSION)
                .and_then(Value::as_str)
                .unwrap_or(alias);
            SubField::new(name)
                .with_alias(alias.clone())
                .multiple(schema_types(property).contains(&"array"))
        })
        .collect();
    Some(NestedModel {
        fields,
        populate_by_name: schema
            .get(POPULATE_BY_NAME_EXTENSION)
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn parse_lax_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "t" | "y" => Some(true),
        "false" | "0" | "no" | "off" | "f" | "n" => Some(false),
        _ => None,
    }
}

fn coerce_str(s: &str, ty: &str) -> Option<Value> {
    match ty {
        "integer" => s.trim().parse::<i64>().ok().map(Value::from),
        "number" => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        "boolean" => parse_lax_bool(s).map(Value::Bool),
        _ => None,
    }
}

/// Lax-mode conversion of `value` towards `schema`'s declared types.
/// Members filled from defaults are appended to `defaulted` as pointers.
fn coerce(value: Value, schema: &Value, pointer: &str, defaulted: &mut Vec<String>) -> Value {
    let types = schema_types(schema);
    match value {
        Value::String(s) if !types.is_empty() && !types.contains(&"string") => {
            match types.iter().find_map(|ty| coerce_str(&s, ty)) {
                Some(v) => v,
                None => Value::String(s),
            }
        }
        Value::Number(n) if types.contains(&"integer") && !types.contains(&"number") => {
            match n.as_f64() {
                Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                    Value::from(f as i64)
                }
                _ => Value::Number(n),
            }
        }
        Value::Array(items) => match schema.get("items") {
            Some(item_schema) if item_schema.is_object() => Value::Array(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| coerce(item, item_schema, &format!("{pointer}/{i}"), defaulted))
                    .collect(),
            ),
            _ => Value::Array(items),
        },
        Value::Object(mut members) => {
            if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
                for (key, property) in properties {
                    let member_pointer = format!("{}/{}", pointer, escape_pointer(key));
                    match members.remove(key) {
                        Some(member) => {
                            let member = coerce(member, property, &member_pointer, defaulted);
                            members.insert(key.clone(), member);
                        }
                        None => {
                            if let Some(default) = property.get("default") {
                                members.insert(key.clone(), default.clone());
                                defaulted.push(member_pointer);
                            }
                        }
                    }
                }
            }
            Value::Object(members)
        }
        other => other,
    }
}

fn missing_members(node: Option<&Value>, object: Option<&Value>) -> Vec<String> {
    let Some(required) = node.and_then(|n| n.get("required")).and_then(Value::as_array) else {
        return Vec::new();
    };
    let Some(object) = object.and_then(Value::as_object) else {
        return Vec::new();
    };
    required
        .iter()
        .filter_map(Value::as_str)
        .filter(|name| !object.contains_key(*name))
        .map(str::to_string)
        .collect()
}

fn extra_members(node: Option<&Value>, object: Option<&Value>) -> Vec<(String, Value)> {
    let Some(object) = object.and_then(Value::as_object) else {
        return Vec::new();
    };
    let declared = node
        .and_then(|n| n.get("properties"))
        .and_then(Value::as_object);
    object
        .iter()
        .filter(|(key, _)| declared.map_or(true, |props| !props.contains_key(*key)))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn type_error_for(expected: &str) -> (&'static str, &'static str) {
    match expected {
        "integer" => (error_types::INT_TYPE, "integer"),
        "number" => (error_types::FLOAT_TYPE, "number"),
        "string" => (error_types::STRING_TYPE, "string"),
        "boolean" => (error_types::BOOL_TYPE, "boolean"),
        "array" => (error_types::LIST_TYPE, "list"),
        "object" => (error_types::MODEL_TYPE, "object"),
        "null" => (error_types::NONE_REQUIRED, "null"),
        _ => (error_types::VALUE_ERROR, "value"),
    }
}

fn ctx(key: &str, value: Value) -> Option<Map<String, Value>> {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Some(map)
}

/// Maps a failing schema keyword to `(error type, message, ctx)`.
fn classify(
    keyword: &str,
    node: Option<&Value>,
    fallback: String,
) -> (&'static str, String, Option<Map<String, Value>>) {
    let limit = node.and_then(|n| n.get(keyword)).cloned().unwrap_or(Value::Null);
    match keyword {
        "type" => match &limit {
            Value::String(expected) => {
                let (error_type, noun) = type_error_for(expected);
                (error_type, format!("Input should be a valid {noun}"), None)
            }
            _ => (error_types::VALUE_ERROR, fallback, None),
        },
        "minimum" => (
            error_types::GREATER_THAN_EQUAL,
            format!("Input should be greater than or equal to {limit}"),
            ctx("ge", limit),
        ),
        "maximum" => (
            error_types::LESS_THAN_EQUAL,
            format!("Input should be less than or equal to {limit}"),
            ctx("le", limit),
        ),
        "exclusiveMinimum" => (
            error_types::GREATER_THAN,
            format!("Input should be greater than {limit}"),
            ctx("gt", limit),
        ),
        "exclusiveMaximum" => (
            error_types::LESS_THAN,
            format!("Input should be less than {limit}"),
            ctx("lt", limit),
        ),
        "minLength" => (
            error_types::STRING_TOO_SHORT,
            format!("String should have at least {limit} characters"),
            ctx("min_length", limit),
        ),
        "maxLength" => (
            error_types::STRING_TOO_LONG,
            format!("String should have at most {limit} characters"),
            ctx("max_length", limit),
        ),
        "pattern" => (
            error_types::STRING_PATTERN_MISMATCH,
            format!("String should match pattern {limit}"),
            ctx("pattern", limit),
        ),
        "minItems" => (
            error_types::TOO_SHORT,
            format!("List should have at least {limit} items"),
            ctx("min_length", limit),
        ),
        "maxItems" => (
            error_types::TOO_LONG,
            format!("List should have at most {limit} items"),
            ctx("max_length", limit),
        ),
        "enum" => (
            error_types::ENUM,
            format!("Input should be one of {limit}"),
            ctx("expected", limit),
        ),
        "const" => (
            error_types::LITERAL_ERROR,
            format!("Input should be {limit}"),
            ctx("expected", limit),
        ),
        _ => (error_types::VALUE_ERROR, fallback, None),
    }
}

/// Removes object members whose value equals the schema default.
fn prune_schema_defaults(value: &mut Value, schema: &Value) {
    match value {
        Value::Object(members) => {
            let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
                return;
            };
            for (key, property) in properties {
                let is_default = match (members.get(key), property.get("default")) {
                    (Some(current), Some(default)) => current == default,
                    _ => false,
                };
                if is_default {
                    members.remove(key);
                } else if let Some(member) = members.get_mut(key) {
                    prune_schema_defaults(member, property);
                }
            }
        }
        Value::Array(items) => {
            if let Some(item_schema) = schema.get("items") {
                for item in items.iter_mut() {
                    prune_schema_defaults(item, item_schema);
                }
            }
        }
        _ => {}
    }
}
