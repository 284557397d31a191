//! General-purpose value to wire-format conversion.

use crate::error::BindError;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Converts values the encoder cannot handle itself. Returns `None` to
/// decline.
pub type CustomSerializer = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Option<Value> + Send + Sync>;

/// A handler's return value before conversion to the wire format.
#[derive(Clone)]
pub enum Payload {
    Value(Value),
    Sequence(Vec<Payload>),
    /// Ordered key/value pairs; later duplicates overwrite earlier ones.
    Mapping(Vec<(String, Payload)>),
    /// Non-finite floats encode as `null`.
    Float(f64),
    /// Encoded as a (lossy) UTF-8 string.
    Bytes(Vec<u8>),
    /// Needs a [`CustomSerializer`].
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Payload::Sequence(items) => f.debug_tuple("Sequence").field(items).finish(),
            Payload::Mapping(pairs) => f.debug_tuple("Mapping").field(pairs).finish(),
            Payload::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Payload::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Payload::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

impl Payload {
    /// Any serde-serializable structured object.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Payload::Value)
    }

    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Payload::Opaque(Arc::new(value))
    }

    /// A body that counts as absent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Value(Value::Null) => true,
            Payload::Value(Value::String(s)) => s.is_empty(),
            Payload::Bytes(b) => b.is_empty(),
            _ => false,
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Value(value)
    }
}

/// Field inclusion and suppression rules applied during serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Keep only these top-level keys.
    pub include: Option<HashSet<String>>,
    /// Drop these top-level keys.
    pub exclude: Option<HashSet<String>>,
    /// Drop members that were filled from defaults instead of supplied.
    pub exclude_unset: bool,
    /// Drop members equal to their schema default.
    pub exclude_defaults: bool,
    pub exclude_none: bool,
}

impl SerializeOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn include<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn exclude<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn exclude_unset(mut self, on: bool) -> Self {
        self.exclude_unset = on;
        self
    }

    #[must_use]
    pub fn exclude_defaults(mut self, on: bool) -> Self {
        self.exclude_defaults = on;
        self
    }

    #[must_use]
    pub fn exclude_none(mut self, on: bool) -> Self {
        self.exclude_none = on;
        self
    }
}

fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

fn remove_pointer(value: &mut Value, pointer: &str) {
    let Some((parent, last)) = pointer.rsplit_once('/') else {
        return;
    };
    if let Some(Value::Object(members)) = value.pointer_mut(parent) {
        members.remove(&unescape(last));
    }
}

fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(members) => {
            members.retain(|_, v| !v.is_null());
            members.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}

fn filter_keys(members: &mut Map<String, Value>, options: &SerializeOptions) {
    if let Some(include) = &options.include {
        members.retain(|k, _| include.contains(k));
    }
    if let Some(exclude) = &options.exclude {
        members.retain(|k, _| !exclude.contains(k));
    }
}

/// Applies `options` to an already encoded value.
///
/// `defaulted` lists the JSON pointers of members filled from defaults;
/// they are removed when `exclude_unset` is set. Key filters apply to the
/// top-level object, or to each object element of a top-level array.
#[must_use]
pub fn apply_options(mut value: Value, defaulted: &[String], options: &SerializeOptions) -> Value {
    if options.exclude_unset && !defaulted.is_empty() {
        let mut pointers: Vec<&String> = defaulted.iter().collect();
        pointers.sort_by_key(|p| std::cmp::Reverse(p.len()));
        for pointer in pointers {
            remove_pointer(&mut value, pointer);
        }
    }
    if options.exclude_none {
        strip_nulls(&mut value);
    }
    if options.include.is_some() || options.exclude.is_some() {
        match &mut value {
            Value::Object(members) => filter_keys(members, options),
            Value::Array(items) => {
                for item in items.iter_mut() {
                    if let Value::Object(members) = item {
                        filter_keys(members, options);
                    }
                }
            }
            _ => {}
        }
    }
    value
}

fn encode(payload: Payload, custom: Option<&CustomSerializer>) -> Result<Value, BindError> {
    Ok(match payload {
        Payload::Value(value) => value,
        Payload::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(|item| encode(item, custom))
                .collect::<Result<_, _>>()?,
        ),
        Payload::Mapping(pairs) => {
            let mut members = Map::new();
            for (key, item) in pairs {
                members.insert(key, encode(item, custom)?);
            }
            Value::Object(members)
        }
        Payload::Float(x) => Number::from_f64(x).map_or(Value::Null, Value::Number),
        Payload::Bytes(bytes) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
        Payload::Opaque(object) => custom
            .and_then(|serializer| serializer(object.as_ref()))
            .ok_or_else(|| BindError::Serialization {
                message: "value is not JSON serializable and no custom serializer handled it".to_string(),
            })?,
    })
}

/// Recursively converts `payload` into a JSON value.
///
/// Opaque values are handed to `custom`; if it is absent or declines, the
/// conversion fails with [`BindError::Serialization`].
pub fn jsonable_encoder(
    payload: Payload,
    options: &SerializeOptions,
    custom: Option<&CustomSerializer>,
) -> Result<Value, BindError> {
    let value = encode(payload, custom)?;
    Ok(apply_options(value, &[], options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Money(i64);

    #[test]
    fn test_encodes_nested_payload() {
        let payload = Payload::Mapping(vec![
            ("ratio".to_string(), Payload::Float(f64::NAN)),
            ("raw".to_string(), Payload::Bytes(b"hi".to_vec())),
            (
                "items".to_string(),
                Payload::Sequence(vec![Payload::Value(json!(1)), Payload::Float(2.5)]),
            ),
        ]);
        let value = jsonable_encoder(payload, &SerializeOptions::default(), None).unwrap();
        assert_eq!(value, json!({"ratio": null, "raw": "hi", "items": [1, 2.5]}));
    }

    #[test]
    fn test_opaque_requires_custom_serializer() {
        let err = jsonable_encoder(Payload::opaque(Money(5)), &SerializeOptions::default(), None).unwrap_err();
        assert!(matches!(err, BindError::Serialization { .. }));

        let custom: CustomSerializer = Arc::new(|any: &(dyn Any + Send + Sync)| any.downcast_ref::<Money>().map(|m| json!(m.0)));
        let value = jsonable_encoder(Payload::opaque(Money(5)), &SerializeOptions::default(), Some(&custom)).unwrap();
        assert_eq!(value, json!(5));
    }

    #[test]
    fn test_apply_options() {
        let value = json!({"a": 1, "b": null, "c": {"d": 2, "e": 3}});
        let defaulted = vec!["/c/e".to_string()];
        let options = SerializeOptions::new()
            .exclude_unset(true)
            .exclude_none(true)
            .exclude(["a"]);
        assert_eq!(apply_options(value, &defaulted, &options), json!({"c": {"d": 2}}));
    }

    #[test]
    fn test_include_applies_per_list_element() {
        let value = json!([{"id": 1, "secret": "x"}, {"id": 2, "secret": "y"}]);
        let options = SerializeOptions::new().include(["id"]);
        assert_eq!(apply_options(value, &[], &options), json!([{"id": 1}, {"id": 2}]));
    }
}
