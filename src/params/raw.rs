use crate::schema::FieldShape;
use http::HeaderMap;
use serde_json::{Map, Value};
use std::collections::btree_map::{self, BTreeMap};

/// A raw input value on its way to a field descriptor.
///
/// Multi-valued sources (query strings, headers, form bodies) produce
/// [`RawValue::Multi`] for every entry, even when only one value was sent.
/// That state is deliberately unresolved: only
/// [`normalize_for`](RawValue::normalize_for), given the target field's
/// shape, decides whether it is a scalar or a sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Single(String),
    Multi(Vec<String>),
    /// Structured parameter assembled from flat entries, keyed by sub-field
    /// alias.
    Nested(BTreeMap<String, RawValue>),
    /// Value decoded from a JSON body.
    Json(Value),
}

impl RawValue {
    /// Resolves the scalar-or-sequence state for a field of `shape`.
    ///
    /// One-element lists are unwrapped for scalar and model targets; longer
    /// lists are kept so validation reports a type error instead of
    /// truncating. A bare string is wrapped for sequence targets.
    #[must_use]
    pub fn normalize_for(self, shape: FieldShape) -> RawValue {
        match (shape, self) {
            (FieldShape::Sequence, RawValue::Single(s)) => RawValue::Multi(vec![s]),
            (FieldShape::Sequence, other) => other,
            (_, RawValue::Multi(mut values)) if values.len() == 1 => {
                RawValue::Single(values.remove(0))
            }
            (_, RawValue::Json(Value::Array(mut items))) if items.len() == 1 => {
                RawValue::Json(items.remove(0))
            }
            (_, other) => other,
        }
    }

    /// The value handed to the descriptor's validator.
    #[must_use]
    pub fn into_json(self) -> Value {
        match self {
            RawValue::Single(s) => Value::String(s),
            RawValue::Multi(values) => Value::Array(values.into_iter().map(Value::String).collect()),
            RawValue::Nested(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, value.into_json()))
                    .collect::<Map<String, Value>>(),
            ),
            RawValue::Json(value) => value,
        }
    }

    /// JSON `null` counts as "no value", like an absent key.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, RawValue::Json(Value::Null))
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Single(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Single(value)
    }
}

impl From<Vec<String>> for RawValue {
    fn from(values: Vec<String>) -> Self {
        RawValue::Multi(values)
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        RawValue::Json(value)
    }
}

/// Raw parameter map for one source: wire name to [`RawValue`].
///
/// Created per request and consumed by the request binder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawParams {
    entries: BTreeMap<String, RawValue>,
    /// Header names compare case-insensitively; keys are stored lowercased.
    case_insensitive: bool,
}

impl RawParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups repeated keys into one multi-valued entry each.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            params.append(key.into(), value.into());
        }
        params
    }

    /// Parses an `application/x-www-form-urlencoded` string (a query string
    /// or a form body). Blank values are kept.
    #[must_use]
    pub fn parse_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(
            url::form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned())),
        )
    }

    /// Collects request headers. Repeated headers are grouped and names are
    /// matched case-insensitively on lookup.
    #[must_use]
    pub fn from_header_map(headers: &HeaderMap) -> Self {
        let mut params = Self::headers();
        for (name, value) in headers {
            params.append(
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }
        params
    }

    /// An empty map with header (case-insensitive) key semantics.
    #[must_use]
    pub fn headers() -> Self {
        Self {
            entries: BTreeMap::new(),
            case_insensitive: true,
        }
    }

    fn key(&self, name: &str) -> String {
        if self.case_insensitive {
            name.to_ascii_lowercase()
        } else {
            name.to_string()
        }
    }

    /// Adds one more value under `key`, turning the entry multi-valued.
    pub fn append(&mut self, key: String, value: String) {
        let key = self.key(&key);
        match self.entries.entry(key) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(RawValue::Multi(vec![value]));
            }
            btree_map::Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                let previous = std::mem::replace(entry, RawValue::Multi(Vec::new()));
                *entry = match previous {
                    RawValue::Multi(mut values) => {
                        values.push(value);
                        RawValue::Multi(values)
                    }
                    RawValue::Single(first) => RawValue::Multi(vec![first, value]),
                    _ => RawValue::Multi(vec![value]),
                };
            }
        }
    }

    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<RawValue>) {
        let key = self.key(key.as_ref());
        self.entries.insert(key, value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.entries.get(&self.key(key))
    }

    pub fn remove(&mut self, key: &str) -> Option<RawValue> {
        let key = self.key(key);
        self.entries.remove(&key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(&self.key(key))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The whole map as a JSON object, used for form bodies.
    #[must_use]
    pub fn into_json(self) -> Value {
        Value::Object(
            self.entries
                .into_iter()
                .map(|(key, value)| (key, value.into_json()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}
