//! Canonical error records and their locations.
//!
//! Every failure the binders report is reduced to an [`ErrorRecord`]: an
//! ordered [`Location`] (strings for field names, integers for sequence
//! positions), a machine-readable type marker, a human-readable message, the
//! echoed input and optional context.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::fmt;

/// Inline capacity for locations; `("body", "items", 0, "name")` fits.
const INLINE_LOC: usize = 4;

/// Error type markers used by the binders.
pub mod error_types {
    /// Required value absent from its source.
    pub const MISSING: &str = "missing";
    /// Request body is not valid JSON.
    pub const JSON_INVALID: &str = "json_invalid";
    /// Request body is not decodable form data.
    pub const FORM_INVALID: &str = "form_invalid";
    pub const STRING_TYPE: &str = "string_type";
    pub const INT_TYPE: &str = "int_type";
    pub const FLOAT_TYPE: &str = "float_type";
    pub const BOOL_TYPE: &str = "bool_type";
    pub const LIST_TYPE: &str = "list_type";
    pub const MODEL_TYPE: &str = "model_type";
    pub const NONE_REQUIRED: &str = "none_required";
    pub const GREATER_THAN_EQUAL: &str = "greater_than_equal";
    pub const LESS_THAN_EQUAL: &str = "less_than_equal";
    pub const GREATER_THAN: &str = "greater_than";
    pub const LESS_THAN: &str = "less_than";
    pub const STRING_TOO_SHORT: &str = "string_too_short";
    pub const STRING_TOO_LONG: &str = "string_too_long";
    pub const STRING_PATTERN_MISMATCH: &str = "string_pattern_mismatch";
    pub const TOO_SHORT: &str = "too_short";
    pub const TOO_LONG: &str = "too_long";
    pub const ENUM: &str = "enum";
    pub const LITERAL_ERROR: &str = "literal_error";
    pub const EXTRA_FORBIDDEN: &str = "extra_forbidden";
    pub const VALUE_ERROR: &str = "value_error";
}

/// One step of a [`Location`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LocItem {
    /// Field name or source root (`"query"`, `"body"`, ...).
    Field(String),
    /// Position inside a sequence, or a byte offset for JSON syntax errors.
    Index(usize),
}

impl LocItem {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            LocItem::Field(s) => Some(s),
            LocItem::Index(_) => None,
        }
    }

    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            LocItem::Field(_) => None,
            LocItem::Index(i) => Some(*i),
        }
    }
}

impl From<&str> for LocItem {
    fn from(s: &str) -> Self {
        LocItem::Field(s.to_string())
    }
}

impl From<String> for LocItem {
    fn from(s: String) -> Self {
        LocItem::Field(s)
    }
}

impl From<usize> for LocItem {
    fn from(i: usize) -> Self {
        LocItem::Index(i)
    }
}

impl Serialize for LocItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LocItem::Field(s) => serializer.serialize_str(s),
            LocItem::Index(i) => serializer.serialize_u64(*i as u64),
        }
    }
}

impl fmt::Display for LocItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocItem::Field(s) => write!(f, "{s}"),
            LocItem::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Ordered path identifying where in the input an error occurred,
/// e.g. `["body", "name"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Location(SmallVec<[LocItem; INLINE_LOC]>);

impl Location {
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Location of a named field under a source root: `(source, alias)`.
    #[must_use]
    pub fn field(source: &str, alias: &str) -> Self {
        let mut loc = Self::default();
        loc.push(source);
        loc.push(alias);
        loc
    }

    pub fn push(&mut self, item: impl Into<LocItem>) {
        self.0.push(item.into());
    }

    /// Returns a copy of this location with `item` appended.
    #[must_use]
    pub fn child(&self, item: impl Into<LocItem>) -> Self {
        let mut loc = self.clone();
        loc.push(item);
        loc
    }

    /// Returns `prefix` followed by this location.
    #[must_use]
    pub fn prefixed(&self, prefix: &Location) -> Self {
        if prefix.is_empty() {
            return self.clone();
        }
        let mut items: SmallVec<[LocItem; INLINE_LOC]> = prefix.0.clone();
        items.extend(self.0.iter().cloned());
        Self(items)
    }

    #[must_use]
    pub fn items(&self) -> &[LocItem] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<I: Into<LocItem>> FromIterator<I> for Location {
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.as_slice().serialize(serializer)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// A single normalized validation failure.
///
/// `msg` and `input` are kept for in-process diagnostics; the wire format
/// only carries `loc` and `type` (see [`crate::wire`]).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub loc: Location,
    #[serde(rename = "type")]
    pub error_type: String,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctx: Option<Map<String, Value>>,
}

impl ErrorRecord {
    pub fn new(error_type: impl Into<String>, loc: Location, msg: impl Into<String>) -> Self {
        Self {
            loc,
            error_type: error_type.into(),
            msg: msg.into(),
            input: None,
            ctx: None,
        }
    }

    /// A required value was absent.
    #[must_use]
    pub fn missing(loc: Location) -> Self {
        Self::new(error_types::MISSING, loc, "Field required")
    }

    /// The request body could not be decoded as JSON.
    #[must_use]
    pub fn json_invalid(offset: usize, reason: impl Into<String>) -> Self {
        let mut loc = Location::root();
        loc.push("body");
        loc.push(offset);
        Self::new(error_types::JSON_INVALID, loc, "JSON decode error")
            .with_input(Value::Object(Map::new()))
            .with_ctx_value("error", Value::String(reason.into()))
    }

    #[must_use]
    pub fn with_input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    #[must_use]
    pub fn with_ctx_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.ctx.get_or_insert_with(Map::new).insert(key.into(), value);
        self
    }

    /// Prepends `prefix` to this record's location.
    #[must_use]
    pub fn with_loc_prefix(mut self, prefix: &Location) -> Self {
        self.loc = self.loc.prefixed(prefix);
        self
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.loc, self.error_type, self.msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_location_serializes_mixed_items() {
        let loc: Location = vec![LocItem::from("body"), LocItem::from("items"), LocItem::from(2usize)]
            .into_iter()
            .collect();
        assert_eq!(serde_json::to_value(&loc).unwrap(), json!(["body", "items", 2]));
        assert_eq!(loc.to_string(), "body.items.2");
    }

    #[test]
    fn test_prefix_keeps_order() {
        let inner: Location = ["name"].into_iter().collect();
        let prefix = Location::field("body", "user");
        assert_eq!(
            serde_json::to_value(inner.prefixed(&prefix)).unwrap(),
            json!(["body", "user", "name"])
        );
        assert_eq!(inner.prefixed(&Location::root()), inner);
    }

    #[test]
    fn test_json_invalid_record_shape() {
        let rec = ErrorRecord::json_invalid(9, "Expecting value");
        assert_eq!(rec.error_type, "json_invalid");
        assert_eq!(serde_json::to_value(&rec.loc).unwrap(), json!(["body", 9]));
        assert_eq!(rec.input, Some(json!({})));
        assert_eq!(rec.ctx.unwrap().get("error"), Some(&json!("Expecting value")));
    }

    #[test]
    fn test_missing_record() {
        let rec = ErrorRecord::missing(Location::field("query", "limit"));
        assert_eq!(rec.error_type, error_types::MISSING);
        assert_eq!(rec.msg, "Field required");
        assert!(rec.input.is_none());
    }
}
