//! Error Aggregator.
//!
//! Descriptors report failures in whatever shape is natural for them: a
//! ready [`ErrorRecord`], a group of errors nested under a sub-location, or a
//! raw JSON Schema violation. [`normalize_errors`]
//! flattens all of them into the canonical record list, relative to a
//! caller-supplied prefix.

use super::record::{ErrorRecord, LocItem, Location};
use serde_json::{Map, Value};

/// A JSON Schema violation before it is turned into an [`ErrorRecord`].
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaViolation {
    /// Location inside the validated value, see [`pointer_to_location`].
    pub loc: Location,
    pub error_type: String,
    pub message: String,
    pub input: Option<Value>,
    pub ctx: Option<Map<String, Value>>,
}

/// Per-field error as produced by a descriptor; locations are relative to
/// the field being validated.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldError {
    Record(ErrorRecord),
    /// Errors reported by an inner field, relative to `loc`.
    Nested { loc: Location, errors: Vec<FieldError> },
    Schema(SchemaViolation),
}

impl From<ErrorRecord> for FieldError {
    fn from(record: ErrorRecord) -> Self {
        FieldError::Record(record)
    }
}

impl From<SchemaViolation> for FieldError {
    fn from(violation: SchemaViolation) -> Self {
        FieldError::Schema(violation)
    }
}

/// Converts a JSON pointer into `instance` into location items.
///
/// A segment is a sequence position only where `instance` holds an array at
/// that point, so an object member named `"42"` stays a field name. Segments
/// past the end of `instance` (a missing member) are field names. `~1` and
/// `~0` escapes are decoded.
#[must_use]
pub fn pointer_to_location(pointer: &str, instance: &Value) -> Location {
    let mut current = Some(instance);
    pointer
        .split('/')
        .skip(1)
        .map(|segment| {
            let segment = segment.replace("~1", "/").replace("~0", "~");
            match current {
                Some(Value::Array(items)) => match segment.parse::<usize>() {
                    Ok(index) => {
                        current = items.get(index);
                        LocItem::Index(index)
                    }
                    Err(_) => {
                        current = None;
                        LocItem::Field(segment)
                    }
                },
                Some(Value::Object(members)) => {
                    current = members.get(&segment);
                    LocItem::Field(segment)
                }
                _ => {
                    current = None;
                    LocItem::Field(segment)
                }
            }
        })
        .collect()
}

/// Flattens heterogeneous field errors into canonical records, prepending
/// `prefix` to every location. Input order is preserved.
#[must_use]
pub fn normalize_errors(errors: Vec<FieldError>, prefix: &Location) -> Vec<ErrorRecord> {
    let mut out = Vec::with_capacity(errors.len());
    collect(errors, prefix, &mut out);
    out
}

fn collect(errors: Vec<FieldError>, prefix: &Location, out: &mut Vec<ErrorRecord>) {
    for error in errors {
        match error {
            FieldError::Record(record) => out.push(record.with_loc_prefix(prefix)),
            FieldError::Nested { loc, errors } => {
                let nested_prefix = loc.prefixed(prefix);
                collect(errors, &nested_prefix, out);
            }
            FieldError::Schema(violation) => {
                out.push(ErrorRecord {
                    loc: violation.loc.prefixed(prefix),
                    error_type: violation.error_type,
                    msg: violation.message,
                    input: violation.input,
                    ctx: violation.ctx,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::error_types;
    use serde_json::json;

    #[test]
    fn test_pointer_to_location() {
        let instance = json!({"items": [{"a/b": 1}]});
        let loc = pointer_to_location("/items/0/a~1b", &instance);
        assert_eq!(serde_json::to_value(&loc).unwrap(), json!(["items", 0, "a/b"]));
        assert!(pointer_to_location("", &instance).is_empty());
    }

    #[test]
    fn test_numeric_member_names_stay_fields() {
        let instance = json!({"scores": {"42": "x"}, "rows": [[0, "y"]]});
        let loc = pointer_to_location("/scores/42", &instance);
        assert_eq!(serde_json::to_value(&loc).unwrap(), json!(["scores", "42"]));
        let loc = pointer_to_location("/rows/0/1", &instance);
        assert_eq!(serde_json::to_value(&loc).unwrap(), json!(["rows", 0, 1]));
        let loc = pointer_to_location("/scores/7", &instance);
        assert_eq!(serde_json::to_value(&loc).unwrap(), json!(["scores", "7"]));
    }

    #[test]
    fn test_normalize_prefixes_every_shape() {
        let errors = vec![
            FieldError::Record(ErrorRecord::missing(Location::root())),
            FieldError::Nested {
                loc: ["address"].into_iter().collect(),
                errors: vec![ErrorRecord::missing(["zip"].into_iter().collect()).into()],
            },
            FieldError::Schema(SchemaViolation {
                loc: ["tags"].into_iter().collect::<Location>().child(1usize),
                error_type: error_types::STRING_TYPE.to_string(),
                message: "Input should be a valid string".to_string(),
                input: Some(json!(3)),
                ctx: None,
            }),
        ];
        let prefix = Location::field("body", "user");
        let records = normalize_errors(errors, &prefix);
        let locs: Vec<Value> = records
            .iter()
            .map(|r| serde_json::to_value(&r.loc).unwrap())
            .collect();
        assert_eq!(
            locs,
            vec![
                json!(["body", "user"]),
                json!(["body", "user", "address", "zip"]),
                json!(["body", "user", "tags", 1]),
            ]
        );
        assert_eq!(records[2].input, Some(json!(3)));
    }
}
