//! Body Extractor.
//!
//! Decodes the raw request body according to its declared content type:
//! JSON when the type is absent or `application/json…`, URL-encoded form
//! pairs for `application/x-www-form-urlencoded…`. Anything else is an
//! unsupported media type.

use crate::error::{error_types, ErrorRecord, Location};
use crate::params::{RawParams, RawValue};
use crate::schema::{FieldDescriptor, FieldShape};
use base64::{engine::general_purpose, Engine as _};
use serde_json::error::Category;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

pub const APPLICATION_JSON: &str = "application/json";
pub const APPLICATION_FORM: &str = "application/x-www-form-urlencoded";

/// Request body as delivered by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RawBody {
    #[default]
    Empty,
    Text(String),
    Bytes(Vec<u8>),
    /// Base64 text, as API gateways deliver binary or form bodies.
    Base64(String),
}

impl RawBody {
    fn into_bytes(self) -> Result<Vec<u8>, String> {
        match self {
            RawBody::Empty => Ok(Vec::new()),
            RawBody::Text(text) => Ok(text.into_bytes()),
            RawBody::Bytes(bytes) => Ok(bytes),
            RawBody::Base64(encoded) => general_purpose::STANDARD
                .decode(encoded.trim())
                .map_err(|e| format!("invalid base64 body: {e}")),
        }
    }
}

impl From<&str> for RawBody {
    fn from(text: &str) -> Self {
        RawBody::Text(text.to_string())
    }
}

impl From<String> for RawBody {
    fn from(text: String) -> Self {
        RawBody::Text(text)
    }
}

impl From<Vec<u8>> for RawBody {
    fn from(bytes: Vec<u8>) -> Self {
        RawBody::Bytes(bytes)
    }
}

/// A decoded request body.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyPayload {
    Json(Value),
    /// Every value is still multi-valued; shape is resolved per field.
    Form(RawParams),
}

impl BodyPayload {
    /// Looks up one field's value by alias. `Err` when the body is not a
    /// mapping at all.
    pub(crate) fn take_member(&mut self, alias: &str) -> Result<Option<RawValue>, ()> {
        match self {
            BodyPayload::Json(Value::Object(members)) => Ok(members.remove(alias).map(RawValue::Json)),
            BodyPayload::Json(Value::Null) => Ok(None),
            BodyPayload::Json(_) => Err(()),
            BodyPayload::Form(params) => Ok(params.remove(alias)),
        }
    }

    /// The whole body as the value of `field`, for routes with a single
    /// non-embedded body field. Form entries are resolved against the
    /// field's sub-fields so single values reach scalar members unwrapped.
    pub(crate) fn into_whole(self, field: &dyn FieldDescriptor) -> RawValue {
        match self {
            BodyPayload::Json(value) => RawValue::Json(value),
            BodyPayload::Form(params) => {
                let model = field.nested();
                let members = params
                    .iter()
                    .map(|(key, value)| {
                        let shape = match model.and_then(|m| m.fields.iter().find(|s| s.alias == key)) {
                            Some(sub) if sub.accepts_multiple => FieldShape::Sequence,
                            Some(_) => FieldShape::Scalar,
                            None => FieldShape::Sequence,
                        };
                        (key.to_string(), value.clone().normalize_for(shape))
                    })
                    .collect::<BTreeMap<_, _>>();
                RawValue::Nested(members)
            }
        }
    }
}

/// Why a body could not be decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyError {
    /// Decoding failed; carries the error record and the offending raw text.
    Invalid { record: ErrorRecord, raw: Option<String> },
    UnsupportedMediaType { content_type: String },
}

impl fmt::Display for BodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyError::Invalid { record, .. } => write!(f, "Invalid request body: {}", record),
            BodyError::UnsupportedMediaType { content_type } => {
                write!(f, "Unsupported media type '{}'", content_type)
            }
        }
    }
}

impl std::error::Error for BodyError {}

/// Byte offset of a serde_json syntax error within `raw`. Truncated input
/// is reported at its end.
fn error_offset(raw: &[u8], error: &serde_json::Error) -> usize {
    if error.classify() == Category::Eof {
        return raw.len();
    }
    let line = error.line();
    let column = error.column();
    if line == 0 {
        return 0;
    }
    let line_start: usize = raw
        .split(|b| *b == b'\n')
        .take(line - 1)
        .map(|l| l.len() + 1)
        .sum();
    (line_start + column.saturating_sub(1)).min(raw.len())
}

/// serde_json messages end with " at line X column Y"; the location is
/// reported separately.
fn strip_position(message: &str) -> &str {
    message
        .rfind(" at line ")
        .map_or(message, |idx| &message[..idx])
}

fn form_invalid(reason: impl Into<String>) -> BodyError {
    let mut loc = Location::root();
    loc.push("body");
    BodyError::Invalid {
        record: ErrorRecord::new(error_types::FORM_INVALID, loc, "Form data parsing error")
            .with_input(Value::Object(Map::new()))
            .with_ctx_value("error", Value::String(reason.into())),
        raw: None,
    }
}

fn parse_json(bytes: Vec<u8>) -> Result<Option<BodyPayload>, BodyError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) => Ok(Some(BodyPayload::Json(value))),
        Err(e) => {
            let offset = error_offset(&bytes, &e);
            let message = e.to_string();
            debug!(offset = offset, "JSON body decode failed");
            Err(BodyError::Invalid {
                record: ErrorRecord::json_invalid(offset, strip_position(&message)),
                raw: Some(String::from_utf8_lossy(&bytes).into_owned()),
            })
        }
    }
}

fn parse_form(bytes: Vec<u8>) -> Result<Option<BodyPayload>, BodyError> {
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => return Err(form_invalid(e.to_string())),
    };
    let params = RawParams::from_pairs(
        url::form_urlencoded::parse(text.as_bytes()).map(|(k, v)| (k.into_owned(), v.into_owned())),
    );
    Ok(Some(BodyPayload::Form(params)))
}

/// Decodes `raw` according to `content_type`.
///
/// `Ok(None)` means the request carried no body.
pub fn extract_body(content_type: Option<&str>, raw: RawBody) -> Result<Option<BodyPayload>, BodyError> {
    let content_type: Cow<'_, str> = content_type.map(str::trim).unwrap_or("").into();

    if content_type.is_empty() || content_type.starts_with(APPLICATION_JSON) {
        debug!(content_type = %content_type, "decoding JSON body");
        let bytes = raw.into_bytes().map_err(|reason| BodyError::Invalid {
            record: ErrorRecord::json_invalid(0, reason),
            raw: None,
        })?;
        return parse_json(bytes);
    }

    if content_type.starts_with(APPLICATION_FORM) {
        debug!(content_type = %content_type, "decoding form body");
        let bytes = raw.into_bytes().map_err(form_invalid)?;
        return parse_form(bytes);
    }

    Err(BodyError::UnsupportedMediaType {
        content_type: content_type.into_owned(),
    })
}
