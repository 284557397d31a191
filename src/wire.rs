//! Boundary formatting: status codes and the validation-error wire body.
//!
//! The wire body is `{"detail": [{"loc": [...], "type": "..."}]}`. Record
//! messages and echoed input stay in-process.

use crate::config::BinderConfig;
use crate::error::{BindError, ErrorRecord, Location, ValidationKind};
use crate::schema::RouteSchema;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};

/// Component name used in `$ref`s to the record schema.
pub const VALIDATION_ERROR_COMPONENT: &str = "ValidationError";
pub const COMPONENT_REF_PREFIX: &str = "#/components/schemas/";

#[derive(Serialize)]
struct WireRecord<'a> {
    loc: &'a Location,
    #[serde(rename = "type")]
    error_type: &'a str,
}

#[derive(Serialize)]
struct WireBody<'a> {
    detail: Vec<WireRecord<'a>>,
}

fn wire_body(errors: &[ErrorRecord]) -> WireBody<'_> {
    WireBody {
        detail: errors
            .iter()
            .map(|e| WireRecord {
                loc: &e.loc,
                error_type: &e.error_type,
            })
            .collect(),
    }
}

/// The wire form of `errors` as a JSON value.
#[must_use]
pub fn wire_detail(errors: &[ErrorRecord]) -> Value {
    serde_json::to_value(wire_body(errors)).unwrap_or_else(|_| json!({"detail": []}))
}

/// The wire form of `errors` as bytes.
#[must_use]
pub fn wire_detail_bytes(errors: &[ErrorRecord]) -> Vec<u8> {
    serde_json::to_vec(&wire_body(errors)).unwrap_or_else(|_| b"{\"detail\":[]}".to_vec())
}

/// Statuses for response-validation failures, resolved per route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPolicy {
    pub response_app_status: u16,
    pub response_route_status: Option<u16>,
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self {
            response_app_status: crate::config::DEFAULT_RESPONSE_ERROR_STATUS,
            response_route_status: None,
        }
    }
}

impl StatusPolicy {
    #[must_use]
    pub fn for_route(config: &BinderConfig, route: &RouteSchema) -> Self {
        Self {
            response_app_status: config.response_error_status,
            response_route_status: route.custom_response_validation_http_code,
        }
    }
}

fn status(code: u16, fallback: StatusCode) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(fallback)
}

/// HTTP status the boundary layer emits for `error`.
#[must_use]
pub fn status_for(error: &BindError, policy: &StatusPolicy) -> StatusCode {
    match error {
        BindError::Validation(failure) => match failure.kind {
            ValidationKind::Request => StatusCode::UNPROCESSABLE_ENTITY,
            ValidationKind::ResponseApp => status(policy.response_app_status, StatusCode::INTERNAL_SERVER_ERROR),
            ValidationKind::ResponseRoute => policy
                .response_route_status
                .map_or(StatusCode::INTERNAL_SERVER_ERROR, |code| {
                    status(code, StatusCode::INTERNAL_SERVER_ERROR)
                }),
        },
        BindError::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        BindError::Serialization { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Full HTTP response for `error`.
#[must_use]
pub fn error_response(error: &BindError, policy: &StatusPolicy) -> http::Response<Vec<u8>> {
    let body = match error {
        BindError::Validation(failure) => wire_detail_bytes(&failure.errors),
        BindError::UnsupportedMediaType { .. } => {
            serde_json::to_vec(&json!({"detail": "Unsupported Media Type"})).unwrap_or_default()
        }
        BindError::Serialization { .. } => {
            serde_json::to_vec(&json!({"detail": "Internal Server Error"})).unwrap_or_default()
        }
    };
    let mut response = http::Response::new(body);
    *response.status_mut() = status_for(error, policy);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// JSON Schema of one wire record.
#[must_use]
pub fn validation_error_definition() -> Value {
    json!({
        "title": "ValidationError",
        "type": "object",
        "properties": {
            "loc": {
                "title": "Location",
                "type": "array",
                "items": {"anyOf": [{"type": "string"}, {"type": "integer"}]}
            },
            "type": {"title": "Error Type", "type": "string"}
        },
        "required": ["loc", "type"]
    })
}

fn detail_definition(title: &str) -> Value {
    json!({
        "title": title,
        "type": "object",
        "properties": {
            "detail": {
                "title": "Detail",
                "type": "array",
                "items": {"$ref": format!("{COMPONENT_REF_PREFIX}{VALIDATION_ERROR_COMPONENT}")}
            }
        }
    })
}

/// JSON Schema of a request-validation error body.
#[must_use]
pub fn http_validation_error_definition() -> Value {
    detail_definition("HTTPValidationError")
}

/// JSON Schema of a response-validation error body.
#[must_use]
pub fn response_validation_error_definition() -> Value {
    detail_definition("ResponseValidationError")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ValidationFailure, ValidationOrigin};

    fn failure(kind: ValidationKind) -> BindError {
        BindError::Validation(ValidationFailure {
            kind,
            origin: ValidationOrigin::Response,
            errors: vec![ErrorRecord::missing(Location::field("response", "id"))],
            body: None,
        })
    }

    #[test]
    fn test_wire_bytes_exact() {
        let mut loc = Location::field("body", "items");
        loc.push(0usize);
        let errors = vec![
            ErrorRecord::missing(Location::field("query", "limit")),
            ErrorRecord::new("int_type", loc, "Input should be a valid integer"),
        ];
        assert_eq!(
            String::from_utf8(wire_detail_bytes(&errors)).unwrap(),
            r#"{"detail":[{"loc":["query","limit"],"type":"missing"},{"loc":["body","items",0],"type":"int_type"}]}"#
        );
    }

    #[test]
    fn test_status_mapping() {
        let policy = StatusPolicy {
            response_app_status: 500,
            response_route_status: Some(502),
        };
        assert_eq!(status_for(&failure(ValidationKind::Request), &policy), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(&failure(ValidationKind::ResponseApp), &policy), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_for(&failure(ValidationKind::ResponseRoute), &policy), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_for(
                &BindError::UnsupportedMediaType {
                    content_type: "text/xml".into()
                },
                &policy
            ),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }

    #[test]
    fn test_error_response_hides_messages() {
        let response = error_response(&failure(ValidationKind::Request), &StatusPolicy::default());
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body, json!({"detail": [{"loc": ["response", "id"], "type": "missing"}]}));
    }

    #[test]
    fn test_wire_body_matches_definition() {
        let validator = jsonschema::validator_for(&validation_error_definition()).unwrap();
        let body = wire_detail(&[ErrorRecord::missing(Location::field("path", "id"))]);
        for record in body["detail"].as_array().unwrap() {
            assert!(validator.is_valid(record));
        }
    }
}
