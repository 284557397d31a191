use super::record::ErrorRecord;
use serde_json::Value;
use std::fmt;

/// Which boundary raised a validation failure.
///
/// The boundary layer uses this to choose status code and detail policy, so
/// the distinction is carried end-to-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    /// Caller sent data that does not fit the route's declared inputs.
    Request,
    /// Handler output violated its schema; the app opted into distinct
    /// response errors.
    ResponseApp,
    /// Handler output violated its schema; the route declares its own
    /// response-validation status.
    ResponseRoute,
}

impl ValidationKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationKind::Request => "request",
            ValidationKind::ResponseApp => "response-app",
            ValidationKind::ResponseRoute => "response-route",
        }
    }
}

/// Which data was being validated when the failure was found.
///
/// Differs from [`ValidationKind`] only in compatibility mode, where a
/// handler-output failure is reported with `kind == Request`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOrigin {
    Request,
    Response,
}

/// Aggregated validation failure handed to the boundary layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    pub kind: ValidationKind,
    pub origin: ValidationOrigin,
    pub errors: Vec<ErrorRecord>,
    /// The offending payload: raw request text for body decode failures, or
    /// the handler output for response failures.
    pub body: Option<Value>,
}

impl ValidationFailure {
    #[must_use]
    pub fn request(errors: Vec<ErrorRecord>, body: Option<Value>) -> Self {
        Self {
            kind: ValidationKind::Request,
            origin: ValidationOrigin::Request,
            errors,
            body,
        }
    }

    #[must_use]
    pub fn response(kind: ValidationKind, errors: Vec<ErrorRecord>, body: Option<Value>) -> Self {
        Self {
            kind,
            origin: ValidationOrigin::Response,
            errors,
            body,
        }
    }
}

/// Error returned by the request and response binders.
#[derive(Debug, Clone, PartialEq)]
pub enum BindError {
    /// One or more fields failed validation.
    Validation(ValidationFailure),
    /// The request declared a content type the body extractor cannot decode.
    UnsupportedMediaType {
        content_type: String,
    },
    /// A handler value could not be converted to the wire format.
    Serialization {
        message: String,
    },
}

impl BindError {
    /// The validation failure, if this is one.
    #[must_use]
    pub fn validation(&self) -> Option<&ValidationFailure> {
        match self {
            BindError::Validation(failure) => Some(failure),
            _ => None,
        }
    }

    /// Records carried by a validation failure; empty for other variants.
    #[must_use]
    pub fn errors(&self) -> &[ErrorRecord] {
        match self {
            BindError::Validation(failure) => &failure.errors,
            _ => &[],
        }
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::Validation(failure) => {
                write!(
                    f,
                    "{} validation failed with {} error(s)",
                    failure.kind.as_str(),
                    failure.errors.len()
                )
            }
            BindError::UnsupportedMediaType { content_type } => {
                write!(
                    f,
                    "Unsupported media type '{}': only JSON and URL-encoded form bodies are supported",
                    content_type
                )
            }
            BindError::Serialization { message } => {
                write!(f, "Failed to serialize response: {}", message)
            }
        }
    }
}

impl std::error::Error for BindError {}

impl From<ValidationFailure> for BindError {
    fn from(failure: ValidationFailure) -> Self {
        BindError::Validation(failure)
    }
}
