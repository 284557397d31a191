use super::encoder::{apply_options, jsonable_encoder, CustomSerializer, Payload, SerializeOptions};
use crate::error::{
    normalize_errors, BindError, ErrorRecord, Location, ValidationFailure, ValidationKind, ValidationOrigin,
};
use crate::schema::{RouteSchema, Serialization};
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use serde_json::Value;
use std::fmt;
use tracing::{debug, warn};

/// How a handler-output failure is reported when the route does not set
/// its own response-validation status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseErrorMode {
    /// Reported as a request-validation failure (`kind == Request`,
    /// `origin == Response`). Matches deployments that never distinguished
    /// the two.
    #[default]
    Compat,
    /// Reported as [`ValidationKind::ResponseApp`].
    Distinct,
}

impl ResponseErrorMode {
    /// Parses `compat` / `distinct` (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compat" => Some(ResponseErrorMode::Compat),
            "distinct" => Some(ResponseErrorMode::Distinct),
            _ => None,
        }
    }
}

/// A handler's result on its way back to the transport.
#[derive(Debug, Clone)]
pub struct HandlerResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Option<Payload>,
}

impl HandlerResponse {
    pub fn new(status: StatusCode, body: impl Into<Payload>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Some(body.into()),
        }
    }

    /// `200 OK` with a JSON content type.
    pub fn json(body: impl Into<Payload>) -> Self {
        Self::new(StatusCode::OK, body).with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
    }

    #[must_use]
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: http::header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// No content type, or one starting with `application/json`.
    #[must_use]
    pub fn is_json(&self) -> bool {
        match self.headers.get(CONTENT_TYPE) {
            None => true,
            Some(value) => value
                .to_str()
                .map(|ct| ct.trim().starts_with("application/json"))
                .unwrap_or(false),
        }
    }

    /// The body as JSON, when it is already a plain value.
    #[must_use]
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            Some(Payload::Value(value)) => Some(value),
            _ => None,
        }
    }

    /// Converts to an `http::Response` with a serialized JSON body.
    pub fn into_http(self) -> Result<http::Response<Vec<u8>>, BindError> {
        let is_json = self.is_json();
        let bytes = match self.body {
            None => Vec::new(),
            Some(Payload::Bytes(bytes)) => bytes,
            Some(Payload::Value(Value::String(text))) if !is_json => text.into_bytes(),
            Some(payload) => {
                let value = jsonable_encoder(payload, &SerializeOptions::default(), None)?;
                serde_json::to_vec(&value).map_err(|e| BindError::Serialization {
                    message: e.to_string(),
                })?
            }
        };
        let mut response = http::Response::new(bytes);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        Ok(response)
    }
}

/// Response Binder.
///
/// Validates handler output against the route's return descriptor and
/// serializes it. Holds no per-request state.
#[derive(Clone, Default)]
pub struct ResponseBinder {
    validation_serializer: Option<CustomSerializer>,
    error_mode: ResponseErrorMode,
}

impl fmt::Debug for ResponseBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBinder")
            .field("validation_serializer", &self.validation_serializer.is_some())
            .field("error_mode", &self.error_mode)
            .finish()
    }
}

impl ResponseBinder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializer for values the general encoder cannot handle.
    #[must_use]
    pub fn with_validation_serializer(mut self, serializer: CustomSerializer) -> Self {
        self.validation_serializer = Some(serializer);
        self
    }

    #[must_use]
    pub fn with_error_mode(mut self, mode: ResponseErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    #[must_use]
    pub fn error_mode(&self) -> ResponseErrorMode {
        self.error_mode
    }

    /// Rewrites the body of a JSON response with its validated,
    /// serialized form. Empty and non-JSON bodies pass through.
    pub fn handle_response(&self, route: &RouteSchema, mut response: HandlerResponse) -> Result<HandlerResponse, BindError> {
        let body = match response.body.take() {
            Some(body) if !body.is_empty() && response.is_json() => body,
            other => {
                response.body = other;
                return Ok(response);
            }
        };
        let value = self.serialize_response(route, body, &SerializeOptions::default())?;
        response.body = Some(Payload::Value(value));
        Ok(response)
    }

    /// Validates `payload` against the route's return descriptor, if any,
    /// and serializes it.
    pub fn serialize_response(
        &self,
        route: &RouteSchema,
        payload: Payload,
        options: &SerializeOptions,
    ) -> Result<Value, BindError> {
        let custom = self.validation_serializer.as_ref();
        let Some(field) = route.return_field.as_deref() else {
            return jsonable_encoder(payload, &SerializeOptions::default(), custom);
        };

        let content = jsonable_encoder(payload, &SerializeOptions::default(), custom)?;
        let validated = match field.validate(content.clone()) {
            Ok(validated) => validated,
            Err(errors) => {
                let root: Location = ["response"].into_iter().collect();
                let errors = normalize_errors(errors, &root);
                return Err(self.failure(route, errors, content).into());
            }
        };
        debug!(handler = %route.handler_name, "response validated");

        match field.serialization() {
            Serialization::Custom(serializer) => Ok(serializer.serialize(&validated, options)),
            Serialization::Generic => {
                let value = jsonable_encoder(Payload::Value(validated.value), &SerializeOptions::default(), custom)?;
                Ok(apply_options(value, &validated.defaulted, options))
            }
        }
    }

    /// Route-level status wins over the app-level mode; otherwise the
    /// compatibility mode reports a request-kind failure.
    fn failure(&self, route: &RouteSchema, errors: Vec<ErrorRecord>, body: Value) -> ValidationFailure {
        let kind = if route.custom_response_validation_http_code.is_some() {
            ValidationKind::ResponseRoute
        } else if self.error_mode == ResponseErrorMode::Distinct {
            ValidationKind::ResponseApp
        } else {
            ValidationKind::Request
        };
        warn!(
            handler = %route.handler_name,
            kind = kind.as_str(),
            error_count = errors.len(),
            "response validation failed"
        );
        ValidationFailure {
            kind,
            origin: ValidationOrigin::Response,
            errors,
            body: Some(body),
        }
    }
}
