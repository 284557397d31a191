//! Request Binder.
//!
//! Resolves every declared field of a route from its source, validates it,
//! and aggregates all failures before reporting. Sources are processed in
//! the fixed order path, query, header, body; errors keep that order.

use crate::body::{extract_body, BodyError, BodyPayload, RawBody};
use crate::error::{normalize_errors, BindError, ErrorRecord, Location, ValidationFailure};
use crate::params::{normalize_multi_params, RawParams, RawValue};
use crate::schema::{DynField, FieldDescriptor, RouteSchema};
use http::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Untyped request data as handed over by the transport layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRequest {
    pub path_args: HashMap<String, String>,
    pub query: RawParams,
    pub headers: RawParams,
    /// Falls back to the `content-type` header when unset.
    pub content_type: Option<String>,
    pub body: RawBody,
}

impl Default for RawRequest {
    fn default() -> Self {
        Self {
            path_args: HashMap::new(),
            query: RawParams::new(),
            headers: RawParams::headers(),
            content_type: None,
            body: RawBody::Empty,
        }
    }
}

impl RawRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a raw request from an `http::Request` and the path arguments
    /// the router extracted.
    pub fn from_http<B: Into<RawBody>>(request: http::Request<B>, path_args: HashMap<String, String>) -> Self {
        let (parts, body) = request.into_parts();
        let content_type = parts
            .headers
            .get(CONTENT_TYPE)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());
        Self {
            path_args,
            query: parts
                .uri
                .query()
                .map(RawParams::parse_query_string)
                .unwrap_or_default(),
            headers: RawParams::from_header_map(&parts.headers),
            content_type,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn with_path_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_args.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_query(mut self, query: &str) -> Self {
        self.query = RawParams::parse_query_string(query);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, content_type: Option<&str>, body: impl Into<RawBody>) -> Self {
        self.content_type = content_type.map(str::to_string);
        self.body = body.into();
        self
    }

    fn effective_content_type(&self) -> Option<String> {
        self.content_type.clone().or_else(|| match self.headers.get(CONTENT_TYPE.as_str()) {
            Some(RawValue::Single(value)) => Some(value.clone()),
            Some(RawValue::Multi(values)) => values.first().cloned(),
            _ => None,
        })
    }
}

/// Outcome of binding: validated values plus every error found.
///
/// `values` holds each field that resolved successfully (validated value or
/// default) even when other fields failed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Binding {
    pub values: Map<String, Value>,
    pub errors: Vec<ErrorRecord>,
    /// Raw body text when the body itself could not be decoded.
    pub body: Option<Value>,
}

impl Binding {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Handler arguments, or the aggregated request-validation failure.
    pub fn into_args(self) -> Result<BoundArgs, BindError> {
        if self.errors.is_empty() {
            Ok(BoundArgs(self.values))
        } else {
            Err(ValidationFailure::request(self.errors, self.body).into())
        }
    }
}

/// Validated handler arguments keyed by field name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundArgs(Map<String, Value>);

impl BoundArgs {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Deserializes one argument. An absent argument deserializes from
    /// `null`, so `Option<T>` targets yield `None`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, serde_json::Error> {
        T::deserialize(self.0.get(name).unwrap_or(&Value::Null))
    }

    /// Deserializes all arguments into the handler's own parameter struct.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.0))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for BoundArgs {
    fn from(values: Map<String, Value>) -> Self {
        Self(values)
    }
}

/// Stateless request binder; one instance can serve every route.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestBinder;

impl RequestBinder {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Binds `request` against `route`.
    ///
    /// Field-level failures, including a body that is not valid JSON, are
    /// collected into [`Binding::errors`]. Only an unsupported content type
    /// aborts binding with an error.
    pub fn bind(&self, route: &RouteSchema, request: RawRequest) -> Result<Binding, BindError> {
        debug!(handler = %route.handler_name, "binding request");
        let content_type = request.effective_content_type();
        let RawRequest {
            path_args,
            query,
            headers,
            body,
            ..
        } = request;
        let mut binding = Binding::default();

        for field in &route.path_params {
            let raw = path_args
                .get(field.alias())
                .map(|value| RawValue::Single(value.clone()).normalize_for(field.shape()));
            resolve(field.as_ref(), raw, Location::field("path", field.alias()), &mut binding);
        }

        bind_multi_params(&route.query_params, query, "query", &mut binding);
        bind_multi_params(&route.header_params, headers, "header", &mut binding);

        if !route.body_params.is_empty() {
            match extract_body(content_type.as_deref(), body) {
                Ok(payload) => bind_body(route, payload, &mut binding),
                Err(BodyError::Invalid { record, raw }) => {
                    binding.errors.push(record);
                    binding.body = raw.map(Value::String);
                }
                Err(BodyError::UnsupportedMediaType { content_type }) => {
                    warn!(
                        handler = %route.handler_name,
                        content_type = %content_type,
                        "unsupported request media type"
                    );
                    return Err(BindError::UnsupportedMediaType { content_type });
                }
            }
        }

        if binding.is_valid() {
            info!(
                handler = %route.handler_name,
                values = binding.values.len(),
                "request bound"
            );
        } else {
            let locations: Vec<String> = binding.errors.iter().map(|e| e.loc.to_string()).collect();
            warn!(
                handler = %route.handler_name,
                error_count = binding.errors.len(),
                locations = ?locations,
                "request validation failed"
            );
        }
        Ok(binding)
    }
}

fn bind_multi_params(fields: &[DynField], params: RawParams, source: &str, binding: &mut Binding) {
    if fields.is_empty() {
        return;
    }
    let params = normalize_multi_params(params, fields);
    for field in fields {
        let raw = params.get(field.alias()).cloned();
        resolve(field.as_ref(), raw, Location::field(source, field.alias()), binding);
    }
}

fn bind_body(route: &RouteSchema, payload: Option<BodyPayload>, binding: &mut Binding) {
    if route.body_embed_omitted() {
        if let Some(field) = route.body_params.first() {
            let raw = payload.map(|p| p.into_whole(field.as_ref()).normalize_for(field.shape()));
            let loc: Location = ["body"].into_iter().collect();
            resolve(field.as_ref(), raw, loc, binding);
        }
        return;
    }

    let mut payload = payload;
    for field in &route.body_params {
        let loc = Location::field("body", field.alias());
        let raw = match payload.as_mut().map(|p| p.take_member(field.alias())) {
            None => None,
            Some(Ok(raw)) => raw,
            Some(Err(())) => {
                binding.errors.push(ErrorRecord::missing(loc));
                continue;
            }
        };
        resolve(field.as_ref(), raw.map(|r| r.normalize_for(field.shape())), loc, binding);
    }
}

/// Validates one present value, or applies the missing-field policy.
fn resolve(field: &dyn FieldDescriptor, raw: Option<RawValue>, loc: Location, binding: &mut Binding) {
    let Some(raw) = raw.filter(|value| !value.is_absent()) else {
        if field.required() {
            binding.errors.push(ErrorRecord::missing(loc));
        } else {
            let default = field.default().cloned().unwrap_or(Value::Null);
            binding.values.insert(field.name().to_string(), default);
        }
        return;
    };

    match field.validate(raw.into_json()) {
        Ok(validated) => {
            binding.values.insert(field.name().to_string(), validated.value);
        }
        Err(errors) => binding.errors.extend(normalize_errors(errors, &loc)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ParamSource, SchemaField};
    use serde_json::json;

    fn field(name: &str, source: ParamSource, schema: Value) -> SchemaField {
        SchemaField::builder(name, source, schema).build().unwrap()
    }

    #[test]
    fn test_path_param_coerced() {
        let route = RouteSchema::builder("get_item")
            .param(field("item_id", ParamSource::Path, json!({"type": "integer"})))
            .build();
        let binding = RequestBinder::new()
            .bind(&route, RawRequest::new().with_path_arg("item_id", "7"))
            .unwrap();
        assert!(binding.is_valid());
        assert_eq!(binding.values["item_id"], json!(7));
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let route = RouteSchema::builder("h")
            .param(field("X-Version", ParamSource::Header, json!({"type": "integer"})))
            .build();
        let binding = RequestBinder::new()
            .bind(&route, RawRequest::new().with_header("x-version", "2"))
            .unwrap();
        assert_eq!(binding.values["X-Version"], json!(2));
    }

    #[test]
    fn test_optional_field_uses_default() {
        let route = RouteSchema::builder("h")
            .param(field("limit", ParamSource::Query, json!({"type": "integer", "default": 10})))
            .build();
        let args = RequestBinder::new()
            .bind(&route, RawRequest::new())
            .unwrap()
            .into_args()
            .unwrap();
        assert_eq!(args.get_as::<i64>("limit").unwrap(), 10);
    }

    #[test]
    fn test_body_not_a_mapping_reports_missing_once() {
        let route = RouteSchema::builder("h")
            .param(field("a", ParamSource::Body, json!({"type": "string"})))
            .param(field("b", ParamSource::Body, json!({"type": "string"})))
            .build();
        let binding = RequestBinder::new()
            .bind(&route, RawRequest::new().with_body(None, "[1, 2]"))
            .unwrap();
        let locs: Vec<Value> = binding
            .errors
            .iter()
            .map(|e| serde_json::to_value(&e.loc).unwrap())
            .collect();
        assert_eq!(locs, vec![json!(["body", "a"]), json!(["body", "b"])]);
    }

    #[test]
    fn test_body_ignored_without_body_fields() {
        let route = RouteSchema::builder("h").build();
        let binding = RequestBinder::new()
            .bind(&route, RawRequest::new().with_body(Some("text/plain"), "hi"))
            .unwrap();
        assert!(binding.is_valid());
    }
}
