//! Request binding, handler invocation and response binding in one call.

use crate::config::BinderConfig;
use crate::error::BindError;
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::request::{BoundArgs, RawRequest, RequestBinder};
use crate::response::{CustomSerializer, HandlerResponse, ResponseBinder};
use crate::schema::RouteSchema;
use crate::validator_cache::ValidatorCache;
use crate::wire::{error_response, StatusPolicy};
use tracing::{debug, info_span};

/// Runs the Request Binder, the handler, then the Response Binder.
#[derive(Debug, Clone)]
pub struct ValidationPipeline {
    config: BinderConfig,
    request_binder: RequestBinder,
    response_binder: ResponseBinder,
    cache: ValidatorCache,
}

impl Default for ValidationPipeline {
    fn default() -> Self {
        Self::new(BinderConfig::default())
    }
}

impl ValidationPipeline {
    #[must_use]
    pub fn new(config: BinderConfig) -> Self {
        Self {
            config,
            request_binder: RequestBinder::new(),
            response_binder: ResponseBinder::new().with_error_mode(config.response_validation),
            cache: config.validator_cache(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(BinderConfig::from_env())
    }

    #[must_use]
    pub fn with_validation_serializer(mut self, serializer: CustomSerializer) -> Self {
        self.response_binder = self.response_binder.with_validation_serializer(serializer);
        self
    }

    #[must_use]
    pub fn config(&self) -> &BinderConfig {
        &self.config
    }

    /// Cache to pass to [`SchemaFieldBuilder::build_with_cache`] so routes
    /// declared for this pipeline share compiled schemas.
    ///
    /// [`SchemaFieldBuilder::build_with_cache`]: crate::schema::SchemaFieldBuilder::build_with_cache
    #[must_use]
    pub fn validator_cache(&self) -> &ValidatorCache {
        &self.cache
    }

    /// Binds `request`, calls `handler` with the validated arguments, and
    /// validates its response. The handler is not called when binding
    /// fails.
    pub fn invoke<H>(&self, route: &RouteSchema, request: RawRequest, handler: H) -> Result<HandlerResponse, BindError>
    where
        H: FnOnce(BoundArgs) -> HandlerResponse,
    {
        let request_id = RequestId::from_headers(&request.headers);
        self.invoke_traced(route, request, request_id, handler)
    }

    fn invoke_traced<H>(
        &self,
        route: &RouteSchema,
        request: RawRequest,
        request_id: RequestId,
        handler: H,
    ) -> Result<HandlerResponse, BindError>
    where
        H: FnOnce(BoundArgs) -> HandlerResponse,
    {
        let span = info_span!("validation", handler = %route.handler_name, request_id = %request_id);
        let _enter = span.enter();

        let args = self.request_binder.bind(route, request)?.into_args()?;
        debug!(args = args.len(), "invoking handler");
        let response = handler(args);
        self.response_binder.handle_response(route, response)
    }

    /// Like [`invoke`](Self::invoke), turning failures into their HTTP
    /// error responses. Every response carries the `x-request-id` header.
    pub fn dispatch<H>(&self, route: &RouteSchema, request: RawRequest, handler: H) -> http::Response<Vec<u8>>
    where
        H: FnOnce(BoundArgs) -> HandlerResponse,
    {
        let policy = StatusPolicy::for_route(&self.config, route);
        let request_id = RequestId::from_headers(&request.headers);
        let mut response = match self
            .invoke_traced(route, request, request_id, handler)
            .and_then(HandlerResponse::into_http)
        {
            Ok(response) => response,
            Err(error) => error_response(&error, &policy),
        };
        if let Some(value) = request_id.header_value() {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ParamSource, SchemaField};
    use http::StatusCode;
    use serde_json::json;
    use std::cell::Cell;

    fn route() -> RouteSchema {
        RouteSchema::builder("get_item")
            .param(
                SchemaField::builder("item_id", ParamSource::Path, json!({"type": "integer"}))
                    .build()
                    .unwrap(),
            )
            .build()
    }

    #[test]
    fn test_handler_not_called_on_failure() {
        let called = Cell::new(false);
        let response = ValidationPipeline::default().dispatch(
            &route(),
            RawRequest::new().with_path_arg("item_id", "abc"),
            |_| {
                called.set(true);
                HandlerResponse::json(json!({}))
            },
        );
        assert!(!called.get());
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_handler_receives_typed_args() {
        let response = ValidationPipeline::default()
            .invoke(&route(), RawRequest::new().with_path_arg("item_id", "3"), |args| {
                let id: i64 = args.get_as("item_id").unwrap();
                HandlerResponse::json(json!({"id": id}))
            })
            .unwrap();
        assert_eq!(response.json_body(), Some(&json!({"id": 3})));
    }
}
