mod common;

use common::{embedded_body, field};
use http::StatusCode;
use route_binder::config::BinderConfig;
use route_binder::ids::REQUEST_ID_HEADER;
use route_binder::prelude::*;
use serde_json::{json, Value};
use std::cell::Cell;

fn item_route() -> RouteSchema {
    RouteSchema::builder("update_item")
        .param(field("item_id", ParamSource::Path, json!({"type": "integer"})))
        .param(field("verbose", ParamSource::Query, json!({"type": "boolean", "default": false})))
        .param(embedded_body("item", json!({
            "type": "object",
            "properties": {"name": {"type": "string"}, "price": {"type": "number"}},
            "required": ["name"]
        })))
        .returns(field("return", ParamSource::Response, json!({
            "type": "object",
            "properties": {"id": {"type": "integer"}, "name": {"type": "string"}},
            "required": ["id", "name"]
        })))
        .build()
}

fn body_json(response: &http::Response<Vec<u8>>) -> Value {
    serde_json::from_slice(response.body()).unwrap()
}

fn distinct(status: u16) -> BinderConfig {
    BinderConfig {
        response_validation: ResponseErrorMode::Distinct,
        response_error_status: status,
        ..BinderConfig::default()
    }
}

#[test]
fn test_dispatch_success() {
    let request = RawRequest::new()
        .with_path_arg("item_id", "5")
        .with_body(Some("application/json"), r#"{"item": {"name": "lamp", "price": 9.5}}"#);
    let response = ValidationPipeline::default().dispatch(&item_route(), request, |args| {
        assert_eq!(args.get("verbose"), Some(&json!(false)));
        let id: i64 = args.get_as("item_id").unwrap();
        let name = args.get("item").unwrap()["name"].clone();
        HandlerResponse::json(json!({"id": id, "name": name}))
    });
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(&response), json!({"id": 5, "name": "lamp"}));
}

#[test]
fn test_dispatch_request_errors_are_422() {
    let called = Cell::new(false);
    let request = RawRequest::new()
        .with_path_arg("item_id", "x")
        .with_query("verbose=maybe")
        .with_body(Some("application/json"), r#"{"item": {}}"#);
    let response = ValidationPipeline::default().dispatch(&item_route(), request, |_| {
        called.set(true);
        HandlerResponse::json(json!({}))
    });
    assert!(!called.get());
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body_json(&response),
        json!({"detail": [
            {"loc": ["path", "item_id"], "type": "int_type"},
            {"loc": ["query", "verbose"], "type": "bool_type"},
            {"loc": ["body", "item", "name"], "type": "missing"}
        ]})
    );
    assert_eq!(
        response.headers().get(http::header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
}

#[test]
fn test_dispatch_unsupported_media_type() {
    let request = RawRequest::new()
        .with_path_arg("item_id", "1")
        .with_body(Some("text/plain"), "hello");
    let response = ValidationPipeline::default().dispatch(&item_route(), request, |_| {
        HandlerResponse::json(json!({}))
    });
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

fn valid_request() -> RawRequest {
    RawRequest::new()
        .with_path_arg("item_id", "1")
        .with_body(Some("application/json"), r#"{"item": {"name": "a"}}"#)
}

#[test]
fn test_response_failure_in_compat_mode_is_422() {
    let response = ValidationPipeline::default().dispatch(&item_route(), valid_request(), |_| {
        HandlerResponse::json(json!({"id": "nope"}))
    });
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let mut detail = body_json(&response)["detail"].as_array().unwrap().clone();
    detail.sort_by_key(|d| d["type"].as_str().unwrap().to_string());
    assert_eq!(
        detail,
        vec![
            json!({"loc": ["response", "id"], "type": "int_type"}),
            json!({"loc": ["response", "name"], "type": "missing"}),
        ]
    );
}

#[test]
fn test_response_failure_in_distinct_mode_uses_app_status() {
    let response = ValidationPipeline::new(distinct(502)).dispatch(&item_route(), valid_request(), |_| {
        HandlerResponse::json(json!({"id": 1}))
    });
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        body_json(&response),
        json!({"detail": [{"loc": ["response", "name"], "type": "missing"}]})
    );
}

#[test]
fn test_route_status_overrides_app_mode() {
    let route = RouteSchema::builder("strict")
        .returns(field("return", ParamSource::Response, json!({"type": "integer"})))
        .custom_response_validation_http_code(503)
        .build();
    for config in [BinderConfig::default(), distinct(502)] {
        let response = ValidationPipeline::new(config).dispatch(&route, RawRequest::new(), |_| {
            HandlerResponse::json(json!("text"))
        });
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}

#[test]
fn test_opaque_response_without_serializer_is_500() {
    let route = RouteSchema::builder("opaque").build();
    let response = ValidationPipeline::default().dispatch(&route, RawRequest::new(), |_| {
        HandlerResponse::json(Payload::opaque(std::time::Duration::from_secs(1)))
    });
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_request_id_is_echoed() {
    let id = "01ARZ3NDEKTSV4RRFFQ69G5FAV";
    let request = valid_request().with_header("X-Request-Id", id);
    let response = ValidationPipeline::default().dispatch(&item_route(), request, |_| {
        HandlerResponse::json(json!({"id": 1, "name": "a"}))
    });
    assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), id);

    let generated = ValidationPipeline::default().dispatch(&item_route(), valid_request(), |_| {
        HandlerResponse::json(json!({"id": 1, "name": "a"}))
    });
    let value = generated.headers().get(REQUEST_ID_HEADER).unwrap().to_str().unwrap();
    assert_eq!(value.len(), 26);
}

#[test]
fn test_pipeline_shares_validator_cache() {
    let pipeline = ValidationPipeline::default();
    let schema = json!({"type": "integer", "minimum": 1});
    for name in ["page", "per_page"] {
        SchemaField::builder(name, ParamSource::Query, schema.clone())
            .build_with_cache(pipeline.validator_cache())
            .unwrap();
    }
    assert_eq!(pipeline.validator_cache().size(), 1);
}
