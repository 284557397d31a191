//! Integration tests for JSON Schema validator caching
//!
//! # Test Coverage
//!
//! - Fields declared with the same schema share one compiled validator
//! - Validation behaves the same with the cache enabled and disabled
//! - Invalid schemas are reported and never cached
//! - `BINDER_SCHEMA_CACHE` turns the cache off

mod common;

use route_binder::config::BinderConfig;
use route_binder::prelude::*;
use route_binder::validator_cache::ValidatorCache;
use serde_json::{json, Value};
use std::sync::Arc;
use std::thread;

fn limit_schema() -> Value {
    json!({"type": "integer", "minimum": 1, "maximum": 100})
}

fn route_with(cache: &ValidatorCache) -> RouteSchema {
    RouteSchema::builder("list")
        .param(
            SchemaField::builder("limit", ParamSource::Query, limit_schema())
                .build_with_cache(cache)
                .unwrap(),
        )
        .param(
            SchemaField::builder("x-page-size", ParamSource::Header, limit_schema())
                .build_with_cache(cache)
                .unwrap(),
        )
        .build()
}

#[test]
fn test_identical_schemas_compile_once() {
    let cache = ValidatorCache::new(true);
    let _route = route_with(&cache);
    assert_eq!(cache.size(), 1);

    let other = json!({"type": "string"});
    SchemaField::builder("q", ParamSource::Query, other)
        .build_with_cache(&cache)
        .unwrap();
    assert_eq!(cache.size(), 2);

    cache.clear();
    assert_eq!(cache.size(), 0);
}

#[test]
fn test_validation_parity_with_and_without_cache() {
    let request = || {
        RawRequest::new()
            .with_query("limit=500")
            .with_header("X-Page-Size", "0")
    };
    let cached = RequestBinder::new()
        .bind(&route_with(&ValidatorCache::new(true)), request())
        .unwrap();
    let uncached = RequestBinder::new()
        .bind(&route_with(&ValidatorCache::new(false)), request())
        .unwrap();

    assert_eq!(
        common::loc_types(&cached.errors),
        vec![
            (json!(["query", "limit"]), "less_than_equal".to_string()),
            (json!(["header", "x-page-size"]), "greater_than_equal".to_string()),
        ]
    );
    assert_eq!(
        common::loc_types(&cached.errors),
        common::loc_types(&uncached.errors)
    );
}

#[test]
fn test_invalid_schema_is_rejected_and_not_cached() {
    let cache = ValidatorCache::new(true);
    let result = SchemaField::builder("bad", ParamSource::Query, json!({"type": 12}))
        .build_with_cache(&cache);
    let err = result.unwrap_err();
    assert_eq!(err.field, "bad");
    assert_eq!(cache.size(), 0);
}

#[test]
fn test_disabled_cache_from_config() {
    let config = BinderConfig::from_lookup(|key| {
        (key == "BINDER_SCHEMA_CACHE").then(|| "off".to_string())
    });
    assert!(!config.schema_cache);
    let cache = config.validator_cache();
    let _route = route_with(&cache);
    assert!(!cache.is_enabled());
    assert_eq!(cache.size(), 0);
}

#[test]
fn test_concurrent_compilation_yields_one_entry() {
    let cache = Arc::new(ValidatorCache::new(true));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get_or_compile(&limit_schema()).is_ok())
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert_eq!(cache.size(), 1);
}
