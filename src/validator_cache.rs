//! # Schema Validator Cache Module
//!
//! Thread-safe cache of compiled JSON Schema validators.
//!
//! Routes are usually declared from a handful of shared schema documents (a
//! `Pet` model used by three operations, an `int` schema used by every paging
//! parameter). Compiling each occurrence separately wastes startup time and
//! memory, so [`SchemaFieldBuilder::build_with_cache`] goes through this
//! cache and identical documents share one [`Validator`].
//!
//! ## Cache Key Structure
//!
//! Keys are the SHA-256 of the schema's canonical JSON text, so two fields
//! declared with structurally equal schemas hit the same entry regardless of
//! which route or source they belong to.
//!
//! ## Thread Safety
//!
//! The cache uses `Arc<RwLock<HashMap>>`: readers proceed concurrently and
//! compilation takes the write lock. Validators are handed out as
//! `Arc<Validator>` and are immutable.
//!
//! ## Configuration
//!
//! The cache can be disabled via `BINDER_SCHEMA_CACHE=off`; every call then
//! compiles a fresh validator.
//!
//! [`SchemaFieldBuilder::build_with_cache`]: crate::schema::SchemaFieldBuilder::build_with_cache

use crate::schema::compile_schema;
use jsonschema::Validator;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Thread-safe cache for compiled JSON Schema validators.
///
/// # Example
///
/// ```rust
/// use route_binder::validator_cache::ValidatorCache;
/// use serde_json::json;
///
/// let cache = ValidatorCache::new(true);
/// let schema = json!({"type": "object", "properties": {"name": {"type": "string"}}});
///
/// let first = cache.get_or_compile(&schema).unwrap();
/// let second = cache.get_or_compile(&schema).unwrap();
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// ```
#[derive(Clone)]
pub struct ValidatorCache {
    cache: Arc<RwLock<HashMap<String, Arc<Validator>>>>,
    enabled: bool,
}

impl std::fmt::Debug for ValidatorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorCache")
            .field("enabled", &self.enabled)
            .field("size", &self.size())
            .finish()
    }
}

impl Default for ValidatorCache {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ValidatorCache {
    pub fn new(enabled: bool) -> Self {
        info!(enabled = enabled, "Initializing JSON Schema validator cache");
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            enabled,
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Cache key for a schema document: hex SHA-256 of its JSON text.
    fn cache_key(schema: &Value) -> String {
        let mut hasher = Sha256::new();
        hasher.update(schema.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Validator>>> {
        self.cache.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Validator>>> {
        self.cache.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get a cached validator or compile and cache a new one.
    ///
    /// Returns the compiler's message when `schema` is not a valid JSON
    /// Schema document. Failed compilations are never cached.
    pub fn get_or_compile(&self, schema: &Value) -> Result<Arc<Validator>, String> {
        if !self.enabled {
            return compile_schema(schema).map(Arc::new);
        }

        let key = Self::cache_key(schema);

        if let Some(validator) = self.read().get(&key) {
            debug!(cache_key = %key, "Schema validator cache hit");
            return Ok(Arc::clone(validator));
        }

        let compiled = match compile_schema(schema) {
            Ok(compiled) => Arc::new(compiled),
            Err(e) => {
                warn!(cache_key = %key, error = %e, "Failed to compile JSON Schema");
                return Err(e);
            }
        };

        let mut cache = self.write();
        // Another thread may have compiled the same document meanwhile.
        if let Some(existing) = cache.get(&key) {
            debug!(cache_key = %key, "Schema validator compiled by another thread");
            return Ok(Arc::clone(existing));
        }
        cache.insert(key.clone(), Arc::clone(&compiled));
        debug!(
            cache_key = %key,
            cache_size = cache.len(),
            "Schema validator compiled and cached"
        );
        Ok(compiled)
    }

    /// Number of validators currently cached.
    #[must_use]
    pub fn size(&self) -> usize {
        self.read().len()
    }

    /// Drops every cached validator. Fields already built keep their own
    /// `Arc` and are unaffected.
    pub fn clear(&self) {
        let mut cache = self.write();
        let dropped = cache.len();
        cache.clear();
        info!(dropped = dropped, "Schema validator cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_enabled() {
        let cache = ValidatorCache::new(true);
        let schema = json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"}
            }
        });

        let validator1 = cache.get_or_compile(&schema).unwrap();
        assert_eq!(cache.size(), 1);

        let validator2 = cache.get_or_compile(&schema).unwrap();
        assert_eq!(cache.size(), 1);

        assert!(Arc::ptr_eq(&validator1, &validator2));
    }

    #[test]
    fn test_cache_disabled() {
        let cache = ValidatorCache::new(false);
        let schema = json!({"type": "integer"});

        let validator1 = cache.get_or_compile(&schema).unwrap();
        let validator2 = cache.get_or_compile(&schema).unwrap();
        assert_eq!(cache.size(), 0);
        assert!(!Arc::ptr_eq(&validator1, &validator2));
    }

    #[test]
    fn test_distinct_schemas_get_distinct_entries() {
        let cache = ValidatorCache::new(true);
        cache.get_or_compile(&json!({"type": "integer"})).unwrap();
        cache.get_or_compile(&json!({"type": "string"})).unwrap();
        cache.get_or_compile(&json!({"type": "integer"})).unwrap();
        assert_eq!(cache.size(), 2);
    }

    #[test]
    fn test_cache_key_is_sha256_hex() {
        let key = ValidatorCache::cache_key(&json!({"type": "integer"}));
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_invalid_schema() {
        let cache = ValidatorCache::new(true);
        let result = cache.get_or_compile(&json!({"type": "invalid_type"}));
        assert!(result.is_err());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_cache_clear() {
        let cache = ValidatorCache::new(true);
        let schema = json!({"type": "object"});
        let before = cache.get_or_compile(&schema).unwrap();
        assert_eq!(cache.size(), 1);

        cache.clear();
        assert_eq!(cache.size(), 0);

        let after = cache.get_or_compile(&schema).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(after.is_valid(&json!({})));
    }
}
