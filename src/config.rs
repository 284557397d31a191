//! # Binder Configuration Module
//!
//! Environment-variable configuration for the validation pipeline.
//!
//! ## Environment Variables
//!
//! ### `BINDER_RESPONSE_VALIDATION`
//!
//! How handler-output failures are reported on routes without their own
//! response-validation status:
//! - `compat` (default): reported as request-validation failures
//! - `distinct`: reported as app-level response-validation failures
//!
//! ### `BINDER_RESPONSE_ERROR_STATUS`
//!
//! HTTP status for app-level response-validation failures. Decimal,
//! `100..=599`. Default: `500`.
//!
//! ### `BINDER_SCHEMA_CACHE`
//!
//! `on` (default) or `off`. When off, every field compiles its own
//! validator.
//!
//! Unparseable values fall back to the defaults.
//!
//! ## Usage
//!
//! ```rust
//! use route_binder::config::BinderConfig;
//!
//! let config = BinderConfig::from_env();
//! println!("response errors: {:?}", config.response_validation);
//! ```

use crate::response::ResponseErrorMode;
use crate::validator_cache::ValidatorCache;
use std::env;

pub const DEFAULT_RESPONSE_ERROR_STATUS: u16 = 500;

/// Pipeline configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinderConfig {
    pub response_validation: ResponseErrorMode,
    /// Status for `ResponseApp` failures.
    pub response_error_status: u16,
    pub schema_cache: bool,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            response_validation: ResponseErrorMode::Compat,
            response_error_status: DEFAULT_RESPONSE_ERROR_STATUS,
            schema_cache: true,
        }
    }
}

fn parse_status(val: &str) -> Option<u16> {
    val.trim()
        .parse::<u16>()
        .ok()
        .filter(|status| (100..=599).contains(status))
}

fn parse_switch(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Some(true),
        "off" | "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

impl BinderConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let response_validation = lookup("BINDER_RESPONSE_VALIDATION")
            .and_then(|val| ResponseErrorMode::parse(&val))
            .unwrap_or(defaults.response_validation);
        let response_error_status = lookup("BINDER_RESPONSE_ERROR_STATUS")
            .and_then(|val| parse_status(&val))
            .unwrap_or(defaults.response_error_status);
        let schema_cache = lookup("BINDER_SCHEMA_CACHE")
            .and_then(|val| parse_switch(&val))
            .unwrap_or(defaults.schema_cache);
        Self {
            response_validation,
            response_error_status,
            schema_cache,
        }
    }

    /// A validator cache honouring `schema_cache`.
    #[must_use]
    pub fn validator_cache(&self) -> ValidatorCache {
        ValidatorCache::new(self.schema_cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> BinderConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BinderConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config(&[]), BinderConfig::default());
    }

    #[test]
    fn test_reads_all_variables() {
        let cfg = config(&[
            ("BINDER_RESPONSE_VALIDATION", "distinct"),
            ("BINDER_RESPONSE_ERROR_STATUS", "502"),
            ("BINDER_SCHEMA_CACHE", "off"),
        ]);
        assert_eq!(cfg.response_validation, ResponseErrorMode::Distinct);
        assert_eq!(cfg.response_error_status, 502);
        assert!(!cfg.schema_cache);
        assert!(!cfg.validator_cache().is_enabled());
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let cfg = config(&[
            ("BINDER_RESPONSE_VALIDATION", "sometimes"),
            ("BINDER_RESPONSE_ERROR_STATUS", "99"),
            ("BINDER_SCHEMA_CACHE", "maybe"),
        ]);
        assert_eq!(cfg, BinderConfig::default());
    }
}
