//! Request identifiers for pipeline tracing.
//!
//! A caller may correlate its logs with ours by sending `x-request-id`; a
//! value that is not a ULID is replaced rather than propagated.

use crate::params::{RawParams, RawValue};
use http::HeaderValue;
use std::fmt;
use std::str::FromStr;

/// Header carrying a caller-supplied request identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// ULID attached to each pipeline invocation's span and echoed on the
/// response.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(ulid::Ulid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Reuses the first `x-request-id` value in `headers` when it is a ULID,
    /// otherwise generates a fresh one.
    #[must_use]
    pub fn from_headers(headers: &RawParams) -> Self {
        let supplied = match headers.get(REQUEST_ID_HEADER) {
            Some(RawValue::Single(value)) => Some(value.as_str()),
            Some(RawValue::Multi(values)) => values.first().map(String::as_str),
            _ => None,
        };
        supplied
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or_default()
    }

    /// The identifier as a response header value.
    #[must_use]
    pub fn header_value(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.to_string()).ok()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ulid::Ulid::from_string(s).map(RequestId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> RawParams {
        let mut headers = RawParams::headers();
        for (name, value) in pairs {
            headers.append(name.to_string(), value.to_string());
        }
        headers
    }

    #[test]
    fn test_valid_header_is_reused() {
        let id = RequestId::new();
        let text = format!(" {id} ");
        assert_eq!(RequestId::from_headers(&headers(&[("X-Request-ID", &text)])), id);
    }

    #[test]
    fn test_first_of_repeated_headers_wins() {
        let first = RequestId::new();
        let second = RequestId::new();
        let got = RequestId::from_headers(&headers(&[
            ("x-request-id", &first.to_string()),
            ("x-request-id", &second.to_string()),
        ]));
        assert_eq!(got, first);
    }

    #[test]
    fn test_invalid_or_absent_header_generates_new() {
        let invalid = RequestId::from_headers(&headers(&[("x-request-id", "not-a-ulid")]));
        assert_eq!(invalid.to_string().len(), 26);
        assert_ne!(RequestId::from_headers(&RawParams::headers()), invalid);
    }

    #[test]
    fn test_header_value_matches_display() {
        let id = RequestId::new();
        assert_eq!(id.header_value().unwrap().to_str().unwrap(), id.to_string());
    }
}
