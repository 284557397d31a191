//! # route-binder
//!
//! **route-binder** turns untyped HTTP input into the typed arguments a route
//! declares, and checks what the handler returns against its declared output.
//!
//! ## Overview
//!
//! Path segments, query strings, headers and bodies arrive as strings and
//! lists of strings. A route declares, per source, the fields it expects as
//! [`schema::FieldDescriptor`]s. Binding reshapes each source, validates
//! every field, and reports *all* failures at once with exact locations such
//! as `["query", "limit"]` or `["body", "items", 2, "name"]`.
//!
//! ## Architecture
//!
//! - **[`schema`]** - Field descriptors, the JSON Schema backed [`schema::SchemaField`], route schemas
//! - **[`params`]** - Raw parameter maps and the Parameter Normalizer
//! - **[`body`]** - Body Extractor (JSON and URL-encoded forms)
//! - **[`request`]** - Request Binder
//! - **[`response`]** - Response Binder and the general-purpose encoder
//! - **[`error`]** - Error records, the Error Aggregator, [`BindError`]
//! - **[`wire`]** - Status codes and the `{"detail": [...]}` wire body
//! - **[`pipeline`]** - Request binding, handler call and response binding in one step
//! - **[`validator_cache`]** - Shared compiled-schema cache
//! - **[`config`]** / **[`logging`]** - Environment configuration and tracing setup
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant T as Transport
//!     participant P as ValidationPipeline
//!     participant RB as RequestBinder
//!     participant N as normalize_multi_params
//!     participant B as extract_body
//!     participant H as Handler
//!     participant SB as ResponseBinder
//!
//!     T->>P: RouteSchema + RawRequest
//!     P->>RB: bind()
//!     RB->>RB: path fields
//!     RB->>N: query / header maps
//!     N-->>RB: normalized maps
//!     RB->>B: content type + raw body
//!     B-->>RB: BodyPayload
//!     RB-->>P: Binding { values, errors }
//!     alt errors present
//!         P-->>T: 422 {"detail": [...]}
//!     else
//!         P->>H: BoundArgs
//!         H-->>P: HandlerResponse
//!         P->>SB: handle_response()
//!         SB-->>P: validated JSON body
//!         P-->>T: response
//!     end
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use route_binder::prelude::*;
//! use serde_json::json;
//!
//! let route = RouteSchema::builder("create_user")
//!     .param(SchemaField::builder("limit", ParamSource::Query, json!({"type": "integer", "default": 10})).build()?)
//!     .param(SchemaField::builder("name", ParamSource::Body, json!({"type": "string"})).build()?)
//!     .param(SchemaField::builder("user", ParamSource::Body, json!({"type": "object"})).build()?)
//!     .build();
//!
//! let request = RawRequest::new().with_body(None, r#"{"user": {}}"#);
//! let binding = RequestBinder::new().bind(&route, request)?;
//!
//! assert_eq!(binding.values["limit"], json!(10));
//! assert_eq!(wire_detail(&binding.errors), json!({"detail": [{"loc": ["body", "name"], "type": "missing"}]}));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Configuration
//!
//! [`config::BinderConfig::from_env`] reads `BINDER_RESPONSE_VALIDATION`,
//! `BINDER_RESPONSE_ERROR_STATUS` and `BINDER_SCHEMA_CACHE`;
//! [`logging::LogConfig::from_env`] reads the `BINDER_LOG_*` variables.

pub mod body;
pub mod config;
pub mod error;
pub mod ids;
pub mod logging;
pub mod params;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod schema;
pub mod validator_cache;
pub mod wire;

pub use error::{BindError, ErrorRecord, Location, ValidationFailure, ValidationKind};
pub use pipeline::ValidationPipeline;
pub use request::{Binding, BoundArgs, RawRequest, RequestBinder};
pub use response::{HandlerResponse, Payload, ResponseBinder, ResponseErrorMode, SerializeOptions};
pub use schema::{FieldDescriptor, ParamSource, RouteSchema, SchemaField};

/// Common imports for route declarations and binding.
pub mod prelude {
    pub use crate::body::RawBody;
    pub use crate::error::{BindError, ErrorRecord, ValidationKind, ValidationOrigin};
    pub use crate::params::{RawParams, RawValue};
    pub use crate::pipeline::ValidationPipeline;
    pub use crate::request::{Binding, BoundArgs, RawRequest, RequestBinder};
    pub use crate::response::{HandlerResponse, Payload, ResponseBinder, ResponseErrorMode, SerializeOptions};
    pub use crate::schema::{FieldDescriptor, ParamSource, RouteSchema, SchemaField};
    pub use crate::wire::wire_detail;
}
