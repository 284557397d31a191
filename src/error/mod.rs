//! Error records, the Error Aggregator, and the binder error type.

mod aggregate;
mod bind;
mod record;

pub use aggregate::{normalize_errors, pointer_to_location, FieldError, SchemaViolation};
pub use bind::{BindError, ValidationFailure, ValidationKind, ValidationOrigin};
pub use record::{error_types, ErrorRecord, LocItem, Location};
