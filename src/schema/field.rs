//! The Field Descriptor capability consumed by the binders.

use super::types::{FieldShape, NestedModel, ParamSource};
use crate::error::FieldError;
use crate::response::SerializeOptions;
use serde_json::Value;
use std::fmt;

/// Output of a successful [`FieldDescriptor::validate`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub value: Value,
    /// JSON pointers of object members filled from defaults rather than
    /// supplied by the input. Used by `exclude_unset`.
    pub defaulted: Vec<String>,
}

impl Validated {
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self {
            value,
            defaulted: Vec::new(),
        }
    }
}

/// Schema-specific serialization, implemented by descriptors that know how
/// to render their own validated values.
pub trait FieldSerializer {
    fn serialize(&self, validated: &Validated, options: &SerializeOptions) -> Value;
}

/// How the response binder serializes a validated value.
pub enum Serialization<'a> {
    /// Use the general-purpose encoder.
    Generic,
    /// Use the descriptor's own rules.
    Custom(&'a dyn FieldSerializer),
}

/// A field attached to a route schema.
///
/// Descriptors are shared read-only across concurrent requests and must not
/// carry per-request state.
pub trait FieldDescriptor: Send + Sync + fmt::Debug {
    /// Internal name; key in the handler's values map.
    fn name(&self) -> &str;

    /// Wire name used to look the value up in its source.
    fn alias(&self) -> &str {
        self.name()
    }

    fn source(&self) -> ParamSource;

    fn required(&self) -> bool;

    /// Value used when the field is absent and not required.
    fn default(&self) -> Option<&Value>;

    /// Declared type is a sequence.
    fn accepts_multiple(&self) -> bool;

    /// Body fields only: keep the alias as a wrapping key even when this is
    /// the route's single body field.
    fn embed(&self) -> bool {
        false
    }

    /// Sub-fields when the declared type is a structured model.
    fn nested(&self) -> Option<&NestedModel> {
        None
    }

    fn shape(&self) -> FieldShape {
        if self.accepts_multiple() {
            FieldShape::Sequence
        } else if self.nested().is_some() {
            FieldShape::Model
        } else {
            FieldShape::Scalar
        }
    }

    /// Validates and coerces `value`. Error locations are relative to the
    /// field itself.
    fn validate(&self, value: Value) -> Result<Validated, Vec<FieldError>>;

    fn serialization(&self) -> Serialization<'_> {
        Serialization::Generic
    }
}
