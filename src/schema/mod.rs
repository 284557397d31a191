//! Field descriptors and route schemas.
//!
//! [`FieldDescriptor`] is the capability the binders consume. The crate ships
//! one implementation, [`SchemaField`], backed by JSON Schema; hosts with
//! their own model layer can implement the trait directly.

mod field;
mod json_schema;
mod route;
mod types;

pub use field::{FieldDescriptor, FieldSerializer, Serialization, Validated};
pub(crate) use json_schema::compile_schema;
pub use json_schema::{
    SchemaError, SchemaField, SchemaFieldBuilder, FIELD_NAME_EXTENSION, POPULATE_BY_NAME_EXTENSION,
};
pub use route::{DynField, RouteSchema, RouteSchemaBuilder};
pub use types::{FieldShape, NestedModel, ParamSource, SubField};
