//! Parameter Normalizer.

use super::raw::{RawParams, RawValue};
use crate::schema::{DynField, FieldShape, NestedModel};
use std::collections::BTreeMap;
use tracing::trace;

/// Reshapes a multi-valued query or header map into the shapes `fields`
/// expect.
///
/// Scalar fields get one-element lists unwrapped. Structured fields are
/// assembled from their sub-fields' flat entries into one
/// [`RawValue::Nested`] under the field's alias; the flat entries are
/// removed. A structured field with none of its sub-fields present gets an
/// empty object, so sub-field defaults still apply. Sequence fields and
/// absent scalar keys are left alone. Running the function again on its own
/// output changes nothing.
#[must_use]
pub fn normalize_multi_params(mut params: RawParams, fields: &[DynField]) -> RawParams {
    for field in fields {
        match field.shape() {
            FieldShape::Scalar => {
                if let Some(value) = params.remove(field.alias()) {
                    params.insert(field.alias(), value.normalize_for(FieldShape::Scalar));
                }
            }
            FieldShape::Model => {
                if let Some(model) = field.nested() {
                    assemble_model(&mut params, field.alias(), model);
                }
            }
            FieldShape::Sequence => {}
        }
    }
    params
}

fn assemble_model(params: &mut RawParams, alias: &str, model: &NestedModel) {
    let mut assembled = BTreeMap::new();
    for sub in &model.fields {
        let mut found = params.remove(&sub.alias);
        if found.is_none() && model.populate_by_name && sub.name != sub.alias {
            found = params.remove(&sub.name);
        }
        if let Some(value) = found {
            let shape = if sub.accepts_multiple {
                FieldShape::Sequence
            } else {
                FieldShape::Scalar
            };
            assembled.insert(sub.alias.clone(), value.normalize_for(shape));
        }
    }
    if assembled.is_empty() {
        if !params.contains(alias) {
            params.insert(alias, RawValue::Nested(BTreeMap::new()));
        }
        return;
    }
    trace!(field = alias, members = assembled.len(), "assembled structured parameter");
    params.insert(alias, RawValue::Nested(assembled));
}
