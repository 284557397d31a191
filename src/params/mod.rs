//! Raw parameter maps and the Parameter Normalizer.

mod normalize;
mod raw;

pub use normalize::normalize_multi_params;
pub use raw::{RawParams, RawValue};
