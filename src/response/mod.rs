//! Response Binder and the general-purpose encoder.

mod binder;
mod encoder;

pub use binder::{HandlerResponse, ResponseBinder, ResponseErrorMode};
pub use encoder::{apply_options, jsonable_encoder, CustomSerializer, Payload, SerializeOptions};
