use super::field::FieldDescriptor;
use super::types::ParamSource;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a field descriptor.
pub type DynField = Arc<dyn FieldDescriptor>;

/// Declared inputs and output of one route.
///
/// Built once when routes are registered and shared read-only across
/// requests.
#[derive(Clone)]
pub struct RouteSchema {
    pub handler_name: String,
    pub path_params: Vec<DynField>,
    pub query_params: Vec<DynField>,
    pub header_params: Vec<DynField>,
    pub body_params: Vec<DynField>,
    pub return_field: Option<DynField>,
    /// Status for response-validation failures raised on this route. When
    /// set, those failures are reported as route-kind errors.
    pub custom_response_validation_http_code: Option<u16>,
}

impl fmt::Debug for RouteSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |fields: &[DynField]| -> Vec<String> {
            fields.iter().map(|field| field.alias().to_string()).collect()
        };
        f.debug_struct("RouteSchema")
            .field("handler_name", &self.handler_name)
            .field("path_params", &names(&self.path_params))
            .field("query_params", &names(&self.query_params))
            .field("header_params", &names(&self.header_params))
            .field("body_params", &names(&self.body_params))
            .field("return_field", &self.return_field.as_ref().map(|f| f.name().to_string()))
            .field(
                "custom_response_validation_http_code",
                &self.custom_response_validation_http_code,
            )
            .finish()
    }
}

impl RouteSchema {
    pub fn builder(handler_name: impl Into<String>) -> RouteSchemaBuilder {
        RouteSchemaBuilder::new(handler_name)
    }

    /// Descriptors declared for `source`, in declaration order.
    #[must_use]
    pub fn fields(&self, source: ParamSource) -> &[DynField] {
        match source {
            ParamSource::Path => &self.path_params,
            ParamSource::Query => &self.query_params,
            ParamSource::Header => &self.header_params,
            ParamSource::Body => &self.body_params,
            ParamSource::Response => self.return_field.as_slice(),
        }
    }

    /// Every request-side descriptor, in binding order.
    pub fn request_fields(&self) -> impl Iterator<Item = &DynField> {
        self.path_params
            .iter()
            .chain(&self.query_params)
            .chain(&self.header_params)
            .chain(&self.body_params)
    }

    /// The whole body maps to one field whose alias is not part of the wire
    /// body.
    #[must_use]
    pub fn body_embed_omitted(&self) -> bool {
        matches!(self.body_params.as_slice(), [only] if !only.embed())
    }
}

/// Builder for [`RouteSchema`].
pub struct RouteSchemaBuilder {
    route: RouteSchema,
}

impl RouteSchemaBuilder {
    pub fn new(handler_name: impl Into<String>) -> Self {
        Self {
            route: RouteSchema {
                handler_name: handler_name.into(),
                path_params: Vec::new(),
                query_params: Vec::new(),
                header_params: Vec::new(),
                body_params: Vec::new(),
                return_field: None,
                custom_response_validation_http_code: None,
            },
        }
    }

    /// Adds a descriptor to the group named by its own `source()`. A
    /// `Response` descriptor becomes the return field.
    #[must_use]
    pub fn param<F: FieldDescriptor + 'static>(self, field: F) -> Self {
        self.param_arc(Arc::new(field))
    }

    #[must_use]
    pub fn param_arc(mut self, field: DynField) -> Self {
        match field.source() {
            ParamSource::Path => self.route.path_params.push(field),
            ParamSource::Query => self.route.query_params.push(field),
            ParamSource::Header => self.route.header_params.push(field),
            ParamSource::Body => self.route.body_params.push(field),
            ParamSource::Response => self.route.return_field = Some(field),
        }
        self
    }

    #[must_use]
    pub fn returns<F: FieldDescriptor + 'static>(mut self, field: F) -> Self {
        self.route.return_field = Some(Arc::new(field));
        self
    }

    #[must_use]
    pub fn custom_response_validation_http_code(mut self, status: u16) -> Self {
        self.route.custom_response_validation_http_code = Some(status);
        self
    }

    #[must_use]
    pub fn build(self) -> RouteSchema {
        self.route
    }
}
