use std::fmt;

/// Where a field's raw value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamSource {
    Path,
    Query,
    Header,
    Body,
    /// The handler's return value.
    Response,
}

impl ParamSource {
    /// Root item of error locations for this source.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamSource::Path => "path",
            ParamSource::Query => "query",
            ParamSource::Header => "header",
            ParamSource::Body => "body",
            ParamSource::Response => "response",
        }
    }
}

impl fmt::Display for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shape a raw value must be resolved into before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    /// Single value; one-element lists are unwrapped.
    Scalar,
    /// Sequence-typed; lists are kept, bare values are wrapped.
    Sequence,
    /// Structured parameter assembled from several flat entries.
    Model,
}

/// Sub-field of a structured query/header parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubField {
    pub name: String,
    /// Wire name; tried first during lookup.
    pub alias: String,
    pub accepts_multiple: bool,
}

impl SubField {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            alias: name.clone(),
            name,
            accepts_multiple: false,
        }
    }

    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    #[must_use]
    pub fn multiple(mut self, accepts_multiple: bool) -> Self {
        self.accepts_multiple = accepts_multiple;
        self
    }
}

/// Structured type whose sub-fields are spread over a flat parameter map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NestedModel {
    pub fields: Vec<SubField>,
    /// Allow lookup by plain name when the alias is absent.
    pub populate_by_name: bool,
}
