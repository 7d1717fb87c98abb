//! Error types for descriptor building and filter compilation.

use thiserror::Error;

/// A specialized Result type for filtering operations.
pub type FilterResult<T> = Result<T, FilterError>;

/// Errors that can occur while describing a schema or compiling a request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    /// The schema or a `filter_config` override is inconsistent.
    ///
    /// Detected when descriptors are built; retrying cannot fix it.
    #[error("configuration error on '{field}': {message}")]
    Configuration {
        /// The field (or model) the problem was found on.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// A request was malformed or asked for something it may not use.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A semantic type name with no entry in the lookup policy table.
    #[error("unknown semantic type: {name}")]
    UnknownType {
        /// The unrecognized type name.
        name: String,
    },
}

impl FilterError {
    /// Creates a configuration error.
    pub fn configuration(field: impl Into<String>, message: impl Into<String>) -> Self {
        FilterError::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an unknown type error.
    pub fn unknown_type(name: impl Into<String>) -> Self {
        FilterError::UnknownType { name: name.into() }
    }

    /// Returns true if the error was caused by the request rather than the
    /// schema or the library itself.
    pub fn is_validation(&self) -> bool {
        matches!(self, FilterError::Validation(_))
    }
}

/// Ways a filter request can be rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The field does not exist or is not open for filtering.
    #[error("{}", unknown_field_message(field, suggestion.as_deref()))]
    UnknownField {
        /// The requested field name.
        field: String,
        /// A similarly named field the caller may have meant.
        suggestion: Option<String>,
    },

    /// The lookup is not one the library knows.
    #[error("unknown lookup '{lookup}'")]
    UnknownLookup {
        /// The unrecognized lookup.
        lookup: String,
    },

    /// The lookup exists but is not allowed on this field.
    #[error("lookup '{lookup}' is not allowed on '{field}' (allowed: {})", allowed.join(", "))]
    LookupNotAllowed {
        field: String,
        lookup: String,
        allowed: Vec<String>,
    },

    /// A value could not be converted to the type the lookup expects.
    #[error("invalid value {value} for '{field}__{lookup}': expected {expected}")]
    InvalidValue {
        field: String,
        lookup: String,
        expected: String,
        value: String,
    },

    /// A `_min` / `_max` parameter was used on a field without range support.
    #[error("field '{field}' does not support range filtering")]
    RangeNotSupported { field: String },

    /// A condition node is neither a composite nor a leaf.
    #[error("malformed condition: {message}")]
    MalformedCondition { message: String },

    /// A composite node named an operator other than AND, OR or NOT.
    #[error("unknown operator '{operator}' (expected AND, OR or NOT)")]
    UnknownOperator { operator: String },

    /// A NOT node did not have exactly one child.
    #[error("NOT takes exactly one condition, got {count}")]
    NotArity { count: usize },

    /// The condition tree is nested deeper than allowed.
    #[error("condition tree exceeds the maximum depth of {max_depth}")]
    DepthExceeded { max_depth: usize },

    /// The advanced filter parameter is not valid JSON.
    #[error("filter is not valid JSON: {message}")]
    MalformedJson { message: String },

    /// The advanced filter parameter is larger than allowed.
    #[error("filter is {size} bytes, exceeding the limit of {max} bytes")]
    FilterTooLarge { size: usize, max: usize },

    /// A URL query string could not be decoded.
    #[error("malformed query string: {message}")]
    MalformedQuery { message: String },
}

fn unknown_field_message(field: &str, suggestion: Option<&str>) -> String {
    match suggestion {
        Some(s) => format!("cannot filter on '{}'. Did you mean '{}'?", field, s),
        None => format!("cannot filter on '{}'", field),
    }
}

impl ValidationError {
    /// Creates an unknown field error.
    pub fn unknown_field(field: impl Into<String>, suggestion: Option<String>) -> Self {
        ValidationError::UnknownField {
            field: field.into(),
            suggestion,
        }
    }

    /// Creates a malformed condition error.
    pub fn malformed(message: impl Into<String>) -> Self {
        ValidationError::MalformedCondition {
            message: message.into(),
        }
    }

    /// Creates an invalid value error, rendering the offending value as JSON.
    pub fn invalid_value(
        field: impl Into<String>,
        lookup: impl Into<String>,
        expected: impl Into<String>,
        value: &serde_json::Value,
    ) -> Self {
        ValidationError::InvalidValue {
            field: field.into(),
            lookup: lookup.into(),
            expected: expected.into(),
            value: value.to_string(),
        }
    }
}
