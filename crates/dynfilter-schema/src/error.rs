//! Error types for schema loading and validation.

use std::fmt;

/// Errors that can occur while loading or validating a schema catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The catalog file could not be read.
    Io { path: String, message: String },
    /// The catalog source could not be parsed.
    Parse { format: String, message: String },
    /// Two models share a name.
    DuplicateModel { model: String },
    /// Two fields on the same model share a name.
    DuplicateField { model: String, field: String },
    /// A relation field does not name its related model.
    MissingRelatedModel { model: String, field: String },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::Io { path, message } => {
                write!(f, "failed to read schema file '{}': {}", path, message)
            }
            SchemaError::Parse { format, message } => {
                write!(f, "invalid {} schema: {}", format, message)
            }
            SchemaError::DuplicateModel { model } => {
                write!(f, "model '{}' is declared more than once", model)
            }
            SchemaError::DuplicateField { model, field } => {
                write!(f, "field '{}' is declared more than once on '{}'", field, model)
            }
            SchemaError::MissingRelatedModel { model, field } => write!(
                f,
                "relation field '{}.{}' does not declare related_model",
                model, field
            ),
        }
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
