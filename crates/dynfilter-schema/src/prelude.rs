//! Prelude module for convenient imports.
//!
//! ```
//! use dynfilter_schema::prelude::*;
//! ```

pub use crate::catalog::{Annotation, AnnotationKind, Catalog, Schema};
pub use crate::error::{Result, SchemaError};
pub use crate::field::{Choice, ChoiceValue, FieldDef, FieldFilterConfig, NativeType};
