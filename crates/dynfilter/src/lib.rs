//! Compiles untrusted list-endpoint requests into filter expressions.
//!
//! A request carries flat query parameters (`name=coffee&price_min=10`), an
//! optional free-text `search` term, an `ordering` and an optional advanced
//! `filter` parameter holding a JSON condition tree. Given the schema a host
//! declares with `dynfilter-schema`, this crate:
//!
//! - derives one [`FieldDescriptor`](registry::FieldDescriptor) per field,
//!   cached per schema in a [`Registry`](registry::Registry)
//! - checks every field and lookup against a fixed [lookup policy](policy)
//! - normalizes flat parameters and compiles the condition tree
//! - combines everything into one [`FilterPlan`] for a [`QueryEngine`]
//!
//! # Quick Start
//!
//! ```
//! use dynfilter::prelude::*;
//! use dynfilter_schema::prelude::*;
//!
//! let catalog = Catalog::new(vec![Schema::new("customer")
//!     .with_field(FieldDef::new("status", NativeType::Integer))
//!     .with_field(FieldDef::new("is_vip", NativeType::Boolean))]);
//! let registry = Registry::new(catalog);
//! let descriptors = registry.describe("customer").unwrap();
//!
//! let params = RequestParams::new().with(
//!     "filter",
//!     r#"{"operator": "NOT", "conditions": [{"field": "is_vip", "value": true}]}"#,
//! );
//! let plan = FilterSet::new(&descriptors).apply(&params).unwrap();
//! assert_eq!(plan.expression.to_string(), "NOT is_vip__exact=true");
//! ```

pub mod condition;
pub mod engine;
pub mod error;
pub mod expr;
pub mod filterset;
pub mod normalizer;
pub mod options;
pub mod policy;
pub mod registry;
pub mod request;
pub mod scope;
pub mod value;

mod suggest;

pub use engine::QueryEngine;
pub use error::{FilterError, FilterResult, ValidationError};
pub use expr::{Expr, Predicate};
pub use filterset::{FilterPlan, FilterSet};

/// Prelude module for convenient imports.
///
/// ```
/// use dynfilter::prelude::*;
/// ```
pub mod prelude {
    pub use crate::condition::{ConditionNode, ConditionParser, Operator};
    pub use crate::engine::{DeletedScope, EngineError, MemoryEngine, QueryEngine, SoftDelete};
    pub use crate::error::{FilterError, FilterResult, ValidationError};
    pub use crate::expr::{Expr, Predicate};
    pub use crate::filterset::{FilterPlan, FilterSet};
    pub use crate::normalizer::{Direction, OrderingInstruction};
    pub use crate::options::{FilterOptions, RangePolicy};
    pub use crate::policy::{Lookup, LookupPath, SemanticType, UnknownTypePolicy};
    pub use crate::registry::{Descriptors, FieldDescriptor, FieldMetadata, Registry};
    pub use crate::request::{FilterConfig, RequestParams};
    pub use crate::value::FilterValue;
}
