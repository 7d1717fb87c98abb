//! Advanced filter condition trees.
//!
//! The `filter` request parameter carries a JSON tree of AND / OR / NOT
//! composites over field comparisons:
//!
//! ```json
//! {"operator": "AND", "conditions": [
//!     {"field": "status", "lookup": "exact", "value": 1},
//!     {"operator": "OR", "conditions": [
//!         {"field": "is_vip", "lookup": "exact", "value": true},
//!         {"field": "is_active", "lookup": "exact", "value": true}
//!     ]}
//! ]}
//! ```
//!
//! [`ConditionParser`] turns the payload into a [`ConditionNode`] tree and
//! [`Compiler`] turns the tree into an [`Expr`](crate::Expr). Unlike flat
//! parameters, every field, lookup and value in the tree is validated
//! strictly and one bad leaf rejects the whole filter.

mod ast;
mod compiler;
mod parser;

pub use ast::{ConditionNode, Operator};
pub use compiler::Compiler;
pub use parser::{decode_filter_param, ConditionParser};

pub(crate) use compiler::{build_predicate, resolve_lookup};
