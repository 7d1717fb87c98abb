//! Compiles a [`ConditionNode`] tree into an [`Expr`].

use serde_json::Value;

use super::ast::{ConditionNode, Operator};
use crate::error::{FilterResult, ValidationError};
use crate::expr::{Expr, Predicate};
use crate::options::DEFAULT_MAX_DEPTH;
use crate::policy::{Lookup, LookupPath};
use crate::registry::FieldDescriptor;
use crate::scope::FieldScope;
use crate::value::{coerce, is_null_literal};

/// Recursive descent compiler over condition trees.
///
/// Validation is strict: unknown fields, lookups outside a field's allowed
/// set and values that do not coerce all fail the whole compilation.
#[derive(Debug)]
pub struct Compiler<'s, 'a> {
    scope: &'s FieldScope<'a>,
    max_depth: usize,
}

impl<'s, 'a> Compiler<'s, 'a> {
    pub fn new(scope: &'s FieldScope<'a>) -> Self {
        Self {
            scope,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Compiles `node` into an expression.
    pub fn compile(&self, node: &ConditionNode) -> FilterResult<Expr> {
        self.compile_node(node, 1)
    }

    fn compile_node(&self, node: &ConditionNode, depth: usize) -> FilterResult<Expr> {
        if depth > self.max_depth {
            return Err(ValidationError::DepthExceeded {
                max_depth: self.max_depth,
            }
            .into());
        }

        match node {
            ConditionNode::Leaf {
                field,
                lookup,
                value,
            } => self.compile_leaf(field, lookup.as_deref(), value),
            ConditionNode::Composite {
                operator: Operator::Not,
                children,
            } => match children.as_slice() {
                [only] => Ok(Expr::negate(self.compile_node(only, depth + 1)?)),
                _ => Err(ValidationError::NotArity {
                    count: children.len(),
                }
                .into()),
            },
            ConditionNode::Composite { operator, children } => {
                let compiled = children
                    .iter()
                    .map(|child| self.compile_node(child, depth + 1))
                    .collect::<FilterResult<Vec<_>>>()?;
                if *operator == Operator::Or {
                    Ok(Expr::or(compiled))
                } else {
                    Ok(Expr::and(compiled))
                }
            }
        }
    }

    fn compile_leaf(&self, field: &str, lookup: Option<&str>, value: &Value) -> FilterResult<Expr> {
        let descriptor = self
            .scope
            .get(field)
            .ok_or_else(|| ValidationError::unknown_field(field, self.scope.suggest(field)))?;

        let path = resolve_lookup(descriptor, lookup)?;
        let predicate = build_predicate(descriptor, path, value)?;
        Ok(predicate.into())
    }
}

/// Resolves an optional lookup name against a descriptor, strictly.
///
/// `isnull` is accepted on every field.
pub(crate) fn resolve_lookup(
    descriptor: &FieldDescriptor,
    lookup: Option<&str>,
) -> Result<LookupPath, ValidationError> {
    let Some(name) = lookup else {
        return Ok(LookupPath::plain(descriptor.default_lookup));
    };

    let path = LookupPath::parse(name).ok_or_else(|| ValidationError::UnknownLookup {
        lookup: name.to_string(),
    })?;

    if path.lookup == Lookup::IsNull && !path.date_part {
        return Ok(path);
    }
    if !descriptor.allows(&path) {
        return Err(ValidationError::LookupNotAllowed {
            field: descriptor.name.clone(),
            lookup: path.to_string(),
            allowed: descriptor.allowed_names(),
        });
    }
    Ok(path)
}

/// Builds the predicate for one value. A null value becomes `isnull`.
pub(crate) fn build_predicate(
    descriptor: &FieldDescriptor,
    path: LookupPath,
    value: &Value,
) -> Result<Predicate, ValidationError> {
    if path.lookup != Lookup::IsNull && is_null_literal(value) {
        return Ok(Predicate::is_null(&descriptor.path, true));
    }
    let coerced = coerce(descriptor, path, value)?;
    Ok(Predicate::new(&descriptor.path, path, coerced))
}
