use crate::expr::{Expr, Predicate};
use crate::normalizer::OrderingInstruction;
use crate::policy::{Lookup, LookupPath};
use crate::value::FilterValue;

use super::QueryEngine;

/// Field marking a row as deleted.
pub const DEFAULT_DELETED_FLAG: &str = "is_deleted";

/// Which rows a [`SoftDelete`] engine exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletedScope {
    /// Rows whose flag is not set.
    #[default]
    Active,
    WithDeleted,
    OnlyDeleted,
}

impl DeletedScope {
    /// The base expression for this scope over `flag`.
    ///
    /// `Active` is `NOT (flag = true)` so rows without the flag count as
    /// active.
    pub fn expression(self, flag: &str) -> Expr {
        let deleted: Expr = Predicate::new(
            flag,
            LookupPath::plain(Lookup::Exact),
            FilterValue::Bool(true),
        )
        .into();
        match self {
            DeletedScope::Active => Expr::negate(deleted),
            DeletedScope::WithDeleted => Expr::Always,
            DeletedScope::OnlyDeleted => deleted,
        }
    }
}

/// Wraps an engine so every query is ANDed with a deleted-row scope.
#[derive(Debug, Clone)]
pub struct SoftDelete<E> {
    inner: E,
    flag: String,
    scope: DeletedScope,
}

impl<E> SoftDelete<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            flag: DEFAULT_DELETED_FLAG.to_string(),
            scope: DeletedScope::Active,
        }
    }

    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flag = flag.into();
        self
    }

    /// Include deleted rows.
    pub fn all_with_deleted(mut self) -> Self {
        self.scope = DeletedScope::WithDeleted;
        self
    }

    /// Only deleted rows.
    pub fn only_deleted(mut self) -> Self {
        self.scope = DeletedScope::OnlyDeleted;
        self
    }

    pub fn scope(&self) -> DeletedScope {
        self.scope
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// The base expression for the current scope, for use with
    /// [`FilterSet::apply_with_base`](crate::FilterSet::apply_with_base).
    pub fn scope_expression(&self) -> Expr {
        self.scope.expression(&self.flag)
    }
}

impl<E: QueryEngine> QueryEngine for SoftDelete<E> {
    type Row = E::Row;
    type Error = E::Error;

    fn execute(
        &self,
        expression: &Expr,
        ordering: &[OrderingInstruction],
    ) -> Result<Vec<E::Row>, E::Error> {
        let scoped = self.scope_expression().and_with(expression.clone());
        self.inner.execute(&scoped, ordering)
    }
}
