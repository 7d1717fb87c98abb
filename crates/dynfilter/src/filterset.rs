//! The filter orchestrator.
//!
//! A [`FilterSet`] merges every source of filtering for one request into a
//! single [`FilterPlan`]:
//!
//! ```text
//! base AND (flat filters) AND (search1 OR search2 ...) AND (advanced filter)
//! ```
//!
//! It never runs the query itself; [`FilterSet::execute`] hands the plan to a
//! [`QueryEngine`].

use std::fmt;

use serde::Serialize;

use crate::condition::{Compiler, ConditionParser};
use crate::engine::QueryEngine;
use crate::error::{FilterError, FilterResult};
use crate::expr::Expr;
use crate::normalizer::{normalize, OrderingInstruction};
use crate::options::FilterOptions;
use crate::registry::Descriptors;
use crate::request::{FilterConfig, RequestParams, FILTER_PARAM};
use crate::scope::FieldScope;

/// A compiled expression plus the ordering to apply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterPlan {
    pub expression: Expr,
    pub ordering: Vec<OrderingInstruction>,
}

impl fmt::Display for FilterPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression)?;
        if !self.ordering.is_empty() {
            let keys: Vec<String> = self.ordering.iter().map(ToString::to_string).collect();
            write!(f, " ORDER BY {}", keys.join(", "))?;
        }
        Ok(())
    }
}

/// Filters requests against the descriptors of one schema.
///
/// # Example
///
/// ```
/// use dynfilter::prelude::*;
/// use dynfilter_schema::prelude::*;
///
/// let catalog = Catalog::new(vec![Schema::new("product")
///     .with_field(FieldDef::new("name", NativeType::Char))
///     .with_field(FieldDef::new("price", NativeType::Integer))]);
/// let registry = Registry::new(catalog);
/// let descriptors = registry.describe("product").unwrap();
///
/// let params = RequestParams::parse("name=coffee&price_min=10&ordering=-price").unwrap();
/// let plan = FilterSet::new(&descriptors).apply(&params).unwrap();
/// assert_eq!(
///     plan.to_string(),
///     "name__icontains=\"coffee\" AND price__gte=10 ORDER BY -price"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct FilterSet<'a> {
    descriptors: &'a Descriptors,
    config: Option<FilterConfig>,
    options: FilterOptions,
}

impl<'a> FilterSet<'a> {
    pub fn new(descriptors: &'a Descriptors) -> Self {
        Self {
            descriptors,
            config: None,
            options: FilterOptions::default(),
        }
    }

    /// Narrows the fields this request may use.
    pub fn with_config(mut self, config: FilterConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_options(mut self, options: FilterOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    /// Compiles `params` into a plan.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the [`FilterConfig`] names unknown
    /// fields, and a validation error for bad values, a malformed advanced
    /// filter or a rejected range parameter. No partial plan is returned.
    pub fn apply(&self, params: &RequestParams) -> FilterResult<FilterPlan> {
        self.apply_with_base(Expr::Always, params)
    }

    /// Like [`apply`](Self::apply), ANDing `base` (for example a soft-delete
    /// scope) in front of the request's filters.
    pub fn apply_with_base(&self, base: Expr, params: &RequestParams) -> FilterResult<FilterPlan> {
        let scope = FieldScope::new(self.descriptors, self.config.as_ref())?;
        let normalized = normalize(&scope, params, &self.options)?;

        let mut parts = vec![base];
        parts.extend(normalized.filters.into_iter().map(Expr::Predicate));
        if let Some(search) = normalized.search {
            parts.push(Expr::or(search.into_iter().map(Expr::Predicate)));
        }
        if let Some(raw) = params.get(FILTER_PARAM).filter(|raw| !raw.trim().is_empty()) {
            let node = ConditionParser::new(self.options.max_depth, self.options.max_filter_bytes)
                .parse(raw)?;
            let advanced = Compiler::new(&scope)
                .with_max_depth(self.options.max_depth)
                .compile(&node)?;
            parts.push(advanced);
        }

        let plan = FilterPlan {
            expression: Expr::and(parts),
            ordering: normalized.ordering,
        };
        tracing::debug!(schema = self.descriptors.schema(), plan = %plan, "compiled filter");
        Ok(plan)
    }

    /// Compiles `params` and runs the plan on `engine`.
    pub fn execute<E>(&self, engine: &E, params: &RequestParams) -> Result<Vec<E::Row>, E::Error>
    where
        E: QueryEngine,
        E::Error: From<FilterError>,
    {
        let plan = self.apply(params)?;
        engine.execute(&plan.expression, &plan.ordering)
    }
}
