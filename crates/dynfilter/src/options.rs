//! Compilation options.

use serde::{Deserialize, Serialize};

use crate::policy::UnknownTypePolicy;

/// Default maximum nesting of a condition tree.
pub const DEFAULT_MAX_DEPTH: usize = 20;

/// Default maximum size of the advanced filter parameter (64 KiB).
pub const DEFAULT_MAX_FILTER_BYTES: usize = 64 * 1024;

/// How `_min` / `_max` parameters on a field without range support are
/// treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePolicy {
    /// Skip the parameter.
    #[default]
    Ignore,
    /// Reject the request.
    Reject,
}

/// Tunables for one [`FilterSet`](crate::FilterSet).
///
/// Every field has a default, so an empty TOML table or JSON object is a
/// valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterOptions {
    /// Maximum nesting depth of the advanced filter tree.
    pub max_depth: usize,
    /// Maximum size in bytes of the raw `filter` parameter.
    pub max_filter_bytes: usize,
    pub range_policy: RangePolicy,
    pub unknown_type_policy: UnknownTypePolicy,
    /// Ordering applied when the request has no `ordering` parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_ordering: Option<String>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_filter_bytes: DEFAULT_MAX_FILTER_BYTES,
            range_policy: RangePolicy::default(),
            unknown_type_policy: UnknownTypePolicy::default(),
            default_ordering: None,
        }
    }
}

impl FilterOptions {
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_filter_bytes(mut self, max_filter_bytes: usize) -> Self {
        self.max_filter_bytes = max_filter_bytes;
        self
    }

    pub fn range_policy(mut self, range_policy: RangePolicy) -> Self {
        self.range_policy = range_policy;
        self
    }

    pub fn unknown_type_policy(mut self, policy: UnknownTypePolicy) -> Self {
        self.unknown_type_policy = policy;
        self
    }

    pub fn default_ordering(mut self, ordering: impl Into<String>) -> Self {
        self.default_ordering = Some(ordering.into());
        self
    }
}
