//! Request parameters and per-call field configuration.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::condition::decode_filter_param;
use crate::error::ValidationError;

/// Free-text search parameter.
pub const SEARCH_PARAM: &str = "search";
/// Comma-separated ordering parameter.
pub const ORDERING_PARAM: &str = "ordering";
/// JSON condition tree parameter.
pub const FILTER_PARAM: &str = "filter";
pub const PAGE_PARAM: &str = "page";
pub const PAGE_SIZE_PARAM: &str = "page_size";

/// Keys never treated as field filters.
pub const RESERVED_PARAMS: &[&str] = &[
    SEARCH_PARAM,
    ORDERING_PARAM,
    FILTER_PARAM,
    PAGE_PARAM,
    PAGE_SIZE_PARAM,
];

/// Returns true if `key` is a reserved parameter.
pub fn is_reserved(key: &str) -> bool {
    RESERVED_PARAMS.contains(&key)
}

/// Ordered request parameters. Repeated keys keep every value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    pairs: Vec<(String, String)>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a URL query string (`a=1&b=x+y`). A leading `?` is ignored.
    pub fn parse(query: &str) -> Result<Self, ValidationError> {
        let query = query.trim().trim_start_matches('?');
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(query).map_err(|e| ValidationError::MalformedQuery {
                message: e.to_string(),
            })?;
        Ok(Self { pairs })
    }

    /// Appends a parameter.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Appends a parameter, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    /// First value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value of `key`, in request order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The parameters worth persisting, for saved filters.
    ///
    /// Pagination, ordering and the raw advanced filter are left out. The
    /// advanced filter is included decoded under `_advanced_filter` (skipped
    /// if it does not parse) and the ordering under `_ordering`. Repeated keys
    /// become arrays.
    pub fn filter_params(&self) -> Map<String, Value> {
        let mut params = Map::new();

        for (key, value) in self.iter() {
            if is_reserved(key) && key != SEARCH_PARAM {
                continue;
            }
            let value = Value::String(value.to_string());
            match params.get_mut(key) {
                Some(Value::Array(values)) => values.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    params.insert(key.to_string(), value);
                }
            }
        }

        if let Some(raw) = self.get(FILTER_PARAM) {
            match decode_filter_param(raw) {
                Ok(tree) => {
                    params.insert("_advanced_filter".to_string(), tree);
                }
                Err(e) => tracing::warn!(error = %e, "failed to parse advanced filter"),
            }
        }

        if let Some(ordering) = self.get(ORDERING_PARAM) {
            params.insert("_ordering".to_string(), Value::String(ordering.to_string()));
        }

        params
    }

    /// Re-encodes the non-empty parameters as a query string.
    pub fn to_query_string(&self) -> String {
        let pairs: Vec<(&str, &str)> = self.iter().filter(|(_, v)| !v.is_empty()).collect();
        serde_urlencoded::to_string(pairs).unwrap_or_default()
    }
}

impl<K, V> FromIterator<(K, V)> for RequestParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Per-call restriction of the filterable and searchable fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    /// Fields open for filtering. `None` means every filterable field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_fields: Option<Vec<String>>,

    /// Fields searched in addition to those marked searchable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search_fields: Vec<String>,

    /// Fields removed from both filtering and search.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_fields: Vec<String>,
}

impl FilterConfig {
    pub fn filter_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn exclude_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Every field name the configuration mentions.
    pub(crate) fn mentioned_fields(&self) -> impl Iterator<Item = &str> {
        self.filter_fields
            .iter()
            .flatten()
            .chain(&self.search_fields)
            .chain(&self.exclude_fields)
            .map(String::as_str)
    }

    pub(crate) fn excluded(&self) -> HashSet<&str> {
        self.exclude_fields.iter().map(String::as_str).collect()
    }
}
