//! The fields one request may filter, search and order on.

use std::collections::HashSet;

use crate::error::{FilterError, FilterResult};
use crate::registry::{Descriptors, FieldDescriptor};
use crate::request::FilterConfig;
use crate::suggest::find_similar;

/// Descriptors narrowed by a [`FilterConfig`].
///
/// The allowed set is `filter_fields` (or every filterable field) minus
/// `exclude_fields`; the search set is `search_fields` plus every searchable
/// field, minus `exclude_fields`.
#[derive(Debug, Clone)]
pub struct FieldScope<'a> {
    descriptors: &'a Descriptors,
    allowed: HashSet<&'a str>,
    search: Vec<&'a FieldDescriptor>,
}

impl<'a> FieldScope<'a> {
    /// Builds the scope.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` names a field that is not
    /// described.
    pub fn new(descriptors: &'a Descriptors, config: Option<&FilterConfig>) -> FilterResult<Self> {
        let default_config = FilterConfig::default();
        let config = config.unwrap_or(&default_config);

        if let Some(unknown) = config.mentioned_fields().find(|f| !descriptors.contains(f)) {
            return Err(FilterError::configuration(
                unknown,
                format!("not a field of '{}'", descriptors.schema()),
            ));
        }

        let excluded = config.excluded();

        let allowed: HashSet<&'a str> = match &config.filter_fields {
            Some(fields) => fields
                .iter()
                .filter_map(|f| descriptors.get(f))
                .map(|d| d.name.as_str())
                .filter(|name| !excluded.contains(name))
                .collect(),
            None => descriptors
                .iter()
                .filter(|d| d.filterable && !excluded.contains(d.name.as_str()))
                .map(|d| d.name.as_str())
                .collect(),
        };

        let configured: HashSet<&str> = config.search_fields.iter().map(String::as_str).collect();
        let search = descriptors
            .iter()
            .filter(|d| d.searchable || configured.contains(d.name.as_str()))
            .filter(|d| !excluded.contains(d.name.as_str()))
            .collect();

        Ok(Self {
            descriptors,
            allowed,
            search,
        })
    }

    /// Looks up a field of the allowed set.
    pub fn get(&self, name: &str) -> Option<&'a FieldDescriptor> {
        if self.allowed.contains(name) {
            self.descriptors.get(name)
        } else {
            None
        }
    }

    /// Returns true if `name` is described, whether or not it is allowed.
    pub fn is_described(&self, name: &str) -> bool {
        self.descriptors.contains(name)
    }

    /// Fields searched by the `search` parameter, in declaration order.
    pub fn search_fields(&self) -> &[&'a FieldDescriptor] {
        &self.search
    }

    /// Names of the allowed fields, in declaration order.
    pub fn allowed_names(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.descriptors
            .names()
            .filter(move |name| self.allowed.contains(name))
    }

    /// The closest allowed name to a misspelled one.
    pub fn suggest(&self, name: &str) -> Option<String> {
        find_similar(name, self.allowed_names())
    }

    pub fn descriptors(&self) -> &'a Descriptors {
        self.descriptors
    }
}
