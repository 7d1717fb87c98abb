//! Field descriptors and the per-schema descriptor map.

use std::collections::HashMap;

use dynfilter_schema::prelude::Choice;
use serde::Serialize;

use crate::policy::{policy_for, Lookup, LookupPath, SemanticType};

/// Where a described field comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldOrigin {
    /// Declared on the described model.
    Model,
    /// Declared on a related model, reached through `relation`.
    Related { relation: String },
    /// Computed by a query annotation.
    Annotated,
}

/// Normalized filtering capabilities of one field.
///
/// Built by the [`Registry`](super::Registry); `allowed_lookups` is never empty
/// and always contains `default_lookup`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Name used in requests.
    pub name: String,
    /// Path handed to the query engine (`customer__email` for related fields).
    pub path: String,
    pub semantic_type: SemanticType,
    pub searchable: bool,
    pub filterable: bool,
    pub allowed_lookups: Vec<Lookup>,
    pub default_lookup: Lookup,
    pub range_filter: bool,
    pub choices: Vec<Choice>,
    pub origin: FieldOrigin,
}

impl FieldDescriptor {
    /// Creates a descriptor with the policy defaults of `semantic_type`.
    pub fn for_type(name: impl Into<String>, semantic_type: SemanticType) -> Self {
        let name = name.into();
        let policy = policy_for(semantic_type);
        Self {
            path: name.clone(),
            name,
            semantic_type,
            searchable: false,
            filterable: true,
            allowed_lookups: policy.allowed_lookups.to_vec(),
            default_lookup: policy.default_lookup,
            range_filter: policy.range_filter,
            choices: Vec::new(),
            origin: FieldOrigin::Model,
        }
    }

    pub fn with_choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = choices;
        self
    }

    pub fn searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    /// Returns true if the lookup path is allowed on this field.
    pub fn allows(&self, path: &LookupPath) -> bool {
        path.is_allowed_by(&self.allowed_lookups)
    }

    /// Allowed lookup names, for error messages and metadata.
    pub fn allowed_names(&self) -> Vec<String> {
        self.allowed_lookups
            .iter()
            .map(|l| l.as_str().to_string())
            .collect()
    }
}

/// Field metadata for API documentation or front-end configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub semantic_type: SemanticType,
    pub filterable: bool,
    pub searchable: bool,
    pub orderable: bool,
    pub lookups: Vec<Lookup>,
    pub default_lookup: Lookup,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub range_filter: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
}

/// All descriptors of one schema, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Descriptors {
    schema: String,
    fields: Vec<FieldDescriptor>,
    index: HashMap<String, usize>,
}

impl Descriptors {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            fields: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Builds a descriptor map from a list, mostly for tests and callers that
    /// describe fields by hand. Later duplicates are ignored.
    pub fn from_fields(
        schema: impl Into<String>,
        fields: impl IntoIterator<Item = FieldDescriptor>,
    ) -> Self {
        let mut descriptors = Self::new(schema);
        for field in fields {
            descriptors.insert(field);
        }
        descriptors
    }

    /// Adds a descriptor unless the name is already taken. Returns whether it
    /// was added.
    pub fn insert(&mut self, field: FieldDescriptor) -> bool {
        if self.index.contains_key(&field.name) {
            return false;
        }
        self.index.insert(field.name.clone(), self.fields.len());
        self.fields.push(field);
        true
    }

    /// Name of the described schema.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Metadata for every filterable field. Names starting with `_` are
    /// internal and left out.
    pub fn filterable_fields(&self) -> Vec<FieldMetadata> {
        self.fields
            .iter()
            .filter(|f| f.filterable && !f.name.starts_with('_'))
            .map(|f| FieldMetadata {
                name: f.name.clone(),
                semantic_type: f.semantic_type,
                filterable: true,
                searchable: f.searchable,
                orderable: true,
                lookups: f.allowed_lookups.clone(),
                default_lookup: f.default_lookup,
                range_filter: f.range_filter,
                choices: if f.semantic_type == SemanticType::Enum {
                    f.choices.clone()
                } else {
                    Vec::new()
                },
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a Descriptors {
    type Item = &'a FieldDescriptor;
    type IntoIter = std::slice::Iter<'a, FieldDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
