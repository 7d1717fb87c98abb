//! Models, catalogs and query annotations.
//!
//! A [`Catalog`] is the set of models the compiler may describe. It is usually
//! loaded from a TOML or JSON file:
//!
//! ```toml
//! [[models]]
//! name = "product"
//!
//! [[models.fields]]
//! name = "name"
//! type = "char"
//! filter_config = { searchable = true }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::field::FieldDef;

/// A model and its declared fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Schema {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl Schema {
    /// Creates a model with no fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Adds a field.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Finds a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Checks field name uniqueness and relation targets.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    model: self.name.clone(),
                    field: field.name.clone(),
                });
            }
            if field.is_relation() && field.related_model.is_none() {
                return Err(SchemaError::MissingRelatedModel {
                    model: self.name.clone(),
                    field: field.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// The set of models known to the compiler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    #[serde(default)]
    pub models: Vec<Schema>,
}

impl Catalog {
    pub fn new(models: Vec<Schema>) -> Self {
        Self { models }
    }

    /// Finds a model by name.
    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Returns the model names in declaration order.
    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.name.as_str())
    }

    /// Parses and validates a catalog from TOML.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let catalog: Catalog = toml::from_str(source).map_err(|e| SchemaError::Parse {
            format: "TOML".to_string(),
            message: e.to_string(),
        })?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parses and validates a catalog from JSON.
    pub fn from_json_str(source: &str) -> Result<Self> {
        let catalog: Catalog = serde_json::from_str(source).map_err(|e| SchemaError::Parse {
            format: "JSON".to_string(),
            message: e.to_string(),
        })?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Loads a catalog file. Files ending in `.json` are parsed as JSON,
    /// everything else as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|e| SchemaError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&source)
        } else {
            Self::from_toml_str(&source)
        }
    }

    /// Checks model name uniqueness and validates every model.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for model in &self.models {
            if !seen.insert(model.name.as_str()) {
                return Err(SchemaError::DuplicateModel {
                    model: model.name.clone(),
                });
            }
            model.validate()?;
        }
        Ok(())
    }
}

/// Aggregate or expression that produced an annotated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "function", rename_all = "snake_case")]
pub enum AnnotationKind {
    Concat,
    Sum,
    Avg,
    Count,
    Min { source: String },
    Max { source: String },
    Other,
}

/// A computed field present on one query (for example `order_count`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    #[serde(flatten)]
    pub kind: AnnotationKind,
    /// Explicit semantic type name, overriding the one inferred from `kind`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_type: Option<String>,
}

impl Annotation {
    pub fn new(name: impl Into<String>, kind: AnnotationKind) -> Self {
        Self {
            name: name.into(),
            kind,
            semantic_type: None,
        }
    }

    /// Sets an explicit semantic type name.
    pub fn typed(mut self, semantic_type: impl Into<String>) -> Self {
        self.semantic_type = Some(semantic_type.into());
        self
    }
}
