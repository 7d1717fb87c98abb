//! Field descriptor registry.
//!
//! The [`Registry`] introspects the models of a [`Catalog`] and produces one
//! [`FieldDescriptor`] per filterable field: the field's own columns plus,
//! one relation level deep, the columns of related models under
//! `<relation>__<field>`.
//!
//! Descriptor maps are cached per schema name. A map is fully built before it
//! is published, so concurrent readers either see the whole map or build one
//! themselves; the first published map wins and every later call returns the
//! same [`Arc`].
//!
//! # Example
//!
//! ```
//! use dynfilter::registry::Registry;
//! use dynfilter_schema::prelude::*;
//!
//! let catalog = Catalog::new(vec![Schema::new("product")
//!     .with_field(FieldDef::new("name", NativeType::Char))
//!     .with_field(FieldDef::new("price", NativeType::Decimal))]);
//!
//! let registry = Registry::new(catalog);
//! let descriptors = registry.describe("product").unwrap();
//! assert_eq!(descriptors.len(), 2);
//! ```

mod descriptor;
mod extract;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dynfilter_schema::prelude::{Annotation, Catalog, Schema};

use crate::error::{FilterError, FilterResult};
use crate::policy::UnknownTypePolicy;

pub use descriptor::{Descriptors, FieldDescriptor, FieldMetadata, FieldOrigin};
pub use extract::semantic_type_of;

/// Separator between a relation name and a related field.
pub const LOOKUP_SEP: &str = "__";

/// Builds and caches field descriptors for the models of a catalog.
#[derive(Debug)]
pub struct Registry {
    catalog: Catalog,
    unknown_type_policy: UnknownTypePolicy,
    cache: RwLock<HashMap<String, Arc<Descriptors>>>,
}

impl Registry {
    /// Creates a registry over `catalog` with an empty cache.
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            unknown_type_policy: UnknownTypePolicy::default(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Sets how unknown semantic type names (annotation hints) are handled.
    pub fn with_unknown_type_policy(mut self, policy: UnknownTypePolicy) -> Self {
        self.unknown_type_policy = policy;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Returns the descriptors of `schema`, building them on first use.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the schema is unknown, a relation
    /// points at a model missing from the catalog, or a field override is
    /// inconsistent with its semantic type.
    pub fn describe(&self, schema: &str) -> FilterResult<Arc<Descriptors>> {
        if let Some(cached) = self.read_cache().get(schema) {
            return Ok(Arc::clone(cached));
        }

        let built = Arc::new(self.build(schema)?);
        let mut cache = self.write_cache();
        let published = cache.entry(schema.to_string()).or_insert(built);
        tracing::debug!(schema, fields = published.len(), "described schema");
        Ok(Arc::clone(published))
    }

    /// Describes `schema` plus the computed fields of one query.
    ///
    /// The result is not cached. An annotation whose name collides with a
    /// described field is ignored.
    pub fn describe_with_annotations(
        &self,
        schema: &str,
        annotations: &[Annotation],
    ) -> FilterResult<Descriptors> {
        let base = self.describe(schema)?;
        let mut descriptors = (*base).clone();

        for annotation in annotations {
            if base.contains(&annotation.name) {
                tracing::debug!(
                    schema,
                    annotation = %annotation.name,
                    "annotation shadows a field, ignoring"
                );
                continue;
            }
            let semantic_type =
                extract::annotation_type(annotation, &base, self.unknown_type_policy)?;
            let descriptor = extract::build_descriptor(
                annotation.name.clone(),
                annotation.name.clone(),
                semantic_type,
                None,
                FieldOrigin::Annotated,
            )?;
            descriptors.insert(descriptor);
        }

        Ok(descriptors)
    }

    /// Drops all cached descriptor maps.
    pub fn clear_cache(&self) {
        self.write_cache().clear();
    }

    fn build(&self, name: &str) -> FilterResult<Descriptors> {
        let schema = self.schema(name)?;
        let mut descriptors = Descriptors::new(name);

        for field in &schema.fields {
            let descriptor = extract::build_descriptor(
                field.name.clone(),
                field.name.clone(),
                extract::semantic_type_of(field),
                Some(field),
                FieldOrigin::Model,
            )?;
            descriptors.insert(descriptor);
        }

        for relation in schema.fields.iter().filter(|f| f.is_relation()) {
            let Some(target) = relation.related_model.as_deref() else {
                return Err(FilterError::configuration(
                    &relation.name,
                    "relation has no related model",
                ));
            };
            let related = self.catalog.get(target).ok_or_else(|| {
                FilterError::configuration(
                    &relation.name,
                    format!("related model '{}' is not in the catalog", target),
                )
            })?;

            for field in related.fields.iter().filter(|f| !f.is_relation()) {
                let qualified = format!("{}{}{}", relation.name, LOOKUP_SEP, field.name);
                let descriptor = extract::build_descriptor(
                    qualified.clone(),
                    qualified,
                    extract::semantic_type_of(field),
                    Some(field),
                    FieldOrigin::Related {
                        relation: relation.name.clone(),
                    },
                )?;
                if !descriptors.insert(descriptor) {
                    tracing::debug!(schema = name, relation = %relation.name, field = %field.name, "related field name taken");
                }
            }
        }

        Ok(descriptors)
    }

    fn schema(&self, name: &str) -> FilterResult<&Schema> {
        self.catalog
            .get(name)
            .ok_or_else(|| FilterError::configuration(name, "unknown schema"))
    }

    fn read_cache(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Descriptors>>> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Descriptors>>> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }
}
