//! Semantic type extraction and override validation.

use dynfilter_schema::prelude::{Annotation, AnnotationKind, FieldDef, FieldFilterConfig, NativeType};

use super::descriptor::{Descriptors, FieldDescriptor, FieldOrigin};
use crate::error::{FilterError, FilterResult};
use crate::policy::{policy_for, policy_for_name, Lookup, SemanticType, UnknownTypePolicy};

/// Resolves the semantic type of a declared field.
///
/// Declared choices win over the native type, so an integer column with
/// choices is an enum.
pub fn semantic_type_of(field: &FieldDef) -> SemanticType {
    if field.has_choices() {
        return SemanticType::Enum;
    }

    match &field.native_type {
        NativeType::Char
        | NativeType::Text
        | NativeType::Slug
        | NativeType::Email
        | NativeType::Url
        | NativeType::File
        | NativeType::FilePath
        | NativeType::Time => SemanticType::Text,
        NativeType::Integer
        | NativeType::PositiveInteger
        | NativeType::SmallInteger
        | NativeType::BigInteger
        | NativeType::Auto
        | NativeType::BigAuto => SemanticType::Integer,
        NativeType::Float | NativeType::Decimal => SemanticType::Decimal,
        NativeType::Boolean | NativeType::NullBoolean => SemanticType::Boolean,
        NativeType::Date => SemanticType::Date,
        NativeType::DateTime => SemanticType::Datetime,
        NativeType::ForeignKey | NativeType::OneToOne | NativeType::ManyToMany => {
            SemanticType::Relation
        }
        NativeType::Json => SemanticType::Json,
        NativeType::Array => SemanticType::Array,
        NativeType::Other(name) => {
            tracing::debug!(native_type = %name, field = %field.name, "unmapped native type, using text");
            SemanticType::Text
        }
    }
}

/// Resolves the semantic type of an annotation.
///
/// An explicit type name wins; otherwise the aggregate kind decides, with
/// `min` / `max` taking the type of their source field.
pub fn annotation_type(
    annotation: &Annotation,
    base: &Descriptors,
    on_unknown: UnknownTypePolicy,
) -> FilterResult<SemanticType> {
    if let Some(name) = &annotation.semantic_type {
        return Ok(policy_for_name(name, on_unknown)?.semantic_type);
    }

    let semantic_type = match &annotation.kind {
        AnnotationKind::Concat | AnnotationKind::Other => SemanticType::Text,
        AnnotationKind::Sum | AnnotationKind::Avg => SemanticType::Decimal,
        AnnotationKind::Count => SemanticType::Integer,
        AnnotationKind::Min { source } | AnnotationKind::Max { source } => base
            .get(source)
            .map(|d| d.semantic_type)
            .unwrap_or(SemanticType::Text),
    };
    Ok(semantic_type)
}

/// Builds a descriptor, applying and validating a `filter_config` override.
pub fn build_descriptor(
    name: String,
    path: String,
    semantic_type: SemanticType,
    field: Option<&FieldDef>,
    origin: FieldOrigin,
) -> FilterResult<FieldDescriptor> {
    let policy = policy_for(semantic_type);
    let default_config = FieldFilterConfig::default();
    let config = field
        .and_then(|f| f.filter_config.as_ref())
        .unwrap_or(&default_config);

    let allowed_lookups = match &config.lookups {
        Some(names) => restrict_lookups(&name, semantic_type, names)?,
        None => policy.allowed_lookups.to_vec(),
    };

    let default_lookup = match &config.default {
        Some(lookup_name) => {
            let lookup = Lookup::parse(lookup_name).ok_or_else(|| {
                FilterError::configuration(&name, format!("unknown default lookup '{}'", lookup_name))
            })?;
            if !allowed_lookups.contains(&lookup) {
                return Err(FilterError::configuration(
                    &name,
                    format!("default lookup '{}' is not among the allowed lookups", lookup),
                ));
            }
            lookup
        }
        None if allowed_lookups.contains(&policy.default_lookup) => policy.default_lookup,
        // Restricted lookups without the type default: the first one stands in.
        None => allowed_lookups[0],
    };

    let supports_range =
        allowed_lookups.contains(&Lookup::Gte) && allowed_lookups.contains(&Lookup::Lte);
    let range_filter = match config.range_filter {
        Some(true) if !supports_range => {
            return Err(FilterError::configuration(
                &name,
                "range_filter requires both gte and lte to be allowed",
            ));
        }
        Some(flag) => flag,
        None => policy.range_filter && supports_range,
    };

    Ok(FieldDescriptor {
        name,
        path,
        semantic_type,
        searchable: config.searchable.unwrap_or(false),
        filterable: config.filterable.unwrap_or(true),
        allowed_lookups,
        default_lookup,
        range_filter,
        choices: field.map(|f| f.choices.clone()).unwrap_or_default(),
        origin,
    })
}

fn restrict_lookups(
    field: &str,
    semantic_type: SemanticType,
    names: &[String],
) -> FilterResult<Vec<Lookup>> {
    if names.is_empty() {
        return Err(FilterError::configuration(field, "lookups must not be empty"));
    }

    let policy = policy_for(semantic_type);
    let mut lookups = Vec::with_capacity(names.len());
    for lookup_name in names {
        let lookup = Lookup::parse(lookup_name).ok_or_else(|| {
            FilterError::configuration(field, format!("unknown lookup '{}'", lookup_name))
        })?;
        if !policy.allows(lookup) {
            return Err(FilterError::configuration(
                field,
                format!("lookup '{}' is not supported for {} fields", lookup, semantic_type),
            ));
        }
        if !lookups.contains(&lookup) {
            lookups.push(lookup);
        }
    }
    Ok(lookups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynfilter_schema::prelude::Choice;

    fn build(field: &FieldDef) -> FilterResult<FieldDescriptor> {
        build_descriptor(
            field.name.clone(),
            field.name.clone(),
            semantic_type_of(field),
            Some(field),
            FieldOrigin::Model,
        )
    }

    #[test]
    fn test_semantic_type_of_native_types() {
        let cases = [
            (NativeType::Email, SemanticType::Text),
            (NativeType::BigAuto, SemanticType::Integer),
            (NativeType::Float, SemanticType::Decimal),
            (NativeType::NullBoolean, SemanticType::Boolean),
            (NativeType::DateTime, SemanticType::Datetime),
            (NativeType::OneToOne, SemanticType::Relation),
            (NativeType::Json, SemanticType::Json),
            (NativeType::Array, SemanticType::Array),
            (NativeType::Other("GeometryField".to_string()), SemanticType::Text),
        ];
        for (native, expected) in cases {
            let field = FieldDef::new("f", native.clone());
            assert_eq!(semantic_type_of(&field), expected, "native: {}", native);
        }
    }

    #[test]
    fn test_choices_make_enum() {
        let field = FieldDef::new("status", NativeType::Integer)
            .with_choices(vec![Choice::int(1, "Active")]);
        assert_eq!(semantic_type_of(&field), SemanticType::Enum);
    }

    #[test]
    fn test_build_descriptor_defaults() {
        let field = FieldDef::new("price", NativeType::Integer);
        let descriptor = build(&field).unwrap();
        assert!(!descriptor.searchable);
        assert!(descriptor.filterable);
        assert!(descriptor.range_filter);
        assert_eq!(descriptor.default_lookup, Lookup::Exact);
    }

    #[test]
    fn test_override_restricts_lookups() {
        let field = FieldDef::new("price", NativeType::Integer).with_filter_config(
            FieldFilterConfig::default().lookups(["gte", "lte"]).default_lookup("gte"),
        );
        let descriptor = build(&field).unwrap();
        assert_eq!(descriptor.allowed_lookups, vec![Lookup::Gte, Lookup::Lte]);
        assert_eq!(descriptor.default_lookup, Lookup::Gte);
        assert!(descriptor.range_filter);
    }

    #[test]
    fn test_override_without_default_uses_first_lookup() {
        let field = FieldDef::new("name", NativeType::Char)
            .with_filter_config(FieldFilterConfig::default().lookups(["exact", "startswith"]));
        let descriptor = build(&field).unwrap();
        assert_eq!(descriptor.default_lookup, Lookup::Exact);

        let field = FieldDef::new("name", NativeType::Char)
            .with_filter_config(FieldFilterConfig::default().lookups(["startswith"]));
        assert_eq!(build(&field).unwrap().default_lookup, Lookup::StartsWith);
    }

    #[test]
    fn test_override_rejects_empty_lookups() {
        let field = FieldDef::new("name", NativeType::Char)
            .with_filter_config(FieldFilterConfig::default().lookups(Vec::<String>::new()));
        assert!(matches!(build(&field), Err(FilterError::Configuration { .. })));
    }

    #[test]
    fn test_override_rejects_lookup_outside_policy() {
        let field = FieldDef::new("active", NativeType::Boolean)
            .with_filter_config(FieldFilterConfig::default().lookups(["gt"]));
        let err = build(&field).unwrap_err();
        assert!(err.to_string().contains("not supported for boolean"));
    }

    #[test]
    fn test_override_rejects_unknown_lookup() {
        let field = FieldDef::new("name", NativeType::Char)
            .with_filter_config(FieldFilterConfig::default().lookups(["regex"]));
        assert!(matches!(build(&field), Err(FilterError::Configuration { .. })));
    }

    #[test]
    fn test_override_rejects_default_outside_lookups() {
        let field = FieldDef::new("name", NativeType::Char).with_filter_config(
            FieldFilterConfig::default().lookups(["exact"]).default_lookup("icontains"),
        );
        assert!(matches!(build(&field), Err(FilterError::Configuration { .. })));
    }

    #[test]
    fn test_range_filter_needs_gte_and_lte() {
        let field = FieldDef::new("name", NativeType::Char)
            .with_filter_config(FieldFilterConfig::default().range_filter(true));
        assert!(matches!(build(&field), Err(FilterError::Configuration { .. })));

        // Inherited range support is dropped rather than rejected.
        let field = FieldDef::new("price", NativeType::Integer)
            .with_filter_config(FieldFilterConfig::default().lookups(["exact", "in"]));
        assert!(!build(&field).unwrap().range_filter);
    }

    #[test]
    fn test_annotation_types() {
        let base = Descriptors::from_fields(
            "product",
            [FieldDescriptor::for_type("created_at", SemanticType::Datetime)],
        );
        let cases = [
            (AnnotationKind::Concat, SemanticType::Text),
            (AnnotationKind::Sum, SemanticType::Decimal),
            (AnnotationKind::Avg, SemanticType::Decimal),
            (AnnotationKind::Count, SemanticType::Integer),
            (
                AnnotationKind::Max {
                    source: "created_at".to_string(),
                },
                SemanticType::Datetime,
            ),
            (
                AnnotationKind::Min {
                    source: "missing".to_string(),
                },
                SemanticType::Text,
            ),
        ];
        for (kind, expected) in cases {
            let annotation = Annotation::new("a", kind);
            assert_eq!(
                annotation_type(&annotation, &base, UnknownTypePolicy::Fail).unwrap(),
                expected
            );
        }
    }

    #[test]
    fn test_annotation_type_hint() {
        let base = Descriptors::new("product");
        let annotation = Annotation::new("score", AnnotationKind::Other).typed("integer");
        assert_eq!(
            annotation_type(&annotation, &base, UnknownTypePolicy::Fail).unwrap(),
            SemanticType::Integer
        );

        let annotation = Annotation::new("shape", AnnotationKind::Other).typed("polygon");
        assert!(matches!(
            annotation_type(&annotation, &base, UnknownTypePolicy::Fail),
            Err(FilterError::UnknownType { .. })
        ));
    }
}
