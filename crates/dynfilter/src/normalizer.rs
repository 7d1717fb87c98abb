//! Flat request parameter normalization.
//!
//! Turns `name=coffee&price_min=10&search=organic&ordering=-price` into field
//! predicates, search predicates and ordering instructions. Flat parameters
//! are assumed to come from noisy UI state: keys that name no allowed field
//! are skipped, not rejected. Values are still validated.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::condition::build_predicate;
use crate::error::{FilterResult, ValidationError};
use crate::expr::Predicate;
use crate::options::{FilterOptions, RangePolicy};
use crate::policy::{Lookup, LookupPath, SemanticType};
use crate::registry::{FieldDescriptor, LOOKUP_SEP};
use crate::request::{is_reserved, RequestParams, ORDERING_PARAM, SEARCH_PARAM};
use crate::scope::FieldScope;
use crate::value::{choices_matching_label, is_date_only, FilterValue};

const MIN_SUFFIX: &str = "_min";
const MAX_SUFFIX: &str = "_max";

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Asc,
    Desc,
}

/// One ordering key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderingInstruction {
    pub field: String,
    pub path: String,
    pub direction: Direction,
}

impl fmt::Display for OrderingInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Asc => write!(f, "{}", self.path),
            Direction::Desc => write!(f, "-{}", self.path),
        }
    }
}

/// The normalized form of a flat request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRequest {
    /// Field predicates, ANDed by the orchestrator.
    pub filters: Vec<Predicate>,
    /// Search predicates, ORed by the orchestrator. `None` when there is no
    /// search term or nothing to search.
    pub search: Option<Vec<Predicate>>,
    pub ordering: Vec<OrderingInstruction>,
}

/// Normalizes `params` against `scope`.
///
/// # Errors
///
/// Returns a `ValidationError` if a value does not coerce, or if a range
/// parameter targets a field without range support under
/// [`RangePolicy::Reject`].
pub fn normalize(
    scope: &FieldScope<'_>,
    params: &RequestParams,
    options: &FilterOptions,
) -> FilterResult<NormalizedRequest> {
    let normalizer = Normalizer { scope, options };
    Ok(NormalizedRequest {
        filters: normalizer.filters(params)?,
        search: normalizer.search(params),
        ordering: normalizer.ordering(params),
    })
}

struct Normalizer<'s, 'a> {
    scope: &'s FieldScope<'a>,
    options: &'s FilterOptions,
}

/// A parameter key resolved to a field and lookup.
struct Resolved<'a> {
    descriptor: &'a FieldDescriptor,
    path: LookupPath,
}

impl<'s, 'a> Normalizer<'s, 'a> {
    fn filters(&self, params: &RequestParams) -> FilterResult<Vec<Predicate>> {
        let mut filters: Vec<Predicate> = Vec::new();
        // Position of the merged list predicate per (path, lookup) for `in`.
        let mut merged: HashMap<(String, LookupPath), usize> = HashMap::new();

        for (key, raw) in params.iter() {
            if is_reserved(key) || raw.trim().is_empty() {
                continue;
            }
            let Some(resolved) = self.resolve(key, raw)? else {
                continue;
            };

            let value = Value::String(raw.to_string());
            let predicate = build_predicate(resolved.descriptor, resolved.path, &value)?;

            if predicate.lookup == Lookup::In {
                let merge_key = (predicate.path.clone(), predicate.lookup_path());
                if let Some(&index) = merged.get(&merge_key) {
                    if let FilterValue::List(items) = &mut filters[index].value {
                        items.extend(predicate.value.as_list().iter().cloned());
                    }
                    continue;
                }
                merged.insert(merge_key, filters.len());
            }
            filters.push(predicate);
        }

        Ok(filters)
    }

    /// Resolves a key: exact field name, then `<field>__<lookup>`, then a
    /// `_min` / `_max` suffix.
    fn resolve(&self, key: &str, raw: &str) -> Result<Option<Resolved<'a>>, ValidationError> {
        if self.scope.is_described(key) {
            return Ok(self.allowed(key).map(|descriptor| Resolved {
                descriptor,
                path: LookupPath::plain(descriptor.default_lookup),
            }));
        }

        if let Some(resolved) = self.resolve_lookup_suffix(key) {
            return Ok(resolved);
        }

        for (suffix, lookup) in [(MIN_SUFFIX, Lookup::Gte), (MAX_SUFFIX, Lookup::Lte)] {
            if let Some(field) = key.strip_suffix(suffix) {
                if self.scope.is_described(field) {
                    return self.resolve_range(field, lookup, raw);
                }
            }
        }

        tracing::debug!(param = key, "ignoring unknown filter parameter or lookup");
        Ok(None)
    }

    /// `<field>__<lookup>` and `<field>__date__<lookup>`. Returns `None` when
    /// the key does not have that shape, so `supplier__id_min` falls through
    /// to the range suffix.
    fn resolve_lookup_suffix(&self, key: &str) -> Option<Option<Resolved<'a>>> {
        let (field, lookup_text) = key.rsplit_once(LOOKUP_SEP)?;
        let (field, lookup_text) = if self.scope.is_described(field) {
            (field, lookup_text.to_string())
        } else {
            let base = field.strip_suffix("__date")?;
            (base, format!("date__{}", lookup_text))
        };
        if !self.scope.is_described(field) {
            return None;
        }

        let path = LookupPath::parse(&lookup_text)?;
        let Some(descriptor) = self.allowed(field) else {
            return Some(None);
        };
        let is_null = path.lookup == Lookup::IsNull && !path.date_part;
        if !is_null && !descriptor.allows(&path) {
            tracing::warn!(
                param = key,
                lookup = %path,
                field = %descriptor.name,
                "lookup not allowed on field, ignoring parameter"
            );
            return Some(None);
        }
        Some(Some(Resolved { descriptor, path }))
    }

    fn resolve_range(
        &self,
        field: &str,
        lookup: Lookup,
        raw: &str,
    ) -> Result<Option<Resolved<'a>>, ValidationError> {
        let Some(descriptor) = self.allowed(field) else {
            return Ok(None);
        };

        if !descriptor.range_filter {
            return match self.options.range_policy {
                RangePolicy::Ignore => {
                    tracing::debug!(field, "field has no range support, ignoring bound");
                    Ok(None)
                }
                RangePolicy::Reject => Err(ValidationError::RangeNotSupported {
                    field: field.to_string(),
                }),
            };
        }

        let on_date = descriptor.semantic_type == SemanticType::Datetime
            && is_date_only(raw)
            && descriptor.allowed_lookups.contains(&Lookup::Date);
        let path = if on_date {
            LookupPath::on_date(lookup)
        } else {
            LookupPath::plain(lookup)
        };
        Ok(Some(Resolved { descriptor, path }))
    }

    fn allowed(&self, field: &str) -> Option<&'a FieldDescriptor> {
        let descriptor = self.scope.get(field);
        if descriptor.is_none() {
            tracing::debug!(field, "field is not open for filtering, ignoring parameter");
        }
        descriptor
    }

    fn search(&self, params: &RequestParams) -> Option<Vec<Predicate>> {
        let term = params.get(SEARCH_PARAM)?.trim();
        if term.is_empty() {
            return None;
        }
        let fields = self.scope.search_fields();
        if fields.is_empty() {
            tracing::debug!("search requested but no fields are searchable");
            return None;
        }

        let predicates = fields
            .iter()
            .filter_map(|descriptor| search_predicate(descriptor, term))
            .collect();
        Some(predicates)
    }

    fn ordering(&self, params: &RequestParams) -> Vec<OrderingInstruction> {
        let raw = match params.get(ORDERING_PARAM) {
            Some(raw) => raw,
            None => match &self.options.default_ordering {
                Some(default) => default.as_str(),
                None => return Vec::new(),
            },
        };

        raw.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .filter_map(|part| {
                let (name, direction) = match part.strip_prefix('-') {
                    Some(name) => (name, Direction::Desc),
                    None => (part, Direction::Asc),
                };
                let Some(descriptor) = self.scope.get(name) else {
                    tracing::debug!(field = name, "ignoring unknown ordering field");
                    return None;
                };
                Some(OrderingInstruction {
                    field: descriptor.name.clone(),
                    path: descriptor.path.clone(),
                    direction,
                })
            })
            .collect()
    }
}

/// Search predicate for one field. Only text and enum fields are searched.
fn search_predicate(descriptor: &FieldDescriptor, term: &str) -> Option<Predicate> {
    match descriptor.semantic_type {
        SemanticType::Text => Some(text_search(descriptor, term)),
        SemanticType::Enum if descriptor.choices.is_empty() => Some(text_search(descriptor, term)),
        SemanticType::Enum => {
            let values = choices_matching_label(&descriptor.choices, term);
            if values.is_empty() {
                return None;
            }
            Some(Predicate::new(
                &descriptor.path,
                LookupPath::plain(Lookup::In),
                FilterValue::List(values),
            ))
        }
        other => {
            tracing::debug!(field = %descriptor.name, semantic_type = %other, "type is not searchable");
            None
        }
    }
}

fn text_search(descriptor: &FieldDescriptor, term: &str) -> Predicate {
    Predicate::new(
        &descriptor.path,
        LookupPath::plain(Lookup::IContains),
        FilterValue::Text(term.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterError;
    use crate::registry::Descriptors;
    use crate::request::FilterConfig;
    use dynfilter_schema::prelude::Choice;

    fn descriptors() -> Descriptors {
        Descriptors::from_fields(
            "product",
            [
                FieldDescriptor::for_type("name", SemanticType::Text).searchable(true),
                FieldDescriptor::for_type("description", SemanticType::Text),
                FieldDescriptor::for_type("price", SemanticType::Integer),
                FieldDescriptor::for_type("in_stock", SemanticType::Boolean),
                FieldDescriptor::for_type("created_at", SemanticType::Datetime),
                FieldDescriptor::for_type("status", SemanticType::Enum).with_choices(vec![
                    Choice::text("draft", "Draft"),
                    Choice::text("live", "Published"),
                ]),
            ],
        )
    }

    fn run(query: &str, options: &FilterOptions) -> FilterResult<NormalizedRequest> {
        let descriptors = descriptors();
        let scope = FieldScope::new(&descriptors, None)?;
        normalize(&scope, &RequestParams::parse(query)?, options)
    }

    fn leaf(path: &str, lookup: Lookup, value: FilterValue) -> Predicate {
        Predicate::new(path, LookupPath::plain(lookup), value)
    }

    // ==================== Flat filters ====================

    #[test]
    fn test_name_price_range_and_ordering() {
        let normalized = run(
            "name=coffee&price_min=10&price_max=50&ordering=-price",
            &FilterOptions::default(),
        )
        .unwrap();

        assert_eq!(
            normalized.filters,
            vec![
                leaf("name", Lookup::IContains, FilterValue::Text("coffee".to_string())),
                leaf("price", Lookup::Gte, FilterValue::Int(10)),
                leaf("price", Lookup::Lte, FilterValue::Int(50)),
            ]
        );
        assert_eq!(
            normalized.ordering,
            vec![OrderingInstruction {
                field: "price".to_string(),
                path: "price".to_string(),
                direction: Direction::Desc,
            }]
        );
        assert!(normalized.search.is_none());
    }

    #[test]
    fn test_unknown_and_empty_params_are_skipped() {
        let normalized = run("colour=red&name=&page=2&page_size=10", &FilterOptions::default())
            .unwrap();
        assert!(normalized.filters.is_empty());
    }

    #[test]
    fn test_field_lookup_params() {
        let normalized = run("price__gt=5&name__startswith=co", &FilterOptions::default()).unwrap();
        assert_eq!(
            normalized.filters,
            vec![
                leaf("price", Lookup::Gt, FilterValue::Int(5)),
                leaf("name", Lookup::StartsWith, FilterValue::Text("co".to_string())),
            ]
        );
    }

    #[test]
    fn test_disallowed_lookup_param_is_skipped() {
        let normalized = run("in_stock__gt=1&price__regex=1", &FilterOptions::default()).unwrap();
        assert!(normalized.filters.is_empty());
    }

    #[test]
    fn test_isnull_param() {
        let normalized = run("price__isnull=true&name=null", &FilterOptions::default()).unwrap();
        assert_eq!(
            normalized.filters,
            vec![Predicate::is_null("price", true), Predicate::is_null("name", true)]
        );
    }

    #[test]
    fn test_invalid_value_is_reported() {
        let err = run("price_min=cheap", &FilterOptions::default()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_repeated_in_params_merge() {
        let normalized = run("price__in=1,2&price__in=3", &FilterOptions::default()).unwrap();
        assert_eq!(
            normalized.filters,
            vec![leaf(
                "price",
                Lookup::In,
                FilterValue::List(vec![
                    FilterValue::Int(1),
                    FilterValue::Int(2),
                    FilterValue::Int(3)
                ])
            )]
        );
    }

    #[test]
    fn test_repeated_scalar_params_each_filter() {
        let normalized = run("name=a&name=b", &FilterOptions::default()).unwrap();
        assert_eq!(normalized.filters.len(), 2);
    }

    // ==================== Ranges ====================

    #[test]
    fn test_range_on_non_range_field_ignored() {
        let normalized = run("name_min=a", &FilterOptions::default()).unwrap();
        assert!(normalized.filters.is_empty());
    }

    #[test]
    fn test_range_on_non_range_field_rejected() {
        let options = FilterOptions::default().range_policy(RangePolicy::Reject);
        let err = run("name_min=a", &options).unwrap_err();
        assert_eq!(
            err,
            FilterError::from(ValidationError::RangeNotSupported {
                field: "name".to_string()
            })
        );
    }

    #[test]
    fn test_datetime_range_with_date_only_value() {
        let normalized = run(
            "created_at_min=2024-01-01&created_at_max=2024-01-31T12:00:00",
            &FilterOptions::default(),
        )
        .unwrap();

        assert!(normalized.filters[0].date_part);
        assert_eq!(normalized.filters[0].lookup, Lookup::Gte);
        assert!(!normalized.filters[1].date_part);
        assert_eq!(normalized.filters[1].lookup, Lookup::Lte);
    }

    #[test]
    fn test_date_transform_param() {
        let normalized = run("created_at__date__lt=2024-02-01", &FilterOptions::default()).unwrap();
        let predicate = &normalized.filters[0];
        assert!(predicate.date_part);
        assert_eq!(predicate.lookup, Lookup::Lt);
    }

    // ==================== Search ====================

    #[test]
    fn test_search_configured_fields() {
        let descriptors = descriptors();
        let config = FilterConfig::default().search_fields(["description"]);
        let scope = FieldScope::new(&descriptors, Some(&config)).unwrap();
        let params = RequestParams::new().with("search", " organic ");

        let normalized = normalize(&scope, &params, &FilterOptions::default()).unwrap();
        assert!(normalized.filters.is_empty());
        assert_eq!(
            normalized.search,
            Some(vec![
                leaf("name", Lookup::IContains, FilterValue::Text("organic".to_string())),
                leaf("description", Lookup::IContains, FilterValue::Text("organic".to_string())),
            ])
        );
    }

    #[test]
    fn test_search_enum_labels() {
        let descriptors = descriptors();
        let config = FilterConfig::default()
            .search_fields(["status", "price"])
            .exclude_fields(["name"]);
        let scope = FieldScope::new(&descriptors, Some(&config)).unwrap();
        let params = RequestParams::new().with("search", "publ");

        let normalized = normalize(&scope, &params, &FilterOptions::default()).unwrap();
        assert_eq!(
            normalized.search,
            Some(vec![leaf(
                "status",
                Lookup::In,
                FilterValue::List(vec![FilterValue::Text("live".to_string())])
            )])
        );
    }

    #[test]
    fn test_search_with_no_matching_predicates() {
        let descriptors = descriptors();
        let config = FilterConfig::default()
            .search_fields(["status"])
            .exclude_fields(["name"]);
        let scope = FieldScope::new(&descriptors, Some(&config)).unwrap();
        let params = RequestParams::new().with("search", "archived");

        let normalized = normalize(&scope, &params, &FilterOptions::default()).unwrap();
        assert_eq!(normalized.search, Some(vec![]));
    }

    #[test]
    fn test_search_without_searchable_fields_is_ignored() {
        let descriptors = descriptors();
        let config = FilterConfig::default().exclude_fields(["name"]);
        let scope = FieldScope::new(&descriptors, Some(&config)).unwrap();
        let params = RequestParams::new().with("search", "x");

        let normalized = normalize(&scope, &params, &FilterOptions::default()).unwrap();
        assert!(normalized.search.is_none());
    }

    // ==================== Ordering ====================

    #[test]
    fn test_ordering_drops_unknown_fields() {
        let normalized = run("ordering=name,-colour,,-created_at", &FilterOptions::default()).unwrap();
        let ordering: Vec<_> = normalized.ordering.iter().map(|o| o.to_string()).collect();
        assert_eq!(ordering, ["name", "-created_at"]);
    }

    #[test]
    fn test_default_ordering_applies_when_absent() {
        let options = FilterOptions::default().default_ordering("-price,bogus");
        let normalized = run("name=a", &options).unwrap();
        assert_eq!(normalized.ordering.len(), 1);
        assert_eq!(normalized.ordering[0].direction, Direction::Desc);

        let normalized = run("ordering=name", &options).unwrap();
        assert_eq!(normalized.ordering[0].field, "name");
    }
}
