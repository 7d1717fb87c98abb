//! Integration tests for compiling requests end to end.
//!
//! These tests build descriptors from a catalog the way a host would, compile
//! whole requests through `FilterSet` and, where rows matter, run the plans on
//! the in-memory engine.

use dynfilter::prelude::*;
use dynfilter::policy::policy_for;
use dynfilter_schema::prelude::{Catalog, Choice, FieldDef, FieldFilterConfig, NativeType, Schema};
use serde_json::{json, Value};

// ============================================================================
// Fixtures
// ============================================================================

fn catalog() -> Catalog {
    let product = Schema::new("product")
        .with_field(FieldDef::new("id", NativeType::Auto))
        .with_field(
            FieldDef::new("name", NativeType::Char)
                .with_filter_config(FieldFilterConfig::default().searchable(true)),
        )
        .with_field(FieldDef::new("description", NativeType::Text))
        .with_field(FieldDef::new("price", NativeType::Integer))
        .with_field(FieldDef::new("in_stock", NativeType::Boolean))
        .with_field(
            FieldDef::new("grade", NativeType::Char)
                .with_choices(vec![Choice::text("a", "Premium"), Choice::text("b", "Standard")]),
        )
        .with_field(FieldDef::new("created_at", NativeType::DateTime))
        .with_field(FieldDef::foreign_key("supplier", "supplier"))
        .with_field(FieldDef::new("is_deleted", NativeType::Boolean));

    let supplier = Schema::new("supplier")
        .with_field(FieldDef::new("id", NativeType::Auto))
        .with_field(FieldDef::new("country", NativeType::Char));

    let customer = Schema::new("customer")
        .with_field(FieldDef::new("status", NativeType::Integer))
        .with_field(FieldDef::new("is_vip", NativeType::Boolean))
        .with_field(FieldDef::new("is_active", NativeType::Boolean));

    Catalog::new(vec![product, supplier, customer])
}

fn rows() -> MemoryEngine {
    MemoryEngine::new(vec![
        json!({
            "id": 1, "name": "Coffee Beans", "description": "organic arabica",
            "price": 18, "in_stock": true, "grade": "a",
            "created_at": "2024-03-01T10:00:00", "supplier": {"id": 10, "country": "peru"},
            "is_deleted": false
        }),
        json!({
            "id": 2, "name": "Instant Coffee", "description": "freeze dried",
            "price": 6, "in_stock": true, "grade": "b",
            "created_at": "2024-01-10T08:00:00", "supplier": {"id": 11, "country": "brazil"},
            "is_deleted": false
        }),
        json!({
            "id": 3, "name": "Organic Tea", "description": "green leaves",
            "price": 12, "in_stock": false, "grade": "a",
            "created_at": "2023-11-20T12:00:00", "supplier": {"id": 12, "country": "japan"},
            "is_deleted": false
        }),
        json!({
            "id": 4, "name": "Coffee Filter", "description": "paper",
            "price": 3, "in_stock": true, "grade": "b",
            "created_at": "2024-02-14T09:00:00", "supplier": {"id": 10, "country": "peru"},
            "is_deleted": true
        }),
    ])
    .unwrap()
}

fn plan(model: &str, query: &str) -> FilterResult<FilterPlan> {
    let registry = Registry::new(catalog());
    let descriptors = registry.describe(model)?;
    let params = RequestParams::parse(query)?;
    FilterSet::new(&descriptors).apply(&params)
}

fn leaf(path: &str, lookup: Lookup, value: FilterValue) -> Expr {
    Predicate::new(path, LookupPath::plain(lookup), value).into()
}

fn ids(rows: &[Value]) -> Vec<i64> {
    rows.iter().filter_map(|r| r["id"].as_i64()).collect()
}

// ============================================================================
// Policy
// ============================================================================

#[test]
fn test_every_default_lookup_is_allowed() {
    for semantic_type in SemanticType::ALL {
        let entry = policy_for(semantic_type);
        assert!(entry.allows(entry.default_lookup), "{semantic_type}");
    }
}

// ============================================================================
// Flat parameters
// ============================================================================

#[test]
fn test_flat_request_scenario() {
    let plan = plan("product", "name=coffee&price_min=10&price_max=50&ordering=-price").unwrap();

    assert_eq!(
        plan.expression,
        Expr::And(vec![
            leaf("name", Lookup::IContains, FilterValue::Text("coffee".into())),
            leaf("price", Lookup::Gte, FilterValue::Int(10)),
            leaf("price", Lookup::Lte, FilterValue::Int(50)),
        ])
    );
    assert_eq!(plan.ordering.len(), 1);
    assert_eq!(plan.ordering[0].field, "price");
    assert_eq!(plan.ordering[0].direction, Direction::Desc);
}

#[test]
fn test_search_is_or_grouped() {
    let registry = Registry::new(catalog());
    let descriptors = registry.describe("product").unwrap();
    let config = FilterConfig::default().search_fields(["name", "description"]);
    let params = RequestParams::parse("search=organic").unwrap();

    let plan = FilterSet::new(&descriptors)
        .with_config(config)
        .apply(&params)
        .unwrap();

    assert_eq!(
        plan.expression,
        Expr::Or(vec![
            leaf("name", Lookup::IContains, FilterValue::Text("organic".into())),
            leaf("description", Lookup::IContains, FilterValue::Text("organic".into())),
        ])
    );
    assert!(plan.ordering.is_empty());
}

#[test]
fn test_range_on_unsupported_field_ignored_by_default() {
    let plan = plan("product", "name_min=a&in_stock=true").unwrap();
    assert_eq!(
        plan.expression,
        leaf("in_stock", Lookup::Exact, FilterValue::Bool(true))
    );
}

#[test]
fn test_range_on_unsupported_field_rejected_when_configured() {
    let registry = Registry::new(catalog());
    let descriptors = registry.describe("product").unwrap();
    let params = RequestParams::parse("name_min=a").unwrap();

    let err = FilterSet::new(&descriptors)
        .with_options(FilterOptions::default().range_policy(RangePolicy::Reject))
        .apply(&params)
        .unwrap_err();

    assert!(matches!(
        err,
        FilterError::Validation(ValidationError::RangeNotSupported { ref field }) if field == "name"
    ));
}

#[test]
fn test_leaf_and_flat_filter_agree() {
    let flat = plan("customer", "status=1").unwrap();
    let filter = json!({"field": "status", "lookup": "exact", "value": 1}).to_string();
    let advanced = plan(
        "customer",
        &format!("filter={}", urlencode(&filter)),
    )
    .unwrap();

    assert_eq!(flat.expression, advanced.expression);
}

/// Minimal form encoding for JSON payloads in test queries.
fn urlencode(raw: &str) -> String {
    serde_urlencoded::to_string([("v", raw)])
        .unwrap()
        .trim_start_matches("v=")
        .to_string()
}

// ============================================================================
// Advanced filter
// ============================================================================

#[test]
fn test_nested_advanced_filter_scenario() {
    let filter = r#"{"operator":"AND","conditions":[
        {"field":"status","lookup":"exact","value":1},
        {"operator":"OR","conditions":[
            {"field":"is_vip","lookup":"exact","value":true},
            {"field":"is_active","lookup":"exact","value":true}
        ]}
    ]}"#;
    let registry = Registry::new(catalog());
    let descriptors = registry.describe("customer").unwrap();
    let params = RequestParams::new().with("filter", filter);

    let plan = FilterSet::new(&descriptors).apply(&params).unwrap();

    assert_eq!(
        plan.expression.to_string(),
        "status__exact=1 AND (is_vip__exact=true OR is_active__exact=true)"
    );
}

#[test]
fn test_empty_composites() {
    let registry = Registry::new(catalog());
    let descriptors = registry.describe("customer").unwrap();
    let filter_set = FilterSet::new(&descriptors);

    let and = RequestParams::new().with("filter", r#"{"operator":"AND","conditions":[]}"#);
    assert_eq!(filter_set.apply(&and).unwrap().expression, Expr::Always);

    let or = RequestParams::new().with("filter", r#"{"operator":"OR","conditions":[]}"#);
    assert_eq!(filter_set.apply(&or).unwrap().expression, Expr::Never);
}

#[test]
fn test_not_with_two_children_is_validation_error() {
    let registry = Registry::new(catalog());
    let descriptors = registry.describe("customer").unwrap();
    let params = RequestParams::new().with(
        "filter",
        r#"{"operator":"NOT","conditions":[
            {"field":"status","value":1},
            {"field":"is_vip","value":true}
        ]}"#,
    );

    let err = FilterSet::new(&descriptors).apply(&params).unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_depth_cap_is_validation_error() {
    let registry = Registry::new(catalog());
    let descriptors = registry.describe("customer").unwrap();

    let mut node = json!({"field": "status", "value": 1});
    for _ in 0..10 {
        node = json!({"operator": "OR", "conditions": [node]});
    }
    let params = RequestParams::new().with("filter", node.to_string());

    let err = FilterSet::new(&descriptors)
        .with_options(FilterOptions::default().max_depth(5))
        .apply(&params)
        .unwrap_err();
    assert_eq!(
        err,
        FilterError::Validation(ValidationError::DepthExceeded { max_depth: 5 })
    );
}

/// Unknown names in flat parameters come from noisy UI state and are
/// skipped. The advanced filter is authored deliberately, so the same name
/// there is an error.
#[test]
fn test_unknown_field_tolerated_flat_but_rejected_advanced() {
    let flat = plan("customer", "stauts=1&status=2").unwrap();
    assert_eq!(flat.expression, leaf("status", Lookup::Exact, FilterValue::Int(2)));

    let registry = Registry::new(catalog());
    let descriptors = registry.describe("customer").unwrap();
    let params = RequestParams::new().with("filter", r#"{"field":"stauts","value":1}"#);
    let err = FilterSet::new(&descriptors).apply(&params).unwrap_err();

    assert_eq!(
        err.to_string(),
        "cannot filter on 'stauts'. Did you mean 'status'?"
    );
}

#[test]
fn test_flat_advanced_and_search_are_anded() {
    let registry = Registry::new(catalog());
    let descriptors = registry.describe("product").unwrap();
    let params = RequestParams::new()
        .with("in_stock", "true")
        .with("search", "coffee")
        .with("filter", r#"{"field":"price","lookup":"lt","value":10}"#);

    let plan = FilterSet::new(&descriptors).apply(&params).unwrap();
    assert_eq!(
        plan.expression.to_string(),
        "in_stock__exact=true AND name__icontains=\"coffee\" AND price__lt=10"
    );
}

// ============================================================================
// Relations
// ============================================================================

#[test]
fn test_related_field_in_flat_and_advanced() {
    let plan = plan(
        "product",
        &format!(
            "supplier__country=peru&filter={}",
            urlencode(r#"{"field":"supplier__country","lookup":"iexact","value":"PERU"}"#)
        ),
    )
    .unwrap();

    assert_eq!(
        plan.expression,
        Expr::And(vec![
            leaf("supplier__country", Lookup::IContains, FilterValue::Text("peru".into())),
            leaf("supplier__country", Lookup::IExact, FilterValue::Text("PERU".into())),
        ])
    );
}

#[test]
fn test_range_bounds_on_related_field() {
    let ranged = plan("product", "supplier__id_min=11&supplier__id_max=12").unwrap();
    assert_eq!(
        ranged.expression,
        Expr::And(vec![
            leaf("supplier__id", Lookup::Gte, FilterValue::Int(11)),
            leaf("supplier__id", Lookup::Lte, FilterValue::Int(12)),
        ])
    );

    let explicit = plan("product", "supplier__id__gte=11&supplier__id__lte=12").unwrap();
    assert_eq!(ranged.expression, explicit.expression);
}

#[test]
fn test_range_on_related_text_field_rejected_when_configured() {
    let registry = Registry::new(catalog());
    let descriptors = registry.describe("product").unwrap();
    let params = RequestParams::parse("supplier__country_min=a").unwrap();

    let err = FilterSet::new(&descriptors)
        .with_options(FilterOptions::default().range_policy(RangePolicy::Reject))
        .apply(&params)
        .unwrap_err();

    assert!(matches!(
        err,
        FilterError::Validation(ValidationError::RangeNotSupported { ref field })
            if field == "supplier__country"
    ));
}

// ============================================================================
// Execution
// ============================================================================

#[test]
fn test_execute_on_memory_engine() {
    let registry = Registry::new(catalog());
    let descriptors = registry.describe("product").unwrap();
    let params = RequestParams::parse("name=coffee&price_min=5&ordering=-price").unwrap();

    let matched = FilterSet::new(&descriptors).execute(&rows(), &params).unwrap();
    assert_eq!(ids(&matched), [1, 2]);
}

#[test]
fn test_execute_search_over_enum_labels() {
    let registry = Registry::new(catalog());
    let descriptors = registry.describe("product").unwrap();
    let config = FilterConfig::default().search_fields(["grade"]);
    let params = RequestParams::parse("search=prem&ordering=id").unwrap();

    let matched = FilterSet::new(&descriptors)
        .with_config(config)
        .execute(&rows(), &params)
        .unwrap();
    assert_eq!(ids(&matched), [1, 3]);
}

#[test]
fn test_execute_date_part_filter() {
    let registry = Registry::new(catalog());
    let descriptors = registry.describe("product").unwrap();
    let params = RequestParams::parse("created_at__date__gte=2024-02-01&ordering=created_at").unwrap();

    let matched = FilterSet::new(&descriptors).execute(&rows(), &params).unwrap();
    assert_eq!(ids(&matched), [4, 1]);
}

#[test]
fn test_execute_surfaces_filter_errors() {
    let registry = Registry::new(catalog());
    let descriptors = registry.describe("product").unwrap();
    let params = RequestParams::parse("price=cheap").unwrap();

    let err = FilterSet::new(&descriptors)
        .execute(&rows(), &params)
        .unwrap_err();
    assert!(matches!(err, EngineError::Filter(FilterError::Validation(_))));
}

// ============================================================================
// Soft delete
// ============================================================================

#[test]
fn test_soft_delete_scopes_compose_with_filters() {
    let registry = Registry::new(catalog());
    let descriptors = registry.describe("product").unwrap();
    let filter_set = FilterSet::new(&descriptors);
    let params = RequestParams::parse("name=coffee&ordering=id").unwrap();

    let active = SoftDelete::new(rows());
    assert_eq!(ids(&filter_set.execute(&active, &params).unwrap()), [1, 2]);

    let everything = SoftDelete::new(rows()).all_with_deleted();
    assert_eq!(ids(&filter_set.execute(&everything, &params).unwrap()), [1, 2, 4]);

    let deleted = SoftDelete::new(rows()).only_deleted();
    assert_eq!(ids(&filter_set.execute(&deleted, &params).unwrap()), [4]);
}

#[test]
fn test_soft_delete_scope_as_base_expression() {
    let registry = Registry::new(catalog());
    let descriptors = registry.describe("product").unwrap();
    let params = RequestParams::parse("in_stock=true").unwrap();
    let soft = SoftDelete::new(rows());

    let plan = FilterSet::new(&descriptors)
        .apply_with_base(soft.scope_expression(), &params)
        .unwrap();

    assert_eq!(
        plan.to_string(),
        "NOT is_deleted__exact=true AND in_stock__exact=true"
    );
    let matched = soft.inner().execute(&plan.expression, &plan.ordering).unwrap();
    assert_eq!(ids(&matched), [1, 2]);
}
