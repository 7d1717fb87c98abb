//! In-memory evaluation of filter plans over JSON rows.
//!
//! # Example
//!
//! ```
//! use dynfilter::engine::{MemoryEngine, QueryEngine};
//! use dynfilter::expr::{Expr, Predicate};
//! use dynfilter::policy::{Lookup, LookupPath};
//! use dynfilter::value::FilterValue;
//!
//! let engine = MemoryEngine::from_json_str(r#"[{"price": 5}, {"price": 50}]"#).unwrap();
//! let cheap = Expr::from(Predicate::new(
//!     "price",
//!     LookupPath::plain(Lookup::Lt),
//!     FilterValue::Int(10),
//! ));
//! let rows = engine.execute(&cheap, &[]).unwrap();
//! assert_eq!(rows.len(), 1);
//! ```

use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use super::{EngineError, QueryEngine};
use crate::expr::{Expr, Predicate};
use crate::normalizer::{Direction, OrderingInstruction};
use crate::policy::Lookup;
use crate::registry::LOOKUP_SEP;
use crate::value::{parse_bool, parse_date, parse_datetime, FilterValue};

/// A query engine over a fixed set of JSON object rows.
///
/// Paths traverse nested objects with `__` (`customer__email`); when a path
/// crosses an array every element is tried. A missing or null value only
/// matches `isnull`.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    rows: Vec<Value>,
}

impl MemoryEngine {
    /// Creates an engine over `rows`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidRows` if a row is not a JSON object.
    pub fn new(rows: Vec<Value>) -> Result<Self, EngineError> {
        if let Some(index) = rows.iter().position(|row| !row.is_object()) {
            return Err(EngineError::InvalidRows(format!(
                "row {} is not an object",
                index
            )));
        }
        Ok(Self { rows })
    }

    /// Parses a JSON array of objects.
    pub fn from_json_str(source: &str) -> Result<Self, EngineError> {
        let value: Value =
            serde_json::from_str(source).map_err(|e| EngineError::InvalidRows(e.to_string()))?;
        match value {
            Value::Array(rows) => Self::new(rows),
            _ => Err(EngineError::InvalidRows(
                "expected an array of objects".to_string(),
            )),
        }
    }

    pub fn rows(&self) -> &[Value] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns true if `row` matches `expression`.
    pub fn matches(&self, expression: &Expr, row: &Value) -> bool {
        match expression {
            Expr::Always => true,
            Expr::Never => false,
            Expr::Predicate(predicate) => self.matches_predicate(predicate, row),
            Expr::And(children) => children.iter().all(|c| self.matches(c, row)),
            Expr::Or(children) => children.iter().any(|c| self.matches(c, row)),
            Expr::Not(inner) => !self.matches(inner, row),
        }
    }

    fn matches_predicate(&self, predicate: &Predicate, row: &Value) -> bool {
        let candidates = resolve_path(row, &predicate.path);

        if predicate.lookup == Lookup::IsNull {
            let want_null = predicate.value == FilterValue::Bool(true);
            let is_null = candidates.iter().all(|v| v.is_null());
            return is_null == want_null;
        }

        candidates
            .into_iter()
            .filter(|v| !v.is_null())
            .any(|v| matches_value(v, predicate))
    }
}

impl QueryEngine for MemoryEngine {
    type Row = Value;
    type Error = EngineError;

    fn execute(
        &self,
        expression: &Expr,
        ordering: &[OrderingInstruction],
    ) -> Result<Vec<Value>, EngineError> {
        let mut rows: Vec<Value> = self
            .rows
            .iter()
            .filter(|row| self.matches(expression, row))
            .cloned()
            .collect();
        sort_rows(&mut rows, ordering);
        tracing::debug!(matched = rows.len(), total = self.rows.len(), "evaluated filter in memory");
        Ok(rows)
    }
}

/// Every value reachable from `row` along `path`.
fn resolve_path<'r>(row: &'r Value, path: &str) -> Vec<&'r Value> {
    let mut current = vec![row];
    for segment in path.split(LOOKUP_SEP) {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => next.extend(map.get(segment)),
                Value::Array(items) => next.extend(items.iter().filter_map(|i| i.get(segment))),
                _ => {}
            }
        }
        current = next;
    }
    current
}

fn matches_value(actual: &Value, predicate: &Predicate) -> bool {
    let expected = &predicate.value;
    let date_part = predicate.date_part;

    match predicate.lookup {
        Lookup::Exact => is_equal(actual, expected, date_part),
        Lookup::IExact => text_pair(actual, expected)
            .is_some_and(|(a, e)| a.to_lowercase() == e.to_lowercase()),
        Lookup::Contains => match actual {
            Value::Array(items) => expected
                .as_list()
                .iter()
                .all(|e| items.iter().any(|item| is_equal(item, e, false))),
            Value::Object(_) => json_contains(actual, &to_json(expected)),
            _ => text_pair(actual, expected).is_some_and(|(a, e)| a.contains(e.as_str())),
        },
        Lookup::IContains => text_pair(actual, expected)
            .is_some_and(|(a, e)| a.to_lowercase().contains(&e.to_lowercase())),
        Lookup::StartsWith => {
            text_pair(actual, expected).is_some_and(|(a, e)| a.starts_with(e.as_str()))
        }
        Lookup::IStartsWith => text_pair(actual, expected)
            .is_some_and(|(a, e)| a.to_lowercase().starts_with(&e.to_lowercase())),
        Lookup::Gt => compare(actual, expected, date_part) == Some(Ordering::Greater),
        Lookup::Gte => matches!(
            compare(actual, expected, date_part),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Lookup::Lt => compare(actual, expected, date_part) == Some(Ordering::Less),
        Lookup::Lte => matches!(
            compare(actual, expected, date_part),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Lookup::In => expected
            .as_list()
            .iter()
            .any(|e| is_equal(actual, e, date_part)),
        Lookup::Range => match expected.as_list() {
            [low, high] => {
                matches!(
                    compare(actual, low, date_part),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(
                    compare(actual, high, date_part),
                    Some(Ordering::Less | Ordering::Equal)
                )
            }
            _ => false,
        },
        Lookup::Date => is_equal(actual, expected, true),
        Lookup::HasKey => match (actual, expected) {
            (Value::Object(map), FilterValue::Text(key)) => map.contains_key(key),
            _ => false,
        },
        Lookup::ContainedBy => match actual {
            Value::Array(items) => items
                .iter()
                .all(|item| expected.as_list().iter().any(|e| is_equal(item, e, false))),
            Value::Object(_) => json_contains(&to_json(expected), actual),
            _ => false,
        },
        Lookup::Overlap => match actual {
            Value::Array(items) => items
                .iter()
                .any(|item| expected.as_list().iter().any(|e| is_equal(item, e, false))),
            _ => false,
        },
        Lookup::Len => match (actual, expected) {
            (Value::Array(items), FilterValue::Int(n)) => items.len() as i64 == *n,
            _ => false,
        },
        // Handled before values are inspected.
        Lookup::IsNull => false,
    }
}

fn is_equal(actual: &Value, expected: &FilterValue, date_part: bool) -> bool {
    compare(actual, expected, date_part) == Some(Ordering::Equal)
}

/// Orders a row value against an expected value, converting the row value to
/// the expected value's type. `None` when they cannot be compared.
fn compare(actual: &Value, expected: &FilterValue, date_part: bool) -> Option<Ordering> {
    if date_part {
        let FilterValue::Date(expected) = expected else {
            return None;
        };
        return row_date(actual).map(|d| d.cmp(expected));
    }

    match expected {
        FilterValue::Null | FilterValue::List(_) => None,
        FilterValue::Bool(b) => row_bool(actual).map(|a| a.cmp(b)),
        FilterValue::Int(i) => match row_integer(actual) {
            Some(a) => Some(a.cmp(i)),
            None => row_number(actual)?.partial_cmp(&(*i as f64)),
        },
        FilterValue::Decimal(d) => row_number(actual)?.partial_cmp(d),
        FilterValue::Text(s) => row_text(actual).map(|a| a.as_str().cmp(s.as_str())),
        FilterValue::Date(d) => row_date(actual).map(|a| a.cmp(d)),
        FilterValue::DateTime(dt) => row_datetime(actual).map(|a| a.cmp(dt)),
        FilterValue::Json(j) => (actual == j).then_some(Ordering::Equal),
    }
}

/// Related objects compare by their `id`.
fn key_of(value: &Value) -> &Value {
    match value.get("id") {
        Some(id) if value.is_object() => id,
        _ => value,
    }
}

fn row_number(value: &Value) -> Option<f64> {
    match key_of(value) {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Exact integer form of a row value, so large keys compare without loss.
fn row_integer(value: &Value) -> Option<i64> {
    match key_of(value) {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn row_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        Value::String(s) => parse_bool(s),
        _ => None,
    }
}

fn row_text(value: &Value) -> Option<String> {
    match key_of(value) {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn row_date(value: &Value) -> Option<NaiveDate> {
    value.as_str().and_then(parse_date)
}

fn row_datetime(value: &Value) -> Option<NaiveDateTime> {
    value.as_str().and_then(parse_datetime)
}

fn text_pair(actual: &Value, expected: &FilterValue) -> Option<(String, String)> {
    let FilterValue::Text(expected) = expected else {
        return None;
    };
    row_text(actual).map(|a| (a, expected.clone()))
}

fn to_json(value: &FilterValue) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// JSON containment: every key and element of `needle` appears in
/// `haystack`.
fn json_contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::Object(h), Value::Object(n)) => n
            .iter()
            .all(|(key, nv)| h.get(key).is_some_and(|hv| json_contains(hv, nv))),
        (Value::Array(h), Value::Array(n)) => {
            n.iter().all(|nv| h.iter().any(|hv| json_contains(hv, nv)))
        }
        (Value::Array(h), scalar) => h.iter().any(|hv| hv == scalar),
        _ => haystack == needle,
    }
}

fn sort_rows(rows: &mut [Value], ordering: &[OrderingInstruction]) {
    if ordering.is_empty() {
        return;
    }
    rows.sort_by(|a, b| {
        for instruction in ordering {
            let left = first_value(a, &instruction.path);
            let right = first_value(b, &instruction.path);
            let order = match instruction.direction {
                Direction::Asc => compare_sort_keys(left, right),
                Direction::Desc => compare_sort_keys(left, right).reverse(),
            };
            if order != Ordering::Equal {
                return order;
            }
        }
        Ordering::Equal
    });
}

fn first_value<'r>(row: &'r Value, path: &str) -> Option<&'r Value> {
    resolve_path(row, path).into_iter().find(|v| !v.is_null())
}

/// Nulls sort first.
fn compare_sort_keys(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left.map(key_of), right.map(key_of)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(a)), Some(Value::Number(b))) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => a.as_f64().partial_cmp(&b.as_f64()).unwrap_or(Ordering::Equal),
        },
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(a), Some(b)) => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
