//! Typed filter values and request value coercion.
//!
//! Request values arrive either as strings (flat query parameters) or as
//! arbitrary JSON (advanced filter leaves). [`coerce`] turns them into a
//! [`FilterValue`] shaped for the field's semantic type and the lookup in use.
//! Conversion failures are reported as [`ValidationError::InvalidValue`];
//! nothing silently falls back to zero or false.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use dynfilter_schema::prelude::{Choice, ChoiceValue};
use serde::Serialize;
use serde_json::Value;

use crate::error::ValidationError;
use crate::policy::{Lookup, LookupPath, SemanticType};
use crate::registry::FieldDescriptor;

/// Date formats tried in order when parsing a date string.
pub const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d-%m-%Y",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%b %d, %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%d %B %Y",
];

/// Datetime formats tried in order when parsing a datetime string.
pub const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%d %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%b %d, %Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
];

/// A value bound into a compiled predicate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    List(Vec<FilterValue>),
    Json(Value),
}

impl FilterValue {
    /// Infers a value from untyped JSON, used for array elements and for row
    /// data in the memory engine.
    pub fn from_json(value: &Value) -> FilterValue {
        match value {
            Value::Null => FilterValue::Null,
            Value::Bool(b) => FilterValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FilterValue::Int(i),
                None => FilterValue::Decimal(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => FilterValue::Text(s.clone()),
            Value::Array(items) => FilterValue::List(items.iter().map(FilterValue::from_json).collect()),
            Value::Object(_) => FilterValue::Json(value.clone()),
        }
    }

    /// Returns the list items, or the value itself as a one-element slice.
    pub fn as_list(&self) -> &[FilterValue] {
        match self {
            FilterValue::List(items) => items,
            other => std::slice::from_ref(other),
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Null => f.write_str("null"),
            FilterValue::Bool(b) => write!(f, "{}", b),
            FilterValue::Int(i) => write!(f, "{}", i),
            FilterValue::Decimal(d) => write!(f, "{}", d),
            FilterValue::Text(s) => write!(f, "{:?}", s),
            FilterValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FilterValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            FilterValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            FilterValue::Json(value) => write!(f, "{}", value),
        }
    }
}

/// Parses a date using [`DATE_FORMATS`]. A datetime string yields its date.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
        .or_else(|| parse_datetime_only(input).map(|dt| dt.date()))
}

/// Parses a datetime using [`DATETIME_FORMATS`] and RFC 3339. A date-only
/// string is taken at midnight.
pub fn parse_datetime(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    parse_datetime_only(input).or_else(|| {
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    })
}

/// Returns true if the string parses as a date but not as a datetime.
pub fn is_date_only(input: &str) -> bool {
    let input = input.trim();
    parse_datetime_only(input).is_none()
        && DATE_FORMATS
            .iter()
            .any(|fmt| NaiveDate::parse_from_str(input, fmt).is_ok())
}

fn parse_datetime_only(input: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(input)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

/// Parses a boolean from its common spellings.
pub fn parse_bool(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// Converts a raw request value for `descriptor` and `path`.
///
/// `null` (or the string `"null"`) must be handled by the caller, which turns
/// it into an `isnull` predicate before coercion.
pub fn coerce(
    descriptor: &FieldDescriptor,
    path: LookupPath,
    raw: &Value,
) -> Result<FilterValue, ValidationError> {
    let coercer = Coercer { descriptor, path };
    coercer.coerce(raw)
}

struct Coercer<'a> {
    descriptor: &'a FieldDescriptor,
    path: LookupPath,
}

impl Coercer<'_> {
    fn coerce(&self, raw: &Value) -> Result<FilterValue, ValidationError> {
        match self.path.lookup {
            Lookup::IsNull => self.boolean(raw).map(FilterValue::Bool),
            Lookup::In => {
                let items = self.split_list(raw)?;
                let values = items
                    .iter()
                    .map(|item| self.scalar(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(FilterValue::List(values))
            }
            Lookup::Range => {
                let items = self.split_list(raw)?;
                if items.len() != 2 {
                    return Err(self.invalid("a list of two values", raw));
                }
                let values = items
                    .iter()
                    .map(|item| self.scalar(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(FilterValue::List(values))
            }
            Lookup::Len => self.integer(raw).map(FilterValue::Int),
            Lookup::HasKey => self.text(raw).map(FilterValue::Text),
            Lookup::Date => self.date(raw).map(FilterValue::Date),
            Lookup::Contains | Lookup::ContainedBy | Lookup::Overlap
                if self.descriptor.semantic_type == SemanticType::Array =>
            {
                let items = self.split_list(raw)?;
                Ok(FilterValue::List(items.iter().map(FilterValue::from_json).collect()))
            }
            Lookup::Contains | Lookup::ContainedBy
                if self.descriptor.semantic_type == SemanticType::Json =>
            {
                Ok(FilterValue::Json(self.json(raw)))
            }
            _ => self.scalar(raw),
        }
    }

    /// Coerces a single value according to the semantic type.
    fn scalar(&self, raw: &Value) -> Result<FilterValue, ValidationError> {
        if self.path.date_part {
            return self.date(raw).map(FilterValue::Date);
        }

        match self.descriptor.semantic_type {
            SemanticType::Text => self.text(raw).map(FilterValue::Text),
            SemanticType::Integer => self.integer(raw).map(FilterValue::Int),
            SemanticType::Decimal => self.decimal(raw).map(FilterValue::Decimal),
            SemanticType::Boolean => self.boolean(raw).map(FilterValue::Bool),
            SemanticType::Date => self.date(raw).map(FilterValue::Date),
            SemanticType::Datetime => self.datetime(raw).map(FilterValue::DateTime),
            SemanticType::Enum => self.choice(raw),
            SemanticType::Relation => self.key(raw),
            SemanticType::Json => Ok(FilterValue::Json(self.json(raw))),
            SemanticType::Array => Ok(FilterValue::from_json(raw)),
        }
    }

    fn text(&self, raw: &Value) -> Result<String, ValidationError> {
        match raw {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            _ => Err(self.invalid("a string", raw)),
        }
    }

    fn integer(&self, raw: &Value) -> Result<i64, ValidationError> {
        let parsed = match raw {
            Value::Number(n) => n.as_i64().or_else(|| {
                // Whole floats only, inside the i64 range. `i64::MAX as f64` rounds up to 2^63.
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(f))
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| self.invalid("an integer", raw))
    }

    fn decimal(&self, raw: &Value) -> Result<f64, ValidationError> {
        let parsed = match raw {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        };
        parsed.ok_or_else(|| self.invalid("a number", raw))
    }

    fn boolean(&self, raw: &Value) -> Result<bool, ValidationError> {
        let parsed = match raw {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            Value::String(s) => parse_bool(s),
            _ => None,
        };
        parsed.ok_or_else(|| self.invalid("a boolean", raw))
    }

    fn date(&self, raw: &Value) -> Result<NaiveDate, ValidationError> {
        raw.as_str()
            .and_then(parse_date)
            .ok_or_else(|| self.invalid("a date", raw))
    }

    fn datetime(&self, raw: &Value) -> Result<NaiveDateTime, ValidationError> {
        raw.as_str()
            .and_then(parse_datetime)
            .ok_or_else(|| self.invalid("a datetime", raw))
    }

    /// Matches the value against the declared choices. Enum fields without
    /// choices accept any scalar.
    fn choice(&self, raw: &Value) -> Result<FilterValue, ValidationError> {
        let text = self.text(raw)?;
        if self.descriptor.choices.is_empty() {
            return Ok(key_value(&text));
        }

        self.descriptor
            .choices
            .iter()
            .find(|choice| choice.value.to_string() == text.trim())
            .map(choice_value)
            .ok_or_else(|| {
                let expected = format!(
                    "one of {}",
                    self.descriptor
                        .choices
                        .iter()
                        .map(|c| c.value.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                self.invalid(&expected, raw)
            })
    }

    /// Related object keys are integers when they look like one.
    fn key(&self, raw: &Value) -> Result<FilterValue, ValidationError> {
        match raw {
            Value::Number(_) => self.integer(raw).map(FilterValue::Int),
            Value::String(s) if !s.trim().is_empty() => Ok(key_value(s)),
            _ => Err(self.invalid("a key", raw)),
        }
    }

    fn json(&self, raw: &Value) -> Value {
        match raw {
            Value::String(s) => serde_json::from_str(s).unwrap_or_else(|_| raw.clone()),
            other => other.clone(),
        }
    }

    /// Accepts a JSON array or a comma-separated string.
    fn split_list(&self, raw: &Value) -> Result<Vec<Value>, ValidationError> {
        match raw {
            Value::Array(items) => Ok(items.clone()),
            Value::String(s) => Ok(s
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| Value::String(part.to_string()))
                .collect()),
            Value::Number(_) | Value::Bool(_) => Ok(vec![raw.clone()]),
            _ => Err(self.invalid("a list", raw)),
        }
    }

    fn invalid(&self, expected: &str, raw: &Value) -> ValidationError {
        ValidationError::invalid_value(
            self.descriptor.name.clone(),
            self.path.to_string(),
            expected,
            raw,
        )
    }
}

fn key_value(text: &str) -> FilterValue {
    let trimmed = text.trim();
    match trimmed.parse::<i64>() {
        Ok(i) => FilterValue::Int(i),
        Err(_) => FilterValue::Text(trimmed.to_string()),
    }
}

fn choice_value(choice: &Choice) -> FilterValue {
    match &choice.value {
        ChoiceValue::Int(i) => FilterValue::Int(*i),
        ChoiceValue::Text(s) => FilterValue::Text(s.clone()),
    }
}

/// Returns the values of choices whose label contains `term`
/// (case-insensitive).
pub fn choices_matching_label(choices: &[Choice], term: &str) -> Vec<FilterValue> {
    let term = term.to_lowercase();
    choices
        .iter()
        .filter(|choice| choice.label.to_lowercase().contains(&term))
        .map(choice_value)
        .collect()
}

/// Returns true for JSON `null` and the literal string `"null"`.
pub fn is_null_literal(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::String(s) => s.trim().eq_ignore_ascii_case("null"),
        _ => false,
    }
}
