//! Recursive descent parser from JSON to [`ConditionNode`].

use serde_json::{Map, Value};

use super::ast::{ConditionNode, Operator};
use crate::error::ValidationError;
use crate::options::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_FILTER_BYTES};

/// Decodes the raw `filter` parameter into JSON.
///
/// The parameter is tried as JSON first and, failing that, percent-decoded
/// and tried again.
pub fn decode_filter_param(raw: &str) -> Result<Value, ValidationError> {
    let raw = raw.trim();
    match serde_json::from_str(raw) {
        Ok(value) => Ok(value),
        Err(first_error) => {
            let Some(decoded) = percent_decode(raw) else {
                return Err(ValidationError::MalformedJson {
                    message: first_error.to_string(),
                });
            };
            serde_json::from_str(&decoded).map_err(|e| ValidationError::MalformedJson {
                message: e.to_string(),
            })
        }
    }
}

fn percent_decode(raw: &str) -> Option<String> {
    if !raw.contains('%') {
        return None;
    }
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(&format!("filter={}", raw)).ok()?;
    pairs.into_iter().next().map(|(_, value)| value)
}

/// Parser for advanced filter payloads.
///
/// Depth is tracked explicitly: the root node is at depth 1 and every
/// composite adds one level. Payloads nested deeper than `max_depth` are
/// rejected before any recursion past the limit happens.
///
/// # Example
///
/// ```
/// use dynfilter::condition::{ConditionNode, ConditionParser};
///
/// let parser = ConditionParser::default();
/// let node = parser
///     .parse(r#"{"operator": "or", "conditions": [{"field": "price", "value": 5}]}"#)
///     .unwrap();
/// assert!(matches!(node, ConditionNode::Composite { .. }));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ConditionParser {
    max_depth: usize,
    max_bytes: usize,
}

impl Default for ConditionParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH, DEFAULT_MAX_FILTER_BYTES)
    }
}

impl ConditionParser {
    pub fn new(max_depth: usize, max_bytes: usize) -> Self {
        Self {
            max_depth,
            max_bytes,
        }
    }

    /// Parses the raw `filter` parameter.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the payload is too large, is not JSON,
    /// nests too deeply or has a node of the wrong shape.
    pub fn parse(&self, raw: &str) -> Result<ConditionNode, ValidationError> {
        if raw.len() > self.max_bytes {
            return Err(ValidationError::FilterTooLarge {
                size: raw.len(),
                max: self.max_bytes,
            });
        }
        let value = decode_filter_param(raw)?;
        self.parse_value(&value)
    }

    /// Parses an already decoded JSON value.
    pub fn parse_value(&self, value: &Value) -> Result<ConditionNode, ValidationError> {
        self.parse_node(value, 1)
    }

    fn parse_node(&self, value: &Value, depth: usize) -> Result<ConditionNode, ValidationError> {
        if depth > self.max_depth {
            return Err(ValidationError::DepthExceeded {
                max_depth: self.max_depth,
            });
        }

        let Value::Object(object) = value else {
            return Err(ValidationError::malformed(format!(
                "expected an object, got {}",
                json_kind(value)
            )));
        };

        if object.contains_key("operator") {
            self.parse_composite(object, depth)
        } else if object.contains_key("field") {
            parse_leaf(object)
        } else {
            Err(ValidationError::malformed(
                "node needs either 'operator' and 'conditions' or 'field' and 'value'",
            ))
        }
    }

    fn parse_composite(
        &self,
        object: &Map<String, Value>,
        depth: usize,
    ) -> Result<ConditionNode, ValidationError> {
        let name = object
            .get("operator")
            .and_then(Value::as_str)
            .ok_or_else(|| ValidationError::malformed("'operator' must be a string"))?;
        let operator = Operator::parse(name).ok_or_else(|| ValidationError::UnknownOperator {
            operator: name.to_string(),
        })?;

        let conditions = match object.get("conditions") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(ValidationError::malformed(format!(
                    "'conditions' must be an array, got {}",
                    json_kind(other)
                )));
            }
            None => return Err(ValidationError::malformed("composite node has no 'conditions'")),
        };

        let children = conditions
            .iter()
            .map(|child| self.parse_node(child, depth + 1))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ConditionNode::Composite { operator, children })
    }
}

fn parse_leaf(object: &Map<String, Value>) -> Result<ConditionNode, ValidationError> {
    let field = object
        .get("field")
        .and_then(Value::as_str)
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| ValidationError::malformed("'field' must be a non-empty string"))?;

    let lookup = match object.get("lookup") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(other) => {
            return Err(ValidationError::malformed(format!(
                "'lookup' must be a string, got {}",
                json_kind(other)
            )));
        }
    };

    let value = object
        .get("value")
        .cloned()
        .ok_or_else(|| ValidationError::malformed(format!("leaf on '{}' has no 'value'", field)))?;

    Ok(ConditionNode::Leaf {
        field: field.trim().to_string(),
        lookup,
        value,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
