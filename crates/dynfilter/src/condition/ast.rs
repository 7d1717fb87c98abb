//! Condition tree nodes.

use std::fmt;

use serde_json::Value;

/// Boolean operator of a composite node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
    Not,
}

impl Operator {
    /// Parses an operator name, ignoring case.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "AND" => Some(Operator::And),
            "OR" => Some(Operator::Or),
            "NOT" => Some(Operator::Not),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::And => f.write_str("AND"),
            Operator::Or => f.write_str("OR"),
            Operator::Not => f.write_str("NOT"),
        }
    }
}

/// A parsed advanced filter.
///
/// ```text
/// Node      := Composite | Leaf
/// Composite := { "operator": "AND" | "OR" | "NOT", "conditions": [Node, ...] }
/// Leaf      := { "field": string, "lookup"?: string, "value": any }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionNode {
    Composite {
        operator: Operator,
        children: Vec<ConditionNode>,
    },
    Leaf {
        field: String,
        /// Lookup name as written; `None` means the field's default lookup.
        lookup: Option<String>,
        value: Value,
    },
}

impl ConditionNode {
    /// Creates a leaf node.
    pub fn leaf(field: impl Into<String>, lookup: Option<&str>, value: Value) -> Self {
        ConditionNode::Leaf {
            field: field.into(),
            lookup: lookup.map(str::to_string),
            value,
        }
    }

    pub fn and(children: Vec<ConditionNode>) -> Self {
        ConditionNode::Composite {
            operator: Operator::And,
            children,
        }
    }

    pub fn or(children: Vec<ConditionNode>) -> Self {
        ConditionNode::Composite {
            operator: Operator::Or,
            children,
        }
    }

    /// A NOT node. Arity is checked at compile time, not here.
    pub fn not(children: Vec<ConditionNode>) -> Self {
        ConditionNode::Composite {
            operator: Operator::Not,
            children,
        }
    }
}
