//! Compiled filter expressions.
//!
//! An [`Expr`] is what the compiler hands to a query engine: a boolean tree
//! of [`Predicate`]s. The constructors [`Expr::and`], [`Expr::or`] and
//! [`Expr::negate`] simplify as they build, so `AND` of nothing is
//! [`Expr::Always`] and `OR` of nothing is [`Expr::Never`].

use std::fmt;

use serde::Serialize;

use crate::policy::{Lookup, LookupPath};
use crate::value::FilterValue;

/// A single field comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predicate {
    /// Engine path of the field.
    pub path: String,
    /// Compare only the date part of the stored value.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub date_part: bool,
    pub lookup: Lookup,
    pub value: FilterValue,
}

impl Predicate {
    pub fn new(path: impl Into<String>, lookup: LookupPath, value: FilterValue) -> Self {
        Self {
            path: path.into(),
            date_part: lookup.date_part,
            lookup: lookup.lookup,
            value,
        }
    }

    /// The `isnull` predicate.
    pub fn is_null(path: impl Into<String>, is_null: bool) -> Self {
        Self::new(path, LookupPath::plain(Lookup::IsNull), FilterValue::Bool(is_null))
    }

    pub fn lookup_path(&self) -> LookupPath {
        LookupPath {
            date_part: self.date_part,
            lookup: self.lookup,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}__{}={}", self.path, self.lookup_path(), self.value)
    }
}

/// A boolean filter expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// Matches every row.
    Always,
    /// Matches no row.
    Never,
    Predicate(Predicate),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    /// Conjunction of `children`, flattened and simplified.
    pub fn and(children: impl IntoIterator<Item = Expr>) -> Expr {
        let mut flat = Vec::new();
        for child in children {
            match child {
                Expr::Always => {}
                Expr::Never => return Expr::Never,
                Expr::And(nested) => flat.extend(nested),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Expr::Always,
            1 => flat.remove(0),
            _ => Expr::And(flat),
        }
    }

    /// Disjunction of `children`, flattened and simplified.
    pub fn or(children: impl IntoIterator<Item = Expr>) -> Expr {
        let mut flat = Vec::new();
        for child in children {
            match child {
                Expr::Never => {}
                Expr::Always => return Expr::Always,
                Expr::Or(nested) => flat.extend(nested),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Expr::Never,
            1 => flat.remove(0),
            _ => Expr::Or(flat),
        }
    }

    /// Negation of `inner`.
    pub fn negate(inner: Expr) -> Expr {
        match inner {
            Expr::Always => Expr::Never,
            Expr::Never => Expr::Always,
            Expr::Not(inner) => *inner,
            other => Expr::Not(Box::new(other)),
        }
    }

    /// Conjunction with another expression.
    pub fn and_with(self, other: Expr) -> Expr {
        Expr::and([self, other])
    }

    pub fn is_always(&self) -> bool {
        matches!(self, Expr::Always)
    }

    /// All predicates in the tree, depth first.
    pub fn predicates(&self) -> Vec<&Predicate> {
        let mut out = Vec::new();
        self.collect_predicates(&mut out);
        out
    }

    fn collect_predicates<'a>(&'a self, out: &mut Vec<&'a Predicate>) {
        match self {
            Expr::Always | Expr::Never => {}
            Expr::Predicate(p) => out.push(p),
            Expr::And(children) | Expr::Or(children) => {
                for child in children {
                    child.collect_predicates(out);
                }
            }
            Expr::Not(inner) => inner.collect_predicates(out),
        }
    }

    fn is_composite(&self) -> bool {
        matches!(self, Expr::And(_) | Expr::Or(_))
    }
}

impl From<Predicate> for Expr {
    fn from(predicate: Predicate) -> Self {
        Expr::Predicate(predicate)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Always => f.write_str("TRUE"),
            Expr::Never => f.write_str("FALSE"),
            Expr::Predicate(p) => write!(f, "{}", p),
            Expr::And(children) => write_joined(f, children, " AND "),
            Expr::Or(children) => write_joined(f, children, " OR "),
            Expr::Not(inner) if inner.is_composite() => write!(f, "NOT ({})", inner),
            Expr::Not(inner) => write!(f, "NOT {}", inner),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[Expr], sep: &str) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        if child.is_composite() {
            write!(f, "({})", child)?;
        } else {
            write!(f, "{}", child)?;
        }
    }
    Ok(())
}
