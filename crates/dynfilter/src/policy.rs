//! Lookup policy table.
//!
//! Maps each [`SemanticType`] to the lookups a field of that type may use, the
//! lookup applied when a request names none, and whether `_min` / `_max` range
//! parameters make sense for it. The table is a constant; nothing here is
//! mutated at runtime.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FilterError, FilterResult};

/// Simplified classification of a field, independent of the host's native
/// column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Text,
    Integer,
    Decimal,
    Boolean,
    Date,
    Datetime,
    Enum,
    Relation,
    Json,
    Array,
}

impl SemanticType {
    /// All semantic types, in policy table order.
    pub const ALL: [SemanticType; 10] = [
        SemanticType::Text,
        SemanticType::Integer,
        SemanticType::Decimal,
        SemanticType::Boolean,
        SemanticType::Date,
        SemanticType::Datetime,
        SemanticType::Enum,
        SemanticType::Relation,
        SemanticType::Json,
        SemanticType::Array,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SemanticType::Text => "text",
            SemanticType::Integer => "integer",
            SemanticType::Decimal => "decimal",
            SemanticType::Boolean => "boolean",
            SemanticType::Date => "date",
            SemanticType::Datetime => "datetime",
            SemanticType::Enum => "enum",
            SemanticType::Relation => "relation",
            SemanticType::Json => "json",
            SemanticType::Array => "array",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SemanticType {
    type Err = FilterError;

    fn from_str(s: &str) -> FilterResult<Self> {
        SemanticType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FilterError::unknown_type(s))
    }
}

/// A named comparison or containment operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lookup {
    Exact,
    #[serde(rename = "iexact")]
    IExact,
    Contains,
    #[serde(rename = "icontains")]
    IContains,
    #[serde(rename = "startswith")]
    StartsWith,
    #[serde(rename = "istartswith")]
    IStartsWith,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Range,
    Date,
    HasKey,
    ContainedBy,
    Overlap,
    Len,
    #[serde(rename = "isnull")]
    IsNull,
}

impl Lookup {
    const ALL: [Lookup; 18] = [
        Lookup::Exact,
        Lookup::IExact,
        Lookup::Contains,
        Lookup::IContains,
        Lookup::StartsWith,
        Lookup::IStartsWith,
        Lookup::Gt,
        Lookup::Gte,
        Lookup::Lt,
        Lookup::Lte,
        Lookup::In,
        Lookup::Range,
        Lookup::Date,
        Lookup::HasKey,
        Lookup::ContainedBy,
        Lookup::Overlap,
        Lookup::Len,
        Lookup::IsNull,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Lookup::Exact => "exact",
            Lookup::IExact => "iexact",
            Lookup::Contains => "contains",
            Lookup::IContains => "icontains",
            Lookup::StartsWith => "startswith",
            Lookup::IStartsWith => "istartswith",
            Lookup::Gt => "gt",
            Lookup::Gte => "gte",
            Lookup::Lt => "lt",
            Lookup::Lte => "lte",
            Lookup::In => "in",
            Lookup::Range => "range",
            Lookup::Date => "date",
            Lookup::HasKey => "has_key",
            Lookup::ContainedBy => "contained_by",
            Lookup::Overlap => "overlap",
            Lookup::Len => "len",
            Lookup::IsNull => "isnull",
        }
    }

    /// Parses a lookup name, returning `None` for unknown names.
    pub fn parse(name: &str) -> Option<Self> {
        Lookup::ALL.into_iter().find(|l| l.as_str() == name)
    }

    /// Returns true for lookups whose value is a list (`in`, `range`).
    pub fn is_multi_value(self) -> bool {
        matches!(self, Lookup::In | Lookup::Range)
    }

    /// Returns true for lookups that can follow a `date` transform.
    pub fn is_date_comparison(self) -> bool {
        matches!(
            self,
            Lookup::Exact
                | Lookup::Gt
                | Lookup::Gte
                | Lookup::Lt
                | Lookup::Lte
                | Lookup::In
                | Lookup::Range
        )
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lookup as written in a request: a comparison optionally preceded by a
/// `date` transform (`date__gte`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LookupPath {
    /// Compare only the date part of a datetime value.
    pub date_part: bool,
    pub lookup: Lookup,
}

impl LookupPath {
    /// A plain lookup without transform.
    pub fn plain(lookup: Lookup) -> Self {
        Self {
            date_part: false,
            lookup,
        }
    }

    /// A comparison applied to the date part of a datetime.
    pub fn on_date(lookup: Lookup) -> Self {
        Self {
            date_part: true,
            lookup,
        }
    }

    /// Parses `lookup` or `date__lookup`.
    pub fn parse(text: &str) -> Option<Self> {
        if let Some(rest) = text.strip_prefix("date__") {
            let lookup = Lookup::parse(rest)?;
            return lookup
                .is_date_comparison()
                .then_some(LookupPath::on_date(lookup));
        }
        Lookup::parse(text).map(LookupPath::plain)
    }

    /// Returns true if every lookup this path needs is in `allowed`.
    pub fn is_allowed_by(&self, allowed: &[Lookup]) -> bool {
        let transform_ok = !self.date_part || allowed.contains(&Lookup::Date);
        transform_ok && allowed.contains(&self.lookup)
    }
}

impl fmt::Display for LookupPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.date_part {
            write!(f, "date__{}", self.lookup)
        } else {
            write!(f, "{}", self.lookup)
        }
    }
}

/// Lookup capabilities of one semantic type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupPolicyEntry {
    pub semantic_type: SemanticType,
    pub default_lookup: Lookup,
    pub allowed_lookups: &'static [Lookup],
    pub range_filter: bool,
}

impl LookupPolicyEntry {
    /// Returns true if the lookup is allowed for this type.
    pub fn allows(&self, lookup: Lookup) -> bool {
        self.allowed_lookups.contains(&lookup)
    }
}

use Lookup::*;

static POLICY_TABLE: [LookupPolicyEntry; 10] = [
    LookupPolicyEntry {
        semantic_type: SemanticType::Text,
        default_lookup: IContains,
        allowed_lookups: &[Exact, IExact, Contains, IContains, StartsWith, IStartsWith],
        range_filter: false,
    },
    LookupPolicyEntry {
        semantic_type: SemanticType::Integer,
        default_lookup: Exact,
        allowed_lookups: &[Exact, Gt, Gte, Lt, Lte, In, Range],
        range_filter: true,
    },
    LookupPolicyEntry {
        semantic_type: SemanticType::Decimal,
        default_lookup: Exact,
        allowed_lookups: &[Exact, Gt, Gte, Lt, Lte, Range],
        range_filter: true,
    },
    LookupPolicyEntry {
        semantic_type: SemanticType::Boolean,
        default_lookup: Exact,
        allowed_lookups: &[Exact],
        range_filter: false,
    },
    LookupPolicyEntry {
        semantic_type: SemanticType::Date,
        default_lookup: Exact,
        allowed_lookups: &[Exact, Gt, Gte, Lt, Lte, Range],
        range_filter: true,
    },
    LookupPolicyEntry {
        semantic_type: SemanticType::Datetime,
        default_lookup: Exact,
        allowed_lookups: &[Exact, Gt, Gte, Lt, Lte, Range, Date],
        range_filter: true,
    },
    LookupPolicyEntry {
        semantic_type: SemanticType::Enum,
        default_lookup: Exact,
        allowed_lookups: &[Exact, In],
        range_filter: false,
    },
    LookupPolicyEntry {
        semantic_type: SemanticType::Relation,
        default_lookup: Exact,
        allowed_lookups: &[Exact, In],
        range_filter: false,
    },
    LookupPolicyEntry {
        semantic_type: SemanticType::Json,
        default_lookup: HasKey,
        allowed_lookups: &[HasKey, Contains, ContainedBy],
        range_filter: false,
    },
    LookupPolicyEntry {
        semantic_type: SemanticType::Array,
        default_lookup: Contains,
        allowed_lookups: &[Contains, ContainedBy, Overlap, Len],
        range_filter: false,
    },
];

/// Returns the policy entry for a semantic type.
pub fn policy_for(semantic_type: SemanticType) -> &'static LookupPolicyEntry {
    // Table order matches SemanticType::ALL.
    &POLICY_TABLE[semantic_type as usize]
}

/// What to do with a semantic type name that has no policy entry.
///
/// Such a name means a caller built descriptors from bad metadata, so the
/// default in debug builds is to fail loudly while release builds fall back to
/// the most restrictive common type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownTypePolicy {
    Fail,
    DegradeToText,
}

impl Default for UnknownTypePolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            UnknownTypePolicy::Fail
        } else {
            UnknownTypePolicy::DegradeToText
        }
    }
}

/// Resolves a semantic type name to its policy entry.
///
/// # Errors
///
/// Returns `FilterError::UnknownType` for names outside the ten known types
/// when `on_unknown` is [`UnknownTypePolicy::Fail`].
pub fn policy_for_name(
    name: &str,
    on_unknown: UnknownTypePolicy,
) -> FilterResult<&'static LookupPolicyEntry> {
    match name.parse::<SemanticType>() {
        Ok(semantic_type) => Ok(policy_for(semantic_type)),
        Err(err) => match on_unknown {
            UnknownTypePolicy::Fail => Err(err),
            UnknownTypePolicy::DegradeToText => {
                tracing::warn!(semantic_type = name, "unknown semantic type, treating as text");
                Ok(policy_for(SemanticType::Text))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lookup_is_always_allowed() {
        for semantic_type in SemanticType::ALL {
            let entry = policy_for(semantic_type);
            assert!(
                entry.allows(entry.default_lookup),
                "default lookup of {} must be allowed",
                semantic_type
            );
        }
    }

    #[test]
    fn test_table_is_indexed_by_type() {
        for semantic_type in SemanticType::ALL {
            assert_eq!(policy_for(semantic_type).semantic_type, semantic_type);
        }
    }

    #[test]
    fn test_range_types_allow_gte_and_lte() {
        for semantic_type in SemanticType::ALL {
            let entry = policy_for(semantic_type);
            if entry.range_filter {
                assert!(entry.allows(Lookup::Gte) && entry.allows(Lookup::Lte));
            }
        }
    }

    #[test]
    fn test_text_policy() {
        let entry = policy_for(SemanticType::Text);
        assert_eq!(entry.default_lookup, Lookup::IContains);
        assert!(!entry.range_filter);
        assert!(!entry.allows(Lookup::Gt));
    }

    #[test]
    fn test_semantic_type_roundtrips_through_name() {
        for semantic_type in SemanticType::ALL {
            assert_eq!(
                semantic_type.as_str().parse::<SemanticType>().unwrap(),
                semantic_type
            );
        }
    }

    #[test]
    fn test_policy_for_name_unknown_fails() {
        let err = policy_for_name("geometry", UnknownTypePolicy::Fail).unwrap_err();
        assert_eq!(err, FilterError::unknown_type("geometry"));
    }

    #[test]
    fn test_policy_for_name_unknown_degrades_to_text() {
        let entry = policy_for_name("geometry", UnknownTypePolicy::DegradeToText).unwrap();
        assert_eq!(entry.semantic_type, SemanticType::Text);
    }

    #[test]
    fn test_lookup_parse() {
        assert_eq!(Lookup::parse("icontains"), Some(Lookup::IContains));
        assert_eq!(Lookup::parse("has_key"), Some(Lookup::HasKey));
        assert_eq!(Lookup::parse("ICONTAINS"), None);
        assert_eq!(Lookup::parse("regex"), None);
    }

    #[test]
    fn test_lookup_path_with_date_transform() {
        let path = LookupPath::parse("date__gte").unwrap();
        assert!(path.date_part);
        assert_eq!(path.lookup, Lookup::Gte);
        assert_eq!(path.to_string(), "date__gte");

        assert!(LookupPath::parse("date__icontains").is_none());
        assert_eq!(LookupPath::parse("date"), Some(LookupPath::plain(Lookup::Date)));
    }

    #[test]
    fn test_lookup_path_allowed_requires_transform() {
        let datetime = policy_for(SemanticType::Datetime).allowed_lookups;
        let date = policy_for(SemanticType::Date).allowed_lookups;
        let path = LookupPath::on_date(Lookup::Gte);

        assert!(path.is_allowed_by(datetime));
        assert!(!path.is_allowed_by(date));
    }
}
