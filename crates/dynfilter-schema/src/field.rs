//! Field declarations.
//!
//! A [`FieldDef`] is what the host ORM knows about a column: its native type,
//! nullability, enum choices, the model it points at (for relations) and an
//! optional [`FieldFilterConfig`] override.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Native column type as declared by the host ORM.
///
/// Names are accepted both in snake case (`foreign_key`) and in the ORM's
/// class-name spelling (`ForeignKey`). Anything unrecognized is kept as
/// [`NativeType::Other`] and treated as text by the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NativeType {
    Char,
    Text,
    Slug,
    Email,
    Url,
    File,
    FilePath,
    Integer,
    PositiveInteger,
    SmallInteger,
    BigInteger,
    Auto,
    BigAuto,
    Float,
    Decimal,
    Boolean,
    NullBoolean,
    Date,
    DateTime,
    Time,
    ForeignKey,
    OneToOne,
    ManyToMany,
    Json,
    Array,
    /// A type the catalog does not know about.
    Other(String),
}

impl NativeType {
    /// Parses a native type name.
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "char" | "CharField" => NativeType::Char,
            "text" | "TextField" => NativeType::Text,
            "slug" | "SlugField" => NativeType::Slug,
            "email" | "EmailField" => NativeType::Email,
            "url" | "URLField" => NativeType::Url,
            "file" | "FileField" => NativeType::File,
            "file_path" | "FilePathField" => NativeType::FilePath,
            "integer" | "IntegerField" => NativeType::Integer,
            "positive_integer" | "PositiveIntegerField" => NativeType::PositiveInteger,
            "small_integer" | "SmallIntegerField" => NativeType::SmallInteger,
            "big_integer" | "BigIntegerField" => NativeType::BigInteger,
            "auto" | "AutoField" => NativeType::Auto,
            "big_auto" | "BigAutoField" => NativeType::BigAuto,
            "float" | "FloatField" => NativeType::Float,
            "decimal" | "DecimalField" => NativeType::Decimal,
            "boolean" | "BooleanField" => NativeType::Boolean,
            "null_boolean" | "NullBooleanField" => NativeType::NullBoolean,
            "date" | "DateField" => NativeType::Date,
            "datetime" | "DateTimeField" => NativeType::DateTime,
            "time" | "TimeField" => NativeType::Time,
            "foreign_key" | "ForeignKey" => NativeType::ForeignKey,
            "one_to_one" | "OneToOneField" => NativeType::OneToOne,
            "many_to_many" | "ManyToManyField" => NativeType::ManyToMany,
            "json" | "JSONField" => NativeType::Json,
            "array" | "ArrayField" => NativeType::Array,
            other => NativeType::Other(other.to_string()),
        }
    }

    /// Returns the canonical snake case name.
    pub fn as_str(&self) -> &str {
        match self {
            NativeType::Char => "char",
            NativeType::Text => "text",
            NativeType::Slug => "slug",
            NativeType::Email => "email",
            NativeType::Url => "url",
            NativeType::File => "file",
            NativeType::FilePath => "file_path",
            NativeType::Integer => "integer",
            NativeType::PositiveInteger => "positive_integer",
            NativeType::SmallInteger => "small_integer",
            NativeType::BigInteger => "big_integer",
            NativeType::Auto => "auto",
            NativeType::BigAuto => "big_auto",
            NativeType::Float => "float",
            NativeType::Decimal => "decimal",
            NativeType::Boolean => "boolean",
            NativeType::NullBoolean => "null_boolean",
            NativeType::Date => "date",
            NativeType::DateTime => "datetime",
            NativeType::Time => "time",
            NativeType::ForeignKey => "foreign_key",
            NativeType::OneToOne => "one_to_one",
            NativeType::ManyToMany => "many_to_many",
            NativeType::Json => "json",
            NativeType::Array => "array",
            NativeType::Other(name) => name,
        }
    }

    /// Returns true for relation types (foreign key, one-to-one, many-to-many).
    pub fn is_relation(&self) -> bool {
        matches!(
            self,
            NativeType::ForeignKey | NativeType::OneToOne | NativeType::ManyToMany
        )
    }
}

impl From<String> for NativeType {
    fn from(name: String) -> Self {
        NativeType::from_name(&name)
    }
}

impl From<NativeType> for String {
    fn from(native: NativeType) -> Self {
        native.as_str().to_string()
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The stored value of an enum choice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceValue {
    Int(i64),
    Text(String),
}

impl fmt::Display for ChoiceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChoiceValue::Int(value) => write!(f, "{}", value),
            ChoiceValue::Text(value) => f.write_str(value),
        }
    }
}

/// One allowed value of an enum field together with its human label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub value: ChoiceValue,
    pub label: String,
}

impl Choice {
    /// Creates a choice with a text value.
    pub fn text(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: ChoiceValue::Text(value.into()),
            label: label.into(),
        }
    }

    /// Creates a choice with an integer value.
    pub fn int(value: i64, label: impl Into<String>) -> Self {
        Self {
            value: ChoiceValue::Int(value),
            label: label.into(),
        }
    }
}

/// Per-field override of the filtering capabilities.
///
/// Only the options listed here are recognized; unknown keys are rejected when
/// the catalog is loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldFilterConfig {
    /// Include the field in free-text search (default false).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub searchable: Option<bool>,

    /// Allow filtering on the field (default true).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filterable: Option<bool>,

    /// Restricts the allowed lookups. Must be a subset of the lookups
    /// supported by the field's semantic type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookups: Option<Vec<String>>,

    /// Lookup used when a request names the field without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Enables `_min` / `_max` range parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_filter: Option<bool>,
}

impl FieldFilterConfig {
    /// Sets the searchable flag.
    pub fn searchable(mut self, searchable: bool) -> Self {
        self.searchable = Some(searchable);
        self
    }

    /// Sets the filterable flag.
    pub fn filterable(mut self, filterable: bool) -> Self {
        self.filterable = Some(filterable);
        self
    }

    /// Restricts the allowed lookups.
    pub fn lookups<I, S>(mut self, lookups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lookups = Some(lookups.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the default lookup.
    pub fn default_lookup(mut self, lookup: impl Into<String>) -> Self {
        self.default = Some(lookup.into());
        self
    }

    /// Sets the range filter flag.
    pub fn range_filter(mut self, range_filter: bool) -> Self {
        self.range_filter = Some(range_filter);
        self
    }
}

/// A field declared on a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDef {
    pub name: String,

    #[serde(rename = "type")]
    pub native_type: NativeType,

    #[serde(default)]
    pub nullable: bool,

    /// Declared choices; a non-empty list makes the field an enum.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,

    /// Target model of a relation field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_config: Option<FieldFilterConfig>,
}

impl FieldDef {
    /// Creates a non-nullable field without choices or overrides.
    pub fn new(name: impl Into<String>, native_type: NativeType) -> Self {
        Self {
            name: name.into(),
            native_type,
            nullable: false,
            choices: Vec::new(),
            related_model: None,
            filter_config: None,
        }
    }

    /// Creates a foreign key to `model`.
    pub fn foreign_key(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(name, NativeType::ForeignKey).related_to(model)
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = choices;
        self
    }

    pub fn related_to(mut self, model: impl Into<String>) -> Self {
        self.related_model = Some(model.into());
        self
    }

    pub fn with_filter_config(mut self, config: FieldFilterConfig) -> Self {
        self.filter_config = Some(config);
        self
    }

    /// Returns true if the field points at another model.
    pub fn is_relation(&self) -> bool {
        self.native_type.is_relation()
    }

    /// Returns true if the field declares enum choices.
    pub fn has_choices(&self) -> bool {
        !self.choices.is_empty()
    }
}
