//! Target entity model: semantic type tags, column specs and entity schemas.
//!
//! A [`SemanticType`] is the closed set of value kinds the normalizer knows how
//! to produce. A [`DeclaredType`] pairs a tag with the optional wrapper flag
//! (`int32?`), which together decide column nullability. [`ColumnSpec`] and
//! [`EntitySchema`] describe one target storage entity and are immutable once
//! registered.

use std::{fmt, str::FromStr};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use uuid::Uuid;

use crate::{
    data::Value,
    error::{IngestError, Result},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SemanticType {
    Text,
    Int32,
    Int64,
    Decimal,
    Double,
    Boolean,
    DateTime,
    Date,
    Time,
    Guid,
    Other(String),
}

impl SemanticType {
    pub fn as_str(&self) -> &str {
        match self {
            SemanticType::Text => "text",
            SemanticType::Int32 => "int32",
            SemanticType::Int64 => "int64",
            SemanticType::Decimal => "decimal",
            SemanticType::Double => "double",
            SemanticType::Boolean => "boolean",
            SemanticType::DateTime => "datetime",
            SemanticType::Date => "date",
            SemanticType::Time => "time",
            SemanticType::Guid => "guid",
            SemanticType::Other(name) => name.as_str(),
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &[
            "text",
            "int32",
            "int64",
            "decimal",
            "double",
            "boolean",
            "datetime",
            "date",
            "time",
            "guid",
            "other:<name>",
        ]
    }

    /// Reference-like types accept nulls even without the optional wrapper.
    pub fn is_reference_like(&self) -> bool {
        matches!(self, SemanticType::Text | SemanticType::Other(_))
    }

    /// Value substituted for a null cell in a non-nullable column.
    pub fn default_value(&self) -> Value {
        match self {
            SemanticType::Text | SemanticType::Other(_) => Value::Text(String::new()),
            SemanticType::Int32 => Value::Int32(0),
            SemanticType::Int64 => Value::Int64(0),
            SemanticType::Decimal => Value::Decimal(Decimal::ZERO),
            SemanticType::Double => Value::Double(0.0),
            SemanticType::Boolean => Value::Boolean(false),
            SemanticType::DateTime => Value::DateTime(min_date().and_time(NaiveTime::MIN)),
            SemanticType::Date => Value::Date(min_date()),
            SemanticType::Time => Value::Time(NaiveTime::MIN),
            SemanticType::Guid => Value::Guid(Uuid::nil()),
        }
    }

    /// SQLite column type used when creating target tables. Decimals are kept as
    /// text so no precision is lost to REAL conversion.
    pub fn storage_affinity(&self) -> &'static str {
        match self {
            SemanticType::Int32 | SemanticType::Int64 | SemanticType::Boolean => "INTEGER",
            SemanticType::Double => "REAL",
            SemanticType::Text
            | SemanticType::Decimal
            | SemanticType::DateTime
            | SemanticType::Date
            | SemanticType::Time
            | SemanticType::Guid
            | SemanticType::Other(_) => "TEXT",
        }
    }
}

/// Smallest date the storage layer round-trips (0001-01-01).
pub fn min_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Smallest date-time the storage layer round-trips (0001-01-01 00:00:00).
pub fn min_datetime() -> NaiveDateTime {
    min_date().and_time(NaiveTime::MIN)
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SemanticType {
    type Err = IngestError;

    fn from_str(value: &str) -> Result<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "text" | "string" => Ok(SemanticType::Text),
            "int32" | "int" | "integer" => Ok(SemanticType::Int32),
            "int64" | "long" | "bigint" => Ok(SemanticType::Int64),
            "decimal" | "money" => Ok(SemanticType::Decimal),
            "double" | "float" => Ok(SemanticType::Double),
            "boolean" | "bool" => Ok(SemanticType::Boolean),
            "datetime" | "date-time" | "timestamp" => Ok(SemanticType::DateTime),
            "date" | "dateonly" => Ok(SemanticType::Date),
            "time" | "timeonly" => Ok(SemanticType::Time),
            "guid" | "uuid" => Ok(SemanticType::Guid),
            other => match other.strip_prefix("other:") {
                Some(name) if !name.trim().is_empty() => {
                    Ok(SemanticType::Other(name.trim().to_string()))
                }
                _ => Err(IngestError::registry(format!(
                    "unknown column type '{value}'. Supported types: {}",
                    SemanticType::variants().join(", ")
                ))),
            },
        }
    }
}

/// Semantic type plus the optional wrapper marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredType {
    pub semantic: SemanticType,
    pub optional: bool,
}

impl DeclaredType {
    pub fn required(semantic: SemanticType) -> Self {
        Self {
            semantic,
            optional: false,
        }
    }

    pub fn optional(semantic: SemanticType) -> Self {
        Self {
            semantic,
            optional: true,
        }
    }

    pub fn is_nullable(&self) -> bool {
        self.optional || self.semantic.is_reference_like()
    }

    pub fn token(&self) -> String {
        let base = match &self.semantic {
            SemanticType::Other(name) => format!("other:{name}"),
            other => other.as_str().to_string(),
        };
        if self.optional {
            format!("{base}?")
        } else {
            base
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

impl FromStr for DeclaredType {
    type Err = IngestError;

    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        match trimmed.strip_suffix('?') {
            Some(inner) => Ok(DeclaredType::optional(inner.parse()?)),
            None => Ok(DeclaredType::required(trimmed.parse()?)),
        }
    }
}

impl Serialize for DeclaredType {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.token())
    }
}

impl<'de> Deserialize<'de> for DeclaredType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        DeclaredType::from_str(&token).map_err(|err| de::Error::custom(err.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnSpec {
    pub property: String,
    #[serde(
        default,
        rename = "column",
        skip_serializing_if = "Option::is_none"
    )]
    pub storage_column: Option<String>,
    #[serde(rename = "type")]
    pub declared_type: DeclaredType,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(default, rename = "key", skip_serializing_if = "is_false")]
    pub is_key: bool,
    #[serde(default, rename = "identity", skip_serializing_if = "is_false")]
    pub generated_identity: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub indexed: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ColumnSpec {
    pub fn new(property: impl Into<String>, declared_type: DeclaredType) -> Self {
        Self {
            property: property.into(),
            storage_column: None,
            declared_type,
            required: false,
            is_key: false,
            generated_identity: false,
            max_length: None,
            indexed: false,
        }
    }

    /// Generated integer identity key.
    pub fn identity(property: impl Into<String>) -> Self {
        let mut spec = Self::new(property, DeclaredType::required(SemanticType::Int64));
        spec.is_key = true;
        spec.generated_identity = true;
        spec
    }

    pub fn with_storage_column(mut self, column: impl Into<String>) -> Self {
        self.storage_column = Some(column.into());
        self
    }

    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn storage_name(&self) -> &str {
        self.storage_column
            .as_deref()
            .filter(|value| !value.is_empty())
            .unwrap_or(&self.property)
    }

    pub fn semantic_type(&self) -> &SemanticType {
        &self.declared_type.semantic
    }

    pub fn is_nullable(&self) -> bool {
        self.declared_type.is_nullable()
    }

    pub fn matches_property(&self, name: &str) -> bool {
        self.property.eq_ignore_ascii_case(name.trim())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntitySchema {
    #[serde(rename = "schema")]
    pub namespace: String,
    pub table: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sheets: Vec<String>,
    pub columns: Vec<ColumnSpec>,
}

impl EntitySchema {
    pub fn new(namespace: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            table: table.into(),
            sheets: Vec::new(),
            columns: Vec::new(),
        }
    }

    pub fn from_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheets.push(sheet.into());
        self
    }

    pub fn column(mut self, spec: ColumnSpec) -> Self {
        self.columns.push(spec);
        self
    }

    pub fn qualified_name(&self) -> String {
        if self.namespace.is_empty() {
            self.table.clone()
        } else {
            format!("{}.{}", self.namespace, self.table)
        }
    }

    pub fn column_spec(&self, property: &str) -> Option<&ColumnSpec> {
        self.columns
            .iter()
            .find(|column| column.matches_property(property))
    }

    pub fn properties(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| column.property.clone())
            .collect()
    }

    pub fn identity_column(&self) -> Option<&ColumnSpec> {
        self.columns.iter().find(|column| column.generated_identity)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.table.trim().is_empty() {
            return Err(IngestError::registry("entity table name must not be empty"));
        }
        let name = self.qualified_name();
        if self.columns.is_empty() {
            return Err(IngestError::registry(format!(
                "entity '{name}' declares no columns"
            )));
        }
        for (idx, column) in self.columns.iter().enumerate() {
            if column.property.trim().is_empty() {
                return Err(IngestError::registry(format!(
                    "entity '{name}' column {} has an empty property name",
                    idx + 1
                )));
            }
            if self.columns[..idx]
                .iter()
                .any(|earlier| earlier.matches_property(&column.property))
            {
                return Err(IngestError::registry(format!(
                    "entity '{name}' declares property '{}' more than once",
                    column.property
                )));
            }
            if column.generated_identity
                && !matches!(
                    column.semantic_type(),
                    SemanticType::Int32 | SemanticType::Int64
                )
            {
                return Err(IngestError::registry(format!(
                    "entity '{name}' identity column '{}' must be int32 or int64",
                    column.property
                )));
            }
        }
        if self
            .columns
            .iter()
            .filter(|column| column.generated_identity)
            .count()
            > 1
        {
            return Err(IngestError::registry(format!(
                "entity '{name}' declares more than one identity column"
            )));
        }
        Ok(())
    }
}
