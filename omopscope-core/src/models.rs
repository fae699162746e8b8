//! Data model shared by the catalog, the query builders and result handling.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Supported database backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatabaseType {
    PostgreSQL,
    SQLite,
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseType::PostgreSQL => write!(f, "PostgreSQL"),
            DatabaseType::SQLite => write!(f, "SQLite"),
        }
    }
}

/// The six fixed partitions of the CDM table set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableCategory {
    /// Standardized vocabularies (concept, concept_ancestor, ...)
    Vocabulary,
    /// CDM metadata (cdm_source, metadata)
    Metadata,
    /// Standardized clinical data (person, condition_occurrence, ...)
    Clinical,
    /// Standardized health system data (location, care_site, provider)
    HealthSystem,
    /// Standardized health economics (payer_plan_period, cost)
    HealthEconomic,
    /// Standardized derived elements (cohort, *_era)
    Derived,
}

impl TableCategory {
    /// All categories in display order.
    pub const ALL: [TableCategory; 6] = [
        TableCategory::Clinical,
        TableCategory::Vocabulary,
        TableCategory::Derived,
        TableCategory::HealthSystem,
        TableCategory::HealthEconomic,
        TableCategory::Metadata,
    ];

    /// Snake-case name used on the command line and in JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            TableCategory::Vocabulary => "vocabulary",
            TableCategory::Metadata => "metadata",
            TableCategory::Clinical => "clinical",
            TableCategory::HealthSystem => "health_system",
            TableCategory::HealthEconomic => "health_economic",
            TableCategory::Derived => "derived",
        }
    }
}

impl fmt::Display for TableCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableCategory {
    type Err = crate::OmopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "vocabulary" => Ok(TableCategory::Vocabulary),
            "metadata" => Ok(TableCategory::Metadata),
            "clinical" => Ok(TableCategory::Clinical),
            "health_system" => Ok(TableCategory::HealthSystem),
            "health_economic" => Ok(TableCategory::HealthEconomic),
            "derived" | "derived_element" => Ok(TableCategory::Derived),
            other => Err(crate::OmopError::configuration(format!(
                "Unknown table category '{}'",
                other
            ))),
        }
    }
}

/// Normalized column type, mapped from the backend's declared type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Integer,
    Real,
    Numeric,
    Text,
    Boolean,
    Date,
    DateTime,
    Time,
    Binary,
    /// Declared type the mapper does not recognize
    Other(String),
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => f.write_str("integer"),
            DataType::Real => f.write_str("real"),
            DataType::Numeric => f.write_str("numeric"),
            DataType::Text => f.write_str("text"),
            DataType::Boolean => f.write_str("boolean"),
            DataType::Date => f.write_str("date"),
            DataType::DateTime => f.write_str("datetime"),
            DataType::Time => f.write_str("time"),
            DataType::Binary => f.write_str("binary"),
            DataType::Other(name) => f.write_str(name),
        }
    }
}

/// Column metadata as reported by `column_info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Type as declared in the database
    pub declared_type: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub primary_key: bool,
}

/// Foreign key from one column to a column of another table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// A discovered relational table.
///
/// Handles are built once per discovery and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableHandle {
    pub name: String,
    /// Schema (SQLite: attached database alias) the table was found in
    pub schema: Option<String>,
    pub columns: Vec<ColumnDescriptor>,
    pub foreign_keys: Vec<ForeignKey>,
    /// True when the database declares no primary key and the first column
    /// stands in for one
    pub synthetic_primary_key: bool,
}

impl TableHandle {
    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns true if the table has a column with this name.
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Primary key column names in declaration order.
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// A single result cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Blob(Vec<u8>),
}

/// One result row, ordered like the result's columns
pub type Row = Vec<Value>;

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

impl Value {
    /// Returns true for SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer view of the cell, if it holds one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Float view of the cell; integers widen.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(*v),
            #[allow(clippy::cast_precision_loss)]
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Text view of the cell, if it holds text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Date view of the cell; datetimes are truncated.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::DateTime(dt) => Some(dt.date()),
            _ => None,
        }
    }

    /// Returns true for date and datetime cells.
    pub fn is_temporal(&self) -> bool {
        matches!(self, Value::Date(_) | Value::DateTime(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Real(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
            Value::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Value::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
            Value::Blob(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use base64::Engine;

        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Integer(v) => serializer.serialize_i64(*v),
            Value::Real(v) => serializer.serialize_f64(*v),
            Value::Text(v) => serializer.serialize_str(v),
            Value::Date(v) => serializer.collect_str(&v.format("%Y-%m-%d")),
            Value::DateTime(v) => serializer.collect_str(&v.format(DATETIME_FORMAT)),
            Value::Blob(v) => serializer.serialize_str(&format!(
                "base64:{}",
                base64::engine::general_purpose::STANDARD.encode(v)
            )),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip_names() {
        for category in TableCategory::ALL {
            assert_eq!(category.as_str().parse::<TableCategory>().unwrap(), category);
        }
        assert_eq!(
            "derived-element".parse::<TableCategory>().unwrap(),
            TableCategory::Derived
        );
        assert!("billing".parse::<TableCategory>().is_err());
    }

    #[test]
    fn test_value_json() {
        let date = NaiveDate::from_ymd_opt(2019, 3, 1).unwrap();
        let row: Row = vec![
            Value::Null,
            Value::Integer(7),
            Value::Text("Diabetes".into()),
            Value::Date(date),
            Value::DateTime(date.and_hms_opt(8, 30, 0).unwrap()),
            Value::Blob(vec![1, 2, 3]),
        ];

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                null,
                7,
                "Diabetes",
                "2019-03-01",
                "2019-03-01T08:30:00",
                "base64:AQID"
            ])
        );
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Integer(3).as_f64(), Some(3.0));
        assert_eq!(Value::Text("x".into()).as_i64(), None);
        assert!(Value::Null.is_null());
        assert!(!Value::Text("2020-01-01".into()).is_temporal());
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn test_table_handle_lookups() {
        let handle = TableHandle {
            name: "concept".into(),
            schema: Some("main".into()),
            columns: vec![ColumnDescriptor {
                name: "concept_id".into(),
                declared_type: "INTEGER".into(),
                data_type: DataType::Integer,
                nullable: false,
                primary_key: true,
            }],
            foreign_keys: Vec::new(),
            synthetic_primary_key: false,
        };

        assert!(handle.has_column("concept_id"));
        assert!(!handle.has_column("concept_name"));
        assert_eq!(handle.primary_key(), vec!["concept_id"]);
    }
}
