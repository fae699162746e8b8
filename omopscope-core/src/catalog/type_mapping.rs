//! Declared column types to [`DataType`].
//!
//! SQLite types follow the affinity rules: a declared type containing
//! "INT" is an integer, "CHAR"/"CLOB"/"TEXT" is text, "BLOB" or nothing is
//! binary, "REAL"/"FLOA"/"DOUB" is real, anything else numeric. Date and
//! boolean names are recognized first since CDM loaders declare them.

use crate::models::DataType;

/// Maps a SQLite declared type.
///
/// # Example
/// ```rust
/// use omopscope_core::catalog::type_mapping::map_sqlite_type;
/// use omopscope_core::models::DataType;
///
/// assert_eq!(map_sqlite_type("VARCHAR(255)"), DataType::Text);
/// assert_eq!(map_sqlite_type("date"), DataType::Date);
/// ```
pub fn map_sqlite_type(declared: &str) -> DataType {
    let upper = declared.trim().to_uppercase();
    let base = upper.split('(').next().unwrap_or("").trim();

    match base {
        "" => return DataType::Binary,
        "DATE" => return DataType::Date,
        "DATETIME" | "TIMESTAMP" => return DataType::DateTime,
        "TIME" => return DataType::Time,
        "BOOLEAN" | "BOOL" => return DataType::Boolean,
        _ => {}
    }

    if base.contains("INT") {
        DataType::Integer
    } else if base.contains("CHAR") || base.contains("CLOB") || base.contains("TEXT") {
        DataType::Text
    } else if base.contains("BLOB") {
        DataType::Binary
    } else if base.contains("REAL") || base.contains("FLOA") || base.contains("DOUB") {
        DataType::Real
    } else {
        DataType::Numeric
    }
}

/// Maps a PostgreSQL type as reported by `information_schema.columns`.
pub fn map_postgres_type(data_type: &str) -> DataType {
    match data_type.to_lowercase().as_str() {
        "smallint" | "integer" | "bigint" | "int2" | "int4" | "int8" => DataType::Integer,
        "real" | "double precision" | "float4" | "float8" => DataType::Real,
        "numeric" | "decimal" => DataType::Numeric,
        "text" | "character varying" | "character" | "varchar" | "bpchar" | "name" => {
            DataType::Text
        }
        "boolean" | "bool" => DataType::Boolean,
        "date" => DataType::Date,
        "timestamp without time zone" | "timestamp with time zone" | "timestamp"
        | "timestamptz" => DataType::DateTime,
        "time without time zone" | "time with time zone" | "time" => DataType::Time,
        "bytea" => DataType::Binary,
        other => DataType::Other(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_affinity() {
        assert_eq!(map_sqlite_type("INTEGER"), DataType::Integer);
        assert_eq!(map_sqlite_type("bigint"), DataType::Integer);
        assert_eq!(map_sqlite_type("VARCHAR(50)"), DataType::Text);
        assert_eq!(map_sqlite_type("CLOB"), DataType::Text);
        assert_eq!(map_sqlite_type(""), DataType::Binary);
        assert_eq!(map_sqlite_type("DOUBLE PRECISION"), DataType::Real);
        assert_eq!(map_sqlite_type("DECIMAL(10,2)"), DataType::Numeric);
    }

    #[test]
    fn test_sqlite_temporal_names() {
        assert_eq!(map_sqlite_type("DATE"), DataType::Date);
        assert_eq!(map_sqlite_type("datetime"), DataType::DateTime);
        assert_eq!(map_sqlite_type("TIMESTAMP"), DataType::DateTime);
        assert_eq!(map_sqlite_type("BOOLEAN"), DataType::Boolean);
    }

    #[test]
    fn test_postgres_types() {
        assert_eq!(map_postgres_type("integer"), DataType::Integer);
        assert_eq!(map_postgres_type("character varying"), DataType::Text);
        assert_eq!(
            map_postgres_type("timestamp without time zone"),
            DataType::DateTime
        );
        assert_eq!(
            map_postgres_type("jsonb"),
            DataType::Other("jsonb".to_string())
        );
    }
}
