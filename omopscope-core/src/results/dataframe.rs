//! Conversion of [`Table`] into a polars `DataFrame`.
//!
//! Each column's polars type follows its first non-null value. Columns with
//! mixed value kinds become string columns.

use super::Table;
use crate::models::Value;
use crate::{OmopError, Result};
use chrono::NaiveDate;
use polars::prelude::{Column, DataFrame, DataType, NamedFrom, Series, TimeUnit};

#[derive(Clone, Copy, PartialEq)]
enum Kind {
    Bool,
    Integer,
    Real,
    Text,
    Date,
    DateTime,
}

fn kind_of(value: &Value) -> Option<Kind> {
    match value {
        Value::Null => None,
        Value::Bool(_) => Some(Kind::Bool),
        Value::Integer(_) => Some(Kind::Integer),
        Value::Real(_) => Some(Kind::Real),
        Value::Text(_) | Value::Blob(_) => Some(Kind::Text),
        Value::Date(_) => Some(Kind::Date),
        Value::DateTime(_) => Some(Kind::DateTime),
    }
}

fn column_kind(values: &[Value]) -> Kind {
    let mut kinds = values.iter().filter_map(kind_of);
    let Some(first) = kinds.next() else {
        return Kind::Text;
    };
    match kinds.try_fold(first, |acc, k| match (acc, k) {
        (a, b) if a == b => Some(a),
        (Kind::Integer, Kind::Real) | (Kind::Real, Kind::Integer) => Some(Kind::Real),
        (Kind::Date, Kind::DateTime) | (Kind::DateTime, Kind::Date) => Some(Kind::DateTime),
        _ => None,
    }) {
        Some(kind) => kind,
        None => Kind::Text,
    }
}

fn to_series(name: &str, values: &[Value]) -> Result<Series> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
        .ok_or_else(|| OmopError::configuration("Invalid epoch date"))?;

    let series = match column_kind(values) {
        Kind::Bool => Series::new(
            name.into(),
            values
                .iter()
                .map(|v| match v {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        ),
        Kind::Integer => Series::new(
            name.into(),
            values.iter().map(Value::as_i64).collect::<Vec<_>>(),
        ),
        Kind::Real => Series::new(
            name.into(),
            values.iter().map(Value::as_f64).collect::<Vec<_>>(),
        ),
        Kind::Text => Series::new(
            name.into(),
            values
                .iter()
                .map(|v| (!v.is_null()).then(|| v.to_string()))
                .collect::<Vec<_>>(),
        ),
        Kind::Date => {
            let days: Vec<Option<i32>> = values
                .iter()
                .map(|v| {
                    v.as_date()
                        .and_then(|d| i32::try_from((d - epoch).num_days()).ok())
                })
                .collect();
            Series::new(name.into(), days)
                .cast(&DataType::Date)
                .map_err(|e| OmopError::query_failed(format!("Failed to build date column '{}'", name), e))?
        }
        Kind::DateTime => {
            let micros: Vec<Option<i64>> = values
                .iter()
                .map(|v| match v {
                    Value::DateTime(dt) => Some(dt.and_utc().timestamp_micros()),
                    Value::Date(d) => Some(d.and_time(chrono::NaiveTime::MIN).and_utc().timestamp_micros()),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), micros)
                .cast(&DataType::Datetime(TimeUnit::Microseconds, None))
                .map_err(|e| {
                    OmopError::query_failed(format!("Failed to build datetime column '{}'", name), e)
                })?
        }
    };
    Ok(series)
}

impl Table {
    /// Converts the table into a polars `DataFrame`.
    pub fn into_polars(self) -> Result<DataFrame> {
        let columns = self
            .column_names()
            .iter()
            .map(|name| {
                let values = self.column(name).unwrap_or_default();
                to_series(name, values).map(Column::from)
            })
            .collect::<Result<Vec<_>>>()?;

        DataFrame::new(columns)
            .map_err(|e| OmopError::query_failed("Failed to assemble DataFrame", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_polars_types() {
        let table = Table::from_rows(
            vec!["person_id".into(), "birth_date".into(), "source".into()],
            vec![
                vec![
                    Value::Integer(1),
                    Value::Date(NaiveDate::from_ymd_opt(1980, 5, 1).unwrap()),
                    Value::Text("a".into()),
                ],
                vec![Value::Integer(2), Value::Null, Value::Integer(7)],
            ],
        );

        let df = table.into_polars().unwrap();
        assert_eq!(df.shape(), (2, 3));
        assert_eq!(df.column("person_id").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("birth_date").unwrap().dtype(), &DataType::Date);
        assert_eq!(df.column("source").unwrap().dtype(), &DataType::String);
    }
}
