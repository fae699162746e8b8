//! Date column detection and coercion.

use super::Table;
use crate::models::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// How a column is recognized as holding dates.
///
/// Only decoded date or datetime values mark a column; text that merely
/// looks like a date never does. Once a column is marked, its text values
/// are parsed as well.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateDetection {
    /// Sample the first row only. A null there leaves the column untouched
    /// even when later rows hold dates.
    #[default]
    FirstRow,
    /// Sample the first non-null value of the column.
    FirstNonNull,
    /// Never coerce.
    Disabled,
}

/// Parses `YYYY-MM-DD` as a date, or the common ISO 8601 datetime shapes as
/// a datetime. Offsets are normalized to UTC.
pub fn parse_temporal(text: &str) -> Option<Value> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(Value::Date(date));
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.naive_utc())
        })
        .map(Value::DateTime)
}

fn is_temporal(value: &Value) -> bool {
    matches!(value, Value::Date(_) | Value::DateTime(_))
}

pub(super) fn coerce_date_columns(table: &mut Table, detection: DateDetection) {
    if detection == DateDetection::Disabled {
        return;
    }

    for index in 0..table.num_columns() {
        let Some(column) = table.column_mut(index) else {
            continue;
        };

        let sample = match detection {
            DateDetection::FirstRow => column.first(),
            DateDetection::FirstNonNull => column.iter().find(|v| !v.is_null()),
            DateDetection::Disabled => None,
        };
        if !sample.is_some_and(is_temporal) {
            continue;
        }

        if let Some(coerced) = coerce_column(column) {
            *column = coerced;
        }
    }
}

/// Returns `None` when any non-null value is not temporal.
fn coerce_column(column: &[Value]) -> Option<Vec<Value>> {
    let parsed = column
        .iter()
        .map(|value| match value {
            Value::Null | Value::Date(_) | Value::DateTime(_) => Some(value.clone()),
            Value::Text(text) => parse_temporal(text),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;

    let has_datetime = parsed.iter().any(|v| matches!(v, Value::DateTime(_)));
    if !has_datetime {
        return Some(parsed);
    }

    Some(
        parsed
            .into_iter()
            .map(|value| match value {
                Value::Date(date) => Value::DateTime(date.and_time(chrono::NaiveTime::MIN)),
                other => other,
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn one_column(values: Vec<Value>) -> Table {
        Table::from_rows(
            vec!["cohort_start_date".into()],
            values.into_iter().map(|v| vec![v]).collect(),
        )
    }

    #[test]
    fn test_parse_temporal() {
        assert_eq!(parse_temporal("2020-01-31"), Some(Value::Date(date(2020, 1, 31))));
        assert_eq!(
            parse_temporal("2020-01-31 08:30:00"),
            Some(Value::DateTime(date(2020, 1, 31).and_hms_opt(8, 30, 0).unwrap()))
        );
        assert_eq!(
            parse_temporal("2020-01-31T08:30:00.250"),
            Some(Value::DateTime(
                date(2020, 1, 31).and_hms_milli_opt(8, 30, 0, 250).unwrap()
            ))
        );
        assert_eq!(
            parse_temporal("2020-01-31T08:30:00+02:00"),
            Some(Value::DateTime(date(2020, 1, 31).and_hms_opt(6, 30, 0).unwrap()))
        );
        assert_eq!(parse_temporal("31/01/2020"), None);
        assert_eq!(parse_temporal("Diabetes"), None);
    }

    #[test]
    fn test_text_after_a_date_is_coerced() {
        let mut table = one_column(vec![
            Value::Date(date(2020, 1, 1)),
            Value::Null,
            Value::Text("2021-06-15".into()),
        ]);
        coerce_date_columns(&mut table, DateDetection::FirstRow);
        assert_eq!(
            table.column("cohort_start_date").unwrap(),
            &[Value::Date(date(2020, 1, 1)), Value::Null, Value::Date(date(2021, 6, 15))]
        );
    }

    #[test]
    fn test_date_shaped_text_does_not_mark_a_column() {
        let values = vec![Value::Text("2020-01-01".into()), Value::Text("2021-06-15".into())];
        for detection in [DateDetection::FirstRow, DateDetection::FirstNonNull] {
            let mut table = one_column(values.clone());
            coerce_date_columns(&mut table, detection);
            assert_eq!(table.column("cohort_start_date").unwrap(), values.as_slice());
        }
    }

    #[test]
    fn test_first_row_null_suppresses_coercion() {
        let values = vec![
            Value::Null,
            Value::Date(date(2020, 1, 1)),
            Value::Text("2020-02-01".into()),
        ];
        let mut table = one_column(values.clone());
        coerce_date_columns(&mut table, DateDetection::FirstRow);
        assert_eq!(table.column("cohort_start_date").unwrap(), values.as_slice());

        coerce_date_columns(&mut table, DateDetection::FirstNonNull);
        assert_eq!(
            table.get(2, "cohort_start_date"),
            Some(&Value::Date(date(2020, 2, 1)))
        );
    }

    #[test]
    fn test_unparseable_value_leaves_column_unchanged() {
        let values = vec![Value::Date(date(2020, 1, 1)), Value::Text("unknown".into())];
        let mut table = one_column(values.clone());
        coerce_date_columns(&mut table, DateDetection::FirstRow);
        assert_eq!(table.column("cohort_start_date").unwrap(), values.as_slice());
    }

    #[test]
    fn test_mixed_precision_promotes_to_datetime() {
        let mut table = one_column(vec![
            Value::Date(date(2020, 1, 1)),
            Value::Text("2020-01-02 12:00:00".into()),
        ]);
        coerce_date_columns(&mut table, DateDetection::FirstRow);
        assert_eq!(
            table.get(0, "cohort_start_date"),
            Some(&Value::DateTime(date(2020, 1, 1).and_hms_opt(0, 0, 0).unwrap()))
        );
    }

    #[test]
    fn test_non_date_columns_untouched() {
        let mut table = one_column(vec![Value::Integer(2020), Value::Text("2020-01-01".into())]);
        coerce_date_columns(&mut table, DateDetection::FirstRow);
        assert_eq!(table.get(0, "cohort_start_date"), Some(&Value::Integer(2020)));
    }
}
