//! Statement execution and row decoding for SQLite.
//!
//! SQLite values carry their storage class at runtime, which decides the
//! decoded [`Value`]. Columns declared `DATE`/`DATETIME` hold text in CDM
//! loads and are parsed into temporal values when the text allows it;
//! `BOOLEAN` columns hold integers.

use crate::models::{Row, Value};
use crate::query::Statement;
use crate::results::{RowStream, parse_temporal};
use crate::{OmopError, Result};
use futures::StreamExt;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Column, Executor, Row as _, SqlitePool, Statement as _, TypeInfo, ValueRef};

/// Executes a statement on a connection owned by the returned stream.
///
/// Rows are decoded one at a time as the stream is polled. The stream stops
/// after the first error it yields.
pub async fn fetch(pool: &SqlitePool, statement: &Statement) -> Result<RowStream> {
    let mut conn = pool
        .acquire()
        .await
        .map_err(|e| OmopError::connection_failed("cannot acquire SQLite connection", e))?;
    let Statement { sql, params } = statement.clone();

    let rows = async_stream::stream! {
        let query = params.iter().fold(sqlx::query(&sql), bind_value);
        let mut rows = query.fetch(&mut *conn);
        while let Some(next) = rows.next().await {
            let decoded = next
                .map_err(|e| OmopError::query_failed("SQLite statement failed", e))
                .and_then(|row| decode_row(&row));
            let failed = decoded.is_err();
            yield decoded;
            if failed {
                break;
            }
        }
    };
    Ok(rows.boxed())
}

/// Column names of a statement, from SQLite's prepared statement metadata.
pub async fn describe(pool: &SqlitePool, sql: &str) -> Result<Vec<String>> {
    let prepared = pool
        .prepare(sql)
        .await
        .map_err(|e| OmopError::query_failed("SQLite could not prepare statement", e))?;
    Ok(prepared
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect())
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::Integer(v) => query.bind(*v),
        Value::Real(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
        Value::Date(v) => query.bind(*v),
        Value::DateTime(v) => query.bind(*v),
        Value::Blob(v) => query.bind(v.clone()),
    }
}

/// Decodes one row into values, in column order.
pub fn decode_row(row: &SqliteRow) -> Result<Row> {
    row.columns()
        .iter()
        .map(|column| decode_cell(row, column.ordinal(), column.name(), column.type_info().name()))
        .collect()
}

fn decode_cell(row: &SqliteRow, index: usize, name: &str, declared: &str) -> Result<Value> {
    let raw = row
        .try_get_raw(index)
        .map_err(|e| OmopError::decode_column(name, e))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage = raw.type_info().name().to_string();

    let value = match storage.as_str() {
        "INTEGER" => {
            let v: i64 = row
                .try_get(index)
                .map_err(|e| OmopError::decode_column(name, e))?;
            if declared.eq_ignore_ascii_case("BOOLEAN") {
                Value::Bool(v != 0)
            } else {
                Value::Integer(v)
            }
        }
        "REAL" => Value::Real(
            row.try_get(index)
                .map_err(|e| OmopError::decode_column(name, e))?,
        ),
        "BLOB" => Value::Blob(
            row.try_get(index)
                .map_err(|e| OmopError::decode_column(name, e))?,
        ),
        _ => {
            let text: String = row
                .try_get_unchecked(index)
                .map_err(|e| OmopError::decode_column(name, e))?;
            if matches!(declared.to_ascii_uppercase().as_str(), "DATE" | "DATETIME" | "TIMESTAMP") {
                parse_temporal(&text).unwrap_or(Value::Text(text))
            } else {
                Value::Text(text)
            }
        }
    };
    Ok(value)
}
