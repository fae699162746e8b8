//! Statement execution and row decoding for PostgreSQL.

use crate::models::{Row, Value};
use crate::query::Statement;
use crate::results::RowStream;
use crate::{OmopError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use futures::StreamExt;
use sqlx::postgres::{PgArguments, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::types::BigDecimal;
use sqlx::{Column, Executor, PgPool, Row as _, Statement as _, TypeInfo, ValueRef};

/// Executes a statement on a connection owned by the returned stream.
///
/// Rows are decoded as they arrive; the stream stops after its first error.
pub async fn fetch(pool: &PgPool, statement: &Statement) -> Result<RowStream> {
    let mut conn = pool
        .acquire()
        .await
        .map_err(|e| OmopError::connection_failed("cannot acquire PostgreSQL connection", e))?;
    let Statement { sql, params } = statement.clone();

    let rows = async_stream::stream! {
        let query = params.iter().fold(sqlx::query(&sql), bind_value);
        let mut rows = query.fetch(&mut *conn);
        while let Some(next) = rows.next().await {
            let decoded = next
                .map_err(|e| OmopError::query_failed("PostgreSQL statement failed", e))
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

/// Column names of a parameterless statement, from the server's describe.
pub async fn describe(pool: &PgPool, sql: &str) -> Result<Vec<String>> {
    let prepared = pool
        .prepare(sql)
        .await
        .map_err(|e| OmopError::query_failed("PostgreSQL could not prepare statement", e))?;
    Ok(prepared
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect())
}

fn bind_value<'q>(query: Query<'q, Postgres, PgArguments>, value: &Value) -> Query<'q, Postgres, PgArguments> {
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
pub fn decode_row(row: &PgRow) -> Result<Row> {
    row.columns()
        .iter()
        .map(|column| decode_cell(row, column.ordinal(), column.name(), column.type_info().name()))
        .collect()
}

fn decode_cell(row: &PgRow, index: usize, name: &str, type_name: &str) -> Result<Value> {
    let raw = row
        .try_get_raw(index)
        .map_err(|e| OmopError::decode_column(name, e))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let err = |e: sqlx::Error| OmopError::decode_column(name, e);
    let value = match type_name {
        "INT2" => Value::Integer(i64::from(row.try_get::<i16, _>(index).map_err(err)?)),
        "INT4" => Value::Integer(i64::from(row.try_get::<i32, _>(index).map_err(err)?)),
        "INT8" => Value::Integer(row.try_get::<i64, _>(index).map_err(err)?),
        "FLOAT4" => Value::Real(f64::from(row.try_get::<f32, _>(index).map_err(err)?)),
        "FLOAT8" => Value::Real(row.try_get::<f64, _>(index).map_err(err)?),
        "NUMERIC" => numeric(row.try_get::<BigDecimal, _>(index).map_err(err)?),
        "BOOL" => Value::Bool(row.try_get::<bool, _>(index).map_err(err)?),
        "DATE" => Value::Date(row.try_get::<NaiveDate, _>(index).map_err(err)?),
        "TIMESTAMP" => Value::DateTime(row.try_get::<NaiveDateTime, _>(index).map_err(err)?),
        "TIMESTAMPTZ" => Value::DateTime(
            row.try_get::<DateTime<Utc>, _>(index)
                .map_err(err)?
                .naive_utc(),
        ),
        "BYTEA" => Value::Blob(row.try_get::<Vec<u8>, _>(index).map_err(err)?),
        _ => Value::Text(row.try_get::<String, _>(index).map_err(err)?),
    };
    Ok(value)
}

/// Integral numerics stay integers; everything else becomes a float.
fn numeric(value: BigDecimal) -> Value {
    let text = value.to_string();
    if let Ok(v) = text.parse::<i64>() {
        return Value::Integer(v);
    }
    text.parse::<f64>().map(Value::Real).unwrap_or(Value::Text(text))
}
