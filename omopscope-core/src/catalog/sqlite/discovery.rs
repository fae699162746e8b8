//! Table reflection for SQLite.
//!
//! Every database on the connection except `temp` is scanned, so tables in
//! attached files show up next to those in `main`. Column and foreign key
//! metadata come from the `pragma_table_info` and `pragma_foreign_key_list`
//! table-valued functions.

use crate::catalog::type_mapping::map_sqlite_type;
use crate::models::{ColumnDescriptor, ForeignKey, TableHandle};
use crate::query::Dialect;
use crate::{OmopError, Result};
use sqlx::{Row, SqlitePool};
use std::time::Instant;

/// Reflects all user tables across `main` and attached databases.
pub async fn discover_tables(pool: &SqlitePool) -> Result<Vec<TableHandle>> {
    let start = Instant::now();
    let schemas = list_schemas(pool).await?;
    let mut tables = Vec::new();

    for schema in &schemas {
        for name in list_tables(pool, schema).await? {
            let columns = collect_columns(pool, schema, &name).await?;
            let foreign_keys = collect_foreign_keys(pool, schema, &name).await?;
            tracing::debug!(
                "Reflected {}.{} ({} columns, {} foreign keys)",
                schema,
                name,
                columns.len(),
                foreign_keys.len()
            );
            tables.push(TableHandle {
                name,
                schema: Some(schema.clone()),
                columns,
                foreign_keys,
                synthetic_primary_key: false,
            });
        }
    }

    tracing::info!(
        "Reflected {} SQLite tables across {} schemas in {:?}",
        tables.len(),
        schemas.len(),
        start.elapsed()
    );
    Ok(tables)
}

async fn list_schemas(pool: &SqlitePool) -> Result<Vec<String>> {
    let rows = sqlx::query("SELECT name FROM pragma_database_list WHERE name <> 'temp' ORDER BY seq")
        .fetch_all(pool)
        .await
        .map_err(|e| OmopError::discovery_failed("Failed to list SQLite databases", e))?;

    rows.iter()
        .map(|row| {
            row.try_get::<String, _>("name")
                .map_err(|e| OmopError::discovery_failed("Failed to read database name", e))
        })
        .collect()
}

async fn list_tables(pool: &SqlitePool, schema: &str) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT name FROM {}.sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
         ORDER BY name",
        Dialect::Sqlite.quote_ident(schema)
    );

    let rows = sqlx::query(&sql).fetch_all(pool).await.map_err(|e| {
        OmopError::discovery_failed(format!("Failed to list tables in schema '{}'", schema), e)
    })?;

    rows.iter()
        .map(|row| {
            row.try_get::<String, _>("name")
                .map_err(|e| OmopError::discovery_failed("Failed to read table name", e))
        })
        .collect()
}

async fn collect_columns(
    pool: &SqlitePool,
    schema: &str,
    table: &str,
) -> Result<Vec<ColumnDescriptor>> {
    let rows = sqlx::query(
        "SELECT name, type, \"notnull\", pk FROM pragma_table_info(?, ?) ORDER BY cid",
    )
    .bind(table)
    .bind(schema)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        OmopError::discovery_failed(format!("Failed to read columns of '{}.{}'", schema, table), e)
    })?;

    let context = |e: sqlx::Error| OmopError::discovery_failed(format!("Malformed column info for '{}'", table), e);

    rows.iter()
        .map(|row| -> Result<ColumnDescriptor> {
            let name: String = row.try_get("name").map_err(context)?;
            let declared_type: String = row.try_get("type").map_err(context)?;
            let not_null: i64 = row.try_get("notnull").map_err(context)?;
            let pk: i64 = row.try_get("pk").map_err(context)?;

            Ok(ColumnDescriptor {
                name,
                data_type: map_sqlite_type(&declared_type),
                declared_type,
                nullable: not_null == 0 && pk == 0,
                primary_key: pk > 0,
            })
        })
        .collect()
}

async fn collect_foreign_keys(
    pool: &SqlitePool,
    schema: &str,
    table: &str,
) -> Result<Vec<ForeignKey>> {
    let rows = sqlx::query(
        "SELECT \"from\", \"table\", \"to\" FROM pragma_foreign_key_list(?, ?) ORDER BY id, seq",
    )
    .bind(table)
    .bind(schema)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        OmopError::discovery_failed(
            format!("Failed to read foreign keys of '{}.{}'", schema, table),
            e,
        )
    })?;

    let context =
        |e: sqlx::Error| OmopError::discovery_failed(format!("Malformed foreign key info for '{}'", table), e);

    rows.iter()
        .map(|row| -> Result<ForeignKey> {
            let column: String = row.try_get("from").map_err(context)?;
            let referenced_table: String = row.try_get("table").map_err(context)?;
            // NULL when the reference targets the parent's primary key implicitly
            let referenced_column: Option<String> = row.try_get("to").map_err(context)?;

            Ok(ForeignKey {
                referenced_column: referenced_column.unwrap_or_else(|| column.clone()),
                column,
                referenced_table,
            })
        })
        .collect()
}
