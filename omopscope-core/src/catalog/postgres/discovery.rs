//! Table reflection for PostgreSQL.
//!
//! Columns, primary keys and foreign keys are read with one
//! `information_schema` query each, across all non-system schemas, and
//! grouped client-side. `information_schema` columns use domain types, so
//! every selected column is cast to a plain type.

use crate::catalog::type_mapping::map_postgres_type;
use crate::models::{ColumnDescriptor, ForeignKey, TableHandle};
use crate::{OmopError, Result};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

const SYSTEM_SCHEMA_FILTER: &str = "NOT IN ('pg_catalog', 'information_schema') \
     AND {schema} NOT LIKE 'pg\\_toast%' AND {schema} NOT LIKE 'pg\\_temp%'";

type TableKey = (String, String);

fn schema_filter(column: &str) -> String {
    format!(
        "{} {}",
        column,
        SYSTEM_SCHEMA_FILTER.replace("{schema}", column)
    )
}

/// Reflects every base table outside the system schemas.
pub async fn discover_tables(pool: &PgPool) -> Result<Vec<TableHandle>> {
    let start = Instant::now();

    let mut tables = collect_columns(pool).await?;
    let primary_keys = collect_primary_keys(pool).await?;
    let foreign_keys = collect_foreign_keys(pool).await?;

    for ((schema, name), table) in &mut tables {
        for column in &mut table.columns {
            if primary_keys.contains(&(schema.clone(), name.clone(), column.name.clone())) {
                column.primary_key = true;
                column.nullable = false;
            }
        }
        if let Some(fks) = foreign_keys.get(&(schema.clone(), name.clone())) {
            table.foreign_keys = fks.clone();
        }
        tracing::debug!(
            "Reflected {}.{} ({} columns, {} foreign keys)",
            schema,
            name,
            table.columns.len(),
            table.foreign_keys.len()
        );
    }

    tracing::info!(
        "Reflected {} PostgreSQL tables in {:?}",
        tables.len(),
        start.elapsed()
    );
    Ok(tables.into_values().collect())
}

async fn collect_columns(pool: &PgPool) -> Result<BTreeMap<TableKey, TableHandle>> {
    let sql = format!(
        "SELECT c.table_schema::text AS table_schema, \
                c.table_name::text AS table_name, \
                c.column_name::text AS column_name, \
                c.data_type::text AS data_type, \
                c.udt_name::text AS udt_name, \
                c.is_nullable::text AS is_nullable \
         FROM information_schema.columns c \
         JOIN information_schema.tables t \
           ON t.table_schema = c.table_schema AND t.table_name = c.table_name \
         WHERE t.table_type = 'BASE TABLE' AND {} \
         ORDER BY c.table_schema, c.table_name, c.ordinal_position",
        schema_filter("c.table_schema")
    );

    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .map_err(|e| OmopError::discovery_failed("Failed to read information_schema.columns", e))?;

    let mut tables: BTreeMap<TableKey, TableHandle> = BTreeMap::new();
    for row in &rows {
        let schema = text(row, "table_schema")?;
        let name = text(row, "table_name")?;
        let data_type = text(row, "data_type")?;
        let udt_name = text(row, "udt_name")?;

        // USER-DEFINED and ARRAY say nothing about the element type
        let declared_type = if matches!(data_type.as_str(), "USER-DEFINED" | "ARRAY") {
            udt_name
        } else {
            data_type
        };

        let column = ColumnDescriptor {
            name: text(row, "column_name")?,
            data_type: map_postgres_type(&declared_type),
            declared_type,
            nullable: text(row, "is_nullable")? == "YES",
            primary_key: false,
        };

        tables
            .entry((schema.clone(), name.clone()))
            .or_insert_with(|| TableHandle {
                name,
                schema: Some(schema),
                columns: Vec::new(),
                foreign_keys: Vec::new(),
                synthetic_primary_key: false,
            })
            .columns
            .push(column);
    }
    Ok(tables)
}

async fn collect_primary_keys(pool: &PgPool) -> Result<HashSet<(String, String, String)>> {
    let sql = format!(
        "SELECT kcu.table_schema::text AS table_schema, \
                kcu.table_name::text AS table_name, \
                kcu.column_name::text AS column_name \
         FROM information_schema.table_constraints tc \
         JOIN information_schema.key_column_usage kcu \
           ON kcu.constraint_schema = tc.constraint_schema \
          AND kcu.constraint_name = tc.constraint_name \
          AND kcu.table_name = tc.table_name \
         WHERE tc.constraint_type = 'PRIMARY KEY' AND {}",
        schema_filter("tc.table_schema")
    );

    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .map_err(|e| OmopError::discovery_failed("Failed to read primary key constraints", e))?;

    rows.iter()
        .map(|row| -> Result<(String, String, String)> {
            Ok((
                text(row, "table_schema")?,
                text(row, "table_name")?,
                text(row, "column_name")?,
            ))
        })
        .collect()
}

async fn collect_foreign_keys(pool: &PgPool) -> Result<BTreeMap<TableKey, Vec<ForeignKey>>> {
    let sql = format!(
        "SELECT kcu.table_schema::text AS table_schema, \
                kcu.table_name::text AS table_name, \
                kcu.column_name::text AS column_name, \
                ccu.table_name::text AS referenced_table, \
                ccu.column_name::text AS referenced_column \
         FROM information_schema.table_constraints tc \
         JOIN information_schema.key_column_usage kcu \
           ON kcu.constraint_schema = tc.constraint_schema \
          AND kcu.constraint_name = tc.constraint_name \
          AND kcu.table_name = tc.table_name \
         JOIN information_schema.constraint_column_usage ccu \
           ON ccu.constraint_schema = tc.constraint_schema \
          AND ccu.constraint_name = tc.constraint_name \
         WHERE tc.constraint_type = 'FOREIGN KEY' AND {} \
         ORDER BY kcu.table_schema, kcu.table_name, kcu.ordinal_position",
        schema_filter("tc.table_schema")
    );

    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .map_err(|e| OmopError::discovery_failed("Failed to read foreign key constraints", e))?;

    let mut foreign_keys: BTreeMap<TableKey, Vec<ForeignKey>> = BTreeMap::new();
    for row in &rows {
        foreign_keys
            .entry((text(row, "table_schema")?, text(row, "table_name")?))
            .or_default()
            .push(ForeignKey {
                column: text(row, "column_name")?,
                referenced_table: text(row, "referenced_table")?,
                referenced_column: text(row, "referenced_column")?,
            });
    }
    Ok(foreign_keys)
}

fn text(row: &PgRow, column: &str) -> Result<String> {
    row.try_get::<String, _>(column).map_err(|e| {
        OmopError::discovery_failed(format!("Malformed information_schema row ({})", column), e)
    })
}
