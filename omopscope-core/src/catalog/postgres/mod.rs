//! PostgreSQL catalog backend.
//!
//! # Module Structure
//! - `connection`: URL parsing, validation and pool creation
//! - `discovery`: bulk reflection through `information_schema`
//! - `decode`: row decoding by column type name
//!
//! Every schema except the system ones is reflected. CDM deployments often
//! split vocabulary and clinical tables across schemas; a table name found
//! in two schemas is rejected when the catalog is built.

pub mod connection;
pub mod decode;
pub mod discovery;

use super::{CatalogBackend, ConnectionConfig};
use crate::models::{DatabaseType, TableHandle};
use crate::query::Statement;
use crate::results::RowStream;
use crate::{OmopError, Result};
use async_trait::async_trait;
use sqlx::PgPool;

/// PostgreSQL backend for [`Catalog`](super::Catalog).
///
/// Attaching external sources is not supported; the trait's default
/// `attach` reports `UnsupportedOperation`.
pub struct PostgresBackend {
    pool: PgPool,
    config: ConnectionConfig,
}

impl std::fmt::Debug for PostgresBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresBackend")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PostgresBackend {
    /// Borrow the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Connection configuration in effect.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

#[async_trait]
impl CatalogBackend for PostgresBackend {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::PostgreSQL
    }

    async fn test_connection(&self) -> Result<()> {
        let answer: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                OmopError::connection_failed(
                    format!("PostgreSQL connectivity check failed ({})", self.config),
                    e,
                )
            })?;

        if answer != 1 {
            return Err(OmopError::configuration(
                "PostgreSQL connectivity check returned an unexpected result",
            ));
        }
        Ok(())
    }

    async fn discover(&self) -> Result<Vec<TableHandle>> {
        discovery::discover_tables(&self.pool).await
    }

    async fn fetch(&self, statement: &Statement) -> Result<RowStream> {
        decode::fetch(&self.pool, statement).await
    }

    async fn describe(&self, sql: &str) -> Result<Vec<String>> {
        decode::describe(&self.pool, sql).await
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
