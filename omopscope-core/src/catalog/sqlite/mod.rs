//! SQLite catalog backend.
//!
//! # Module Structure
//! - `connection`: connection string handling and pool creation
//! - `discovery`: table reflection across `main` and attached databases
//! - `decode`: row decoding into [`Value`](crate::models::Value)s
//!
//! The pool holds exactly one connection, which an open result stream keeps
//! until it ends or is dropped. An in-memory database lives as
//! long as that connection, and attached databases are per-connection
//! state, so a single long-lived connection keeps both stable. Attachments
//! are also replayed from `after_connect` in case the connection is ever
//! re-established.

pub mod connection;
pub mod decode;
pub mod discovery;

#[cfg(test)]
mod tests;

use super::{CatalogBackend, ConnectionConfig};
use crate::models::{DatabaseType, TableHandle};
use crate::query::{Dialect, Statement};
use crate::results::RowStream;
use crate::{OmopError, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub use connection::{memory_options, normalize_connection_string, parse_sqlite_connection_config};

/// A database file attached under an alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub path: PathBuf,
    pub alias: String,
}

type AttachmentList = Arc<Mutex<Vec<Attachment>>>;

/// SQLite backend for [`Catalog`](super::Catalog).
pub struct SqliteBackend {
    pool: SqlitePool,
    config: ConnectionConfig,
    attachments: AttachmentList,
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("config", &self.config)
            .field("attachments", &self.attachments())
            .finish_non_exhaustive()
    }
}

impl SqliteBackend {
    /// Wraps an existing pool.
    ///
    /// The caller owns pool configuration; attachments made through this
    /// backend are only replayed on connections this backend creates.
    /// Keyword searches need `REGEXP`, so build the pool from options with
    /// [`SqliteConnectOptions::with_regexp`](sqlx::sqlite::SqliteConnectOptions::with_regexp),
    /// as [`memory_options`] does.
    pub fn from_pool(pool: SqlitePool) -> Self {
        let config = ConnectionConfig {
            max_connections: 1,
            read_only: false,
            ..ConnectionConfig::default()
        };
        Self {
            pool,
            config,
            attachments: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Borrow the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Connection configuration in effect.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Databases attached so far, in attach order.
    pub fn attachments(&self) -> Vec<Attachment> {
        self.attachments
            .lock()
            .map(|list| list.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait]
impl CatalogBackend for SqliteBackend {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::SQLite
    }

    async fn test_connection(&self) -> Result<()> {
        let answer: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| OmopError::connection_failed("SQLite connectivity check failed", e))?;

        if answer != 1 {
            return Err(OmopError::configuration(
                "SQLite connectivity check returned an unexpected result",
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

    async fn attach(&self, path: &Path, alias: &str) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| OmopError::connection_failed("Failed to acquire SQLite connection", e))?;

        let sql = format!("ATTACH DATABASE ? AS {}", Dialect::Sqlite.quote_ident(alias));
        sqlx::query(&sql)
            .bind(path.to_string_lossy().into_owned())
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                OmopError::connection_failed(
                    format!("Failed to attach '{}' as '{}'", path.display(), alias),
                    e,
                )
            })?;

        // An attach that lands in memory reports an empty file name
        let file: Option<String> =
            sqlx::query_scalar("SELECT file FROM pragma_database_list WHERE name = ?")
                .bind(alias)
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| OmopError::query_failed("cannot list attached databases", e))?;
        if file.as_deref().is_none_or(str::is_empty) {
            let detach = format!("DETACH DATABASE {}", Dialect::Sqlite.quote_ident(alias));
            if let Err(e) = sqlx::query(&detach).execute(&mut *conn).await {
                tracing::warn!("Could not detach '{}' after a failed attach: {}", alias, e);
            }
            return Err(OmopError::configuration(format!(
                "'{}' attached as '{}' did not open as a database file",
                path.display(),
                alias
            )));
        }

        let attachment = Attachment {
            path: path.to_path_buf(),
            alias: alias.to_string(),
        };
        match self.attachments.lock() {
            Ok(mut list) => list.push(attachment),
            Err(poisoned) => poisoned.into_inner().push(attachment),
        }
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
