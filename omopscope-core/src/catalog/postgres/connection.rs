//! PostgreSQL connection handling.
//!
//! The pool is created lazily: building a backend never touches the
//! network, and the catalog's connectivity check is the first round trip.
//! Sessions are switched to read-only transactions unless the
//! configuration asks otherwise.

use super::PostgresBackend;
use crate::catalog::ConnectionConfig;
use crate::catalog::config::MAX_POOL_SIZE;
use crate::error::redact_database_url;
use crate::{OmopError, Result};
use sqlx::PgPool;
use std::time::Duration;
use url::Url;

const DEFAULT_PORT: u16 = 5432;

impl PostgresBackend {
    /// Creates a backend from a connection URL.
    ///
    /// # Errors
    /// Returns `Configuration` if the URL is malformed, uses another scheme,
    /// or carries invalid pool parameters.
    pub async fn new(connection_string: &str) -> Result<Self> {
        let config = parse_connection_config(connection_string)?;
        Self::with_config(connection_string, config).await
    }

    /// Creates a backend with explicit configuration.
    pub async fn with_config(connection_string: &str, config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        validate_connection_string(connection_string)?;

        let pool = create_connection_pool(connection_string, &config)?;
        Ok(Self { pool, config })
    }
}

/// Parses a PostgreSQL URL into a configuration.
///
/// Recognized query parameters: `connect_timeout` (seconds, 1..=300) and
/// `pool_max_conns` (up to [`MAX_POOL_SIZE`]). Out-of-range values are ignored.
pub fn parse_connection_config(connection_string: &str) -> Result<ConnectionConfig> {
    let url = validate_connection_string(connection_string)?;

    let mut config = ConnectionConfig::new(url.host_str().unwrap_or("localhost").to_string())
        .with_port(url.port().unwrap_or(DEFAULT_PORT));

    let database = url.path().trim_start_matches('/');
    if !database.is_empty() {
        config = config.with_database(database.to_string());
    }

    if !url.username().is_empty() {
        config = config.with_username(url.username().to_string());
    }

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "connect_timeout" => {
                if let Ok(secs) = value.parse::<u64>()
                    && (1..=300).contains(&secs)
                {
                    config.connect_timeout = Duration::from_secs(secs);
                }
            }
            "pool_max_conns" => {
                if let Ok(max) = value.parse::<u32>()
                    && (1..=MAX_POOL_SIZE).contains(&max)
                {
                    config.max_connections = max;
                }
            }
            _ => {}
        }
    }

    config.validate()?;
    Ok(config)
}

/// Checks that the string is a `postgres://` or `postgresql://` URL.
pub fn validate_connection_string(connection_string: &str) -> Result<Url> {
    let url = Url::parse(connection_string).map_err(|e| {
        OmopError::configuration(format!(
            "Invalid PostgreSQL connection string {}: {}",
            redact_database_url(connection_string),
            e
        ))
    })?;

    if !matches!(url.scheme(), "postgres" | "postgresql") {
        return Err(OmopError::configuration(format!(
            "'{}' is not a PostgreSQL scheme",
            url.scheme()
        )));
    }
    if url.port() == Some(0) {
        return Err(OmopError::configuration("PostgreSQL port 0 is not usable"));
    }
    Ok(url)
}

fn create_connection_pool(connection_string: &str, config: &ConnectionConfig) -> Result<PgPool> {
    use sqlx::Executor;

    let read_only = config.read_only;

    sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.connect_timeout)
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'omopscope'").await?;
                if read_only {
                    conn.execute("SET default_transaction_read_only = on").await?;
                }
                Ok(())
            })
        })
        .connect_lazy(connection_string)
        .map_err(|e| {
            OmopError::connection_failed(
                format!(
                    "cannot build PostgreSQL pool for {}",
                    redact_database_url(connection_string)
                ),
                e,
            )
        })
}
