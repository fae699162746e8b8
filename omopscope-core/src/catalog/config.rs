//! Connection settings shared by every backend.

use crate::{OmopError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Upper bound on pooled connections for a single catalog.
pub const MAX_POOL_SIZE: u32 = 100;

/// Settings a backend opens its pool with.
///
/// Built from the connection URL by each backend; callers override fields
/// through [`Catalog::connect_with_config`](crate::Catalog::connect_with_config).
/// Passwords stay in the URL and never land here.
///
/// # Example
/// ```rust
/// use omopscope_core::catalog::ConnectionConfig;
///
/// let config = ConnectionConfig::new("cdm-db.internal".to_string())
///     .with_port(5432)
///     .with_database("omop".to_string());
///
/// assert!(config.read_only);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server host; `localhost` for SQLite files
    pub host: String,
    pub port: Option<u16>,
    /// Database name, or the SQLite file name
    pub database: Option<String>,
    pub username: Option<String>,
    /// Pool acquire timeout
    pub connect_timeout: Duration,
    pub max_connections: u32,
    /// Reject writes at the connection level
    pub read_only: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: None,
            database: None,
            username: None,
            connect_timeout: Duration::from_secs(30),
            max_connections: 5,
            read_only: true,
        }
    }
}

/// `host[:port][/database]`, without the username.
impl fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        if let Some(database) = &self.database {
            write!(f, "/{}", database)?;
        }
        Ok(())
    }
}

impl ConnectionConfig {
    /// Default settings for `host`.
    pub fn new(host: String) -> Self {
        Self {
            host,
            ..Self::default()
        }
    }

    /// Checks the settings before a pool is built.
    ///
    /// # Errors
    /// Returns `Configuration` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let problem = if self.host.trim().is_empty() {
            Some("host is empty".to_string())
        } else if self.port == Some(0) {
            Some("port 0 is not a valid port".to_string())
        } else if !(1..=MAX_POOL_SIZE).contains(&self.max_connections) {
            Some(format!(
                "max_connections must be between 1 and {}, got {}",
                MAX_POOL_SIZE, self.max_connections
            ))
        } else if self.connect_timeout.is_zero() {
            Some("connect_timeout must be non-zero".to_string())
        } else {
            None
        };

        match problem {
            Some(message) => Err(OmopError::configuration(message)),
            None => Ok(()),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_database(mut self, database: String) -> Self {
        self.database = Some(database);
        self
    }

    pub fn with_username(mut self, username: String) -> Self {
        self.username = Some(username);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Opens connections without the read-only guard.
    pub fn writable(mut self) -> Self {
        self.read_only = false;
        self
    }
}
