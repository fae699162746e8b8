//! SQLite connection strings and pool setup.
//!
//! Accepted forms:
//! - `sqlite:///abs/cdm.sqlite`, `sqlite://./relative.db`, `sqlite:cdm.db`
//! - a bare file path ending in `.db`, `.sqlite` or `.sqlite3`
//! - `sqlite::memory:` or `:memory:`
//!
//! In-memory targets are opened as a plain `:memory:` file name. sqlx's own
//! in-memory mode sets `SQLITE_OPEN_MEMORY`, which SQLite also applies to
//! every attached database, so attached files would come up empty.
//!
//! Every connection registers `REGEXP`, which keyword searches use for
//! Unicode case folding.

use super::{AttachmentList, SqliteBackend};
use crate::catalog::ConnectionConfig;
use crate::error::redact_database_url;
use crate::query::Dialect;
use crate::{OmopError, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use url::Url;

const FILE_SUFFIXES: [&str; 3] = [".db", ".sqlite", ".sqlite3"];

/// What a connection string points at.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Memory,
    /// `sqlite:` URL, kept as given
    Url(String),
    /// Plain file path
    Path(String),
}

impl Target {
    fn classify(connection_string: &str) -> Result<Self> {
        if connection_string == ":memory:" {
            return Ok(Self::Memory);
        }
        if let Some(rest) = connection_string.strip_prefix("sqlite:") {
            if rest.contains(":memory:") || rest.contains("mode=memory") {
                return Ok(Self::Memory);
            }
            // relative `sqlite://./x.db` paths do not parse as urls
            return match Url::parse(connection_string) {
                Ok(_) => Ok(Self::Url(connection_string.to_string())),
                Err(_) if rest.starts_with("//") => Ok(Self::Url(connection_string.to_string())),
                Err(e) => Err(OmopError::configuration(format!("malformed SQLite url: {}", e))),
            };
        }
        if FILE_SUFFIXES.iter().any(|suffix| connection_string.ends_with(suffix)) {
            return Ok(Self::Path(connection_string.to_string()));
        }
        Err(OmopError::configuration(
            "not a SQLite connection string: use a sqlite: url, a .db/.sqlite/.sqlite3 path or :memory:",
        ))
    }

    fn url(&self) -> String {
        match self {
            Self::Memory => "sqlite::memory:".to_string(),
            Self::Url(url) => url.clone(),
            Self::Path(path) => format!("sqlite://{}", path),
        }
    }

    /// File name shown in logs and [`ConnectionConfig::database`].
    fn file_name(&self) -> String {
        let raw = match self {
            Self::Memory => return ":memory:".to_string(),
            Self::Url(url) => url.trim_start_matches("sqlite:").trim_start_matches("//"),
            Self::Path(path) => path.as_str(),
        };
        let without_query = raw.split('?').next().unwrap_or(raw);
        without_query
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or("main")
            .to_string()
    }
}

impl SqliteBackend {
    /// Opens a SQLite database read-only.
    ///
    /// # Errors
    /// `Configuration` for an unrecognized connection string,
    /// `ConnectionFailed` when the file cannot be opened.
    pub async fn new(connection_string: &str) -> Result<Self> {
        let config = parse_sqlite_connection_config(connection_string)?;
        Self::with_config(connection_string, config).await
    }

    /// Opens a SQLite database with caller-supplied settings.
    ///
    /// `max_connections` is ignored; the pool always holds one connection.
    pub async fn with_config(connection_string: &str, config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        let target = Target::classify(connection_string)?;

        let attachments: AttachmentList = Arc::new(Mutex::new(Vec::new()));
        let pool = open_pool(&target, &config, Arc::clone(&attachments))
            .await
            .map_err(|e| {
                OmopError::connection_failed(
                    format!("cannot open {}", redact_database_url(connection_string)),
                    e,
                )
            })?;

        Ok(Self {
            pool,
            config,
            attachments,
        })
    }
}

/// Default settings for a SQLite connection string.
pub fn parse_sqlite_connection_config(connection_string: &str) -> Result<ConnectionConfig> {
    let target = Target::classify(connection_string)?;
    Ok(ConnectionConfig {
        max_connections: 1,
        ..ConnectionConfig::new("localhost".to_string()).with_database(target.file_name())
    })
}

/// Rewrites a connection string as a `sqlite:` url.
///
/// Strings that are not recognizably SQLite are prefixed as file paths.
pub fn normalize_connection_string(connection_string: &str) -> String {
    Target::classify(connection_string)
        .map(|target| target.url())
        .unwrap_or_else(|_| format!("sqlite://{}", connection_string))
}

/// Options for a private in-memory database that can attach files.
pub fn memory_options() -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(":memory:")
        .with_regexp()
}

async fn open_pool(
    target: &Target,
    config: &ConnectionConfig,
    attachments: AttachmentList,
) -> std::result::Result<SqlitePool, sqlx::Error> {
    let options = match target {
        // query_only also covers databases attached later
        Target::Memory if config.read_only => memory_options().pragma("query_only", "ON"),
        Target::Memory => memory_options(),
        _ => SqliteConnectOptions::from_str(&target.url())?
            .read_only(config.read_only)
            .with_regexp(),
    };

    SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(config.connect_timeout)
        .idle_timeout(None)
        .max_lifetime(None)
        .after_connect(move |conn, _meta| {
            let attachments = Arc::clone(&attachments);
            Box::pin(async move {
                let replay = attachments
                    .lock()
                    .map(|list| list.clone())
                    .unwrap_or_else(|poisoned| poisoned.into_inner().clone());

                for attachment in replay {
                    let sql = format!(
                        "ATTACH DATABASE ? AS {}",
                        Dialect::Sqlite.quote_ident(&attachment.alias)
                    );
                    sqlx::query(&sql)
                        .bind(attachment.path.to_string_lossy().into_owned())
                        .execute(&mut *conn)
                        .await?;
                }
                Ok(())
            })
        })
        .connect_with(options)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_accepts_sqlite_forms() {
        assert_eq!(Target::classify(":memory:").unwrap(), Target::Memory);
        assert_eq!(Target::classify("sqlite::memory:").unwrap(), Target::Memory);
        for accepted in [
            "sqlite:///data/cdm.sqlite",
            "sqlite://./cdm.db",
            "sqlite:cdm.db",
        ] {
            assert!(
                matches!(Target::classify(accepted), Ok(Target::Url(_))),
                "{accepted}"
            );
        }
        assert_eq!(
            Target::classify("/data/eunomia.sqlite3").unwrap(),
            Target::Path("/data/eunomia.sqlite3".to_string())
        );
    }

    #[test]
    fn test_classify_rejects_other_strings() {
        for rejected in ["postgres://localhost/cdm", "cdm", "cdm.csv"] {
            let err = Target::classify(rejected).unwrap_err();
            assert!(matches!(err, OmopError::Configuration { .. }), "{rejected}");
        }
    }

    #[test]
    fn test_file_name() {
        let name = |s: &str| Target::classify(s).unwrap().file_name();
        assert_eq!(name(":memory:"), ":memory:");
        assert_eq!(name("sqlite::memory:"), ":memory:");
        assert_eq!(name("sqlite:///data/cdm.sqlite"), "cdm.sqlite");
        assert_eq!(name("sqlite://./test.db?mode=ro"), "test.db");
        assert_eq!(name("/var/data/synpuf.db"), "synpuf.db");
    }

    #[test]
    fn test_normalize_connection_string() {
        assert_eq!(normalize_connection_string(":memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_connection_string("sqlite:///data/cdm.sqlite"),
            "sqlite:///data/cdm.sqlite"
        );
        assert_eq!(
            normalize_connection_string("/data/cdm.sqlite"),
            "sqlite:///data/cdm.sqlite"
        );
    }

    #[test]
    fn test_parse_sqlite_connection_config() {
        let config = parse_sqlite_connection_config("sqlite:///data/cdm.db").unwrap();
        assert_eq!(config.database.as_deref(), Some("cdm.db"));
        assert_eq!(config.max_connections, 1);
        assert!(config.read_only);
    }
}
