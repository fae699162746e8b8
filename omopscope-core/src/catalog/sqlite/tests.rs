use super::*;
use crate::models::{DataType, Row, Value};
use chrono::NaiveDate;
use futures::TryStreamExt;
use sqlx::sqlite::SqlitePoolOptions;

async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(memory_options())
        .await
        .unwrap()
}

async fn fetch_rows(pool: &SqlitePool, statement: &crate::query::Statement) -> Vec<Row> {
    decode::fetch(pool, statement)
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap()
}

/// Creates a database file holding one table.
async fn vocabulary_file(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("vocab.sqlite");
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let other = SqlitePoolOptions::new().connect(&url).await.unwrap();
    run(&other, "CREATE TABLE vocabulary (vocabulary_id VARCHAR(20) PRIMARY KEY)").await;
    other.close().await;
    path
}

async fn run(pool: &SqlitePool, sql: &str) {
    sqlx::query(sql).execute(pool).await.unwrap();
}

#[tokio::test]
async fn test_discover_reads_columns_and_keys() {
    let pool = memory_pool().await;
    run(
        &pool,
        "CREATE TABLE concept (concept_id INTEGER PRIMARY KEY, concept_name VARCHAR(255) NOT NULL, valid_start_date DATE)",
    )
    .await;
    run(
        &pool,
        "CREATE TABLE concept_synonym (concept_id INTEGER NOT NULL REFERENCES concept(concept_id), concept_synonym_name VARCHAR(1000))",
    )
    .await;

    let tables = discovery::discover_tables(&pool).await.unwrap();
    assert_eq!(tables.len(), 2);

    let concept = tables.iter().find(|t| t.name == "concept").unwrap();
    assert_eq!(concept.schema.as_deref(), Some("main"));
    assert_eq!(concept.column_names(), vec!["concept_id", "concept_name", "valid_start_date"]);
    assert_eq!(concept.primary_key(), vec!["concept_id"]);

    let name = concept.column("concept_name").unwrap();
    assert!(!name.nullable);
    assert_eq!(name.declared_type, "VARCHAR(255)");
    assert_eq!(name.data_type, DataType::Text);
    assert_eq!(concept.column("valid_start_date").unwrap().data_type, DataType::Date);

    let synonym = tables.iter().find(|t| t.name == "concept_synonym").unwrap();
    assert!(synonym.primary_key().is_empty());
    assert_eq!(synonym.foreign_keys.len(), 1);
    assert_eq!(synonym.foreign_keys[0].column, "concept_id");
    assert_eq!(synonym.foreign_keys[0].referenced_table, "concept");
    assert_eq!(synonym.foreign_keys[0].referenced_column, "concept_id");
}

#[tokio::test]
async fn test_discover_skips_internal_tables() {
    let pool = memory_pool().await;
    run(&pool, "CREATE TABLE person (person_id INTEGER PRIMARY KEY AUTOINCREMENT)").await;

    // AUTOINCREMENT creates sqlite_sequence
    let tables = discovery::discover_tables(&pool).await.unwrap();
    let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["person"]);
}

#[tokio::test]
async fn test_fetch_decodes_storage_classes() {
    let pool = memory_pool().await;
    run(
        &pool,
        "CREATE TABLE sample (id INTEGER, ratio REAL, label TEXT, flag BOOLEAN, born DATE, seen DATETIME, raw BLOB, note TEXT)",
    )
    .await;
    run(
        &pool,
        "INSERT INTO sample VALUES (7, 0.5, 'x', 1, '1980-05-01', '2020-01-02 03:04:05', X'0102', NULL)",
    )
    .await;

    assert_eq!(
        decode::describe(&pool, "SELECT * FROM sample").await.unwrap(),
        vec!["id", "ratio", "label", "flag", "born", "seen", "raw", "note"]
    );
    let rows = fetch_rows(&pool, &crate::query::Statement::raw("SELECT * FROM sample")).await;

    let born = NaiveDate::from_ymd_opt(1980, 5, 1).unwrap();
    let seen = NaiveDate::from_ymd_opt(2020, 1, 2)
        .unwrap()
        .and_hms_opt(3, 4, 5)
        .unwrap();
    assert_eq!(
        rows,
        vec![vec![
            Value::Integer(7),
            Value::Real(0.5),
            Value::Text("x".into()),
            Value::Bool(true),
            Value::Date(born),
            Value::DateTime(seen),
            Value::Blob(vec![1, 2]),
            Value::Null,
        ]]
    );
}

#[tokio::test]
async fn test_fetch_binds_parameters() {
    let pool = memory_pool().await;
    run(&pool, "CREATE TABLE concept (concept_id INTEGER, concept_name TEXT)").await;
    run(&pool, "INSERT INTO concept VALUES (1, 'Diabetes'), (2, 'Asthma')").await;

    let statement = crate::query::Statement {
        sql: "SELECT concept_name FROM concept WHERE concept_id = ? AND concept_name <> ?".into(),
        params: vec![Value::Integer(1), Value::Text("Asthma".into())],
    };
    let rows = fetch_rows(&pool, &statement).await;
    assert_eq!(rows, vec![vec![Value::Text("Diabetes".into())]]);
}

#[tokio::test]
async fn test_describe_empty_table_keeps_columns() {
    let pool = memory_pool().await;
    run(&pool, "CREATE TABLE concept (concept_id INTEGER, concept_name TEXT)").await;

    let columns = decode::describe(&pool, "SELECT concept_name, concept_id FROM concept")
        .await
        .unwrap();
    assert_eq!(columns, vec!["concept_name", "concept_id"]);
    assert!(
        fetch_rows(&pool, &crate::query::Statement::raw("SELECT * FROM concept"))
            .await
            .is_empty()
    );
}

#[tokio::test]
async fn test_fetch_reports_backend_errors() {
    let pool = memory_pool().await;
    let err = decode::describe(&pool, "SELECT * FROM nowhere").await.unwrap_err();
    assert!(matches!(err, OmopError::QueryExecution { .. }));

    let mut rows = decode::fetch(&pool, &crate::query::Statement::raw("SELECT * FROM nowhere"))
        .await
        .unwrap();
    let err = rows.try_next().await.unwrap_err();
    assert!(matches!(err, OmopError::QueryExecution { .. }));
    assert!(rows.try_next().await.unwrap().is_none());
}

#[tokio::test]
async fn test_stream_releases_connection_when_dropped() {
    let pool = memory_pool().await;
    run(&pool, "CREATE TABLE concept (concept_id INTEGER)").await;
    run(&pool, "INSERT INTO concept VALUES (1), (2), (3)").await;

    let mut rows = decode::fetch(&pool, &crate::query::Statement::raw("SELECT * FROM concept"))
        .await
        .unwrap();
    assert_eq!(rows.try_next().await.unwrap(), Some(vec![Value::Integer(1)]));
    assert_eq!(pool.num_idle(), 0);
    drop(rows);

    // the single connection is usable again
    let count = fetch_rows(&pool, &crate::query::Statement::raw("SELECT COUNT(*) FROM concept")).await;
    assert_eq!(count, vec![vec![Value::Integer(3)]]);
}

#[tokio::test]
async fn test_attach_adds_schema_to_discovery() {
    let dir = tempfile::tempdir().unwrap();
    let path = vocabulary_file(dir.path()).await;

    let pool = memory_pool().await;
    run(&pool, "CREATE TABLE person (person_id INTEGER PRIMARY KEY)").await;
    let backend = SqliteBackend::from_pool(pool);

    backend.attach(&path, "vocab").await.unwrap();
    assert_eq!(
        backend.attachments(),
        vec![Attachment {
            path: path.clone(),
            alias: "vocab".into()
        }]
    );

    let tables = backend.discover().await.unwrap();
    let vocabulary = tables.iter().find(|t| t.name == "vocabulary").unwrap();
    assert_eq!(vocabulary.schema.as_deref(), Some("vocab"));
    assert!(tables.iter().any(|t| t.name == "person"));
}

#[tokio::test]
async fn test_attach_rejects_file_opened_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    let path = vocabulary_file(dir.path()).await;

    // sqlx's in-memory mode opens attached files in memory as well
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let backend = SqliteBackend::from_pool(pool);

    let err = backend.attach(&path, "vocab").await.unwrap_err();
    assert!(matches!(err, OmopError::Configuration { .. }));
    assert!(backend.attachments().is_empty());
    assert!(backend.discover().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_in_memory_catalog_attaches_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = vocabulary_file(dir.path()).await;

    let backend = SqliteBackend::new(":memory:").await.unwrap();
    backend.attach(&path, "vocab").await.unwrap();

    let tables = backend.discover().await.unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].schema.as_deref(), Some("vocab"));
}

#[tokio::test]
async fn test_read_only_in_memory_rejects_writes_to_attached_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = vocabulary_file(dir.path()).await;

    let backend = SqliteBackend::new("sqlite::memory:").await.unwrap();
    backend.attach(&path, "vocab").await.unwrap();

    let insert = crate::query::Statement::raw("INSERT INTO vocab.vocabulary VALUES ('SNOMED')");
    let mut rows = backend.fetch(&insert).await.unwrap();
    let err = rows.try_next().await.unwrap_err();
    assert!(matches!(err, OmopError::QueryExecution { .. }));
}

#[tokio::test]
async fn test_backend_connectivity_check() {
    let backend = SqliteBackend::from_pool(memory_pool().await);
    assert_eq!(backend.database_type(), DatabaseType::SQLite);
    assert_eq!(backend.dialect(), Dialect::Sqlite);
    backend.test_connection().await.unwrap();
    backend.close().await;
}

#[tokio::test]
async fn test_new_opens_in_memory_database() {
    let backend = SqliteBackend::new(":memory:").await.unwrap();
    assert!(backend.config().read_only);
    assert_eq!(backend.config().max_connections, 1);
    backend.test_connection().await.unwrap();
}

#[tokio::test]
async fn test_new_rejects_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.sqlite");
    let err = SqliteBackend::new(&missing.display().to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, OmopError::Connection { .. }));
}
