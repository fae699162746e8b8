//! Query layer over OMOP Common Data Model databases.
//!
//! This crate connects to an existing CDM database, discovers its tables
//! lazily, and offers a library of canned vocabulary and population queries
//! whose results can be fetched row by row or materialized into a [`Table`].
//!
//! # Guarantees
//! - Connections are opened read-only unless configured otherwise
//! - Credentials never appear in errors or log output
//! - Transitive concept relations are answered from `concept_ancestor`
//!   joins; nothing is computed client-side
//!
//! # Example
//! ```rust,no_run
//! use omopscope_core::{Catalog, queries::general};
//!
//! # async fn example() -> omopscope_core::Result<()> {
//! let catalog = Catalog::connect("sqlite:///data/cdm.sqlite").await?;
//! let mut children = general::children_for_concept_id(&catalog, 201820, None).await?;
//! println!("{}", children.materialize_table().await?);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod cdm;
pub mod error;
pub mod logging;
pub mod models;
pub mod queries;
pub mod query;
pub mod results;

// Re-export commonly used types
pub use catalog::{Catalog, CatalogBackend, ConnectionConfig, TableMap};
pub use error::{OmopError, Result};
pub use models::{
    ColumnDescriptor, DataType, DatabaseType, ForeignKey, Row, TableCategory, TableHandle, Value,
};
pub use query::{Dialect, QuerySpec, Select, Statement, TableRef};
pub use results::{DateDetection, ResultHandle, RowStream, Table};
