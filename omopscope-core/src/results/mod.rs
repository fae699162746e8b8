//! Query results: a forward-only row stream and in-memory tables.
//!
//! # Module Structure
//! - `table`: column-major [`Table`] with text and JSON rendering
//! - `dates`: date detection and coercion applied on materialization
//! - `dataframe`: conversion to polars (feature `polars`)

mod dates;
#[cfg(feature = "polars")]
pub mod dataframe;
pub mod table;

pub use dates::{DateDetection, parse_temporal};
pub use table::Table;

use crate::models::Row;
use crate::{OmopError, Result};
use futures::stream::{self, BoxStream, Fuse, Stream, StreamExt, TryStreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Decoded rows as the backend produces them.
///
/// Backend streams own the pooled connection they read from; the connection
/// goes back to the pool when the stream ends or is dropped.
pub type RowStream = BoxStream<'static, Result<Row>>;

/// Rows of one executed query, pulled from the backend front to back.
///
/// The handle owns the open result stream, so rows are only decoded as they
/// are fetched. Fetching past the end returns empty results rather than an
/// error, and a second `materialize_table` after exhaustion returns an empty
/// table with the same columns.
///
/// SQLite catalogs run on a single connection: finish or drop a handle
/// before issuing the next query on the same catalog.
pub struct ResultHandle {
    columns: Vec<String>,
    rows: Fuse<RowStream>,
    date_detection: DateDetection,
}

impl std::fmt::Debug for ResultHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultHandle")
            .field("columns", &self.columns)
            .field("exhausted", &self.rows.is_done())
            .field("date_detection", &self.date_detection)
            .finish_non_exhaustive()
    }
}

impl ResultHandle {
    /// Wraps a row stream without touching it.
    pub fn new(columns: Vec<String>, rows: RowStream) -> Self {
        Self {
            columns,
            rows: rows.fuse(),
            date_detection: DateDetection::default(),
        }
    }

    /// Wraps rows that are already in memory.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self::new(columns, stream::iter(rows.into_iter().map(Ok)).boxed())
    }

    /// Pulls the first row before handing out the stream.
    ///
    /// Statement failures (constraint violations, writes on a read-only
    /// connection) surface here instead of on the first fetch, and an
    /// empty result releases its connection right away.
    pub(crate) async fn start(columns: Vec<String>, mut rows: RowStream) -> Result<Self> {
        let rows = match rows.next().await.transpose()? {
            Some(first) => stream::iter([Ok(first)]).chain(rows).boxed(),
            None => stream::empty().boxed(),
        };
        Ok(Self::new(columns, rows))
    }

    /// Chooses how date columns are detected on materialization.
    pub fn with_date_detection(mut self, detection: DateDetection) -> Self {
        self.date_detection = detection;
        self
    }

    /// Column names in projection order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// True once the stream has ended.
    pub fn is_exhausted(&self) -> bool {
        self.rows.is_done()
    }

    /// Next row, or `None` once exhausted.
    ///
    /// # Errors
    /// Returns `QueryExecution` if the backend fails mid-stream.
    pub async fn fetch_one(&mut self) -> Result<Option<Row>> {
        self.rows.next().await.transpose()
    }

    /// Up to `n` next rows.
    pub async fn fetch_many(&mut self, n: usize) -> Result<Vec<Row>> {
        self.rows.by_ref().take(n).try_collect().await
    }

    /// All remaining rows.
    pub async fn fetch_all(&mut self) -> Result<Vec<Row>> {
        self.rows.by_ref().try_collect().await
    }

    /// Consumes the remaining rows into a table, coercing date columns.
    pub async fn materialize_table(&mut self) -> Result<Table> {
        let rows = self.fetch_all().await?;
        Ok(self.build_table(rows))
    }

    /// Lazily yields tables of at most `chunk_size` rows until exhausted.
    ///
    /// Each chunk pulls only its own rows from the backend. A chunk size of
    /// 0 is treated as 1. Date detection runs per chunk.
    pub fn materialize_chunks(&mut self, chunk_size: usize) -> BoxStream<'_, Result<Table>> {
        let chunk_size = chunk_size.max(1);
        stream::try_unfold(self, move |handle| async move {
            let rows = handle.fetch_many(chunk_size).await?;
            if rows.is_empty() {
                return Ok(None);
            }
            let table = handle.build_table(rows);
            Ok::<_, OmopError>(Some((table, handle)))
        })
        .boxed()
    }

    fn build_table(&self, rows: Vec<Row>) -> Table {
        let mut table = Table::from_rows(self.columns.clone(), rows);
        dates::coerce_date_columns(&mut table, self.date_detection);
        table
    }
}

impl Stream for ResultHandle {
    type Item = Result<Row>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rows.poll_next_unpin(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}
