use crate::core::{AqlError, Row, Value};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Translated SQL together with the values bound to its `$n` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

impl BoundQuery {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Relational backend used by the safe executor.
///
/// Connection pooling and durability belong to the implementation; the
/// executor issues one call per operation and never retries.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Runs a statement that returns no rows and reports the affected row count.
    async fn execute(&self, query: &BoundQuery) -> Result<u64, AqlError>;

    /// Runs a statement and returns a cursor over its rows.
    async fn query(&self, query: &BoundQuery) -> Result<RowCursor, AqlError>;

    /// First row of the result, if any.
    async fn query_row(&self, query: &BoundQuery) -> Result<Option<Row>, AqlError> {
        let mut cursor = self.query(query).await?;
        cursor.next().await.transpose()
    }
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for Arc<B> {
    async fn execute(&self, query: &BoundQuery) -> Result<u64, AqlError> {
        (**self).execute(query).await
    }

    async fn query(&self, query: &BoundQuery) -> Result<RowCursor, AqlError> {
        (**self).query(query).await
    }

    async fn query_row(&self, query: &BoundQuery) -> Result<Option<Row>, AqlError> {
        (**self).query_row(query).await
    }
}

enum Source {
    Buffered(std::vec::IntoIter<Row>),
    Streaming(mpsc::Receiver<Result<Row, AqlError>>),
}

/// Forward-only cursor over query results.
///
/// Streaming cursors are fed by a producer task through a bounded channel, so
/// rows are pulled from the backend only as fast as the caller consumes them.
pub struct RowCursor {
    source: Source,
    pending: Option<Row>,
}

impl RowCursor {
    /// Cursor over rows that are already in memory.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            source: Source::Buffered(rows.into_iter()),
            pending: None,
        }
    }

    /// Cursor fed by the returned sender; dropping the sender ends the cursor.
    pub fn channel(buffer: usize) -> (mpsc::Sender<Result<Row, AqlError>>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let cursor = Self {
            source: Source::Streaming(rx),
            pending: None,
        };
        (tx, cursor)
    }

    pub async fn next(&mut self) -> Option<Result<Row, AqlError>> {
        if let Some(row) = self.pending.take() {
            return Some(Ok(row));
        }
        match &mut self.source {
            Source::Buffered(rows) => rows.next().map(Ok),
            Source::Streaming(rx) => rx.recv().await,
        }
    }

    /// Waits for the first row so that an immediate failure surfaces as an error
    /// instead of as the first item.
    pub async fn prime(&mut self) -> Result<(), AqlError> {
        match self.next().await {
            Some(Ok(row)) => {
                self.pending = Some(row);
                Ok(())
            }
            Some(Err(e)) => Err(e),
            None => Ok(()),
        }
    }

    pub async fn try_collect(mut self) -> Result<Vec<Row>, AqlError> {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await {
            rows.push(row?);
        }
        Ok(rows)
    }
}

impl std::fmt::Debug for RowCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let source = match self.source {
            Source::Buffered(_) => "buffered",
            Source::Streaming(_) => "streaming",
        };
        f.debug_struct("RowCursor").field("source", &source).finish_non_exhaustive()
    }
}
