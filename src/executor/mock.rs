//! Recording backend used by executor and repository tests.

use super::backend::{Backend, BoundQuery, RowCursor};
use crate::core::{AqlError, Row, Value};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct State {
    calls: Vec<BoundQuery>,
    results: VecDeque<Vec<Row>>,
    affected: u64,
    fail_next: Option<String>,
}

/// Records every query and answers `query` calls from a FIFO of queued result sets.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    state: Arc<Mutex<State>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the rows returned by the next `query` call.
    pub fn push_rows(&self, columns: &[&str], rows: Vec<Vec<Value>>) {
        let columns: Arc<[String]> = columns.iter().map(ToString::to_string).collect();
        let rows = rows
            .into_iter()
            .map(|values| Row::new(Arc::clone(&columns), values))
            .collect();
        self.lock().results.push_back(rows);
    }

    pub fn set_affected(&self, rows: u64) {
        self.lock().affected = rows;
    }

    /// Makes the next call fail with a backend error carrying `message`.
    pub fn fail_next(&self, message: &str) {
        self.lock().fail_next = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<BoundQuery> {
        self.lock().calls.clone()
    }

    pub fn sql(&self) -> Vec<String> {
        self.lock().calls.iter().map(|q| q.sql.clone()).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("recording backend lock poisoned")
    }

    fn record(&self, query: &BoundQuery) -> Result<(), AqlError> {
        let mut state = self.lock();
        state.calls.push(query.clone());
        match state.fail_next.take() {
            Some(message) => Err(AqlError::Backend(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Backend for RecordingBackend {
    async fn execute(&self, query: &BoundQuery) -> Result<u64, AqlError> {
        self.record(query)?;
        Ok(self.lock().affected)
    }

    async fn query(&self, query: &BoundQuery) -> Result<RowCursor, AqlError> {
        self.record(query)?;
        let rows = self.lock().results.pop_front().unwrap_or_default();
        Ok(RowCursor::from_rows(rows))
    }
}
