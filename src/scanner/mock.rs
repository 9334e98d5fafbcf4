//! Scripted in-memory database collaborator for testing.
//!
//! Each session consumes the next scripted response; when the script is
//! empty the read returns no rows. Open and close calls are counted so
//! tests can check that every opened session was released.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use super::session::{Connector, Session, StatRow};
use crate::config::Config;
use crate::error::BoxError;

/// Builds a statistics row from integer counters.
pub fn row(schema: &str, table: &str, seq_scan: u64, seq_tup_read: u64) -> StatRow {
    StatRow {
        schemaname: schema.to_string(),
        relname: table.to_string(),
        seq_scan: seq_scan.to_string(),
        seq_tup_read: seq_tup_read.to_string(),
    }
}

#[derive(Default)]
struct MockState {
    responses: VecDeque<Result<Vec<StatRow>, String>>,
    connect_failures: VecDeque<String>,
    close_failures: VecDeque<String>,
    opened: usize,
    closed: usize,
    queries: Vec<String>,
}

/// Connector whose sessions replay scripted query results.
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the rows returned by the next session's read.
    pub fn push_rows(&self, rows: Vec<StatRow>) {
        self.lock().responses.push_back(Ok(rows));
    }

    /// Queues a read failure for the next session.
    pub fn push_query_failure(&self, message: &str) {
        self.lock().responses.push_back(Err(message.to_string()));
    }

    /// Makes the next `connect` fail.
    pub fn fail_next_connect(&self, message: &str) {
        self.lock().connect_failures.push_back(message.to_string());
    }

    /// Makes the next `close` fail.
    pub fn fail_next_close(&self, message: &str) {
        self.lock().close_failures.push_back(message.to_string());
    }

    /// Sessions successfully opened so far.
    pub fn opened(&self) -> usize {
        self.lock().opened
    }

    /// Sessions closed so far.
    pub fn closed(&self) -> usize {
        self.lock().closed
    }

    /// SQL text of every query issued.
    pub fn queries(&self) -> Vec<String> {
        self.lock().queries.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the counters from the next assertion.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Connector for MockConnector {
    type Session = MockSession;

    async fn connect(&self, _config: &Config) -> Result<MockSession, BoxError> {
        let mut state = self.lock();
        if let Some(message) = state.connect_failures.pop_front() {
            return Err(Box::new(io::Error::new(io::ErrorKind::NotFound, message)));
        }
        state.opened += 1;
        Ok(MockSession {
            connector: self.clone(),
        })
    }
}

/// Session handed out by [`MockConnector`].
pub struct MockSession {
    connector: MockConnector,
}

impl Session for MockSession {
    async fn query_stats(&mut self, sql: &str) -> Result<Vec<StatRow>, BoxError> {
        let mut state = self.connector.lock();
        state.queries.push(sql.to_string());
        match state.responses.pop_front() {
            Some(Ok(rows)) => Ok(rows),
            Some(Err(message)) => Err(Box::new(io::Error::other(message))),
            None => Ok(Vec::new()),
        }
    }

    async fn close(self) -> Result<(), BoxError> {
        let mut state = self.connector.lock();
        state.closed += 1;
        match state.close_failures.pop_front() {
            Some(message) => Err(Box::new(io::Error::other(message))),
            None => Ok(()),
        }
    }
}
