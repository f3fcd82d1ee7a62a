//! Recording Connection Pool
//!
//! An in-memory [`ConnectionPool`] for exercising the unit-of-work layer
//! without a database. It records every statement per connection, counts
//! acquires and returns, and models transaction visibility: writes issued
//! between `BEGIN` and `COMMIT` only become visible (appear in
//! [`RecordingPool::committed`]) when the commit succeeds, writes outside a
//! transaction are visible immediately.
//!
//! Failures and canned result sets are scripted by statement prefix, matched
//! against the statement with its whitespace collapsed.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use infra_db::{Connection, ConnectionPool, DatabaseError, DbResult, RowSet, SqlValue};

/// One statement as seen by the pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedStatement {
    /// Pool-local connection number (1-based, in acquire order)
    pub connection: u64,
    pub sql: String,
}

#[derive(Default)]
struct PoolState {
    next_connection: AtomicU64,
    acquired: AtomicUsize,
    released: AtomicUsize,
    discarded: AtomicUsize,
    dirty_releases: AtomicUsize,
    fail_acquire: AtomicBool,
    latency: Mutex<Option<Duration>>,
    statements: Mutex<Vec<RecordedStatement>>,
    committed: Mutex<Vec<String>>,
    failures: Mutex<Vec<(String, String)>>,
    responses: Mutex<Vec<(String, RowSet)>>,
}

fn normalize(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// In-memory pool that records what the unit-of-work layer does with it
#[derive(Clone, Default)]
pub struct RecordingPool {
    state: Arc<PoolState>,
}

impl RecordingPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `acquire` fail with `PoolUnavailable`
    pub fn fail_acquire(&self, fail: bool) {
        self.state.fail_acquire.store(fail, Ordering::SeqCst);
    }

    /// Makes statements starting with `prefix` fail with `QueryFailed(message)`
    pub fn fail_on(&self, prefix: &str, message: &str) {
        self.state
            .failures
            .lock()
            .unwrap()
            .push((normalize(prefix), message.to_string()));
    }

    /// Returns `rows` for statements starting with `prefix`
    pub fn respond_to(&self, prefix: &str, rows: RowSet) {
        self.state
            .responses
            .lock()
            .unwrap()
            .push((normalize(prefix), rows));
    }

    /// Delays every statement, forcing concurrent units of work to interleave
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.state.latency.lock().unwrap() = Some(latency);
        self
    }

    pub fn acquire_count(&self) -> usize {
        self.state.acquired.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.state.released.load(Ordering::SeqCst)
    }

    pub fn discard_count(&self) -> usize {
        self.state.discarded.load(Ordering::SeqCst)
    }

    /// Connections handed back either way (released or discarded)
    pub fn returned_count(&self) -> usize {
        self.release_count() + self.discard_count()
    }

    /// Connections currently checked out
    pub fn outstanding(&self) -> usize {
        self.acquire_count() - self.returned_count()
    }

    /// Connections released for reuse while a transaction was still open
    pub fn dirty_release_count(&self) -> usize {
        self.state.dirty_releases.load(Ordering::SeqCst)
    }

    pub fn statements(&self) -> Vec<RecordedStatement> {
        self.state.statements.lock().unwrap().clone()
    }

    /// Number of recorded statements starting with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        let prefix = normalize(prefix);
        self.statements()
            .iter()
            .filter(|s| s.sql.starts_with(&prefix))
            .count()
    }

    /// Distinct connections that ran statements, in first-use order
    pub fn connections_used(&self) -> Vec<u64> {
        let mut seen = Vec::new();
        for statement in self.statements() {
            if !seen.contains(&statement.connection) {
                seen.push(statement.connection);
            }
        }
        seen
    }

    /// Writes that became visible, in commit order
    pub fn committed(&self) -> Vec<String> {
        self.state.committed.lock().unwrap().clone()
    }

    /// Whether any visible write starts with `prefix`
    pub fn is_visible(&self, prefix: &str) -> bool {
        let prefix = normalize(prefix);
        self.committed().iter().any(|sql| sql.starts_with(&prefix))
    }
}

#[async_trait]
impl ConnectionPool for RecordingPool {
    async fn acquire(&self) -> DbResult<Box<dyn Connection>> {
        if self.state.fail_acquire.load(Ordering::SeqCst) {
            return Err(DatabaseError::PoolUnavailable("recording pool offline".to_string()));
        }

        self.state.acquired.fetch_add(1, Ordering::SeqCst);
        let id = self.state.next_connection.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(RecordingConnection {
            id,
            state: self.state.clone(),
            pending: Vec::new(),
            in_transaction: false,
            terminated: false,
        }))
    }

    fn release(&self, connection: Box<dyn Connection>) {
        self.state.released.fetch_add(1, Ordering::SeqCst);
        drop(connection);
    }

    fn discard(&self, connection: Box<dyn Connection>) {
        self.state.discarded.fetch_add(1, Ordering::SeqCst);
        connection.terminate();
    }
}

struct RecordingConnection {
    id: u64,
    state: Arc<PoolState>,
    pending: Vec<String>,
    in_transaction: bool,
    terminated: bool,
}

impl RecordingConnection {
    fn scripted_failure(&self, sql: &str) -> Option<String> {
        self.state
            .failures
            .lock()
            .unwrap()
            .iter()
            .find(|(prefix, _)| sql.starts_with(prefix.as_str()))
            .map(|(_, message)| message.clone())
    }

    fn scripted_response(&self, sql: &str) -> Option<RowSet> {
        self.state
            .responses
            .lock()
            .unwrap()
            .iter()
            .find(|(prefix, _)| sql.starts_with(prefix.as_str()))
            .map(|(_, rows)| rows.clone())
    }
}

#[async_trait]
impl Connection for RecordingConnection {
    async fn execute(&mut self, statement: &str, _params: &[SqlValue]) -> DbResult<RowSet> {
        let latency = *self.state.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let sql = normalize(statement);
        self.state.statements.lock().unwrap().push(RecordedStatement {
            connection: self.id,
            sql: sql.clone(),
        });

        if let Some(message) = self.scripted_failure(&sql) {
            if sql.starts_with("COMMIT") {
                // A failed commit ends the transaction without applying it
                self.pending.clear();
                self.in_transaction = false;
            }
            return Err(DatabaseError::QueryFailed(message));
        }

        match sql.as_str() {
            "BEGIN" => {
                self.in_transaction = true;
                return Ok(RowSet::empty());
            }
            "COMMIT" => {
                let pending = std::mem::take(&mut self.pending);
                self.state.committed.lock().unwrap().extend(pending);
                self.in_transaction = false;
                return Ok(RowSet::empty());
            }
            "ROLLBACK" => {
                self.pending.clear();
                self.in_transaction = false;
                return Ok(RowSet::empty());
            }
            _ => {}
        }

        let is_read = sql.starts_with("SELECT");
        if !is_read {
            if self.in_transaction {
                self.pending.push(sql.clone());
            } else {
                self.state.committed.lock().unwrap().push(sql.clone());
            }
        }

        Ok(self.scripted_response(&sql).unwrap_or_else(|| {
            if is_read {
                RowSet::empty()
            } else {
                RowSet::affected(1)
            }
        }))
    }

    fn terminate(mut self: Box<Self>) {
        self.terminated = true;
    }
}

impl Drop for RecordingConnection {
    fn drop(&mut self) {
        if self.in_transaction && !self.terminated {
            self.state.dirty_releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transaction_visibility() {
        let pool = RecordingPool::new();
        let mut conn = pool.acquire().await.unwrap();

        conn.execute("BEGIN", &[]).await.unwrap();
        conn.execute(r#"INSERT INTO "Review" VALUES ($1)"#, &[]).await.unwrap();
        assert!(!pool.is_visible(r#"INSERT INTO "Review""#));
        conn.execute("ROLLBACK", &[]).await.unwrap();
        assert!(!pool.is_visible(r#"INSERT INTO "Review""#));

        conn.execute(r#"INSERT INTO "Book" VALUES ($1)"#, &[]).await.unwrap();
        assert!(pool.is_visible(r#"INSERT INTO "Book""#));

        pool.release(conn);
        assert_eq!(pool.acquire_count(), 1);
        assert_eq!(pool.release_count(), 1);
        assert_eq!(pool.dirty_release_count(), 0);
    }

    #[tokio::test]
    async fn test_scripted_failure_and_response() {
        let pool = RecordingPool::new();
        pool.fail_on("COMMIT", "disk full");
        pool.respond_to("UPDATE", RowSet::affected(0));

        let mut conn = pool.acquire().await.unwrap();
        let updated = conn.execute("  UPDATE   x SET y = 1", &[]).await.unwrap();
        assert_eq!(updated.rows_affected, 0);

        conn.execute("BEGIN", &[]).await.unwrap();
        assert!(matches!(
            conn.execute("COMMIT", &[]).await,
            Err(DatabaseError::QueryFailed(m)) if m == "disk full"
        ));
        pool.discard(conn);
        assert_eq!(pool.discard_count(), 1);
    }

    #[tokio::test]
    async fn test_dirty_release_is_detected() {
        let pool = RecordingPool::new();
        let mut conn = pool.acquire().await.unwrap();
        conn.execute("BEGIN", &[]).await.unwrap();
        pool.release(conn);
        assert_eq!(pool.dirty_release_count(), 1);
    }
}
