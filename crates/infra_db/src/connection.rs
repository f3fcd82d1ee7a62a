//! Pool and connection abstraction
//!
//! The unit-of-work machinery only needs three primitives from a pool:
//! hand out a connection, take it back, and run a statement on it. This
//! module defines those primitives as traits so the same coordinator runs
//! against PostgreSQL in production and against a recording pool in tests.
//!
//! ```text
//!   ConnectionPool ──acquire()──► Box<dyn Connection> ──► ConnectionHandle (cloneable)
//!         ▲                                                      │
//!         └──────────────── release() / discard() ◄──────────────┘ (taken out exactly once)
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{DatabaseError, DbResult};

/// A parameter or column value exchanged with the database
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Decimal(Decimal),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int(value.into())
    }
}

impl From<u8> for SqlValue {
    fn from(value: u8) -> Self {
        SqlValue::Int(value.into())
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<Decimal> for SqlValue {
    fn from(value: Decimal) -> Self {
        SqlValue::Decimal(value)
    }
}

impl From<Uuid> for SqlValue {
    fn from(value: Uuid) -> Self {
        SqlValue::Uuid(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

/// One result row: column names paired with values, in select order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    /// Builder used by tests and adapters
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.columns.push((name.into(), value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    fn require(&self, name: &str) -> DbResult<&SqlValue> {
        self.get(name)
            .ok_or_else(|| DatabaseError::SerializationError(format!("missing column '{}'", name)))
    }

    fn mismatch(name: &str, expected: &str, found: &SqlValue) -> DatabaseError {
        DatabaseError::SerializationError(format!(
            "column '{}' expected {}, found {:?}",
            name, expected, found
        ))
    }

    pub fn text(&self, name: &str) -> DbResult<&str> {
        match self.require(name)? {
            SqlValue::Text(value) => Ok(value),
            other => Err(Self::mismatch(name, "text", other)),
        }
    }

    pub fn opt_text(&self, name: &str) -> DbResult<Option<&str>> {
        match self.get(name) {
            None | Some(SqlValue::Null) => Ok(None),
            Some(SqlValue::Text(value)) => Ok(Some(value)),
            Some(other) => Err(Self::mismatch(name, "text", other)),
        }
    }

    pub fn int(&self, name: &str) -> DbResult<i64> {
        match self.require(name)? {
            SqlValue::Int(value) => Ok(*value),
            other => Err(Self::mismatch(name, "integer", other)),
        }
    }

    pub fn decimal(&self, name: &str) -> DbResult<Decimal> {
        match self.require(name)? {
            SqlValue::Decimal(value) => Ok(*value),
            SqlValue::Int(value) => Ok(Decimal::from(*value)),
            other => Err(Self::mismatch(name, "numeric", other)),
        }
    }

    pub fn uuid(&self, name: &str) -> DbResult<Uuid> {
        match self.require(name)? {
            SqlValue::Uuid(value) => Ok(*value),
            SqlValue::Text(value) => Uuid::parse_str(value)
                .map_err(|e| DatabaseError::SerializationError(e.to_string())),
            other => Err(Self::mismatch(name, "uuid", other)),
        }
    }
}

/// Rows returned by a statement plus the number of rows it touched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub rows: Vec<Row>,
    pub rows_affected: u64,
}

impl RowSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Result of a write that touched `count` rows
    pub fn affected(count: u64) -> Self {
        Self { rows: Vec::new(), rows_affected: count }
    }

    pub fn from_rows(rows: Vec<Row>) -> Self {
        let rows_affected = rows.len() as u64;
        Self { rows, rows_affected }
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }
}

/// One exclusive database session
#[async_trait]
pub trait Connection: Send + 'static {
    /// Runs a single statement with positional parameters (`$1`, `$2`, ...)
    async fn execute(&mut self, statement: &str, params: &[SqlValue]) -> DbResult<RowSet>;

    /// Closes the session instead of letting it be reused
    fn terminate(self: Box<Self>) {}
}

/// Source of connections
///
/// Implementations must tolerate concurrent `acquire`/`release` calls from
/// independent tasks.
#[async_trait]
pub trait ConnectionPool: Send + Sync + 'static {
    /// Fails with `PoolExhausted` or `PoolUnavailable` when no connection can be handed out
    async fn acquire(&self) -> DbResult<Box<dyn Connection>>;

    /// Returns a healthy connection for reuse
    fn release(&self, connection: Box<dyn Connection>);

    /// Gives back a connection whose session state is unknown (e.g. a failed rollback)
    fn discard(&self, connection: Box<dyn Connection>) {
        connection.terminate();
    }
}

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a checked-out connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    fn next() -> Self {
        Self(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Shared reference to one checked-out connection
///
/// Clones refer to the same connection. Statements issued through any clone
/// run one at a time. Once the connection has been handed back to the pool,
/// every clone fails with [`DatabaseError::HandleReleased`].
#[derive(Clone)]
pub struct ConnectionHandle {
    id: HandleId,
    slot: Arc<Mutex<Option<Box<dyn Connection>>>>,
}

impl ConnectionHandle {
    pub(crate) fn new(connection: Box<dyn Connection>) -> Self {
        Self {
            id: HandleId::next(),
            slot: Arc::new(Mutex::new(Some(connection))),
        }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Runs a statement on the underlying connection
    pub async fn execute(&self, statement: &str, params: &[SqlValue]) -> DbResult<RowSet> {
        let mut slot = self.slot.lock().await;
        let connection = slot.as_mut().ok_or(DatabaseError::HandleReleased)?;
        connection.execute(statement, params).await
    }

    /// Whether the connection is still checked out
    pub async fn is_live(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Takes the connection out so it can go back to the pool
    pub(crate) async fn take(&self) -> Option<Box<dyn Connection>> {
        self.slot.lock().await.take()
    }

    /// Non-blocking variant of [`take`](Self::take) for use from `Drop`
    pub(crate) fn try_take(&self) -> Option<Box<dyn Connection>> {
        self.slot.try_lock().ok()?.take()
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle").field("id", &self.id).finish()
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}
