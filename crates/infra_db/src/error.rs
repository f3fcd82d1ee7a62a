//! Database error types
//!
//! This module defines the error types that can occur during database operations,
//! from acquiring a connection through statement execution to transaction
//! control, and their translation into the kernel's `PortError`.

use std::time::Duration;

use catalog_kernel::PortError;
use thiserror::Error;

/// Result alias used throughout the crate
pub type DbResult<T> = Result<T, DatabaseError>;

/// Errors that can occur during database operations
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to establish a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Pool exhaustion - no connection became available in time
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// The pool cannot hand out connections at all (closed, unreachable)
    #[error("Connection pool unavailable: {0}")]
    PoolUnavailable(String),

    /// A statement (including BEGIN/COMMIT/ROLLBACK) failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Entity not found in database
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// The unit of work ran past its configured time limit and was rolled back
    #[error("Transaction timed out after {0:?}")]
    TransactionTimedOut(Duration),

    /// A statement was issued through a handle whose connection already went back to the pool
    #[error("Connection handle used after release")]
    HandleReleased,

    /// Migration error
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Row could not be mapped to or from a domain value
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic SQL error
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Checks if no connection could be obtained
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConnectionFailed(_)
                | DatabaseError::PoolExhausted
                | DatabaseError::PoolUnavailable(_)
        )
    }
}

/// Converts SQLx errors to more specific DatabaseError variants
///
/// This function analyzes the SQLx error and maps it to the appropriate
/// DatabaseError variant based on the PostgreSQL error code.
impl From<&sqlx::Error> for DatabaseError {
    fn from(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => {
                DatabaseError::NotFound("Record not found".to_string())
            }
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::PoolClosed => DatabaseError::PoolUnavailable("pool closed".to_string()),
            sqlx::Error::Database(db_err) => {
                // PostgreSQL error codes
                // https://www.postgresql.org/docs/current/errcodes-appendix.html
                if let Some(code) = db_err.code() {
                    match code.as_ref() {
                        "23505" => DatabaseError::DuplicateEntry(db_err.message().to_string()),
                        "23503" => {
                            DatabaseError::ForeignKeyViolation(db_err.message().to_string())
                        }
                        "23514" => {
                            DatabaseError::ConstraintViolation(db_err.message().to_string())
                        }
                        _ => DatabaseError::QueryFailed(db_err.message().to_string()),
                    }
                } else {
                    DatabaseError::QueryFailed(db_err.message().to_string())
                }
            }
            _ => DatabaseError::QueryFailed(error.to_string()),
        }
    }
}

/// Translates database failures into port errors for the application layer
///
/// - connection and pool failures -> `PortError::Connection`
/// - constraint violations -> `PortError::Conflict`
/// - timeouts -> `PortError::Timeout`
/// - everything else -> `PortError::Internal`
impl From<DatabaseError> for PortError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::NotFound(message) => PortError::NotFound {
                entity_type: "Record".to_string(),
                id: message,
            },
            DatabaseError::DuplicateEntry(message)
            | DatabaseError::ForeignKeyViolation(message)
            | DatabaseError::ConstraintViolation(message) => PortError::Conflict { message },
            DatabaseError::TransactionTimedOut(limit) => PortError::Timeout {
                operation: "unit of work".to_string(),
                duration_ms: limit.as_millis() as u64,
            },
            err if err.is_connection_error() => PortError::Connection {
                message: err.to_string(),
                source: Some(Box::new(err)),
            },
            err => PortError::Internal {
                message: err.to_string(),
                source: Some(Box::new(err)),
            },
        }
    }
}
