//! Ports implemented by the infrastructure layer
//!
//! The application layer depends only on these traits. `infra_db` provides
//! the PostgreSQL adapters.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Application Layer                        │
//! │   (RegisterBook, AddReview, EditReview, DeleteReview)        │
//! └─────────────────────────────────────────────────────────────┘
//!           │ begin(work)                     │ save / find / ...
//!           ▼                                 ▼
//! ┌──────────────────────┐       ┌──────────────────────────────┐
//! │  TransactionManager  │       │ BookRepository               │
//! │                      │       │ ReviewRepository             │
//! └──────────────────────┘       └──────────────────────────────┘
//!           ▲                                 ▲
//!           └──────────── infra_db ───────────┘
//! ```
//!
//! Repositories never draw transaction boundaries themselves. A use case
//! that needs several repository calls to be atomic wraps them in
//! [`TransactionManager::begin`]; every repository call made inside that
//! block joins the same transaction without being told about it.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use thiserror::Error;

use crate::book::{Book, BookId};
use crate::review::{Review, ReviewId};

/// Error type for port operations
#[derive(Debug, Error)]
pub enum PortError {
    /// The requested entity was not found
    #[error("Not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: String,
        id: String,
    },

    /// A validation error occurred
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// The operation conflicts with existing data
    #[error("Conflict: {message}")]
    Conflict {
        message: String,
    },

    /// No connection to the underlying store could be obtained
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The operation timed out
    #[error("Timeout after {duration_ms}ms: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
    },

    /// An internal error occurred
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PortError {
    /// Creates a NotFound error
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Creates a Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        PortError::Conflict {
            message: message.into(),
        }
    }

    /// Creates a Connection error
    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true if the store could not be reached at all
    pub fn is_connection_error(&self) -> bool {
        matches!(self, PortError::Connection { .. })
    }

    /// Returns true if this error indicates the entity was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }
}

/// Persistence port for books
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn save(&self, book: &Book) -> Result<(), PortError>;

    /// Fails with `PortError::NotFound` when no book has this ISBN
    async fn update(&self, book: &Book) -> Result<(), PortError>;

    async fn delete(&self, id: &BookId) -> Result<(), PortError>;

    async fn find_by_id(&self, id: &BookId) -> Result<Option<Book>, PortError>;
}

/// Persistence port for reviews
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn save(&self, review: &Review) -> Result<(), PortError>;

    /// Fails with `PortError::NotFound` when no review has this id
    async fn update(&self, review: &Review) -> Result<(), PortError>;

    async fn delete(&self, id: &ReviewId) -> Result<(), PortError>;

    async fn find_by_id(&self, id: &ReviewId) -> Result<Option<Review>, PortError>;

    async fn find_all_by_book_id(&self, book_id: &BookId) -> Result<Vec<Review>, PortError>;
}

/// Runs a block of repository calls as one atomic unit of work
///
/// `begin` commits when `work` returns `Ok` and rolls back when it returns
/// `Err`; the original error is handed back to the caller unchanged.
/// Calling `begin` again from inside `work` joins the outer unit of work
/// instead of opening a second one.
pub trait TransactionManager: Send + Sync {
    fn begin<T, E, F, Fut>(&self, work: F) -> impl Future<Output = Result<T, E>> + Send
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: From<PortError> + Send;
}
