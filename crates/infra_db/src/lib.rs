//! Infrastructure Database Layer
//!
//! This crate provides the database infrastructure for the book catalog,
//! built on PostgreSQL via SQLx.
//!
//! # Architecture
//!
//! ```text
//!  use case ──begin(work)──► SqlTransactionManager ──acquire / BEGIN / COMMIT|ROLLBACK / release──┐
//!                                   │ binds handle                                              │
//!                                   ▼                                                           ▼
//!                              ambient (task-local) ◄──lookup── ClientManager::with_handle ──► ConnectionPool
//!                                                                      ▲
//!                                                    SqlBookRepository / SqlReviewRepository
//! ```
//!
//! - [`ambient`]: binds one connection handle to the extent of a future
//! - [`ClientManager`]: repository access helper, ambient handle or a fresh one per call
//! - [`SqlTransactionManager`]: unit-of-work coordinator with flattening of nested `begin`
//! - [`connection`]: pool/connection traits, with [`PgConnectionPool`] for production
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, ClientManager, DatabaseConfig, SqlTransactionManager};
//!
//! let config = DatabaseConfig::from_env()?;
//! let pool = create_pool(config.clone()).await?;
//! let clients = ClientManager::postgres(pool);
//! let transactions = SqlTransactionManager::from_config(clients.clone(), &config);
//! ```

pub mod ambient;
pub mod client;
pub mod connection;
pub mod error;
pub mod pool;
pub mod postgres;
pub mod repositories;
pub mod transaction;

pub use client::ClientManager;
pub use connection::{Connection, ConnectionHandle, ConnectionPool, HandleId, Row, RowSet, SqlValue};
pub use error::{DatabaseError, DbResult};
pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
pub use postgres::PgConnectionPool;
pub use repositories::{SqlBookRepository, SqlReviewRepository};
pub use transaction::{SqlTransactionManager, UnitOfWorkState};
