//! Repository implementations for the catalog aggregates
//!
//! Repositories encapsulate SQL and map between rows and domain types.
//! They reach the database only through `ClientManager::with_handle`, which
//! makes them oblivious to whether a unit of work is active:
//! - inside `SqlTransactionManager::begin`, statements join its transaction
//! - outside, each call borrows a connection and returns it immediately

pub mod book;
pub mod review;

pub use book::SqlBookRepository;
pub use review::SqlReviewRepository;
