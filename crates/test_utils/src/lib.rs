//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! book catalog test suite.
//!
//! # Modules
//!
//! - `recording_pool`: in-memory connection pool that records statements and returns
//! - `fixtures`: sample books and reviews, and the rows a SELECT would return for them
//! - `database`: PostgreSQL test container with the catalog schema applied

pub mod database;
pub mod fixtures;
pub mod recording_pool;

pub use database::*;
pub use fixtures::*;
pub use recording_pool::{RecordedStatement, RecordingPool};
