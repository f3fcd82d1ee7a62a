//! Catalog Kernel - Foundational types for the book catalog and review system
//!
//! This crate provides the building blocks shared by the infrastructure and
//! application layers:
//! - Book value objects (ISBN, title, author, price)
//! - Review value objects (name, rating, comment)
//! - Repository and transaction ports implemented by `infra_db`
//!
//! Nothing in here performs I/O.

pub mod book;
pub mod review;
pub mod ports;
pub mod error;

pub use book::{Author, Book, BookId, Price, Title};
pub use review::{Comment, Name, Rating, Review, ReviewEdit, ReviewId};
pub use ports::{BookRepository, PortError, ReviewRepository, TransactionManager};
pub use error::CoreError;
