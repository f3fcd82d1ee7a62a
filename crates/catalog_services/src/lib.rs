//! Catalog Services - application use cases
//!
//! Each use case validates its command into domain values, then performs
//! its repository calls inside one [`TransactionManager::begin`] block so
//! that they succeed or fail together.
//!
//! - [`RegisterBookService`]: adds a book to the catalog
//! - [`AddReviewService`]: posts a review for an existing book
//! - [`EditReviewService`]: partially updates a review
//! - [`DeleteReviewService`]: removes a review
//!
//! [`TransactionManager::begin`]: catalog_kernel::TransactionManager::begin

pub mod add_review;
pub mod delete_review;
pub mod dto;
pub mod edit_review;
pub mod error;
pub mod register_book;

pub use add_review::{AddReviewCommand, AddReviewService};
pub use delete_review::{DeleteReviewCommand, DeleteReviewService};
pub use dto::{BookDto, ReviewDto};
pub use edit_review::{EditReviewCommand, EditReviewService};
pub use error::{ServiceError, ServiceResult};
pub use register_book::{RegisterBookCommand, RegisterBookService};
