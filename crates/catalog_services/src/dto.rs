//! Response DTOs returned by the use cases

use catalog_kernel::{Book, Review};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookDto {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub price: Decimal,
}

impl From<&Book> for BookDto {
    fn from(book: &Book) -> Self {
        Self {
            isbn: book.id().value().to_string(),
            title: book.title().value().to_string(),
            author: book.author().value().to_string(),
            price: book.price().amount(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDto {
    pub review_id: Uuid,
    pub book_id: String,
    pub name: String,
    pub rating: u8,
    pub comment: Option<String>,
}

impl From<&Review> for ReviewDto {
    fn from(review: &Review) -> Self {
        Self {
            review_id: *review.id().as_uuid(),
            book_id: review.book_id().value().to_string(),
            name: review.name().value().to_string(),
            rating: review.rating().value(),
            comment: review.comment().map(|c| c.value().to_string()),
        }
    }
}
