//! Pre-built Test Fixtures
//!
//! Consistent sample books and reviews, plus the `"Book"` / `"Review"` rows
//! a SELECT would return for them. Handy for scripting
//! [`RecordingPool::respond_to`](crate::RecordingPool::respond_to).

use catalog_kernel::{Author, Book, BookId, Comment, Name, Price, Rating, Review, Title};
use infra_db::{Row, RowSet};
use rust_decimal_macros::dec;

pub const SAMPLE_ISBN: &str = "9784798121963";
pub const OTHER_ISBN: &str = "978-4-8222-8593-7";

/// "Domain-Driven Design" at ¥5,280
pub fn sample_book() -> Book {
    book_with_isbn(SAMPLE_ISBN)
}

pub fn book_with_isbn(isbn: &str) -> Book {
    Book::create(
        BookId::new(isbn).unwrap(),
        Title::new("Domain-Driven Design").unwrap(),
        Author::new("Eric Evans").unwrap(),
        Price::new(dec!(5280)).unwrap(),
    )
}

/// A four-star review of `book` with a short comment
pub fn sample_review(book: &Book) -> Review {
    Review::create(
        book.id().clone(),
        Name::new("Alice").unwrap(),
        Rating::new(4).unwrap(),
        Some(Comment::new("Dense but worth it").unwrap()),
    )
}

pub fn book_row(book: &Book) -> Row {
    Row::default()
        .with("bookId", book.id().value())
        .with("title", book.title().value())
        .with("author", book.author().value())
        .with("price", book.price().amount())
}

pub fn review_row(review: &Review) -> Row {
    Row::default()
        .with("reviewId", *review.id().as_uuid())
        .with("bookId", review.book_id().value())
        .with("name", review.name().value())
        .with("rating", i64::from(review.rating().value()))
        .with("comment", review.comment().map(|c| c.value().to_string()))
}

/// Single-row result set, as returned by a lookup by primary key
pub fn rows_of(row: Row) -> RowSet {
    RowSet::from_rows(vec![row])
}
