//! Register a new book in the catalog

use std::sync::Arc;

use catalog_kernel::{Author, Book, BookId, BookRepository, Price, Title, TransactionManager};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::dto::BookDto;
use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterBookCommand {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub price: Decimal,
}

pub struct RegisterBookService<T> {
    books: Arc<dyn BookRepository>,
    transactions: T,
}

impl<T: TransactionManager> RegisterBookService<T> {
    pub fn new(books: Arc<dyn BookRepository>, transactions: T) -> Self {
        Self { books, transactions }
    }

    /// Registers the book unless its ISBN is already taken
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` if any field is malformed
    /// - `ServiceError::Conflict` if a book with this ISBN exists
    #[instrument(skip(self, command), fields(isbn = %command.isbn))]
    pub async fn execute(&self, command: RegisterBookCommand) -> ServiceResult<BookDto> {
        let book = Book::create(
            BookId::new(&command.isbn)?,
            Title::new(command.title)?,
            Author::new(command.author)?,
            Price::new(command.price)?,
        );

        self.transactions
            .begin(|| async {
                if self.books.find_by_id(book.id()).await?.is_some() {
                    return Err(ServiceError::Conflict(format!(
                        "book {} is already registered",
                        book.id()
                    )));
                }
                self.books.save(&book).await?;
                Ok(())
            })
            .await?;

        info!(isbn = %book.id(), "Book registered");
        Ok(BookDto::from(&book))
    }
}
