//! Book repository implementation

use async_trait::async_trait;
use catalog_kernel::{Author, Book, BookId, BookRepository, CoreError, PortError, Price, Title};
use tracing::{debug, instrument};

use crate::client::ClientManager;
use crate::connection::{Row, SqlValue};
use crate::error::DatabaseError;

const INSERT_BOOK: &str = r#"
    INSERT INTO "Book" ("bookId", "title", "author", "price")
    VALUES ($1, $2, $3, $4)
"#;

const UPDATE_BOOK: &str = r#"
    UPDATE "Book"
    SET "title" = $2, "author" = $3, "price" = $4
    WHERE "bookId" = $1
"#;

const DELETE_BOOK: &str = r#"DELETE FROM "Book" WHERE "bookId" = $1"#;

const SELECT_BOOK_BY_ID: &str = r#"
    SELECT "bookId", "title", "author", "price"
    FROM "Book"
    WHERE "bookId" = $1
"#;

/// PostgreSQL-backed [`BookRepository`]
///
/// Statements run through [`ClientManager::with_handle`]; the repository
/// never opens or closes transactions on its own.
#[derive(Debug, Clone)]
pub struct SqlBookRepository {
    clients: ClientManager,
}

impl SqlBookRepository {
    pub fn new(clients: ClientManager) -> Self {
        Self { clients }
    }

    fn params(book: &Book) -> Vec<SqlValue> {
        vec![
            book.id().value().into(),
            book.title().value().into(),
            book.author().value().into(),
            book.price().amount().into(),
        ]
    }

    fn to_domain(row: &Row) -> Result<Book, DatabaseError> {
        let invalid = |e: CoreError| DatabaseError::SerializationError(e.to_string());

        Ok(Book::reconstruct(
            BookId::new(row.text("bookId")?).map_err(invalid)?,
            Title::new(row.text("title")?).map_err(invalid)?,
            Author::new(row.text("author")?).map_err(invalid)?,
            Price::new(row.decimal("price")?).map_err(invalid)?,
        ))
    }
}

#[async_trait]
impl BookRepository for SqlBookRepository {
    /// Inserts a new book
    ///
    /// # Returns
    ///
    /// `PortError::Conflict` if a book with the same ISBN already exists
    #[instrument(skip(self, book), fields(book_id = %book.id()))]
    async fn save(&self, book: &Book) -> Result<(), PortError> {
        debug!("Saving book");
        let params = Self::params(book);
        self.clients
            .with_handle(|handle| async move { handle.execute(INSERT_BOOK, &params).await })
            .await?;
        Ok(())
    }

    /// Overwrites title, author and price of an existing book
    ///
    /// # Arguments
    ///
    /// * `book` - The book in its new state, matched on its ISBN
    ///
    /// # Returns
    ///
    /// `PortError::NotFound` when no row has that ISBN
    #[instrument(skip(self, book), fields(book_id = %book.id()))]
    async fn update(&self, book: &Book) -> Result<(), PortError> {
        debug!("Updating book");
        let params = Self::params(book);
        let result = self
            .clients
            .with_handle(|handle| async move { handle.execute(UPDATE_BOOK, &params).await })
            .await?;

        if result.rows_affected == 0 {
            return Err(PortError::not_found("Book", book.id()));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(book_id = %id))]
    async fn delete(&self, id: &BookId) -> Result<(), PortError> {
        debug!("Deleting book");
        let params = vec![SqlValue::from(id.value())];
        self.clients
            .with_handle(|handle| async move { handle.execute(DELETE_BOOK, &params).await })
            .await?;
        Ok(())
    }

    /// Retrieves a book by its ISBN
    ///
    /// # Returns
    ///
    /// `None` if the book does not exist
    #[instrument(skip(self), fields(book_id = %id))]
    async fn find_by_id(&self, id: &BookId) -> Result<Option<Book>, PortError> {
        debug!("Fetching book by ID");
        let params = vec![SqlValue::from(id.value())];
        let rows = self
            .clients
            .with_handle(|handle| async move { handle.execute(SELECT_BOOK_BY_ID, &params).await })
            .await?;

        let book = rows.first().map(Self::to_domain).transpose()?;
        Ok(book)
    }
}
