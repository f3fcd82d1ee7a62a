//! Review repository implementation
//!
//! Every statement goes through [`ClientManager::with_handle`], so the
//! repository joins whatever unit of work is active and otherwise runs on a
//! connection borrowed for the single call.

use async_trait::async_trait;
use catalog_kernel::{
    BookId, Comment, Name, PortError, Rating, Review, ReviewId, ReviewRepository,
};
use tracing::{debug, instrument};

use crate::client::ClientManager;
use crate::connection::{Row, SqlValue};
use crate::error::DatabaseError;

const INSERT_REVIEW: &str = r#"
    INSERT INTO "Review" ("reviewId", "bookId", "name", "rating", "comment")
    VALUES ($1, $2, $3, $4, $5)
"#;

const UPDATE_REVIEW: &str = r#"
    UPDATE "Review"
    SET "bookId" = $2, "name" = $3, "rating" = $4, "comment" = $5
    WHERE "reviewId" = $1
"#;

const DELETE_REVIEW: &str = r#"DELETE FROM "Review" WHERE "reviewId" = $1"#;

const SELECT_REVIEW_BY_ID: &str = r#"
    SELECT "reviewId", "bookId", "name", "rating", "comment"
    FROM "Review"
    WHERE "reviewId" = $1
"#;

const SELECT_REVIEWS_BY_BOOK: &str = r#"
    SELECT "reviewId", "bookId", "name", "rating", "comment"
    FROM "Review"
    WHERE "bookId" = $1
"#;

/// PostgreSQL-backed [`ReviewRepository`]
#[derive(Debug, Clone)]
pub struct SqlReviewRepository {
    clients: ClientManager,
}

impl SqlReviewRepository {
    pub fn new(clients: ClientManager) -> Self {
        Self { clients }
    }

    fn params(review: &Review) -> Vec<SqlValue> {
        vec![
            (*review.id().as_uuid()).into(),
            review.book_id().value().into(),
            review.name().value().into(),
            review.rating().value().into(),
            review.comment().map(|c| c.value().to_string()).into(),
        ]
    }

    /// Maps a `"Review"` row back to the domain type
    fn to_domain(row: &Row) -> Result<Review, DatabaseError> {
        let invalid = |e: catalog_kernel::CoreError| DatabaseError::SerializationError(e.to_string());

        let comment = match row.opt_text("comment")? {
            Some(text) if !text.is_empty() => Some(Comment::new(text).map_err(invalid)?),
            _ => None,
        };

        Ok(Review::reconstruct(
            ReviewId::from_uuid(row.uuid("reviewId")?),
            BookId::new(row.text("bookId")?).map_err(invalid)?,
            Name::new(row.text("name")?).map_err(invalid)?,
            Rating::new(row.int("rating")?).map_err(invalid)?,
            comment,
        ))
    }
}

#[async_trait]
impl ReviewRepository for SqlReviewRepository {
    #[instrument(skip(self, review), fields(review_id = %review.id()))]
    async fn save(&self, review: &Review) -> Result<(), PortError> {
        debug!("Saving review");
        let params = Self::params(review);
        self.clients
            .with_handle(|handle| async move { handle.execute(INSERT_REVIEW, &params).await })
            .await?;
        Ok(())
    }

    /// Overwrites every column of an existing review
    ///
    /// # Arguments
    ///
    /// * `review` - The review in its edited state, matched on its identifier
    ///
    /// # Returns
    ///
    /// `PortError::NotFound` when no row has that identifier
    #[instrument(skip(self, review), fields(review_id = %review.id()))]
    async fn update(&self, review: &Review) -> Result<(), PortError> {
        debug!("Updating review");
        let params = Self::params(review);
        let result = self
            .clients
            .with_handle(|handle| async move { handle.execute(UPDATE_REVIEW, &params).await })
            .await?;

        if result.rows_affected == 0 {
            return Err(PortError::not_found("Review", review.id()));
        }
        Ok(())
    }

    /// Deletes a review; deleting a missing review is not an error
    #[instrument(skip(self), fields(review_id = %id))]
    async fn delete(&self, id: &ReviewId) -> Result<(), PortError> {
        debug!("Deleting review");
        let params = vec![SqlValue::from(*id.as_uuid())];
        self.clients
            .with_handle(|handle| async move { handle.execute(DELETE_REVIEW, &params).await })
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(review_id = %id))]
    async fn find_by_id(&self, id: &ReviewId) -> Result<Option<Review>, PortError> {
        debug!("Fetching review by ID");
        let params = vec![SqlValue::from(*id.as_uuid())];
        let rows = self
            .clients
            .with_handle(|handle| async move { handle.execute(SELECT_REVIEW_BY_ID, &params).await })
            .await?;

        let review = rows.first().map(Self::to_domain).transpose()?;
        Ok(review)
    }

    /// Retrieves every review written for a book
    ///
    /// # Arguments
    ///
    /// * `book_id` - ISBN of the reviewed book
    ///
    /// # Returns
    ///
    /// The reviews in the order the database returns them; empty if there are none
    #[instrument(skip(self), fields(book_id = %book_id))]
    async fn find_all_by_book_id(&self, book_id: &BookId) -> Result<Vec<Review>, PortError> {
        debug!("Fetching reviews for book");
        let params = vec![SqlValue::from(book_id.value())];
        let rows = self
            .clients
            .with_handle(|handle| async move { handle.execute(SELECT_REVIEWS_BY_BOOK, &params).await })
            .await?;

        let reviews = rows
            .rows
            .iter()
            .map(Self::to_domain)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reviews)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_domain_maps_nullable_comment() {
        let id = ReviewId::new();
        let row = Row::default()
            .with("reviewId", *id.as_uuid())
            .with("bookId", "9784065212345")
            .with("name", "Alice")
            .with("rating", 5i64)
            .with("comment", None::<String>);

        let review = SqlReviewRepository::to_domain(&row).unwrap();
        assert_eq!(review.id(), id);
        assert_eq!(review.rating().value(), 5);
        assert!(review.comment().is_none());
    }

    #[test]
    fn test_to_domain_rejects_invalid_rating() {
        let row = Row::default()
            .with("reviewId", *ReviewId::new().as_uuid())
            .with("bookId", "9784065212345")
            .with("name", "Alice")
            .with("rating", 9i64);

        assert!(matches!(
            SqlReviewRepository::to_domain(&row),
            Err(DatabaseError::SerializationError(_))
        ));
    }
}
