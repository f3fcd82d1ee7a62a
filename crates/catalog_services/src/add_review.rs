//! Post a review for a book

use std::sync::Arc;

use catalog_kernel::{
    BookId, BookRepository, Comment, Name, Rating, Review, ReviewRepository, TransactionManager,
};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::dto::ReviewDto;
use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Deserialize)]
pub struct AddReviewCommand {
    pub book_id: String,
    pub name: String,
    pub rating: i64,
    pub comment: Option<String>,
}

pub struct AddReviewService<T> {
    reviews: Arc<dyn ReviewRepository>,
    books: Arc<dyn BookRepository>,
    transactions: T,
}

impl<T: TransactionManager> AddReviewService<T> {
    pub fn new(
        reviews: Arc<dyn ReviewRepository>,
        books: Arc<dyn BookRepository>,
        transactions: T,
    ) -> Self {
        Self { reviews, books, transactions }
    }

    /// Saves a new review; the reviewed book must already be registered
    #[instrument(skip(self, command), fields(book_id = %command.book_id))]
    pub async fn execute(&self, command: AddReviewCommand) -> ServiceResult<ReviewDto> {
        let book_id = BookId::new(&command.book_id)?;
        let comment = command
            .comment
            .filter(|text| !text.is_empty())
            .map(Comment::new)
            .transpose()?;
        let review = Review::create(
            book_id,
            Name::new(command.name)?,
            Rating::new(command.rating)?,
            comment,
        );

        self.transactions
            .begin(|| async {
                if self.books.find_by_id(review.book_id()).await?.is_none() {
                    return Err(ServiceError::not_found("Book", review.book_id()));
                }
                self.reviews.save(&review).await?;
                Ok(())
            })
            .await?;

        info!(review_id = %review.id(), "Review added");
        Ok(ReviewDto::from(&review))
    }
}
