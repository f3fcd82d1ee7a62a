//! Partially update an existing review

use std::sync::Arc;

use catalog_kernel::{
    Comment, Name, Rating, ReviewEdit, ReviewId, ReviewRepository, TransactionManager,
};
use serde::Deserialize;
use tracing::instrument;

use crate::dto::ReviewDto;
use crate::error::{ServiceError, ServiceResult};

/// Fields left as `None` keep their stored value. An empty `comment`
/// clears the comment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditReviewCommand {
    pub review_id: String,
    pub name: Option<String>,
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

impl EditReviewCommand {
    fn to_edit(&self) -> ServiceResult<ReviewEdit> {
        let comment = match self.comment.as_deref() {
            None => None,
            Some("") => Some(None),
            Some(text) => Some(Some(Comment::new(text)?)),
        };

        Ok(ReviewEdit {
            name: self.name.clone().map(Name::new).transpose()?,
            rating: self.rating.map(Rating::new).transpose()?,
            comment,
        })
    }
}

pub struct EditReviewService<T> {
    reviews: Arc<dyn ReviewRepository>,
    transactions: T,
}

impl<T: TransactionManager> EditReviewService<T> {
    pub fn new(reviews: Arc<dyn ReviewRepository>, transactions: T) -> Self {
        Self { reviews, transactions }
    }

    #[instrument(skip(self, command), fields(review_id = %command.review_id))]
    pub async fn execute(&self, command: EditReviewCommand) -> ServiceResult<ReviewDto> {
        let id: ReviewId = command.review_id.parse()?;
        let edit = command.to_edit()?;

        let review = self
            .transactions
            .begin(|| async {
                let mut review = self
                    .reviews
                    .find_by_id(&id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("Review", id))?;
                review.edit(edit);
                self.reviews.update(&review).await?;
                Ok::<_, ServiceError>(review)
            })
            .await?;

        Ok(ReviewDto::from(&review))
    }
}
