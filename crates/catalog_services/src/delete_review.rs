//! Remove a review

use std::sync::Arc;

use catalog_kernel::{ReviewId, ReviewRepository, TransactionManager};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteReviewCommand {
    pub review_id: String,
}

pub struct DeleteReviewService<T> {
    reviews: Arc<dyn ReviewRepository>,
    transactions: T,
}

impl<T: TransactionManager> DeleteReviewService<T> {
    pub fn new(reviews: Arc<dyn ReviewRepository>, transactions: T) -> Self {
        Self { reviews, transactions }
    }

    /// Deletes the review; fails with `NotFound` if it does not exist
    #[instrument(skip(self, command), fields(review_id = %command.review_id))]
    pub async fn execute(&self, command: DeleteReviewCommand) -> ServiceResult<()> {
        let id: ReviewId = command.review_id.parse()?;

        self.transactions
            .begin(|| async {
                if self.reviews.find_by_id(&id).await?.is_none() {
                    return Err(ServiceError::not_found("Review", id));
                }
                self.reviews.delete(&id).await?;
                Ok(())
            })
            .await?;

        info!(review_id = %id, "Review deleted");
        Ok(())
    }
}
