//! Use Case Tests
//!
//! Runs the services over the real SQL repositories and transaction
//! manager, backed by the recording pool.
//!
//! # Test Organization
//!
//! - `register_book` - happy path, duplicate ISBN, validation
//! - `add_review` - book must exist, optional comment
//! - `edit_review` - partial edits, missing review
//! - `delete_review` - missing review, infrastructure failure

use std::sync::Arc;

use catalog_services::{
    AddReviewCommand, AddReviewService, DeleteReviewCommand, DeleteReviewService,
    EditReviewCommand, EditReviewService, RegisterBookCommand, RegisterBookService, ServiceError,
};
use infra_db::{ClientManager, SqlBookRepository, SqlReviewRepository, SqlTransactionManager};
use rust_decimal_macros::dec;
use test_utils::{book_row, review_row, rows_of, sample_book, sample_review, RecordingPool, SAMPLE_ISBN};

// ============================================================================
// TEST FIXTURES
// ============================================================================

const SELECT_BOOK: &str = r#"SELECT "bookId", "title", "author", "price" FROM "Book""#;
const SELECT_REVIEW_BY_ID: &str =
    r#"SELECT "reviewId", "bookId", "name", "rating", "comment" FROM "Review" WHERE "reviewId""#;

struct Wiring {
    pool: RecordingPool,
    books: Arc<SqlBookRepository>,
    reviews: Arc<SqlReviewRepository>,
    transactions: SqlTransactionManager,
}

fn wiring() -> Wiring {
    let pool = RecordingPool::new();
    let clients = ClientManager::new(pool.clone());
    Wiring {
        books: Arc::new(SqlBookRepository::new(clients.clone())),
        reviews: Arc::new(SqlReviewRepository::new(clients.clone())),
        transactions: SqlTransactionManager::new(clients),
        pool,
    }
}

fn register_command(isbn: &str) -> RegisterBookCommand {
    RegisterBookCommand {
        isbn: isbn.to_string(),
        title: "Domain-Driven Design".to_string(),
        author: "Eric Evans".to_string(),
        price: dec!(5280),
    }
}

// ============================================================================
// REGISTER BOOK
// ============================================================================

mod register_book {
    use super::*;

    #[tokio::test]
    async fn test_registers_new_book() {
        let w = wiring();
        let service = RegisterBookService::new(w.books.clone(), w.transactions.clone());

        let dto = service.execute(register_command("978-4-7981-2196-3")).await.unwrap();

        assert_eq!(dto.isbn, SAMPLE_ISBN);
        assert_eq!(dto.price, dec!(5280));
        assert!(w.pool.is_visible(r#"INSERT INTO "Book""#));
        assert_eq!(w.pool.count("BEGIN"), 1);
        assert_eq!(w.pool.count("COMMIT"), 1);
        assert_eq!(w.pool.acquire_count(), 1);
        assert_eq!(w.pool.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_isbn_is_a_conflict() {
        let w = wiring();
        w.pool.respond_to(SELECT_BOOK, rows_of(book_row(&sample_book())));
        let service = RegisterBookService::new(w.books.clone(), w.transactions.clone());

        let result = service.execute(register_command(SAMPLE_ISBN)).await;

        assert!(matches!(result, Err(ServiceError::Conflict(_))));
        assert_eq!(w.pool.count(r#"INSERT INTO "Book""#), 0);
        assert_eq!(w.pool.count("ROLLBACK"), 1);
    }

    #[tokio::test]
    async fn test_invalid_command_never_touches_the_pool() {
        let w = wiring();
        let service = RegisterBookService::new(w.books.clone(), w.transactions.clone());
        let mut command = register_command(SAMPLE_ISBN);
        command.price = dec!(0);

        let result = service.execute(command).await;

        assert!(matches!(result, Err(ServiceError::Validation(_))));
        assert_eq!(w.pool.acquire_count(), 0);
    }
}

// ============================================================================
// ADD REVIEW
// ============================================================================

mod add_review {
    use super::*;

    fn command(comment: Option<&str>) -> AddReviewCommand {
        AddReviewCommand {
            book_id: SAMPLE_ISBN.to_string(),
            name: "Alice".to_string(),
            rating: 5,
            comment: comment.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_adds_review_to_existing_book() {
        let w = wiring();
        w.pool.respond_to(SELECT_BOOK, rows_of(book_row(&sample_book())));
        let service = AddReviewService::new(w.reviews.clone(), w.books.clone(), w.transactions.clone());

        let dto = service.execute(command(Some("Worth rereading"))).await.unwrap();

        assert_eq!(dto.rating, 5);
        assert_eq!(dto.comment.as_deref(), Some("Worth rereading"));
        assert!(w.pool.is_visible(r#"INSERT INTO "Review""#));
        // Lookup and insert ran on the same connection
        assert_eq!(w.pool.connections_used().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_comment_is_stored_as_none() {
        let w = wiring();
        w.pool.respond_to(SELECT_BOOK, rows_of(book_row(&sample_book())));
        let service = AddReviewService::new(w.reviews.clone(), w.books.clone(), w.transactions.clone());

        let dto = service.execute(command(Some(""))).await.unwrap();

        assert!(dto.comment.is_none());
    }

    #[tokio::test]
    async fn test_unknown_book_is_not_found() {
        let w = wiring();
        let service = AddReviewService::new(w.reviews.clone(), w.books.clone(), w.transactions.clone());

        let result = service.execute(command(None)).await;

        assert!(matches!(result, Err(ref e) if e.is_not_found()));
        assert_eq!(w.pool.count(r#"INSERT INTO "Review""#), 0);
        assert_eq!(w.pool.count("ROLLBACK"), 1);
        assert_eq!(w.pool.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_failed_insert_leaves_nothing_committed() {
        let w = wiring();
        w.pool.respond_to(SELECT_BOOK, rows_of(book_row(&sample_book())));
        w.pool.fail_on(r#"INSERT INTO "Review""#, "rating check violated");
        let service = AddReviewService::new(w.reviews.clone(), w.books.clone(), w.transactions.clone());

        let result = service.execute(command(None)).await;

        assert!(matches!(result, Err(ServiceError::Port(_))));
        assert!(w.pool.committed().is_empty());
        assert_eq!(w.pool.returned_count(), 1);
    }
}

// ============================================================================
// EDIT REVIEW
// ============================================================================

mod edit_review {
    use super::*;

    #[tokio::test]
    async fn test_partial_edit_keeps_other_fields() {
        let w = wiring();
        let review = sample_review(&sample_book());
        w.pool.respond_to(SELECT_REVIEW_BY_ID, rows_of(review_row(&review)));
        let service = EditReviewService::new(w.reviews.clone(), w.transactions.clone());

        let dto = service
            .execute(EditReviewCommand {
                review_id: review.id().to_string(),
                rating: Some(2),
                ..EditReviewCommand::default()
            })
            .await
            .unwrap();

        assert_eq!(dto.rating, 2);
        assert_eq!(dto.name, "Alice");
        assert_eq!(dto.comment.as_deref(), Some("Dense but worth it"));
        assert!(w.pool.is_visible(r#"UPDATE "Review""#));
    }

    #[tokio::test]
    async fn test_missing_review_is_not_found() {
        let w = wiring();
        let service = EditReviewService::new(w.reviews.clone(), w.transactions.clone());

        let result = service
            .execute(EditReviewCommand {
                review_id: "5f0c6f3e-5a8e-4b8e-9a38-2f1b0a4c9d11".to_string(),
                name: Some("Bob".to_string()),
                ..EditReviewCommand::default()
            })
            .await;

        assert!(matches!(result, Err(ref e) if e.is_not_found()));
        assert_eq!(w.pool.count(r#"UPDATE "Review""#), 0);
    }

    #[tokio::test]
    async fn test_malformed_id_is_a_validation_error() {
        let w = wiring();
        let service = EditReviewService::new(w.reviews.clone(), w.transactions.clone());

        let result = service
            .execute(EditReviewCommand {
                review_id: "not-a-uuid".to_string(),
                ..EditReviewCommand::default()
            })
            .await;

        assert!(matches!(result, Err(ServiceError::Validation(_))));
        assert_eq!(w.pool.acquire_count(), 0);
    }
}

// ============================================================================
// DELETE REVIEW
// ============================================================================

mod delete_review {
    use super::*;

    #[tokio::test]
    async fn test_deletes_existing_review() {
        let w = wiring();
        let review = sample_review(&sample_book());
        w.pool.respond_to(SELECT_REVIEW_BY_ID, rows_of(review_row(&review)));
        let service = DeleteReviewService::new(w.reviews.clone(), w.transactions.clone());

        service
            .execute(DeleteReviewCommand { review_id: review.id().to_string() })
            .await
            .unwrap();

        assert!(w.pool.is_visible(r#"DELETE FROM "Review""#));
        assert_eq!(w.pool.count("COMMIT"), 1);
    }

    #[tokio::test]
    async fn test_missing_review_is_not_found() {
        let w = wiring();
        let service = DeleteReviewService::new(w.reviews.clone(), w.transactions.clone());

        let result = service
            .execute(DeleteReviewCommand {
                review_id: "5f0c6f3e-5a8e-4b8e-9a38-2f1b0a4c9d11".to_string(),
            })
            .await;

        assert!(matches!(result, Err(ref e) if e.is_not_found()));
        assert_eq!(w.pool.count(r#"DELETE FROM "Review""#), 0);
    }

    #[tokio::test]
    async fn test_pool_outage_is_reported_as_port_error() {
        let w = wiring();
        w.pool.fail_acquire(true);
        let service = DeleteReviewService::new(w.reviews.clone(), w.transactions.clone());

        let result = service
            .execute(DeleteReviewCommand {
                review_id: "5f0c6f3e-5a8e-4b8e-9a38-2f1b0a4c9d11".to_string(),
            })
            .await;

        assert!(matches!(result, Err(ServiceError::Port(ref e)) if e.is_connection_error()));
    }
}

#[test]
fn test_review_dto_serializes_to_json() {
    let review = sample_review(&sample_book());
    let dto = catalog_services::ReviewDto::from(&review);

    let json = serde_json::to_value(&dto).unwrap();
    assert_eq!(json["book_id"], SAMPLE_ISBN);
    assert_eq!(json["rating"], 4);
}
