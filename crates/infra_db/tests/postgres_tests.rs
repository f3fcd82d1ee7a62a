//! PostgreSQL end-to-end tests
//!
//! These start a PostgreSQL container and need Docker. Run with
//! `cargo test -p infra_db --test postgres_tests -- --ignored`.

use catalog_kernel::{BookRepository, PortError, Price, ReviewRepository};
use infra_db::{ClientManager, SqlBookRepository, SqlReviewRepository, SqlTransactionManager};
use rust_decimal_macros::dec;
use test_utils::{sample_book, sample_review, TestDatabase};

struct Catalog {
    db: TestDatabase,
    books: SqlBookRepository,
    reviews: SqlReviewRepository,
    transactions: SqlTransactionManager,
}

async fn catalog() -> Catalog {
    let db = TestDatabase::new().await.expect("Failed to start test database");
    let clients = ClientManager::postgres(db.pool().clone());
    Catalog {
        books: SqlBookRepository::new(clients.clone()),
        reviews: SqlReviewRepository::new(clients.clone()),
        transactions: SqlTransactionManager::new(clients),
        db,
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_book_and_review_round_trip() {
    let c = catalog().await;
    let book = sample_book();
    let review = sample_review(&book);

    c.books.save(&book).await.unwrap();
    c.reviews.save(&review).await.unwrap();

    let found = c.reviews.find_by_id(&review.id()).await.unwrap();
    assert_eq!(found, Some(review));

    let stored = c.books.find_by_id(book.id()).await.unwrap().unwrap();
    assert_eq!(stored.price().amount(), dec!(5280));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_failed_unit_leaves_no_rows_behind() {
    let c = catalog().await;
    let book = sample_book();
    c.books.save(&book).await.unwrap();

    let result = c
        .transactions
        .begin(|| async {
            c.reviews.save(&sample_review(&book)).await?;
            // Violates the primary key
            c.books.save(&book).await?;
            Ok::<_, PortError>(())
        })
        .await;

    assert!(matches!(result, Err(PortError::Conflict { .. })));
    assert_eq!(c.db.count_rows("Review").await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_committed_unit_is_visible_to_other_connections() {
    let c = catalog().await;
    let mut book = sample_book();
    c.books.save(&book).await.unwrap();
    book.change_price(Price::new(dec!(3980)).unwrap());

    c.transactions
        .begin(|| async {
            c.reviews.save(&sample_review(&book)).await?;
            c.books.update(&book).await?;
            Ok::<_, PortError>(())
        })
        .await
        .unwrap();

    assert_eq!(c.db.count_rows("Review").await.unwrap(), 1);
    let stored = c.books.find_by_id(book.id()).await.unwrap().unwrap();
    assert_eq!(stored.price().amount(), dec!(3980));

    c.db.clear_data().await.unwrap();
    assert_eq!(c.db.count_rows("Book").await.unwrap(), 0);
}
