//! Property tests for the catalog value objects

use catalog_kernel::{Author, BookId, Comment, Name, Price, Rating, Title};
use proptest::prelude::*;
use rust_decimal::Decimal;

proptest! {
    #[test]
    fn rating_accepts_only_one_to_five(value in -10i64..20) {
        let result = Rating::new(value);
        prop_assert_eq!(result.is_ok(), (1..=5).contains(&value));
    }

    #[test]
    fn price_accepts_whole_yen_in_range(amount in -100i64..1_000_100) {
        let result = Price::new(Decimal::from(amount));
        prop_assert_eq!(result.is_ok(), (1..=1_000_000).contains(&amount));
    }

    #[test]
    fn isbn13_with_valid_prefix_is_accepted(rest in "[0-9]{10}", prefix in prop::sample::select(vec!["978", "979"])) {
        let raw = format!("{}{}", prefix, rest);
        let id = BookId::new(&raw).unwrap();
        prop_assert_eq!(id.value(), raw.as_str());
    }

    #[test]
    fn name_length_is_bounded(name in "\\PC{0,120}") {
        let len = name.chars().count();
        prop_assert_eq!(Name::new(name).is_ok(), (1..=100).contains(&len));
    }
}

#[test]
fn test_empty_title_is_rejected() {
    assert!(Title::new("").is_err());
    assert!(Title::new("a".repeat(Title::MAX_LENGTH)).is_ok());
    assert!(Title::new("a".repeat(Title::MAX_LENGTH + 1)).is_err());
}

#[test]
fn test_author_length_limit() {
    assert!(Author::new("a".repeat(Author::MAX_LENGTH + 1)).is_err());
}

#[test]
fn test_comment_may_be_empty() {
    assert!(Comment::new("").is_ok());
    assert!(Comment::new("a".repeat(Comment::MAX_LENGTH + 1)).is_err());
}

#[test]
fn test_isbn_with_letters_is_rejected() {
    assert!(BookId::new("97840652123AB").is_err());
    assert!(BookId::new("12345").is_err());
}
