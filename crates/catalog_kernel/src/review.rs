//! Review aggregate and its value objects

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::book::BookId;
use crate::error::{ensure_length, CoreError};

/// Unique identifier of a review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(Uuid);

impl ReviewId {
    /// Creates a new random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReviewId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReviewId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| CoreError::validation(format!("Invalid review id '{}': {}", s, e)))
    }
}

/// Reviewer display name (1 to 100 characters)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Name(String);

impl Name {
    pub const MAX_LENGTH: usize = 100;

    pub fn new(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        ensure_length("Name", &value, 1, Self::MAX_LENGTH)?;
        Ok(Self(value))
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

/// Star rating from 1 to 5
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 5;

    pub fn new(value: i64) -> Result<Self, CoreError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(CoreError::validation(format!(
                "Rating must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            )));
        }
        Ok(Self(value as u8))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

/// Free-text review comment (at most 1000 characters, may be empty)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Comment(String);

impl Comment {
    pub const MAX_LENGTH: usize = 1000;

    pub fn new(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        ensure_length("Comment", &value, 0, Self::MAX_LENGTH)?;
        Ok(Self(value))
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

/// Partial update applied by [`Review::edit`]
///
/// `None` leaves the field untouched. For the comment, `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct ReviewEdit {
    pub name: Option<Name>,
    pub rating: Option<Rating>,
    pub comment: Option<Option<Comment>>,
}

/// A reader's review of a book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    id: ReviewId,
    book_id: BookId,
    name: Name,
    rating: Rating,
    comment: Option<Comment>,
}

impl Review {
    /// Creates a new review with a fresh identifier
    pub fn create(book_id: BookId, name: Name, rating: Rating, comment: Option<Comment>) -> Self {
        Self {
            id: ReviewId::new(),
            book_id,
            name,
            rating,
            comment,
        }
    }

    /// Rebuilds a review from persisted state
    pub fn reconstruct(
        id: ReviewId,
        book_id: BookId,
        name: Name,
        rating: Rating,
        comment: Option<Comment>,
    ) -> Self {
        Self { id, book_id, name, rating, comment }
    }

    pub fn id(&self) -> ReviewId {
        self.id
    }

    pub fn book_id(&self) -> &BookId {
        &self.book_id
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn rating(&self) -> Rating {
        self.rating
    }

    pub fn comment(&self) -> Option<&Comment> {
        self.comment.as_ref()
    }

    pub fn edit(&mut self, edit: ReviewEdit) {
        if let Some(name) = edit.name {
            self.name = name;
        }
        if let Some(rating) = edit.rating {
            self.rating = rating;
        }
        if let Some(comment) = edit.comment {
            self.comment = comment;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Review {
        Review::create(
            BookId::new("9784065212345").unwrap(),
            Name::new("Alice").unwrap(),
            Rating::new(4).unwrap(),
            Some(Comment::new("Worth reading twice").unwrap()),
        )
    }

    #[test]
    fn test_edit_only_touches_given_fields() {
        let mut review = sample();
        review.edit(ReviewEdit {
            rating: Some(Rating::new(2).unwrap()),
            ..Default::default()
        });

        assert_eq!(review.rating().value(), 2);
        assert_eq!(review.name().value(), "Alice");
        assert!(review.comment().is_some());
    }

    #[test]
    fn test_edit_can_clear_comment() {
        let mut review = sample();
        review.edit(ReviewEdit {
            comment: Some(None),
            ..Default::default()
        });
        assert!(review.comment().is_none());
    }

    #[test]
    fn test_review_id_parse_roundtrip() {
        let id = ReviewId::new();
        let parsed: ReviewId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_review_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<ReviewId>().is_err());
    }
}
