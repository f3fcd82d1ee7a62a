//! Book aggregate and its value objects
//!
//! A book is identified by its ISBN. Title and author are fixed once the
//! book is registered; the price is the only mutable attribute.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ensure_length, CoreError};

/// ISBN-10 or ISBN-13 identifying a book
///
/// Hyphens are accepted on input and stripped; the stored value is digits
/// only (plus a trailing `X` check character for ISBN-10).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    /// Parses and validates an ISBN
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if the value is not a well-formed
    /// ISBN-10 or an ISBN-13 starting with 978/979.
    pub fn new(value: impl AsRef<str>) -> Result<Self, CoreError> {
        let normalized: String = value.as_ref().chars().filter(|c| *c != '-').collect();

        let valid = match normalized.len() {
            10 => {
                let (body, check) = normalized.split_at(9);
                body.chars().all(|c| c.is_ascii_digit())
                    && check.chars().all(|c| c.is_ascii_digit() || c == 'X')
            }
            13 => {
                normalized.chars().all(|c| c.is_ascii_digit())
                    && (normalized.starts_with("978") || normalized.starts_with("979"))
            }
            _ => false,
        };

        if !valid {
            return Err(CoreError::validation(format!(
                "'{}' is not a valid ISBN",
                value.as_ref()
            )));
        }

        Ok(Self(normalized))
    }

    /// Returns the normalized ISBN
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Book title (1 to 1000 characters)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Title(String);

impl Title {
    pub const MAX_LENGTH: usize = 1000;

    pub fn new(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        ensure_length("Title", &value, 1, Self::MAX_LENGTH)?;
        Ok(Self(value))
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

/// Author name (1 to 100 characters)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Author(String);

impl Author {
    pub const MAX_LENGTH: usize = 100;

    pub fn new(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        ensure_length("Author", &value, 1, Self::MAX_LENGTH)?;
        Ok(Self(value))
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

/// Selling price of a book in Japanese yen
///
/// Yen has no minor unit, so amounts are whole numbers between
/// [`Price::MIN`] and [`Price::MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Price {
    amount: Decimal,
}

impl Price {
    pub const MIN: Decimal = dec!(1);
    pub const MAX: Decimal = dec!(1000000);
    pub const CURRENCY: &'static str = "JPY";

    /// Creates a price, rejecting fractional or out-of-range amounts
    pub fn new(amount: Decimal) -> Result<Self, CoreError> {
        if amount.fract() != Decimal::ZERO {
            return Err(CoreError::validation(format!(
                "Price must be a whole yen amount, got {}",
                amount
            )));
        }
        if amount < Self::MIN || amount > Self::MAX {
            return Err(CoreError::validation(format!(
                "Price must be between {} and {} {}, got {}",
                Self::MIN,
                Self::MAX,
                Self::CURRENCY,
                amount
            )));
        }
        Ok(Self { amount: amount.normalize() })
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "¥{}", self.amount)
    }
}

/// A book in the catalog
///
/// Two books are the same book when their ISBNs match, regardless of price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    id: BookId,
    title: Title,
    author: Author,
    price: Price,
}

impl Book {
    /// Creates a new book for registration
    pub fn create(id: BookId, title: Title, author: Author, price: Price) -> Self {
        Self { id, title, author, price }
    }

    /// Rebuilds a book from persisted state
    pub fn reconstruct(id: BookId, title: Title, author: Author, price: Price) -> Self {
        Self { id, title, author, price }
    }

    pub fn id(&self) -> &BookId {
        &self.id
    }

    pub fn title(&self) -> &Title {
        &self.title
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn change_price(&mut self, price: Price) {
        self.price = price;
    }

    /// Identity comparison (same ISBN)
    pub fn same_identity_as(&self, other: &Book) -> bool {
        self.id == other.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_id_strips_hyphens() {
        let id = BookId::new("978-4-06-521234-5").unwrap();
        assert_eq!(id.value(), "9784065212345");
    }

    #[test]
    fn test_book_id_accepts_isbn10_with_x() {
        assert!(BookId::new("400310101X").is_ok());
    }

    #[test]
    fn test_book_id_rejects_bad_prefix() {
        assert!(BookId::new("1234567890123").is_err());
    }

    #[test]
    fn test_price_rejects_fraction() {
        assert!(Price::new(dec!(100.5)).is_err());
    }

    #[test]
    fn test_change_price_keeps_identity() {
        let id = BookId::new("9784065212345").unwrap();
        let original = Book::create(
            id.clone(),
            Title::new("Domain-Driven Design").unwrap(),
            Author::new("Eric Evans").unwrap(),
            Price::new(dec!(5000)).unwrap(),
        );
        let mut changed = original.clone();
        changed.change_price(Price::new(dec!(4200)).unwrap());

        assert!(original.same_identity_as(&changed));
        assert_eq!(changed.price().amount(), dec!(4200));
    }
}
