//! # Validation Module
//!
//! Input validation for registration, login and catalog writes.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (HTTP layer, frontend)                                │
//! │  └── Deserialization, immediate feedback                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Required fields, lengths, formats, password policy                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK (price >= 0)                                     │
//! │  ├── UNIQUE (email), UNIQUE (username), UNIQUE (user_id, book_id)      │
//! │  └── FOREIGN KEY (author_id, genre_id, user_id, book_id)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kitap_core::validation::{validate_email, validate_password};
//!
//! assert!(validate_email("a@x.com").is_ok());
//! assert!(validate_password("short").is_err());
//! ```

use crate::error::ValidationError;
use crate::{NewBook, MAX_TEXT_LEN, MIN_PASSWORD_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Helpers
// =============================================================================

/// Trims `value` and rejects it when empty or longer than `max` characters.
fn required_text<'a>(field: &str, value: &'a str, max: usize) -> ValidationResult<&'a str> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value)
}

// =============================================================================
// Account Validators
// =============================================================================

/// Validates an email address.
///
/// ## Rules
/// - Required, at most 255 characters
/// - Exactly one `@`, with a non-empty local part and domain
/// - No whitespace
///
/// Deliverability is not checked.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = required_text("email", email, MAX_TEXT_LEN)?;

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain whitespace"));
    }

    let mut parts = email.split('@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().ok_or_else(|| invalid("must contain '@'"))?;

    if parts.next().is_some() {
        return Err(invalid("must contain a single '@'"));
    }
    if local.is_empty() || domain.is_empty() {
        return Err(invalid("must have a name and a domain"));
    }

    Ok(())
}

/// Validates a username.
///
/// ## Rules
/// - Required, 3 to 255 characters
/// - Letters, digits, `_`, `-` and `.` only
pub fn validate_username(username: &str) -> ValidationResult<()> {
    let username = required_text("username", username, MAX_TEXT_LEN)?;

    if username.chars().count() < 3 {
        return Err(ValidationError::TooShort {
            field: "username".to_string(),
            min: 3,
        });
    }

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must contain only letters, numbers, '_', '-' and '.'".to_string(),
        });
    }

    Ok(())
}

/// Validates a password against the acceptance policy.
///
/// Only length is checked (at least 8 characters). The password is
/// taken verbatim, never trimmed.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    validate_password_min(password, MIN_PASSWORD_LEN)
}

/// Like [`validate_password`] with a configurable minimum.
///
/// `min` below [`MIN_PASSWORD_LEN`] is raised to it.
pub fn validate_password_min(password: &str, min: usize) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::required("password"));
    }

    let min = min.max(MIN_PASSWORD_LEN);
    if password.chars().count() < min {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min,
        });
    }

    Ok(())
}

/// Validates login input and returns the trimmed login id.
///
/// Both fields are required; nothing else is checked here so that the
/// store, not the validator, decides whether the account exists.
pub fn validate_login(login_id: &str, password: &str) -> ValidationResult<String> {
    let login_id = login_id.trim();

    if login_id.is_empty() {
        return Err(ValidationError::required("login"));
    }
    if password.is_empty() {
        return Err(ValidationError::required("password"));
    }

    Ok(login_id.to_string())
}

// =============================================================================
// Catalog Validators
// =============================================================================

/// Validates an author or genre name.
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    required_text(field, name, MAX_TEXT_LEN).map(|_| ())
}

/// Validates a price in whole tenge.
///
/// ## Example
/// ```rust
/// use kitap_core::validation::validate_price;
///
/// assert!(validate_price(4500).is_ok());
/// assert!(validate_price(0).is_ok());     // Free book
/// assert!(validate_price(-100).is_err());
/// ```
pub fn validate_price(price: i64) -> ValidationResult<()> {
    if price < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a publication year (0 to 9999).
///
/// Classical works predate any modern cutoff, so only the range is checked.
pub fn validate_year(year: i32) -> ValidationResult<()> {
    if !(0..=9999).contains(&year) {
        return Err(ValidationError::OutOfRange {
            field: "year".to_string(),
            min: 0,
            max: 9999,
        });
    }

    Ok(())
}

/// Validates every field of a book before it reaches the store.
///
/// Reference existence (author, genre) is the store's check, not this one.
pub fn validate_book(book: &NewBook) -> ValidationResult<()> {
    required_text("title", &book.title, MAX_TEXT_LEN)?;
    validate_year(book.year)?;
    required_text("image", &book.image_ref, MAX_TEXT_LEN)?;
    required_text("pdf", &book.pdf_ref, MAX_TEXT_LEN)?;
    validate_price(book.price)?;
    validate_uuid("author_id", &book.author_id)?;
    validate_uuid("genre_id", &book.genre_id)?;

    if let Some(owner) = &book.owner_user_id {
        validate_uuid("owner_user_id", owner)?;
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates an identifier string.
///
/// ## Example
/// ```rust
/// use kitap_core::validation::validate_uuid;
///
/// assert!(validate_uuid("book_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("book_id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required(field));
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_book() -> NewBook {
        NewBook {
            title: "Абай жолы".to_string(),
            year: 1942,
            image_ref: "abai.jpg".to_string(),
            pdf_ref: "abai.pdf".to_string(),
            price: 3500,
            author_id: "550e8400-e29b-41d4-a716-446655440000".to_string(),
            genre_id: "550e8400-e29b-41d4-a716-446655440001".to_string(),
            owner_user_id: None,
        }
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("  alice@example.kz ").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("two@@x.com").is_err());
        assert!(validate_email("@x.com").is_err());
        assert!(validate_email("a@").is_err());
        assert!(validate_email("a b@x.com").is_err());
        assert!(validate_email(&format!("{}@x.com", "a".repeat(300))).is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("Әлия_99").is_ok());

        assert!(validate_username("").is_err());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("semi;colon").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("password1").is_ok());
        assert!(validate_password("12345678").is_ok());

        assert_eq!(
            validate_password("short"),
            Err(ValidationError::TooShort {
                field: "password".to_string(),
                min: 8
            })
        );
        assert!(validate_password("").unwrap_err().is_missing());
    }

    #[test]
    fn test_password_minimum_cannot_be_lowered() {
        assert!(validate_password_min("1234567", 4).is_err());
        assert!(validate_password_min("1234567890", 10).is_ok());
        assert!(validate_password_min("123456789", 10).is_err());
    }

    #[test]
    fn test_validate_login() {
        assert_eq!(validate_login("  alice ", "pw").unwrap(), "alice");
        assert!(validate_login("", "pw").unwrap_err().is_missing());
        assert!(validate_login("alice", "").unwrap_err().is_missing());
    }

    #[test]
    fn test_validate_price_and_year() {
        assert!(validate_price(0).is_ok());
        assert!(validate_price(-1).is_err());

        assert!(validate_year(1855).is_ok());
        assert!(validate_year(-1).is_err());
        assert!(validate_year(10_000).is_err());
    }

    #[test]
    fn test_validate_book() {
        assert!(validate_book(&sample_book()).is_ok());

        let mut book = sample_book();
        book.price = -5;
        assert_eq!(validate_book(&book).unwrap_err().field(), "price");

        let mut book = sample_book();
        book.title = "   ".to_string();
        assert!(validate_book(&book).unwrap_err().is_missing());

        let mut book = sample_book();
        book.genre_id = "fiction".to_string();
        assert_eq!(validate_book(&book).unwrap_err().field(), "genre_id");
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("id", "").is_err());
        assert!(validate_uuid("id", "123").is_err());
    }
}
