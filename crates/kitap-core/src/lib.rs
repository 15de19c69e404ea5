//! # kitap-core: Domain Model for Qazaq Kitap
//!
//! This crate holds the records, rules and error taxonomy of the bookstore
//! as pure code with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Qazaq Kitap Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Caller (HTTP layer, CLI, tests)                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │   kitap-service: sessions, auth guard, collections, catalog     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kitap-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌────────────┐  ┌───────────┐  ┌───────────┐ │   │
//! │  │   │   types   │  │ credential │  │   error   │  │ validation│ │   │
//! │  │   │ User,Book │  │  argon2id  │  │ CoreError │  │   rules   │ │   │
//! │  │   │ Favorite  │  │ hash/verify│  │           │  │           │ │   │
//! │  │   └───────────┘  └────────────┘  └───────────┘  └───────────┘ │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 kitap-db (Entity store)                         │   │
//! │  │          SQLite queries, migrations, repositories               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (User, Author, Genre, Book, collection entries)
//! - [`credential`] - One-way password hashing and verification
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//!
//! ## Example Usage
//!
//! ```rust
//! use kitap_core::credential::{hash_password, verify_password};
//! use kitap_core::validation::validate_password;
//!
//! validate_password("password1").unwrap();
//! let hash = hash_password("password1").unwrap();
//!
//! assert!(verify_password("password1", &hash));
//! assert!(!verify_password("password2", &hash));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod credential;
pub mod error;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Maximum length of any stored text column (email, username, names, refs).
pub const MAX_TEXT_LEN: usize = 255;

/// Default lifetime of an authenticated session: one day.
pub const SESSION_TTL_SECS: u64 = 24 * 60 * 60;

/// Generates a new opaque identifier (UUID v4, hyphenated).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
