//! # Domain Types
//!
//! Plain data records for the bookstore. Persistence lives in `kitap-db`;
//! nothing here knows how a record is stored.
//!
//! ## Type Relationships
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐        ┌─────────────────┐    ┌───────────────┐   │
//! │  │      User       │        │      Book       │    │    Author     │   │
//! │  │  ─────────────  │ owner  │  ─────────────  │───►│  name         │   │
//! │  │  email (uniq)   │◄·······│  title, year    │    └───────────────┘   │
//! │  │  username(uniq) │ (opt)  │  price (>= 0)   │    ┌───────────────┐   │
//! │  │  password_hash  │        │  author_id (FK) │───►│    Genre      │   │
//! │  └────────┬────────┘        │  genre_id  (FK) │    │  name         │   │
//! │           │                 └────────┬────────┘    └───────────────┘   │
//! │           │ user_id                  │ book_id                         │
//! │           ▼                          ▼                                  │
//! │  ┌──────────────────────────────────────────────┐                      │
//! │  │   CollectionEntry (Favorite | Cart)          │                      │
//! │  │   UNIQUE (user_id, book_id) per kind         │                      │
//! │  └──────────────────────────────────────────────┘                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Foreign keys point one way only. "Favorites of a user" and "favorites of
//! a book" are explicit store queries, never back-references on a record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

// =============================================================================
// User
// =============================================================================

/// A registered account as stored.
///
/// Never serialized: callers receive [`UserSummary`], which has no hash.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    /// Argon2id PHC string. The plaintext password is never stored.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
}

/// User as shown to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub username: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        UserSummary {
            id: user.id,
            email: user.email,
            username: user.username,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

// =============================================================================
// Author / Genre
// =============================================================================

/// A book author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A genre classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Genre {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Book
// =============================================================================

/// A book in the catalog.
///
/// `image_ref` and `pdf_ref` are opaque file names; nothing in the store
/// checks that the files exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub year: i32,
    pub image_ref: String,
    pub pdf_ref: String,
    /// Price in whole tenge. Never negative.
    pub price: i64,
    pub author_id: String,
    pub genre_id: String,
    /// Uploading user, if any. Seeded books have none. Kept as a historical
    /// reference after the owner is deleted.
    pub owner_user_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or updating a book.
///
/// On update `owner_user_id` is ignored: ownership is fixed at creation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub year: i32,
    pub image_ref: String,
    pub pdf_ref: String,
    pub price: i64,
    pub author_id: String,
    pub genre_id: String,
    pub owner_user_id: Option<String>,
}

/// Catalog projection: a book joined with its author and genre names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BookView {
    pub id: String,
    pub title: String,
    pub year: i32,
    pub image_ref: String,
    pub pdf_ref: String,
    pub price: i64,
    pub author_id: String,
    pub author_name: String,
    pub genre_id: String,
    pub genre_name: String,
    pub owner_user_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Collections (Favorite / Cart)
// =============================================================================

/// Which per-user collection an entry belongs to.
///
/// Favorites and cart have the same shape and rules; only the table differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Favorite,
    Cart,
}

impl CollectionKind {
    /// All kinds, in profile order.
    pub const ALL: [CollectionKind; 2] = [CollectionKind::Favorite, CollectionKind::Cart];

    /// Backing table name.
    pub const fn table(self) -> &'static str {
        match self {
            CollectionKind::Favorite => "favorites",
            CollectionKind::Cart => "cart_items",
        }
    }

    /// Human-readable entity name used in error messages.
    pub const fn entity(self) -> &'static str {
        match self {
            CollectionKind::Favorite => "Favorite",
            CollectionKind::Cart => "Cart item",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionKind::Favorite => f.write_str("favorite"),
            CollectionKind::Cart => f.write_str("cart"),
        }
    }
}

/// A stored membership row: `user_id` has `book_id` in some collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct CollectionEntry {
    pub id: String,
    pub user_id: String,
    pub book_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A collection entry as shown to callers, optionally with its book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CollectionItem {
    pub id: String,
    pub user_id: String,
    pub book_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book: Option<BookView>,
}

impl CollectionItem {
    /// Builds an item from a stored entry and an optional projection.
    pub fn new(entry: CollectionEntry, book: Option<BookView>) -> Self {
        CollectionItem {
            id: entry.id,
            user_id: entry.user_id,
            book_id: entry.book_id,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
            book,
        }
    }
}

impl From<CollectionEntry> for CollectionItem {
    fn from(entry: CollectionEntry) -> Self {
        CollectionItem::new(entry, None)
    }
}

// =============================================================================
// Profile
// =============================================================================

/// The signed-in user with both collections, each entry carrying its book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user: UserSummary,
    pub favorites: Vec<CollectionItem>,
    pub cart: Vec<CollectionItem>,
}

// =============================================================================
// Unit Tests
// =============================================================================
