//! # kitap-db: Entity Store for Qazaq Kitap
//!
//! Durable records for users, the book catalog and per-user collections,
//! stored in SQLite through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Qazaq Kitap Data Flow                             │
//! │                                                                         │
//! │  kitap-service (register, login, add to cart ...)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kitap-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐ │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │ │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │ │   │
//! │  │   │               │    │ UserRepo       │    │              │ │   │
//! │  │   │ SqlitePool    │◄───│ Author/Genre   │    │ 001_initial  │ │   │
//! │  │   │               │    │ BookRepo       │    │   _schema    │ │   │
//! │  │   │               │    │ CollectionRepo │    │              │ │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘ │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL, foreign keys ON)                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Integrity Rules Enforced Here
//!
//! - email and username are unique (`UNIQUE` indexes are the arbiter)
//! - a book's author and genre must exist (guarded insert/update)
//! - one favorite and one cart row per (user, book)
//! - deleting a user or a book removes its collection rows in the same
//!   transaction
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kitap_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./data/kitap.db")).await?;
//! let books = db.books().list_views().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use migrations::MigrationStatus;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::book::BookRepository;
pub use repository::collection::CollectionRepository;
pub use repository::named::{AuthorRepository, GenreRepository, NamedEntity, NamedRepository};
pub use repository::user::UserRepository;
