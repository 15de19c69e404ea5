//! # Repository Module
//!
//! One repository per entity, each holding a clone of the pool.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories                                         │
//! │                                                                         │
//! │  kitap-service                                                         │
//! │       │                                                                 │
//! │       │  db.favorites().add(user_id, book_id)                          │
//! │       ▼                                                                 │
//! │  CollectionRepository { kind: Favorite }                               │
//! │  ├── add(user_id, book_id)        guarded INSERT ... WHERE EXISTS      │
//! │  ├── remove_owned(entry_id, user) DELETE ... AND user_id = ?           │
//! │  └── list_for_user / list_for_book                                     │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Foreign keys point one way. Reverse lookups ("favorites of a book") are
//! explicit query methods, not fields on the records.
//!
//! ## Available Repositories
//!
//! - [`UserRepository`](user::UserRepository) - Accounts, login lookup, cascading delete
//! - [`NamedRepository`](named::NamedRepository) - Authors and genres
//!   ([`AuthorRepository`](named::AuthorRepository),
//!   [`GenreRepository`](named::GenreRepository))
//! - [`BookRepository`](book::BookRepository) - Books and the catalog projection
//! - [`CollectionRepository`](collection::CollectionRepository) - Favorites and cart

pub mod book;
pub mod collection;
pub mod named;
pub mod user;

/// Columns of the catalog projection, for `books b` joined with
/// `authors a` and `genres g`.
pub(crate) const BOOK_VIEW_COLUMNS: &str = r#"
    b.id,
    b.title,
    b.year,
    b.image_ref,
    b.pdf_ref,
    b.price,
    b.author_id,
    a.name AS author_name,
    b.genre_id,
    g.name AS genre_name,
    b.owner_user_id,
    b.created_at,
    b.updated_at
"#;

/// Join producing the catalog projection.
pub(crate) const BOOK_VIEW_JOIN: &str = r#"
    books b
    INNER JOIN authors a ON a.id = b.author_id
    INNER JOIN genres g ON g.id = b.genre_id
"#;
