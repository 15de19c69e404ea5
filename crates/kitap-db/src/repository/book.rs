//! # Book Repository
//!
//! Catalog rows and the joined projection served to callers.
//!
//! ## Reference Checks
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create(new_book)                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT INTO books (...)                                               │
//! │  SELECT ... WHERE EXISTS (author) AND EXISTS (genre)                   │
//! │       │                                                                 │
//! │       ├── 1 row  ──► Book                                              │
//! │       │                                                                 │
//! │       └── 0 rows ──► author missing?  ──► ReferenceNotFound(Author)    │
//! │                      else             ──► ReferenceNotFound(Genre)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! The check and the write are one statement, so a dangling reference is
//! never written even if the author is deleted concurrently.
//!
//! ## Cascade
//! Deleting a book removes every favorite and cart row pointing at it in
//! the same transaction.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use super::{BOOK_VIEW_COLUMNS, BOOK_VIEW_JOIN};
use crate::error::{DbError, DbResult};
use kitap_core::validation::validate_book;
use kitap_core::{new_id, Book, BookView, NewBook};

const BOOK_COLUMNS: &str = r#"
    id, title, year, image_ref, pdf_ref, price,
    author_id, genre_id, owner_user_id, created_at, updated_at
"#;

/// Repository for book database operations.
#[derive(Debug, Clone)]
pub struct BookRepository {
    pool: SqlitePool,
}

impl BookRepository {
    /// Creates a new BookRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BookRepository { pool }
    }

    /// Inserts a book after checking its author and genre exist.
    ///
    /// ## Errors
    /// * `DbError::Validation` - a field breaks its rule; nothing is queried
    /// * `DbError::ReferenceNotFound { entity: "Author" }` - checked first
    /// * `DbError::ReferenceNotFound { entity: "Genre" }`
    pub async fn create(&self, new_book: &NewBook) -> DbResult<Book> {
        validate_book(new_book)?;
        debug!(title = %new_book.title, "Inserting book");

        let now = Utc::now();
        let book = Book {
            id: new_id(),
            title: new_book.title.clone(),
            year: new_book.year,
            image_ref: new_book.image_ref.clone(),
            pdf_ref: new_book.pdf_ref.clone(),
            price: new_book.price,
            author_id: new_book.author_id.clone(),
            genre_id: new_book.genre_id.clone(),
            owner_user_id: new_book.owner_user_id.clone(),
            created_at: now,
            updated_at: now,
        };

        let result = sqlx::query(
            r#"
            INSERT INTO books (
                id, title, year, image_ref, pdf_ref, price,
                author_id, genre_id, owner_user_id, created_at, updated_at
            )
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10
            WHERE EXISTS (SELECT 1 FROM authors WHERE id = ?7)
            AND EXISTS (SELECT 1 FROM genres WHERE id = ?8)
            "#,
        )
        .bind(&book.id)
        .bind(&book.title)
        .bind(book.year)
        .bind(&book.image_ref)
        .bind(&book.pdf_ref)
        .bind(book.price)
        .bind(&book.author_id)
        .bind(&book.genre_id)
        .bind(&book.owner_user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.missing_reference(&book.author_id, &book.genre_id).await?);
        }

        Ok(book)
    }

    /// Names the reference that made a guarded write match nothing.
    async fn missing_reference(&self, author_id: &str, genre_id: &str) -> DbResult<DbError> {
        let author_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM authors WHERE id = ?1)")
                .bind(author_id)
                .fetch_one(&self.pool)
                .await?;

        if !author_exists {
            return Ok(DbError::missing_reference("Author", author_id));
        }

        Ok(DbError::missing_reference("Genre", genre_id))
    }

    /// Gets a book by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    /// Gets one book with its author and genre names.
    pub async fn get_view(&self, id: &str) -> DbResult<Option<BookView>> {
        let view = sqlx::query_as::<_, BookView>(&format!(
            "SELECT {BOOK_VIEW_COLUMNS} FROM {BOOK_VIEW_JOIN} WHERE b.id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(view)
    }

    /// Lists every book with its author and genre names, oldest first.
    pub async fn list_views(&self) -> DbResult<Vec<BookView>> {
        let views = sqlx::query_as::<_, BookView>(&format!(
            "SELECT {BOOK_VIEW_COLUMNS} FROM {BOOK_VIEW_JOIN} ORDER BY b.created_at, b.rowid"
        ))
        .fetch_all(&self.pool)
        .await?;

        debug!(count = views.len(), "Listed catalog");
        Ok(views)
    }

    /// Finds the oldest book with exactly this title.
    pub async fn find_by_title(&self, title: &str) -> DbResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE title = ?1 ORDER BY created_at, rowid LIMIT 1"
        ))
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    /// Replaces a book's fields. `owner_user_id` is left untouched.
    ///
    /// ## Errors
    /// * `DbError::Validation` - as for [`create`](Self::create)
    /// * `DbError::NotFound` - no such book
    /// * `DbError::ReferenceNotFound` - as for [`create`](Self::create)
    pub async fn update(&self, id: &str, changes: &NewBook) -> DbResult<Book> {
        validate_book(changes)?;
        debug!(id = %id, "Updating book");

        let result = sqlx::query(
            r#"
            UPDATE books
            SET
                title = ?2,
                year = ?3,
                image_ref = ?4,
                pdf_ref = ?5,
                price = ?6,
                author_id = ?7,
                genre_id = ?8,
                updated_at = ?9
            WHERE id = ?1
            AND EXISTS (SELECT 1 FROM authors WHERE id = ?7)
            AND EXISTS (SELECT 1 FROM genres WHERE id = ?8)
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(changes.year)
        .bind(&changes.image_ref)
        .bind(&changes.pdf_ref)
        .bind(changes.price)
        .bind(&changes.author_id)
        .bind(&changes.genre_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            if self.get_by_id(id).await?.is_none() {
                return Err(DbError::not_found("Book", id));
            }
            return Err(self
                .missing_reference(&changes.author_id, &changes.genre_id)
                .await?);
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Book", id))
    }

    /// Deletes a book and every favorite and cart row referencing it.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting book");

        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        sqlx::query("DELETE FROM favorites WHERE book_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM cart_items WHERE book_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM books WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Book", id));
        }

        tx.commit().await.map_err(DbError::transaction)?;
        Ok(())
    }

    /// Counts books in the catalog.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{create_book, create_user, test_db};

    #[tokio::test]
    async fn test_create_with_unknown_references() {
        let db = test_db().await;
        let genre = db.genres().create("Роман").await.unwrap();

        let mut new_book = NewBook {
            title: "Абай жолы".to_string(),
            year: 1942,
            image_ref: "abai.jpg".to_string(),
            pdf_ref: "abai.pdf".to_string(),
            price: 3500,
            author_id: new_id(),
            genre_id: new_id(),
            owner_user_id: None,
        };

        // Both missing: author is reported
        let err = db.books().create(&new_book).await.unwrap_err();
        assert!(matches!(err, DbError::ReferenceNotFound { ref entity, .. } if entity == "Author"));

        let author = db.authors().create("Мұхтар Әуезов").await.unwrap();
        new_book.author_id = author.id;
        let err = db.books().create(&new_book).await.unwrap_err();
        assert!(matches!(err, DbError::ReferenceNotFound { ref entity, .. } if entity == "Genre"));

        assert_eq!(db.books().count().await.unwrap(), 0);

        new_book.genre_id = genre.id;
        let book = db.books().create(&new_book).await.unwrap();
        assert_eq!(db.books().count().await.unwrap(), 1);

        let view = db.books().get_view(&book.id).await.unwrap().unwrap();
        assert_eq!(view.author_name, "Мұхтар Әуезов");
        assert_eq!(view.genre_name, "Роман");
        assert_eq!(view.price, 3500);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_fields() {
        let db = test_db().await;
        let author = db.authors().create("Мұхтар Әуезов").await.unwrap();
        let genre = db.genres().create("Роман").await.unwrap();

        let valid = NewBook {
            title: "Абай жолы".to_string(),
            year: 1942,
            image_ref: "abai.jpg".to_string(),
            pdf_ref: "abai.pdf".to_string(),
            price: 3500,
            author_id: author.id,
            genre_id: genre.id,
            owner_user_id: None,
        };

        let cases: [(&str, fn(&mut NewBook)); 7] = [
            ("title", |b| b.title = "   ".to_string()),
            ("title", |b| b.title = "қ".repeat(256)),
            ("year", |b| b.year = -5),
            ("year", |b| b.year = 10_000),
            ("image", |b| b.image_ref = String::new()),
            ("pdf", |b| b.pdf_ref = String::new()),
            ("price", |b| b.price = -1),
        ];

        for (field, corrupt) in cases {
            let mut book = valid.clone();
            corrupt(&mut book);

            let err = db.books().create(&book).await.unwrap_err();
            assert!(
                matches!(err, DbError::Validation(ref e) if e.field() == field),
                "{field}: {err}"
            );
            assert!(!err.is_retryable());
        }

        assert_eq!(db.books().count().await.unwrap(), 0);

        // Boundaries are accepted
        let mut edge = valid.clone();
        edge.year = 0;
        edge.price = 0;
        db.books().create(&edge).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_fields_and_keeps_row() {
        let db = test_db().await;
        let book = create_book(&db, "Ақ кеме").await;

        let changes = NewBook {
            title: String::new(),
            year: book.year,
            image_ref: book.image_ref.clone(),
            pdf_ref: book.pdf_ref.clone(),
            price: -100,
            author_id: book.author_id.clone(),
            genre_id: book.genre_id.clone(),
            owner_user_id: None,
        };

        let err = db.books().update(&book.id, &changes).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(ref e) if e.is_missing()));

        let stored = db.books().get_by_id(&book.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Ақ кеме");
        assert_eq!(stored.price, book.price);
    }

    #[tokio::test]
    async fn test_list_views_in_creation_order() {
        let db = test_db().await;
        create_book(&db, "Қара сөздер").await;
        create_book(&db, "Абай жолы").await;
        create_book(&db, "Көшпенділер").await;

        let titles: Vec<_> = db
            .books()
            .list_views()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, ["Қара сөздер", "Абай жолы", "Көшпенділер"]);

        assert!(db.books().find_by_title("Абай жолы").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_keeps_owner_and_checks_references() {
        let db = test_db().await;
        let owner = create_user(&db, "uploader").await;
        let book = create_book(&db, "Ақ кеме").await;
        sqlx::query("UPDATE books SET owner_user_id = ?1 WHERE id = ?2")
            .bind(&owner.id)
            .bind(&book.id)
            .execute(db.pool())
            .await
            .unwrap();

        let mut changes = NewBook {
            title: "Ақ кеме (2-басылым)".to_string(),
            year: 1970,
            image_ref: book.image_ref.clone(),
            pdf_ref: book.pdf_ref.clone(),
            price: 4000,
            author_id: book.author_id.clone(),
            genre_id: book.genre_id.clone(),
            owner_user_id: None,
        };

        let updated = db.books().update(&book.id, &changes).await.unwrap();
        assert_eq!(updated.title, "Ақ кеме (2-басылым)");
        assert_eq!(updated.price, 4000);
        assert_eq!(updated.owner_user_id.as_deref(), Some(owner.id.as_str()));

        changes.genre_id = new_id();
        let err = db.books().update(&book.id, &changes).await.unwrap_err();
        assert!(matches!(err, DbError::ReferenceNotFound { .. }));

        let err = db.books().update("missing", &changes).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_cascades_collections() {
        let db = test_db().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;
        let book = create_book(&db, "Қан мен тер").await;
        let other = create_book(&db, "Ботагөз").await;

        db.favorites().add(&alice.id, &book.id).await.unwrap();
        db.carts().add(&bob.id, &book.id).await.unwrap();
        db.carts().add(&bob.id, &other.id).await.unwrap();

        db.books().delete(&book.id).await.unwrap();

        assert!(db.favorites().list_for_book(&book.id).await.unwrap().is_empty());
        assert!(db.carts().list_for_book(&book.id).await.unwrap().is_empty());
        assert_eq!(db.carts().count_for_user(&bob.id).await.unwrap(), 1);

        let err = db.books().delete(&book.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
