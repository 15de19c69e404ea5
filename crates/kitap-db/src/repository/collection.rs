//! # Collection Repository
//!
//! Favorites and cart rows. Both tables have the same shape, so one
//! repository type serves both, selected by [`CollectionKind`].
//!
//! ## Add Is One Statement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  INSERT INTO {favorites|cart_items} (...)                              │
//! │  SELECT ... WHERE EXISTS (SELECT 1 FROM books WHERE id = ?book)        │
//! │       │                                                                 │
//! │       ├── 1 row                     ──► CollectionEntry                │
//! │       ├── 0 rows                    ──► ReferenceNotFound(Book)        │
//! │       ├── UNIQUE(user_id, book_id)  ──► UniqueViolation                │
//! │       └── FOREIGN KEY (user_id)     ──► ReferenceNotFound(User)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Two concurrent adds of the same pair: the UNIQUE index lets exactly one
//! through, the other sees `UniqueViolation`.
//!
//! ## Ownership
//! `find_owned` / `remove_owned` match on entry id AND user id. Another
//! user's entry looks exactly like a missing one.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use super::{BOOK_VIEW_COLUMNS, BOOK_VIEW_JOIN};
use crate::error::{DbError, DbResult};
use kitap_core::{new_id, BookView, CollectionEntry, CollectionItem, CollectionKind};

/// An entry joined with its book, as read from the database.
#[derive(sqlx::FromRow)]
struct ItemRow {
    entry_id: String,
    entry_user_id: String,
    entry_book_id: String,
    entry_created_at: chrono::DateTime<Utc>,
    entry_updated_at: chrono::DateTime<Utc>,
    #[sqlx(flatten)]
    book: BookView,
}

impl From<ItemRow> for CollectionItem {
    fn from(row: ItemRow) -> Self {
        CollectionItem::new(
            CollectionEntry {
                id: row.entry_id,
                user_id: row.entry_user_id,
                book_id: row.entry_book_id,
                created_at: row.entry_created_at,
                updated_at: row.entry_updated_at,
            },
            Some(row.book),
        )
    }
}

/// Repository for one per-user collection.
#[derive(Debug, Clone)]
pub struct CollectionRepository {
    pool: SqlitePool,
    kind: CollectionKind,
}

impl CollectionRepository {
    /// Creates a repository for `kind`.
    pub fn new(pool: SqlitePool, kind: CollectionKind) -> Self {
        CollectionRepository { pool, kind }
    }

    /// Which collection this repository reads and writes.
    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    fn table(&self) -> &'static str {
        self.kind.table()
    }

    /// Adds `book_id` to the user's collection.
    ///
    /// ## Errors
    /// * `DbError::ReferenceNotFound { entity: "Book" }` - unknown book
    /// * `DbError::ReferenceNotFound { entity: "User" }` - unknown user
    /// * `DbError::UniqueViolation` - the pair is already present
    pub async fn add(&self, user_id: &str, book_id: &str) -> DbResult<CollectionEntry> {
        debug!(kind = %self.kind, user_id = %user_id, book_id = %book_id, "Adding entry");

        let now = Utc::now();
        let entry = CollectionEntry {
            id: new_id(),
            user_id: user_id.to_string(),
            book_id: book_id.to_string(),
            created_at: now,
            updated_at: now,
        };

        let result = sqlx::query(&format!(
            r#"
            INSERT INTO {} (id, user_id, book_id, created_at, updated_at)
            SELECT ?1, ?2, ?3, ?4, ?4
            WHERE EXISTS (SELECT 1 FROM books WHERE id = ?3)
            "#,
            self.table()
        ))
        .bind(&entry.id)
        .bind(user_id)
        .bind(book_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => {
                DbError::duplicate(field, format!("{user_id}, {book_id}"))
            }
            DbError::ForeignKeyViolation { .. } => DbError::missing_reference("User", user_id),
            other => other,
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::missing_reference("Book", book_id));
        }

        Ok(entry)
    }

    /// Finds the entry for a (user, book) pair.
    pub async fn find(&self, user_id: &str, book_id: &str) -> DbResult<Option<CollectionEntry>> {
        let entry = sqlx::query_as::<_, CollectionEntry>(&format!(
            r#"
            SELECT id, user_id, book_id, created_at, updated_at
            FROM {}
            WHERE user_id = ?1 AND book_id = ?2
            "#,
            self.table()
        ))
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Finds an entry by id, only if `user_id` owns it.
    pub async fn find_owned(
        &self,
        entry_id: &str,
        user_id: &str,
    ) -> DbResult<Option<CollectionEntry>> {
        let entry = sqlx::query_as::<_, CollectionEntry>(&format!(
            r#"
            SELECT id, user_id, book_id, created_at, updated_at
            FROM {}
            WHERE id = ?1 AND user_id = ?2
            "#,
            self.table()
        ))
        .bind(entry_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Deletes an entry owned by `user_id`.
    ///
    /// `DbError::NotFound` when the entry doesn't exist or belongs to
    /// someone else; the two cases are not distinguished.
    pub async fn remove_owned(&self, entry_id: &str, user_id: &str) -> DbResult<()> {
        debug!(kind = %self.kind, entry_id = %entry_id, user_id = %user_id, "Removing entry");

        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE id = ?1 AND user_id = ?2",
            self.table()
        ))
        .bind(entry_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(self.kind.entity(), entry_id));
        }

        Ok(())
    }

    /// Lists a user's entries, oldest first.
    pub async fn list_for_user(&self, user_id: &str) -> DbResult<Vec<CollectionEntry>> {
        let entries = sqlx::query_as::<_, CollectionEntry>(&format!(
            r#"
            SELECT id, user_id, book_id, created_at, updated_at
            FROM {}
            WHERE user_id = ?1
            ORDER BY created_at, rowid
            "#,
            self.table()
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Lists a user's entries with each book's projection, oldest first.
    pub async fn list_items_for_user(&self, user_id: &str) -> DbResult<Vec<CollectionItem>> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            SELECT
                e.id AS entry_id,
                e.user_id AS entry_user_id,
                e.book_id AS entry_book_id,
                e.created_at AS entry_created_at,
                e.updated_at AS entry_updated_at,
                {BOOK_VIEW_COLUMNS}
            FROM {table} e
            INNER JOIN {BOOK_VIEW_JOIN} ON b.id = e.book_id
            WHERE e.user_id = ?1
            ORDER BY e.created_at, e.rowid
            "#,
            table = self.table()
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CollectionItem::from).collect())
    }

    /// Lists every entry pointing at `book_id`, oldest first.
    pub async fn list_for_book(&self, book_id: &str) -> DbResult<Vec<CollectionEntry>> {
        let entries = sqlx::query_as::<_, CollectionEntry>(&format!(
            r#"
            SELECT id, user_id, book_id, created_at, updated_at
            FROM {}
            WHERE book_id = ?1
            ORDER BY created_at, rowid
            "#,
            self.table()
        ))
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Counts a user's entries.
    pub async fn count_for_user(&self, user_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE user_id = ?1",
            self.table()
        ))
        .bind(user_id)
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
    async fn test_add_twice_is_a_duplicate() {
        let db = test_db().await;
        let alice = create_user(&db, "alice").await;
        let book = create_book(&db, "Абай жолы").await;

        db.favorites().add(&alice.id, &book.id).await.unwrap();
        let err = db.favorites().add(&alice.id, &book.id).await.unwrap_err();

        assert!(err.is_unique_violation());
        assert_eq!(db.favorites().count_for_user(&alice.id).await.unwrap(), 1);

        // Same pair in the other collection is independent
        db.carts().add(&alice.id, &book.id).await.unwrap();
        assert!(db.carts().find(&alice.id, &book.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_add_unknown_book_or_user() {
        let db = test_db().await;
        let alice = create_user(&db, "alice").await;
        let book = create_book(&db, "Абай жолы").await;

        let err = db.carts().add(&alice.id, &new_id()).await.unwrap_err();
        assert!(matches!(err, DbError::ReferenceNotFound { ref entity, .. } if entity == "Book"));

        let err = db.carts().add(&new_id(), &book.id).await.unwrap_err();
        assert!(matches!(err, DbError::ReferenceNotFound { ref entity, .. } if entity == "User"));

        assert!(db.carts().list_for_book(&book.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_requires_ownership() {
        let db = test_db().await;
        let alice = create_user(&db, "alice").await;
        let carol = create_user(&db, "carol").await;
        let book = create_book(&db, "Абай жолы").await;

        let entry = db.carts().add(&carol.id, &book.id).await.unwrap();

        assert!(db.carts().find_owned(&entry.id, &alice.id).await.unwrap().is_none());
        let err = db.carts().remove_owned(&entry.id, &alice.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert!(db.carts().find_owned(&entry.id, &carol.id).await.unwrap().is_some());

        db.carts().remove_owned(&entry.id, &carol.id).await.unwrap();
        assert_eq!(db.carts().count_for_user(&carol.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_items_embed_books_in_order() {
        let db = test_db().await;
        let alice = create_user(&db, "alice").await;
        let first = create_book(&db, "Қара сөздер").await;
        let second = create_book(&db, "Абай жолы").await;

        db.favorites().add(&alice.id, &second.id).await.unwrap();
        db.favorites().add(&alice.id, &first.id).await.unwrap();

        let items = db.favorites().list_items_for_user(&alice.id).await.unwrap();
        let titles: Vec<_> = items
            .iter()
            .map(|item| item.book.as_ref().unwrap().title.as_str())
            .collect();
        assert_eq!(titles, ["Абай жолы", "Қара сөздер"]);
        assert_eq!(items[0].book_id, second.id);
        assert_eq!(items[0].book.as_ref().unwrap().author_name, "Абай Құнанбайұлы");

        let entries = db.favorites().list_for_user(&alice.id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, items[0].id);
    }
}
