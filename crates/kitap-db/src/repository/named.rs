//! # Named Catalog Repository
//!
//! Authors and genres share one table shape (`id, name, created_at,
//! updated_at`) and the same rules, so one generic repository serves both.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create(name)         names are trimmed, required, NOT unique          │
//! │  get_or_create(name)  INSERT ... WHERE NOT EXISTS (same name)          │
//! │                       then read back the oldest row with that name    │
//! │  delete(id)           DELETE ... WHERE NOT EXISTS (book uses it)       │
//! │                         0 rows + row exists ──► ReferenceInUse         │
//! │                         0 rows + no row     ──► NotFound               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::marker::PhantomData;

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use kitap_core::validation::validate_name;
use kitap_core::{new_id, Author, Genre};

/// A catalog record identified by a display name.
pub trait NamedEntity: for<'r> FromRow<'r, SqliteRow> + Send + Unpin {
    /// Table holding the rows.
    const TABLE: &'static str;

    /// Name used in errors (`"Author"`).
    const ENTITY: &'static str;

    /// Column of `books` pointing at this table.
    const BOOK_COLUMN: &'static str;

    /// Field name reported when the name fails validation.
    const FIELD: &'static str;
}

impl NamedEntity for Author {
    const TABLE: &'static str = "authors";
    const ENTITY: &'static str = "Author";
    const BOOK_COLUMN: &'static str = "author_id";
    const FIELD: &'static str = "author";
}

impl NamedEntity for Genre {
    const TABLE: &'static str = "genres";
    const ENTITY: &'static str = "Genre";
    const BOOK_COLUMN: &'static str = "genre_id";
    const FIELD: &'static str = "genre";
}

/// Repository for authors.
pub type AuthorRepository = NamedRepository<Author>;

/// Repository for genres.
pub type GenreRepository = NamedRepository<Genre>;

const COLUMNS: &str = "id, name, created_at, updated_at";

/// Repository for one named catalog table.
#[derive(Debug, Clone)]
pub struct NamedRepository<T> {
    pool: SqlitePool,
    entity: PhantomData<fn() -> T>,
}

impl<T: NamedEntity> NamedRepository<T> {
    pub fn new(pool: SqlitePool) -> Self {
        NamedRepository {
            pool,
            entity: PhantomData,
        }
    }

    fn in_use(id: &str) -> DbError {
        DbError::ReferenceInUse {
            entity: T::ENTITY.to_string(),
            id: id.to_string(),
        }
    }

    /// Inserts a row. Names are not unique.
    pub async fn create(&self, name: &str) -> DbResult<T> {
        validate_name(T::FIELD, name)?;
        let name = name.trim();
        debug!(table = T::TABLE, name = %name, "Inserting");

        let row = sqlx::query_as::<_, T>(&format!(
            r#"
            INSERT INTO {table} (id, name, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            RETURNING {COLUMNS}
            "#,
            table = T::TABLE
        ))
        .bind(new_id())
        .bind(name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Gets a row by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<T>> {
        let row = sqlx::query_as::<_, T>(&format!(
            "SELECT {COLUMNS} FROM {table} WHERE id = ?1",
            table = T::TABLE
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Finds the oldest row with exactly this name.
    pub async fn find_by_name(&self, name: &str) -> DbResult<Option<T>> {
        let row = sqlx::query_as::<_, T>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM {table}
            WHERE name = ?1
            ORDER BY created_at, rowid
            LIMIT 1
            "#,
            table = T::TABLE
        ))
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Returns the row with this name, inserting it first if absent.
    pub async fn get_or_create(&self, name: &str) -> DbResult<T> {
        validate_name(T::FIELD, name)?;
        let name = name.trim();

        let inserted = sqlx::query(&format!(
            r#"
            INSERT INTO {table} (id, name, created_at, updated_at)
            SELECT ?1, ?2, ?3, ?3
            WHERE NOT EXISTS (SELECT 1 FROM {table} WHERE name = ?2)
            "#,
            table = T::TABLE
        ))
        .bind(new_id())
        .bind(name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected();

        debug!(table = T::TABLE, name = %name, created = inserted > 0, "Get-or-create");

        self.find_by_name(name)
            .await?
            .ok_or_else(|| DbError::not_found(T::ENTITY, name))
    }

    /// Lists all rows, oldest first.
    pub async fn list(&self) -> DbResult<Vec<T>> {
        let rows = sqlx::query_as::<_, T>(&format!(
            "SELECT {COLUMNS} FROM {table} ORDER BY created_at, rowid",
            table = T::TABLE
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Renames a row.
    pub async fn rename(&self, id: &str, name: &str) -> DbResult<T> {
        validate_name(T::FIELD, name)?;

        let row = sqlx::query_as::<_, T>(&format!(
            r#"
            UPDATE {table} SET name = ?2, updated_at = ?3
            WHERE id = ?1
            RETURNING {COLUMNS}
            "#,
            table = T::TABLE
        ))
        .bind(id)
        .bind(name.trim())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| DbError::not_found(T::ENTITY, id))
    }

    /// Deletes a row that no book references.
    ///
    /// ## Errors
    /// * `DbError::ReferenceInUse` - at least one book points at it
    /// * `DbError::NotFound` - no such row
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(table = T::TABLE, id = %id, "Deleting");

        let result = sqlx::query(&format!(
            r#"
            DELETE FROM {table}
            WHERE id = ?1
            AND NOT EXISTS (SELECT 1 FROM books WHERE {column} = ?1)
            "#,
            table = T::TABLE,
            column = T::BOOK_COLUMN
        ))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::ForeignKeyViolation { .. } => Self::in_use(id),
            other => other,
        })?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        match self.get_by_id(id).await? {
            Some(_) => Err(Self::in_use(id)),
            None => Err(DbError::not_found(T::ENTITY, id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::DbError;
    use crate::repository::test_support::{create_book, test_db};

    #[tokio::test]
    async fn test_get_or_create_reuses_existing() {
        let db = test_db().await;
        let authors = db.authors();

        let first = authors.get_or_create("Мұхтар Әуезов").await.unwrap();
        let again = authors.get_or_create("  Мұхтар Әуезов ").await.unwrap();

        assert_eq!(first.id, again.id);
        assert_eq!(first.name, "Мұхтар Әуезов");
        assert_eq!(authors.list().await.unwrap().len(), 1);

        // Same name in the other table is a separate row
        db.genres().get_or_create("Мұхтар Әуезов").await.unwrap();
        assert_eq!(authors.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_find_by_name_and_list() {
        let db = test_db().await;
        db.genres().create("Роман").await.unwrap();
        db.genres().create("Поэзия").await.unwrap();

        let names: Vec<_> = db
            .genres()
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(names, ["Роман", "Поэзия"]);

        assert!(db.genres().find_by_name("Поэзия").await.unwrap().is_some());
        assert!(db.genres().find_by_name("Драма").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blank_names_are_rejected() {
        let db = test_db().await;

        let err = db.authors().create("   ").await.unwrap_err();
        assert!(matches!(err, DbError::Validation(ref e) if e.field() == "author"));

        let err = db.genres().get_or_create("").await.unwrap_err();
        assert!(matches!(err, DbError::Validation(ref e) if e.field() == "genre"));

        let genre = db.genres().create("Роман").await.unwrap();
        assert!(db.genres().rename(&genre.id, " ").await.is_err());

        assert!(db.authors().list().await.unwrap().is_empty());
        assert_eq!(db.genres().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rename() {
        let db = test_db().await;
        let author = db.authors().create("Абай").await.unwrap();

        let renamed = db.authors().rename(&author.id, "Абай Құнанбайұлы").await.unwrap();
        assert_eq!(renamed.id, author.id);
        assert_eq!(renamed.name, "Абай Құнанбайұлы");
        assert!(renamed.updated_at >= author.updated_at);

        let err = db.authors().rename("missing", "x").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_referenced_rows_is_refused() {
        let db = test_db().await;
        let book = create_book(&db, "Қара сөздер").await;

        let err = db.authors().delete(&book.author_id).await.unwrap_err();
        assert!(matches!(err, DbError::ReferenceInUse { ref entity, .. } if entity == "Author"));

        let err = db.genres().delete(&book.genre_id).await.unwrap_err();
        assert!(matches!(err, DbError::ReferenceInUse { ref entity, .. } if entity == "Genre"));

        db.books().delete(&book.id).await.unwrap();
        db.authors().delete(&book.author_id).await.unwrap();
        db.genres().delete(&book.genre_id).await.unwrap();
        assert!(db.authors().get_by_id(&book.author_id).await.unwrap().is_none());

        let err = db.authors().delete(&book.author_id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
