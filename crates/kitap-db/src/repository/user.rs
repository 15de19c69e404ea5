//! # User Repository
//!
//! Accounts: registration insert, login lookup and cascading delete.
//!
//! ## Uniqueness
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create(new_user)                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT INTO users ...          (no read-then-write window)            │
//! │       │                                                                 │
//! │       ├── OK ──────────────────────────────► User                      │
//! │       │                                                                 │
//! │       └── UNIQUE constraint failed                                     │
//! │             │                                                           │
//! │             ▼                                                           │
//! │        email taken?  ── yes ──► UniqueViolation { field: "email" }     │
//! │             │                                                           │
//! │             no ───────────────► UniqueViolation { field: "username" }  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Email wins when both collide.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use kitap_core::{new_id, NewUser, User};

const USER_COLUMNS: &str = "id, email, username, password_hash, created_at, updated_at";

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Inserts a new user.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation { field: "email" }` - email already registered
    /// * `DbError::UniqueViolation { field: "username" }` - username taken
    ///
    /// Nothing is written on either error.
    pub async fn create(&self, new_user: &NewUser) -> DbResult<User> {
        debug!(username = %new_user.username, "Inserting user");

        let now = Utc::now();
        let user = User {
            id: new_id(),
            email: new_user.email.clone(),
            username: new_user.username.clone(),
            password_hash: new_user.password_hash.clone(),
            created_at: now,
            updated_at: now,
        };

        let inserted = sqlx::query(
            r#"
            INSERT INTO users (id, email, username, password_hash, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(now)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(user),
            Err(err) => match DbError::from(err) {
                DbError::UniqueViolation { .. } => Err(self.classify_duplicate(new_user).await?),
                other => Err(other),
            },
        }
    }

    /// Works out which column a failed insert collided on.
    async fn classify_duplicate(&self, new_user: &NewUser) -> DbResult<DbError> {
        if self.find_by_email(&new_user.email).await?.is_some() {
            return Ok(DbError::duplicate("email", new_user.email.as_str()));
        }

        Ok(DbError::duplicate("username", new_user.username.as_str()))
    }

    /// Gets a user by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Finds a user whose email OR username equals `login_id`.
    ///
    /// Usernames cannot contain `@`, so at most one row matches in
    /// practice; an email match is preferred regardless.
    pub async fn find_by_login(&self, login_id: &str) -> DbResult<Option<User>> {
        debug!(login_id = %login_id, "Resolving login id");

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE email = ?1 OR username = ?1
            ORDER BY CASE WHEN email = ?1 THEN 0 ELSE 1 END
            LIMIT 1
            "#
        ))
        .bind(login_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by exact email.
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by exact username.
    pub async fn find_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Deletes a user together with their favorites and cart.
    ///
    /// Books the user uploaded are kept; their `owner_user_id` still
    /// holds the deleted id.
    ///
    /// ## Transaction
    /// ```text
    /// BEGIN
    ///   DELETE FROM favorites  WHERE user_id = ?
    ///   DELETE FROM cart_items WHERE user_id = ?
    ///   DELETE FROM users      WHERE id = ?      (0 rows → NotFound, rollback)
    /// COMMIT
    /// ```
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting user");

        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        let favorites = sqlx::query("DELETE FROM favorites WHERE user_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let cart_items = sqlx::query("DELETE FROM cart_items WHERE user_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            // tx dropped here: rolled back
            return Err(DbError::not_found("User", id));
        }

        tx.commit().await.map_err(DbError::transaction)?;

        debug!(id = %id, favorites, cart_items, "User deleted");
        Ok(())
    }

    /// Counts registered users.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
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

    fn new_user(email: &str, username: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            username: username.to_string(),
            password_hash: "$argon2id$v=19$test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let db = test_db().await;
        let users = db.users();

        let user = users.create(&new_user("a@x.com", "alice")).await.unwrap();

        assert_eq!(users.count().await.unwrap(), 1);
        assert_eq!(users.get_by_id(&user.id).await.unwrap().unwrap().email, "a@x.com");
        assert_eq!(users.find_by_login("alice").await.unwrap().unwrap().id, user.id);
        assert_eq!(users.find_by_login("a@x.com").await.unwrap().unwrap().id, user.id);
        assert!(users.find_by_login("bob").await.unwrap().is_none());
        assert!(users.find_by_username("alice").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_email_wins_over_username() {
        let db = test_db().await;
        let users = db.users();
        users.create(&new_user("a@x.com", "alice")).await.unwrap();

        let err = users.create(&new_user("a@x.com", "alice")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "email"));

        let err = users.create(&new_user("other@x.com", "alice")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "username"));

        assert_eq!(users.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_cascades_collections_but_keeps_owned_books() {
        let db = test_db().await;
        let user = create_user(&db, "alice").await;
        let book = create_book(&db, "Қара сөздер").await;

        sqlx::query("UPDATE books SET owner_user_id = ?1 WHERE id = ?2")
            .bind(&user.id)
            .bind(&book.id)
            .execute(db.pool())
            .await
            .unwrap();

        db.favorites().add(&user.id, &book.id).await.unwrap();
        db.carts().add(&user.id, &book.id).await.unwrap();

        db.users().delete(&user.id).await.unwrap();

        assert!(db.users().get_by_id(&user.id).await.unwrap().is_none());
        assert_eq!(db.favorites().count_for_user(&user.id).await.unwrap(), 0);
        assert_eq!(db.carts().count_for_user(&user.id).await.unwrap(), 0);

        let kept = db.books().get_by_id(&book.id).await.unwrap().unwrap();
        assert_eq!(kept.owner_user_id.as_deref(), Some(user.id.as_str()));
    }

    #[tokio::test]
    async fn test_delete_unknown_user() {
        let db = test_db().await;
        let err = db.users().delete("missing").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
