//! # Database Error Types
//!
//! Error types for entity store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ServiceError (kitap-service) ← DuplicateEmail, AlreadyExists, ...     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError { code, message } ← What the caller serializes               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use kitap_core::ValidationError;
use thiserror::Error;

/// Entity store errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Input rejected before any statement ran.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// `field` is the logical column (`email`, `username`, `user_id, book_id`).
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A row points at a parent that does not exist.
    ///
    /// ## When This Occurs
    /// - Creating a book with an unknown author_id or genre_id
    #[error("{entity} referenced but not found: {id}")]
    ReferenceNotFound { entity: String, id: String },

    /// A parent row cannot be deleted while children reference it.
    ///
    /// ## When This Occurs
    /// - Deleting an author or genre that still has books
    #[error("{entity} {id} is still referenced")]
    ReferenceInUse { entity: String, id: String },

    /// Foreign key constraint violation reported by SQLite itself.
    ///
    /// Repositories check references up front, so seeing this means a
    /// concurrent delete won the race.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed to begin or commit. Nothing was written.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a ReferenceNotFound error.
    pub fn missing_reference(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::ReferenceNotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// True for a UNIQUE violation, whatever the column.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. })
    }

    /// True when the failure is transient and the whole operation may be
    /// retried. Nothing was written in any of these cases.
    pub fn is_retryable(&self) -> bool {
        match self {
            DbError::PoolExhausted | DbError::TransactionFailed(_) => true,
            DbError::QueryFailed(msg) => msg.contains("locked") || msg.contains("busy"),
            _ => false,
        }
    }

    /// Wraps a failed BEGIN / COMMIT.
    pub(crate) fn transaction(err: sqlx::Error) -> Self {
        DbError::TransactionFailed(err.to_string())
    }
}

/// Strips SQLite's `table.` prefixes from a constraint column list.
///
/// `"users.email"` → `"email"`,
/// `"favorites.user_id, favorites.book_id"` → `"user_id, book_id"`.
fn constraint_columns(columns: &str) -> String {
    columns
        .split(',')
        .map(|col| {
            let col = col.trim();
            col.rsplit('.').next().unwrap_or(col)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>[, ...]"
                // FK constraint: "FOREIGN KEY constraint failed"
                if let Some(columns) = msg.split("UNIQUE constraint failed: ").nth(1) {
                    DbError::UniqueViolation {
                        field: constraint_columns(columns),
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_columns() {
        assert_eq!(constraint_columns("users.email"), "email");
        assert_eq!(
            constraint_columns("favorites.user_id, favorites.book_id"),
            "user_id, book_id"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(DbError::PoolExhausted.is_retryable());
        assert!(DbError::QueryFailed("database is locked".to_string()).is_retryable());
        assert!(!DbError::duplicate("email", "a@x.com").is_retryable());
        assert!(!DbError::not_found("Book", "b-1").is_retryable());
        assert!(!DbError::from(ValidationError::required("title")).is_retryable());
    }
}
