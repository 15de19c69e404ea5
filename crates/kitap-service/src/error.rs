//! # Service Errors
//!
//! The caller-facing error taxonomy and its serialized form.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ValidationError ─┐                                                     │
//! │  DbError ─────────┼──► ServiceError ──► kind()  (Validation, Conflict,  │
//! │  SessionError ────┘         │                    NotFound, Auth, Store) │
//! │                             │                                           │
//! │                             ▼                                           │
//! │                      ApiError { code, message }                         │
//! │                                                                         │
//! │  {                                                                      │
//! │    "code": "DUPLICATE_EMAIL",                                           │
//! │    "message": "Email is already registered"                             │
//! │  }                                                                      │
//! │                                                                         │
//! │  Store and session backend failures are logged in full and reach the   │
//! │  caller only as a generic message.                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

use kitap_core::{CoreError, ValidationError};
use kitap_db::DbError;

use crate::session::SessionError;

/// Errors returned by the services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input failed a field rule.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Email is already registered")]
    DuplicateEmail,

    #[error("Username is already taken")]
    DuplicateUsername,

    /// The (user, book) pair is already in this collection.
    #[error("{what} already exists")]
    AlreadyExists { what: String },

    /// A catalog row cannot be removed while books reference it.
    #[error("{entity} {id} is still in use")]
    ReferenceInUse { entity: String, id: String },

    #[error("Book not found: {0}")]
    BookNotFound(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A write referenced a row that does not exist.
    #[error("{entity} referenced but not found: {id}")]
    ReferenceNotFound { entity: String, id: String },

    /// No account matches the login id.
    #[error("User not found")]
    UserNotFound,

    #[error("Incorrect password")]
    BadPassword,

    /// No valid session for an operation that needs one.
    #[error("Authentication required")]
    Unauthenticated,

    /// Entity store failure. Nothing was written.
    #[error("Store error: {0}")]
    Store(DbError),

    /// Session backend failure.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Password hashing failed.
    #[error("Credential error: {0}")]
    Credential(String),
}

/// Broad class of a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Auth,
    Store,
}

impl ServiceError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Validation(_) => ErrorKind::Validation,
            ServiceError::DuplicateEmail
            | ServiceError::DuplicateUsername
            | ServiceError::AlreadyExists { .. }
            | ServiceError::ReferenceInUse { .. } => ErrorKind::Conflict,
            ServiceError::BookNotFound(_)
            | ServiceError::NotFound { .. }
            | ServiceError::ReferenceNotFound { .. } => ErrorKind::NotFound,
            ServiceError::UserNotFound | ServiceError::BadPassword | ServiceError::Unauthenticated => {
                ErrorKind::Auth
            }
            ServiceError::Store(_) | ServiceError::Session(_) | ServiceError::Credential(_) => {
                ErrorKind::Store
            }
        }
    }

    /// True when the whole operation may be retried unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Store(err) => err.is_retryable(),
            ServiceError::Session(SessionError::Backend(_)) => true,
            _ => false,
        }
    }
}

/// Maps store errors onto the caller taxonomy.
///
/// Call sites that know more (which collection, which lookup) map the
/// `DbError` themselves before falling back to this.
impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Validation(e) => ServiceError::Validation(e),
            DbError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            DbError::UniqueViolation { field, .. } if field == "email" => {
                ServiceError::DuplicateEmail
            }
            DbError::UniqueViolation { field, .. } if field == "username" => {
                ServiceError::DuplicateUsername
            }
            DbError::UniqueViolation { field, .. } => ServiceError::AlreadyExists { what: field },
            DbError::ReferenceNotFound { entity, id } if entity == "Book" => {
                ServiceError::BookNotFound(id)
            }
            DbError::ReferenceNotFound { entity, id } => {
                ServiceError::ReferenceNotFound { entity, id }
            }
            DbError::ReferenceInUse { entity, id } => ServiceError::ReferenceInUse { entity, id },
            other => ServiceError::Store(other),
        }
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => ServiceError::Validation(e),
            CoreError::PasswordHash { reason } => ServiceError::Credential(reason),
        }
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// Serialized Form
// =============================================================================

/// Error payload handed to the caller.
///
/// ```json
/// {
///   "code": "ALREADY_EXISTS",
///   "message": "Favorite already exists"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable reason code
    pub code: ErrorCode,

    /// Human-readable message
    pub message: String,
}

/// Reason codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A required field was blank
    MissingFields,
    /// A field was present but malformed
    InvalidInput,
    DuplicateEmail,
    DuplicateUsername,
    AlreadyExists,
    ReferenceInUse,
    BookNotFound,
    NotFound,
    ReferenceNotFound,
    UserNotFound,
    BadPassword,
    Unauthenticated,
    /// Store or session backend failure (retryable)
    StoreError,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();

        match err {
            ServiceError::Validation(e) if e.is_missing() => {
                ApiError::new(ErrorCode::MissingFields, e.to_string())
            }
            ServiceError::Validation(e) => ApiError::new(ErrorCode::InvalidInput, e.to_string()),
            ServiceError::DuplicateEmail => ApiError::new(ErrorCode::DuplicateEmail, message),
            ServiceError::DuplicateUsername => ApiError::new(ErrorCode::DuplicateUsername, message),
            ServiceError::AlreadyExists { .. } => ApiError::new(ErrorCode::AlreadyExists, message),
            ServiceError::ReferenceInUse { .. } => {
                ApiError::new(ErrorCode::ReferenceInUse, message)
            }
            ServiceError::BookNotFound(_) => ApiError::new(ErrorCode::BookNotFound, message),
            ServiceError::NotFound { .. } => ApiError::new(ErrorCode::NotFound, message),
            ServiceError::ReferenceNotFound { .. } => {
                ApiError::new(ErrorCode::ReferenceNotFound, message)
            }
            ServiceError::UserNotFound => ApiError::new(ErrorCode::UserNotFound, message),
            ServiceError::BadPassword => ApiError::new(ErrorCode::BadPassword, message),
            ServiceError::Unauthenticated => ApiError::new(ErrorCode::Unauthenticated, message),
            ServiceError::Store(e) => {
                // Log the actual error but return a generic message
                tracing::error!(error = %e, retryable = e.is_retryable(), "Store operation failed");
                ApiError::new(ErrorCode::StoreError, "Storage is temporarily unavailable")
            }
            ServiceError::Session(e) => {
                tracing::error!(error = %e, "Session store failed");
                ApiError::new(ErrorCode::StoreError, "Storage is temporarily unavailable")
            }
            ServiceError::Credential(reason) => {
                tracing::error!(%reason, "Password hashing failed");
                ApiError::new(ErrorCode::StoreError, "Could not process credentials")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
