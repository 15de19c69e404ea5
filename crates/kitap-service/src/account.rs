//! # Accounts
//!
//! Registration and the signed-in user's profile.

use std::sync::Arc;

use tracing::info;

use kitap_core::credential::hash_password;
use kitap_core::validation::{validate_email, validate_password_min, validate_username};
use kitap_core::{NewUser, Profile, UserSummary, MIN_PASSWORD_LEN};
use kitap_db::Database;

use crate::auth::{blocking, SessionManager};
use crate::error::{ServiceError, ServiceResult};
use crate::session::SessionStore;

/// Account operations.
pub struct AccountService<S> {
    db: Database,
    sessions: Arc<SessionManager<S>>,
    min_password_len: usize,
}

impl<S: SessionStore> AccountService<S> {
    pub fn new(db: Database, sessions: Arc<SessionManager<S>>) -> Self {
        AccountService {
            db,
            sessions,
            min_password_len: MIN_PASSWORD_LEN,
        }
    }

    /// Raises the minimum password length. Values below the default are
    /// ignored.
    pub fn with_min_password_len(mut self, min: usize) -> Self {
        self.min_password_len = min.max(MIN_PASSWORD_LEN);
        self
    }

    /// Registers a new account.
    ///
    /// Email and username are trimmed; the password is taken verbatim and
    /// only its Argon2id hash is stored.
    ///
    /// ## Errors
    /// * `Validation` - a field breaks its rule
    /// * `DuplicateEmail` - checked before username
    /// * `DuplicateUsername`
    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> ServiceResult<UserSummary> {
        validate_email(email)?;
        validate_username(username)?;
        validate_password_min(password, self.min_password_len)?;

        let password = password.to_string();
        let password_hash = blocking(move || hash_password(&password)).await??;

        let new_user = NewUser {
            email: email.trim().to_string(),
            username: username.trim().to_string(),
            password_hash,
        };

        let user = self.db.users().create(&new_user).await?;

        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user.into())
    }

    /// The signed-in user with favorites and cart, each entry carrying its
    /// book.
    ///
    /// A session whose user has since been deleted counts as
    /// unauthenticated.
    pub async fn profile(&self, token: Option<&str>) -> ServiceResult<Profile> {
        let user_id = self.sessions.require_auth(token).await?;

        let user = self
            .db
            .users()
            .get_by_id(&user_id)
            .await?
            .ok_or(ServiceError::Unauthenticated)?;

        Ok(Profile {
            user: user.into(),
            favorites: self.db.favorites().list_items_for_user(&user_id).await?,
            cart: self.db.carts().list_items_for_user(&user_id).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::session::MemorySessionStore;
    use kitap_db::DbConfig;

    async fn service() -> AccountService<MemorySessionStore> {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sessions = Arc::new(SessionManager::new(db.clone(), MemorySessionStore::new()));
        AccountService::new(db, sessions)
    }

    #[tokio::test]
    async fn test_register_stores_hash_only() {
        let accounts = service().await;

        let user = accounts.register(" a@x.com ", "alice", "password1").await.unwrap();
        assert_eq!(user.email, "a@x.com");

        let stored = accounts.db.users().get_by_id(&user.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "password1");
        assert!(stored.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input() {
        let accounts = service().await;

        for (email, username, password) in [
            ("", "alice", "password1"),
            ("not-an-email", "alice", "password1"),
            ("a@x.com", "a", "password1"),
            ("a@x.com", "alice", "short"),
        ] {
            let err = accounts.register(email, username, password).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{email} / {username}");
        }

        assert_eq!(accounts.db.users().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_configured_password_minimum() {
        let accounts = service().await.with_min_password_len(12);

        let err = accounts.register("a@x.com", "alice", "password1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        accounts
            .register("a@x.com", "alice", "long-password1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_profile_requires_session() {
        let accounts = service().await;

        assert!(matches!(
            accounts.profile(None).await,
            Err(ServiceError::Unauthenticated)
        ));
        assert!(matches!(
            accounts.profile(Some("forged-token")).await,
            Err(ServiceError::Unauthenticated)
        ));
    }
}
