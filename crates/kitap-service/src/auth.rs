//! # Authentication
//!
//! Login, logout and the auth guard.
//!
//! ## Session State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │                 login(id, pw) ✓                                         │
//! │   ┌───────────┐ ──────────────────────► ┌──────────────────────────┐   │
//! │   │ Anonymous │                         │ Authenticated { user_id } │   │
//! │   └───────────┘ ◄────────────────────── └──────────────────────────┘   │
//! │        ▲          logout(token)                      │                  │
//! │        │          or ttl elapsed                     │                  │
//! │        │                                             │                  │
//! │   login ✗ (MissingFields, UserNotFound, BadPassword): no session        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Operations that need an identity call [`SessionManager::require_auth`]
//! first and use the user id it returns.

use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};
use ts_rs::TS;

use kitap_core::credential::verify_password;
use kitap_core::validation::validate_login;
use kitap_core::{UserSummary, SESSION_TTL_SECS};
use kitap_db::Database;

use crate::error::{ServiceError, ServiceResult};
use crate::session::SessionStore;

/// The state a token resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Anonymous,
    Authenticated { user_id: String },
}

impl Session {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Session::Anonymous => None,
            Session::Authenticated { user_id } => Some(user_id),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated { .. })
    }
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    /// Opaque session token to present on later calls
    pub token: String,
    pub user: UserSummary,
}

/// Runs CPU-heavy credential work (Argon2) on the blocking pool.
pub(crate) async fn blocking<T, F>(work: F) -> ServiceResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ServiceError::Credential(e.to_string()))
}

/// Issues, resolves and revokes sessions.
pub struct SessionManager<S> {
    db: Database,
    store: S,
    ttl: Duration,
}

impl<S: SessionStore> SessionManager<S> {
    /// Creates a manager issuing sessions that last one day.
    pub fn new(db: Database, store: S) -> Self {
        SessionManager {
            db,
            store,
            ttl: Duration::from_secs(SESSION_TTL_SECS),
        }
    }

    /// Overrides the session lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// The underlying session store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Authenticates by email or username and opens a session.
    ///
    /// ## Errors
    /// * `Validation` (missing field) - blank login id or password
    /// * `UserNotFound` - no account has this email or username
    /// * `BadPassword` - the password does not verify
    ///
    /// No session exists after any error.
    pub async fn login(&self, login_id: &str, password: &str) -> ServiceResult<LoginOutcome> {
        let login_id = validate_login(login_id, password)?;

        let Some(user) = self.db.users().find_by_login(&login_id).await? else {
            warn!(login_id = %login_id, "Login rejected: unknown account");
            return Err(ServiceError::UserNotFound);
        };

        let password = password.to_string();
        let hash = user.password_hash.clone();
        if !blocking(move || verify_password(&password, &hash)).await? {
            warn!(user_id = %user.id, "Login rejected: bad password");
            return Err(ServiceError::BadPassword);
        }

        let token = self.store.issue(&user.id, self.ttl).await?;

        info!(user_id = %user.id, "User logged in");
        Ok(LoginOutcome {
            token,
            user: user.into(),
        })
    }

    /// Revokes a session. The token stops authenticating immediately.
    pub async fn logout(&self, token: &str) -> ServiceResult<()> {
        if token.is_empty() {
            return Ok(());
        }

        self.store.invalidate(token).await?;
        info!("User logged out");
        Ok(())
    }

    /// Resolves a token to a user id without extending the session.
    pub async fn current_identity(&self, token: &str) -> ServiceResult<Option<String>> {
        if token.is_empty() {
            return Ok(None);
        }

        Ok(self.store.validate(token).await?)
    }

    /// Resolves an optional token to a [`Session`].
    pub async fn session(&self, token: Option<&str>) -> ServiceResult<Session> {
        let user_id = match token {
            Some(token) => self.current_identity(token).await?,
            None => None,
        };

        Ok(match user_id {
            Some(user_id) => Session::Authenticated { user_id },
            None => Session::Anonymous,
        })
    }

    /// Returns the caller's user id, or `Unauthenticated`.
    pub async fn require_auth(&self, token: Option<&str>) -> ServiceResult<String> {
        match self.session(token).await? {
            Session::Authenticated { user_id } => Ok(user_id),
            Session::Anonymous => Err(ServiceError::Unauthenticated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use kitap_core::credential::hash_password;
    use kitap_core::NewUser;
    use kitap_db::DbConfig;

    async fn manager_with_alice() -> SessionManager<MemorySessionStore> {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.users()
            .create(&NewUser {
                email: "a@x.com".to_string(),
                username: "alice".to_string(),
                password_hash: hash_password("password1").unwrap(),
            })
            .await
            .unwrap();

        SessionManager::new(db, MemorySessionStore::new())
    }

    #[tokio::test]
    async fn test_login_by_username_or_email() {
        let manager = manager_with_alice().await;

        let by_name = manager.login("alice", "password1").await.unwrap();
        let by_email = manager.login("  a@x.com ", "password1").await.unwrap();

        assert_eq!(by_name.user.id, by_email.user.id);
        assert_ne!(by_name.token, by_email.token);
        assert_eq!(manager.store().len().await, 2);
    }

    #[tokio::test]
    async fn test_failed_logins_create_no_session() {
        let manager = manager_with_alice().await;

        let err = manager.login("alice", "wrong-password").await.unwrap_err();
        assert!(matches!(err, ServiceError::BadPassword));

        let err = manager.login("bob", "password1").await.unwrap_err();
        assert!(matches!(err, ServiceError::UserNotFound));

        let err = manager.login("", "password1").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e.is_missing()));

        assert!(manager.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_guard_and_logout() {
        let manager = manager_with_alice().await;
        let outcome = manager.login("alice", "password1").await.unwrap();
        let token = outcome.token.as_str();

        assert_eq!(manager.require_auth(Some(token)).await.unwrap(), outcome.user.id);
        assert!(manager.session(Some(token)).await.unwrap().is_authenticated());

        manager.logout(token).await.unwrap();

        assert!(matches!(
            manager.require_auth(Some(token)).await,
            Err(ServiceError::Unauthenticated)
        ));
        assert_eq!(manager.session(Some(token)).await.unwrap(), Session::Anonymous);
        assert!(matches!(
            manager.require_auth(None).await,
            Err(ServiceError::Unauthenticated)
        ));
        assert!(manager.current_identity("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_credential_work_runs_on_blocking_pool() {
        assert_eq!(blocking(|| 2 + 2).await.unwrap(), 4);

        let err = blocking(|| -> bool { panic!("hasher crashed") })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Credential(_)));
    }

    #[tokio::test]
    async fn test_expired_session_is_anonymous() {
        let manager = manager_with_alice().await.with_ttl(Duration::ZERO);
        let outcome = manager.login("alice", "password1").await.unwrap();

        let session = manager.session(Some(&outcome.token)).await.unwrap();
        assert_eq!(session.user_id(), None);
    }
}
