//! # kitap-service: Bookstore Services
//!
//! What an HTTP layer calls: registration, login, the auth guard,
//! favorites, cart and catalog reads.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Caller (HTTP handlers, CLI, tests)                                    │
//! │       │   token: Option<&str>                                          │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 kitap-service (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │  AccountService ──┐                                             │   │
//! │  │  CollectionService┼──► SessionManager ──► SessionStore          │   │
//! │  │  CatalogService   │      (require_auth)     Redis / Memory      │   │
//! │  │        │          │                                             │   │
//! │  └────────┼──────────┼─────────────────────────────────────────────┘   │
//! │           ▼          ▼                                                  │
//! │       kitap-db (Database, repositories)                                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kitap_service::{Services, StoreConfig};
//!
//! let services = Services::connect(&StoreConfig::load()?).await?;
//!
//! let outcome = services.sessions.login("alice", "password1").await?;
//! let profile = services.accounts.profile(Some(&outcome.token)).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod account;
pub mod auth;
pub mod catalog;
pub mod collection;
pub mod config;
pub mod error;
pub mod session;

// =============================================================================
// Re-exports
// =============================================================================

pub use account::AccountService;
pub use auth::{LoginOutcome, Session, SessionManager};
pub use catalog::CatalogService;
pub use collection::CollectionService;
pub use config::{ConfigError, StoreConfig};
pub use error::{ApiError, ErrorCode, ErrorKind, ServiceError, ServiceResult};
pub use session::{MemorySessionStore, RedisSessionStore, SessionError, SessionStore};

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use kitap_db::{Database, DbError};

/// Failure while wiring the services at startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] DbError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// All services over one database and one session store.
pub struct Services<S> {
    pub db: Database,
    pub sessions: Arc<SessionManager<S>>,
    pub accounts: AccountService<S>,
    pub collections: CollectionService<S>,
    pub catalog: CatalogService,
}

impl<S: SessionStore> Services<S> {
    /// Wires the services with default session lifetime and password policy.
    pub fn new(db: Database, store: S) -> Self {
        let manager = SessionManager::new(db.clone(), store);
        Self::from_manager(db, manager, None)
    }

    fn from_manager(
        db: Database,
        manager: SessionManager<S>,
        min_password_len: Option<usize>,
    ) -> Self {
        let sessions = Arc::new(manager);

        let mut accounts = AccountService::new(db.clone(), Arc::clone(&sessions));
        if let Some(min) = min_password_len {
            accounts = accounts.with_min_password_len(min);
        }

        Services {
            collections: CollectionService::new(db.clone(), Arc::clone(&sessions)),
            catalog: CatalogService::new(db.clone()),
            accounts,
            sessions,
            db,
        }
    }

    /// Wires the services using `config` for session lifetime and
    /// password policy.
    pub fn with_config(db: Database, store: S, config: &StoreConfig) -> Self {
        let manager = SessionManager::new(db.clone(), store).with_ttl(config.session_ttl());
        Self::from_manager(db, manager, Some(config.min_password_len))
    }
}

impl Services<RedisSessionStore> {
    /// Opens the database and connects to Redis.
    ///
    /// Fails if Redis is unreachable: there is no fallback to an
    /// in-process session store.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StartupError> {
        let db = Database::new(config.db_config()).await?;
        let store = RedisSessionStore::connect(&config.redis_url, &config.session_prefix).await?;

        info!(
            database = %config.database_path.display(),
            session_ttl_secs = config.session_ttl_secs,
            "Services ready"
        );

        Ok(Services::with_config(db, store, config))
    }
}
