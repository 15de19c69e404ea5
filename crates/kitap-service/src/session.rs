//! # Session Store
//!
//! Server-side session records keyed by an opaque token.
//!
//! ## Storage Layout (Redis)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  key:   {prefix}{token}          e.g. qazaq_kitap:7f9c...e21a          │
//! │  value: {"userId":"...","issuedAt":"...","expiresAt":"..."}            │
//! │  ttl:   SET ... EX <ttl>         Redis drops the key on expiry         │
//! │                                                                         │
//! │  issue       SET key value EX ttl                                      │
//! │  validate    GET key             (never extends the ttl)               │
//! │  invalidate  DEL key                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`MemorySessionStore`] keeps the same records in a map. It forgets
//! everything on restart and is only ever constructed explicitly.
#![allow(async_fn_in_trait)]

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

// =============================================================================
// Errors
// =============================================================================

/// Session backend failures.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The backend could not be reached or rejected the command.
    #[error("Session store unavailable: {0}")]
    Backend(String),

    /// A stored record could not be decoded.
    #[error("Corrupt session record: {0}")]
    Corrupt(String),
}

impl From<redis::RedisError> for SessionError {
    fn from(err: redis::RedisError) -> Self {
        SessionError::Backend(err.to_string())
    }
}

/// Result type for session store operations.
pub type SessionResult<T> = Result<T, SessionError>;

// =============================================================================
// Record
// =============================================================================

/// What a token resolves to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub user_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    fn new(user_id: &str, ttl: Duration) -> Self {
        let issued_at = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);

        SessionRecord {
            user_id: user_id.to_string(),
            issued_at,
            expires_at: issued_at.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// True once `now` has reached the expiry time.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

fn new_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

// =============================================================================
// Trait
// =============================================================================

/// Key-value backend for sessions.
pub trait SessionStore: Send + Sync {
    /// Stores a new session for `user_id` and returns its token.
    async fn issue(&self, user_id: &str, ttl: Duration) -> SessionResult<String>;

    /// Resolves a token to its user, `None` if unknown or expired.
    async fn validate(&self, token: &str) -> SessionResult<Option<String>>;

    /// Removes a session. Unknown tokens are not an error.
    async fn invalidate(&self, token: &str) -> SessionResult<()>;
}

// =============================================================================
// Redis
// =============================================================================

/// Durable session store on Redis.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisSessionStore {
    /// Connects to Redis. Fails immediately if the server is unreachable.
    pub async fn connect(redis_url: &str, prefix: impl Into<String>) -> SessionResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        let store = RedisSessionStore {
            conn,
            prefix: prefix.into(),
        };
        store.ping().await?;

        info!(prefix = %store.prefix, "Connected to session store");
        Ok(store)
    }

    /// Round-trips a PING.
    pub async fn ping(&self) -> SessionResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn key(&self, token: &str) -> String {
        format!("{}{}", self.prefix, token)
    }
}

impl SessionStore for RedisSessionStore {
    async fn issue(&self, user_id: &str, ttl: Duration) -> SessionResult<String> {
        let token = new_token();
        let record = SessionRecord::new(user_id, ttl);
        let value =
            serde_json::to_string(&record).map_err(|e| SessionError::Corrupt(e.to_string()))?;

        let mut conn = self.conn.clone();
        let (): () = conn
            .set_ex(self.key(&token), value, ttl.as_secs().max(1))
            .await?;

        debug!(user_id = %user_id, ttl_secs = ttl.as_secs(), "Session issued");
        Ok(token)
    }

    async fn validate(&self, token: &str) -> SessionResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(self.key(token)).await?;

        let Some(value) = value else {
            return Ok(None);
        };

        let record: SessionRecord =
            serde_json::from_str(&value).map_err(|e| SessionError::Corrupt(e.to_string()))?;

        if record.is_expired_at(Utc::now()) {
            return Ok(None);
        }

        Ok(Some(record.user_id))
    }

    async fn invalidate(&self, token: &str) -> SessionResult<()> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(self.key(token)).await?;

        debug!(removed, "Session invalidated");
        Ok(())
    }
}

// =============================================================================
// In-process
// =============================================================================

/// Non-durable session store backed by a map.
///
/// Sessions are lost when the process exits. Use it in tests; production
/// wiring always goes through [`RedisSessionStore`].
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) sessions.
    pub async fn len(&self) -> usize {
        let now = Utc::now();
        self.sessions
            .lock()
            .await
            .values()
            .filter(|record| !record.is_expired_at(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl SessionStore for MemorySessionStore {
    async fn issue(&self, user_id: &str, ttl: Duration) -> SessionResult<String> {
        let token = new_token();
        let mut sessions = self.sessions.lock().await;

        // Expired records are dropped lazily, on the next write
        let now = Utc::now();
        sessions.retain(|_, record| !record.is_expired_at(now));

        sessions.insert(token.clone(), SessionRecord::new(user_id, ttl));
        Ok(token)
    }

    async fn validate(&self, token: &str) -> SessionResult<Option<String>> {
        let sessions = self.sessions.lock().await;

        Ok(sessions
            .get(token)
            .filter(|record| !record.is_expired_at(Utc::now()))
            .map(|record| record.user_id.clone()))
    }

    async fn invalidate(&self, token: &str) -> SessionResult<()> {
        self.sessions.lock().await.remove(token);
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
