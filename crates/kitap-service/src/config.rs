//! Service configuration.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults. `REDIS_URL` has no default: sessions must be durable, so a
//! missing session store is a startup error.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use kitap_core::{MIN_PASSWORD_LEN, SESSION_TTL_SECS};
use kitap_db::DbConfig;

/// Store and session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub db_max_connections: u32,

    /// Redis connection string for the session store
    pub redis_url: String,

    /// Namespace prepended to every session key
    pub session_prefix: String,

    /// Session lifetime in seconds (default: 1 day)
    pub session_ttl_secs: u64,

    /// Minimum password length accepted at registration (never below 8)
    pub min_password_len: usize,
}

impl StoreConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    ///
    /// `load()` passes the process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = StoreConfig {
            database_path: PathBuf::from(var("KITAP_DATABASE_PATH", "./data/kitap.db")),

            db_max_connections: var("KITAP_DB_MAX_CONNECTIONS", "5")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("KITAP_DB_MAX_CONNECTIONS".to_string()))?,

            redis_url: lookup("REDIS_URL")
                .filter(|url| !url.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingRequired("REDIS_URL".to_string()))?,

            session_prefix: var("KITAP_SESSION_PREFIX", "qazaq_kitap:"),

            session_ttl_secs: var("KITAP_SESSION_TTL_SECS", &SESSION_TTL_SECS.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("KITAP_SESSION_TTL_SECS".to_string()))?,

            min_password_len: var("KITAP_MIN_PASSWORD_LEN", &MIN_PASSWORD_LEN.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("KITAP_MIN_PASSWORD_LEN".to_string()))?,
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("KITAP_DB_MAX_CONNECTIONS".to_string()));
        }

        if config.session_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue("KITAP_SESSION_TTL_SECS".to_string()));
        }

        if config.min_password_len < MIN_PASSWORD_LEN {
            return Err(ConfigError::PasswordPolicyTooWeak {
                min: MIN_PASSWORD_LEN,
            });
        }

        Ok(config)
    }

    /// Pool configuration for the entity store.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.db_max_connections)
    }

    /// Session lifetime.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Minimum password length cannot be lowered below {min}")]
    PasswordPolicyTooWeak { min: usize },
}
