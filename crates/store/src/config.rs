//! Store configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CATALOG_DATABASE_URL` - `SQLite` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `CATALOG_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `CATALOG_MIN_CONNECTIONS` - Idle connections kept open (default: 1)
//! - `CATALOG_ACQUIRE_TIMEOUT_SECS` - Pool acquire timeout (default: 10)
//! - `CATALOG_BUSY_TIMEOUT_MS` - `SQLite` lock wait before reporting busy (default: 5000)
//! - `CATALOG_LOW_STOCK_THRESHOLD` - Quantity at or below which stock counts as low (default: 5)

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// In-memory database URL. Each connection gets its own database, so pools
/// built for it hold exactly one connection.
pub const IN_MEMORY_URL: &str = "sqlite::memory:";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Connection and behaviour settings for the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// `SQLite` connection URL (`sqlite://path/to/catalog.db` or `sqlite::memory:`)
    pub database_url: String,
    /// Maximum pooled connections
    pub max_connections: u32,
    /// Minimum pooled connections
    pub min_connections: u32,
    /// How long to wait for a free connection
    pub acquire_timeout: Duration,
    /// How long a statement waits on a locked database
    pub busy_timeout: Duration,
    /// Default threshold used when suggesting a stock status
    pub low_stock_threshold: i32,
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the database URL is missing or a numeric
    /// variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`StoreConfig::from_env`].
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("CATALOG_DATABASE_URL")
            .or_else(|| lookup("DATABASE_URL"))
            .ok_or_else(|| ConfigError::MissingEnvVar("CATALOG_DATABASE_URL".to_string()))?;

        let max_connections = parse_or_default(&lookup, "CATALOG_MAX_CONNECTIONS", 10)?;
        let min_connections = parse_or_default(&lookup, "CATALOG_MIN_CONNECTIONS", 1)?;
        if min_connections > max_connections {
            return Err(ConfigError::InvalidEnvVar(
                "CATALOG_MIN_CONNECTIONS".to_string(),
                format!("{min_connections} exceeds CATALOG_MAX_CONNECTIONS ({max_connections})"),
            ));
        }

        let acquire_timeout =
            Duration::from_secs(parse_or_default(&lookup, "CATALOG_ACQUIRE_TIMEOUT_SECS", 10)?);
        let busy_timeout =
            Duration::from_millis(parse_or_default(&lookup, "CATALOG_BUSY_TIMEOUT_MS", 5000)?);
        let low_stock_threshold = parse_or_default(&lookup, "CATALOG_LOW_STOCK_THRESHOLD", 5)?;

        Ok(Self {
            database_url,
            max_connections,
            min_connections,
            acquire_timeout,
            busy_timeout,
            low_stock_threshold,
        })
    }

    /// Single-connection in-memory configuration for tests and tooling.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            database_url: IN_MEMORY_URL.to_string(),
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(10),
            busy_timeout: Duration::from_secs(5),
            low_stock_threshold: 5,
        }
    }

    /// Whether the URL points at a private in-memory database.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            StoreConfig::from_vars(vars(&[("CATALOG_DATABASE_URL", "sqlite://catalog.db")]))
                .unwrap();
        assert_eq!(config.database_url, "sqlite://catalog.db");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.acquire_timeout, Duration::from_secs(10));
        assert_eq!(config.busy_timeout, Duration::from_millis(5000));
        assert_eq!(config.low_stock_threshold, 5);
        assert!(!config.is_in_memory());
    }

    #[test]
    fn test_database_url_fallback() {
        let config =
            StoreConfig::from_vars(vars(&[("DATABASE_URL", "sqlite://fallback.db")])).unwrap();
        assert_eq!(config.database_url, "sqlite://fallback.db");
    }

    #[test]
    fn test_missing_database_url() {
        let err = StoreConfig::from_vars(vars(&[])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingEnvVar("CATALOG_DATABASE_URL".to_string())
        );
    }

    #[test]
    fn test_invalid_number() {
        let err = StoreConfig::from_vars(vars(&[
            ("CATALOG_DATABASE_URL", "sqlite://catalog.db"),
            ("CATALOG_MAX_CONNECTIONS", "many"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "CATALOG_MAX_CONNECTIONS"));
    }

    #[test]
    fn test_min_above_max_is_rejected() {
        let err = StoreConfig::from_vars(vars(&[
            ("CATALOG_DATABASE_URL", "sqlite://catalog.db"),
            ("CATALOG_MAX_CONNECTIONS", "2"),
            ("CATALOG_MIN_CONNECTIONS", "4"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "CATALOG_MIN_CONNECTIONS"));
    }

    #[test]
    fn test_in_memory() {
        let config = StoreConfig::in_memory();
        assert!(config.is_in_memory());
        assert_eq!(config.max_connections, 1);
    }
}
