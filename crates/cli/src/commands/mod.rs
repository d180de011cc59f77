//! Command implementations.

pub mod categories;
pub mod migrate;
pub mod products;
pub mod seed;
pub mod stats;

use catalog_store::{ConfigError, StoreConfig};

/// Load store configuration, letting `database_url` override the environment.
///
/// # Errors
///
/// Returns `ConfigError` if no database URL is available or a variable does
/// not parse.
pub fn load_config(database_url: Option<String>) -> Result<StoreConfig, ConfigError> {
    // Load .env file if present (ignore errors if not found)
    dotenvy::dotenv().ok();

    StoreConfig::from_vars(|key| match (key, &database_url) {
        ("CATALOG_DATABASE_URL", Some(url)) => Some(url.clone()),
        _ => std::env::var(key).ok(),
    })
}
