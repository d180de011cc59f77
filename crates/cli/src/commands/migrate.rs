//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! catalog migrate
//! ```
//!
//! Migrations are embedded from `crates/store/migrations/`.

use catalog_store::{StoreConfig, create_pool, migrate};

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or a migration fails.
pub async fn run(config: &StoreConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(url = %config.database_url, "Connecting to database");
    let pool = create_pool(config).await?;

    migrate(&pool).await?;

    tracing::info!("Migrations complete");
    Ok(())
}
