//! Database access for the catalog and identity store.
//!
//! # Database: `SQLite`
//!
//! ## Tables
//!
//! - `users`, `accounts`, `sessions`, `verification_tokens` - Identity
//! - `translations` - Localised strings
//! - `sliders`, `top_bars` - Homepage content
//! - `settings` - Key/value configuration
//! - `categories`, `product_brands`, `products`, `product_images` - Catalog
//!
//! # Migrations
//!
//! Migrations are stored in `crates/store/migrations/`, embedded at build
//! time and run via:
//! ```bash
//! cargo run -p catalog-cli -- migrate
//! ```
//!
//! # Transactions
//!
//! Every mutation runs in its own transaction and issues its first write
//! before any check reads, so concurrent writers serialise on the database
//! write lock instead of failing to upgrade a read snapshot. Dropping an
//! operation before it commits rolls it back.

/// Read and delete operations shared by every repository.
///
/// Expects the surrounding type to have a `pool: &SqlitePool` field.
macro_rules! read_operations {
    ($record:ty, $field:ty, $key:ty) => {
        /// Find a record by its key.
        ///
        /// # Errors
        ///
        /// Returns `RepositoryError::Database` if the query fails.
        pub async fn find_by_id(&self, id: &$key) -> Result<Option<$record>, RepositoryError> {
            let mut conn = self.pool.acquire().await?;
            $crate::db::table::fetch_by_key::<$record>(&mut conn, id).await
        }

        /// Get a record by its key.
        ///
        /// # Errors
        ///
        /// Returns `RepositoryError::NotFound` if no record has this key.
        pub async fn get(&self, id: &$key) -> Result<$record, RepositoryError> {
            let mut conn = self.pool.acquire().await?;
            $crate::db::table::get_by_key::<$record>(&mut conn, id).await
        }

        /// List records matching a query.
        ///
        /// # Errors
        ///
        /// Returns `RepositoryError::Validation` for ill-typed filters and
        /// `RepositoryError::NotFound` if a cursor row does not exist.
        pub async fn find_many(
            &self,
            query: &$crate::db::Query<$field>,
        ) -> Result<Vec<$record>, RepositoryError> {
            let mut conn = self.pool.acquire().await?;
            $crate::db::table::find_many::<$record>(&mut conn, query).await
        }

        /// Stream records matching a query, fetched in bounded batches.
        ///
        /// No connection is held between batches, so other repository calls
        /// may run while the stream is consumed. Each call starts a new scan,
        /// so the stream can be re-created to restart iteration.
        pub fn stream(
            &self,
            query: $crate::db::Query<$field>,
        ) -> ::futures::stream::BoxStream<'static, Result<$record, RepositoryError>> {
            $crate::db::table::stream::<$record>(self.pool, query)
        }

        /// Count records matching a filter.
        ///
        /// # Errors
        ///
        /// Returns `RepositoryError::Database` if the query fails.
        pub async fn count(
            &self,
            filter: &$crate::db::Filter<$field>,
        ) -> Result<i64, RepositoryError> {
            let mut conn = self.pool.acquire().await?;
            $crate::db::table::count::<$record>(&mut conn, filter).await
        }

        /// Row count and per-field statistics over records matching a filter.
        ///
        /// # Errors
        ///
        /// Returns `RepositoryError::Validation` if a field is not numeric.
        pub async fn aggregate(
            &self,
            filter: &$crate::db::Filter<$field>,
            fields: &[$field],
        ) -> Result<$crate::db::Aggregate<$field>, RepositoryError> {
            let mut conn = self.pool.acquire().await?;
            $crate::db::table::aggregate::<$record>(&mut conn, filter, fields).await
        }

        /// Delete a record.
        ///
        /// # Errors
        ///
        /// Returns `RepositoryError::NotFound` if no record has this key, or
        /// `RepositoryError::ForeignKeyViolation` if dependents restrict it.
        #[tracing::instrument(skip_all, fields(entity = <$record as $crate::db::table::Table>::ENTITY, id = %id))]
        pub async fn delete(&self, id: &$key) -> Result<(), RepositoryError> {
            let mut tx = self.pool.begin().await?;
            $crate::db::table::delete::<$record>(&mut tx, id).await?;
            tx.commit().await?;
            tracing::info!(%id, "deleted");
            Ok(())
        }
    };
}

pub mod accounts;
pub mod brands;
pub mod categories;
mod error;
pub mod product_images;
pub mod products;
pub mod query;
pub mod sessions;
pub mod settings;
pub mod sliders;
pub(crate) mod table;
pub mod top_bars;
pub mod translations;
pub mod users;
mod validate;
pub mod verification_tokens;

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::migrate::{MigrateError, Migrator};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use crate::config::StoreConfig;

pub use accounts::AccountRepository;
pub use brands::BrandRepository;
pub use categories::CategoryRepository;
pub use error::RepositoryError;
pub use product_images::ProductImageRepository;
pub use products::ProductRepository;
pub use query::{
    Aggregate, Condition, Direction, Field, FieldAggregate, FieldKind, Filter, OrderBy, Page, Query,
    Value,
};
pub use sessions::SessionRepository;
pub use settings::SettingsRepository;
pub use sliders::SliderRepository;
pub use top_bars::TopBarRepository;
pub use translations::TranslationRepository;
pub use users::UserRepository;
pub use verification_tokens::VerificationTokenRepository;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Create a `SQLite` connection pool from configuration.
///
/// Foreign keys are enforced on every connection. File databases use WAL
/// journaling so readers do not block the writer. In-memory databases are
/// private to a connection, so their pool keeps exactly one connection
/// open for its whole lifetime.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid or the connection cannot be
/// established.
pub async fn create_pool(config: &StoreConfig) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(config.busy_timeout);

    let pool = if config.is_in_memory() {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options.journal_mode(SqliteJournalMode::Wal))
            .await?
    };

    tracing::debug!(
        url = %config.database_url,
        max_connections = pool.options().get_max_connections(),
        "database pool ready"
    );
    Ok(pool)
}

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails or the applied history
/// diverges from the embedded one.
pub async fn migrate(pool: &SqlitePool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await?;
    tracing::info!(migrations = MIGRATOR.iter().count(), "schema up to date");
    Ok(())
}

/// Create a pool and bring its schema up to date.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if connecting or migrating fails.
pub async fn connect(config: &StoreConfig) -> Result<SqlitePool, RepositoryError> {
    let pool = create_pool(config).await?;
    migrate(&pool)
        .await
        .map_err(|e| RepositoryError::Database(sqlx::Error::Migrate(Box::new(e))))?;
    Ok(pool)
}

/// Fresh migrated in-memory store.
///
/// # Errors
///
/// See [`connect`].
pub async fn connect_in_memory() -> Result<SqlitePool, RepositoryError> {
    connect(&StoreConfig::in_memory()).await
}

/// Bound a repository operation by `duration`.
///
/// When the deadline passes the operation's future is dropped. A transaction
/// that had not yet sent its `COMMIT` is rolled back, but one whose commit was
/// already handed to the connection may still complete, so the outcome of a
/// timed-out write is unknown. Check before retrying it.
///
/// # Errors
///
/// Returns `RepositoryError::Timeout` if the deadline passes, otherwise the
/// operation's own result.
pub async fn with_timeout<T, F>(duration: Duration, operation: F) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, RepositoryError>>,
{
    tokio::time::timeout(duration, operation)
        .await
        .map_err(|_| RepositoryError::Timeout(duration))?
}
