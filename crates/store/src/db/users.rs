//! User repository for database operations.
//!
//! Deleting a user removes its accounts and sessions through
//! `ON DELETE CASCADE`.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::instrument;

use catalog_core::{Email, Role, UserId};

use super::RepositoryError;
use super::accounts::AccountRepository;
use super::query::Filter;
use super::table::{self, ChangeSet, Table};
use crate::models::{Account, CreateAccountInput, CreateUserInput, UpdateUserInput, User, UserField};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for user queries.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    id: UserId,
    name: Option<String>,
    email: Option<Email>,
    email_verified: Option<DateTime<Utc>>,
    image: Option<String>,
    role: Role,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            email_verified: row.email_verified,
            image: row.image,
            role: row.role,
        }
    }
}

impl Table for User {
    const NAME: &'static str = "users";
    const ENTITY: &'static str = "User";
    const KEY: &'static [UserField] = &[UserField::Id];
    const TIMESTAMPS: bool = false;

    type Field = UserField;
    type Key = UserId;
    type Row = UserRow;
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    read_operations!(User, UserField, UserId);

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ConstraintViolation` if the email is taken.
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: &CreateUserInput) -> Result<User, RepositoryError> {
        let mut changes = ChangeSet::new();
        changes
            .set(UserField::Name, input.name.clone())
            .set(UserField::Email, input.email.clone())
            .set(UserField::EmailVerified, input.email_verified)
            .set(UserField::Image, input.image.clone())
            .set(UserField::Role, input.role);

        let mut tx = self.pool.begin().await?;
        let user = table::insert::<User>(&mut tx, changes).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, role = %user.role, "user created");
        Ok(user)
    }

    /// Update a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist, or
    /// `RepositoryError::ConstraintViolation` if the new email is taken.
    #[instrument(skip(self, input), fields(user_id = %id))]
    pub async fn update(&self, id: &UserId, input: &UpdateUserInput) -> Result<User, RepositoryError> {
        let mut changes = ChangeSet::new();
        changes
            .set_opt(UserField::Name, input.name.clone())
            .set_opt(UserField::Email, input.email.clone())
            .set_opt(UserField::EmailVerified, input.email_verified)
            .set_opt(UserField::Image, input.image.clone())
            .set_opt(UserField::Role, input.role);

        let mut tx = self.pool.begin().await?;
        let user = table::update::<User>(&mut tx, id, changes).await?;
        tx.commit().await?;
        Ok(user)
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        table::find_first::<User>(&mut conn, Filter::new().eq(UserField::Email, email)).await
    }

    /// Get the user linked to an external provider account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT u.*
            FROM "users" u
            INNER JOIN "accounts" a ON a."user_id" = u."id"
            WHERE a."provider" = ? AND a."provider_account_id" = ?
            "#,
        )
        .bind(provider)
        .bind(provider_account_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Link an external provider account to a user.
    ///
    /// # Errors
    ///
    /// See [`AccountRepository::create`].
    pub async fn link_account(&self, input: &CreateAccountInput) -> Result<Account, RepositoryError> {
        AccountRepository::new(self.pool).create(input).await
    }

    /// Remove the link to an external provider account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such link exists.
    pub async fn unlink_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<(), RepositoryError> {
        AccountRepository::new(self.pool)
            .delete_by_provider(provider, provider_account_id)
            .await
    }
}
