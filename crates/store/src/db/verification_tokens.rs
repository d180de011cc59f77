//! Verification token repository.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::instrument;

use super::RepositoryError;
use super::table::{self, ChangeSet, Table};
use super::validate;
use crate::models::{
    CreateVerificationTokenInput, VerificationToken, VerificationTokenField, VerificationTokenKey,
};

/// Internal row type for verification token queries.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct VerificationTokenRow {
    identifier: String,
    token: String,
    expires: DateTime<Utc>,
}

impl From<VerificationTokenRow> for VerificationToken {
    fn from(row: VerificationTokenRow) -> Self {
        Self {
            identifier: row.identifier,
            token: row.token,
            expires: row.expires,
        }
    }
}

impl Table for VerificationToken {
    const NAME: &'static str = "verification_tokens";
    const ENTITY: &'static str = "VerificationToken";
    const KEY: &'static [VerificationTokenField] = &[
        VerificationTokenField::Identifier,
        VerificationTokenField::Token,
    ];
    const TIMESTAMPS: bool = false;

    type Field = VerificationTokenField;
    type Key = VerificationTokenKey;
    type Row = VerificationTokenRow;
}

/// Repository for verification token database operations.
pub struct VerificationTokenRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> VerificationTokenRepository<'a> {
    /// Create a new verification token repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    read_operations!(
        VerificationToken,
        VerificationTokenField,
        VerificationTokenKey
    );

    /// Issue a token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ConstraintViolation` if the same token was
    /// already issued for this identifier.
    #[instrument(skip_all, fields(identifier = %input.identifier))]
    pub async fn create(
        &self,
        input: &CreateVerificationTokenInput,
    ) -> Result<VerificationToken, RepositoryError> {
        validate::non_empty(VerificationToken::ENTITY, "identifier", &input.identifier)?;
        validate::non_empty(VerificationToken::ENTITY, "token", &input.token)?;

        let mut changes = ChangeSet::new();
        changes
            .set(VerificationTokenField::Identifier, input.identifier.as_str())
            .set(VerificationTokenField::Token, input.token.as_str())
            .set(VerificationTokenField::Expires, input.expires);

        let mut tx = self.pool.begin().await?;
        let token = table::insert::<VerificationToken>(&mut tx, changes).await?;
        tx.commit().await?;
        Ok(token)
    }

    /// Consume a token.
    ///
    /// Deletes and returns the token if it exists and has not expired at
    /// `now`. A token can be consumed at most once, even by concurrent
    /// callers. Expired tokens are left for [`delete_expired`](Self::delete_expired).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip_all, fields(identifier = %key.identifier))]
    pub async fn use_token(
        &self,
        key: &VerificationTokenKey,
        now: DateTime<Utc>,
    ) -> Result<Option<VerificationToken>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, VerificationTokenRow>(
            r#"
            DELETE FROM "verification_tokens"
            WHERE "identifier" = ? AND "token" = ? AND "expires" > ?
            RETURNING *
            "#,
        )
        .bind(&key.identifier)
        .bind(&key.token)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::debug!(used = row.is_some(), "verification token checked");
        Ok(row.map(Into::into))
    }

    /// Delete every token that has expired at `now`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query(r#"DELETE FROM "verification_tokens" WHERE "expires" <= ?"#)
            .bind(now)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        tracing::info!(deleted, "expired verification tokens removed");
        Ok(deleted)
    }
}
