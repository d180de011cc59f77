//! Session repository.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::instrument;

use catalog_core::{SessionId, UserId};

use super::RepositoryError;
use super::query::Filter;
use super::table::{self, ChangeSet, Reference, Table};
use super::validate;
use crate::models::{
    CreateSessionInput, Session, SessionField, SessionWithUser, UpdateSessionInput, User,
};

/// Internal row type for session queries.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SessionRow {
    id: SessionId,
    session_token: String,
    user_id: UserId,
    expires: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id,
            session_token: row.session_token,
            user_id: row.user_id,
            expires: row.expires,
        }
    }
}

impl Table for Session {
    const NAME: &'static str = "sessions";
    const ENTITY: &'static str = "Session";
    const KEY: &'static [SessionField] = &[SessionField::Id];
    const REFERENCES: &'static [Reference] = &[Reference {
        column: "user_id",
        table: "users",
    }];
    const TIMESTAMPS: bool = false;

    type Field = SessionField;
    type Key = SessionId;
    type Row = SessionRow;
}

/// Repository for session database operations.
pub struct SessionRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SessionRepository<'a> {
    /// Create a new session repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    read_operations!(Session, SessionField, SessionId);

    /// Start a session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ConstraintViolation` if the token is already
    /// in use, or `RepositoryError::ForeignKeyViolation` if the user does not
    /// exist.
    #[instrument(skip(self, input), fields(user_id = %input.user_id))]
    pub async fn create(&self, input: &CreateSessionInput) -> Result<Session, RepositoryError> {
        validate::non_empty(Session::ENTITY, "session_token", &input.session_token)?;

        let mut changes = ChangeSet::new();
        changes
            .set(SessionField::SessionToken, input.session_token.as_str())
            .set(SessionField::UserId, input.user_id)
            .set(SessionField::Expires, input.expires);

        let mut tx = self.pool.begin().await?;
        let session = table::insert::<Session>(&mut tx, changes).await?;
        tx.commit().await?;

        tracing::debug!(session_id = %session.id, expires = %session.expires, "session created");
        Ok(session)
    }

    /// Update a session (typically to extend its expiry).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the session does not exist.
    #[instrument(skip(self, input), fields(session_id = %id))]
    pub async fn update(
        &self,
        id: &SessionId,
        input: &UpdateSessionInput,
    ) -> Result<Session, RepositoryError> {
        validate::non_empty_opt(
            Session::ENTITY,
            "session_token",
            input.session_token.as_deref(),
        )?;

        let mut changes = ChangeSet::new();
        changes
            .set_opt(SessionField::SessionToken, input.session_token.clone())
            .set_opt(SessionField::UserId, input.user_id)
            .set_opt(SessionField::Expires, input.expires);

        let mut tx = self.pool.begin().await?;
        let session = table::update::<Session>(&mut tx, id, changes).await?;
        tx.commit().await?;
        Ok(session)
    }

    /// Get a session by its token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_token(&self, token: &str) -> Result<Option<Session>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        table::find_first::<Session>(&mut conn, Filter::new().eq(SessionField::SessionToken, token))
            .await
    }

    /// Get a session by its token together with its user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the session's user is missing.
    pub async fn find_with_user(
        &self,
        token: &str,
    ) -> Result<Option<SessionWithUser>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let Some(session) = table::find_first::<Session>(
            &mut conn,
            Filter::new().eq(SessionField::SessionToken, token),
        )
        .await?
        else {
            return Ok(None);
        };

        let user = table::fetch_by_key::<User>(&mut conn, &session.user_id)
            .await?
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "session {} refers to missing user {}",
                    session.id, session.user_id
                ))
            })?;

        Ok(Some(SessionWithUser { session, user }))
    }

    /// Delete a session by its token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no session has this token.
    #[instrument(skip_all)]
    pub async fn delete_by_token(&self, token: &str) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query(r#"DELETE FROM "sessions" WHERE "session_token" = ?"#)
            .bind(token)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(RepositoryError::not_found(Session::ENTITY, "token"));
        }
        tx.commit().await?;
        Ok(())
    }

    /// Delete every session that has expired at `now`.
    ///
    /// Returns the number of sessions removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query(r#"DELETE FROM "sessions" WHERE "expires" <= ?"#)
            .bind(now)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        tracing::info!(deleted, "expired sessions removed");
        Ok(deleted)
    }
}
