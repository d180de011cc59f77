//! Account repository: links between users and external auth providers.

use sqlx::SqlitePool;
use tracing::instrument;

use catalog_core::{AccountId, UserId};

use super::RepositoryError;
use super::query::{Filter, OrderBy, Query};
use super::table::{self, ChangeSet, Reference, Table};
use super::validate;
use crate::models::{Account, AccountField, CreateAccountInput, UpdateAccountInput};

/// Internal row type for account queries.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AccountRow {
    id: AccountId,
    user_id: UserId,
    account_type: String,
    provider: String,
    provider_account_id: String,
    refresh_token: Option<String>,
    access_token: Option<String>,
    expires_at: Option<i64>,
    token_type: Option<String>,
    scope: Option<String>,
    id_token: Option<String>,
    session_state: Option<String>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            account_type: row.account_type,
            provider: row.provider,
            provider_account_id: row.provider_account_id,
            refresh_token: row.refresh_token,
            access_token: row.access_token,
            expires_at: row.expires_at,
            token_type: row.token_type,
            scope: row.scope,
            id_token: row.id_token,
            session_state: row.session_state,
        }
    }
}

impl Table for Account {
    const NAME: &'static str = "accounts";
    const ENTITY: &'static str = "Account";
    const KEY: &'static [AccountField] = &[AccountField::Id];
    const REFERENCES: &'static [Reference] = &[Reference {
        column: "user_id",
        table: "users",
    }];
    const TIMESTAMPS: bool = false;

    type Field = AccountField;
    type Key = AccountId;
    type Row = AccountRow;
}

/// Repository for account database operations.
pub struct AccountRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AccountRepository<'a> {
    /// Create a new account repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    read_operations!(Account, AccountField, AccountId);

    /// Link a provider account to a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ConstraintViolation` if the provider account
    /// is already linked, or `RepositoryError::ForeignKeyViolation` if the
    /// user does not exist.
    #[instrument(skip(self, input), fields(user_id = %input.user_id, provider = %input.provider))]
    pub async fn create(&self, input: &CreateAccountInput) -> Result<Account, RepositoryError> {
        validate::non_empty(Account::ENTITY, "account_type", &input.account_type)?;
        validate::non_empty(Account::ENTITY, "provider", &input.provider)?;
        validate::non_empty(
            Account::ENTITY,
            "provider_account_id",
            &input.provider_account_id,
        )?;

        let mut changes = ChangeSet::new();
        changes
            .set(AccountField::UserId, input.user_id)
            .set(AccountField::AccountType, input.account_type.as_str())
            .set(AccountField::Provider, input.provider.as_str())
            .set(
                AccountField::ProviderAccountId,
                input.provider_account_id.as_str(),
            )
            .set(AccountField::RefreshToken, input.refresh_token.clone())
            .set(AccountField::AccessToken, input.access_token.clone())
            .set(AccountField::ExpiresAt, input.expires_at)
            .set(AccountField::TokenType, input.token_type.clone())
            .set(AccountField::Scope, input.scope.clone())
            .set(AccountField::IdToken, input.id_token.clone())
            .set(AccountField::SessionState, input.session_state.clone());

        let mut tx = self.pool.begin().await?;
        let account = table::insert::<Account>(&mut tx, changes).await?;
        tx.commit().await?;

        tracing::info!(account_id = %account.id, "account linked");
        Ok(account)
    }

    /// Update an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist, plus
    /// the errors of [`AccountRepository::create`].
    #[instrument(skip(self, input), fields(account_id = %id))]
    pub async fn update(
        &self,
        id: &AccountId,
        input: &UpdateAccountInput,
    ) -> Result<Account, RepositoryError> {
        validate::non_empty_opt(Account::ENTITY, "account_type", input.account_type.as_deref())?;
        validate::non_empty_opt(Account::ENTITY, "provider", input.provider.as_deref())?;
        validate::non_empty_opt(
            Account::ENTITY,
            "provider_account_id",
            input.provider_account_id.as_deref(),
        )?;

        let mut changes = ChangeSet::new();
        changes
            .set_opt(AccountField::UserId, input.user_id)
            .set_opt(AccountField::AccountType, input.account_type.clone())
            .set_opt(AccountField::Provider, input.provider.clone())
            .set_opt(
                AccountField::ProviderAccountId,
                input.provider_account_id.clone(),
            )
            .set_opt(AccountField::RefreshToken, input.refresh_token.clone())
            .set_opt(AccountField::AccessToken, input.access_token.clone())
            .set_opt(AccountField::ExpiresAt, input.expires_at)
            .set_opt(AccountField::TokenType, input.token_type.clone())
            .set_opt(AccountField::Scope, input.scope.clone())
            .set_opt(AccountField::IdToken, input.id_token.clone())
            .set_opt(AccountField::SessionState, input.session_state.clone());

        let mut tx = self.pool.begin().await?;
        let account = table::update::<Account>(&mut tx, id, changes).await?;
        tx.commit().await?;
        Ok(account)
    }

    /// Get an account by its provider and provider-side id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_provider(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<Account>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        table::find_first::<Account>(
            &mut conn,
            Filter::new()
                .eq(AccountField::Provider, provider)
                .eq(AccountField::ProviderAccountId, provider_account_id),
        )
        .await
    }

    /// List a user's accounts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Account>, RepositoryError> {
        self.find_many(
            &Query::new()
                .filter(Filter::new().eq(AccountField::UserId, user_id))
                .order_by(OrderBy::asc(AccountField::Provider)),
        )
        .await
    }

    /// Delete an account by its provider and provider-side id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such account exists.
    #[instrument(skip(self))]
    pub async fn delete_by_provider(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query(
            r#"DELETE FROM "accounts" WHERE "provider" = ? AND "provider_account_id" = ?"#,
        )
        .bind(provider)
        .bind(provider_account_id)
        .execute(&mut *tx)
        .await?;
        if deleted.rows_affected() == 0 {
            return Err(RepositoryError::not_found(
                Account::ENTITY,
                format!("{provider}/{provider_account_id}"),
            ));
        }
        tx.commit().await?;

        tracing::info!("account unlinked");
        Ok(())
    }
}
