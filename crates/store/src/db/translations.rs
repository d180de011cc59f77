//! Translation repository.
//!
//! Strings are unique per `(locale, namespace, key)`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::instrument;

use catalog_core::TranslationId;

use super::RepositoryError;
use super::query::{Filter, OrderBy, Query};
use super::table::{self, ChangeSet, Table};
use super::validate;
use crate::models::{
    CreateTranslationInput, Translation, TranslationField, UpdateTranslationInput,
};

/// Internal row type for translation queries.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TranslationRow {
    id: TranslationId,
    locale: String,
    namespace: String,
    key: String,
    value: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TranslationRow> for Translation {
    fn from(row: TranslationRow) -> Self {
        Self {
            id: row.id,
            locale: row.locale,
            namespace: row.namespace,
            key: row.key,
            value: row.value,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Table for Translation {
    const NAME: &'static str = "translations";
    const ENTITY: &'static str = "Translation";
    const KEY: &'static [TranslationField] = &[TranslationField::Id];

    type Field = TranslationField;
    type Key = TranslationId;
    type Row = TranslationRow;
}

fn check_address(
    locale: Option<&str>,
    namespace: Option<&str>,
    key: Option<&str>,
) -> Result<(), RepositoryError> {
    validate::non_empty_opt(Translation::ENTITY, "locale", locale)?;
    validate::non_empty_opt(Translation::ENTITY, "namespace", namespace)?;
    validate::non_empty_opt(Translation::ENTITY, "key", key)
}

/// Repository for translation database operations.
pub struct TranslationRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> TranslationRepository<'a> {
    /// Create a new translation repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    read_operations!(Translation, TranslationField, TranslationId);

    /// Create a translation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ConstraintViolation` if the
    /// `(locale, namespace, key)` triple already exists.
    #[instrument(skip(self, input), fields(locale = %input.locale, namespace = %input.namespace, key = %input.key))]
    pub async fn create(
        &self,
        input: &CreateTranslationInput,
    ) -> Result<Translation, RepositoryError> {
        check_address(
            Some(&input.locale),
            Some(&input.namespace),
            Some(&input.key),
        )?;

        let mut changes = ChangeSet::new();
        changes
            .set(TranslationField::Locale, input.locale.as_str())
            .set(TranslationField::Namespace, input.namespace.as_str())
            .set(TranslationField::Key, input.key.as_str())
            .set(TranslationField::Value, input.value.as_str());

        let mut tx = self.pool.begin().await?;
        let translation = table::insert::<Translation>(&mut tx, changes).await?;
        tx.commit().await?;

        tracing::debug!(translation_id = %translation.id, "translation created");
        Ok(translation)
    }

    /// Update a translation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the translation does not exist,
    /// or `RepositoryError::ConstraintViolation` if the new address is taken.
    #[instrument(skip(self, input), fields(translation_id = %id))]
    pub async fn update(
        &self,
        id: &TranslationId,
        input: &UpdateTranslationInput,
    ) -> Result<Translation, RepositoryError> {
        check_address(
            input.locale.as_deref(),
            input.namespace.as_deref(),
            input.key.as_deref(),
        )?;

        let mut changes = ChangeSet::new();
        changes
            .set_opt(TranslationField::Locale, input.locale.clone())
            .set_opt(TranslationField::Namespace, input.namespace.clone())
            .set_opt(TranslationField::Key, input.key.clone())
            .set_opt(TranslationField::Value, input.value.clone());

        let mut tx = self.pool.begin().await?;
        let translation = table::update::<Translation>(&mut tx, id, changes).await?;
        tx.commit().await?;
        Ok(translation)
    }

    /// Insert a translation or replace the value of the existing one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Validation` if part of the address is blank.
    #[instrument(skip(self, input), fields(locale = %input.locale, namespace = %input.namespace, key = %input.key))]
    pub async fn upsert(
        &self,
        input: &CreateTranslationInput,
    ) -> Result<Translation, RepositoryError> {
        check_address(
            Some(&input.locale),
            Some(&input.namespace),
            Some(&input.key),
        )?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, TranslationRow>(
            r#"
            INSERT INTO "translations" ("locale", "namespace", "key", "value", "created_at", "updated_at")
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT ("locale", "namespace", "key")
            DO UPDATE SET "value" = excluded."value", "updated_at" = excluded."updated_at"
            RETURNING *
            "#,
        )
        .bind(&input.locale)
        .bind(&input.namespace)
        .bind(&input.key)
        .bind(&input.value)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(Translation::ENTITY, e))?;
        tx.commit().await?;

        Ok(row.into())
    }

    /// Get a translation by its address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_key(
        &self,
        locale: &str,
        namespace: &str,
        key: &str,
    ) -> Result<Option<Translation>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        table::find_first::<Translation>(
            &mut conn,
            Filter::new()
                .eq(TranslationField::Locale, locale)
                .eq(TranslationField::Namespace, namespace)
                .eq(TranslationField::Key, key),
        )
        .await
    }

    /// All strings of one namespace in one locale, keyed by translation key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn load_namespace(
        &self,
        locale: &str,
        namespace: &str,
    ) -> Result<BTreeMap<String, String>, RepositoryError> {
        let translations = self
            .find_many(
                &Query::new()
                    .filter(
                        Filter::new()
                            .eq(TranslationField::Locale, locale)
                            .eq(TranslationField::Namespace, namespace),
                    )
                    .order_by(OrderBy::asc(TranslationField::Key)),
            )
            .await?;

        Ok(translations
            .into_iter()
            .map(|t| (t.key, t.value))
            .collect())
    }

    /// Distinct locales that have at least one string, sorted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn locales(&self) -> Result<Vec<String>, RepositoryError> {
        let locales = sqlx::query_scalar::<_, String>(
            r#"SELECT DISTINCT "locale" FROM "translations" ORDER BY "locale""#,
        )
        .fetch_all(self.pool)
        .await?;
        Ok(locales)
    }
}
