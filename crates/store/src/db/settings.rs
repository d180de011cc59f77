//! Settings repository: key/value configuration.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::instrument;

use catalog_core::SettingId;

use super::RepositoryError;
use super::query::Filter;
use super::table::{self, ChangeSet, Table};
use super::validate;
use crate::models::{CreateSettingInput, Setting, SettingField, UpdateSettingInput};

/// Internal row type for setting queries.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SettingRow {
    id: SettingId,
    key: String,
    value: String,
    image_url: Option<String>,
    image_key: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SettingRow> for Setting {
    fn from(row: SettingRow) -> Self {
        Self {
            id: row.id,
            key: row.key,
            value: row.value,
            image_url: row.image_url,
            image_key: row.image_key,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Table for Setting {
    const NAME: &'static str = "settings";
    const ENTITY: &'static str = "Setting";
    const KEY: &'static [SettingField] = &[SettingField::Id];

    type Field = SettingField;
    type Key = SettingId;
    type Row = SettingRow;
}

/// Repository for settings.
pub struct SettingsRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SettingsRepository<'a> {
    /// Create a new settings repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    read_operations!(Setting, SettingField, SettingId);

    /// Create a setting.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ConstraintViolation` if the key is taken.
    #[instrument(skip(self, input), fields(key = %input.key))]
    pub async fn create(&self, input: &CreateSettingInput) -> Result<Setting, RepositoryError> {
        validate::non_empty(Setting::ENTITY, "key", &input.key)?;

        let id = input.id.clone().unwrap_or_else(SettingId::generate);
        let mut changes = ChangeSet::new();
        changes
            .set(SettingField::Id, id)
            .set(SettingField::Key, input.key.as_str())
            .set(SettingField::Value, input.value.as_str())
            .set(SettingField::ImageUrl, input.image_url.clone())
            .set(SettingField::ImageKey, input.image_key.clone());

        let mut tx = self.pool.begin().await?;
        let setting = table::insert::<Setting>(&mut tx, changes).await?;
        tx.commit().await?;

        tracing::info!(setting_id = %setting.id, "setting created");
        Ok(setting)
    }

    /// Update a setting.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the setting does not exist, or
    /// `RepositoryError::ConstraintViolation` if the new key is taken.
    #[instrument(skip(self, input), fields(setting_id = %id))]
    pub async fn update(
        &self,
        id: &SettingId,
        input: &UpdateSettingInput,
    ) -> Result<Setting, RepositoryError> {
        validate::non_empty_opt(Setting::ENTITY, "key", input.key.as_deref())?;

        let mut changes = ChangeSet::new();
        changes
            .set_opt(SettingField::Key, input.key.clone())
            .set_opt(SettingField::Value, input.value.clone())
            .set_opt(SettingField::ImageUrl, input.image_url.clone())
            .set_opt(SettingField::ImageKey, input.image_key.clone());

        let mut tx = self.pool.begin().await?;
        let setting = table::update::<Setting>(&mut tx, id, changes).await?;
        tx.commit().await?;
        Ok(setting)
    }

    /// Get a setting by its key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_key(&self, key: &str) -> Result<Option<Setting>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        table::find_first::<Setting>(&mut conn, Filter::new().eq(SettingField::Key, key)).await
    }

    /// Value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_value(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        Ok(self.find_by_key(key).await?.map(|s| s.value))
    }

    /// Store `value` under `key`, creating the setting if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Validation` if the key is blank.
    #[instrument(skip(self, value))]
    pub async fn set(&self, key: &str, value: &str) -> Result<Setting, RepositoryError> {
        validate::non_empty(Setting::ENTITY, "key", key)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, SettingRow>(
            r#"
            INSERT INTO "settings" ("id", "key", "value", "created_at", "updated_at")
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT ("key")
            DO UPDATE SET "value" = excluded."value", "updated_at" = excluded."updated_at"
            RETURNING *
            "#,
        )
        .bind(SettingId::generate())
        .bind(key)
        .bind(value)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(Setting::ENTITY, e))?;
        tx.commit().await?;

        tracing::info!(setting_id = %row.id, "setting stored");
        Ok(row.into())
    }
}
