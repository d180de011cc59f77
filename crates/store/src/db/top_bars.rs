//! Announcement bar repository.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::instrument;

use catalog_core::TopBarId;

use super::RepositoryError;
use super::query::{Filter, OrderBy, Query};
use super::table::{self, ChangeSet, Table};
use super::validate;
use crate::models::{CreateTopBarInput, TopBar, TopBarField, UpdateTopBarInput};

/// Internal row type for announcement queries.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TopBarRow {
    id: TopBarId,
    title: String,
    url: String,
    icon: Option<String>,
    is_active: bool,
    sort_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TopBarRow> for TopBar {
    fn from(row: TopBarRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            url: row.url,
            icon: row.icon,
            is_active: row.is_active,
            order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Table for TopBar {
    const NAME: &'static str = "top_bars";
    const ENTITY: &'static str = "TopBar";
    const KEY: &'static [TopBarField] = &[TopBarField::Id];

    type Field = TopBarField;
    type Key = TopBarId;
    type Row = TopBarRow;
}

/// Repository for announcement bar entries.
pub struct TopBarRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> TopBarRepository<'a> {
    /// Create a new announcement repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    read_operations!(TopBar, TopBarField, TopBarId);

    /// Create an announcement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Validation` if the title or URL is blank.
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: &CreateTopBarInput) -> Result<TopBar, RepositoryError> {
        validate::non_empty(TopBar::ENTITY, "title", &input.title)?;
        validate::non_empty(TopBar::ENTITY, "url", &input.url)?;

        let mut changes = ChangeSet::new();
        changes
            .set(TopBarField::Title, input.title.as_str())
            .set(TopBarField::Url, input.url.as_str())
            .set(TopBarField::Icon, input.icon.clone())
            .set(TopBarField::IsActive, input.is_active)
            .set(TopBarField::Order, input.order);

        let mut tx = self.pool.begin().await?;
        let top_bar = table::insert::<TopBar>(&mut tx, changes).await?;
        tx.commit().await?;

        tracing::info!(top_bar_id = %top_bar.id, "announcement created");
        Ok(top_bar)
    }

    /// Update an announcement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the announcement does not exist.
    #[instrument(skip(self, input), fields(top_bar_id = %id))]
    pub async fn update(
        &self,
        id: &TopBarId,
        input: &UpdateTopBarInput,
    ) -> Result<TopBar, RepositoryError> {
        validate::non_empty_opt(TopBar::ENTITY, "title", input.title.as_deref())?;
        validate::non_empty_opt(TopBar::ENTITY, "url", input.url.as_deref())?;

        let mut changes = ChangeSet::new();
        changes
            .set_opt(TopBarField::Title, input.title.clone())
            .set_opt(TopBarField::Url, input.url.clone())
            .set_opt(TopBarField::Icon, input.icon.clone())
            .set_opt(TopBarField::IsActive, input.is_active)
            .set_opt(TopBarField::Order, input.order);

        let mut tx = self.pool.begin().await?;
        let top_bar = table::update::<TopBar>(&mut tx, id, changes).await?;
        tx.commit().await?;
        Ok(top_bar)
    }

    /// Active announcements in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<TopBar>, RepositoryError> {
        self.find_many(
            &Query::new()
                .filter(Filter::new().eq(TopBarField::IsActive, true))
                .order_by(OrderBy::asc(TopBarField::Order)),
        )
        .await
    }

    /// Assign display positions `0..n` in the order given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if any id does not exist; no
    /// position changes in that case.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn reorder(&self, ids: &[TopBarId]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for (position, id) in (0_i32..).zip(ids) {
            let mut changes = ChangeSet::new();
            changes.set(TopBarField::Order, position);
            table::update::<TopBar>(&mut tx, id, changes).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
