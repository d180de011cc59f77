//! Homepage slider repository.
//!
//! A slide is stored as one row with its generic, desktop and mobile
//! content blocks flattened into prefixed columns.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::instrument;

use catalog_core::SliderId;

use super::RepositoryError;
use super::query::{Filter, OrderBy, Query};
use super::table::{self, ChangeSet, Table};
use crate::models::{
    CreateSliderInput, SlideContent, Slider, SliderField, UpdateSliderInput, Viewport,
};

/// Internal row type for slider queries.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SliderRow {
    id: SliderId,
    title: Option<String>,
    subtitle: Option<String>,
    description: Option<String>,
    image_url: Option<String>,
    image_key: Option<String>,
    button_text: Option<String>,
    button_url: Option<String>,
    desktop_title: Option<String>,
    desktop_subtitle: Option<String>,
    desktop_description: Option<String>,
    desktop_image_url: Option<String>,
    desktop_image_key: Option<String>,
    desktop_button_text: Option<String>,
    desktop_button_url: Option<String>,
    mobile_title: Option<String>,
    mobile_subtitle: Option<String>,
    mobile_description: Option<String>,
    mobile_image_url: Option<String>,
    mobile_image_key: Option<String>,
    mobile_button_text: Option<String>,
    mobile_button_url: Option<String>,
    is_active: bool,
    sort_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SliderRow> for Slider {
    fn from(row: SliderRow) -> Self {
        Self {
            id: row.id,
            content: SlideContent {
                title: row.title,
                subtitle: row.subtitle,
                description: row.description,
                image_url: row.image_url,
                image_key: row.image_key,
                button_text: row.button_text,
                button_url: row.button_url,
            },
            desktop: SlideContent {
                title: row.desktop_title,
                subtitle: row.desktop_subtitle,
                description: row.desktop_description,
                image_url: row.desktop_image_url,
                image_key: row.desktop_image_key,
                button_text: row.desktop_button_text,
                button_url: row.desktop_button_url,
            },
            mobile: SlideContent {
                title: row.mobile_title,
                subtitle: row.mobile_subtitle,
                description: row.mobile_description,
                image_url: row.mobile_image_url,
                image_key: row.mobile_image_key,
                button_text: row.mobile_button_text,
                button_url: row.mobile_button_url,
            },
            is_active: row.is_active,
            order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Table for Slider {
    const NAME: &'static str = "sliders";
    const ENTITY: &'static str = "Slider";
    const KEY: &'static [SliderField] = &[SliderField::Id];

    type Field = SliderField;
    type Key = SliderId;
    type Row = SliderRow;
}

/// Assign every column of one content block.
fn set_block(changes: &mut ChangeSet<SliderField>, viewport: Option<Viewport>, block: &SlideContent) {
    let [title, subtitle, description, image_url, image_key, button_text, button_url] =
        SliderField::block(viewport);
    changes
        .set(title, block.title.clone())
        .set(subtitle, block.subtitle.clone())
        .set(description, block.description.clone())
        .set(image_url, block.image_url.clone())
        .set(image_key, block.image_key.clone())
        .set(button_text, block.button_text.clone())
        .set(button_url, block.button_url.clone());
}

/// Repository for homepage slides.
pub struct SliderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SliderRepository<'a> {
    /// Create a new slider repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    read_operations!(Slider, SliderField, SliderId);

    /// Create a slide.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: &CreateSliderInput) -> Result<Slider, RepositoryError> {
        let mut changes = ChangeSet::new();
        set_block(&mut changes, None, &input.content);
        set_block(&mut changes, Some(Viewport::Desktop), &input.desktop);
        set_block(&mut changes, Some(Viewport::Mobile), &input.mobile);
        changes
            .set(SliderField::IsActive, input.is_active)
            .set(SliderField::Order, input.order);

        let mut tx = self.pool.begin().await?;
        let slider = table::insert::<Slider>(&mut tx, changes).await?;
        tx.commit().await?;

        tracing::info!(slider_id = %slider.id, "slide created");
        Ok(slider)
    }

    /// Update a slide. A supplied content block replaces the stored block
    /// as a whole.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the slide does not exist.
    #[instrument(skip(self, input), fields(slider_id = %id))]
    pub async fn update(
        &self,
        id: &SliderId,
        input: &UpdateSliderInput,
    ) -> Result<Slider, RepositoryError> {
        let mut changes = ChangeSet::new();
        let blocks = [
            (None, &input.content),
            (Some(Viewport::Desktop), &input.desktop),
            (Some(Viewport::Mobile), &input.mobile),
        ];
        for (viewport, block) in blocks {
            if let Some(block) = block {
                set_block(&mut changes, viewport, block);
            }
        }
        changes
            .set_opt(SliderField::IsActive, input.is_active)
            .set_opt(SliderField::Order, input.order);

        let mut tx = self.pool.begin().await?;
        let slider = table::update::<Slider>(&mut tx, id, changes).await?;
        tx.commit().await?;
        Ok(slider)
    }

    /// Active slides in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Slider>, RepositoryError> {
        self.find_many(
            &Query::new()
                .filter(Filter::new().eq(SliderField::IsActive, true))
                .order_by(OrderBy::asc(SliderField::Order)),
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
    pub async fn reorder(&self, ids: &[SliderId]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for (position, id) in (0_i32..).zip(ids) {
            let mut changes = ChangeSet::new();
            changes.set(SliderField::Order, position);
            table::update::<Slider>(&mut tx, id, changes).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
