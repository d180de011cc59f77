//! Product image repository.
//!
//! Images belong to one product and are removed with it.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::instrument;

use catalog_core::{ProductId, ProductImageId};

use super::RepositoryError;
use super::query::{Filter, OrderBy, Query};
use super::table::{self, ChangeSet, Reference, Table};
use super::validate;
use crate::models::{
    CreateProductImageInput, ProductImage, ProductImageField, UpdateProductImageInput,
};

/// Internal row type for product image queries.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductImageRow {
    id: ProductImageId,
    product_id: ProductId,
    image_url: String,
    image_key: Option<String>,
    alt_text: Option<String>,
    sort_order: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductImageRow> for ProductImage {
    fn from(row: ProductImageRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            image_url: row.image_url,
            image_key: row.image_key,
            alt_text: row.alt_text,
            order: row.sort_order,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Table for ProductImage {
    const NAME: &'static str = "product_images";
    const ENTITY: &'static str = "ProductImage";
    const KEY: &'static [ProductImageField] = &[ProductImageField::Id];
    const REFERENCES: &'static [Reference] = &[Reference {
        column: "product_id",
        table: "products",
    }];

    type Field = ProductImageField;
    type Key = ProductImageId;
    type Row = ProductImageRow;
}

/// Column assignments for a new image of `product_id`.
pub(crate) fn new_image(
    product_id: &ProductId,
    input: &CreateProductImageInput,
) -> Result<ChangeSet<ProductImageField>, RepositoryError> {
    validate::non_empty(ProductImage::ENTITY, "image_url", &input.image_url)?;

    let id = input.id.clone().unwrap_or_else(ProductImageId::generate);
    let mut changes = ChangeSet::new();
    changes
        .set(ProductImageField::Id, id)
        .set(ProductImageField::ProductId, product_id)
        .set(ProductImageField::ImageUrl, input.image_url.as_str())
        .set(ProductImageField::ImageKey, input.image_key.clone())
        .set(ProductImageField::AltText, input.alt_text.clone())
        .set(ProductImageField::Order, input.order)
        .set(ProductImageField::IsActive, input.is_active);
    Ok(changes)
}

/// Repository for product image database operations.
pub struct ProductImageRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProductImageRepository<'a> {
    /// Create a new product image repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    read_operations!(ProductImage, ProductImageField, ProductImageId);

    /// Add an image to a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ForeignKeyViolation` if the product does not
    /// exist.
    #[instrument(skip(self, input), fields(product_id = %product_id))]
    pub async fn create(
        &self,
        product_id: &ProductId,
        input: &CreateProductImageInput,
    ) -> Result<ProductImage, RepositoryError> {
        let changes = new_image(product_id, input)?;

        let mut tx = self.pool.begin().await?;
        let image = table::insert::<ProductImage>(&mut tx, changes).await?;
        tx.commit().await?;

        tracing::debug!(image_id = %image.id, "product image added");
        Ok(image)
    }

    /// Update an image.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the image does not exist.
    #[instrument(skip(self, input), fields(image_id = %id))]
    pub async fn update(
        &self,
        id: &ProductImageId,
        input: &UpdateProductImageInput,
    ) -> Result<ProductImage, RepositoryError> {
        validate::non_empty_opt(ProductImage::ENTITY, "image_url", input.image_url.as_deref())?;

        let mut changes = ChangeSet::new();
        changes
            .set_opt(ProductImageField::ImageUrl, input.image_url.clone())
            .set_opt(ProductImageField::ImageKey, input.image_key.clone())
            .set_opt(ProductImageField::AltText, input.alt_text.clone())
            .set_opt(ProductImageField::Order, input.order)
            .set_opt(ProductImageField::IsActive, input.is_active);

        let mut tx = self.pool.begin().await?;
        let image = table::update::<ProductImage>(&mut tx, id, changes).await?;
        tx.commit().await?;
        Ok(image)
    }

    /// A product's images in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<ProductImage>, RepositoryError> {
        self.find_many(
            &Query::new()
                .filter(Filter::new().eq(ProductImageField::ProductId, product_id))
                .order_by(OrderBy::asc(ProductImageField::Order)),
        )
        .await
    }

    /// Assign display positions `0..n` to a product's images in the order
    /// given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if an id does not name an image of
    /// this product; no position changes in that case.
    #[instrument(skip(self, ids), fields(product_id = %product_id, count = ids.len()))]
    pub async fn reorder(
        &self,
        product_id: &ProductId,
        ids: &[ProductImageId],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for (position, id) in (0_i32..).zip(ids) {
            let updated = sqlx::query(
                r#"
                UPDATE "product_images" SET "sort_order" = ?, "updated_at" = ?
                WHERE "id" = ? AND "product_id" = ?
                "#,
            )
            .bind(position)
            .bind(Utc::now())
            .bind(id)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
            if updated.rows_affected() == 0 {
                return Err(RepositoryError::not_found(ProductImage::ENTITY, id));
            }
        }
        tx.commit().await?;
        Ok(())
    }
}
