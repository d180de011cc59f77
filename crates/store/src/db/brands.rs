//! Product brand repository.
//!
//! Each brand owns a product-code counter, `next_product_num`, which only
//! [`ProductRepository`](super::ProductRepository) advances.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::instrument;

use catalog_core::{BrandCode, BrandId, ProductCode, Slug};

use super::RepositoryError;
use super::query::Filter;
use super::table::{self, ChangeSet, Table};
use super::validate;
use crate::models::{BrandField, CreateBrandInput, ProductBrand, UpdateBrandInput};

/// Internal row type for brand queries.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BrandRow {
    id: BrandId,
    brand_code: BrandCode,
    name: String,
    slug: Slug,
    delivery_time: Option<String>,
    logo_url: Option<String>,
    description: Option<String>,
    is_active: bool,
    next_product_num: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BrandRow> for ProductBrand {
    fn from(row: BrandRow) -> Self {
        Self {
            id: row.id,
            brand_code: row.brand_code,
            name: row.name,
            slug: row.slug,
            delivery_time: row.delivery_time,
            logo_url: row.logo_url,
            description: row.description,
            is_active: row.is_active,
            next_product_num: row.next_product_num,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Table for ProductBrand {
    const NAME: &'static str = "product_brands";
    const ENTITY: &'static str = "ProductBrand";
    const KEY: &'static [BrandField] = &[BrandField::Id];

    type Field = BrandField;
    type Key = BrandId;
    type Row = BrandRow;
}

/// Repository for brand database operations.
pub struct BrandRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> BrandRepository<'a> {
    /// Create a new brand repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    read_operations!(ProductBrand, BrandField, BrandId);

    /// Create a brand. The counter starts at 1 unless the input says otherwise.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ConstraintViolation` if the brand code or
    /// slug is taken, or `RepositoryError::Validation` if the starting counter
    /// is below 1.
    #[instrument(skip(self, input), fields(brand_code = %input.brand_code))]
    pub async fn create(&self, input: &CreateBrandInput) -> Result<ProductBrand, RepositoryError> {
        validate::non_empty(ProductBrand::ENTITY, "name", &input.name)?;
        let next_product_num = input.next_product_num.unwrap_or(1);
        if next_product_num < 1 {
            return Err(RepositoryError::validation(
                ProductBrand::ENTITY,
                "next_product_num",
                format!("must be at least 1 (got {next_product_num})"),
            ));
        }

        let id = input.id.clone().unwrap_or_else(BrandId::generate);
        let mut changes = ChangeSet::new();
        changes
            .set(BrandField::Id, id)
            .set(BrandField::BrandCode, &input.brand_code)
            .set(BrandField::Name, input.name.as_str())
            .set(BrandField::Slug, &input.slug)
            .set(BrandField::DeliveryTime, input.delivery_time.clone())
            .set(BrandField::LogoUrl, input.logo_url.clone())
            .set(BrandField::Description, input.description.clone())
            .set(BrandField::IsActive, input.is_active)
            .set(BrandField::NextProductNum, next_product_num);

        let mut tx = self.pool.begin().await?;
        let brand = table::insert::<ProductBrand>(&mut tx, changes).await?;
        tx.commit().await?;

        tracing::info!(brand_id = %brand.id, "brand created");
        Ok(brand)
    }

    /// Update a brand. The product-code counter is not writable here.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the brand does not exist, or
    /// `RepositoryError::ConstraintViolation` if the new code or slug is taken.
    #[instrument(skip(self, input), fields(brand_id = %id))]
    pub async fn update(
        &self,
        id: &BrandId,
        input: &UpdateBrandInput,
    ) -> Result<ProductBrand, RepositoryError> {
        validate::non_empty_opt(ProductBrand::ENTITY, "name", input.name.as_deref())?;

        let mut changes = ChangeSet::new();
        changes
            .set_opt(BrandField::BrandCode, input.brand_code.clone())
            .set_opt(BrandField::Name, input.name.clone())
            .set_opt(BrandField::Slug, input.slug.clone())
            .set_opt(BrandField::DeliveryTime, input.delivery_time.clone())
            .set_opt(BrandField::LogoUrl, input.logo_url.clone())
            .set_opt(BrandField::Description, input.description.clone())
            .set_opt(BrandField::IsActive, input.is_active);

        let mut tx = self.pool.begin().await?;
        let brand = table::update::<ProductBrand>(&mut tx, id, changes).await?;
        tx.commit().await?;
        Ok(brand)
    }

    /// Get a brand by its code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_code(
        &self,
        code: &BrandCode,
    ) -> Result<Option<ProductBrand>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        table::find_first::<ProductBrand>(&mut conn, Filter::new().eq(BrandField::BrandCode, code))
            .await
    }

    /// Get a brand by its slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_slug(&self, slug: &Slug) -> Result<Option<ProductBrand>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        table::find_first::<ProductBrand>(&mut conn, Filter::new().eq(BrandField::Slug, slug)).await
    }

    /// The code the next product created under this brand would receive.
    ///
    /// Advisory only: a concurrent creation may take it first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the brand does not exist, or
    /// `RepositoryError::Validation` if the stored counter is not a valid
    /// sequence number.
    pub async fn peek_next_code(&self, id: &BrandId) -> Result<ProductCode, RepositoryError> {
        let brand = self.get(id).await?;
        brand.next_code().map_err(|e| {
            RepositoryError::validation(ProductBrand::ENTITY, "next_product_num", e.to_string())
        })
    }
}
