//! Product repository.
//!
//! # Product codes
//!
//! A branded product's code is minted from its brand: the brand's
//! `next_product_num` is advanced by a single conditional `UPDATE` in the
//! same transaction that inserts the product, so two concurrent creations
//! under one brand can never observe the same counter value. Unbranded
//! products carry a caller-supplied code. Codes never change afterwards,
//! even if the product moves to another brand.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::instrument;

use catalog_core::{
    BrandCode, BrandId, CategoryId, ProductCode, ProductId, Slug, StockStatus, from_fixed,
    from_fixed_opt,
};

use super::RepositoryError;
use super::product_images::new_image;
use super::query::{Filter, OrderBy, Query};
use super::table::{self, ChangeSet, Reference, Table};
use super::validate;
use crate::models::{
    CreateProductImageInput, CreateProductInput, Product, ProductField, ProductImage,
    UpdateProductInput,
};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for product queries. Decimal columns are fixed-point.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
    id: ProductId,
    product_code: ProductCode,
    brand_id: Option<BrandId>,
    category_id: CategoryId,
    name: String,
    slug: Slug,
    short_description: Option<String>,
    description: Option<String>,
    price: i64,
    sale_price: Option<i64>,
    stock_quantity: i32,
    stock_status: StockStatus,
    main_image_url: Option<String>,
    main_image_key: Option<String>,
    width: Option<i64>,
    depth: Option<i64>,
    height: Option<i64>,
    weight: Option<i64>,
    meta_title: Option<String>,
    meta_description: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            product_code: row.product_code,
            brand_id: row.brand_id,
            category_id: row.category_id,
            name: row.name,
            slug: row.slug,
            short_description: row.short_description,
            description: row.description,
            price: from_fixed(row.price),
            sale_price: from_fixed_opt(row.sale_price),
            stock_quantity: row.stock_quantity,
            stock_status: row.stock_status,
            main_image_url: row.main_image_url,
            main_image_key: row.main_image_key,
            width: from_fixed_opt(row.width),
            depth: from_fixed_opt(row.depth),
            height: from_fixed_opt(row.height),
            weight: from_fixed_opt(row.weight),
            meta_title: row.meta_title,
            meta_description: row.meta_description,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Table for Product {
    const NAME: &'static str = "products";
    const ENTITY: &'static str = "Product";
    const KEY: &'static [ProductField] = &[ProductField::Id];
    const REFERENCES: &'static [Reference] = &[
        Reference {
            column: "brand_id",
            table: "product_brands",
        },
        Reference {
            column: "category_id",
            table: "categories",
        },
    ];

    type Field = ProductField;
    type Key = ProductId;
    type Row = ProductRow;
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Checks shared by create and update.
fn check_amounts(
    price: Option<Decimal>,
    sale_price: Option<Decimal>,
    stock_quantity: Option<i32>,
    dimensions: [(&'static str, Option<Decimal>); 4],
) -> Result<(), RepositoryError> {
    validate::non_negative_decimal(Product::ENTITY, "price", price)?;
    validate::non_negative_decimal(Product::ENTITY, "sale_price", sale_price)?;
    if let Some(quantity) = stock_quantity {
        validate::non_negative(Product::ENTITY, "stock_quantity", i64::from(quantity))?;
    }
    for (field, value) in dimensions {
        validate::non_negative_decimal(Product::ENTITY, field, value)?;
    }
    Ok(())
}

/// Advance the brand's counter and mint the code for the value it held.
async fn allocate_code(
    conn: &mut SqliteConnection,
    brand_id: &BrandId,
) -> Result<ProductCode, RepositoryError> {
    let allocated = sqlx::query_as::<_, (BrandCode, i64)>(
        r#"
        UPDATE "product_brands"
        SET "next_product_num" = "next_product_num" + 1, "updated_at" = ?
        WHERE "id" = ?
        RETURNING "brand_code", "next_product_num" - 1
        "#,
    )
    .bind(Utc::now())
    .bind(brand_id)
    .fetch_optional(conn)
    .await?;

    let Some((brand_code, sequence)) = allocated else {
        return Err(RepositoryError::ForeignKeyViolation {
            entity: Product::ENTITY,
            field: "brand_id".into(),
            constraint: "products_brand_id_fkey".to_owned(),
        });
    };

    let code = ProductCode::mint(&brand_code, sequence).map_err(|e| {
        RepositoryError::DataCorruption(format!("brand {brand_id} counter: {e}"))
    })?;
    tracing::debug!(%brand_id, product_code = %code, "product code allocated");
    Ok(code)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    read_operations!(Product, ProductField, ProductId);

    /// Create a product.
    ///
    /// A branded product gets the next code of its brand; an unbranded one
    /// must supply `product_code`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Validation` if a code is supplied for a
    /// branded product or missing for an unbranded one,
    /// `RepositoryError::ForeignKeyViolation` if the brand or category does
    /// not exist, or `RepositoryError::ConstraintViolation` if the slug or
    /// code is taken.
    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create(&self, input: &CreateProductInput) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let product = insert_product(&mut tx, input).await?;
        tx.commit().await?;

        tracing::info!(
            product_id = %product.id,
            product_code = %product.product_code,
            "product created"
        );
        Ok(product)
    }

    /// Create a product together with its gallery images. Either everything
    /// is stored or nothing is.
    ///
    /// # Errors
    ///
    /// See [`ProductRepository::create`]; an invalid image fails the whole
    /// operation.
    #[instrument(skip(self, input, images), fields(slug = %input.slug, images = images.len()))]
    pub async fn create_with_images(
        &self,
        input: &CreateProductInput,
        images: &[CreateProductImageInput],
    ) -> Result<(Product, Vec<ProductImage>), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let product = insert_product(&mut tx, input).await?;
        let mut stored = Vec::with_capacity(images.len());
        for image in images {
            let changes = new_image(&product.id, image)?;
            stored.push(table::insert::<ProductImage>(&mut tx, changes).await?);
        }
        tx.commit().await?;

        tracing::info!(
            product_id = %product.id,
            product_code = %product.product_code,
            "product created with images"
        );
        Ok((product, stored))
    }

    /// Update a product. The product code is fixed at creation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist, plus
    /// the validation and constraint errors of [`ProductRepository::create`].
    #[instrument(skip(self, input), fields(product_id = %id))]
    pub async fn update(
        &self,
        id: &ProductId,
        input: &UpdateProductInput,
    ) -> Result<Product, RepositoryError> {
        validate::non_empty_opt(Product::ENTITY, "name", input.name.as_deref())?;
        check_amounts(
            input.price,
            input.sale_price.flatten(),
            input.stock_quantity,
            [
                ("width", input.width.flatten()),
                ("depth", input.depth.flatten()),
                ("height", input.height.flatten()),
                ("weight", input.weight.flatten()),
            ],
        )?;

        let mut changes = ChangeSet::new();
        changes
            .set_opt(ProductField::BrandId, input.brand_id.clone())
            .set_opt(ProductField::CategoryId, input.category_id.clone())
            .set_opt(ProductField::Name, input.name.clone())
            .set_opt(ProductField::Slug, input.slug.clone())
            .set_opt(ProductField::ShortDescription, input.short_description.clone())
            .set_opt(ProductField::Description, input.description.clone())
            .set_opt(ProductField::Price, input.price)
            .set_opt(ProductField::SalePrice, input.sale_price)
            .set_opt(ProductField::StockQuantity, input.stock_quantity)
            .set_opt(ProductField::StockStatus, input.stock_status)
            .set_opt(ProductField::MainImageUrl, input.main_image_url.clone())
            .set_opt(ProductField::MainImageKey, input.main_image_key.clone())
            .set_opt(ProductField::Width, input.width)
            .set_opt(ProductField::Depth, input.depth)
            .set_opt(ProductField::Height, input.height)
            .set_opt(ProductField::Weight, input.weight)
            .set_opt(ProductField::MetaTitle, input.meta_title.clone())
            .set_opt(ProductField::MetaDescription, input.meta_description.clone())
            .set_opt(ProductField::IsActive, input.is_active);

        let mut tx = self.pool.begin().await?;
        let product = table::update::<Product>(&mut tx, id, changes).await?;
        tx.commit().await?;
        Ok(product)
    }

    /// Get a product by its slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_slug(&self, slug: &Slug) -> Result<Option<Product>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        table::find_first::<Product>(&mut conn, Filter::new().eq(ProductField::Slug, slug)).await
    }

    /// Get a product by its code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_code(
        &self,
        code: &ProductCode,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        table::find_first::<Product>(&mut conn, Filter::new().eq(ProductField::ProductCode, code))
            .await
    }

    /// Add `delta` (possibly negative) to the stock quantity in one atomic
    /// step. The stock status is left alone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist, or
    /// `RepositoryError::Validation` if the quantity would drop below zero.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn adjust_stock(&self, id: &ProductId, delta: i32) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            UPDATE "products"
            SET "stock_quantity" = "stock_quantity" + ?, "updated_at" = ?
            WHERE "id" = ? AND "stock_quantity" + ? >= 0
            RETURNING *
            "#,
        )
        .bind(delta)
        .bind(Utc::now())
        .bind(id)
        .bind(delta)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            if table::fetch_by_key::<Product>(&mut tx, id).await?.is_none() {
                return Err(RepositoryError::not_found(Product::ENTITY, id));
            }
            return Err(RepositoryError::validation(
                Product::ENTITY,
                "stock_quantity",
                format!("adjusting by {delta} would make the quantity negative"),
            ));
        };
        tx.commit().await?;

        let product = Product::from(row);
        tracing::info!(stock_quantity = product.stock_quantity, "stock adjusted");
        Ok(product)
    }

    /// Products whose stored status disagrees with the status suggested by
    /// their quantity, ordered by id.
    ///
    /// `PreOrder` products are curated and never reported. Nothing is
    /// rewritten; callers decide whether to call [`Self::set_stock_status`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_stock_status_drift(
        &self,
        low_stock_threshold: i32,
    ) -> Result<Vec<Product>, RepositoryError> {
        let query = Query::new()
            .filter(Filter::new().ne(ProductField::StockStatus, StockStatus::PreOrder))
            .order_by(OrderBy::asc(ProductField::Id));
        let mut conn = self.pool.acquire().await?;
        let products = table::find_many::<Product>(&mut conn, &query).await?;
        Ok(products
            .into_iter()
            .filter(|p| {
                p.stock_status != StockStatus::suggest(p.stock_quantity, low_stock_threshold)
            })
            .collect())
    }

    /// Set the curated stock status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn set_stock_status(
        &self,
        id: &ProductId,
        status: StockStatus,
    ) -> Result<Product, RepositoryError> {
        let mut changes = ChangeSet::new();
        changes.set(ProductField::StockStatus, status);

        let mut tx = self.pool.begin().await?;
        let product = table::update::<Product>(&mut tx, id, changes).await?;
        tx.commit().await?;
        Ok(product)
    }
}

/// Validate, allocate a code if branded, and insert.
async fn insert_product(
    conn: &mut SqliteConnection,
    input: &CreateProductInput,
) -> Result<Product, RepositoryError> {
    validate::non_empty(Product::ENTITY, "name", &input.name)?;
    check_amounts(
        Some(input.price),
        input.sale_price,
        Some(input.stock_quantity),
        [
            ("width", input.width),
            ("depth", input.depth),
            ("height", input.height),
            ("weight", input.weight),
        ],
    )?;

    let product_code = match (&input.brand_id, &input.product_code) {
        (Some(brand_id), None) => allocate_code(conn, brand_id).await?,
        (None, Some(code)) => code.clone(),
        (Some(_), Some(_)) => {
            return Err(RepositoryError::validation(
                Product::ENTITY,
                "product_code",
                "branded products receive their code from the brand",
            ));
        }
        (None, None) => {
            return Err(RepositoryError::validation(
                Product::ENTITY,
                "product_code",
                "required for unbranded products",
            ));
        }
    };

    let id = input.id.clone().unwrap_or_else(ProductId::generate);
    let mut changes = ChangeSet::new();
    changes
        .set(ProductField::Id, id)
        .set(ProductField::ProductCode, product_code)
        .set(ProductField::BrandId, input.brand_id.clone())
        .set(ProductField::CategoryId, &input.category_id)
        .set(ProductField::Name, input.name.as_str())
        .set(ProductField::Slug, &input.slug)
        .set(ProductField::ShortDescription, input.short_description.clone())
        .set(ProductField::Description, input.description.clone())
        .set(ProductField::Price, input.price)
        .set(ProductField::SalePrice, input.sale_price)
        .set(ProductField::StockQuantity, input.stock_quantity)
        .set(ProductField::StockStatus, input.stock_status)
        .set(ProductField::MainImageUrl, input.main_image_url.clone())
        .set(ProductField::MainImageKey, input.main_image_key.clone())
        .set(ProductField::Width, input.width)
        .set(ProductField::Depth, input.depth)
        .set(ProductField::Height, input.height)
        .set(ProductField::Weight, input.weight)
        .set(ProductField::MetaTitle, input.meta_title.clone())
        .set(ProductField::MetaDescription, input.meta_description.clone())
        .set(ProductField::IsActive, input.is_active);

    table::insert::<Product>(conn, changes).await
}
