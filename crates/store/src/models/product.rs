//! Sellable products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use catalog_core::{BrandId, CategoryId, ProductCode, ProductId, Slug, StockStatus};

use crate::db::query::define_fields;

/// A product in the catalog.
///
/// `stock_status` is curated and authoritative for display and ordering;
/// `stock_quantity` is authoritative for inventory arithmetic. The two are
/// never reconciled automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// Human-readable code, unique and fixed at creation.
    pub product_code: ProductCode,
    pub brand_id: Option<BrandId>,
    pub category_id: CategoryId,
    pub name: String,
    pub slug: Slug,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub stock_quantity: i32,
    pub stock_status: StockStatus,
    pub main_image_url: Option<String>,
    pub main_image_key: Option<String>,
    pub width: Option<Decimal>,
    pub depth: Option<Decimal>,
    pub height: Option<Decimal>,
    pub weight: Option<Decimal>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Price the customer pays: the sale price when set, else the list price.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        self.sale_price.unwrap_or(self.price)
    }

    /// Whether a sale price below the list price is set.
    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.sale_price.is_some_and(|sale| sale < self.price)
    }
}

/// Input for creating a product.
///
/// Branded products receive a code minted from the brand's counter and must
/// leave `product_code` unset; unbranded products must supply one.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductInput {
    /// Generated when absent.
    #[serde(default)]
    pub id: Option<ProductId>,
    #[serde(default)]
    pub product_code: Option<ProductCode>,
    #[serde(default)]
    pub brand_id: Option<BrandId>,
    pub category_id: CategoryId,
    pub name: String,
    pub slug: Slug,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default)]
    pub stock_status: StockStatus,
    #[serde(default)]
    pub main_image_url: Option<String>,
    #[serde(default)]
    pub main_image_key: Option<String>,
    #[serde(default)]
    pub width: Option<Decimal>,
    #[serde(default)]
    pub depth: Option<Decimal>,
    #[serde(default)]
    pub height: Option<Decimal>,
    #[serde(default)]
    pub weight: Option<Decimal>,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    pub is_active: bool,
}

impl CreateProductInput {
    /// Active, in-stock product with no brand, code or optional details.
    #[must_use]
    pub fn new(category_id: CategoryId, name: impl Into<String>, slug: Slug, price: Decimal) -> Self {
        Self {
            id: None,
            product_code: None,
            brand_id: None,
            category_id,
            name: name.into(),
            slug,
            short_description: None,
            description: None,
            price,
            sale_price: None,
            stock_quantity: 0,
            stock_status: StockStatus::default(),
            main_image_url: None,
            main_image_key: None,
            width: None,
            depth: None,
            height: None,
            weight: None,
            meta_title: None,
            meta_description: None,
            is_active: true,
        }
    }

    /// Mint the product code from `brand`.
    #[must_use]
    pub fn with_brand(mut self, brand: BrandId) -> Self {
        self.brand_id = Some(brand);
        self
    }

    /// Use an explicit code (unbranded products only).
    #[must_use]
    pub fn with_code(mut self, code: ProductCode) -> Self {
        self.product_code = Some(code);
        self
    }
}

/// Input for updating a product. The product code cannot change, and moving
/// a product to another brand keeps its existing code.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProductInput {
    pub brand_id: Option<Option<BrandId>>,
    pub category_id: Option<CategoryId>,
    pub name: Option<String>,
    pub slug: Option<Slug>,
    pub short_description: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub sale_price: Option<Option<Decimal>>,
    pub stock_quantity: Option<i32>,
    pub stock_status: Option<StockStatus>,
    pub main_image_url: Option<Option<String>>,
    pub main_image_key: Option<Option<String>>,
    pub width: Option<Option<Decimal>>,
    pub depth: Option<Option<Decimal>>,
    pub height: Option<Option<Decimal>>,
    pub weight: Option<Option<Decimal>>,
    pub meta_title: Option<Option<String>>,
    pub meta_description: Option<Option<String>>,
    pub is_active: Option<bool>,
}

define_fields! {
    /// Filterable columns of [`Product`].
    pub enum ProductField {
        Id => ("id", Text),
        ProductCode => ("product_code", Text),
        BrandId => ("brand_id", Text),
        CategoryId => ("category_id", Text),
        Name => ("name", Text),
        Slug => ("slug", Text),
        ShortDescription => ("short_description", Text),
        Description => ("description", Text),
        Price => ("price", Decimal),
        SalePrice => ("sale_price", Decimal),
        StockQuantity => ("stock_quantity", Int),
        StockStatus => ("stock_status", Text),
        MainImageUrl => ("main_image_url", Text),
        MainImageKey => ("main_image_key", Text),
        Width => ("width", Decimal),
        Depth => ("depth", Decimal),
        Height => ("height", Decimal),
        Weight => ("weight", Decimal),
        MetaTitle => ("meta_title", Text),
        MetaDescription => ("meta_description", Text),
        IsActive => ("is_active", Bool),
        CreatedAt => ("created_at", Timestamp),
        UpdatedAt => ("updated_at", Timestamp),
    }
}
