//! Product brands and their product-code counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catalog_core::{BrandCode, BrandId, CodeError, ProductCode, Slug};

use crate::db::query::define_fields;

/// A manufacturer or brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductBrand {
    pub id: BrandId,
    /// Prefix of every product code minted under this brand.
    pub brand_code: BrandCode,
    pub name: String,
    pub slug: Slug,
    /// Free-text delivery estimate (e.g. `"3-5 business days"`).
    pub delivery_time: Option<String>,
    pub logo_url: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    /// Sequence number the next product under this brand receives.
    /// Starts at 1 and only increases.
    pub next_product_num: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductBrand {
    /// The code the next product created under this brand will receive,
    /// absent concurrent creations.
    ///
    /// # Errors
    ///
    /// Returns [`CodeError::InvalidSequence`] if the stored counter is corrupt.
    pub fn next_code(&self) -> Result<ProductCode, CodeError> {
        ProductCode::mint(&self.brand_code, self.next_product_num)
    }
}

/// Input for creating a brand.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBrandInput {
    /// Generated when absent.
    #[serde(default)]
    pub id: Option<BrandId>,
    pub brand_code: BrandCode,
    pub name: String,
    pub slug: Slug,
    #[serde(default)]
    pub delivery_time: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub is_active: bool,
    /// Starting counter, 1 when absent. Used when importing a brand whose
    /// codes were already issued elsewhere.
    #[serde(default)]
    pub next_product_num: Option<i64>,
}

impl CreateBrandInput {
    /// Active brand with a fresh counter.
    #[must_use]
    pub fn new(brand_code: BrandCode, name: impl Into<String>, slug: Slug) -> Self {
        Self {
            id: None,
            brand_code,
            name: name.into(),
            slug,
            delivery_time: None,
            logo_url: None,
            description: None,
            is_active: true,
            next_product_num: None,
        }
    }
}

/// Input for updating a brand. The product counter is not editable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBrandInput {
    pub brand_code: Option<BrandCode>,
    pub name: Option<String>,
    pub slug: Option<Slug>,
    pub delivery_time: Option<Option<String>>,
    pub logo_url: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
}

define_fields! {
    /// Filterable columns of [`ProductBrand`].
    pub enum BrandField {
        Id => ("id", Text),
        BrandCode => ("brand_code", Text),
        Name => ("name", Text),
        Slug => ("slug", Text),
        DeliveryTime => ("delivery_time", Text),
        LogoUrl => ("logo_url", Text),
        Description => ("description", Text),
        IsActive => ("is_active", Bool),
        NextProductNum => ("next_product_num", Int),
        CreatedAt => ("created_at", Timestamp),
        UpdatedAt => ("updated_at", Timestamp),
    }
}
