//! Gallery images owned by a product.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catalog_core::{ProductId, ProductImageId};

use crate::db::query::define_fields;

/// A product gallery image. Deleted with its product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: ProductImageId,
    pub product_id: ProductId,
    pub image_url: String,
    /// Storage object key, for deleting the file.
    pub image_key: Option<String>,
    pub alt_text: Option<String>,
    /// Gallery position, ascending.
    pub order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for adding an image to a product.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductImageInput {
    /// Generated when absent.
    #[serde(default)]
    pub id: Option<ProductImageId>,
    pub image_url: String,
    #[serde(default)]
    pub image_key: Option<String>,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub order: i32,
    pub is_active: bool,
}

impl CreateProductImageInput {
    /// Active image at position `order`.
    #[must_use]
    pub fn new(image_url: impl Into<String>, order: i32) -> Self {
        Self {
            id: None,
            image_url: image_url.into(),
            image_key: None,
            alt_text: None,
            order,
            is_active: true,
        }
    }
}

/// Input for updating an image.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProductImageInput {
    pub image_url: Option<String>,
    pub image_key: Option<Option<String>>,
    pub alt_text: Option<Option<String>>,
    pub order: Option<i32>,
    pub is_active: Option<bool>,
}

define_fields! {
    /// Filterable columns of [`ProductImage`].
    pub enum ProductImageField {
        Id => ("id", Text),
        ProductId => ("product_id", Text),
        ImageUrl => ("image_url", Text),
        ImageKey => ("image_key", Text),
        AltText => ("alt_text", Text),
        Order => ("sort_order", Int),
        IsActive => ("is_active", Bool),
        CreatedAt => ("created_at", Timestamp),
        UpdatedAt => ("updated_at", Timestamp),
    }
}
