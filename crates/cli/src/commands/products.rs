//! Product inspection commands.

use futures::TryStreamExt;
use thiserror::Error;

use catalog_core::Slug;
use catalog_store::models::ProductField;
use catalog_store::{
    CategoryRepository, Filter, OrderBy, ProductRepository, Query, StoreConfig, connect,
};

/// Errors specific to product commands.
#[derive(Debug, Error)]
pub enum ProductsError {
    /// No category has the requested slug.
    #[error("Unknown category: {0}")]
    UnknownCategory(String),
}

/// List products by name.
///
/// # Arguments
///
/// * `category` - Only list products in the category with this slug
/// * `active_only` - Skip inactive products
///
/// # Errors
///
/// Returns an error if the slug is invalid or unknown, or the database cannot
/// be read.
pub async fn list(
    config: &StoreConfig,
    category: Option<&str>,
    active_only: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect(config).await?;

    let mut filter = Filter::new();
    if let Some(slug) = category {
        let slug = Slug::parse(slug)?;
        let category = CategoryRepository::new(&pool)
            .find_by_slug(&slug)
            .await?
            .ok_or_else(|| ProductsError::UnknownCategory(slug.to_string()))?;
        filter = filter.eq(ProductField::CategoryId, &category.id);
    }
    if active_only {
        filter = filter.eq(ProductField::IsActive, true);
    }

    let query = Query::new()
        .filter(filter)
        .order_by(OrderBy::asc(ProductField::Name));
    let mut products = ProductRepository::new(&pool).stream(query);

    let mut listed = 0_usize;
    while let Some(product) = products.try_next().await? {
        listed += 1;
        let price = product.sale_price.map_or_else(
            || product.price.to_string(),
            |sale| format!("{sale} (was {})", product.price),
        );
        #[allow(clippy::print_stdout)]
        {
            println!(
                "{:<16} {:<32} {:>20} {:>5} {}",
                product.product_code.as_str(),
                product.name,
                price,
                product.stock_quantity,
                product.stock_status.as_str()
            );
        }
    }

    tracing::info!(listed, "Listed products");
    Ok(())
}
