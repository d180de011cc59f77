//! Store statistics command.

use rust_decimal::Decimal;

use catalog_core::StockStatus;
use catalog_store::models::ProductField;
use catalog_store::{
    BrandRepository, CategoryRepository, Filter, ProductRepository, StoreConfig,
    TranslationRepository, UserRepository, connect,
};

/// Print row counts and stock figures.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or read.
pub async fn run(config: &StoreConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect(config).await?;

    let users = UserRepository::new(&pool).count(&Filter::new()).await?;
    let categories = CategoryRepository::new(&pool).count(&Filter::new()).await?;
    let brands = BrandRepository::new(&pool).count(&Filter::new()).await?;
    let locales = TranslationRepository::new(&pool).locales().await?;

    let products = ProductRepository::new(&pool);
    let summary = products
        .aggregate(
            &Filter::new(),
            &[ProductField::Price, ProductField::StockQuantity],
        )
        .await?;
    let unorderable = products
        .count(&Filter::new().is_in(
            ProductField::StockStatus,
            StockStatus::ALL.into_iter().filter(|s| !s.is_orderable()),
        ))
        .await?;

    let drifted = products
        .find_stock_status_drift(config.low_stock_threshold)
        .await?
        .len();

    let price = summary.field(ProductField::Price);
    let stock = summary.field(ProductField::StockQuantity);
    let show = |value: Option<Decimal>| value.map_or_else(|| "-".to_owned(), |v| v.to_string());

    #[allow(clippy::print_stdout)]
    {
        println!("users:           {users}");
        println!("categories:      {categories}");
        println!("brands:          {brands}");
        println!("products:        {}", summary.count);
        println!("  not orderable: {unorderable}");
        println!(
            "  status drift:  {drifted} (low stock at {} units)",
            config.low_stock_threshold
        );
        println!("  min price:     {}", show(price.and_then(|p| p.min)));
        println!("  max price:     {}", show(price.and_then(|p| p.max)));
        println!("  avg price:     {}", show(price.and_then(|p| p.avg)));
        println!("  units stocked: {}", show(stock.and_then(|s| s.sum)));
        println!("locales:         {}", locales.join(", "));
    }
    Ok(())
}
