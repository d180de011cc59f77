//! Seed the database with a small sample catalog.
//!
//! Every record is looked up by its natural key before it is created, so the
//! command can be run repeatedly without duplicating anything.

use rust_decimal::Decimal;
use sqlx::SqlitePool;
use tracing::info;

use catalog_core::{BrandCode, CategoryId, ProductCode, Slug, StockStatus};
use catalog_store::models::{
    Category, CreateBrandInput, CreateCategoryInput, CreateProductImageInput, CreateProductInput,
    CreateTopBarInput, CreateTranslationInput, ProductBrand,
};
use catalog_store::{
    BrandRepository, CategoryRepository, Filter, ProductRepository, RepositoryError,
    SettingsRepository, StoreConfig, TopBarRepository, TranslationRepository, connect,
};

/// Load the sample catalog.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or a write fails.
pub async fn run(config: &StoreConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect(config).await?;
    seed(&pool).await?;
    info!("Seeding complete");
    Ok(())
}

async fn seed(pool: &SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
    let categories = CategoryRepository::new(pool);
    let furniture = ensure_category(&categories, "Furniture", "furniture", None).await?;
    let chairs = ensure_category(&categories, "Chairs", "chairs", Some(&furniture.id)).await?;
    let tables = ensure_category(&categories, "Tables", "tables", Some(&furniture.id)).await?;
    let lighting = ensure_category(&categories, "Lighting", "lighting", None).await?;

    let acme = ensure_brand(pool).await?;

    let products = ProductRepository::new(pool);
    let chair_slug = Slug::parse("oak-dining-chair")?;
    if products.find_by_slug(&chair_slug).await?.is_none() {
        let mut chair = CreateProductInput::new(
            chairs.id.clone(),
            "Oak Dining Chair",
            chair_slug,
            Decimal::new(12_900, 2),
        )
        .with_brand(acme.id.clone());
        chair.stock_quantity = 24;
        chair.width = Some(Decimal::new(45, 0));
        chair.depth = Some(Decimal::new(52, 0));
        chair.height = Some(Decimal::new(88, 0));
        chair.weight = Some(Decimal::new(65, 1));

        let images = [
            CreateProductImageInput::new("https://cdn.example.com/oak-chair-front.jpg", 0),
            CreateProductImageInput::new("https://cdn.example.com/oak-chair-side.jpg", 1),
        ];
        let (product, images) = products.create_with_images(&chair, &images).await?;
        info!(code = %product.product_code, images = images.len(), "Seeded product");
    }

    let table_slug = Slug::parse("walnut-table")?;
    if products.find_by_slug(&table_slug).await?.is_none() {
        let mut table = CreateProductInput::new(
            tables.id.clone(),
            "Walnut Table",
            table_slug,
            Decimal::new(89_900, 2),
        )
        .with_brand(acme.id.clone());
        table.sale_price = Some(Decimal::new(79_900, 2));
        table.stock_quantity = 3;
        table.stock_status = StockStatus::LowStock;
        let product = products.create(&table).await?;
        info!(code = %product.product_code, "Seeded product");
    }

    let lamp_slug = Slug::parse("brass-floor-lamp")?;
    if products.find_by_slug(&lamp_slug).await?.is_none() {
        let mut lamp = CreateProductInput::new(
            lighting.id.clone(),
            "Brass Floor Lamp",
            lamp_slug,
            Decimal::new(24_950, 2),
        )
        .with_code(ProductCode::parse("LAMP-001")?);
        lamp.stock_status = StockStatus::PreOrder;
        let product = products.create(&lamp).await?;
        info!(code = %product.product_code, "Seeded product");
    }

    seed_content(pool).await?;
    Ok(())
}

async fn seed_content(pool: &SqlitePool) -> Result<(), RepositoryError> {
    SettingsRepository::new(pool)
        .set("site_banner", "Spring collection now in stock")
        .await?;

    let translations = TranslationRepository::new(pool);
    for (locale, value) in [("en", "Welcome"), ("de", "Willkommen")] {
        translations
            .upsert(&CreateTranslationInput::new(locale, "common", "welcome", value))
            .await?;
    }

    let top_bars = TopBarRepository::new(pool);
    if top_bars.count(&Filter::new()).await? == 0 {
        top_bars
            .create(&CreateTopBarInput {
                title: "Free shipping on orders over 500".to_owned(),
                url: "/shipping".to_owned(),
                icon: Some("truck".to_owned()),
                is_active: true,
                order: 0,
            })
            .await?;
    }
    Ok(())
}

async fn ensure_category(
    repo: &CategoryRepository<'_>,
    name: &str,
    slug: &str,
    parent: Option<&CategoryId>,
) -> Result<Category, Box<dyn std::error::Error>> {
    let slug = Slug::parse(slug)?;
    if let Some(existing) = repo.find_by_slug(&slug).await? {
        return Ok(existing);
    }

    let mut input = CreateCategoryInput::new(name, slug);
    if let Some(parent) = parent {
        input = input.with_parent(parent.clone());
    }
    let category = repo.create(&input).await?;
    info!(slug = %category.slug, "Seeded category");
    Ok(category)
}

async fn ensure_brand(pool: &SqlitePool) -> Result<ProductBrand, Box<dyn std::error::Error>> {
    let brands = BrandRepository::new(pool);
    let code = BrandCode::parse("ACME")?;
    if let Some(existing) = brands.find_by_code(&code).await? {
        return Ok(existing);
    }

    let mut input = CreateBrandInput::new(code, "Acme Furniture", Slug::parse("acme")?);
    input.delivery_time = Some("2-3 weeks".to_owned());
    let brand = brands.create(&input).await?;
    info!(code = %brand.brand_code, "Seeded brand");
    Ok(brand)
}
