//! Integration tests for the catalog store.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p catalog-integration-tests
//! ```
//!
//! Each test opens its own migrated in-memory database, so tests need no
//! external services and can run in parallel. Concurrency tests use a
//! temporary database file instead, since an in-memory database is private
//! to one connection.
//!
//! # Test Categories
//!
//! - `identity` - Users, accounts, sessions and verification tokens
//! - `content` - Translations, sliders, announcement bars and settings
//! - `catalog` - Categories, brands, products and images
//! - `queries` - Filtering, ordering, pagination and aggregates
//! - `concurrency` - Product-code allocation races and timeouts

#![allow(clippy::missing_panics_doc)]

use std::time::Duration;

use rust_decimal::Decimal;
use sqlx::SqlitePool;
use tempfile::TempDir;

use catalog_core::{BrandCode, CategoryId, Email, Slug};
use catalog_store::models::{
    Category, CreateBrandInput, CreateCategoryInput, CreateProductInput, CreateUserInput,
    ProductBrand, User,
};
use catalog_store::{
    BrandRepository, CategoryRepository, StoreConfig, UserRepository, connect, connect_in_memory,
};

/// Fresh migrated in-memory store.
pub async fn store() -> SqlitePool {
    connect_in_memory()
        .await
        .expect("Failed to open in-memory store")
}

/// Fresh migrated store in a file under `dir`, with room for concurrent
/// writers.
pub async fn file_store(dir: &TempDir) -> SqlitePool {
    let path = dir.path().join("catalog.db");
    let config = StoreConfig {
        database_url: format!("sqlite://{}", path.display()),
        max_connections: 8,
        min_connections: 1,
        acquire_timeout: Duration::from_secs(30),
        busy_timeout: Duration::from_secs(30),
        low_stock_threshold: 5,
    };
    connect(&config).await.expect("Failed to open file store")
}

pub fn slug(s: &str) -> Slug {
    Slug::parse(s).expect("Invalid slug")
}

pub fn email(s: &str) -> Email {
    Email::parse(s).expect("Invalid email")
}

/// Price from a value in cents.
pub fn cents(amount: i64) -> Decimal {
    Decimal::new(amount, 2)
}

pub async fn create_user(pool: &SqlitePool, address: &str) -> User {
    UserRepository::new(pool)
        .create(&CreateUserInput {
            name: Some("Test User".to_owned()),
            email: Some(email(address)),
            ..CreateUserInput::default()
        })
        .await
        .expect("Failed to create user")
}

pub async fn create_category(
    pool: &SqlitePool,
    name: &str,
    slug_text: &str,
    parent: Option<&CategoryId>,
) -> Category {
    let mut input = CreateCategoryInput::new(name, slug(slug_text));
    if let Some(parent) = parent {
        input = input.with_parent(parent.clone());
    }
    CategoryRepository::new(pool)
        .create(&input)
        .await
        .expect("Failed to create category")
}

pub async fn create_brand(pool: &SqlitePool, code: &str) -> ProductBrand {
    let lower = code.to_lowercase();
    BrandRepository::new(pool)
        .create(&CreateBrandInput::new(
            BrandCode::parse(code).expect("Invalid brand code"),
            format!("{code} Inc."),
            slug(&lower),
        ))
        .await
        .expect("Failed to create brand")
}

/// Product input under `category` priced at `price_cents`.
pub fn product_input(category: &CategoryId, slug_text: &str, price_cents: i64) -> CreateProductInput {
    CreateProductInput::new(
        category.clone(),
        slug_text.replace('-', " "),
        slug(slug_text),
        cents(price_cents),
    )
}
