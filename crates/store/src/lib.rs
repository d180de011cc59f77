//! Catalog Store - Repository layer for the catalog and identity store.
//!
//! This crate persists the eleven store entities in `SQLite` and exposes one
//! repository per entity:
//!
//! - Identity: [`UserRepository`], [`AccountRepository`],
//!   [`SessionRepository`], [`VerificationTokenRepository`]
//! - Content: [`TranslationRepository`], [`SliderRepository`],
//!   [`TopBarRepository`], [`SettingsRepository`]
//! - Catalog: [`CategoryRepository`], [`BrandRepository`],
//!   [`ProductRepository`], [`ProductImageRepository`]
//!
//! Every repository offers the same read family (`find_by_id`, `get`,
//! `find_many`, `stream`, `count`, `aggregate`, `delete`) driven by the
//! typed [`Filter`], [`OrderBy`] and [`Page`] values, plus entity-specific
//! writes. Failures are reported as [`RepositoryError`].
//!
//! # Example
//!
//! ```no_run
//! use catalog_store::{CategoryRepository, connect_in_memory};
//!
//! # async fn example() -> Result<(), catalog_store::RepositoryError> {
//! let pool = connect_in_memory().await?;
//! let roots = CategoryRepository::new(&pool).list_roots().await?;
//! assert!(roots.is_empty());
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod models;

pub use config::{ConfigError, StoreConfig};
pub use db::{
    AccountRepository, Aggregate, BrandRepository, CategoryRepository, Condition, Direction,
    Field, FieldAggregate, FieldKind, Filter, OrderBy, Page, ProductImageRepository,
    ProductRepository, Query, RepositoryError, SessionRepository, SettingsRepository,
    SliderRepository, TopBarRepository, TranslationRepository, UserRepository, Value,
    VerificationTokenRepository, connect, connect_in_memory, create_pool, migrate, with_timeout,
};
