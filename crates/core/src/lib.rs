//! Catalog Core - Shared value types for the catalog and identity store.
//!
//! This crate provides the domain vocabulary used by every other crate:
//! - `catalog-store` - Repository layer over the relational store
//! - `catalog-cli` - Command-line tools for migrations and inspection
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access. Database encodings for the newtypes are available behind
//! the `sqlite` feature.
//!
//! # Modules
//!
//! - [`types`] - Typed ids, emails, slugs, product codes, enums and the
//!   fixed-point decimal codec

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
