//! Core types for the catalog store.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod code;
pub mod decimal;
pub mod email;
pub mod id;
pub mod slug;
pub mod status;

pub use code::{BrandCode, CodeError, ProductCode};
pub use decimal::{DECIMAL_SCALE, DecimalError, from_fixed, from_fixed_opt, to_fixed};
pub use email::{Email, EmailError};
pub use id::*;
pub use slug::{Slug, SlugError};
pub use status::*;
