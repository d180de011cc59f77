//! Closed enumerations persisted as constrained strings.
//!
//! Each enum is stored in a `TEXT` column guarded by a `CHECK` constraint that
//! lists exactly the variants below, in `SCREAMING_SNAKE_CASE`.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a string is not a known variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownVariant {
    /// The enum being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Authorization role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlite", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlite", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Regular storefront customer.
    #[default]
    Customer,
    /// Store administrator.
    Admin,
}

impl Role {
    /// All variants, in declaration order.
    pub const ALL: [Self; 2] = [Self::Customer, Self::Admin];

    /// The persisted code for this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "CUSTOMER",
            Self::Admin => "ADMIN",
        }
    }
}

/// Curated sellability of a product.
///
/// Stored independently of `stock_quantity`: `PreOrder` with zero units on
/// hand and `LowStock` as a merchandising signal are both legitimate. The
/// status is authoritative for display and ordering; the quantity is
/// authoritative for inventory arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlite", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlite", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    #[default]
    InStock,
    OutOfStock,
    LowStock,
    PreOrder,
}

impl StockStatus {
    /// All variants, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::InStock,
        Self::OutOfStock,
        Self::LowStock,
        Self::PreOrder,
    ];

    /// The persisted code for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InStock => "IN_STOCK",
            Self::OutOfStock => "OUT_OF_STOCK",
            Self::LowStock => "LOW_STOCK",
            Self::PreOrder => "PRE_ORDER",
        }
    }

    /// Whether a customer can place an order for the product.
    #[must_use]
    pub const fn is_orderable(self) -> bool {
        !matches!(self, Self::OutOfStock)
    }

    /// Suggest a status from an on-hand quantity.
    ///
    /// Only a suggestion for callers that want to keep the two fields in step;
    /// the store never rewrites a status on its own. `PreOrder` is never
    /// suggested because it is a merchandising decision.
    #[must_use]
    pub const fn suggest(quantity: i32, low_stock_threshold: i32) -> Self {
        if quantity <= 0 {
            Self::OutOfStock
        } else if quantity <= low_stock_threshold {
            Self::LowStock
        } else {
            Self::InStock
        }
    }
}

macro_rules! string_enum {
    ($name:ident, $kind:literal) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .into_iter()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| UnknownVariant {
                        kind: $kind,
                        value: s.to_owned(),
                    })
            }
        }
    };
}

string_enum!(Role, "role");
string_enum!(StockStatus, "stock status");

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_default_is_customer() {
        assert_eq!(Role::default(), Role::Customer);
    }

    #[test]
    fn test_codes_roundtrip_through_from_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        for status in StockStatus::ALL {
            assert_eq!(status.as_str().parse::<StockStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_unknown_variant() {
        let err = "BACKORDER".parse::<StockStatus>().unwrap_err();
        assert_eq!(err.kind, "stock status");
        assert_eq!(err.value, "BACKORDER");
        assert!("customer".parse::<Role>().is_err());
    }

    #[test]
    fn test_serde_matches_persisted_codes() {
        assert_eq!(
            serde_json::to_string(&StockStatus::PreOrder).unwrap(),
            "\"PRE_ORDER\""
        );
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
    }

    #[test]
    fn test_suggest() {
        assert_eq!(StockStatus::suggest(0, 5), StockStatus::OutOfStock);
        assert_eq!(StockStatus::suggest(3, 5), StockStatus::LowStock);
        assert_eq!(StockStatus::suggest(5, 5), StockStatus::LowStock);
        assert_eq!(StockStatus::suggest(6, 5), StockStatus::InStock);
    }

    #[test]
    fn test_orderable() {
        assert!(StockStatus::PreOrder.is_orderable());
        assert!(StockStatus::LowStock.is_orderable());
        assert!(!StockStatus::OutOfStock.is_orderable());
    }
}
