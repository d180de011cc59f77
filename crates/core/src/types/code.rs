//! Brand codes and the human-readable product codes minted from them.
//!
//! A product code is `{BRAND_CODE}-{sequence}` where the sequence is the
//! brand's `next_product_num` counter at the time of allocation, zero-padded
//! to [`ProductCode::SEQUENCE_WIDTH`] digits (e.g. `ACME-00042`). Sequences
//! beyond the padding width simply grow longer; they are never truncated.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`BrandCode`] or [`ProductCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodeError {
    /// The input string is empty.
    #[error("code cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("code must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// A brand code contains something other than `[A-Z0-9]`.
    #[error("brand code may only contain uppercase letters and digits (found {0:?})")]
    InvalidCharacter(char),
    /// A product code sequence number must be at least 1.
    #[error("product sequence must be positive (got {0})")]
    InvalidSequence(i64),
}

/// Manufacturer code used as the prefix of every product code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct BrandCode(String);

impl BrandCode {
    /// Maximum length of a brand code.
    pub const MAX_LENGTH: usize = 16;

    /// Parse a brand code.
    ///
    /// # Errors
    ///
    /// Returns a [`CodeError`] if the code is empty, too long, or contains
    /// anything other than uppercase ASCII letters and digits.
    pub fn parse(s: &str) -> Result<Self, CodeError> {
        if s.is_empty() {
            return Err(CodeError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(CodeError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_uppercase() || c.is_ascii_digit()))
        {
            return Err(CodeError::InvalidCharacter(c));
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BrandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BrandCode {
    type Error = CodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BrandCode> for String {
    fn from(code: BrandCode) -> Self {
        code.0
    }
}

/// A unique, human-readable product identifier.
///
/// ```
/// use catalog_core::{BrandCode, ProductCode};
///
/// let brand = BrandCode::parse("ACME").unwrap();
/// assert_eq!(ProductCode::mint(&brand, 42).unwrap().as_str(), "ACME-00042");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct ProductCode(String);

impl ProductCode {
    /// Number of digits the sequence part is padded to.
    pub const SEQUENCE_WIDTH: usize = 5;

    /// Maximum length of a product code.
    pub const MAX_LENGTH: usize = 64;

    /// Form the code for sequence number `sequence` of `brand`.
    ///
    /// # Errors
    ///
    /// Returns [`CodeError::InvalidSequence`] if `sequence < 1`.
    pub fn mint(brand: &BrandCode, sequence: i64) -> Result<Self, CodeError> {
        if sequence < 1 {
            return Err(CodeError::InvalidSequence(sequence));
        }
        Ok(Self(format!(
            "{}-{:0width$}",
            brand.as_str(),
            sequence,
            width = Self::SEQUENCE_WIDTH
        )))
    }

    /// Accept a caller-supplied code (used for unbranded products).
    ///
    /// # Errors
    ///
    /// Returns a [`CodeError`] if the code is blank or too long.
    pub fn parse(s: &str) -> Result<Self, CodeError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CodeError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(CodeError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Split a minted code back into its brand prefix and sequence number.
    ///
    /// Returns `None` for codes that were not minted from a brand.
    #[must_use]
    pub fn brand_sequence(&self) -> Option<(BrandCode, i64)> {
        let (brand, sequence) = self.0.rsplit_once('-')?;
        if !sequence.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let brand = BrandCode::parse(brand).ok()?;
        let sequence = sequence.parse().ok().filter(|n: &i64| *n >= 1)?;
        Some((brand, sequence))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ProductCode {
    type Error = CodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProductCode> for String {
    fn from(code: ProductCode) -> Self {
        code.0
    }
}

#[cfg(feature = "sqlite")]
mod sqlite {
    use super::{BrandCode, ProductCode};

    macro_rules! text_codec {
        ($name:ident) => {
            impl sqlx::Type<sqlx::Sqlite> for $name {
                fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
                    <String as sqlx::Type<sqlx::Sqlite>>::type_info()
                }

                fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
                    <String as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
                }
            }

            impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for $name {
                fn decode(
                    value: <sqlx::Sqlite as sqlx::Database>::ValueRef<'r>,
                ) -> Result<Self, sqlx::error::BoxDynError> {
                    let s = <String as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
                    Ok(Self::parse(&s)?)
                }
            }

            impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for $name {
                fn encode_by_ref(
                    &self,
                    buf: &mut <sqlx::Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
                ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                    <String as sqlx::Encode<'q, sqlx::Sqlite>>::encode_by_ref(&self.0, buf)
                }
            }
        };
    }

    text_codec!(BrandCode);
    text_codec!(ProductCode);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn acme() -> BrandCode {
        BrandCode::parse("ACME").unwrap()
    }

    #[test]
    fn test_brand_code_rules() {
        assert!(BrandCode::parse("ACME").is_ok());
        assert!(BrandCode::parse("HM2").is_ok());
        assert_eq!(BrandCode::parse(""), Err(CodeError::Empty));
        assert_eq!(BrandCode::parse("acme"), Err(CodeError::InvalidCharacter('a')));
        assert_eq!(BrandCode::parse("AC-ME"), Err(CodeError::InvalidCharacter('-')));
        assert!(matches!(
            BrandCode::parse(&"A".repeat(17)),
            Err(CodeError::TooLong { .. })
        ));
    }

    #[test]
    fn test_mint_pads_sequence() {
        assert_eq!(ProductCode::mint(&acme(), 1).unwrap().as_str(), "ACME-00001");
        assert_eq!(ProductCode::mint(&acme(), 42).unwrap().as_str(), "ACME-00042");
        assert_eq!(
            ProductCode::mint(&acme(), 1_234_567).unwrap().as_str(),
            "ACME-1234567"
        );
    }

    #[test]
    fn test_mint_rejects_non_positive_sequence() {
        assert_eq!(ProductCode::mint(&acme(), 0), Err(CodeError::InvalidSequence(0)));
        assert_eq!(ProductCode::mint(&acme(), -3), Err(CodeError::InvalidSequence(-3)));
    }

    #[test]
    fn test_distinct_sequences_give_distinct_codes() {
        let a = ProductCode::mint(&acme(), 7).unwrap();
        let b = ProductCode::mint(&acme(), 8).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_brand_sequence_roundtrip() {
        let code = ProductCode::mint(&acme(), 42).unwrap();
        assert_eq!(code.brand_sequence(), Some((acme(), 42)));
        assert_eq!(ProductCode::parse("custom-sku").unwrap().brand_sequence(), None);
        assert_eq!(ProductCode::parse("LOOSE").unwrap().brand_sequence(), None);
    }

    #[test]
    fn test_parse_trims_and_rejects_blank() {
        assert_eq!(ProductCode::parse("  SKU-1 ").unwrap().as_str(), "SKU-1");
        assert_eq!(ProductCode::parse("  "), Err(CodeError::Empty));
    }
}
