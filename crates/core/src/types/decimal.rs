//! Fixed-point storage codec for decimal columns.
//!
//! Prices and physical dimensions are exact [`Decimal`] values in the API and
//! are persisted as `INTEGER` ten-thousandths (scale [`DECIMAL_SCALE`]). The
//! integer form keeps ordering, range filters and sums exact inside the
//! database; binary floating point never touches these values.

use rust_decimal::Decimal;

/// Number of fractional digits stored for decimal columns.
pub const DECIMAL_SCALE: u32 = 4;

/// Errors converting a [`Decimal`] into its stored fixed-point form.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecimalError {
    /// The value has more fractional digits than the column stores.
    #[error("at most {DECIMAL_SCALE} decimal places are supported (got {0})")]
    TooPrecise(Decimal),
    /// The value does not fit in the stored integer range.
    #[error("value {0} is out of range")]
    OutOfRange(Decimal),
}

/// Encode `value` as an integer count of 10^-[`DECIMAL_SCALE`] units.
///
/// Trailing zeros beyond the scale are accepted (`1.50000` is `1.5`), but a
/// value that would lose precision is rejected rather than rounded.
///
/// # Errors
///
/// Returns [`DecimalError::TooPrecise`] or [`DecimalError::OutOfRange`].
///
/// ```
/// use catalog_core::{to_fixed, from_fixed};
/// use rust_decimal::Decimal;
///
/// let price = Decimal::new(1999, 2); // 19.99
/// assert_eq!(to_fixed(price).unwrap(), 199_900);
/// assert_eq!(from_fixed(199_900), price);
/// ```
pub fn to_fixed(value: Decimal) -> Result<i64, DecimalError> {
    let normalized = value.normalize();
    if normalized.scale() > DECIMAL_SCALE {
        return Err(DecimalError::TooPrecise(value));
    }
    let scaled = normalized
        .checked_mul(Decimal::from(10_i64.pow(DECIMAL_SCALE)))
        .ok_or(DecimalError::OutOfRange(value))?
        .normalize();
    i64::try_from(scaled.mantissa()).map_err(|_| DecimalError::OutOfRange(value))
}

/// Decode a stored fixed-point integer back into a normalized [`Decimal`].
#[must_use]
pub fn from_fixed(stored: i64) -> Decimal {
    Decimal::new(stored, DECIMAL_SCALE).normalize()
}

/// Decode an optional stored value.
#[must_use]
pub fn from_fixed_opt(stored: Option<i64>) -> Option<Decimal> {
    stored.map(from_fixed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_to_fixed_scales_up() {
        assert_eq!(to_fixed(Decimal::new(5, 0)).unwrap(), 50_000);
        assert_eq!(to_fixed(Decimal::new(1999, 2)).unwrap(), 199_900);
        assert_eq!(to_fixed(Decimal::new(125, 3)).unwrap(), 1_250);
        assert_eq!(to_fixed(Decimal::new(-15, 1)).unwrap(), -15_000);
    }

    #[test]
    fn test_to_fixed_accepts_trailing_zeros() {
        assert_eq!(to_fixed(Decimal::new(150_000, 5)).unwrap(), 15_000);
    }

    #[test]
    fn test_to_fixed_rejects_excess_precision() {
        let value = Decimal::new(123_456, 5);
        assert_eq!(to_fixed(value), Err(DecimalError::TooPrecise(value)));
    }

    #[test]
    fn test_to_fixed_rejects_out_of_range() {
        let value = Decimal::from(i64::MAX);
        assert_eq!(to_fixed(value), Err(DecimalError::OutOfRange(value)));
    }

    #[test]
    fn test_from_fixed_normalizes() {
        assert_eq!(from_fixed(199_900).to_string(), "19.99");
        assert_eq!(from_fixed(50_000).to_string(), "5");
        assert_eq!(from_fixed_opt(None), None);
    }

    #[test]
    fn test_no_drift_on_repeated_roundtrip() {
        let mut value = Decimal::new(1, 1); // 0.1
        for _ in 0..10 {
            value = from_fixed(to_fixed(value + Decimal::new(1, 1)).unwrap());
        }
        assert_eq!(value, Decimal::new(11, 1));
    }
}
