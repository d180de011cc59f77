//! Field checks applied before a write reaches storage.

use rust_decimal::Decimal;

use super::RepositoryError;

/// Reject blank text.
pub(crate) fn non_empty(
    entity: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), RepositoryError> {
    if value.trim().is_empty() {
        return Err(RepositoryError::validation(entity, field, "must not be empty"));
    }
    Ok(())
}

/// Reject blank text when present.
pub(crate) fn non_empty_opt(
    entity: &'static str,
    field: &'static str,
    value: Option<&str>,
) -> Result<(), RepositoryError> {
    value.map_or(Ok(()), |v| non_empty(entity, field, v))
}

/// Reject negative quantities.
pub(crate) fn non_negative(
    entity: &'static str,
    field: &'static str,
    value: i64,
) -> Result<(), RepositoryError> {
    if value < 0 {
        return Err(RepositoryError::validation(
            entity,
            field,
            format!("must not be negative (got {value})"),
        ));
    }
    Ok(())
}

/// Reject negative decimals.
pub(crate) fn non_negative_decimal(
    entity: &'static str,
    field: &'static str,
    value: Option<Decimal>,
) -> Result<(), RepositoryError> {
    match value {
        Some(v) if v.is_sign_negative() && !v.is_zero() => Err(RepositoryError::validation(
            entity,
            field,
            format!("must not be negative (got {v})"),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty() {
        assert!(non_empty("Category", "name", "Chairs").is_ok());
        assert!(non_empty("Category", "name", "   ").is_err());
        assert!(non_empty_opt("Category", "name", None).is_ok());
    }

    #[test]
    fn test_non_negative() {
        assert!(non_negative("Product", "stock_quantity", 0).is_ok());
        let err = non_negative("Product", "stock_quantity", -1).unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Validation { entity: "Product", ref field, .. } if field == "stock_quantity"
        ));
    }

    #[test]
    fn test_non_negative_decimal() {
        assert!(non_negative_decimal("Product", "price", Some(Decimal::ZERO)).is_ok());
        assert!(non_negative_decimal("Product", "price", Some(-Decimal::ZERO)).is_ok());
        assert!(non_negative_decimal("Product", "price", None).is_ok());
        assert!(non_negative_decimal("Product", "price", Some(Decimal::new(-1, 2))).is_err());
    }
}
