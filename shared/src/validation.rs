//! Validation utilities for quantities, units and names
//!
//! The `validate_*_field` functions follow the `validator` custom-function
//! signature so request structs can use them with `#[validate(custom = ...)]`.

use std::borrow::Cow;

use rust_decimal::Decimal;
use validator::ValidationError;

use crate::error::{DomainError, DomainResult};
use crate::units::Unit;

/// Decimal places a request quantity may carry; matches `NUMERIC(20, 6)`
pub const QUANTITY_SCALE: u32 = 6;

/// Exclusive upper bound on a request quantity's magnitude
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(276_447_232, 23_283, 0, false, 0);

// ============================================================================
// Domain Validations
// ============================================================================

/// Quantities entering the ledger or stock must be strictly positive
pub fn validate_positive_quantity(field: &str, value: Decimal) -> DomainResult<()> {
    if value <= Decimal::ZERO {
        return Err(DomainError::InvalidQuantity {
            field: field.to_string(),
            message: format!("must be positive, got {}", value),
        });
    }
    Ok(())
}

pub(crate) fn quantity_out_of_range(field: &str) -> DomainError {
    DomainError::InvalidQuantity {
        field: field.to_string(),
        message: "result is out of range".to_string(),
    }
}

/// Batch counts are positive; fractional batches are allowed
pub fn validate_batch_count(cantidad_lotes: Decimal) -> DomainResult<()> {
    validate_positive_quantity("cantidad_lotes", cantidad_lotes)
}

// ============================================================================
// Request Field Validations
// ============================================================================

fn validate_storable(value: &Decimal) -> Result<(), ValidationError> {
    if value.abs() >= MAX_QUANTITY {
        let mut error = ValidationError::new("range");
        error.message = Some(Cow::from(format!(
            "Quantity must be smaller than {}",
            MAX_QUANTITY
        )));
        return Err(error);
    }
    if value.normalize().scale() > QUANTITY_SCALE {
        let mut error = ValidationError::new("scale");
        error.message = Some(Cow::from(format!(
            "Quantity allows at most {} decimal places",
            QUANTITY_SCALE
        )));
        return Err(error);
    }
    Ok(())
}

pub fn validate_positive_field(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        let mut error = ValidationError::new("positive");
        error.message = Some(Cow::from("Quantity must be positive"));
        return Err(error);
    }
    validate_storable(value)
}

pub fn validate_nonzero_field(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_zero() {
        let mut error = ValidationError::new("nonzero");
        error.message = Some(Cow::from("Quantity cannot be zero"));
        return Err(error);
    }
    validate_storable(value)
}

pub fn validate_unit_field(value: &str) -> Result<(), ValidationError> {
    value.parse::<Unit>().map(|_| ()).map_err(|_| {
        let mut error = ValidationError::new("unit");
        error.message = Some(Cow::from(format!("Unsupported unit: {}", value)));
        error
    })
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some(Cow::from("Value cannot be blank"));
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_positive_quantity() {
        assert!(validate_positive_quantity("cantidad", Decimal::ONE).is_ok());
        assert!(validate_positive_quantity("cantidad", Decimal::ZERO).is_err());
        assert!(validate_positive_quantity("cantidad", Decimal::NEGATIVE_ONE).is_err());
    }

    #[test]
    fn test_validate_batch_count_fractional() {
        assert!(validate_batch_count(Decimal::new(5, 1)).is_ok());
    }

    #[test]
    fn test_validate_unit_field() {
        assert!(validate_unit_field("kg").is_ok());
        assert!(validate_unit_field("Docena").is_ok());
        assert!(validate_unit_field("pies").is_err());
    }

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("Vivero Norte").is_ok());
        assert!(validate_not_blank("   ").is_err());
    }

    #[test]
    fn test_max_quantity_is_ten_to_the_fourteenth() {
        assert_eq!(MAX_QUANTITY, Decimal::from(100_000_000_000_000i64));
    }

    #[test]
    fn test_positive_field_rejects_unstorable_values() {
        use std::str::FromStr;

        assert!(validate_positive_field(&Decimal::from_str("99999999999999.999999").unwrap()).is_ok());
        assert!(validate_positive_field(&MAX_QUANTITY).is_err());
        assert!(validate_positive_field(&Decimal::MAX).is_err());
        assert!(validate_positive_field(&Decimal::from_str("1.2345678").unwrap()).is_err());
        assert!(validate_positive_field(&Decimal::from_str("1.2345670").unwrap()).is_ok());
        assert!(validate_nonzero_field(&Decimal::MIN).is_err());
    }

    #[test]
    fn test_validate_nonzero_field() {
        assert!(validate_nonzero_field(&Decimal::NEGATIVE_ONE).is_ok());
        assert!(validate_nonzero_field(&Decimal::ZERO).is_err());
    }
}
