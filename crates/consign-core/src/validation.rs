//! # Validation Module
//!
//! Input validation utilities for operator-entered values.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Form entry                                                   │
//! │  ├── THIS MODULE: field parsing and shape checks                       │
//! │  └── Immediate operator feedback, blocks submission                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Commit pipeline (consign-engine)                             │
//! │  ├── Re-runs the same checks before any write                          │
//! │  └── Business rules (negative total, nothing to commit)                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / UNIQUE / foreign key constraints                       │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::DiscountRate;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Stock Field Parsing
// =============================================================================

/// Parses one entered stock field to a non-negative integer.
///
/// ## Rules
/// - Leading/trailing whitespace is ignored
/// - Must parse as a whole number
/// - Must be ≥ 0
///
/// Errors name both the line (product or sub-product) and the field so the
/// operator sees exactly which entry is wrong.
///
/// ## Example
/// ```rust
/// use consign_core::validation::parse_stock_value;
///
/// assert_eq!(parse_stock_value("Miel 500g", "counted stock", " 12 ").unwrap(), 12);
/// assert!(parse_stock_value("Miel 500g", "counted stock", "-3").is_err());
/// assert!(parse_stock_value("Miel 500g", "counted stock", "douze").is_err());
/// ```
pub fn parse_stock_value(line: &str, field: &str, raw: &str) -> ValidationResult<i64> {
    let parsed = raw.trim().parse::<i64>().ok().filter(|v| *v >= 0);
    parsed.ok_or_else(|| ValidationError::InvalidStockValue {
        line: line.to_string(),
        field: field.to_string(),
    })
}

// =============================================================================
// Adjustment Validators
// =============================================================================

/// Validates a reprise-de-stock operation name.
///
/// ## Rules
/// - Must not be empty after trimming
pub fn validate_operation_name(name: &str) -> ValidationResult<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "operation name".to_string(),
        });
    }
    Ok(())
}

/// Validates the operator-entered unit price of an adjustment or credit
/// note.
///
/// ## Rules
/// - Must be strictly positive; the negation convention is applied by the
///   ledger, never by the operator
pub fn validate_unit_price_cents(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "unit price".to_string(),
        });
    }
    Ok(())
}

/// Validates an adjustment or credit note quantity.
///
/// ## Rules
/// - Must be a strictly positive integer
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Discount Validator
// =============================================================================

/// Validates an invoice discount rate.
///
/// ## Rules
/// - Must be within (0, 100] percent; a zero discount is simply omitted
pub fn validate_discount(rate: DiscountRate) -> ValidationResult<()> {
    if rate.bps() == 0 || rate.bps() > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "discount percentage".to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stock_value() {
        assert_eq!(parse_stock_value("p", "counted stock", "0").unwrap(), 0);
        assert_eq!(parse_stock_value("p", "counted stock", " 42 ").unwrap(), 42);

        assert!(parse_stock_value("p", "counted stock", "").is_err());
        assert!(parse_stock_value("p", "counted stock", "-1").is_err());
        assert!(parse_stock_value("p", "counted stock", "3.5").is_err());
        assert!(parse_stock_value("p", "counted stock", "abc").is_err());
    }

    #[test]
    fn test_validate_operation_name() {
        assert!(validate_operation_name("Reprise pots cassés").is_ok());
        assert!(validate_operation_name("").is_err());
        assert!(validate_operation_name("   ").is_err());
    }

    #[test]
    fn test_validate_unit_price_cents() {
        assert!(validate_unit_price_cents(500).is_ok());
        assert!(validate_unit_price_cents(0).is_err());
        assert!(validate_unit_price_cents(-500).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-4).is_err());
    }

    #[test]
    fn test_validate_discount_window() {
        assert!(validate_discount(DiscountRate::from_percentage(10.0)).is_ok());
        assert!(validate_discount(DiscountRate::from_percentage(100.0)).is_ok());
        assert!(validate_discount(DiscountRate::zero()).is_err());
        assert!(validate_discount(DiscountRate::from_percentage(100.5)).is_err());

        // Zero is invalid, so the message must not suggest it is allowed
        let err = validate_discount(DiscountRate::zero()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "discount percentage must be greater than 0 and at most 100"
        );
    }
}
