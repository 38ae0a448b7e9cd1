//! # Error Types
//!
//! Domain-specific error types for consign-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  consign-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                        │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  consign-db errors (separate crate)                                     │
//! │  └── DbError          - Storage operation failures                      │
//! │                                                                         │
//! │  consign-engine errors (separate crate)                                 │
//! │  └── EngineError      - Session/pipeline failures (wraps the above)     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → operator message     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Every blocking error names the offending product/line
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. They block submission
/// and guarantee no partial write occurred.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The computed invoice total is negative.
    ///
    /// ## When This Occurs
    /// - Reprises de stock exceed sales, optionally amplified by a discount
    ///
    /// The total is rejected outright, never clamped: the system never
    /// silently emits a negative invoice. The operator is told the correct
    /// remediation path.
    #[error("invoice total would be {total}; a negative invoice cannot be issued, use a credit note instead")]
    NegativeInvoiceTotal { total: Money },

    /// A reconciliation session with no stock lines and no adjustments.
    ///
    /// ## When This Occurs
    /// - Operator confirms a session without entering anything
    #[error("nothing to commit: no stock line was entered and no adjustment is pending")]
    NothingToCommit,

    /// Validation error (wraps ValidationError).
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when operator input doesn't meet requirements.
/// Surfaced immediately, before any write.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Exactly one of the counted-stock / new-deposit pair was filled.
    ///
    /// ## When This Occurs
    /// The reconciliation algorithm needs both numbers to derive sold and
    /// réassort quantities; a half-filled line is ambiguous, not partial.
    #[error("{line}: counted stock and new deposit must be provided together, or both left empty")]
    UnpairedEntry { line: String },

    /// A stock field did not parse to a non-negative whole number.
    #[error("{line}: {field} must be a non-negative whole number")]
    InvalidStockValue { line: String, field: String },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Numeric value is outside its half-open window (min excluded).
    #[error("{field} must be greater than {min} and at most {max}")]
    OutOfRange { field: String, min: i64, max: i64 },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::NegativeInvoiceTotal {
            total: Money::from_cents(-2000),
        };
        assert_eq!(
            err.to_string(),
            "invoice total would be -20.00 €; a negative invoice cannot be issued, use a credit note instead"
        );
    }

    #[test]
    fn test_validation_error_names_the_line() {
        let err = ValidationError::UnpairedEntry {
            line: "Miel toutes fleurs 500g".to_string(),
        };
        assert!(err.to_string().starts_with("Miel toutes fleurs 500g:"));

        let err = ValidationError::InvalidStockValue {
            line: "Savon lavande".to_string(),
            field: "counted stock".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Savon lavande: counted stock must be a non-negative whole number"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "operation name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
