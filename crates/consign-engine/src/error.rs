//! # Engine Error Types
//!
//! Session and pipeline errors. Core and storage errors pass through
//! transparently so the operator message is always the most specific one
//! available.

use thiserror::Error;

use consign_core::{CoreError, ValidationError};
use consign_db::DbError;

/// Orchestration-level errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Business rule violation from the calculator or pipeline math.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage operation failure.
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("client not found: {0}")]
    ClientNotFound(String),

    #[error("product not found: {0}")]
    ProductNotFound(String),

    #[error("sub-product not found: {0}")]
    SubProductNotFound(String),

    #[error("invoice not found: {0}")]
    InvoiceNotFound(String),

    /// Direct stock edits on a sub-product-backed parent are refused; its
    /// stock is a derived aggregate.
    #[error("stock for {name} is tracked through its sub-products, adjust one of them instead")]
    AggregatedProduct { name: String },

    /// A stored draft awaits a resume/discard decision; edits and commits
    /// are blocked until the operator decides.
    #[error("a stored draft is awaiting a resume or discard decision")]
    DraftDecisionPending,

    /// Resume/discard was requested but no stored draft is pending.
    #[error("no stored draft is pending a decision")]
    NoPendingDraft,

    /// Draft snapshot (de)serialization failure.
    #[error("draft snapshot serialization failed: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use consign_core::Money;

    #[test]
    fn test_core_errors_pass_through_transparently() {
        let err: EngineError = CoreError::NegativeInvoiceTotal {
            total: Money::from_cents(-2000),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "invoice total would be -20.00 €; a negative invoice cannot be issued, use a credit note instead"
        );
    }

    #[test]
    fn test_validation_errors_wrap_via_core() {
        let err: EngineError = ValidationError::UnpairedEntry {
            line: "Miel 500g".to_string(),
        }
        .into();
        assert!(matches!(err, EngineError::Core(CoreError::Validation(_))));
    }
}
