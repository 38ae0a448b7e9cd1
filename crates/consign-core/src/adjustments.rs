//! # Adjustment Ledger
//!
//! The in-memory list of not-yet-committed "reprises de stock": manual
//! invoice-level corrections that are not tied to a counted product line
//! but still affect the invoice total.
//!
//! ## Entry Convention
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operator enters a POSITIVE unit price (the value credited back).      │
//! │  The ledger stores it NEGATED (−|price|), so that                      │
//! │                                                                         │
//! │      amount = unit_price × quantity                                     │
//! │                                                                         │
//! │  is already negative and composes additively with normal sale          │
//! │  amounts in the invoice total, without special-casing.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Entries are never persisted individually until an invoice is actually
//! created; the ledger is cleared on successful commit or removed entry by
//! entry.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::{validate_operation_name, validate_quantity, validate_unit_price_cents};

// =============================================================================
// Adjustment
// =============================================================================

/// One pending reprise-de-stock line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub operation_name: String,
    /// Stored negative (see module docs).
    pub unit_price: Money,
    pub quantity: i64,
}

impl Adjustment {
    /// The (negative) amount this adjustment contributes to the invoice.
    #[inline]
    pub fn amount(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Ledger
// =============================================================================

/// Ordered list of pending adjustments for the open session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentLedger {
    entries: Vec<Adjustment>,
}

impl AdjustmentLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an adjustment from operator input.
    ///
    /// ## Validation
    /// - `operation_name` non-empty
    /// - `entered_price_cents` strictly positive (the operator enters the
    ///   value being credited back; negation happens here)
    /// - `quantity` strictly positive
    pub fn add(
        &mut self,
        operation_name: &str,
        entered_price_cents: i64,
        quantity: i64,
    ) -> Result<(), ValidationError> {
        validate_operation_name(operation_name)?;
        validate_unit_price_cents(entered_price_cents)?;
        validate_quantity(quantity)?;

        self.entries.push(Adjustment {
            operation_name: operation_name.trim().to_string(),
            unit_price: -Money::from_cents(entered_price_cents).abs(),
            quantity,
        });
        Ok(())
    }

    /// Removes the adjustment at `index`, returning it if it existed.
    pub fn remove(&mut self, index: usize) -> Option<Adjustment> {
        if index < self.entries.len() {
            Some(self.entries.remove(index))
        } else {
            None
        }
    }

    /// Sum of all pending adjustment amounts (≤ 0 by construction).
    pub fn total(&self) -> Money {
        self.entries
            .iter()
            .fold(Money::zero(), |acc, a| acc + a.amount())
    }

    /// The pending entries, in insertion order.
    pub fn entries(&self) -> &[Adjustment] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drops all pending entries (successful commit or session reset).
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
