//! # Reconciliation Calculator
//!
//! Pure functions turning entered counts into validated stock movements.
//!
//! ## The Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  One line = two operator-entered numbers + the prior stock position     │
//! │                                                                         │
//! │  previous stock ──┐                                                     │
//! │                   ├──► stock_sold  = max(0, previous − counted)         │
//! │  counted stock ───┤                                                     │
//! │                   ├──► stock_added = max(0, new_deposit − counted)      │
//! │  new deposit ─────┤         (réassort, displayed live, recomputed       │
//! │                   │          identically at commit time)                │
//! │                   └──► new_stock   = new_deposit                        │
//! │                                                                         │
//! │  The new deposit IS the new current stock, not an increment.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The same algorithm applies to a plain product and to each sub-product of
//! a composed product; parent-level figures are the field-wise sum of the
//! per-sub-product movements. A sub-product with no entered data still
//! contributes its last known stock to every parent total, so partial
//! updates never under- or overstate the aggregate.
//!
//! ## Validation Rules
//! - Both fields empty → the line is skipped entirely (no movement, no row)
//! - Exactly one field filled → validation error naming the line
//! - Either field non-numeric or negative → validation error naming the line

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::parse_stock_value;

// =============================================================================
// Line Input
// =============================================================================

/// Raw operator input for one line, exactly as entered in the form.
///
/// Both fields are optional strings: the calculator owns parsing so that
/// draft snapshots round-trip the operator's keystrokes unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInput {
    /// Remaining stock counted at the storefront.
    pub counted_stock: Option<String>,
    /// New total deposited stock after replenishment. Stored under the
    /// historical name "stock_added" but semantically the new total.
    pub new_deposit: Option<String>,
}

impl LineInput {
    /// A line with nothing entered.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds an input from two entered values.
    pub fn new(counted_stock: impl Into<String>, new_deposit: impl Into<String>) -> Self {
        LineInput {
            counted_stock: Some(counted_stock.into()),
            new_deposit: Some(new_deposit.into()),
        }
    }

    /// True when neither field holds a non-blank value.
    pub fn is_empty(&self) -> bool {
        fn blank(v: &Option<String>) -> bool {
            v.as_deref().map_or(true, |s| s.trim().is_empty())
        }
        blank(&self.counted_stock) && blank(&self.new_deposit)
    }
}

// =============================================================================
// Movement
// =============================================================================

/// A validated stock movement for one logical line.
///
/// Produced per plain product, per sub-product, and (by summation) per
/// parent of a composed product. All fields are plain integers so that
/// aggregation is exact and order-independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub previous_stock: i64,
    pub counted_stock: i64,
    pub stock_sold: i64,
    pub stock_added: i64,
    pub new_stock: i64,
}

impl Movement {
    /// The movement of an untouched line: previous = counted = new = the
    /// last known stock, nothing sold, nothing added.
    ///
    /// Used for sub-products with no entered data, which must still
    /// contribute their stock to the parent totals.
    pub const fn untouched(previous_stock: i64) -> Self {
        Movement {
            previous_stock,
            counted_stock: previous_stock,
            stock_sold: 0,
            stock_added: 0,
            new_stock: previous_stock,
        }
    }

    /// A manual absolute-stock correction ("Ajuster le stock").
    ///
    /// Always framed as a pure replenishment/correction with zero sales:
    /// `stock_added = new − old` and may be negative when the stock is
    /// being lowered. A reduction is never recorded as a sale.
    pub const fn manual_correction(old_stock: i64, new_stock: i64) -> Self {
        Movement {
            previous_stock: old_stock,
            counted_stock: new_stock,
            stock_sold: 0,
            stock_added: new_stock - old_stock,
            new_stock,
        }
    }

    /// Field-wise sum of per-sub-product movements, producing the
    /// parent-level figures used for invoicing and the parent audit row.
    ///
    /// Summation is commutative, so the result is independent of
    /// sub-product iteration order.
    pub fn aggregate<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = &'a Movement>,
    {
        let mut total = Movement {
            previous_stock: 0,
            counted_stock: 0,
            stock_sold: 0,
            stock_added: 0,
            new_stock: 0,
        };
        for part in parts {
            total.previous_stock += part.previous_stock;
            total.counted_stock += part.counted_stock;
            total.stock_sold += part.stock_sold;
            total.stock_added += part.stock_added;
            total.new_stock += part.new_stock;
        }
        total
    }

    /// True when the line changed nothing: no sale, no réassort, and the
    /// stock level is exactly where it was.
    pub const fn is_noop(&self) -> bool {
        self.stock_sold == 0 && self.stock_added == 0 && self.new_stock == self.previous_stock
    }

    /// Billable amount for this movement at the given unit price.
    #[inline]
    pub fn amount(&self, unit_price: Money) -> Money {
        unit_price.multiply_quantity(self.stock_sold)
    }
}

// =============================================================================
// Line Reconciliation
// =============================================================================

/// Converts one line's raw input into a validated movement.
///
/// ## Returns
/// - `Ok(None)` - both fields empty, the line is skipped (no row produced)
/// - `Ok(Some(movement))` - both fields parsed, quantities derived
/// - `Err(...)` - half-filled pair or a non-numeric/negative value; the
///   error names the offending line
///
/// ## Clamping
/// A count higher than the previous stock never yields negative sales:
/// `stock_sold` is clamped at 0 and the excess is implicitly treated as an
/// unexplained stock increase, not a return.
///
/// ## Example
/// ```rust
/// use consign_core::reconcile::{reconcile_line, LineInput};
///
/// let m = reconcile_line("Miel 500g", 50, &LineInput::new("10", "40"))
///     .unwrap()
///     .unwrap();
/// assert_eq!(m.stock_sold, 40);
/// assert_eq!(m.stock_added, 30);
/// assert_eq!(m.new_stock, 40);
/// ```
pub fn reconcile_line(
    line: &str,
    previous_stock: i64,
    input: &LineInput,
) -> Result<Option<Movement>, ValidationError> {
    if input.is_empty() {
        return Ok(None);
    }

    let (counted_raw, deposit_raw) = match (
        non_blank(&input.counted_stock),
        non_blank(&input.new_deposit),
    ) {
        (Some(c), Some(d)) => (c, d),
        // Half-filled pair: ambiguous, not partial
        _ => {
            return Err(ValidationError::UnpairedEntry {
                line: line.to_string(),
            })
        }
    };

    let counted_stock = parse_stock_value(line, "counted stock", counted_raw)?;
    let new_stock = parse_stock_value(line, "new deposit", deposit_raw)?;

    Ok(Some(Movement {
        previous_stock,
        counted_stock,
        stock_sold: (previous_stock - counted_stock).max(0),
        stock_added: (new_stock - counted_stock).max(0),
        new_stock,
    }))
}

/// Live réassort preview: what the stock_added figure will be for the
/// currently entered pair, or `None` while the pair is incomplete or
/// unparseable. Commit-time recomputation uses [`reconcile_line`] on the
/// same two source numbers, so the preview can never drift from the
/// persisted value.
pub fn replenishment_preview(input: &LineInput) -> Option<i64> {
    let counted = non_blank(&input.counted_stock)?.trim().parse::<i64>().ok()?;
    let deposit = non_blank(&input.new_deposit)?.trim().parse::<i64>().ok()?;
    if counted < 0 || deposit < 0 {
        return None;
    }
    Some((deposit - counted).max(0))
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_a_plain_line() {
        // previousStock=50, counted=10, newDeposit=40, price=2.00
        let m = reconcile_line("p", 50, &LineInput::new("10", "40"))
            .unwrap()
            .unwrap();
        assert_eq!(m.stock_sold, 40);
        assert_eq!(m.stock_added, 30);
        assert_eq!(m.new_stock, 40);
        assert_eq!(m.amount(Money::from_cents(200)).cents(), 8000);
    }

    #[test]
    fn test_scenario_b_over_count_clamps_to_zero() {
        // previousStock=10, counted=15, newDeposit=15
        let m = reconcile_line("p", 10, &LineInput::new("15", "15"))
            .unwrap()
            .unwrap();
        assert_eq!(m.stock_sold, 0);
        assert_eq!(m.stock_added, 0);
        assert_eq!(m.new_stock, 15);
    }

    #[test]
    fn test_empty_line_is_skipped() {
        assert!(reconcile_line("p", 50, &LineInput::empty())
            .unwrap()
            .is_none());

        // Whitespace-only counts as empty
        let input = LineInput {
            counted_stock: Some("  ".to_string()),
            new_deposit: Some(String::new()),
        };
        assert!(reconcile_line("p", 50, &input).unwrap().is_none());
    }

    #[test]
    fn test_half_filled_pair_is_an_error() {
        let only_counted = LineInput {
            counted_stock: Some("10".to_string()),
            new_deposit: None,
        };
        let err = reconcile_line("Miel 500g", 50, &only_counted).unwrap_err();
        assert!(matches!(err, ValidationError::UnpairedEntry { ref line } if line == "Miel 500g"));

        let only_deposit = LineInput {
            counted_stock: None,
            new_deposit: Some("40".to_string()),
        };
        assert!(reconcile_line("p", 50, &only_deposit).is_err());
    }

    #[test]
    fn test_non_numeric_and_negative_values_rejected() {
        assert!(reconcile_line("p", 50, &LineInput::new("dix", "40")).is_err());
        assert!(reconcile_line("p", 50, &LineInput::new("10", "-4")).is_err());
        assert!(reconcile_line("p", 50, &LineInput::new("1.5", "40")).is_err());
    }

    #[test]
    fn test_derived_quantities_never_negative() {
        for (prev, counted, deposit) in [(0, 0, 0), (5, 9, 2), (100, 100, 100), (3, 0, 0)] {
            let m = reconcile_line(
                "p",
                prev,
                &LineInput::new(counted.to_string(), deposit.to_string()),
            )
            .unwrap()
            .unwrap();
            assert!(m.stock_sold >= 0);
            assert!(m.stock_added >= 0);
            assert_eq!(m.new_stock, deposit);
        }
    }

    #[test]
    fn test_scenario_c_sub_product_aggregation() {
        // A: prev=5, counted=2, new=10. B: prev=3, untouched.
        let a = reconcile_line("A", 5, &LineInput::new("2", "10"))
            .unwrap()
            .unwrap();
        let b = Movement::untouched(3);
        let parent = Movement::aggregate([&a, &b]);

        assert_eq!(parent.previous_stock, 8);
        assert_eq!(parent.counted_stock, 5);
        assert_eq!(parent.stock_sold, 3);
        assert_eq!(parent.new_stock, 13);
    }

    #[test]
    fn test_aggregation_is_order_independent() {
        let a = reconcile_line("A", 5, &LineInput::new("2", "10"))
            .unwrap()
            .unwrap();
        let b = reconcile_line("B", 7, &LineInput::new("4", "4"))
            .unwrap()
            .unwrap();
        let c = Movement::untouched(3);

        let forward = Movement::aggregate([&a, &b, &c]);
        let backward = Movement::aggregate([&c, &b, &a]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_untouched_contributes_stock_without_movement() {
        let m = Movement::untouched(3);
        assert!(m.is_noop());
        assert_eq!(m.previous_stock, 3);
        assert_eq!(m.counted_stock, 3);
        assert_eq!(m.new_stock, 3);
    }

    #[test]
    fn test_manual_correction_is_never_a_sale() {
        let up = Movement::manual_correction(10, 25);
        assert_eq!(up.stock_sold, 0);
        assert_eq!(up.stock_added, 15);
        assert_eq!(up.counted_stock, 25);

        // A reduction is negative réassort, not a sale
        let down = Movement::manual_correction(25, 10);
        assert_eq!(down.stock_sold, 0);
        assert_eq!(down.stock_added, -15);
        assert_eq!(down.new_stock, 10);
    }

    #[test]
    fn test_replenishment_preview_matches_commit_math() {
        let input = LineInput::new("10", "40");
        assert_eq!(replenishment_preview(&input), Some(30));

        let m = reconcile_line("p", 50, &input).unwrap().unwrap();
        assert_eq!(Some(m.stock_added), replenishment_preview(&input));

        // Incomplete pair has no preview
        let half = LineInput {
            counted_stock: Some("10".to_string()),
            new_deposit: None,
        };
        assert_eq!(replenishment_preview(&half), None);
    }

    #[test]
    fn test_noop_detection() {
        let m = reconcile_line("p", 12, &LineInput::new("12", "12"))
            .unwrap()
            .unwrap();
        assert!(m.is_noop());

        let moved = reconcile_line("p", 12, &LineInput::new("12", "20"))
            .unwrap()
            .unwrap();
        assert!(!moved.is_noop());
    }
}
