//! # Domain Types
//!
//! Core domain types for the dépôt-vente engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Catalogue (reference data)         Per-client stock position           │
//! │  ┌───────────┐  ┌────────────┐      ┌───────────────┐ ┌──────────────┐ │
//! │  │  Product  │  │ SubProduct │      │ ClientProduct │ │ClientSubProd.│ │
//! │  │  price    │──│ parent id  │      │ custom_price  │ │current_stock │ │
//! │  │  barcode  │  │ name       │      │ current_stock │ │initial_stock │ │
//! │  └───────────┘  └────────────┘      └───────────────┘ └──────────────┘ │
//! │                                                                         │
//! │  Ledger (append-only)               Billing                            │
//! │  ┌─────────────┐                    ┌─────────┐ ┌────────────────────┐ │
//! │  │ StockUpdate │────────────────────│ Invoice │ │ InvoiceAdjustment  │ │
//! │  │ prev/counted│     invoice_id     │ totals  │ │ CreditNote         │ │
//! │  │ sold/added  │                    │ paths   │ └────────────────────┘ │
//! │  └─────────────┘                    └─────────┘                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conventions
//! - `id`: UUID v4 string, immutable, used for relations
//! - `deleted_at`: soft-delete tombstone; live rows have `None`. All read
//!   paths filter it in the storage layer, once.
//! - Monetary columns are integer cents (`*_cents`)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Catalogue
// =============================================================================

/// A client storefront holding deposited stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Client {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Soft-delete tombstone.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A product in the distributor's catalogue. Immutable reference data for
/// the reconciliation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Default unit price in cents (HT).
    pub price_cents: i64,
    /// Default recommended resale price in cents, if any.
    pub recommended_price_cents: Option<i64>,
    /// Barcode (EAN-13 etc.), if any.
    pub barcode: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Returns the default price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// A sub-variant of a product.
///
/// A product either has zero sub-products (its stock is tracked directly)
/// or one-or-more (stock is tracked exclusively through them; the parent's
/// own stock becomes a derived aggregate, never directly edited).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SubProduct {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Per-Client Stock Position
// =============================================================================

/// The association between a client and a deposited product.
///
/// ## Invariants
/// - Exactly one live row per (client, product)
/// - For a plain product, `current_stock` equals the `new_stock` of the
///   most recent committed StockUpdate
/// - For a sub-product-backed product, `current_stock` equals the sum of
///   its sub-products' `current_stock`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ClientProduct {
    pub id: String,
    pub client_id: String,
    pub product_id: String,
    /// Per-client price override in cents, if any.
    pub custom_price_cents: Option<i64>,
    /// Per-client recommended resale price override in cents, if any.
    pub custom_recommended_price_cents: Option<i64>,
    pub current_stock: i64,
    pub initial_stock: i64,
    pub display_order: i64,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ClientProduct {
    /// Resolves the billable unit price: `custom_price ?? product.price ?? 0`.
    ///
    /// The per-client override always takes precedence over the catalogue
    /// default.
    pub fn effective_price(&self, product: &Product) -> Money {
        Money::from_cents(self.custom_price_cents.unwrap_or(product.price_cents))
    }

    /// Resolves the recommended resale price with the same precedence as
    /// [`effective_price`](Self::effective_price). `None` when neither
    /// level defines one.
    pub fn effective_recommended_price(&self, product: &Product) -> Option<Money> {
        self.custom_recommended_price_cents
            .or(product.recommended_price_cents)
            .map(Money::from_cents)
    }
}

/// The per-client stock row for one sub-product.
///
/// Rows are created eagerly when a product is first associated to a client,
/// and lazily (at stock 0) the first time a client is loaded after a new
/// sub-product appears.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ClientSubProduct {
    pub id: String,
    pub client_id: String,
    pub sub_product_id: String,
    pub current_stock: i64,
    pub initial_stock: i64,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Stock Update Ledger
// =============================================================================

/// An append-only audit row: the system of record for "what happened".
///
/// ## Shape
/// - Product-level row: `product_id` set, `sub_product_id` null
/// - Sub-product row: `sub_product_id` set, `product_id` null
/// - `invoice_id` null for manual corrections and invoice-less sessions
/// - `unit_price_cents`/`total_amount_cents` populated only when an
///   invoice exists and `stock_sold > 0` (product-level rows only;
///   billing never happens at sub-product level)
///
/// Rows are never updated or deleted after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockUpdate {
    pub id: String,
    pub client_id: String,
    pub product_id: Option<String>,
    pub sub_product_id: Option<String>,
    pub invoice_id: Option<String>,
    pub previous_stock: i64,
    pub counted_stock: i64,
    pub stock_sold: i64,
    /// Réassort quantity. Negative only on manual corrections that lower
    /// the stock (always framed as replenishment, never as a sale).
    pub stock_added: i64,
    pub new_stock: i64,
    /// Free-text note (products only); seeds the next session's default.
    pub product_info: Option<String>,
    pub unit_price_cents: Option<i64>,
    pub total_amount_cents: Option<i64>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Billing
// =============================================================================

/// An issued invoice for one reconciliation session.
///
/// Created if and only if the session produced at least one stock movement
/// or at least one adjustment. Document paths are written at most once
/// (first-writer-wins) and never overwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invoice {
    pub id: String,
    pub client_id: String,
    pub total_stock_sold: i64,
    /// Final total in cents, after adjustments and discount. Always ≥ 0.
    pub total_amount_cents: i64,
    /// Discount in basis points, if one was applied.
    pub discount_bps: Option<u32>,
    pub invoice_pdf_path: Option<String>,
    pub stock_report_pdf_path: Option<String>,
    pub deposit_slip_pdf_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    /// Returns the final total as Money.
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }
}

/// A persisted "reprise de stock": a take-back operation billed outside
/// the product catalogue.
///
/// `unit_price_cents` is negative by convention so that
/// `amount = unit_price × quantity` composes additively with sale amounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InvoiceAdjustment {
    pub id: String,
    pub invoice_id: String,
    pub operation_name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// A signed correction against a previously issued (immutable) invoice.
///
/// A credit note is a side ledger: it never mutates the original invoice's
/// stored totals or any stock position. Multiple credit notes may target
/// the same invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CreditNote {
    pub id: String,
    pub invoice_id: String,
    pub client_id: String,
    pub operation_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_amount_cents: i64,
    pub pdf_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(price_cents: i64, recommended: Option<i64>) -> Product {
        Product {
            id: "p1".to_string(),
            name: "Miel toutes fleurs 500g".to_string(),
            price_cents,
            recommended_price_cents: recommended,
            barcode: None,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn client_product(custom: Option<i64>, custom_recommended: Option<i64>) -> ClientProduct {
        ClientProduct {
            id: "cp1".to_string(),
            client_id: "c1".to_string(),
            product_id: "p1".to_string(),
            custom_price_cents: custom,
            custom_recommended_price_cents: custom_recommended,
            current_stock: 0,
            initial_stock: 0,
            display_order: 0,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_effective_price_prefers_client_override() {
        let p = product(200, None);
        assert_eq!(client_product(Some(180), None).effective_price(&p).cents(), 180);
        assert_eq!(client_product(None, None).effective_price(&p).cents(), 200);
    }

    #[test]
    fn test_effective_recommended_price_resolution() {
        let p = product(200, Some(350));
        assert_eq!(
            client_product(None, Some(320))
                .effective_recommended_price(&p)
                .map(|m| m.cents()),
            Some(320)
        );
        assert_eq!(
            client_product(None, None)
                .effective_recommended_price(&p)
                .map(|m| m.cents()),
            Some(350)
        );

        let bare = product(200, None);
        assert!(client_product(None, None)
            .effective_recommended_price(&bare)
            .is_none());
    }
}
