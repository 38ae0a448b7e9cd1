//! # consign-core: Pure Business Logic for Consign
//!
//! This crate is the **heart** of the dépôt-vente engine. It contains all
//! business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Consign Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    consign-engine                               │   │
//! │  │   ReconcileSession ──► CommitPipeline ──► CreditNoteIssuer      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ consign-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌────────────┐  │   │
//! │  │   │   types   │  │   money   │  │ reconcile │  │adjustments │  │   │
//! │  │   │  Product  │  │   Money   │  │ Movement  │  │   Ledger   │  │   │
//! │  │   │  Invoice  │  │ Discount  │  │  lines    │  │ (reprises) │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                   consign-db (Storage Layer)                    │   │
//! │  │          SQLite stock positions, audit ledger, drafts           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, ClientProduct, StockUpdate, Invoice, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`reconcile`] - The reconciliation calculator (counts → movements)
//! - [`adjustments`] - Pending reprise-de-stock ledger
//! - [`error`] - Domain error types
//! - [`validation`] - Field parsing and business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same inputs, same derived quantities, always
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are cents (i64)
//! 4. **Explicit Errors**: all errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use consign_core::money::Money;
//! use consign_core::reconcile::{reconcile_line, LineInput};
//!
//! // 50 on deposit last time, 10 counted today, restocked to 40 total
//! let movement = reconcile_line("Miel 500g", 50, &LineInput::new("10", "40"))
//!     .unwrap()
//!     .unwrap();
//!
//! assert_eq!(movement.stock_sold, 40);
//! assert_eq!(movement.stock_added, 30);
//! assert_eq!(movement.amount(Money::from_cents(200)).cents(), 8000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod adjustments;
pub mod error;
pub mod money;
pub mod reconcile;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use consign_core::Money` instead of
// `use consign_core::money::Money`

pub use adjustments::{Adjustment, AdjustmentLedger};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{DiscountRate, Money};
pub use reconcile::{reconcile_line, LineInput, Movement};
pub use types::*;
