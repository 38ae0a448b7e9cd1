//! # consign-engine: Reconciliation Sessions & Commit Pipeline
//!
//! The orchestration layer of the dépôt-vente engine. It wires the pure
//! calculator (consign-core) to the storage layer (consign-db) and owns
//! every multi-step sequence with ordering guarantees.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   consign-engine (THIS CRATE)                           │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐   │
//! │  │ ReconcileSession │──►│  CommitPipeline  │──►│ DocumentGenerator│   │
//! │  │  draft autosave  │   │  invoice, ledger │   │  (trait, warn-   │   │
//! │  │  resume/discard  │   │  rows, stocks    │   │   only failures) │   │
//! │  └──────────────────┘   └──────────────────┘   └──────────────────┘   │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐                           │
//! │  │  StockAdjuster   │   │ CreditNoteIssuer │                           │
//! │  │ "Ajuster le      │   │  side ledger vs  │                           │
//! │  │  stock" path     │   │  issued invoices │                           │
//! │  └──────────────────┘   └──────────────────┘                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`session`] - Per-client draft session manager (Clean/Dirty states,
//!   debounced autosave, resume/discard)
//! - [`commit`] - The ten-step invoice commit pipeline
//! - [`stock_adjust`] - Manual absolute stock corrections
//! - [`credit_note`] - Credit note issuance
//! - [`documents`] - Document generation trait boundary
//! - [`error`] - Engine error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod commit;
pub mod credit_note;
pub mod documents;
pub mod error;
pub mod session;
pub mod stock_adjust;

// =============================================================================
// Re-exports
// =============================================================================

pub use commit::{CommitOutcome, CommitPipeline};
pub use credit_note::CreditNoteIssuer;
pub use documents::{DocumentError, DocumentGenerator, NoopGenerator};
pub use error::{EngineError, EngineResult};
pub use session::{
    DraftSnapshot, ProductForm, ReconcileSession, SessionState, AUTOSAVE_DEBOUNCE,
};
pub use stock_adjust::StockAdjuster;
