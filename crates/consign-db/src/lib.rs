//! # consign-db: Storage Layer for Consign
//!
//! This crate provides database access for the dépôt-vente engine.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Consign Data Flow                                │
//! │                                                                         │
//! │  consign-engine (commit pipeline, sessions)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    consign-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌─────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │   Schema    │  │   │
//! │  │   │   (pool.rs)   │    │ catalog, stock │    │ (embedded)  │  │   │
//! │  │   │               │◄───│ invoice, draft │    │             │  │   │
//! │  │   │ SqlitePool    │    │ credit_note    │    │ idempotent  │  │   │
//! │  │   └───────────────┘    └────────────────┘    └─────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL mode)                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`schema`] - Embedded idempotent schema
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use consign_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/consign.db")).await?;
//!
//! let lines = db.catalog().client_products(&client_id).await?;
//! let history = db.stock_updates().list_for_client(&client_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod pool;
pub mod repository;
pub mod schema;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::catalog::CatalogRepository;
pub use repository::credit_note::CreditNoteRepository;
pub use repository::draft::DraftRepository;
pub use repository::invoice::InvoiceRepository;
pub use repository::stock::StockUpdateRepository;
