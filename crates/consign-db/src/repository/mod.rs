//! # Repository Module
//!
//! Repository implementations for database operations.
//!
//! ## Repository Pattern
//! Each repository:
//! - Owns a clone of the shared connection pool
//! - Exposes domain-typed async methods (no raw rows leak out)
//! - Filters soft-deleted rows in its queries, so callers never repeat it
//!
//! ## Repositories
//! - [`catalog`] - Clients, products, sub-products, per-client stock rows
//! - [`stock`] - Append-only StockUpdate audit ledger
//! - [`invoice`] - Invoices and persisted adjustments
//! - [`credit_note`] - Credit notes
//! - [`draft`] - Per-client draft snapshots

pub mod catalog;
pub mod credit_note;
pub mod draft;
pub mod invoice;
pub mod stock;
