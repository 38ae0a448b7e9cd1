//! # Embedded Schema
//!
//! Idempotent DDL for the Consign database, executed at startup.
//!
//! ## How Bootstrap Works
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Schema Bootstrap                                  │
//! │                                                                         │
//! │  App Startup                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config)                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Execute every statement in SCHEMA, in order                           │
//! │  (CREATE TABLE IF NOT EXISTS / CREATE INDEX IF NOT EXISTS)             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  App continues startup                                                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conventions
//! - Every statement is idempotent (safe to run on every startup)
//! - Soft delete via `deleted_at` tombstones; "one live row" invariants
//!   are enforced with partial unique indexes over `deleted_at IS NULL`
//! - `stock_updates` is append-only: no UPDATE/DELETE path exists anywhere
//!   in this crate

use sqlx::SqlitePool;
use tracing::info;

use crate::error::{DbError, DbResult};

/// The full schema, one statement per slice entry.
///
/// SQLite executes one statement per call, so the schema is kept as an
/// ordered list rather than one blob.
const SCHEMA: &[&str] = &[
    // -- Catalogue -----------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS clients (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL,
        created_at  TEXT NOT NULL,
        deleted_at  TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id                        TEXT PRIMARY KEY,
        name                      TEXT NOT NULL,
        price_cents               INTEGER NOT NULL,
        recommended_price_cents   INTEGER,
        barcode                   TEXT,
        created_at                TEXT NOT NULL,
        deleted_at                TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sub_products (
        id          TEXT PRIMARY KEY,
        product_id  TEXT NOT NULL REFERENCES products(id),
        name        TEXT NOT NULL,
        created_at  TEXT NOT NULL,
        deleted_at  TEXT
    )
    "#,
    // -- Per-client stock position ------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS client_products (
        id                                TEXT PRIMARY KEY,
        client_id                         TEXT NOT NULL REFERENCES clients(id),
        product_id                        TEXT NOT NULL REFERENCES products(id),
        custom_price_cents                INTEGER,
        custom_recommended_price_cents    INTEGER,
        current_stock                     INTEGER NOT NULL DEFAULT 0,
        initial_stock                     INTEGER NOT NULL DEFAULT 0,
        display_order                     INTEGER NOT NULL DEFAULT 0,
        created_at                        TEXT NOT NULL,
        deleted_at                        TEXT
    )
    "#,
    // Exactly one live association per (client, product)
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_client_products_live
        ON client_products(client_id, product_id)
        WHERE deleted_at IS NULL
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS client_sub_products (
        id              TEXT PRIMARY KEY,
        client_id       TEXT NOT NULL REFERENCES clients(id),
        sub_product_id  TEXT NOT NULL REFERENCES sub_products(id),
        current_stock   INTEGER NOT NULL DEFAULT 0,
        initial_stock   INTEGER NOT NULL DEFAULT 0,
        created_at      TEXT NOT NULL,
        deleted_at      TEXT
    )
    "#,
    // Exactly one live stock row per (client, sub_product)
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_client_sub_products_live
        ON client_sub_products(client_id, sub_product_id)
        WHERE deleted_at IS NULL
    "#,
    // -- Billing -------------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS invoices (
        id                      TEXT PRIMARY KEY,
        client_id               TEXT NOT NULL REFERENCES clients(id),
        total_stock_sold        INTEGER NOT NULL,
        total_amount_cents      INTEGER NOT NULL,
        discount_bps            INTEGER,
        invoice_pdf_path        TEXT,
        stock_report_pdf_path   TEXT,
        deposit_slip_pdf_path   TEXT,
        created_at              TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS invoice_adjustments (
        id                TEXT PRIMARY KEY,
        invoice_id        TEXT NOT NULL REFERENCES invoices(id),
        operation_name    TEXT NOT NULL,
        unit_price_cents  INTEGER NOT NULL,
        quantity          INTEGER NOT NULL,
        amount_cents      INTEGER NOT NULL,
        created_at        TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS credit_notes (
        id                  TEXT PRIMARY KEY,
        invoice_id          TEXT NOT NULL REFERENCES invoices(id),
        client_id           TEXT NOT NULL REFERENCES clients(id),
        operation_name      TEXT NOT NULL,
        quantity            INTEGER NOT NULL,
        unit_price_cents    INTEGER NOT NULL,
        total_amount_cents  INTEGER NOT NULL,
        pdf_path            TEXT,
        created_at          TEXT NOT NULL
    )
    "#,
    // -- Audit ledger (append-only) ------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS stock_updates (
        id                  TEXT PRIMARY KEY,
        client_id           TEXT NOT NULL REFERENCES clients(id),
        product_id          TEXT REFERENCES products(id),
        sub_product_id      TEXT REFERENCES sub_products(id),
        invoice_id          TEXT REFERENCES invoices(id),
        previous_stock      INTEGER NOT NULL,
        counted_stock       INTEGER NOT NULL,
        stock_sold          INTEGER NOT NULL,
        stock_added         INTEGER NOT NULL,
        new_stock           INTEGER NOT NULL,
        product_info        TEXT,
        unit_price_cents    INTEGER,
        total_amount_cents  INTEGER,
        created_at          TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_stock_updates_client
        ON stock_updates(client_id, created_at)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_stock_updates_invoice
        ON stock_updates(invoice_id)
    "#,
    // -- Draft store ----------------------------------------------------------
    // At most one live draft per client: the client id is the key.
    r#"
    CREATE TABLE IF NOT EXISTS drafts (
        client_id   TEXT PRIMARY KEY REFERENCES clients(id),
        snapshot    TEXT NOT NULL,
        updated_at  TEXT NOT NULL
    )
    "#,
];

/// Runs the embedded schema against the pool.
///
/// ## Safety
/// - Idempotent: safe to run on every startup
/// - Ordered: statements run in declaration order (tables before indexes)
pub async fn run_schema(pool: &SqlitePool) -> DbResult<()> {
    info!("Applying embedded schema");

    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| DbError::SchemaFailed(e.to_string()))?;
    }

    info!(statements = SCHEMA.len(), "Schema up to date");
    Ok(())
}
