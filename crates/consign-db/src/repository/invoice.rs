//! # Invoice Repository
//!
//! Database operations for invoices and their persisted adjustments.
//!
//! ## Document Path Immutability
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Generated-document paths are written AT MOST ONCE.                     │
//! │                                                                         │
//! │  set_invoice_pdf_path("a.pdf")   → path = "a.pdf"   (first writer)     │
//! │  set_invoice_pdf_path("b.pdf")   → no-op            (already set)      │
//! │                                                                         │
//! │  Enforced with UPDATE ... WHERE <path> IS NULL, so the guarantee       │
//! │  holds even across concurrent generation attempts.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use consign_core::{Invoice, InvoiceAdjustment};

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Inserts an invoice.
    pub async fn insert_invoice(&self, invoice: &Invoice) -> DbResult<()> {
        debug!(
            id = %invoice.id,
            client_id = %invoice.client_id,
            total_amount_cents = invoice.total_amount_cents,
            "Inserting invoice"
        );

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, client_id, total_stock_sold, total_amount_cents, discount_bps,
                invoice_pdf_path, stock_report_pdf_path, deposit_slip_pdf_path, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.client_id)
        .bind(invoice.total_stock_sold)
        .bind(invoice.total_amount_cents)
        .bind(invoice.discount_bps)
        .bind(&invoice.invoice_pdf_path)
        .bind(&invoice.stock_report_pdf_path)
        .bind(&invoice.deposit_slip_pdf_path)
        .bind(invoice.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets an invoice by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(invoice)
    }

    /// Lists a client's invoices, newest first.
    pub async fn list_for_client(&self, client_id: &str) -> DbResult<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(
            "SELECT * FROM invoices WHERE client_id = ?1 ORDER BY created_at DESC",
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }

    /// Inserts one persisted reprise-de-stock line.
    pub async fn insert_adjustment(&self, adjustment: &InvoiceAdjustment) -> DbResult<()> {
        debug!(
            invoice_id = %adjustment.invoice_id,
            operation_name = %adjustment.operation_name,
            amount_cents = adjustment.amount_cents,
            "Inserting invoice adjustment"
        );

        sqlx::query(
            r#"
            INSERT INTO invoice_adjustments (
                id, invoice_id, operation_name, unit_price_cents, quantity, amount_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&adjustment.id)
        .bind(&adjustment.invoice_id)
        .bind(&adjustment.operation_name)
        .bind(adjustment.unit_price_cents)
        .bind(adjustment.quantity)
        .bind(adjustment.amount_cents)
        .bind(adjustment.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists an invoice's persisted adjustments, oldest first.
    pub async fn list_adjustments(&self, invoice_id: &str) -> DbResult<Vec<InvoiceAdjustment>> {
        let adjustments = sqlx::query_as::<_, InvoiceAdjustment>(
            r#"
            SELECT * FROM invoice_adjustments
            WHERE invoice_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(adjustments)
    }

    /// Records the invoice PDF path, first-writer-wins.
    ///
    /// ## Returns
    /// `true` when this call wrote the path, `false` when a path was
    /// already present (the call is then a no-op).
    pub async fn set_invoice_pdf_path(&self, invoice_id: &str, path: &str) -> DbResult<bool> {
        self.set_path("invoice_pdf_path", invoice_id, path).await
    }

    /// Records the stock report PDF path, first-writer-wins.
    pub async fn set_stock_report_pdf_path(&self, invoice_id: &str, path: &str) -> DbResult<bool> {
        self.set_path("stock_report_pdf_path", invoice_id, path).await
    }

    /// Records the deposit slip PDF path, first-writer-wins.
    pub async fn set_deposit_slip_pdf_path(&self, invoice_id: &str, path: &str) -> DbResult<bool> {
        self.set_path("deposit_slip_pdf_path", invoice_id, path).await
    }

    // Column name comes from the three callers above, never from input.
    async fn set_path(&self, column: &str, invoice_id: &str, path: &str) -> DbResult<bool> {
        let sql = format!(
            "UPDATE invoices SET {column} = ?2 WHERE id = ?1 AND {column} IS NULL"
        );

        let result = sqlx::query(&sql)
            .bind(invoice_id)
            .bind(path)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
