//! # Credit Note Repository
//!
//! Database operations for credit notes: signed corrections issued against
//! previously issued (immutable) invoices. A credit note is a side ledger;
//! nothing here touches the original invoice's stored totals or any stock
//! position.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use consign_core::CreditNote;

/// Repository for credit note database operations.
#[derive(Debug, Clone)]
pub struct CreditNoteRepository {
    pool: SqlitePool,
}

impl CreditNoteRepository {
    /// Creates a new CreditNoteRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CreditNoteRepository { pool }
    }

    /// Inserts a credit note.
    pub async fn insert(&self, note: &CreditNote) -> DbResult<()> {
        debug!(
            id = %note.id,
            invoice_id = %note.invoice_id,
            total_amount_cents = note.total_amount_cents,
            "Inserting credit note"
        );

        sqlx::query(
            r#"
            INSERT INTO credit_notes (
                id, invoice_id, client_id, operation_name,
                quantity, unit_price_cents, total_amount_cents, pdf_path, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&note.id)
        .bind(&note.invoice_id)
        .bind(&note.client_id)
        .bind(&note.operation_name)
        .bind(note.quantity)
        .bind(note.unit_price_cents)
        .bind(note.total_amount_cents)
        .bind(&note.pdf_path)
        .bind(note.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists the credit notes issued against an invoice, oldest first.
    ///
    /// Multiple notes per invoice are permitted; no cumulative ceiling is
    /// enforced.
    pub async fn list_for_invoice(&self, invoice_id: &str) -> DbResult<Vec<CreditNote>> {
        let notes = sqlx::query_as::<_, CreditNote>(
            r#"
            SELECT * FROM credit_notes
            WHERE invoice_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(notes)
    }

    /// Records the credit note PDF path, first-writer-wins.
    pub async fn set_pdf_path(&self, credit_note_id: &str, path: &str) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE credit_notes SET pdf_path = ?2 WHERE id = ?1 AND pdf_path IS NULL",
        )
        .bind(credit_note_id)
        .bind(path)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
