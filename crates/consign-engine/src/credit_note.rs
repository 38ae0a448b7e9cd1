//! # Credit Note Issuer
//!
//! Signed corrections against previously issued (immutable) invoices. A
//! credit note is a side ledger entry: the original invoice's stored
//! totals and all stock positions stay untouched. Multiple notes may
//! target the same invoice; no cumulative ceiling is enforced.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use consign_core::validation::{
    validate_operation_name, validate_quantity, validate_unit_price_cents,
};
use consign_core::CreditNote;
use consign_db::Database;

use crate::documents::DocumentGenerator;
use crate::error::{EngineError, EngineResult};

/// Issues credit notes against existing invoices.
pub struct CreditNoteIssuer {
    db: Database,
}

impl CreditNoteIssuer {
    pub fn new(db: Database) -> Self {
        CreditNoteIssuer { db }
    }

    /// Creates a credit note with `total = quantity × unit_price` and
    /// triggers its document generation (warning-only).
    ///
    /// Returns the note plus any non-fatal warnings.
    pub async fn issue(
        &self,
        generator: &dyn DocumentGenerator,
        invoice_id: &str,
        operation_name: &str,
        unit_price_cents: i64,
        quantity: i64,
    ) -> EngineResult<(CreditNote, Vec<String>)> {
        validate_operation_name(operation_name)?;
        validate_unit_price_cents(unit_price_cents)?;
        validate_quantity(quantity)?;

        let invoice = self
            .db
            .invoices()
            .get_by_id(invoice_id)
            .await?
            .ok_or_else(|| EngineError::InvoiceNotFound(invoice_id.to_string()))?;

        let mut note = CreditNote {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice.id.clone(),
            client_id: invoice.client_id.clone(),
            operation_name: operation_name.trim().to_string(),
            quantity,
            unit_price_cents,
            total_amount_cents: unit_price_cents * quantity,
            pdf_path: None,
            created_at: Utc::now(),
        };
        self.db.credit_notes().insert(&note).await?;

        info!(
            credit_note_id = %note.id,
            invoice_id = %invoice.id,
            total_amount_cents = note.total_amount_cents,
            "Credit note issued"
        );

        let mut warnings = Vec::new();
        match generator.credit_note_pdf(&note).await {
            Ok(path) => {
                match self.db.credit_notes().set_pdf_path(&note.id, &path).await {
                    Ok(true) => note.pdf_path = Some(path),
                    Ok(false) => {}
                    Err(err) => {
                        warn!(credit_note_id = %note.id, error = %err, "Could not record credit note PDF path");
                        warnings.push(format!("credit note PDF path not recorded: {err}"));
                    }
                }
            }
            Err(err) => {
                warn!(credit_note_id = %note.id, error = %err, "Credit note PDF generation failed");
                warnings.push(err.to_string());
            }
        }

        Ok((note, warnings))
    }
}
