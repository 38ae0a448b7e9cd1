//! # Document Generation Boundary
//!
//! PDF rendering lives outside the engine; this module owns only the
//! trigger. Two properties matter here:
//!
//! 1. **Warning-only**: a generation failure never fails or rolls back the
//!    commit that produced the invoice. It surfaces as a `warn!` plus a
//!    warning string on the outcome.
//! 2. **At-most-once paths**: generated paths are recorded through the
//!    first-writer-wins repository setters, so a regenerate request against
//!    an already-written path field is a no-op.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use consign_core::{CreditNote, Invoice};
use consign_db::Database;

/// Document generation failure. Always downgraded to a warning by callers.
#[derive(Debug, Error)]
#[error("document generation failed: {0}")]
pub struct DocumentError(pub String);

/// Collaborator contract for PDF rendering.
///
/// Each method renders one document kind and returns the path it was
/// written to. Implementations live outside this workspace; tests use
/// [`NoopGenerator`].
#[async_trait]
pub trait DocumentGenerator: Send + Sync {
    async fn invoice_pdf(&self, invoice: &Invoice) -> Result<String, DocumentError>;
    async fn stock_report_pdf(&self, invoice: &Invoice) -> Result<String, DocumentError>;
    async fn deposit_slip_pdf(&self, invoice: &Invoice) -> Result<String, DocumentError>;
    async fn credit_note_pdf(&self, note: &CreditNote) -> Result<String, DocumentError>;
}

/// Generator that renders nothing and returns deterministic paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopGenerator;

#[async_trait]
impl DocumentGenerator for NoopGenerator {
    async fn invoice_pdf(&self, invoice: &Invoice) -> Result<String, DocumentError> {
        Ok(format!("invoices/{}.pdf", invoice.id))
    }

    async fn stock_report_pdf(&self, invoice: &Invoice) -> Result<String, DocumentError> {
        Ok(format!("stock-reports/{}.pdf", invoice.id))
    }

    async fn deposit_slip_pdf(&self, invoice: &Invoice) -> Result<String, DocumentError> {
        Ok(format!("deposit-slips/{}.pdf", invoice.id))
    }

    async fn credit_note_pdf(&self, note: &CreditNote) -> Result<String, DocumentError> {
        Ok(format!("credit-notes/{}.pdf", note.id))
    }
}

/// Generates the three invoice documents and records their paths.
///
/// Every failure (generation or path recording) becomes a warning string;
/// the returned vector is empty on full success. The invoice itself is
/// re-read so that already-recorded paths skip generation entirely.
pub async fn generate_invoice_documents(
    db: &Database,
    generator: &dyn DocumentGenerator,
    invoice_id: &str,
) -> Vec<String> {
    let mut warnings = Vec::new();

    let invoice = match db.invoices().get_by_id(invoice_id).await {
        Ok(Some(invoice)) => invoice,
        Ok(None) => {
            warnings.push(format!("invoice {invoice_id} not found for document generation"));
            return warnings;
        }
        Err(err) => {
            warn!(invoice_id = %invoice_id, error = %err, "Could not load invoice for document generation");
            warnings.push(format!("document generation skipped: {err}"));
            return warnings;
        }
    };

    let repo = db.invoices();

    if invoice.invoice_pdf_path.is_none() {
        match generator.invoice_pdf(&invoice).await {
            Ok(path) => {
                debug!(invoice_id = %invoice.id, path = %path, "Invoice PDF generated");
                if let Err(err) = repo.set_invoice_pdf_path(&invoice.id, &path).await {
                    warn!(invoice_id = %invoice.id, error = %err, "Could not record invoice PDF path");
                    warnings.push(format!("invoice PDF path not recorded: {err}"));
                }
            }
            Err(err) => {
                warn!(invoice_id = %invoice.id, error = %err, "Invoice PDF generation failed");
                warnings.push(err.to_string());
            }
        }
    }

    if invoice.stock_report_pdf_path.is_none() {
        match generator.stock_report_pdf(&invoice).await {
            Ok(path) => {
                debug!(invoice_id = %invoice.id, path = %path, "Stock report PDF generated");
                if let Err(err) = repo.set_stock_report_pdf_path(&invoice.id, &path).await {
                    warn!(invoice_id = %invoice.id, error = %err, "Could not record stock report path");
                    warnings.push(format!("stock report PDF path not recorded: {err}"));
                }
            }
            Err(err) => {
                warn!(invoice_id = %invoice.id, error = %err, "Stock report PDF generation failed");
                warnings.push(err.to_string());
            }
        }
    }

    if invoice.deposit_slip_pdf_path.is_none() {
        match generator.deposit_slip_pdf(&invoice).await {
            Ok(path) => {
                debug!(invoice_id = %invoice.id, path = %path, "Deposit slip PDF generated");
                if let Err(err) = repo.set_deposit_slip_pdf_path(&invoice.id, &path).await {
                    warn!(invoice_id = %invoice.id, error = %err, "Could not record deposit slip path");
                    warnings.push(format!("deposit slip PDF path not recorded: {err}"));
                }
            }
            Err(err) => {
                warn!(invoice_id = %invoice.id, error = %err, "Deposit slip PDF generation failed");
                warnings.push(err.to_string());
            }
        }
    }

    warnings
}
