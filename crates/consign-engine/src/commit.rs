//! # Invoice Commit Pipeline
//!
//! The ordered sequence turning a validated session into durable records.
//!
//! ## Pipeline Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   1. Validate every line (re-run, never trust the live preview)         │
//! │   2. Total sold units and sale amount                                   │
//! │   3. Add adjustments, apply optional discount                           │
//! │   4. Reject a negative final total outright (never clamp)               │
//! │   5. Insert the invoice, iff ≥1 real movement or adjustments ≠ 0        │
//! │   6. Append one ledger row per validated line                           │
//! │      (per touched sub-product + parent aggregate; the parent row        │
//! │       is omitted when its aggregate sold == 0)                          │
//! │   7. Insert adjustment rows (only with an invoice)                      │
//! │   8. Mutate stocks: sub-products first, then parent aggregates          │
//! │   9. Delete the client's draft                                          │
//! │  10. Caller clears in-memory state                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Semantics
//! Steps 1-4 fail before any write. From step 5 on there is no rollback:
//! ledger rows are append-only audit facts and are never retracted, so a
//! failure mid-sequence surfaces as an error with whatever already
//! committed left in place. Re-running the reconciliation is safe because
//! it works from "what changed since the last count", not from row ids.

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use consign_core::{
    reconcile_line, validation::validate_discount, ClientProduct, ClientSubProduct, CoreError,
    DiscountRate, Invoice, InvoiceAdjustment, Money, Movement, Product, StockUpdate,
};
use consign_db::{Database, StockUpdateRepository};

use crate::documents::{self, DocumentGenerator};
use crate::error::{EngineError, EngineResult};
use crate::session::DraftSnapshot;

// =============================================================================
// Outcome
// =============================================================================

/// What a successful commit produced.
#[derive(Debug)]
pub struct CommitOutcome {
    /// The created invoice, absent for a session with no real movement and
    /// a zero adjustments total.
    pub invoice: Option<Invoice>,
    pub total_stock_sold: i64,
    /// Final total after adjustments and discount.
    pub final_total: Money,
    /// Non-fatal document generation warnings.
    pub warnings: Vec<String>,
}

// =============================================================================
// Line Plans
// =============================================================================

struct SubPlan {
    row: ClientSubProduct,
    movement: Movement,
}

struct LinePlan {
    line: ClientProduct,
    product: Product,
    /// The product-level movement: the line's own for a plain product, the
    /// field-wise sum for a composed one. `None` when nothing was entered.
    movement: Option<Movement>,
    /// Touched sub-products only.
    sub_plans: Vec<SubPlan>,
    /// All live sub rows, for the parent aggregate recompute.
    sub_rows: Vec<ClientSubProduct>,
    product_info: Option<String>,
    unit_price: Money,
}

// =============================================================================
// Pipeline
// =============================================================================

/// The commit pipeline. Stateless; every run works from the session's form
/// snapshot and the current stored stock positions.
pub struct CommitPipeline;

impl CommitPipeline {
    /// Runs the full pipeline for one client session.
    pub async fn run(
        db: &Database,
        generator: &dyn DocumentGenerator,
        client_id: &str,
        forms: &DraftSnapshot,
        discount: Option<DiscountRate>,
    ) -> EngineResult<CommitOutcome> {
        // Step 1: validation pass, before any write
        let plans = Self::validate(db, client_id, forms).await?;

        let entered_lines = plans.iter().filter(|p| p.movement.is_some()).count();
        if entered_lines == 0 && forms.adjustments.is_empty() {
            return Err(CoreError::NothingToCommit.into());
        }

        // Step 2: totals from the validated lines
        let mut total_stock_sold = 0i64;
        let mut sales_total = Money::zero();
        for plan in &plans {
            if let Some(movement) = plan.movement {
                total_stock_sold += movement.stock_sold;
                sales_total += movement.amount(plan.unit_price);
            }
        }

        // Step 3: adjustments, then discount on the combined total
        let adjustments_total = forms.adjustments.total();
        let before_discount = sales_total + adjustments_total;
        let final_total = match discount {
            Some(rate) => {
                validate_discount(rate)?;
                before_discount - before_discount.discount_amount(rate)
            }
            None => before_discount,
        };

        // Step 4: a negative total is rejected, never clamped
        if final_total.is_negative() {
            return Err(CoreError::NegativeInvoiceTotal { total: final_total }.into());
        }

        // Step 5: one invoice, iff the session actually changed something
        let has_real_movement = plans
            .iter()
            .any(|p| p.movement.map_or(false, |m| !m.is_noop()));
        let invoice = if has_real_movement || !adjustments_total.is_zero() {
            let invoice = Invoice {
                id: Uuid::new_v4().to_string(),
                client_id: client_id.to_string(),
                total_stock_sold,
                total_amount_cents: final_total.cents(),
                discount_bps: discount.map(|d| d.bps()),
                invoice_pdf_path: None,
                stock_report_pdf_path: None,
                deposit_slip_pdf_path: None,
                created_at: Utc::now(),
            };
            db.invoices().insert_invoice(&invoice).await?;
            info!(
                invoice_id = %invoice.id,
                client_id = %client_id,
                total_stock_sold,
                total_amount_cents = invoice.total_amount_cents,
                "Invoice created"
            );
            Some(invoice)
        } else {
            debug!(client_id = %client_id, "Zero-movement session, no invoice created");
            None
        };

        // Step 6: append-only ledger rows, before the stocks they justify
        let now = StockUpdateRepository::now();
        let ledger = db.stock_updates();
        for plan in &plans {
            let Some(movement) = plan.movement else {
                continue;
            };

            // Every row of an invoice-bearing commit carries the invoice
            // id, noop lines included; null means no invoice was created
            let attached_invoice_id = invoice.as_ref().map(|inv| inv.id.clone());

            for sub_plan in &plan.sub_plans {
                ledger
                    .insert(&sub_update_row(
                        client_id,
                        &sub_plan.row.sub_product_id,
                        attached_invoice_id.clone(),
                        &sub_plan.movement,
                        now,
                    ))
                    .await?;
            }

            // The parent aggregate row is omitted when nothing sold at the
            // parent level, even for replenishment-only sub movements
            let composed = !plan.sub_rows.is_empty();
            if composed && movement.stock_sold == 0 {
                continue;
            }

            ledger
                .insert(&product_update_row(
                    client_id,
                    &plan.product.id,
                    attached_invoice_id,
                    &movement,
                    plan.product_info.clone(),
                    plan.unit_price,
                    now,
                ))
                .await?;
        }

        // Step 7: adjustment rows exist only under an invoice
        if let Some(invoice) = &invoice {
            for adjustment in forms.adjustments.entries() {
                db.invoices()
                    .insert_adjustment(&InvoiceAdjustment {
                        id: Uuid::new_v4().to_string(),
                        invoice_id: invoice.id.clone(),
                        operation_name: adjustment.operation_name.clone(),
                        unit_price_cents: adjustment.unit_price.cents(),
                        quantity: adjustment.quantity,
                        amount_cents: adjustment.amount().cents(),
                        created_at: now,
                    })
                    .await?;
            }
        }

        // Step 8: stocks, sub-products first
        let catalog = db.catalog();
        for plan in &plans {
            for sub_plan in &plan.sub_plans {
                catalog
                    .set_sub_product_stock(&sub_plan.row.id, sub_plan.movement.new_stock)
                    .await?;
            }
        }
        for plan in &plans {
            let Some(movement) = plan.movement else {
                continue;
            };
            let new_stock = if plan.sub_rows.is_empty() {
                movement.new_stock
            } else {
                parent_aggregate_stock(&plan.sub_rows, &plan.sub_plans)
            };
            catalog.set_product_stock(&plan.line.id, new_stock).await?;
        }

        // Step 9: the session's draft is spent
        db.drafts().delete(client_id).await?;

        // Post-commit document generation, warning-only
        let warnings = match &invoice {
            Some(invoice) => {
                documents::generate_invoice_documents(db, generator, &invoice.id).await
            }
            None => Vec::new(),
        };

        Ok(CommitOutcome {
            invoice,
            total_stock_sold,
            final_total,
            warnings,
        })
    }

    /// Step 1: turns the form into validated per-line plans without
    /// writing anything.
    async fn validate(
        db: &Database,
        client_id: &str,
        forms: &DraftSnapshot,
    ) -> EngineResult<Vec<LinePlan>> {
        let catalog = db.catalog();
        let mut plans = Vec::new();

        for line in catalog.client_products(client_id).await? {
            let product = catalog
                .get_product(&line.product_id)
                .await?
                .ok_or_else(|| EngineError::ProductNotFound(line.product_id.clone()))?;
            let sub_rows = catalog
                .ensure_sub_product_rows(client_id, &line.product_id)
                .await?;
            let form = forms.product_forms.get(&line.product_id);
            let unit_price = line.effective_price(&product);
            let product_info = form.and_then(|f| f.product_info.clone());

            let (movement, sub_plans) = if sub_rows.is_empty() {
                let input = form.map(|f| f.input.clone()).unwrap_or_default();
                let movement = reconcile_line(&product.name, line.current_stock, &input)?;
                (movement, Vec::new())
            } else {
                let subs = catalog.sub_products_of(&line.product_id).await?;
                let mut parts = Vec::new();
                let mut sub_plans = Vec::new();

                for row in &sub_rows {
                    let name = subs
                        .iter()
                        .find(|s| s.id == row.sub_product_id)
                        .map(|s| s.name.as_str())
                        .unwrap_or("sous-produit");
                    let label = format!("{} / {}", product.name, name);
                    let input = form
                        .and_then(|f| f.sub_inputs.get(&row.sub_product_id))
                        .cloned()
                        .unwrap_or_default();

                    match reconcile_line(&label, row.current_stock, &input)? {
                        Some(movement) => {
                            parts.push(movement);
                            sub_plans.push(SubPlan {
                                row: row.clone(),
                                movement,
                            });
                        }
                        // An untouched sub still contributes its stock to
                        // every parent total
                        None => parts.push(Movement::untouched(row.current_stock)),
                    }
                }

                let movement = if sub_plans.is_empty() {
                    None
                } else {
                    Some(Movement::aggregate(&parts))
                };
                (movement, sub_plans)
            };

            plans.push(LinePlan {
                line,
                product,
                movement,
                sub_plans,
                sub_rows,
                product_info,
                unit_price,
            });
        }

        Ok(plans)
    }
}

// =============================================================================
// Row Builders
// =============================================================================

fn product_update_row(
    client_id: &str,
    product_id: &str,
    invoice_id: Option<String>,
    movement: &Movement,
    product_info: Option<String>,
    unit_price: Money,
    now: DateTime<Utc>,
) -> StockUpdate {
    // Billing figures only on invoice-bearing rows that actually sold
    let priced = invoice_id.is_some() && movement.stock_sold > 0;

    StockUpdate {
        id: StockUpdateRepository::generate_id(),
        client_id: client_id.to_string(),
        product_id: Some(product_id.to_string()),
        sub_product_id: None,
        invoice_id,
        previous_stock: movement.previous_stock,
        counted_stock: movement.counted_stock,
        stock_sold: movement.stock_sold,
        stock_added: movement.stock_added,
        new_stock: movement.new_stock,
        product_info,
        unit_price_cents: priced.then(|| unit_price.cents()),
        total_amount_cents: priced.then(|| movement.amount(unit_price).cents()),
        created_at: now,
    }
}

fn sub_update_row(
    client_id: &str,
    sub_product_id: &str,
    invoice_id: Option<String>,
    movement: &Movement,
    now: DateTime<Utc>,
) -> StockUpdate {
    StockUpdate {
        id: StockUpdateRepository::generate_id(),
        client_id: client_id.to_string(),
        product_id: None,
        sub_product_id: Some(sub_product_id.to_string()),
        invoice_id,
        previous_stock: movement.previous_stock,
        counted_stock: movement.counted_stock,
        stock_sold: movement.stock_sold,
        stock_added: movement.stock_added,
        new_stock: movement.new_stock,
        // Notes and billing figures live on product-level rows only
        product_info: None,
        unit_price_cents: None,
        total_amount_cents: None,
        created_at: now,
    }
}

/// Parent aggregate = sum of sub stocks, taking each touched sub's new
/// value and each untouched sub's stored one.
fn parent_aggregate_stock(sub_rows: &[ClientSubProduct], sub_plans: &[SubPlan]) -> i64 {
    sub_rows
        .iter()
        .map(|row| {
            sub_plans
                .iter()
                .find(|p| p.row.id == row.id)
                .map_or(row.current_stock, |p| p.movement.new_stock)
        })
        .sum()
}
