//! End-to-end reconciliation scenarios: session → commit pipeline →
//! stored invoice, ledger rows, and stock positions.

use std::time::Instant;

use consign_core::{CoreError, DiscountRate, LineInput};
use consign_db::{Database, DbConfig};
use consign_engine::{
    CreditNoteIssuer, EngineError, NoopGenerator, ReconcileSession, SessionState, StockAdjuster,
    AUTOSAVE_DEBOUNCE,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// One client with one plain product (Miel, 2.00 €) at the given stock.
async fn setup_plain(stock: i64) -> (Database, String, String) {
    init_tracing();
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let catalog = db.catalog();

    let client = catalog.insert_client("Épicerie du Port").await.unwrap();
    let product = catalog
        .insert_product("Miel toutes fleurs 500g", 200, None, None)
        .await
        .unwrap();
    catalog
        .associate_product(&client.id, &product.id, stock, None, 0)
        .await
        .unwrap();

    (db, client.id, product.id)
}

/// One client with a composed product (price 2.00 €): sub A at stock 5,
/// sub B at stock 3, parent aggregate 8.
async fn setup_composed() -> (Database, String, String, String, String) {
    init_tracing();
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let catalog = db.catalog();

    let client = catalog.insert_client("Ferme des Lilas").await.unwrap();
    let product = catalog
        .insert_product("Confiture", 200, None, None)
        .await
        .unwrap();
    let sub_a = catalog
        .insert_sub_product(&product.id, "Fraise")
        .await
        .unwrap();
    let sub_b = catalog
        .insert_sub_product(&product.id, "Abricot")
        .await
        .unwrap();

    let cp = catalog
        .associate_product(&client.id, &product.id, 0, None, 0)
        .await
        .unwrap();

    let row_a = catalog
        .get_client_sub_product(&client.id, &sub_a.id)
        .await
        .unwrap()
        .unwrap();
    let row_b = catalog
        .get_client_sub_product(&client.id, &sub_b.id)
        .await
        .unwrap()
        .unwrap();
    catalog.set_sub_product_stock(&row_a.id, 5).await.unwrap();
    catalog.set_sub_product_stock(&row_b.id, 3).await.unwrap();
    catalog.set_product_stock(&cp.id, 8).await.unwrap();

    (db, client.id, product.id, sub_a.id, sub_b.id)
}

// =============================================================================
// Commit Scenarios
// =============================================================================

#[tokio::test]
async fn scenario_a_plain_product_commit() {
    let (db, client_id, product_id) = setup_plain(50).await;

    let mut session = ReconcileSession::open(db.clone(), &client_id).await.unwrap();
    session
        .set_product_input(&product_id, LineInput::new("10", "40"))
        .unwrap();

    let outcome = session.commit(&NoopGenerator, None).await.unwrap();
    assert_eq!(outcome.total_stock_sold, 40);
    assert_eq!(outcome.final_total.cents(), 8000);
    assert!(outcome.warnings.is_empty());

    let invoice = outcome.invoice.unwrap();
    assert_eq!(invoice.total_stock_sold, 40);
    assert_eq!(invoice.total_amount_cents, 8000);
    assert!(invoice.discount_bps.is_none());

    // Documents were generated and their paths recorded at most once
    let stored = db.invoices().get_by_id(&invoice.id).await.unwrap().unwrap();
    assert!(stored.invoice_pdf_path.is_some());
    assert!(stored.stock_report_pdf_path.is_some());
    assert!(stored.deposit_slip_pdf_path.is_some());

    let rows = db.stock_updates().list_for_invoice(&invoice.id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].previous_stock, 50);
    assert_eq!(rows[0].counted_stock, 10);
    assert_eq!(rows[0].stock_sold, 40);
    assert_eq!(rows[0].stock_added, 30);
    assert_eq!(rows[0].new_stock, 40);
    assert_eq!(rows[0].unit_price_cents, Some(200));
    assert_eq!(rows[0].total_amount_cents, Some(8000));

    let cp = db
        .catalog()
        .get_client_product(&client_id, &product_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cp.current_stock, 40);

    // Session landed back on Clean with the draft gone
    assert_eq!(session.state(), SessionState::Clean);
    assert!(db.drafts().load(&client_id).await.unwrap().is_none());
}

#[tokio::test]
async fn scenario_c_sub_product_aggregation_commit() {
    let (db, client_id, product_id, sub_a, sub_b) = setup_composed().await;

    let mut session = ReconcileSession::open(db.clone(), &client_id).await.unwrap();
    session
        .set_sub_product_input(&product_id, &sub_a, LineInput::new("2", "10"))
        .unwrap();

    let outcome = session.commit(&NoopGenerator, None).await.unwrap();
    let invoice = outcome.invoice.unwrap();
    // Parent: prev 5+3=8, counted 2+3=5, sold 3, new 10+3=13
    assert_eq!(invoice.total_stock_sold, 3);
    assert_eq!(invoice.total_amount_cents, 600);

    let rows = db.stock_updates().list_for_invoice(&invoice.id).await.unwrap();
    assert_eq!(rows.len(), 2);

    let sub_row = rows.iter().find(|r| r.sub_product_id.is_some()).unwrap();
    assert_eq!(sub_row.sub_product_id.as_deref(), Some(sub_a.as_str()));
    assert_eq!(sub_row.stock_sold, 3);
    assert_eq!(sub_row.new_stock, 10);
    assert!(sub_row.unit_price_cents.is_none());

    let parent_row = rows.iter().find(|r| r.product_id.is_some()).unwrap();
    assert_eq!(parent_row.previous_stock, 8);
    assert_eq!(parent_row.counted_stock, 5);
    assert_eq!(parent_row.stock_sold, 3);
    assert_eq!(parent_row.new_stock, 13);
    assert_eq!(parent_row.unit_price_cents, Some(200));
    assert_eq!(parent_row.total_amount_cents, Some(600));

    // Parent stock equals the sum of its sub-product stocks
    let catalog = db.catalog();
    let cp = catalog
        .get_client_product(&client_id, &product_id)
        .await
        .unwrap()
        .unwrap();
    let sub_rows = catalog
        .client_sub_products(&client_id, &product_id)
        .await
        .unwrap();
    let sum: i64 = sub_rows.iter().map(|r| r.current_stock).sum();
    assert_eq!(cp.current_stock, 13);
    assert_eq!(cp.current_stock, sum);

    // Untouched sub B moved nothing and got no ledger row
    assert!(rows.iter().all(|r| r.sub_product_id.as_deref() != Some(sub_b.as_str())));
}

#[tokio::test]
async fn replenishment_only_sub_movement_omits_parent_row() {
    let (db, client_id, product_id, sub_a, _) = setup_composed().await;

    let mut session = ReconcileSession::open(db.clone(), &client_id).await.unwrap();
    // Counted equals previous, deposit raised: sold 0, added 5
    session
        .set_sub_product_input(&product_id, &sub_a, LineInput::new("5", "10"))
        .unwrap();

    let outcome = session.commit(&NoopGenerator, None).await.unwrap();
    let invoice = outcome.invoice.unwrap();
    assert_eq!(invoice.total_stock_sold, 0);
    assert_eq!(invoice.total_amount_cents, 0);

    // Only the sub row; the parent sold nothing and gets no ledger line
    let rows = db.stock_updates().list_for_invoice(&invoice.id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].sub_product_id.is_some());

    // The parent aggregate stock is still refreshed
    let cp = db
        .catalog()
        .get_client_product(&client_id, &product_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cp.current_stock, 13);
}

#[tokio::test]
async fn scenario_d_adjustment_only_negative_total_rejected() {
    let (db, client_id, _) = setup_plain(50).await;

    let mut session = ReconcileSession::open(db.clone(), &client_id).await.unwrap();
    session.add_adjustment("Reprise pots cassés", 500, 4).unwrap();

    let err = session.commit(&NoopGenerator, None).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::NegativeInvoiceTotal { .. })
    ));

    // Rejected before any write
    assert!(db.invoices().list_for_client(&client_id).await.unwrap().is_empty());
    assert!(db.stock_updates().list_for_client(&client_id).await.unwrap().is_empty());

    // Session state survives for correction
    assert_eq!(session.adjustments().len(), 1);
}

#[tokio::test]
async fn adjustments_and_discount_compose_into_the_total() {
    let (db, client_id, product_id) = setup_plain(50).await;

    let mut session = ReconcileSession::open(db.clone(), &client_id).await.unwrap();
    session
        .set_product_input(&product_id, LineInput::new("10", "40"))
        .unwrap();
    session.add_adjustment("Reprise pots cassés", 500, 4).unwrap();

    // (8000 − 2000) × 90% = 5400
    let outcome = session
        .commit(&NoopGenerator, Some(DiscountRate::from_bps(1000)))
        .await
        .unwrap();
    assert_eq!(outcome.final_total.cents(), 5400);

    let invoice = outcome.invoice.unwrap();
    assert_eq!(invoice.total_amount_cents, 5400);
    assert_eq!(invoice.discount_bps, Some(1000));

    let adjustments = db.invoices().list_adjustments(&invoice.id).await.unwrap();
    assert_eq!(adjustments.len(), 1);
    assert_eq!(adjustments[0].unit_price_cents, -500);
    assert_eq!(adjustments[0].amount_cents, -2000);
}

#[tokio::test]
async fn unpaired_field_is_rejected_and_writes_nothing() {
    let (db, client_id, product_id) = setup_plain(50).await;

    let mut session = ReconcileSession::open(db.clone(), &client_id).await.unwrap();
    session
        .set_product_input(&product_id, LineInput::new("10", ""))
        .unwrap();

    let err = session.commit(&NoopGenerator, None).await.unwrap_err();
    assert!(matches!(err, EngineError::Core(CoreError::Validation(_))));

    assert!(db.invoices().list_for_client(&client_id).await.unwrap().is_empty());
    assert!(db.stock_updates().list_for_client(&client_id).await.unwrap().is_empty());

    let cp = db
        .catalog()
        .get_client_product(&client_id, &product_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cp.current_stock, 50);
}

#[tokio::test]
async fn noop_session_creates_no_invoice() {
    let (db, client_id, product_id) = setup_plain(50).await;

    let mut session = ReconcileSession::open(db.clone(), &client_id).await.unwrap();
    session
        .set_product_input(&product_id, LineInput::new("50", "50"))
        .unwrap();

    let outcome = session.commit(&NoopGenerator, None).await.unwrap();
    assert!(outcome.invoice.is_none());
    assert_eq!(outcome.total_stock_sold, 0);
    assert_eq!(outcome.final_total.cents(), 0);

    // The entered count is still an audit fact, just invoice-less
    let rows = db.stock_updates().list_for_client(&client_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].invoice_id.is_none());
    assert!(rows[0].unit_price_cents.is_none());
    assert!(db.invoices().list_for_client(&client_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn noop_line_in_an_invoiced_commit_carries_the_invoice_id() {
    let (db, client_id, product_id) = setup_plain(50).await;

    let catalog = db.catalog();
    let second = catalog
        .insert_product("Savon lavande", 450, None, None)
        .await
        .unwrap();
    catalog
        .associate_product(&client_id, &second.id, 20, None, 1)
        .await
        .unwrap();

    let mut session = ReconcileSession::open(db.clone(), &client_id).await.unwrap();
    session
        .set_product_input(&product_id, LineInput::new("10", "40"))
        .unwrap();
    // Counted equals previous with nothing restocked: a recorded non-movement
    session
        .set_product_input(&second.id, LineInput::new("20", "20"))
        .unwrap();

    let outcome = session.commit(&NoopGenerator, None).await.unwrap();
    let invoice = outcome.invoice.unwrap();
    assert_eq!(invoice.total_stock_sold, 40);

    // Both counted lines belong to this commit's invoice
    let rows = db.stock_updates().list_for_invoice(&invoice.id).await.unwrap();
    assert_eq!(rows.len(), 2);

    let still_row = rows
        .iter()
        .find(|r| r.product_id.as_deref() == Some(second.id.as_str()))
        .unwrap();
    assert_eq!(still_row.stock_sold, 0);
    assert_eq!(still_row.new_stock, 20);
    // Unsold lines stay unpriced even under an invoice
    assert!(still_row.unit_price_cents.is_none());
    assert!(still_row.total_amount_cents.is_none());
}

#[tokio::test]
async fn failure_after_invoice_creation_keeps_committed_records() {
    let (db, client_id, product_id) = setup_plain(50).await;

    let mut session = ReconcileSession::open(db.clone(), &client_id).await.unwrap();
    session
        .set_product_input(&product_id, LineInput::new("10", "40"))
        .unwrap();

    // Break the draft-delete step; every write before it still goes through
    sqlx::query("DROP TABLE drafts")
        .execute(db.pool())
        .await
        .unwrap();

    let err = session.commit(&NoopGenerator, None).await.unwrap_err();
    assert!(matches!(err, EngineError::Db(_)));

    // No rollback: the invoice, its ledger row, and the stock mutation stay
    let invoices = db.invoices().list_for_client(&client_id).await.unwrap();
    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0].total_amount_cents, 8000);

    let rows = db
        .stock_updates()
        .list_for_invoice(&invoices[0].id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].stock_sold, 40);

    let cp = db
        .catalog()
        .get_client_product(&client_id, &product_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cp.current_stock, 40);
}

#[tokio::test]
async fn empty_session_has_nothing_to_commit() {
    let (db, client_id, _) = setup_plain(50).await;

    let mut session = ReconcileSession::open(db, &client_id).await.unwrap();
    let err = session.commit(&NoopGenerator, None).await.unwrap_err();
    assert!(matches!(err, EngineError::Core(CoreError::NothingToCommit)));
}

// =============================================================================
// Draft Lifecycle
// =============================================================================

#[tokio::test]
async fn meaningful_draft_roundtrips_through_resume() {
    let (db, client_id, product_id) = setup_plain(50).await;

    let mut session = ReconcileSession::open(db.clone(), &client_id).await.unwrap();
    session
        .set_product_input(&product_id, LineInput::new("10", "40"))
        .unwrap();
    session.add_adjustment("Reprise", 100, 1).unwrap();
    assert!(session.flush_draft().await.unwrap());

    // A reopened session parks on the decision and blocks edits
    let mut reopened = ReconcileSession::open(db.clone(), &client_id).await.unwrap();
    assert_eq!(reopened.state(), SessionState::PendingDecision);
    assert!(reopened.has_pending_draft());
    let err = reopened
        .set_product_input(&product_id, LineInput::new("1", "1"))
        .unwrap_err();
    assert!(matches!(err, EngineError::DraftDecisionPending));

    // Resume restores the exact saved state
    reopened.resume_draft().unwrap();
    assert_eq!(reopened.state(), SessionState::Dirty);
    let form = reopened.forms().product_forms.get(&product_id).unwrap();
    assert_eq!(form.input, LineInput::new("10", "40"));
    assert_eq!(reopened.adjustments().len(), 1);
}

#[tokio::test]
async fn non_meaningful_draft_is_not_offered() {
    let (db, client_id, product_id) = setup_plain(50).await;

    let mut session = ReconcileSession::open(db.clone(), &client_id).await.unwrap();
    session
        .set_product_input(
            &product_id,
            LineInput {
                counted_stock: Some("  ".to_string()),
                new_deposit: Some(String::new()),
            },
        )
        .unwrap();
    assert!(session.flush_draft().await.unwrap());

    let reopened = ReconcileSession::open(db, &client_id).await.unwrap();
    assert_eq!(reopened.state(), SessionState::Clean);
    assert!(!reopened.has_pending_draft());
}

#[tokio::test]
async fn discard_deletes_draft_and_seeds_notes_from_history() {
    let (db, client_id, product_id) = setup_plain(50).await;

    // A committed session leaves a product_info note in the ledger
    let mut first = ReconcileSession::open(db.clone(), &client_id).await.unwrap();
    first
        .set_product_input(&product_id, LineInput::new("10", "40"))
        .unwrap();
    first
        .set_product_info(&product_id, Some("cartons de 12".to_string()))
        .unwrap();
    first.commit(&NoopGenerator, None).await.unwrap();

    // Leave a meaningful draft behind
    let mut second = ReconcileSession::open(db.clone(), &client_id).await.unwrap();
    second
        .set_product_input(&product_id, LineInput::new("5", "5"))
        .unwrap();
    assert!(second.flush_draft().await.unwrap());

    let mut reopened = ReconcileSession::open(db.clone(), &client_id).await.unwrap();
    assert!(reopened.has_pending_draft());
    reopened.discard_draft().await.unwrap();

    assert_eq!(reopened.state(), SessionState::Clean);
    assert!(db.drafts().load(&client_id).await.unwrap().is_none());

    // Defaults reset, with the note seeded from the prior ledger row
    let form = reopened.forms().product_forms.get(&product_id).unwrap();
    assert!(form.input.is_empty());
    assert_eq!(form.product_info.as_deref(), Some("cartons de 12"));
}

#[tokio::test]
async fn autosave_respects_debounce_and_suspension() {
    let (db, client_id, product_id) = setup_plain(50).await;

    let mut session = ReconcileSession::open(db.clone(), &client_id).await.unwrap();
    session
        .set_product_input(&product_id, LineInput::new("10", "40"))
        .unwrap();

    // Not due immediately after the edit, due once the window elapsed
    let now = Instant::now();
    assert!(!session.autosave_due(now));
    assert!(session.autosave_due(now + AUTOSAVE_DEBOUNCE));

    assert!(session.flush_draft().await.unwrap());

    // The pending-decision phase suspends autosave entirely
    let reopened = ReconcileSession::open(db, &client_id).await.unwrap();
    assert!(reopened.has_pending_draft());
    assert!(!reopened.autosave_due(Instant::now() + AUTOSAVE_DEBOUNCE));
}

// =============================================================================
// Manual Adjustment & Credit Notes
// =============================================================================

#[tokio::test]
async fn manual_product_adjustment_is_never_a_sale() {
    let (db, client_id, product_id) = setup_plain(20).await;

    let adjuster = StockAdjuster::new(db.clone());
    let movement = adjuster
        .adjust_product_stock(&client_id, &product_id, 12)
        .await
        .unwrap();
    assert_eq!(movement.stock_sold, 0);
    assert_eq!(movement.stock_added, -8);

    let rows = db.stock_updates().list_for_client(&client_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].invoice_id.is_none());
    assert_eq!(rows[0].stock_added, -8);

    let cp = db
        .catalog()
        .get_client_product(&client_id, &product_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cp.current_stock, 12);
}

#[tokio::test]
async fn manual_sub_adjustment_refreshes_the_parent() {
    let (db, client_id, product_id, sub_a, _) = setup_composed().await;

    let adjuster = StockAdjuster::new(db.clone());
    adjuster
        .adjust_sub_product_stock(&client_id, &sub_a, 9)
        .await
        .unwrap();

    // Both the sub row and the parent row are written, invoice-less
    let rows = db.stock_updates().list_for_client(&client_id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.invoice_id.is_none()));
    let parent_row = rows.iter().find(|r| r.product_id.is_some()).unwrap();
    assert_eq!(parent_row.previous_stock, 8);
    assert_eq!(parent_row.new_stock, 12);
    assert_eq!(parent_row.stock_sold, 0);

    let catalog = db.catalog();
    let cp = catalog
        .get_client_product(&client_id, &product_id)
        .await
        .unwrap()
        .unwrap();
    let sum: i64 = catalog
        .client_sub_products(&client_id, &product_id)
        .await
        .unwrap()
        .iter()
        .map(|r| r.current_stock)
        .sum();
    assert_eq!(cp.current_stock, 12);
    assert_eq!(cp.current_stock, sum);

    // The parent's own stock is a derived aggregate, never edited directly
    let err = adjuster
        .adjust_product_stock(&client_id, &product_id, 99)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AggregatedProduct { .. }));
}

#[tokio::test]
async fn credit_note_is_a_side_ledger() {
    let (db, client_id, product_id) = setup_plain(50).await;

    let mut session = ReconcileSession::open(db.clone(), &client_id).await.unwrap();
    session
        .set_product_input(&product_id, LineInput::new("10", "40"))
        .unwrap();
    let invoice = session
        .commit(&NoopGenerator, None)
        .await
        .unwrap()
        .invoice
        .unwrap();

    let issuer = CreditNoteIssuer::new(db.clone());
    let (note, warnings) = issuer
        .issue(&NoopGenerator, &invoice.id, "Avoir casse livraison", 300, 2)
        .await
        .unwrap();
    assert!(warnings.is_empty());
    assert_eq!(note.total_amount_cents, 600);
    assert!(note.pdf_path.is_some());

    // The original invoice and stock positions are untouched
    let stored = db.invoices().get_by_id(&invoice.id).await.unwrap().unwrap();
    assert_eq!(stored.total_amount_cents, 8000);
    let cp = db
        .catalog()
        .get_client_product(&client_id, &product_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cp.current_stock, 40);

    // Issuance validates its inputs
    assert!(issuer
        .issue(&NoopGenerator, &invoice.id, "", 300, 2)
        .await
        .is_err());
    assert!(issuer
        .issue(&NoopGenerator, &invoice.id, "Avoir", 300, 0)
        .await
        .is_err());
    assert!(issuer
        .issue(&NoopGenerator, "missing", "Avoir", 300, 2)
        .await
        .is_err());
}
