//! # Draft Session Manager
//!
//! Per-client reconciliation session: form state, the pending adjustment
//! ledger, and the debounced draft autosave.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Session Lifecycle                                │
//! │                                                                         │
//! │  open()                                                                 │
//! │    │                                                                    │
//! │    ├── meaningful stored draft ──► PendingDecision                      │
//! │    │                                 │ resume_draft()   │ discard()     │
//! │    │                                 ▼                  ▼               │
//! │    └── otherwise ──────────────►  Clean ◄──────────── Clean             │
//! │                                      │ edit                             │
//! │                                      ▼                                  │
//! │                                   Dirty ──── debounced autosave ──┐     │
//! │                                      │                            │     │
//! │                      commit() ───────┤                 draft saved│     │
//! │                                      ▼                            │     │
//! │                                   Clean  (draft deleted) ◄────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Autosave Suspension
//! Autosave is structurally gated off (not error-handled) while:
//! - the resume/discard decision is pending, and
//! - a commit or discard is in flight.
//!
//! This prevents autosave from recreating a draft the operator just
//! discarded, or clobbering an in-flight commit.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use consign_core::{
    Adjustment, AdjustmentLedger, DiscountRate, LineInput,
};
use consign_db::Database;

use crate::commit::{CommitOutcome, CommitPipeline};
use crate::documents::DocumentGenerator;
use crate::error::{EngineError, EngineResult};

/// Quiet period between the last edit and the draft write.
pub const AUTOSAVE_DEBOUNCE: Duration = Duration::from_millis(800);

// =============================================================================
// Draft Snapshot
// =============================================================================

/// Form state for one product line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductForm {
    /// Entered pair for a plain product (ignored for composed products).
    pub input: LineInput,
    /// Entered pairs keyed by sub-product id.
    pub sub_inputs: BTreeMap<String, LineInput>,
    /// Free-text note, persisted with the product's ledger row.
    pub product_info: Option<String>,
}

/// The full serialized session state: what autosave persists and what
/// resume restores, byte for byte.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    /// Per-product form state, keyed by product id.
    pub product_forms: BTreeMap<String, ProductForm>,
    /// Pending reprises de stock.
    pub adjustments: AdjustmentLedger,
}

impl DraftSnapshot {
    /// A draft is worth recovering only if the operator actually entered
    /// something: at least one non-blank counted/deposit field or one
    /// pending adjustment. Seeded product_info notes alone do not count.
    pub fn is_meaningful(&self) -> bool {
        if !self.adjustments.is_empty() {
            return true;
        }
        self.product_forms.values().any(|form| {
            !form.input.is_empty() || form.sub_inputs.values().any(|input| !input.is_empty())
        })
    }
}

// =============================================================================
// Session
// =============================================================================

/// Session state. Discard and commit both land back on `Clean`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// A meaningful stored draft awaits the operator's resume/discard
    /// decision. Edits and commits are blocked.
    PendingDecision,
    /// No unsaved edits since open, last flush-free commit, or discard.
    Clean,
    /// At least one field edited since the last commit/discard.
    Dirty,
}

/// One operator's open reconciliation session for one client.
pub struct ReconcileSession {
    db: Database,
    client_id: String,
    state: SessionState,
    forms: DraftSnapshot,
    /// Stored draft awaiting the resume/discard decision.
    pending: Option<DraftSnapshot>,
    /// Local copy of the last persisted snapshot (fast cache).
    cached_draft: Option<DraftSnapshot>,
    dirty_since: Option<Instant>,
    autosave_suspended: bool,
}

impl ReconcileSession {
    /// Opens a session for a client.
    ///
    /// Loads the client's lines (lazily backfilling sub-product stock
    /// rows), seeds form defaults from each product's most recent prior
    /// note, and checks for a stored draft. A meaningful draft parks the
    /// session in [`SessionState::PendingDecision`] with autosave off.
    pub async fn open(db: Database, client_id: &str) -> EngineResult<Self> {
        let client = db
            .catalog()
            .get_client(client_id)
            .await?
            .ok_or_else(|| EngineError::ClientNotFound(client_id.to_string()))?;

        info!(client_id = %client.id, client = %client.name, "Opening reconciliation session");

        let forms = DraftSnapshot {
            product_forms: default_forms(&db, client_id).await?,
            adjustments: AdjustmentLedger::new(),
        };

        let stored = match db.drafts().load(client_id).await? {
            Some(raw) => match serde_json::from_str::<DraftSnapshot>(&raw) {
                Ok(snapshot) => Some(snapshot),
                Err(err) => {
                    // An unreadable snapshot is treated as absent
                    warn!(client_id = %client_id, error = %err, "Stored draft is unreadable, ignoring");
                    None
                }
            },
            None => None,
        };

        let pending = stored.filter(|snapshot| snapshot.is_meaningful());
        let state = if pending.is_some() {
            info!(client_id = %client_id, "Meaningful draft found, awaiting resume/discard decision");
            SessionState::PendingDecision
        } else {
            SessionState::Clean
        };
        let autosave_suspended = pending.is_some();

        Ok(ReconcileSession {
            db,
            client_id: client_id.to_string(),
            state,
            forms,
            pending,
            cached_draft: None,
            dirty_since: None,
            autosave_suspended,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// True while a stored draft awaits the resume/discard decision.
    pub fn has_pending_draft(&self) -> bool {
        self.pending.is_some()
    }

    /// The live form state.
    pub fn forms(&self) -> &DraftSnapshot {
        &self.forms
    }

    /// The pending adjustments.
    pub fn adjustments(&self) -> &AdjustmentLedger {
        &self.forms.adjustments
    }

    /// The last snapshot persisted by autosave, if any (local cache; the
    /// store is only read again on open).
    pub fn last_saved_snapshot(&self) -> Option<&DraftSnapshot> {
        self.cached_draft.as_ref()
    }

    // =========================================================================
    // Draft Decision
    // =========================================================================

    /// Restores the stored draft into the live form, exactly as saved.
    pub fn resume_draft(&mut self) -> EngineResult<()> {
        let snapshot = self.pending.take().ok_or(EngineError::NoPendingDraft)?;

        info!(client_id = %self.client_id, "Resuming stored draft");
        self.cached_draft = Some(snapshot.clone());
        self.forms = snapshot;
        self.state = SessionState::Dirty;
        self.dirty_since = None;
        self.autosave_suspended = false;
        Ok(())
    }

    /// Deletes the stored draft (local cache and store) and resets the
    /// form to seeded defaults.
    ///
    /// Also usable mid-session to abandon live edits.
    pub async fn discard_draft(&mut self) -> EngineResult<()> {
        info!(client_id = %self.client_id, "Discarding draft");

        // Gate autosave off for the whole discard window
        self.autosave_suspended = true;

        self.db.drafts().delete(&self.client_id).await?;
        self.pending = None;
        self.cached_draft = None;

        self.forms = DraftSnapshot {
            product_forms: default_forms(&self.db, &self.client_id).await?,
            adjustments: AdjustmentLedger::new(),
        };
        self.state = SessionState::Clean;
        self.dirty_since = None;
        self.autosave_suspended = false;
        Ok(())
    }

    // =========================================================================
    // Edits
    // =========================================================================

    /// Sets the entered pair for a plain product line.
    pub fn set_product_input(&mut self, product_id: &str, input: LineInput) -> EngineResult<()> {
        self.ensure_editable()?;
        self.forms
            .product_forms
            .entry(product_id.to_string())
            .or_default()
            .input = input;
        self.touch();
        Ok(())
    }

    /// Sets the entered pair for one sub-product line.
    pub fn set_sub_product_input(
        &mut self,
        product_id: &str,
        sub_product_id: &str,
        input: LineInput,
    ) -> EngineResult<()> {
        self.ensure_editable()?;
        self.forms
            .product_forms
            .entry(product_id.to_string())
            .or_default()
            .sub_inputs
            .insert(sub_product_id.to_string(), input);
        self.touch();
        Ok(())
    }

    /// Sets the free-text note for a product line.
    pub fn set_product_info(&mut self, product_id: &str, info: Option<String>) -> EngineResult<()> {
        self.ensure_editable()?;
        self.forms
            .product_forms
            .entry(product_id.to_string())
            .or_default()
            .product_info = info;
        self.touch();
        Ok(())
    }

    /// Adds a pending reprise-de-stock line.
    pub fn add_adjustment(
        &mut self,
        operation_name: &str,
        entered_price_cents: i64,
        quantity: i64,
    ) -> EngineResult<()> {
        self.ensure_editable()?;
        self.forms
            .adjustments
            .add(operation_name, entered_price_cents, quantity)?;
        self.touch();
        Ok(())
    }

    /// Removes the pending adjustment at `index`.
    pub fn remove_adjustment(&mut self, index: usize) -> EngineResult<Option<Adjustment>> {
        self.ensure_editable()?;
        let removed = self.forms.adjustments.remove(index);
        if removed.is_some() {
            self.touch();
        }
        Ok(removed)
    }

    fn ensure_editable(&self) -> EngineResult<()> {
        if self.pending.is_some() {
            return Err(EngineError::DraftDecisionPending);
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.state = SessionState::Dirty;
        self.dirty_since = Some(Instant::now());
    }

    // =========================================================================
    // Autosave
    // =========================================================================

    /// True when the debounce window has elapsed and autosave is not
    /// structurally suspended.
    pub fn autosave_due(&self, now: Instant) -> bool {
        !self.autosave_suspended
            && self.state == SessionState::Dirty
            && self
                .dirty_since
                .map_or(false, |since| now.duration_since(since) >= AUTOSAVE_DEBOUNCE)
    }

    /// Persists the full snapshot (local cache + store) if the debounce
    /// window has elapsed. Returns whether a save happened.
    pub async fn maybe_autosave(&mut self) -> EngineResult<bool> {
        if self.autosave_due(Instant::now()) {
            self.flush_draft().await
        } else {
            Ok(false)
        }
    }

    /// Persists the full snapshot immediately, bypassing the debounce but
    /// never the structural suspension.
    pub async fn flush_draft(&mut self) -> EngineResult<bool> {
        if self.autosave_suspended || self.state != SessionState::Dirty {
            return Ok(false);
        }

        let raw = serde_json::to_string(&self.forms)?;
        self.db.drafts().save(&self.client_id, &raw).await?;

        debug!(client_id = %self.client_id, bytes = raw.len(), "Draft autosaved");
        self.cached_draft = Some(self.forms.clone());
        self.dirty_since = None;
        Ok(true)
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Runs the commit pipeline over the current form state.
    ///
    /// Autosave is suspended for the whole commit. On success the draft is
    /// gone, the form resets to seeded defaults, and the ledger is cleared.
    /// On failure the form state is left untouched for correction.
    pub async fn commit(
        &mut self,
        generator: &dyn DocumentGenerator,
        discount: Option<DiscountRate>,
    ) -> EngineResult<CommitOutcome> {
        if self.pending.is_some() {
            return Err(EngineError::DraftDecisionPending);
        }

        self.autosave_suspended = true;
        let result =
            CommitPipeline::run(&self.db, generator, &self.client_id, &self.forms, discount).await;

        match result {
            Ok(outcome) => {
                self.forms = DraftSnapshot {
                    product_forms: default_forms(&self.db, &self.client_id).await?,
                    adjustments: AdjustmentLedger::new(),
                };
                self.cached_draft = None;
                self.state = SessionState::Clean;
                self.dirty_since = None;
                self.autosave_suspended = false;
                Ok(outcome)
            }
            Err(err) => {
                self.autosave_suspended = false;
                Err(err)
            }
        }
    }
}

// =============================================================================
// Form Defaults
// =============================================================================

/// Builds the default form: one empty entry per line, with each product's
/// note seeded from its most recent prior ledger row.
async fn default_forms(
    db: &Database,
    client_id: &str,
) -> EngineResult<BTreeMap<String, ProductForm>> {
    let catalog = db.catalog();
    let ledger = db.stock_updates();
    let mut forms = BTreeMap::new();

    for line in catalog.client_products(client_id).await? {
        let sub_rows = catalog
            .ensure_sub_product_rows(client_id, &line.product_id)
            .await?;
        let product_info = ledger
            .latest_product_info(client_id, &line.product_id)
            .await?;

        let sub_inputs = sub_rows
            .into_iter()
            .map(|row| (row.sub_product_id, LineInput::empty()))
            .collect();

        forms.insert(
            line.product_id,
            ProductForm {
                input: LineInput::empty(),
                sub_inputs,
                product_info,
            },
        );
    }

    Ok(forms)
}

// =============================================================================
// Unit Tests
// =============================================================================
