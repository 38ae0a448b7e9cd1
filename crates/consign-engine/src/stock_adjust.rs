//! # Manual Stock Adjustment
//!
//! The "Ajuster le stock" path: a single new absolute stock value, outside
//! any reconciliation session. Always framed as a pure correction with
//! zero sales; a reduction is negative réassort, never a sale. Each
//! adjustment appends its own invoice-less ledger row before the stock
//! value it justifies.

use tracing::info;

use consign_core::{Movement, StockUpdate};
use consign_db::{Database, StockUpdateRepository};

use crate::error::{EngineError, EngineResult};

/// Manual stock corrections for one client's lines.
pub struct StockAdjuster {
    db: Database,
}

impl StockAdjuster {
    pub fn new(db: Database) -> Self {
        StockAdjuster { db }
    }

    /// Sets a plain product's stock to `new_stock`.
    ///
    /// Refused for sub-product-backed products: their stock is a derived
    /// aggregate, corrected through [`adjust_sub_product_stock`]
    /// (Self::adjust_sub_product_stock).
    pub async fn adjust_product_stock(
        &self,
        client_id: &str,
        product_id: &str,
        new_stock: i64,
    ) -> EngineResult<Movement> {
        validate_new_stock(product_id, new_stock)?;

        let catalog = self.db.catalog();
        let line = catalog
            .get_client_product(client_id, product_id)
            .await?
            .ok_or_else(|| EngineError::ProductNotFound(product_id.to_string()))?;
        let product = catalog
            .get_product(product_id)
            .await?
            .ok_or_else(|| EngineError::ProductNotFound(product_id.to_string()))?;

        if !catalog.sub_products_of(product_id).await?.is_empty() {
            return Err(EngineError::AggregatedProduct { name: product.name });
        }

        let movement = Movement::manual_correction(line.current_stock, new_stock);
        info!(
            client_id = %client_id,
            product = %product.name,
            old_stock = line.current_stock,
            new_stock,
            "Manual product stock adjustment"
        );

        // Ledger row first, then the stock it justifies
        let now = StockUpdateRepository::now();
        self.db
            .stock_updates()
            .insert(&manual_row(client_id, Some(product_id), None, &movement, now))
            .await?;
        catalog.set_product_stock(&line.id, new_stock).await?;

        Ok(movement)
    }

    /// Sets a sub-product's stock to `new_stock`, then recomputes the
    /// parent aggregate and writes the parent's own ledger row in the same
    /// operation (the parent is never left stale).
    pub async fn adjust_sub_product_stock(
        &self,
        client_id: &str,
        sub_product_id: &str,
        new_stock: i64,
    ) -> EngineResult<Movement> {
        validate_new_stock(sub_product_id, new_stock)?;

        let catalog = self.db.catalog();
        let sub = catalog
            .get_sub_product(sub_product_id)
            .await?
            .ok_or_else(|| EngineError::SubProductNotFound(sub_product_id.to_string()))?;
        let sub_row = catalog
            .get_client_sub_product(client_id, sub_product_id)
            .await?
            .ok_or_else(|| EngineError::SubProductNotFound(sub_product_id.to_string()))?;
        let parent_line = catalog
            .get_client_product(client_id, &sub.product_id)
            .await?
            .ok_or_else(|| EngineError::ProductNotFound(sub.product_id.clone()))?;

        let movement = Movement::manual_correction(sub_row.current_stock, new_stock);

        // Parent aggregate with the adjusted sub at its new value
        let parent_new: i64 = catalog
            .client_sub_products(client_id, &sub.product_id)
            .await?
            .iter()
            .map(|row| {
                if row.id == sub_row.id {
                    new_stock
                } else {
                    row.current_stock
                }
            })
            .sum();
        let parent_movement =
            Movement::manual_correction(parent_line.current_stock, parent_new);

        info!(
            client_id = %client_id,
            sub_product = %sub.name,
            old_stock = sub_row.current_stock,
            new_stock,
            parent_new_stock = parent_new,
            "Manual sub-product stock adjustment"
        );

        let now = StockUpdateRepository::now();
        let ledger = self.db.stock_updates();
        ledger
            .insert(&manual_row(client_id, None, Some(sub_product_id), &movement, now))
            .await?;
        ledger
            .insert(&manual_row(
                client_id,
                Some(&sub.product_id),
                None,
                &parent_movement,
                now,
            ))
            .await?;

        catalog.set_sub_product_stock(&sub_row.id, new_stock).await?;
        catalog.set_product_stock(&parent_line.id, parent_new).await?;

        Ok(movement)
    }
}

fn validate_new_stock(line: &str, new_stock: i64) -> EngineResult<()> {
    if new_stock < 0 {
        return Err(consign_core::ValidationError::InvalidStockValue {
            line: line.to_string(),
            field: "new stock".to_string(),
        }
        .into());
    }
    Ok(())
}

fn manual_row(
    client_id: &str,
    product_id: Option<&str>,
    sub_product_id: Option<&str>,
    movement: &Movement,
    now: chrono::DateTime<chrono::Utc>,
) -> StockUpdate {
    StockUpdate {
        id: StockUpdateRepository::generate_id(),
        client_id: client_id.to_string(),
        product_id: product_id.map(str::to_string),
        sub_product_id: sub_product_id.map(str::to_string),
        // Manual corrections are never invoice-bearing
        invoice_id: None,
        previous_stock: movement.previous_stock,
        counted_stock: movement.counted_stock,
        stock_sold: movement.stock_sold,
        stock_added: movement.stock_added,
        new_stock: movement.new_stock,
        product_info: None,
        unit_price_cents: None,
        total_amount_cents: None,
        created_at: now,
    }
}
