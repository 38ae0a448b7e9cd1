//! # Stock Update Ledger Repository
//!
//! The append-only audit ledger: one row per stock movement, never updated
//! or deleted after insert. This table is the system of record for "what
//! happened"; current stock values are derived from it and must always be
//! justified by it.
//!
//! ## Write Ordering
//! The commit pipeline inserts ledger rows before (or alongside) the
//! aggregate stock values they justify, minimizing the window where
//! `current_stock` could be observed without its corresponding entry.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use consign_core::StockUpdate;

/// Repository for the append-only stock update ledger.
///
/// Note the deliberately absent API surface: there is no update and no
/// delete. Corrections are expressed as new rows.
#[derive(Debug, Clone)]
pub struct StockUpdateRepository {
    pool: SqlitePool,
}

impl StockUpdateRepository {
    /// Creates a new StockUpdateRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockUpdateRepository { pool }
    }

    /// Appends one ledger row.
    pub async fn insert(&self, update: &StockUpdate) -> DbResult<()> {
        debug!(
            client_id = %update.client_id,
            product_id = ?update.product_id,
            sub_product_id = ?update.sub_product_id,
            invoice_id = ?update.invoice_id,
            stock_sold = update.stock_sold,
            stock_added = update.stock_added,
            "Appending stock update"
        );

        sqlx::query(
            r#"
            INSERT INTO stock_updates (
                id, client_id, product_id, sub_product_id, invoice_id,
                previous_stock, counted_stock, stock_sold, stock_added, new_stock,
                product_info, unit_price_cents, total_amount_cents, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14
            )
            "#,
        )
        .bind(&update.id)
        .bind(&update.client_id)
        .bind(&update.product_id)
        .bind(&update.sub_product_id)
        .bind(&update.invoice_id)
        .bind(update.previous_stock)
        .bind(update.counted_stock)
        .bind(update.stock_sold)
        .bind(update.stock_added)
        .bind(update.new_stock)
        .bind(&update.product_info)
        .bind(update.unit_price_cents)
        .bind(update.total_amount_cents)
        .bind(update.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists the ledger rows attached to an invoice, oldest first.
    pub async fn list_for_invoice(&self, invoice_id: &str) -> DbResult<Vec<StockUpdate>> {
        let rows = sqlx::query_as::<_, StockUpdate>(
            r#"
            SELECT * FROM stock_updates
            WHERE invoice_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Lists a client's full ledger history, newest first.
    pub async fn list_for_client(&self, client_id: &str) -> DbResult<Vec<StockUpdate>> {
        let rows = sqlx::query_as::<_, StockUpdate>(
            r#"
            SELECT * FROM stock_updates
            WHERE client_id = ?1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Returns the most recent `product_info` note recorded for a
    /// (client, product) pair, if any.
    ///
    /// ## Usage
    /// Seeds the form default for the next reconciliation session after a
    /// draft discard.
    pub async fn latest_product_info(
        &self,
        client_id: &str,
        product_id: &str,
    ) -> DbResult<Option<String>> {
        let info: Option<String> = sqlx::query_scalar(
            r#"
            SELECT product_info FROM stock_updates
            WHERE client_id = ?1
              AND product_id = ?2
              AND product_info IS NOT NULL
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(client_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(info)
    }

    /// Generates a new ledger row ID.
    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Current timestamp helper, so all rows of one commit share a clock.
    pub fn now() -> chrono::DateTime<Utc> {
        Utc::now()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn row(client_id: &str, product_id: &str, info: Option<&str>) -> StockUpdate {
        StockUpdate {
            id: StockUpdateRepository::generate_id(),
            client_id: client_id.to_string(),
            product_id: Some(product_id.to_string()),
            sub_product_id: None,
            invoice_id: None,
            previous_stock: 10,
            counted_stock: 4,
            stock_sold: 6,
            stock_added: 8,
            new_stock: 12,
            product_info: info.map(str::to_string),
            unit_price_cents: None,
            total_amount_cents: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_for_client() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();
        let ledger = db.stock_updates();

        let client = catalog.insert_client("Épicerie").await.unwrap();
        let product = catalog.insert_product("Miel", 200, None, None).await.unwrap();

        ledger.insert(&row(&client.id, &product.id, None)).await.unwrap();
        ledger.insert(&row(&client.id, &product.id, None)).await.unwrap();

        let history = ledger.list_for_client(&client.id).await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_latest_product_info_skips_null_notes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();
        let ledger = db.stock_updates();

        let client = catalog.insert_client("Épicerie").await.unwrap();
        let product = catalog.insert_product("Miel", 200, None, None).await.unwrap();

        let mut first = row(&client.id, &product.id, Some("cartons de 12"));
        first.created_at = Utc::now() - chrono::Duration::days(30);
        ledger.insert(&first).await.unwrap();
        ledger.insert(&row(&client.id, &product.id, None)).await.unwrap();

        // The newest non-null note wins, not the newest row
        let info = ledger
            .latest_product_info(&client.id, &product.id)
            .await
            .unwrap();
        assert_eq!(info.as_deref(), Some("cartons de 12"));
    }
}
