//! # Catalogue & Stock Position Repository
//!
//! Database operations for clients, products, sub-products and the
//! per-client stock positions: the durable source of truth consumed and
//! mutated by the reconciliation engine.
//!
//! ## Stock Row Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Per-Client Stock Row Lifecycle                          │
//! │                                                                         │
//! │  1. ASSOCIATE                                                          │
//! │     └── associate_product() → client_products row (initial deposit)    │
//! │     └── eagerly creates client_sub_products rows at stock 0            │
//! │                                                                         │
//! │  2. LAZY BACKFILL                                                      │
//! │     └── ensure_sub_product_rows() → rows for sub-products that         │
//! │         appeared after the association, created at stock 0 the         │
//! │         first time the client is loaded                                │
//! │                                                                         │
//! │  3. RECONCILE / ADJUST                                                 │
//! │     └── set_sub_product_stock() then set_product_stock()               │
//! │         (sub-products first, parent aggregate second)                  │
//! │                                                                         │
//! │  4. (OPTIONAL) SOFT DELETE                                             │
//! │     └── deleted_at tombstone; reads filter it here, once               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use consign_core::{Client, ClientProduct, ClientSubProduct, Product, SubProduct};

/// Repository for catalogue and stock position operations.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // =========================================================================
    // Clients
    // =========================================================================

    /// Creates a client storefront.
    pub async fn insert_client(&self, name: &str) -> DbResult<Client> {
        let client = Client {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
            deleted_at: None,
        };

        debug!(id = %client.id, name = %client.name, "Inserting client");

        sqlx::query("INSERT INTO clients (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(&client.id)
            .bind(&client.name)
            .bind(client.created_at)
            .execute(&self.pool)
            .await?;

        Ok(client)
    }

    /// Gets a client by ID (live rows only).
    pub async fn get_client(&self, id: &str) -> DbResult<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(
            "SELECT * FROM clients WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Creates a catalogue product.
    pub async fn insert_product(
        &self,
        name: &str,
        price_cents: i64,
        recommended_price_cents: Option<i64>,
        barcode: Option<&str>,
    ) -> DbResult<Product> {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            price_cents,
            recommended_price_cents,
            barcode: barcode.map(str::to_string),
            created_at: Utc::now(),
            deleted_at: None,
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (id, name, price_cents, recommended_price_cents, barcode, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.recommended_price_cents)
        .bind(&product.barcode)
        .bind(product.created_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by ID (live rows only).
    pub async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Soft-deletes a product.
    pub async fn soft_delete_product(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE products SET deleted_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    // =========================================================================
    // Sub-Products
    // =========================================================================

    /// Creates a sub-product under a parent product.
    pub async fn insert_sub_product(&self, product_id: &str, name: &str) -> DbResult<SubProduct> {
        let sub = SubProduct {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
            deleted_at: None,
        };

        debug!(id = %sub.id, product_id = %product_id, name = %sub.name, "Inserting sub-product");

        sqlx::query(
            "INSERT INTO sub_products (id, product_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&sub.id)
        .bind(&sub.product_id)
        .bind(&sub.name)
        .bind(sub.created_at)
        .execute(&self.pool)
        .await?;

        Ok(sub)
    }

    /// Gets a sub-product by ID (live rows only).
    pub async fn get_sub_product(&self, id: &str) -> DbResult<Option<SubProduct>> {
        let sub = sqlx::query_as::<_, SubProduct>(
            "SELECT * FROM sub_products WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sub)
    }

    /// Lists the live sub-products of a product, oldest first.
    pub async fn sub_products_of(&self, product_id: &str) -> DbResult<Vec<SubProduct>> {
        let subs = sqlx::query_as::<_, SubProduct>(
            r#"
            SELECT * FROM sub_products
            WHERE product_id = ?1 AND deleted_at IS NULL
            ORDER BY created_at
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(subs)
    }

    // =========================================================================
    // Client ↔ Product Associations
    // =========================================================================

    /// Associates a product to a client with its first deposit.
    ///
    /// ## What This Does
    /// 1. Inserts the client_products row (unique per live pair)
    /// 2. Eagerly creates one client_sub_products row per live sub-product,
    ///    at stock 0
    pub async fn associate_product(
        &self,
        client_id: &str,
        product_id: &str,
        initial_stock: i64,
        custom_price_cents: Option<i64>,
        display_order: i64,
    ) -> DbResult<ClientProduct> {
        let association = ClientProduct {
            id: Uuid::new_v4().to_string(),
            client_id: client_id.to_string(),
            product_id: product_id.to_string(),
            custom_price_cents,
            custom_recommended_price_cents: None,
            current_stock: initial_stock,
            initial_stock,
            display_order,
            created_at: Utc::now(),
            deleted_at: None,
        };

        debug!(
            client_id = %client_id,
            product_id = %product_id,
            initial_stock = initial_stock,
            "Associating product to client"
        );

        sqlx::query(
            r#"
            INSERT INTO client_products (
                id, client_id, product_id,
                custom_price_cents, custom_recommended_price_cents,
                current_stock, initial_stock, display_order, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&association.id)
        .bind(&association.client_id)
        .bind(&association.product_id)
        .bind(association.custom_price_cents)
        .bind(association.custom_recommended_price_cents)
        .bind(association.current_stock)
        .bind(association.initial_stock)
        .bind(association.display_order)
        .bind(association.created_at)
        .execute(&self.pool)
        .await?;

        self.ensure_sub_product_rows(client_id, product_id).await?;

        Ok(association)
    }

    /// Lists a client's live product associations in display order.
    pub async fn client_products(&self, client_id: &str) -> DbResult<Vec<ClientProduct>> {
        let rows = sqlx::query_as::<_, ClientProduct>(
            r#"
            SELECT * FROM client_products
            WHERE client_id = ?1 AND deleted_at IS NULL
            ORDER BY display_order, created_at
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Gets the live association for one (client, product) pair.
    pub async fn get_client_product(
        &self,
        client_id: &str,
        product_id: &str,
    ) -> DbResult<Option<ClientProduct>> {
        let row = sqlx::query_as::<_, ClientProduct>(
            r#"
            SELECT * FROM client_products
            WHERE client_id = ?1 AND product_id = ?2 AND deleted_at IS NULL
            "#,
        )
        .bind(client_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Sets the per-client price override (None restores the catalogue price).
    pub async fn set_custom_price(
        &self,
        client_product_id: &str,
        custom_price_cents: Option<i64>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE client_products SET custom_price_cents = ?2
            WHERE id = ?1 AND deleted_at IS NULL
            "#,
        )
        .bind(client_product_id)
        .bind(custom_price_cents)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ClientProduct", client_product_id));
        }

        Ok(())
    }

    /// Soft-deletes a client's product association.
    pub async fn soft_delete_client_product(&self, client_product_id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE client_products SET deleted_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(client_product_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ClientProduct", client_product_id));
        }

        Ok(())
    }

    // =========================================================================
    // Client ↔ Sub-Product Stock Rows
    // =========================================================================

    /// Returns the client's stock rows for a product's sub-products,
    /// lazily creating missing ones at stock 0.
    ///
    /// ## Why Lazy Creation?
    /// A sub-product can be added to the catalogue after a client was
    /// associated to its parent. The first load of that client afterwards
    /// backfills the missing row, so reconciliation always sees one row
    /// per live sub-product.
    pub async fn ensure_sub_product_rows(
        &self,
        client_id: &str,
        product_id: &str,
    ) -> DbResult<Vec<ClientSubProduct>> {
        let subs = self.sub_products_of(product_id).await?;
        let now = Utc::now();

        for sub in &subs {
            let existing = self.get_client_sub_product(client_id, &sub.id).await?;
            if existing.is_none() {
                debug!(
                    client_id = %client_id,
                    sub_product_id = %sub.id,
                    "Backfilling client sub-product stock row"
                );

                sqlx::query(
                    r#"
                    INSERT INTO client_sub_products (
                        id, client_id, sub_product_id, current_stock, initial_stock, created_at
                    ) VALUES (?1, ?2, ?3, 0, 0, ?4)
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(client_id)
                .bind(&sub.id)
                .bind(now)
                .execute(&self.pool)
                .await?;
            }
        }

        self.client_sub_products(client_id, product_id).await
    }

    /// Lists the client's live stock rows for a product's sub-products.
    pub async fn client_sub_products(
        &self,
        client_id: &str,
        product_id: &str,
    ) -> DbResult<Vec<ClientSubProduct>> {
        let rows = sqlx::query_as::<_, ClientSubProduct>(
            r#"
            SELECT csp.* FROM client_sub_products csp
            JOIN sub_products sp ON sp.id = csp.sub_product_id
            WHERE csp.client_id = ?1
              AND sp.product_id = ?2
              AND csp.deleted_at IS NULL
              AND sp.deleted_at IS NULL
            ORDER BY sp.created_at
            "#,
        )
        .bind(client_id)
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Gets the live stock row for one (client, sub_product) pair.
    pub async fn get_client_sub_product(
        &self,
        client_id: &str,
        sub_product_id: &str,
    ) -> DbResult<Option<ClientSubProduct>> {
        let row = sqlx::query_as::<_, ClientSubProduct>(
            r#"
            SELECT * FROM client_sub_products
            WHERE client_id = ?1 AND sub_product_id = ?2 AND deleted_at IS NULL
            "#,
        )
        .bind(client_id)
        .bind(sub_product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    // =========================================================================
    // Stock Mutations
    // =========================================================================

    /// Sets a client product's current stock.
    ///
    /// For sub-product-backed products, callers must pass the recomputed
    /// aggregate (sum of the sub-products' current stock), never a
    /// directly-entered value.
    pub async fn set_product_stock(&self, client_product_id: &str, stock: i64) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE client_products SET current_stock = ?2 WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(client_product_id)
        .bind(stock)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ClientProduct", client_product_id));
        }

        Ok(())
    }

    /// Sets a client sub-product's current stock.
    pub async fn set_sub_product_stock(
        &self,
        client_sub_product_id: &str,
        stock: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE client_sub_products SET current_stock = ?2 WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(client_sub_product_id)
        .bind(stock)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ClientSubProduct", client_sub_product_id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_association_is_unique_per_live_pair() {
        let db = db().await;
        let catalog = db.catalog();

        let client = catalog.insert_client("Épicerie du Port").await.unwrap();
        let product = catalog
            .insert_product("Miel 500g", 200, None, None)
            .await
            .unwrap();

        catalog
            .associate_product(&client.id, &product.id, 50, None, 0)
            .await
            .unwrap();

        // Second live association must hit the partial unique index
        let dup = catalog
            .associate_product(&client.id, &product.id, 10, None, 0)
            .await;
        assert!(dup.is_err());
    }

    #[tokio::test]
    async fn test_soft_deleted_rows_are_filtered() {
        let db = db().await;
        let catalog = db.catalog();

        let client = catalog.insert_client("Ferme des Lilas").await.unwrap();
        let product = catalog
            .insert_product("Savon lavande", 450, None, None)
            .await
            .unwrap();
        let cp = catalog
            .associate_product(&client.id, &product.id, 20, None, 0)
            .await
            .unwrap();

        catalog.soft_delete_client_product(&cp.id).await.unwrap();

        assert!(catalog
            .get_client_product(&client.id, &product.id)
            .await
            .unwrap()
            .is_none());
        assert!(catalog.client_products(&client.id).await.unwrap().is_empty());

        // A fresh association is allowed after the tombstone
        catalog
            .associate_product(&client.id, &product.id, 5, None, 0)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sub_product_rows_created_eagerly_and_lazily() {
        let db = db().await;
        let catalog = db.catalog();

        let client = catalog.insert_client("Boulangerie Martin").await.unwrap();
        let product = catalog
            .insert_product("Confiture", 380, None, None)
            .await
            .unwrap();
        catalog
            .insert_sub_product(&product.id, "Fraise")
            .await
            .unwrap();

        // Eager: association creates the existing sub-product's row
        catalog
            .associate_product(&client.id, &product.id, 0, None, 0)
            .await
            .unwrap();
        let rows = catalog
            .client_sub_products(&client.id, &product.id)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].current_stock, 0);

        // Lazy: a sub-product added later is backfilled on next load
        catalog
            .insert_sub_product(&product.id, "Abricot")
            .await
            .unwrap();
        let rows = catalog
            .ensure_sub_product_rows(&client.id, &product.id)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.current_stock == 0));
    }

    #[tokio::test]
    async fn test_custom_price_roundtrip() {
        let db = db().await;
        let catalog = db.catalog();

        let client = catalog.insert_client("Café des Arts").await.unwrap();
        let product = catalog
            .insert_product("Jus de pomme", 300, Some(450), None)
            .await
            .unwrap();
        let cp = catalog
            .associate_product(&client.id, &product.id, 12, Some(280), 0)
            .await
            .unwrap();

        let stored = catalog
            .get_client_product(&client.id, &product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.custom_price_cents, Some(280));
        assert_eq!(stored.effective_price(&product).cents(), 280);

        catalog.set_custom_price(&cp.id, None).await.unwrap();
        let stored = catalog
            .get_client_product(&client.id, &product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.effective_price(&product).cents(), 300);
    }
}
