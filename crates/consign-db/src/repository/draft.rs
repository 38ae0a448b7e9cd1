//! # Draft Store Repository
//!
//! Durable storage for in-progress, not-yet-committed reconciliation
//! sessions. At most one draft lives per client: the client id is the key
//! and every save overwrites the previous snapshot.
//!
//! The snapshot column holds the serialized form state as JSON; this
//! repository treats it as opaque text. Shape and meaningfulness are the
//! session manager's business (consign-engine).

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Repository for per-client draft snapshots.
#[derive(Debug, Clone)]
pub struct DraftRepository {
    pool: SqlitePool,
}

impl DraftRepository {
    /// Creates a new DraftRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DraftRepository { pool }
    }

    /// Saves (upserts) the client's draft snapshot.
    pub async fn save(&self, client_id: &str, snapshot: &str) -> DbResult<()> {
        debug!(client_id = %client_id, bytes = snapshot.len(), "Saving draft");

        sqlx::query(
            r#"
            INSERT INTO drafts (client_id, snapshot, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(client_id) DO UPDATE SET
                snapshot = excluded.snapshot,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(client_id)
        .bind(snapshot)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Loads the client's draft snapshot, if one exists.
    pub async fn load(&self, client_id: &str) -> DbResult<Option<String>> {
        let snapshot: Option<String> =
            sqlx::query_scalar("SELECT snapshot FROM drafts WHERE client_id = ?1")
                .bind(client_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(snapshot)
    }

    /// Deletes the client's draft (commit or explicit discard).
    ///
    /// Deleting an absent draft is not an error: commit and discard both
    /// call this unconditionally.
    pub async fn delete(&self, client_id: &str) -> DbResult<()> {
        debug!(client_id = %client_id, "Deleting draft");

        sqlx::query("DELETE FROM drafts WHERE client_id = ?1")
            .bind(client_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
