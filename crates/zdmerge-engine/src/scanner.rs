//! Paginated scan over divergent local records.
//!
//! [`RecordStore`] is the data source contract: the divergence query, the
//! cache-row lookup and the meta upsert. [`PgRecordStore`] implements it
//! over Postgres; tests substitute an in-memory store. [`RecordScanner`]
//! drives offset pagination in stable creation-time order, so repeated
//! runs over a stalled job walk the same sequence without a persisted
//! cursor.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::EngineResult;

/// A local user whose cached support-system email no longer matches the
/// canonical email. Read-only within a run.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DivergentRecord {
    /// Local user id.
    pub user_id: Uuid,
    /// Business the user belongs to.
    pub business_id: Uuid,
    /// Canonical email in the user table (authoritative).
    pub email: String,
    /// Support-system account id stored for this user.
    pub zendesk_id: String,
    /// Email in the cached account snapshot.
    pub meta_email: String,
    /// Account id in the cached account snapshot, when present.
    pub meta_id: Option<String>,
    /// User creation time; the scan order key.
    pub created_at: DateTime<Utc>,
}

/// Persisted user-to-account mapping row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CacheRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub zendesk_id: String,
    /// Last-known account snapshot; unknown keys must survive updates.
    pub meta: Option<Value>,
}

/// Data source contract for the reconciliation engine.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// One page of divergent records, ordered by creation time ascending.
    async fn fetch_divergent_page(
        &self,
        limit: i64,
        offset: i64,
    ) -> EngineResult<Vec<DivergentRecord>>;

    /// Look up the cache row for a user.
    async fn find_cache_row(&self, user_id: Uuid) -> EngineResult<Option<CacheRow>>;

    /// Replace the cache row's meta for a user. Idempotent: re-applying
    /// the same document yields the same row.
    async fn update_cache_meta(&self, user_id: Uuid, meta: &Value) -> EngineResult<()>;
}

/// Postgres-backed record store.
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn fetch_divergent_page(
        &self,
        limit: i64,
        offset: i64,
    ) -> EngineResult<Vec<DivergentRecord>> {
        let records = sqlx::query_as(
            r"
            SELECT
              u.id AS user_id,
              u.business_id,
              u.email,
              zu.zendesk_id,
              zu.meta->>'email' AS meta_email,
              zu.meta->>'id' AS meta_id,
              u.created_at
            FROM users u
            JOIN zendesk_users zu ON u.id = zu.user_id
            WHERE u.status = 'active' AND zu.meta->>'email' != u.email
            ORDER BY u.created_at ASC
            LIMIT $1
            OFFSET $2
            ",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn find_cache_row(&self, user_id: Uuid) -> EngineResult<Option<CacheRow>> {
        let row = sqlx::query_as(
            r"
            SELECT id, user_id, zendesk_id, meta
            FROM zendesk_users
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_cache_meta(&self, user_id: Uuid, meta: &Value) -> EngineResult<()> {
        sqlx::query(
            r"
            UPDATE zendesk_users
            SET meta = $2, updated_at = NOW()
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .bind(meta)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Offset-pagination driver over a [`RecordStore`].
pub struct RecordScanner<'a> {
    store: &'a dyn RecordStore,
    page_size: i64,
    offset: i64,
}

impl<'a> RecordScanner<'a> {
    /// Create a scanner with the given page size.
    #[must_use]
    pub fn new(store: &'a dyn RecordStore, page_size: i64) -> Self {
        Self {
            store,
            page_size,
            offset: 0,
        }
    }

    /// Fetch the next page; `None` once a page comes back empty.
    pub async fn next_page(&mut self) -> EngineResult<Option<Vec<DivergentRecord>>> {
        let page = self
            .store
            .fetch_divergent_page(self.page_size, self.offset)
            .await?;
        if page.is_empty() {
            return Ok(None);
        }
        self.offset += self.page_size;
        Ok(Some(page))
    }
}
