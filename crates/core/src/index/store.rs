//! Store trait seams for the index maintainer.
//!
//! Tenant stores are external collaborators: each tenant already has an
//! addressable store with its own record ids. The central index store is
//! ours; the database implementation lives in `payrail-db`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use payrail_shared::types::{PageRequest, RequestRef, TenantId};

use crate::index::projection::IndexRow;
use crate::request::types::{Request, RequestKind, RequestStatus};

/// Errors from tenant or index stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A query failed.
    #[error("Store query failed: {0}")]
    Query(String),
}

/// Read access to the per-tenant authoritative request stores.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Lists tenant ids, newest tenants first.
    async fn tenant_ids(&self, page: PageRequest) -> Result<Vec<TenantId>, StoreError>;

    /// Fetches the authoritative copy of one request.
    async fn get(&self, reference: RequestRef) -> Result<Option<Request>, StoreError>;

    /// Lists a tenant's requests of one kind, any status, in stable
    /// record-id order.
    async fn list(
        &self,
        tenant_id: TenantId,
        kind: RequestKind,
        page: PageRequest,
    ) -> Result<Vec<Request>, StoreError>;
}

/// The central denormalized index table.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Inserts or replaces one row by primary key in a single statement,
    /// last writer wins. Never leaves a visible gap.
    async fn upsert(&self, row: IndexRow) -> Result<(), StoreError>;

    /// Deletes a row by primary key. Safe to call when no row exists.
    async fn delete(&self, reference: RequestRef) -> Result<(), StoreError>;

    /// Atomically replaces the entire index with the given rows.
    ///
    /// Used by the full rebuild: rows are staged out of sight and swapped
    /// in at once, so a crash mid-rebuild leaves the previous contents
    /// rather than an empty table.
    async fn swap_in(&self, rows: Vec<IndexRow>) -> Result<(), StoreError>;

    /// Returns the `(tenant_id, record_id)` pairs of rows whose status is
    /// in `statuses` and whose paid/updated timestamp falls inside
    /// `[start, end]`, ordered by that timestamp, then primary key.
    async fn select_window(
        &self,
        statuses: &[RequestStatus],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RequestRef>, StoreError>;

    /// Returns every row in primary-key order.
    async fn all(&self) -> Result<Vec<IndexRow>, StoreError>;
}
