//! In-memory store implementations.
//!
//! Back the maintainer in tests and single-process deployments without a
//! database. The index swap is a whole-map replacement under one lock,
//! matching the shadow-table swap of the SQL implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Mutex;

use payrail_shared::types::{PageRequest, RecordId, RequestRef, TenantId};

use crate::index::projection::IndexRow;
use crate::index::store::{IndexStore, StoreError, TenantStore};
use crate::request::types::{Request, RequestKind, RequestStatus};

type TenantMap = BTreeMap<TenantId, BTreeMap<RecordId, Request>>;

/// In-memory tenant request stores.
#[derive(Default)]
pub struct InMemoryTenantStore {
    tenants: Mutex<TenantMap>,
}

impl InMemoryTenantStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a request under its own tenant.
    pub fn put(&self, request: Request) {
        let mut tenants = self.tenants.lock().expect("tenant store poisoned");
        tenants
            .entry(request.tenant_id)
            .or_default()
            .insert(request.record_id, request);
    }

    /// Removes a request, returning whether it existed.
    pub fn remove(&self, reference: RequestRef) -> bool {
        let mut tenants = self.tenants.lock().expect("tenant store poisoned");
        tenants
            .get_mut(&reference.tenant_id)
            .is_some_and(|records| records.remove(&reference.record_id).is_some())
    }
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn tenant_ids(&self, page: PageRequest) -> Result<Vec<TenantId>, StoreError> {
        let tenants = self
            .tenants
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        // Highest tenant id first stands in for newest-first.
        Ok(tenants
            .keys()
            .rev()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.per_page as usize)
            .copied()
            .collect())
    }

    async fn get(&self, reference: RequestRef) -> Result<Option<Request>, StoreError> {
        let tenants = self
            .tenants
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(tenants
            .get(&reference.tenant_id)
            .and_then(|records| records.get(&reference.record_id))
            .cloned())
    }

    async fn list(
        &self,
        tenant_id: TenantId,
        kind: RequestKind,
        page: PageRequest,
    ) -> Result<Vec<Request>, StoreError> {
        let tenants = self
            .tenants
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(tenants
            .get(&tenant_id)
            .map(|records| {
                records
                    .values()
                    .filter(|request| request.kind() == kind)
                    .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
                    .take(page.per_page as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// In-memory central index table.
#[derive(Default)]
pub struct InMemoryIndexStore {
    rows: Mutex<BTreeMap<(i64, i64), IndexRow>>,
}

impl InMemoryIndexStore {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(reference: RequestRef) -> (i64, i64) {
        (
            reference.tenant_id.into_inner(),
            reference.record_id.into_inner(),
        )
    }
}

#[async_trait]
impl IndexStore for InMemoryIndexStore {
    async fn upsert(&self, row: IndexRow) -> Result<(), StoreError> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        rows.insert(Self::key(row.reference()), row);
        Ok(())
    }

    async fn delete(&self, reference: RequestRef) -> Result<(), StoreError> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        rows.remove(&Self::key(reference));
        Ok(())
    }

    async fn swap_in(&self, new_rows: Vec<IndexRow>) -> Result<(), StoreError> {
        let mut staged = BTreeMap::new();
        for row in new_rows {
            staged.insert(Self::key(row.reference()), row);
        }
        let mut rows = self
            .rows
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        *rows = staged;
        Ok(())
    }

    async fn select_window(
        &self,
        statuses: &[RequestStatus],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RequestRef>, StoreError> {
        let rows = self
            .rows
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let mut hits: Vec<(DateTime<Utc>, RequestRef)> = rows
            .values()
            .filter_map(|row| {
                let stamp = row.paid_at.unwrap_or(row.updated_at);
                (statuses.contains(&row.status) && stamp >= start && stamp <= end)
                    .then(|| (stamp, row.reference()))
            })
            .collect();
        hits.sort_by_key(|(stamp, reference)| {
            (
                *stamp,
                reference.tenant_id.into_inner(),
                reference.record_id.into_inner(),
            )
        });
        Ok(hits.into_iter().map(|(_, reference)| reference).collect())
    }

    async fn all(&self) -> Result<Vec<IndexRow>, StoreError> {
        let rows = self
            .rows
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(rows.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::testutil;

    #[tokio::test]
    async fn test_tenant_ids_newest_first_and_paged() {
        let store = InMemoryTenantStore::new();
        for tenant in 1..=5 {
            store.put(testutil::request(RequestKind::VendorPayment, tenant, 1));
        }

        let first = store.tenant_ids(PageRequest::new(1, 3)).await.unwrap();
        assert_eq!(first, vec![TenantId(5), TenantId(4), TenantId(3)]);

        let second = store.tenant_ids(PageRequest::new(2, 3)).await.unwrap();
        assert_eq!(second, vec![TenantId(2), TenantId(1)]);
    }

    #[tokio::test]
    async fn test_list_filters_by_kind() {
        let store = InMemoryTenantStore::new();
        store.put(testutil::request(RequestKind::VendorPayment, 1, 1));
        store.put(testutil::request(RequestKind::Reimbursement, 1, 2));

        let payments = store
            .list(TenantId(1), RequestKind::VendorPayment, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].record_id, RecordId(1));
    }

    #[tokio::test]
    async fn test_index_upsert_replaces_by_primary_key() {
        let index = InMemoryIndexStore::new();
        let request = testutil::request(RequestKind::VendorPayment, 1, 1);
        let mut row = crate::index::projection::project(&request).unwrap();

        index.upsert(row.clone()).await.unwrap();
        row.title = "replaced".to_string();
        index.upsert(row).await.unwrap();

        let rows = index.all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "replaced");
    }

    #[tokio::test]
    async fn test_index_delete_missing_row_is_noop() {
        let index = InMemoryIndexStore::new();
        index
            .delete(RequestRef::new(TenantId(9), RecordId(9)))
            .await
            .unwrap();
        assert!(index.all().await.unwrap().is_empty());
    }
}
