//! Index maintenance: incremental updates and the full rebuild.

use std::sync::Arc;

use tracing::{debug, info};

use payrail_shared::types::{PageRequest, RequestRef};

use crate::index::projection::project;
use crate::index::store::{IndexStore, StoreError, TenantStore};
use crate::request::types::RequestKind;

const ALL_KINDS: [RequestKind; 3] = [
    RequestKind::VendorPayment,
    RequestKind::Reimbursement,
    RequestKind::SponsorInvoice,
];

/// Counters reported by a full rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildStats {
    /// Tenants visited this run.
    pub tenants_scanned: usize,
    /// Rows in the new index.
    pub rows_indexed: usize,
}

/// Keeps the central index synchronized with the tenant stores.
///
/// Both paths are idempotent: re-running an incremental update or a
/// rebuild with unchanged inputs leaves identical contents.
pub struct IndexMaintainer<T, I> {
    tenants: Arc<T>,
    index: Arc<I>,
    tenant_page_size: u32,
    request_page_size: u32,
}

impl<T: TenantStore, I: IndexStore> IndexMaintainer<T, I> {
    /// Creates a maintainer with the given paging bounds.
    #[must_use]
    pub const fn new(
        tenants: Arc<T>,
        index: Arc<I>,
        tenant_page_size: u32,
        request_page_size: u32,
    ) -> Self {
        Self {
            tenants,
            index,
            tenant_page_size,
            request_page_size,
        }
    }

    /// Incremental path: a request was created or updated.
    ///
    /// Re-fetches the authoritative record, projects it, and upserts the
    /// row in one statement; a non-displayable or vanished record deletes
    /// any existing row instead. Runs synchronously inside the mutation
    /// call path; the caller logs failures and must not fail the parent
    /// mutation.
    pub async fn handle_saved(&self, reference: RequestRef) -> Result<(), StoreError> {
        match self.tenants.get(reference).await? {
            Some(request) => match project(&request) {
                Some(row) => self.index.upsert(row).await,
                None => self.index.delete(reference).await,
            },
            None => self.index.delete(reference).await,
        }
    }

    /// Incremental path: a request was deleted.
    ///
    /// Safe to call even when no row exists.
    pub async fn handle_deleted(&self, reference: RequestRef) -> Result<(), StoreError> {
        self.index.delete(reference).await
    }

    /// Full rebuild: repopulates the index from every tenant store.
    ///
    /// Visits at most `tenant_page_size` tenants (newest first) and pages
    /// through each tenant's requests of every kind in
    /// `request_page_size` chunks. The new rows are swapped in atomically,
    /// so a crash mid-run leaves the previous contents; the next scheduled
    /// run corrects any staleness.
    pub async fn rebuild(&self) -> Result<RebuildStats, StoreError> {
        let mut rows = Vec::new();
        let tenants = self
            .tenants
            .tenant_ids(PageRequest::new(1, self.tenant_page_size))
            .await?;
        let tenants_scanned = tenants.len();

        for tenant_id in tenants {
            for kind in ALL_KINDS {
                let mut page = PageRequest::new(1, self.request_page_size);
                loop {
                    let batch = self.tenants.list(tenant_id, kind, page).await?;
                    let batch_len = batch.len();
                    rows.extend(batch.iter().filter_map(project));
                    if batch_len < self.request_page_size as usize {
                        break;
                    }
                    page = page.next();
                }
            }
            debug!(tenant = %tenant_id, "rebuild scanned tenant");
        }

        let rows_indexed = rows.len();
        self.index.swap_in(rows).await?;
        info!(tenants_scanned, rows_indexed, "index rebuild complete");

        Ok(RebuildStats {
            tenants_scanned,
            rows_indexed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::index::memory::{InMemoryIndexStore, InMemoryTenantStore};
    use crate::request::testutil;
    use crate::request::types::RequestStatus;
    use payrail_shared::types::TenantId;

    fn maintainer(
        tenants: &Arc<InMemoryTenantStore>,
        index: &Arc<InMemoryIndexStore>,
    ) -> IndexMaintainer<InMemoryTenantStore, InMemoryIndexStore> {
        IndexMaintainer::new(Arc::clone(tenants), Arc::clone(index), 1000, 20)
    }

    #[tokio::test]
    async fn test_saved_displayable_request_upserts_row() {
        let tenants = Arc::new(InMemoryTenantStore::new());
        let index = Arc::new(InMemoryIndexStore::new());
        let maintainer = maintainer(&tenants, &index);

        let request = testutil::request(RequestKind::VendorPayment, 1, 1);
        let reference = request.reference();
        tenants.put(request);

        maintainer.handle_saved(reference).await.unwrap();
        assert_eq!(index.all().await.unwrap().len(), 1);

        // Idempotent: re-running changes nothing.
        maintainer.handle_saved(reference).await.unwrap();
        assert_eq!(index.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_row_exists_iff_status_displayable() {
        let tenants = Arc::new(InMemoryTenantStore::new());
        let index = Arc::new(InMemoryIndexStore::new());
        let maintainer = maintainer(&tenants, &index);

        let mut request = testutil::request(RequestKind::Reimbursement, 2, 5);
        let reference = request.reference();

        tenants.put(request.clone());
        maintainer.handle_saved(reference).await.unwrap();
        assert_eq!(index.all().await.unwrap().len(), 1);

        // Moving into an excluded status deletes the row, not soft-marks it.
        request.status = RequestStatus::Draft;
        tenants.put(request);
        maintainer.handle_saved(reference).await.unwrap();
        assert!(index.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleted_request_removes_row() {
        let tenants = Arc::new(InMemoryTenantStore::new());
        let index = Arc::new(InMemoryIndexStore::new());
        let maintainer = maintainer(&tenants, &index);

        let request = testutil::request(RequestKind::SponsorInvoice, 3, 1);
        let reference = request.reference();
        tenants.put(request);
        maintainer.handle_saved(reference).await.unwrap();

        tenants.remove(reference);
        maintainer.handle_deleted(reference).await.unwrap();
        assert!(index.all().await.unwrap().is_empty());

        // Deleting again is safe.
        maintainer.handle_deleted(reference).await.unwrap();
    }

    #[tokio::test]
    async fn test_rebuild_projects_all_tenants_and_kinds() {
        let tenants = Arc::new(InMemoryTenantStore::new());
        let index = Arc::new(InMemoryIndexStore::new());
        let maintainer = maintainer(&tenants, &index);

        // 45 displayable requests across two tenants forces paging past
        // the 20-per-page boundary.
        for record in 1..=45 {
            tenants.put(testutil::request(
                RequestKind::VendorPayment,
                i64::from(record % 2 + 1),
                i64::from(record),
            ));
        }
        // One excluded request never appears.
        let mut draft = testutil::request(RequestKind::VendorPayment, 1, 99);
        draft.status = RequestStatus::Draft;
        tenants.put(draft);

        let stats = maintainer.rebuild().await.unwrap();
        assert_eq!(stats.tenants_scanned, 2);
        assert_eq!(stats.rows_indexed, 45);
        assert_eq!(index.all().await.unwrap().len(), 45);
    }

    #[tokio::test]
    async fn test_rebuild_is_deterministic() {
        let tenants = Arc::new(InMemoryTenantStore::new());
        let index = Arc::new(InMemoryIndexStore::new());
        let maintainer = maintainer(&tenants, &index);

        tenants.put(testutil::reimbursement_with_items(
            1,
            1,
            &[dec!(100.00), dec!(50.005)],
        ));
        tenants.put(testutil::request(RequestKind::SponsorInvoice, 2, 1));

        maintainer.rebuild().await.unwrap();
        let first = index.all().await.unwrap();

        maintainer.rebuild().await.unwrap();
        let second = index.all().await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_rebuild_drops_rows_for_vanished_requests() {
        let tenants = Arc::new(InMemoryTenantStore::new());
        let index = Arc::new(InMemoryIndexStore::new());
        let maintainer = maintainer(&tenants, &index);

        let request = testutil::request(RequestKind::VendorPayment, 1, 1);
        let reference = request.reference();
        tenants.put(request);
        maintainer.rebuild().await.unwrap();
        assert_eq!(index.all().await.unwrap().len(), 1);

        tenants.remove(reference);
        maintainer.rebuild().await.unwrap();
        assert!(index.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rebuild_respects_tenant_page_bound() {
        let tenants = Arc::new(InMemoryTenantStore::new());
        let index = Arc::new(InMemoryIndexStore::new());
        let maintainer =
            IndexMaintainer::new(Arc::clone(&tenants), Arc::clone(&index), 2, 20);

        for tenant in 1..=5 {
            tenants.put(testutil::request(RequestKind::VendorPayment, tenant, 1));
        }

        let stats = maintainer.rebuild().await.unwrap();
        // Only the two newest tenants are visited this run.
        assert_eq!(stats.tenants_scanned, 2);
        let rows = index.all().await.unwrap();
        assert!(rows
            .iter()
            .all(|row| row.tenant_id == TenantId(5) || row.tenant_id == TenantId(4)));
    }
}
