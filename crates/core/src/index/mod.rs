//! Cross-tenant denormalized index.
//!
//! One central table holds a row per displayable request across every
//! tenant store, so the operator dashboard can sort and filter without
//! visiting tenants. The index is a best-effort cache, eventually
//! consistent with the authoritative per-tenant records: anything needing
//! authoritative freshness re-fetches the request and trusts index rows
//! only for `(tenant_id, record_id)` addressing.

pub mod maintainer;
pub mod memory;
pub mod projection;
pub mod store;

pub use maintainer::{IndexMaintainer, RebuildStats};
pub use memory::{InMemoryIndexStore, InMemoryTenantStore};
pub use projection::{project, IndexRow, MAX_TITLE_LEN};
pub use store::{IndexStore, StoreError, TenantStore};
