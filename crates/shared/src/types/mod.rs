//! Shared domain primitives.

pub mod id;
pub mod money;
pub mod pagination;

pub use id::{ActorId, AuditEntryId, RecordId, RequestRef, TenantId};
pub use money::{round_cents, Currency};
pub use pagination::PageRequest;
