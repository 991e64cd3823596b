//! Financial request records.
//!
//! A request is the authoritative financial record owned by exactly one
//! tenant: a vendor payment, a reimbursement, or a sponsor invoice.

pub mod feed;
pub mod statusmap;
#[cfg(test)]
pub mod testutil;
pub mod types;

pub use feed::{request_from_feed, FeedError};
pub use statusmap::remap_status;
pub use types::{
    KindDetails, LineItem, PaymentMethod, Request, RequestKind, RequestStatus, SensitiveFields,
};
