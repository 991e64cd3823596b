//! Legacy status remapping.
//!
//! Tenant stores created before the unified lifecycle carry historical
//! status slugs. Each kind has one versioned mapping table from old slug
//! to the current vocabulary; every status read passes through here so
//! historical and current records unify under one set of statuses.

use super::types::{RequestKind, RequestStatus};

/// Version of the consolidated mapping tables. Bump when a table changes
/// so stored projections can be invalidated.
pub const STATUS_MAP_VERSION: u32 = 2;

/// Legacy slug table for vendor payments.
const PAYMENT_LEGACY: &[(&str, RequestStatus)] = &[
    ("unpaid", RequestStatus::PendingApproval),
    ("incomplete-payment", RequestStatus::Incomplete),
    ("paid-full", RequestStatus::Paid),
    ("payment-failed", RequestStatus::Failed),
];

/// Legacy slug table for reimbursements.
const REIMBURSEMENT_LEGACY: &[(&str, RequestStatus)] = &[
    ("submitted", RequestStatus::PendingApproval),
    ("info-requested", RequestStatus::Incomplete),
    ("reimbursed", RequestStatus::Paid),
    ("rejected", RequestStatus::Cancelled),
];

/// Legacy slug table for sponsor invoices.
const INVOICE_LEGACY: &[(&str, RequestStatus)] = &[
    ("sent", RequestStatus::Approved),
    ("due", RequestStatus::PendingPayment),
    ("settled", RequestStatus::Paid),
    ("written-off", RequestStatus::Uncollectible),
];

/// Maps a raw stored status slug to the current vocabulary.
///
/// Current slugs map to themselves; legacy slugs go through the kind's
/// table. Unknown slugs return `None` and the caller decides whether to
/// skip or surface the record.
#[must_use]
pub fn remap_status(kind: RequestKind, raw: &str) -> Option<RequestStatus> {
    if let Some(status) = RequestStatus::parse(raw) {
        return Some(status);
    }

    let table = match kind {
        RequestKind::VendorPayment => PAYMENT_LEGACY,
        RequestKind::Reimbursement => REIMBURSEMENT_LEGACY,
        RequestKind::SponsorInvoice => INVOICE_LEGACY,
    };

    table
        .iter()
        .find(|(slug, _)| *slug == raw)
        .map(|(_, status)| *status)
}
