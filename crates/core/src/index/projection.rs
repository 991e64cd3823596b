//! Request-to-index-row projection.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use payrail_shared::types::{Currency, RecordId, RequestRef, TenantId};

use crate::request::types::{KindDetails, PaymentMethod, Request, RequestKind, RequestStatus};

/// Maximum stored title length, in characters.
pub const MAX_TITLE_LEN: usize = 128;

/// One denormalized row in the central index.
///
/// Kind-specific columns are `None` for the other kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRow {
    /// Owning tenant store.
    pub tenant_id: TenantId,
    /// Record within the tenant.
    pub record_id: RecordId,
    /// Request kind.
    pub kind: RequestKind,
    /// Unified lifecycle status.
    pub status: RequestStatus,
    /// Total amount (line-item sum for reimbursements), rounded to cents.
    pub amount: Decimal,
    /// Request currency.
    pub currency: Currency,
    /// Title, truncated to [`MAX_TITLE_LEN`] characters.
    pub title: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Payment timestamp, once paid.
    pub paid_at: Option<DateTime<Utc>>,
    /// Spending category (vendor payments).
    pub category: Option<String>,
    /// Payout method (vendor payments).
    pub method: Option<PaymentMethod>,
    /// Event site name (reimbursements).
    pub wordcamp_name: Option<String>,
    /// Disbursement date (reimbursements).
    pub date_paid: Option<NaiveDate>,
    /// Sponsor name (sponsor invoices).
    pub sponsor_name: Option<String>,
    /// Payment due date (sponsor invoices).
    pub due_date: Option<NaiveDate>,
}

impl IndexRow {
    /// The row's primary key.
    #[must_use]
    pub const fn reference(&self) -> RequestRef {
        RequestRef::new(self.tenant_id, self.record_id)
    }
}

/// Projects a request into its index row.
///
/// Returns `None` when the status is excluded for the kind; the caller
/// deletes any existing row in that case. The projection is pure and
/// deterministic so repeated rebuilds produce identical contents.
#[must_use]
pub fn project(request: &Request) -> Option<IndexRow> {
    let kind = request.kind();
    if !request.status.is_displayable(kind) {
        return None;
    }

    let mut row = IndexRow {
        tenant_id: request.tenant_id,
        record_id: request.record_id,
        kind,
        status: request.status,
        amount: request.total_amount(),
        currency: request.currency.clone(),
        title: truncate_title(&request.title),
        created_at: request.created_at,
        updated_at: request.updated_at,
        paid_at: request.paid_at,
        category: None,
        method: None,
        wordcamp_name: None,
        date_paid: None,
        sponsor_name: None,
        due_date: None,
    };

    match &request.details {
        KindDetails::Payment { category, .. } => {
            row.category = Some(category.clone());
            row.method = request.method;
        }
        KindDetails::Reimbursement {
            wordcamp_name,
            date_paid,
        } => {
            row.wordcamp_name = Some(wordcamp_name.clone());
            row.date_paid = *date_paid;
        }
        KindDetails::Invoice {
            sponsor_name,
            due_date,
            ..
        } => {
            row.sponsor_name = Some(sponsor_name.clone());
            row.due_date = *due_date;
        }
    }

    Some(row)
}

fn truncate_title(title: &str) -> String {
    title.chars().take(MAX_TITLE_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::request::testutil;

    #[test]
    fn test_projection_gated_by_status() {
        let mut request = testutil::request(RequestKind::VendorPayment, 1, 1);
        for status in [
            RequestStatus::AutoDraft,
            RequestStatus::Draft,
            RequestStatus::Trash,
        ] {
            request.status = status;
            assert!(project(&request).is_none(), "{status} must not project");
        }

        request.status = RequestStatus::PendingApproval;
        assert!(project(&request).is_some());
    }

    #[test]
    fn test_reimbursement_amount_is_line_item_sum() {
        let request = testutil::reimbursement_with_items(42, 7, &[dec!(100.00), dec!(50.005)]);
        let row = project(&request).unwrap();
        assert_eq!(row.amount, dec!(150.01));
        assert_eq!(row.wordcamp_name.as_deref(), Some("WordCamp Testville"));
        assert!(row.category.is_none());
        assert!(row.sponsor_name.is_none());
    }

    #[test]
    fn test_payment_kind_columns() {
        let request = testutil::request(RequestKind::VendorPayment, 3, 9);
        let row = project(&request).unwrap();
        assert_eq!(row.category.as_deref(), Some("venue"));
        assert_eq!(row.method, Some(PaymentMethod::DirectDeposit));
        assert!(row.wordcamp_name.is_none());
    }

    #[test]
    fn test_invoice_kind_columns() {
        let request = testutil::request(RequestKind::SponsorInvoice, 3, 9);
        let row = project(&request).unwrap();
        assert_eq!(row.sponsor_name.as_deref(), Some("Acme Hosting"));
        assert!(row.due_date.is_some());
        assert!(row.method.is_none());
    }

    #[test]
    fn test_title_truncated_to_char_limit() {
        let mut request = testutil::request(RequestKind::VendorPayment, 1, 1);
        request.title = "é".repeat(200);
        let row = project(&request).unwrap();
        assert_eq!(row.title.chars().count(), MAX_TITLE_LEN);
    }

    #[test]
    fn test_projection_is_deterministic() {
        let request = testutil::request(RequestKind::Reimbursement, 5, 6);
        assert_eq!(project(&request), project(&request));
    }
}
