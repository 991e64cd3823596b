//! Request builders for tests.

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use payrail_shared::types::{ActorId, Currency, RecordId, TenantId};

use super::types::{
    KindDetails, LineItem, PaymentMethod, Request, RequestKind, RequestStatus, SensitiveFields,
};

/// A deterministic baseline request of the given kind.
#[must_use]
pub fn request(kind: RequestKind, tenant_id: i64, record_id: i64) -> Request {
    let created = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let details = match kind {
        RequestKind::VendorPayment => KindDetails::Payment {
            category: "venue".to_string(),
            invoice_number: "INV-1001".to_string(),
        },
        RequestKind::Reimbursement => KindDetails::Reimbursement {
            wordcamp_name: "WordCamp Testville".to_string(),
            date_paid: None,
        },
        RequestKind::SponsorInvoice => KindDetails::Invoice {
            sponsor_name: "Acme Hosting".to_string(),
            due_date: NaiveDate::from_ymd_opt(2026, 4, 1),
            classification: "standard".to_string(),
        },
    };

    Request {
        tenant_id: TenantId(tenant_id),
        record_id: RecordId(record_id),
        status: RequestStatus::PendingApproval,
        amount: dec!(250.00),
        currency: Currency::usd(),
        title: "Conference venue deposit".to_string(),
        author_id: ActorId::from_uuid(Uuid::from_u128(0x1111_2222_3333_4444)),
        author_email: "organizer@example.test".to_string(),
        method: Some(PaymentMethod::DirectDeposit),
        created_at: created,
        updated_at: created,
        paid_at: None,
        line_items: Vec::new(),
        sensitive: SensitiveFields {
            bank_name: Some("First Test Bank".to_string()),
            account_number: Some("12345678".to_string()),
            routing_number: Some("021000021".to_string()),
            beneficiary_address: Some("1 Main St, Testville".to_string()),
            payable_to: Some("Jordan Organizer".to_string()),
        },
        details,
    }
}

/// A reimbursement with the given line item amounts.
#[must_use]
pub fn reimbursement_with_items(tenant_id: i64, record_id: i64, amounts: &[Decimal]) -> Request {
    let mut req = request(RequestKind::Reimbursement, tenant_id, record_id);
    req.line_items = amounts
        .iter()
        .map(|amount| LineItem {
            category: "venue".to_string(),
            vendor: "City Hall".to_string(),
            description: "deposit".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            amount: *amount,
        })
        .collect();
    req
}
