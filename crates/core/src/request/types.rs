//! Request domain types.
//!
//! The source of truth for a request always lives in its owning tenant
//! store; everything here is addressed by `(tenant_id, record_id)`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use payrail_shared::types::{round_cents, ActorId, Currency, RecordId, RequestRef, TenantId};

/// The three financial request kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Payment to an external vendor.
    VendorPayment,
    /// Out-of-pocket reimbursement with itemized expenses.
    Reimbursement,
    /// Invoice issued to a sponsor.
    SponsorInvoice,
}

impl RequestKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VendorPayment => "vendor_payment",
            Self::Reimbursement => "reimbursement",
            Self::SponsorInvoice => "sponsor_invoice",
        }
    }

    /// Parses a kind from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "vendor_payment" => Some(Self::VendorPayment),
            "reimbursement" => Some(Self::Reimbursement),
            "sponsor_invoice" => Some(Self::SponsorInvoice),
            _ => None,
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Request lifecycle status (union across kinds).
///
/// `AutoDraft` and `Trash` are storage-level states a tenant store may
/// report; they are never displayable and never indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    /// Unsaved placeholder created by the tenant store.
    AutoDraft,
    /// Being drafted by the requester.
    Draft,
    /// Submitted, awaiting operator review.
    PendingApproval,
    /// Sent back for more information; reason recorded.
    Incomplete,
    /// Approved by an operator.
    Approved,
    /// Queued for a payment run.
    PendingPayment,
    /// Paid out through a banking rail.
    Paid,
    /// Payment attempt failed.
    Failed,
    /// Cancelled by an operator.
    Cancelled,
    /// Invoice written off as uncollectible.
    Uncollectible,
    /// Paid invoice subsequently refunded.
    Refunded,
    /// Deleted into the tenant store's trash.
    Trash,
}

impl RequestStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AutoDraft => "auto-draft",
            Self::Draft => "draft",
            Self::PendingApproval => "pending-approval",
            Self::Incomplete => "incomplete",
            Self::Approved => "approved",
            Self::PendingPayment => "pending-payment",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Uncollectible => "uncollectible",
            Self::Refunded => "refunded",
            Self::Trash => "trash",
        }
    }

    /// Parses a status from its current slug.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "auto-draft" => Some(Self::AutoDraft),
            "draft" => Some(Self::Draft),
            "pending-approval" => Some(Self::PendingApproval),
            "incomplete" => Some(Self::Incomplete),
            "approved" => Some(Self::Approved),
            "pending-payment" => Some(Self::PendingPayment),
            "paid" => Some(Self::Paid),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            "uncollectible" => Some(Self::Uncollectible),
            "refunded" => Some(Self::Refunded),
            "trash" => Some(Self::Trash),
            _ => None,
        }
    }

    /// Human-readable label for notification subjects.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AutoDraft => "Auto Draft",
            Self::Draft => "Draft",
            Self::PendingApproval => "Pending Approval",
            Self::Incomplete => "Incomplete",
            Self::Approved => "Approved",
            Self::PendingPayment => "Pending Payment",
            Self::Paid => "Paid",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
            Self::Uncollectible => "Uncollectible",
            Self::Refunded => "Refunded",
            Self::Trash => "Trash",
        }
    }

    /// Statuses excluded from the central index, per kind.
    ///
    /// An index row exists iff the request's status is displayable; a
    /// request that enters an excluded status has its row deleted.
    #[must_use]
    pub const fn excluded_statuses(kind: RequestKind) -> &'static [Self] {
        match kind {
            RequestKind::VendorPayment | RequestKind::Reimbursement | RequestKind::SponsorInvoice => {
                &[Self::AutoDraft, Self::Trash, Self::Draft]
            }
        }
    }

    /// Returns true if a request in this status appears in the index.
    #[must_use]
    pub fn is_displayable(self, kind: RequestKind) -> bool {
        !Self::excluded_statuses(kind).contains(&self)
    }

    /// Returns true if this status ends the lifecycle for the given kind.
    ///
    /// `Paid` is terminal for payments and reimbursements; a paid sponsor
    /// invoice may still transition to `Refunded`.
    #[must_use]
    pub const fn is_terminal(self, kind: RequestKind) -> bool {
        match self {
            Self::Paid => !matches!(kind, RequestKind::SponsorInvoice),
            Self::Cancelled | Self::Failed | Self::Refunded => true,
            _ => false,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a request is to be paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// ACH direct deposit (NACHA export).
    DirectDeposit,
    /// International wire (wire CSV export).
    Wire,
    /// Paper check (Quick-Checks export).
    Check,
}

impl PaymentMethod {
    /// Returns the string representation of the method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DirectDeposit => "Direct Deposit",
            Self::Wire => "Wire",
            Self::Check => "Check",
        }
    }

    /// Parses a method from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Direct Deposit" => Some(Self::DirectDeposit),
            "Wire" => Some(Self::Wire),
            "Check" => Some(Self::Check),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One itemized expense on a reimbursement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Expense category (travel, venue, swag, ...).
    pub category: String,
    /// Vendor the expense was paid to.
    pub vendor: String,
    /// Free-form description.
    pub description: String,
    /// Date the expense was incurred.
    pub date: NaiveDate,
    /// Expense amount in the request currency.
    pub amount: Decimal,
}

/// Named sensitive banking fields, stored in their serialized form.
///
/// Values are either legacy plaintext or `encrypted:`-tagged triples; the
/// crypto codec decides which at read time. Keeping these in a dedicated
/// struct (rather than a loose key/value bag) makes "forgot to encrypt
/// this field" unrepresentable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitiveFields {
    /// Receiving bank name.
    pub bank_name: Option<String>,
    /// Beneficiary account number (or IBAN).
    pub account_number: Option<String>,
    /// Bank routing number / SWIFT code.
    pub routing_number: Option<String>,
    /// Beneficiary street address.
    pub beneficiary_address: Option<String>,
    /// Name a check is made payable to.
    pub payable_to: Option<String>,
}

/// Kind-specific fields carried by a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KindDetails {
    /// Vendor payment specifics.
    Payment {
        /// Spending category.
        category: String,
        /// Vendor invoice number.
        invoice_number: String,
    },
    /// Reimbursement specifics.
    Reimbursement {
        /// Name of the event site the expense belongs to.
        wordcamp_name: String,
        /// Date funds were disbursed, once paid.
        date_paid: Option<NaiveDate>,
    },
    /// Sponsor invoice specifics.
    Invoice {
        /// Sponsor being invoiced.
        sponsor_name: String,
        /// Payment due date.
        due_date: Option<NaiveDate>,
        /// Routing classification used by the funds desk.
        classification: String,
    },
}

impl KindDetails {
    /// The request kind these details belong to.
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        match self {
            Self::Payment { .. } => RequestKind::VendorPayment,
            Self::Reimbursement { .. } => RequestKind::Reimbursement,
            Self::Invoice { .. } => RequestKind::SponsorInvoice,
        }
    }
}

/// The authoritative financial record, owned by exactly one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Owning tenant store.
    pub tenant_id: TenantId,
    /// Record id, unique within the tenant.
    pub record_id: RecordId,
    /// Lifecycle status.
    pub status: RequestStatus,
    /// Requested amount (ignored for reimbursements, which sum line items).
    pub amount: Decimal,
    /// ISO 4217 currency, or the unset sentinel on legacy records.
    pub currency: Currency,
    /// Human-readable title.
    pub title: String,
    /// The requester who owns this record.
    pub author_id: ActorId,
    /// Notification address of the requester.
    pub author_email: String,
    /// Payout method, once chosen.
    pub method: Option<PaymentMethod>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// When the request was paid, if it has been.
    pub paid_at: Option<DateTime<Utc>>,
    /// Itemized expenses (reimbursements only).
    pub line_items: Vec<LineItem>,
    /// Encrypted-at-rest banking fields.
    pub sensitive: SensitiveFields,
    /// Kind-specific fields.
    pub details: KindDetails,
}

impl Request {
    /// The request's kind, derived from its details.
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        self.details.kind()
    }

    /// The request's globally unique address.
    #[must_use]
    pub const fn reference(&self) -> RequestRef {
        RequestRef::new(self.tenant_id, self.record_id)
    }

    /// Total monetary amount, rounded to cents.
    ///
    /// Reimbursements sum their line items; other kinds carry a single
    /// amount. 100.00 + 50.005 totals 150.01.
    #[must_use]
    pub fn total_amount(&self) -> Decimal {
        let raw = match self.kind() {
            RequestKind::Reimbursement => self.line_items.iter().map(|item| item.amount).sum(),
            RequestKind::VendorPayment | RequestKind::SponsorInvoice => self.amount,
        };
        round_cents(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    use crate::request::testutil;

    #[test]
    fn test_reimbursement_total_sums_and_rounds_line_items() {
        let request = testutil::reimbursement_with_items(42, 7, &[dec!(100.00), dec!(50.005)]);
        assert_eq!(request.total_amount(), dec!(150.01));
    }

    #[test]
    fn test_payment_total_uses_single_amount() {
        let mut request = testutil::request(RequestKind::VendorPayment, 1, 1);
        request.amount = dec!(99.999);
        assert_eq!(request.total_amount(), dec!(100.00));
    }

    #[rstest]
    #[case(RequestStatus::AutoDraft, false)]
    #[case(RequestStatus::Draft, false)]
    #[case(RequestStatus::Trash, false)]
    #[case(RequestStatus::PendingApproval, true)]
    #[case(RequestStatus::Incomplete, true)]
    #[case(RequestStatus::Approved, true)]
    #[case(RequestStatus::Paid, true)]
    fn test_displayable_gate(#[case] status: RequestStatus, #[case] displayable: bool) {
        for kind in [
            RequestKind::VendorPayment,
            RequestKind::Reimbursement,
            RequestKind::SponsorInvoice,
        ] {
            assert_eq!(status.is_displayable(kind), displayable, "{kind} {status}");
        }
    }

    #[test]
    fn test_paid_terminal_except_for_invoices() {
        assert!(RequestStatus::Paid.is_terminal(RequestKind::VendorPayment));
        assert!(RequestStatus::Paid.is_terminal(RequestKind::Reimbursement));
        assert!(!RequestStatus::Paid.is_terminal(RequestKind::SponsorInvoice));
        assert!(RequestStatus::Refunded.is_terminal(RequestKind::SponsorInvoice));
    }

    #[test]
    fn test_status_slug_roundtrip() {
        for status in [
            RequestStatus::AutoDraft,
            RequestStatus::Draft,
            RequestStatus::PendingApproval,
            RequestStatus::Incomplete,
            RequestStatus::Approved,
            RequestStatus::PendingPayment,
            RequestStatus::Paid,
            RequestStatus::Failed,
            RequestStatus::Cancelled,
            RequestStatus::Uncollectible,
            RequestStatus::Refunded,
            RequestStatus::Trash,
        ] {
            assert_eq!(RequestStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(
            PaymentMethod::parse("Direct Deposit"),
            Some(PaymentMethod::DirectDeposit)
        );
        assert_eq!(PaymentMethod::parse("Wire"), Some(PaymentMethod::Wire));
        assert_eq!(PaymentMethod::parse("Check"), Some(PaymentMethod::Check));
        assert_eq!(PaymentMethod::parse("check"), None);
    }
}
