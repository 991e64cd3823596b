//! Financial export encoders.
//!
//! Three independent encoders turn a resolved batch of approved or paid
//! requests into byte-exact files for external banking rails:
//!
//! - [`nacha`]: NACHA ACH fixed-width records for Direct Deposit requests.
//! - [`wire`]: positional wire-transfer CSV for Wire requests.
//! - [`quickchecks`]: pipe-delimited Quick-Checks records for Check requests.
//!
//! Batch resolution goes through the central index only for addressing
//! (`select_window` on approved/paid rows inside the caller's timestamp
//! window) and then re-fetches each request from its authoritative tenant
//! store, decrypting sensitive fields on the way. The index is a
//! best-effort cache; nothing beyond `(tenant_id, record_id)` is trusted
//! from it.
//!
//! A request missing a field its payout method requires is skipped, never
//! failed. The workflow engine's completeness guard makes such records
//! unreachable through normal approval, so a skip here means legacy data.

pub mod nacha;
pub mod quickchecks;
pub mod wire;

use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::warn;

use payrail_shared::types::{round_cents, Currency, RequestRef};

use crate::crypto::FieldCodec;
use crate::index::{IndexStore, StoreError, TenantStore};
use crate::rates::RateProvider;
use crate::request::{PaymentMethod, Request, RequestStatus};

pub use quickchecks::{InMemorySequenceCounter, QuickChecksEncoder, SequenceCounter};

/// Statuses eligible for export.
pub const EXPORTABLE_STATUSES: [RequestStatus; 2] = [RequestStatus::Approved, RequestStatus::Paid];

/// Export pipeline errors.
#[derive(Debug, Error)]
pub enum ExportError {
    /// A backing store failed while resolving the batch.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The check sequence counter lock could not be acquired in time.
    /// Retryable; a stale lock expires on its own.
    #[error("Sequence counter lock timed out after {0:?}")]
    LockTimeout(Duration),

    /// A record could not be encoded. The whole run aborts so a partial
    /// file is never emitted.
    #[error("Cannot encode request {reference}: {reason}")]
    Encoding {
        /// The offending record.
        reference: RequestRef,
        /// What went wrong.
        reason: String,
    },
}

/// A request resolved and normalized for encoding.
///
/// Sensitive fields are decrypted (empty string when decryption failed or
/// the field was never set) and the amount is rounded to cents.
#[derive(Debug, Clone)]
pub struct PayableRequest {
    /// The authoritative record.
    pub request: Request,
    /// Total amount, rounded to two decimal places.
    pub amount: Decimal,
    /// USD-converted amount, when the request currency is not USD and the
    /// rate lookup succeeded. Advisory only; rails receive `amount`.
    pub usd_amount: Option<Decimal>,
    /// Receiving bank name.
    pub bank_name: String,
    /// Beneficiary account number or IBAN.
    pub account_number: String,
    /// Bank routing number or SWIFT code.
    pub routing_number: String,
    /// Beneficiary street address.
    pub beneficiary_address: String,
    /// Name a check is made payable to.
    pub payable_to: String,
}

impl PayableRequest {
    /// The payout method, if one was chosen.
    #[must_use]
    pub fn method(&self) -> Option<PaymentMethod> {
        self.request.method
    }

    fn decrypt_field(
        codec: &FieldCodec,
        reference: RequestRef,
        name: &str,
        raw: Option<&str>,
    ) -> String {
        let Some(raw) = raw else {
            return String::new();
        };
        let (value, error) = codec.maybe_decrypt(raw);
        if let Some(error) = error {
            warn!(request = %reference, field = name, %error, "sensitive field unreadable");
        }
        value
    }

    /// Resolves one request: decrypts sensitive fields, rounds the amount,
    /// and annotates a USD conversion when a rate is available.
    pub async fn resolve(
        request: Request,
        codec: &FieldCodec,
        rates: Option<&dyn RateProvider>,
    ) -> Self {
        let reference = request.reference();
        let amount = request.total_amount();
        let usd_amount = annotate_usd(rates, reference, &request.currency, amount).await;

        let sensitive = &request.sensitive;
        let bank_name =
            Self::decrypt_field(codec, reference, "bank_name", sensitive.bank_name.as_deref());
        let account_number = Self::decrypt_field(
            codec,
            reference,
            "account_number",
            sensitive.account_number.as_deref(),
        );
        let routing_number = Self::decrypt_field(
            codec,
            reference,
            "routing_number",
            sensitive.routing_number.as_deref(),
        );
        let beneficiary_address = Self::decrypt_field(
            codec,
            reference,
            "beneficiary_address",
            sensitive.beneficiary_address.as_deref(),
        );
        let payable_to =
            Self::decrypt_field(codec, reference, "payable_to", sensitive.payable_to.as_deref());

        Self {
            request,
            amount,
            usd_amount,
            bank_name,
            account_number,
            routing_number,
            beneficiary_address,
            payable_to,
        }
    }
}

async fn annotate_usd(
    rates: Option<&dyn RateProvider>,
    reference: RequestRef,
    currency: &Currency,
    amount: Decimal,
) -> Option<Decimal> {
    let rates = rates?;
    let usd = Currency::usd();
    if currency.is_unset() || *currency == usd {
        return None;
    }
    match rates.rate(currency, &usd).await {
        Ok(rate) => Some(round_cents(amount.checked_mul(rate)?)),
        Err(error) => {
            // Conversion is an annotation; the primary amount still exports.
            warn!(request = %reference, %currency, %error, "rate lookup failed");
            None
        }
    }
}

/// Resolves the export batch for a timestamp window.
///
/// Selects approved/paid index rows inside `[start, end]`, re-fetches each
/// request from its tenant store, and normalizes it for encoding. Index
/// rows whose authoritative record has vanished or left an exportable
/// status are dropped. Output preserves the index selection order.
pub async fn resolve_batch<T, I>(
    tenants: &T,
    index: &I,
    codec: &FieldCodec,
    rates: Option<&dyn RateProvider>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<PayableRequest>, ExportError>
where
    T: TenantStore + ?Sized,
    I: IndexStore + ?Sized,
{
    let references = index.select_window(&EXPORTABLE_STATUSES, start, end).await?;

    let mut batch = Vec::with_capacity(references.len());
    for reference in references {
        let Some(request) = tenants.get(reference).await? else {
            warn!(request = %reference, "index row has no authoritative record");
            continue;
        };
        if !EXPORTABLE_STATUSES.contains(&request.status) {
            continue;
        }
        batch.push(PayableRequest::resolve(request, codec, rates).await);
    }
    Ok(batch)
}

/// Formats a cent-rounded amount with exactly two decimal places.
pub(crate) fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", round_cents(amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    use crate::index::{InMemoryIndexStore, InMemoryTenantStore};
    use crate::rates::FixedRates;
    use crate::request::testutil;
    use crate::request::RequestKind;

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 12, 31, 0, 0, 0).unwrap(),
        )
    }

    async fn seed(
        tenants: &InMemoryTenantStore,
        index: &InMemoryIndexStore,
        request: Request,
    ) {
        tenants.put(request.clone());
        if let Some(row) = crate::index::project(&request) {
            index.upsert(row).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_resolve_batch_decrypts_and_rounds() {
        let tenants = InMemoryTenantStore::new();
        let index = InMemoryIndexStore::new();
        let codec = FieldCodec::new([7u8; 32], b"hmac-secret".to_vec());

        let mut request = testutil::reimbursement_with_items(42, 7, &[dec!(100.00), dec!(50.005)]);
        request.status = RequestStatus::Approved;
        request.sensitive.account_number =
            Some(codec.encrypt("998877").unwrap().to_string());
        seed(&tenants, &index, request).await;

        let (start, end) = window();
        let batch = resolve_batch(&tenants, &index, &codec, None, start, end)
            .await
            .unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].amount, dec!(150.01));
        assert_eq!(batch[0].account_number, "998877");
        assert_eq!(batch[0].routing_number, "021000021");
    }

    #[tokio::test]
    async fn test_resolve_batch_skips_non_exportable_statuses() {
        let tenants = InMemoryTenantStore::new();
        let index = InMemoryIndexStore::new();
        let codec = FieldCodec::unavailable();

        let mut approved = testutil::request(RequestKind::VendorPayment, 1, 1);
        approved.status = RequestStatus::Approved;
        seed(&tenants, &index, approved).await;

        let mut pending = testutil::request(RequestKind::VendorPayment, 1, 2);
        pending.status = RequestStatus::PendingApproval;
        seed(&tenants, &index, pending).await;

        let (start, end) = window();
        let batch = resolve_batch(&tenants, &index, &codec, None, start, end)
            .await
            .unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].request.record_id.0, 1);
    }

    #[tokio::test]
    async fn test_resolve_batch_drops_vanished_records() {
        let tenants = InMemoryTenantStore::new();
        let index = InMemoryIndexStore::new();
        let codec = FieldCodec::unavailable();

        let mut request = testutil::request(RequestKind::VendorPayment, 3, 9);
        request.status = RequestStatus::Paid;
        seed(&tenants, &index, request).await;
        tenants.remove(RequestRef::new(3.into(), 9.into()));

        let (start, end) = window();
        let batch = resolve_batch(&tenants, &index, &codec, None, start, end)
            .await
            .unwrap();
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_usd_annotation_and_degradation() {
        let codec = FieldCodec::unavailable();
        let eur = Currency::new("EUR").unwrap();
        let rates = Arc::new(FixedRates::new().with_rate(&eur, &Currency::usd(), dec!(1.10)));

        let mut request = testutil::request(RequestKind::VendorPayment, 1, 1);
        request.status = RequestStatus::Approved;
        request.amount = dec!(100.00);
        request.currency = eur;
        let resolved =
            PayableRequest::resolve(request.clone(), &codec, Some(rates.as_ref())).await;
        assert_eq!(resolved.usd_amount, Some(dec!(110.00)));

        // A pair the provider cannot serve degrades to no annotation.
        request.currency = Currency::new("JPY").unwrap();
        let resolved = PayableRequest::resolve(request, &codec, Some(rates.as_ref())).await;
        assert_eq!(resolved.usd_amount, None);
    }

    #[test]
    fn test_format_amount_two_places() {
        assert_eq!(format_amount(dec!(150.005)), "150.01");
        assert_eq!(format_amount(dec!(7)), "7.00");
    }
}
