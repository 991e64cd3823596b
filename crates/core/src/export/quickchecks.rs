//! Quick-Checks file encoder.
//!
//! Pipe-delimited payloads inside comma-separated record lines, wrapped
//! in `FILHDR`/`FILTRL`. Each Check request emits a fixed six-line group:
//! `PMTHDR`, `PAYENM`, `PYEADD`, `ADDPYE`, `PYEPOS`, `PYTDES`.
//!
//! Check reference numbers must be globally unique across concurrent
//! export runs, so they come from a persisted [`SequenceCounter`] guarded
//! by a short-lived lock. The lock carries a TTL; a holder that crashes
//! before releasing only blocks exports until the TTL expires.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::export::{format_amount, ExportError, PayableRequest};
use crate::request::PaymentMethod;

/// How long a counter lock may be held before it is considered stale.
pub const LOCK_TTL: Duration = Duration::from_secs(30);

/// Persisted, mutually-exclusive check number source.
///
/// `reserve` hands out a contiguous block of numbers exactly once; two
/// concurrent reservations never overlap. A held lock makes the call
/// fail with [`ExportError::LockTimeout`], which is retryable.
#[async_trait]
pub trait SequenceCounter: Send + Sync {
    /// Reserves `count` consecutive check numbers, returning the first.
    async fn reserve(&self, count: u64) -> Result<u64, ExportError>;
}

struct CounterState {
    next: u64,
    locked_until: Option<Instant>,
}

/// Process-local sequence counter.
///
/// Reservation happens atomically under one mutex, so this never waits;
/// a lock left behind by [`Self::hold_lock`] is honored until its TTL
/// expires, after which it is reclaimed.
pub struct InMemorySequenceCounter {
    state: Mutex<CounterState>,
    lock_ttl: Duration,
}

impl InMemorySequenceCounter {
    /// Creates a counter that will hand out numbers from `start`.
    #[must_use]
    pub fn new(start: u64) -> Self {
        Self {
            state: Mutex::new(CounterState {
                next: start,
                locked_until: None,
            }),
            lock_ttl: LOCK_TTL,
        }
    }

    /// Simulates a holder that acquired the lock and died before
    /// releasing it.
    pub fn hold_lock(&self, held_for: Duration) {
        let mut state = self.state.lock().expect("counter poisoned");
        state.locked_until = Some(Instant::now() + held_for);
    }
}

#[async_trait]
impl SequenceCounter for InMemorySequenceCounter {
    async fn reserve(&self, count: u64) -> Result<u64, ExportError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ExportError::LockTimeout(self.lock_ttl))?;

        if let Some(until) = state.locked_until {
            if until > Instant::now() {
                return Err(ExportError::LockTimeout(self.lock_ttl));
            }
            // Stale lock; the holder never released. Reclaim it.
            state.locked_until = None;
        }

        let start = state.next;
        state.next = state.next.saturating_add(count);
        Ok(start)
    }
}

/// Quick-Checks encoder for paper check requests.
pub struct QuickChecksEncoder {
    company_name: String,
}

struct CheckEntry<'a> {
    payable: &'a PayableRequest,
}

impl QuickChecksEncoder {
    /// Creates an encoder stamping `company_name` on the file header.
    #[must_use]
    pub fn new(company_name: &str) -> Self {
        Self {
            company_name: company_name.to_string(),
        }
    }

    /// Encodes the batch into a complete Quick-Checks file.
    ///
    /// Requests whose method is not Check, or which lack a payable name,
    /// are skipped. Check numbers are reserved from `counter` in one
    /// block before any line is written, so an aborted run leaks unused
    /// numbers rather than reusing them.
    pub async fn encode(
        &self,
        batch: &[PayableRequest],
        counter: &dyn SequenceCounter,
        created_at: DateTime<Utc>,
    ) -> Result<String, ExportError> {
        let entries: Vec<CheckEntry<'_>> = batch
            .iter()
            .filter(|payable| {
                if payable.method() != Some(PaymentMethod::Check) {
                    return false;
                }
                if payable.payable_to.is_empty() {
                    debug!(request = %payable.request.reference(), "skipping incomplete check entry");
                    return false;
                }
                true
            })
            .map(|payable| CheckEntry { payable })
            .collect();

        // Nothing to number when the batch has no check entries; skip the
        // counter so an empty window never contends for the lock.
        let first_number = if entries.is_empty() {
            0
        } else {
            counter.reserve(entries.len() as u64).await?
        };

        let mut out = String::new();
        out.push_str(&format!(
            "FILHDR,PWS|{}|{}\n",
            self.company_name,
            created_at.format("%m/%d/%Y %H:%M:%S"),
        ));

        let mut running = rust_decimal::Decimal::ZERO;
        for (offset, entry) in entries.iter().enumerate() {
            let number = first_number + offset as u64;
            let payable = entry.payable;
            running = running
                .checked_add(payable.amount)
                .ok_or_else(|| ExportError::Encoding {
                    reference: payable.request.reference(),
                    reason: "batch total overflow".to_string(),
                })?;
            out.push_str(&format!(
                "PMTHDR,CHK|{number:0>8}|{date}|{amount}\n",
                date = created_at.format("%m/%d/%Y"),
                amount = format_amount(payable.amount),
            ));
            out.push_str(&format!("PAYENM,{}\n", sanitize(&payable.payable_to)));
            out.push_str(&format!(
                "PYEADD,{}\n",
                sanitize(&payable.beneficiary_address)
            ));
            out.push_str("ADDPYE,\n");
            out.push_str("PYEPOS,\n");
            out.push_str(&format!("PYTDES,{}\n", sanitize(&payable.request.title)));
        }
        out.push_str(&format!(
            "FILTRL,{}|{}\n",
            entries.len(),
            format_amount(running)
        ));
        Ok(out)
    }
}

/// Strips record and field separators out of free-form text.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            ',' | '|' | '\n' | '\r' => ' ',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;
    use std::sync::Arc;

    use crate::crypto::FieldCodec;
    use crate::request::testutil;
    use crate::request::RequestStatus;

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap()
    }

    async fn reimbursement_payable(
        record: i64,
        method: PaymentMethod,
        amounts: &[Decimal],
    ) -> PayableRequest {
        let mut request = testutil::reimbursement_with_items(42, record, amounts);
        request.status = RequestStatus::Approved;
        request.method = Some(method);
        PayableRequest::resolve(request, &FieldCodec::unavailable(), None).await
    }

    fn check_numbers(file: &str) -> Vec<u64> {
        file.lines()
            .filter(|l| l.starts_with("PMTHDR"))
            .map(|l| l.split('|').nth(1).unwrap().parse().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_check_request_emits_one_pmthdr_with_rounded_total() {
        let batch = vec![
            reimbursement_payable(7, PaymentMethod::Check, &[dec!(100.00), dec!(50.005)]).await,
        ];
        let counter = InMemorySequenceCounter::new(1);
        let file = QuickChecksEncoder::new("PAYRAIL")
            .encode(&batch, &counter, created_at())
            .await
            .unwrap();

        let headers: Vec<&str> = file.lines().filter(|l| l.starts_with("PMTHDR")).collect();
        assert_eq!(headers.len(), 1);
        assert!(headers[0].ends_with("|150.01"), "{}", headers[0]);
        assert!(file.starts_with("FILHDR,PWS|PAYRAIL|"));
        assert!(file.ends_with("FILTRL,1|150.01\n"));
    }

    #[tokio::test]
    async fn test_wire_request_emits_no_check_lines() {
        let batch = vec![
            reimbursement_payable(7, PaymentMethod::Wire, &[dec!(100.00), dec!(50.005)]).await,
        ];
        let counter = InMemorySequenceCounter::new(1);
        let file = QuickChecksEncoder::new("PAYRAIL")
            .encode(&batch, &counter, created_at())
            .await
            .unwrap();

        assert!(!file.contains("PMTHDR"));
        assert!(file.ends_with("FILTRL,0|0.00\n"));
    }

    #[tokio::test]
    async fn test_batch_without_checks_never_touches_the_counter() {
        let counter = InMemorySequenceCounter::new(1);
        counter.hold_lock(Duration::from_secs(60));

        let batch = vec![reimbursement_payable(7, PaymentMethod::Wire, &[dec!(10)]).await];
        let file = QuickChecksEncoder::new("PAYRAIL")
            .encode(&batch, &counter, created_at())
            .await
            .unwrap();
        assert!(file.ends_with("FILTRL,0|0.00\n"));

        let empty = QuickChecksEncoder::new("PAYRAIL")
            .encode(&[], &counter, created_at())
            .await
            .unwrap();
        assert!(empty.ends_with("FILTRL,0|0.00\n"));
    }

    #[tokio::test]
    async fn test_each_check_gets_six_record_lines() {
        let batch = vec![
            reimbursement_payable(1, PaymentMethod::Check, &[dec!(10)]).await,
            reimbursement_payable(2, PaymentMethod::Check, &[dec!(20)]).await,
        ];
        let counter = InMemorySequenceCounter::new(100);
        let file = QuickChecksEncoder::new("PAYRAIL")
            .encode(&batch, &counter, created_at())
            .await
            .unwrap();

        assert_eq!(file.lines().count(), 2 + 2 * 6);
        assert_eq!(check_numbers(&file), vec![100, 101]);
        for record_type in ["PAYENM", "PYEADD", "ADDPYE", "PYEPOS", "PYTDES"] {
            assert_eq!(
                file.lines().filter(|l| l.starts_with(record_type)).count(),
                2,
                "{record_type}"
            );
        }
    }

    #[tokio::test]
    async fn test_concurrent_runs_never_duplicate_numbers() {
        let counter = Arc::new(InMemorySequenceCounter::new(1));
        let encoder = Arc::new(QuickChecksEncoder::new("PAYRAIL"));

        let mut handles = Vec::new();
        for run in 0..2_i64 {
            let counter = Arc::clone(&counter);
            let encoder = Arc::clone(&encoder);
            handles.push(tokio::spawn(async move {
                let mut batch = Vec::new();
                for record in 0..5 {
                    batch.push(
                        reimbursement_payable(
                            run * 100 + record,
                            PaymentMethod::Check,
                            &[dec!(10)],
                        )
                        .await,
                    );
                }
                encoder.encode(&batch, counter.as_ref(), created_at()).await
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            let file = handle.await.unwrap().unwrap();
            for number in check_numbers(&file) {
                assert!(seen.insert(number), "duplicate check number {number}");
            }
        }
        assert_eq!(seen.len(), 10);
    }

    #[tokio::test]
    async fn test_held_lock_times_out() {
        let counter = InMemorySequenceCounter::new(1);
        counter.hold_lock(Duration::from_secs(60));
        let err = counter.reserve(1).await.unwrap_err();
        assert!(matches!(err, ExportError::LockTimeout(_)));
    }

    #[tokio::test]
    async fn test_stale_lock_is_reclaimed() {
        let counter = InMemorySequenceCounter::new(7);
        counter.hold_lock(Duration::ZERO);
        assert_eq!(counter.reserve(3).await.unwrap(), 7);
        assert_eq!(counter.reserve(1).await.unwrap(), 10);
    }
}
