//! NACHA ACH file encoder.
//!
//! Emits one File Header, one Batch Header, one Entry Detail per Direct
//! Deposit request, one Batch Control, and one File Control, each exactly
//! 94 characters, then pads with `9`-filled lines until the total line
//! count is a multiple of 10. The blocking factor is a hard requirement
//! of the receiving bank, not formatting taste.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use payrail_shared::config::ExportConfig;
use payrail_shared::types::round_cents;

use crate::export::{ExportError, PayableRequest};
use crate::request::PaymentMethod;

/// Fixed NACHA record width.
pub const RECORD_LEN: usize = 94;

/// Lines per block; files are padded to a whole number of blocks.
pub const BLOCKING_FACTOR: usize = 10;

/// Entry hash fields keep only the last 10 digits of the rolling sum.
const ENTRY_HASH_MOD: u64 = 10_000_000_000;

/// NACHA ACH encoder for Direct Deposit requests.
pub struct NachaEncoder {
    immediate_destination: String,
    immediate_origin: String,
    company_name: String,
}

struct Entry {
    routing: String,
    account: String,
    name: String,
    cents: u64,
}

impl NachaEncoder {
    /// Builds an encoder from the export configuration.
    #[must_use]
    pub fn new(config: &ExportConfig) -> Self {
        Self {
            immediate_destination: digits(&config.immediate_destination),
            immediate_origin: config.immediate_origin.clone(),
            company_name: config.company_name.clone(),
        }
    }

    /// Encodes the batch into a complete NACHA file.
    ///
    /// Requests whose method is not Direct Deposit, or which lack a
    /// 9-digit routing number, an account number, or a payable name, are
    /// skipped. Input order is preserved.
    pub fn encode(
        &self,
        batch: &[PayableRequest],
        created_at: DateTime<Utc>,
    ) -> Result<String, ExportError> {
        let mut entries = Vec::new();
        for payable in batch {
            if payable.method() != Some(PaymentMethod::DirectDeposit) {
                continue;
            }
            let routing = digits(&payable.routing_number);
            if routing.len() != 9 || payable.account_number.is_empty() || payable.payable_to.is_empty()
            {
                debug!(request = %payable.request.reference(), "skipping incomplete ACH entry");
                continue;
            }
            let cents = to_cents(payable.amount).ok_or_else(|| ExportError::Encoding {
                reference: payable.request.reference(),
                reason: format!("amount {} does not fit an ACH entry", payable.amount),
            })?;
            entries.push(Entry {
                routing,
                account: payable.account_number.clone(),
                name: payable.payable_to.clone(),
                cents,
            });
        }

        let entry_hash = entry_hash(entries.iter().map(|e| &e.routing));
        let total_cents: u64 = entries.iter().map(|e| e.cents).sum();
        let odfi = pad_left_zero(&self.immediate_destination, 8);

        let mut lines = Vec::with_capacity(entries.len() + 4);
        lines.push(self.file_header(created_at));
        lines.push(self.batch_header(created_at, &odfi));
        for (seq, entry) in entries.iter().enumerate() {
            lines.push(self.entry_detail(entry, &odfi, seq));
        }
        lines.push(self.batch_control(entries.len(), entry_hash, total_cents, &odfi));

        let record_count = lines.len() + 1;
        let block_count = record_count.div_ceil(BLOCKING_FACTOR);
        lines.push(self.file_control(
            entries.len(),
            entry_hash,
            total_cents,
            block_count,
        ));

        while lines.len() % BLOCKING_FACTOR != 0 {
            lines.push("9".repeat(RECORD_LEN));
        }

        let mut out = lines.join("\n");
        out.push('\n');
        Ok(out)
    }

    fn file_header(&self, created_at: DateTime<Utc>) -> String {
        let record = format!(
            "101{dest}{origin}{date}{time}A094101{dest_name}{origin_name}{reference}",
            dest = format!(" {:0>9}", truncate(&self.immediate_destination, 9)),
            origin = pad_right(&self.immediate_origin, 10),
            date = created_at.format("%y%m%d"),
            time = created_at.format("%H%M"),
            dest_name = pad_right("BANK", 23),
            origin_name = pad_right(&self.company_name, 23),
            reference = " ".repeat(8),
        );
        fit(record)
    }

    fn batch_header(&self, created_at: DateTime<Utc>, odfi: &str) -> String {
        let record = format!(
            "5200{company}{discretionary}{company_id}PPD{description}{desc_date}{eff_date}   1{odfi}{batch:0>7}",
            company = pad_right(&self.company_name, 16),
            discretionary = " ".repeat(20),
            company_id = pad_right(&self.immediate_origin, 10),
            description = pad_right("PAYMENTS", 10),
            desc_date = created_at.format("%y%m%d"),
            eff_date = created_at.format("%y%m%d"),
            batch = 1,
        );
        fit(record)
    }

    fn entry_detail(&self, entry: &Entry, odfi: &str, seq: usize) -> String {
        let (prefix, check_digit) = entry.routing.split_at(8);
        let record = format!(
            "622{prefix}{check_digit}{account}{cents:0>10}{individual_id}{name}  0{odfi}{trace:0>7}",
            account = pad_right(&truncate(&entry.account, 17), 17),
            cents = entry.cents,
            individual_id = " ".repeat(15),
            name = pad_right(&truncate(&entry.name, 22), 22),
            trace = seq + 1,
        );
        fit(record)
    }

    fn batch_control(&self, count: usize, hash: u64, total_cents: u64, odfi: &str) -> String {
        let record = format!(
            "8200{count:0>6}{hash:0>10}{debit:0>12}{credit:0>12}{company_id}{auth}{reserved}{odfi}{batch:0>7}",
            debit = 0,
            credit = total_cents,
            company_id = pad_right(&self.immediate_origin, 10),
            auth = " ".repeat(19),
            reserved = " ".repeat(6),
            batch = 1,
        );
        fit(record)
    }

    fn file_control(&self, count: usize, hash: u64, total_cents: u64, blocks: usize) -> String {
        let record = format!(
            "9{batches:0>6}{blocks:0>6}{count:0>8}{hash:0>10}{debit:0>12}{credit:0>12}{reserved}",
            batches = 1,
            debit = 0,
            credit = total_cents,
            reserved = " ".repeat(39),
        );
        fit(record)
    }
}

/// Rolling entry hash: sum of 8-digit routing prefixes, last 10 digits.
fn entry_hash<'a>(routings: impl Iterator<Item = &'a String>) -> u64 {
    let sum: u64 = routings
        .map(|routing| routing[..8].parse::<u64>().unwrap_or(0))
        .sum();
    sum % ENTRY_HASH_MOD
}

/// Integer cents of a cent-rounded amount.
fn to_cents(amount: Decimal) -> Option<u64> {
    let cents = round_cents(amount).checked_mul(Decimal::ONE_HUNDRED)?;
    let cents = cents.to_u64()?;
    // The amount field is 10 digits wide.
    (cents < 10_000_000_000).then_some(cents)
}

fn digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

fn truncate(raw: &str, width: usize) -> String {
    raw.chars().take(width).collect()
}

fn pad_right(raw: &str, width: usize) -> String {
    format!("{:<width$}", truncate(raw, width))
}

fn pad_left_zero(raw: &str, width: usize) -> String {
    format!("{:0>width$}", truncate(raw, width))
}

/// Clamps a record to exactly 94 characters.
fn fit(record: String) -> String {
    debug_assert_eq!(record.len(), RECORD_LEN, "record width drift: {record}");
    pad_right(&record, RECORD_LEN)
}
