//! Wire-transfer CSV encoder.
//!
//! The receiving system takes a positional CSV: a `HEADER` row, one
//! 117-column detail row per Wire request, and a `TRAILER` row carrying
//! the detail count and amount total. Columns are addressed by position,
//! most of them blank; the named constants below mark the populated ones.
//!
//! The destination rejects anything outside ASCII, so every text field is
//! transliterated before output.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use crate::export::{format_amount, ExportError, PayableRequest};
use crate::request::PaymentMethod;

/// Column count of one detail row.
pub const COLUMN_COUNT: usize = 117;

const COL_INSTRUCTION_TYPE: usize = 0;
const COL_VALUE_DATE: usize = 1;
const COL_AMOUNT: usize = 2;
const COL_CURRENCY: usize = 3;
const COL_BENEFICIARY_ACCOUNT_TYPE: usize = 4;
const COL_BENEFICIARY_ACCOUNT: usize = 5;
const COL_BENEFICIARY_NAME: usize = 6;
const COL_BENEFICIARY_ADDRESS: usize = 7;
const COL_BENEFICIARY_BANK_ID_TYPE: usize = 20;
const COL_BENEFICIARY_BANK_ID: usize = 21;
const COL_BENEFICIARY_BANK_NAME: usize = 22;
const COL_PAYMENT_DETAILS: usize = 58;
const COL_REFERENCE: usize = 116;

/// Wire CSV encoder.
#[derive(Default)]
pub struct WireEncoder;

impl WireEncoder {
    /// Creates the encoder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Encodes the batch into a complete wire CSV file.
    ///
    /// Requests whose method is not Wire, or which lack an account
    /// number, a bank identifier, or a beneficiary name, are skipped.
    /// Input order is preserved.
    pub fn encode(
        &self,
        batch: &[PayableRequest],
        created_at: DateTime<Utc>,
    ) -> Result<String, ExportError> {
        let mut rows = Vec::new();
        let mut total = Decimal::ZERO;

        for payable in batch {
            if payable.method() != Some(PaymentMethod::Wire) {
                continue;
            }
            if payable.account_number.is_empty()
                || payable.routing_number.is_empty()
                || payable.payable_to.is_empty()
            {
                debug!(request = %payable.request.reference(), "skipping incomplete wire entry");
                continue;
            }
            total = total
                .checked_add(payable.amount)
                .ok_or_else(|| ExportError::Encoding {
                    reference: payable.request.reference(),
                    reason: "batch total overflow".to_string(),
                })?;
            rows.push(detail_row(payable, created_at));
        }

        let mut out = String::new();
        out.push_str(&format!(
            "HEADER,{},{}\n",
            created_at.format("%Y%m%d%H%M%S"),
            rows.len()
        ));
        for row in &rows {
            out.push_str(row);
            out.push('\n');
        }
        out.push_str(&format!("TRAILER,{},{}\n", rows.len(), format_amount(total)));
        Ok(out)
    }
}

fn detail_row(payable: &PayableRequest, created_at: DateTime<Utc>) -> String {
    let mut cells = vec![String::new(); COLUMN_COUNT];
    cells[COL_INSTRUCTION_TYPE] = "WIRES".to_string();
    cells[COL_VALUE_DATE] = created_at.format("%m/%d/%Y").to_string();
    cells[COL_AMOUNT] = format_amount(payable.amount);
    cells[COL_CURRENCY] = if payable.request.currency.is_unset() {
        "USD".to_string()
    } else {
        payable.request.currency.as_str().to_string()
    };
    cells[COL_BENEFICIARY_ACCOUNT_TYPE] = account_id_type(&payable.account_number).to_string();
    cells[COL_BENEFICIARY_ACCOUNT] = clean(&payable.account_number);
    cells[COL_BENEFICIARY_NAME] = clean(&payable.payable_to);
    cells[COL_BENEFICIARY_ADDRESS] = clean(&payable.beneficiary_address);
    cells[COL_BENEFICIARY_BANK_ID_TYPE] = "SWIFT".to_string();
    cells[COL_BENEFICIARY_BANK_ID] = clean(&payable.routing_number);
    cells[COL_BENEFICIARY_BANK_NAME] = clean(&payable.bank_name);
    cells[COL_PAYMENT_DETAILS] = clean(&payable.request.title);
    cells[COL_REFERENCE] = payable.request.reference().to_string();
    cells.join(",")
}

/// IBANs start with a two-letter country code; anything else is a plain
/// account number.
fn account_id_type(account: &str) -> &'static str {
    let mut chars = account.chars();
    match (chars.next(), chars.next()) {
        (Some(a), Some(b)) if a.is_ascii_alphabetic() && b.is_ascii_alphabetic() => "IBAN",
        _ => "ACCT",
    }
}

/// Transliterates to ASCII and strips field separators.
fn clean(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            ',' | '\n' | '\r' => out.push(' '),
            c if c.is_ascii() => out.push(c),
            c => out.push_str(transliterate(c)),
        }
    }
    out
}

/// Maps common accented and ligature characters to ASCII equivalents.
/// Characters with no mapping are dropped.
fn transliterate(c: char) -> &'static str {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' | 'Ā' | 'Ă' | 'Ą' => "A",
        'é' | 'è' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => "e",
        'É' | 'È' | 'Ê' | 'Ë' | 'Ē' | 'Ė' | 'Ę' | 'Ě' => "E",
        'í' | 'ì' | 'î' | 'ï' | 'ī' | 'į' => "i",
        'Í' | 'Ì' | 'Î' | 'Ï' | 'Ī' | 'Į' => "I",
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ō' | 'ő' => "o",
        'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' | 'Ō' | 'Ő' => "O",
        'ú' | 'ù' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => "u",
        'Ú' | 'Ù' | 'Û' | 'Ü' | 'Ū' | 'Ů' | 'Ű' => "U",
        'ý' | 'ÿ' => "y",
        'Ý' => "Y",
        'ñ' | 'ń' => "n",
        'Ñ' | 'Ń' => "N",
        'ç' | 'ć' | 'č' => "c",
        'Ç' | 'Ć' | 'Č' => "C",
        'š' | 'ś' => "s",
        'Š' | 'Ś' => "S",
        'ž' | 'ź' | 'ż' => "z",
        'Ž' | 'Ź' | 'Ż' => "Z",
        'ł' => "l",
        'Ł' => "L",
        'ø' => "o",
        'Ø' => "O",
        'æ' => "ae",
        'Æ' => "AE",
        'œ' => "oe",
        'Œ' => "OE",
        'ß' => "ss",
        'þ' => "th",
        'Þ' => "Th",
        'ð' => "d",
        'Ð' => "D",
        _ => "",
    }
}
