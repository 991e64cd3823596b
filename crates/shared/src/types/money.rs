//! Currency handling with decimal precision.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts are `rust_decimal::Decimal` throughout.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// ISO 4217 currency code, or the unset sentinel for legacy records
/// created before currency was a required field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    /// Creates a currency from an ISO 4217 code.
    ///
    /// Returns `None` unless the code is exactly three ASCII letters.
    #[must_use]
    pub fn new(code: &str) -> Option<Self> {
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Some(Self(code.to_ascii_uppercase()))
        } else {
            None
        }
    }

    /// The unset sentinel (empty code) carried by legacy records.
    #[must_use]
    pub const fn unset() -> Self {
        Self(String::new())
    }

    /// US dollars, the base currency of all export rails.
    #[must_use]
    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    /// Returns true if no currency was recorded.
    #[must_use]
    pub fn is_unset(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the ISO code, or the empty string when unset.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::unset()
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rounds a monetary amount to two decimal places, midpoint away from zero.
///
/// Every amount is rounded this way before storage in the index and before
/// any export formatting, so 50.005 becomes 50.01 everywhere.
#[must_use]
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
