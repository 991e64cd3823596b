//! HTTP exchange rate client.
//!
//! Fetches `GET {api_url}/latest?base={from}&symbols={to}` and reads the
//! rate out of the response's `rates` object. Wrap this in
//! `payrail_core::rates::CachedRates` so one lookup per pair per TTL
//! window reaches the network.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;

use payrail_core::rates::{RateError, RateProvider};
use payrail_shared::config::RatesConfig;
use payrail_shared::types::Currency;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Exchange rate lookup over HTTP.
pub struct HttpRateProvider {
    client: reqwest::Client,
    api_url: String,
}

impl HttpRateProvider {
    /// Builds a provider from the rates configuration.
    pub fn new(config: &RatesConfig) -> Result<Self, RateError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RateError::Lookup(e.to_string()))?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    async fn rate(&self, from: &Currency, to: &Currency) -> Result<Decimal, RateError> {
        let url = format!(
            "{}/latest?base={}&symbols={}",
            self.api_url,
            from.as_str(),
            to.as_str()
        );
        let body: Value = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| RateError::Lookup(e.to_string()))?
            .json()
            .await
            .map_err(|e| RateError::Lookup(e.to_string()))?;

        extract_rate(&body, from, to)
    }
}

/// Pulls `rates.{to}` out of the response body.
///
/// Numbers are parsed from their literal representation, never through a
/// float, so `1.08` stays exactly `1.08`.
fn extract_rate(body: &Value, from: &Currency, to: &Currency) -> Result<Decimal, RateError> {
    let raw = body
        .get("rates")
        .and_then(|rates| rates.get(to.as_str()))
        .ok_or_else(|| RateError::Unsupported {
            from: from.clone(),
            to: to.clone(),
        })?;

    let literal = match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Decimal::from_str(&literal)
        .map_err(|e| RateError::Lookup(format!("bad rate {literal:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn eur() -> Currency {
        Currency::new("EUR").unwrap()
    }

    #[test]
    fn test_extract_rate_from_number() {
        let body = json!({ "base": "EUR", "rates": { "USD": 1.08 } });
        assert_eq!(
            extract_rate(&body, &eur(), &Currency::usd()).unwrap(),
            dec!(1.08)
        );
    }

    #[test]
    fn test_extract_rate_from_string() {
        let body = json!({ "rates": { "USD": "1.0825" } });
        assert_eq!(
            extract_rate(&body, &eur(), &Currency::usd()).unwrap(),
            dec!(1.0825)
        );
    }

    #[test]
    fn test_missing_pair_is_unsupported() {
        let body = json!({ "rates": {} });
        assert!(matches!(
            extract_rate(&body, &eur(), &Currency::usd()),
            Err(RateError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_garbage_rate_is_a_lookup_error() {
        let body = json!({ "rates": { "USD": true } });
        assert!(matches!(
            extract_rate(&body, &eur(), &Currency::usd()),
            Err(RateError::Lookup(_))
        ));
    }
}
