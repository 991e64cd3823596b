//! Exchange rate lookup with TTL caching.
//!
//! Exports annotate non-USD requests with a converted amount. Lookups go
//! through an injected [`RateProvider`]; the cache bounds external calls
//! to one per currency pair per TTL window (24 hours by default). A
//! failed lookup degrades to omitting the annotation and never blocks the
//! primary amount.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache;
use rust_decimal::Decimal;
use thiserror::Error;

use payrail_shared::types::Currency;

/// Default cache capacity (currency pairs).
const DEFAULT_CACHE_CAPACITY: u64 = 500;

/// Exchange rate lookup errors.
#[derive(Debug, Error)]
pub enum RateError {
    /// The external lookup failed (network, API, parse).
    #[error("External rate lookup failed: {0}")]
    Lookup(String),

    /// The provider has no rate for this pair.
    #[error("No exchange rate for {from}/{to}")]
    Unsupported {
        /// Source currency.
        from: Currency,
        /// Target currency.
        to: Currency,
    },
}

/// Exchange rate source.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Returns the rate such that `amount_from * rate = amount_to`.
    async fn rate(&self, from: &Currency, to: &Currency) -> Result<Decimal, RateError>;
}

/// TTL-caching wrapper around a rate provider.
#[derive(Clone)]
pub struct CachedRates<P> {
    inner: Arc<P>,
    cache: Cache<String, Decimal>,
}

impl<P: RateProvider> CachedRates<P> {
    /// Wraps a provider with the given time-to-live.
    #[must_use]
    pub fn new(inner: Arc<P>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(DEFAULT_CACHE_CAPACITY)
            .time_to_live(ttl)
            .build();
        Self { inner, cache }
    }

    fn cache_key(from: &Currency, to: &Currency) -> String {
        format!("{from}->{to}")
    }
}

#[async_trait]
impl<P: RateProvider> RateProvider for CachedRates<P> {
    async fn rate(&self, from: &Currency, to: &Currency) -> Result<Decimal, RateError> {
        if from == to {
            return Ok(Decimal::ONE);
        }

        let key = Self::cache_key(from, to);
        if let Some(rate) = self.cache.get(&key) {
            return Ok(rate);
        }

        // Errors are not cached; the next caller retries the lookup.
        let rate = self.inner.rate(from, to).await?;
        self.cache.insert(key, rate);
        Ok(rate)
    }
}

/// Fixed-table provider for tests and offline runs.
#[derive(Default)]
pub struct FixedRates {
    rates: std::collections::HashMap<(String, String), Decimal>,
}

impl FixedRates {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rate for a pair.
    #[must_use]
    pub fn with_rate(mut self, from: &Currency, to: &Currency, rate: Decimal) -> Self {
        self.rates
            .insert((from.as_str().to_string(), to.as_str().to_string()), rate);
        self
    }
}

#[async_trait]
impl RateProvider for FixedRates {
    async fn rate(&self, from: &Currency, to: &Currency) -> Result<Decimal, RateError> {
        self.rates
            .get(&(from.as_str().to_string(), to.as_str().to_string()))
            .copied()
            .ok_or_else(|| RateError::Unsupported {
                from: from.clone(),
                to: to.clone(),
            })
    }
}
