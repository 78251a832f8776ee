// Currency conversion via an external exchange-rate API.
//
// Rate tables are cached per base currency with their own TTL, so a search
// over N offers fetches each base currency at most once per window instead
// of once per offer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;

use crate::config::ExchangeConfig;
use crate::error::FlightServiceError;

/// Source of exchange-rate tables: one base currency in, a map of currency
/// code to rate out.
#[async_trait]
pub trait RateSource: Send + Sync + 'static {
    async fn latest(&self, base: &str) -> Result<HashMap<String, f64>, FlightServiceError>;
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

/// Rate source backed by an exchangerate-api style endpoint:
/// `GET {base_url}/{base}` returns `{"rates": {"INR": 83.0, ...}}`.
pub struct HttpRateSource {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRateSource {
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self { http, base_url }
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    async fn latest(&self, base: &str) -> Result<HashMap<String, f64>, FlightServiceError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), base);

        let rate_error = |message: String| {
            tracing::error!(base, %message, "exchange rate lookup failed");
            FlightServiceError::RateLookup {
                base: base.to_string(),
                message,
            }
        };

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| rate_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(rate_error(format!("HTTP {status}")));
        }

        let body: RatesResponse = response
            .json()
            .await
            .map_err(|e| rate_error(e.to_string()))?;

        Ok(body.rates)
    }
}

struct CachedRates {
    rates: HashMap<String, f64>,
    fetched_at: Instant,
}

/// Converter with a per-base rate cache in front of the source.
pub struct CurrencyConverter {
    source: Arc<dyn RateSource>,
    cache: DashMap<String, CachedRates>,
    rates_ttl: Duration,
}

impl CurrencyConverter {
    pub fn new(source: Arc<dyn RateSource>, config: &ExchangeConfig) -> Self {
        Self {
            source,
            cache: DashMap::new(),
            rates_ttl: config.rates_ttl,
        }
    }

    /// Units of `to` per one unit of `from`.
    pub async fn rate(&self, from: &str, to: &str) -> Result<f64, FlightServiceError> {
        if let Some(cached) = self.cache.get(from) {
            if cached.fetched_at.elapsed() < self.rates_ttl {
                return cached
                    .rates
                    .get(to)
                    .copied()
                    .ok_or_else(|| FlightServiceError::RateUnavailable(to.to_string()));
            }
        }

        let rates = self.source.latest(from).await?;
        let rate = rates
            .get(to)
            .copied()
            .ok_or_else(|| FlightServiceError::RateUnavailable(to.to_string()));

        self.cache.insert(
            from.to_string(),
            CachedRates {
                rates,
                fetched_at: Instant::now(),
            },
        );

        rate
    }

    /// Convert `amount` from one currency to another, rounded to two
    /// decimal places.
    pub async fn convert(
        &self,
        amount: f64,
        from: &str,
        to: &str,
    ) -> Result<f64, FlightServiceError> {
        let rate = self.rate(from, to).await?;
        Ok(round_to_cents(amount * rate))
    }
}

fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Rate source serving a fixed table and counting fetches.
    pub struct FixedRateSource {
        rates: HashMap<String, f64>,
        pub fetch_count: AtomicUsize,
    }

    impl FixedRateSource {
        pub fn new(pairs: &[(&str, f64)]) -> Self {
            Self {
                rates: pairs
                    .iter()
                    .map(|(code, rate)| (code.to_string(), *rate))
                    .collect(),
                fetch_count: AtomicUsize::new(0),
            }
        }

        pub fn fetches(&self) -> usize {
            self.fetch_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RateSource for FixedRateSource {
        async fn latest(&self, _base: &str) -> Result<HashMap<String, f64>, FlightServiceError> {
            self.fetch_count.fetch_add(1, Ordering::SeqCst);
            Ok(self.rates.clone())
        }
    }
}
