// Service configuration
// Everything the service needs is passed in explicitly at construction;
// `from_env` exists for deployments that keep credentials in the environment.

use std::env;
use std::time::Duration;

use crate::error::FlightServiceError;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub provider: ProviderConfig,
    pub exchange: ExchangeConfig,
    pub cache: CacheConfig,
    /// Currency every simplified offer price is converted into.
    pub display_currency: String,
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Cap on offers requested from the search endpoint.
    pub max_search_results: u32,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub base_url: String,
    /// How long a fetched rate table stays valid before it is re-fetched.
    pub rates_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Applied to every entry stored without an explicit TTL.
    pub default_ttl: Duration,
    pub max_items: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            exchange: ExchangeConfig::default(),
            cache: CacheConfig::default(),
            display_currency: "INR".to_string(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://test.api.amadeus.com".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            max_search_results: 10,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.exchangerate-api.com/v4/latest".to_string(),
            rates_ttl: Duration::from_secs(300),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(10),
            max_items: 100,
        }
    }
}

impl ServiceConfig {
    /// Build a config from the environment. `AMADEUS_API_KEY` and
    /// `AMADEUS_SECRET_KEY` are required, the rest fall back to defaults.
    pub fn from_env() -> Result<Self, FlightServiceError> {
        let client_id = require_env("AMADEUS_API_KEY")?;
        let client_secret = require_env("AMADEUS_SECRET_KEY")?;

        let mut config = Self::default();
        config.provider.client_id = client_id;
        config.provider.client_secret = client_secret;

        if let Ok(url) = env::var("AMADEUS_BASE_URL") {
            config.provider.base_url = url;
        }
        if let Ok(url) = env::var("EXCHANGE_RATE_BASE_URL") {
            config.exchange.base_url = url;
        }
        if let Ok(currency) = env::var("DISPLAY_CURRENCY") {
            config.display_currency = currency;
        }
        if let Ok(ttl) = env::var("CACHE_TTL_SECONDS") {
            let seconds: u64 = ttl.parse().map_err(|_| {
                FlightServiceError::Config(format!("CACHE_TTL_SECONDS is not a number: {ttl}"))
            })?;
            config.cache.default_ttl = Duration::from_secs(seconds);
        }

        Ok(config)
    }
}

fn require_env(name: &str) -> Result<String, FlightServiceError> {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| FlightServiceError::Config(format!("missing environment variable {name}")))
}
