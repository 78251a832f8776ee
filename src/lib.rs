// Main library file for the flight booking service
// Search, price confirmation and booking against an upstream travel-data
// provider, with a TTL response cache in front of every provider call.

pub mod cache;
pub mod config;
pub mod currency;
pub mod error;
pub mod offers;
pub mod provider;
pub mod service;

// Re-export key types for convenience
pub use cache::{CacheStatsReport, CacheStore, InMemoryCache};
pub use config::{CacheConfig, ExchangeConfig, ProviderConfig, ServiceConfig};
pub use currency::{CurrencyConverter, HttpRateSource, RateSource};
pub use error::FlightServiceError;
pub use offers::{
    FlightOffer, FlightOrder, PriceConfirmation, SimplifiedOffer, SimplifiedSegment, Traveler,
};
pub use provider::{AmadeusClient, FlightProvider};
pub use service::{FlightService, SearchQuery};
