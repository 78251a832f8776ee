// Error types shared across the flight service

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlightServiceError {
    #[error("Upstream provider error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Provider {
        status: Option<u16>,
        message: String,
    },

    #[error("Exchange rate lookup failed for {base}: {message}")]
    RateLookup { base: String, message: String },

    #[error("No exchange rate available for currency {0}")]
    RateUnavailable(String),

    #[error("Cached value under {namespace}:{key} is not valid JSON: {message}")]
    CacheDeserialization {
        namespace: String,
        key: String,
        message: String,
    },

    #[error("Offer index {index} out of range ({len} offers available)")]
    OfferIndexOutOfRange { index: usize, len: usize },

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FlightServiceError {
    /// Provider-side failure with no HTTP status (connect/timeout/body read).
    pub fn transport(err: impl std::fmt::Display) -> Self {
        FlightServiceError::Provider {
            status: None,
            message: err.to_string(),
        }
    }
}
