// Upstream flight-data provider client (Amadeus-style REST API).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

use crate::config::ProviderConfig;
use crate::error::FlightServiceError;
use crate::offers::{FlightOffer, FlightOrder, PriceConfirmation, Traveler};
use crate::service::SearchQuery;

/// Upstream provider operations: offer search, price confirmation and
/// order creation.
#[async_trait]
pub trait FlightProvider: Send + Sync + 'static {
    async fn search_offers(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<FlightOffer>, FlightServiceError>;

    async fn price_offer(
        &self,
        offer: &FlightOffer,
    ) -> Result<PriceConfirmation, FlightServiceError>;

    async fn create_order(
        &self,
        offer: &FlightOffer,
        travelers: &[Traveler],
    ) -> Result<FlightOrder, FlightServiceError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

// `data` stays an Option without a serde default: the derive would demand
// `T: Default`, and serde already maps an absent field to `None`.
#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: Option<T>,
}

/// REST client for the provider. Fetches an OAuth2 client-credentials token
/// on demand and reuses it until shortly before expiry.
pub struct AmadeusClient {
    http: reqwest::Client,
    config: ProviderConfig,
    token: Mutex<Option<CachedToken>>,
}

impl AmadeusClient {
    pub fn new(config: ProviderConfig) -> Result<Self, FlightServiceError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| FlightServiceError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            config,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, FlightServiceError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.token.clone());
            }
        }

        let url = format!("{}/v1/security/oauth2/token", self.config.base_url);
        let response = self
            .http
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(FlightServiceError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = body_excerpt(response).await;
            tracing::error!(status = status.as_u16(), %body, "provider token request failed");
            return Err(FlightServiceError::Provider {
                status: Some(status.as_u16()),
                message: format!("token request failed: {body}"),
            });
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            FlightServiceError::MalformedResponse(format!("token response: {e}"))
        })?;

        // Refresh a little early so in-flight requests never race expiry.
        let lifetime = Duration::from_secs(token.expires_in.saturating_sub(30));
        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }

    async fn check_status(
        response: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response, FlightServiceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = body_excerpt(response).await;
        tracing::error!(status = status.as_u16(), %body, "provider {context} request failed");
        Err(FlightServiceError::Provider {
            status: Some(status.as_u16()),
            message: format!("{context} failed: {body}"),
        })
    }

    fn unwrap_data<T>(envelope: DataEnvelope<T>, context: &str) -> Result<T, FlightServiceError> {
        envelope.data.ok_or_else(|| {
            FlightServiceError::MalformedResponse(format!("{context} response had no data"))
        })
    }
}

#[async_trait]
impl FlightProvider for AmadeusClient {
    async fn search_offers(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<FlightOffer>, FlightServiceError> {
        let token = self.access_token().await?;
        let url = format!("{}/v2/shopping/flight-offers", self.config.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("originLocationCode", query.origin.clone()),
                ("destinationLocationCode", query.destination.clone()),
                ("departureDate", query.departure_date.to_string()),
                ("adults", query.adults.to_string()),
                ("max", self.config.max_search_results.to_string()),
            ])
            .send()
            .await
            .map_err(FlightServiceError::transport)?;

        let response = Self::check_status(response, "offer search").await?;
        let envelope: DataEnvelope<Vec<FlightOffer>> = response
            .json()
            .await
            .map_err(|e| FlightServiceError::MalformedResponse(format!("offer search: {e}")))?;

        // The provider omits `data` entirely when nothing matches.
        Ok(envelope.data.unwrap_or_default())
    }

    async fn price_offer(
        &self,
        offer: &FlightOffer,
    ) -> Result<PriceConfirmation, FlightServiceError> {
        let token = self.access_token().await?;
        let url = format!("{}/v1/shopping/flight-offers/pricing", self.config.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&json!({
                "data": {
                    "type": "flight-offers-pricing",
                    "flightOffers": [offer],
                }
            }))
            .send()
            .await
            .map_err(FlightServiceError::transport)?;

        let response = Self::check_status(response, "pricing").await?;
        let envelope: DataEnvelope<PriceConfirmation> = response
            .json()
            .await
            .map_err(|e| FlightServiceError::MalformedResponse(format!("pricing: {e}")))?;

        Self::unwrap_data(envelope, "pricing")
    }

    async fn create_order(
        &self,
        offer: &FlightOffer,
        travelers: &[Traveler],
    ) -> Result<FlightOrder, FlightServiceError> {
        let token = self.access_token().await?;
        let url = format!("{}/v1/booking/flight-orders", self.config.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&json!({
                "data": {
                    "type": "flight-order",
                    "flightOffers": [offer],
                    "travelers": travelers,
                }
            }))
            .send()
            .await
            .map_err(FlightServiceError::transport)?;

        let response = Self::check_status(response, "order creation").await?;
        let envelope: DataEnvelope<FlightOrder> = response
            .json()
            .await
            .map_err(|e| FlightServiceError::MalformedResponse(format!("order creation: {e}")))?;

        Self::unwrap_data(envelope, "order creation")
    }
}

async fn body_excerpt(response: reqwest::Response) -> String {
    match response.text().await {
        Ok(body) => body.chars().take(200).collect(),
        Err(_) => "<unreadable body>".to_string(),
    }
}
