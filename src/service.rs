// Flight search, price confirmation and booking over the cached provider.

use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::try_join_all;

use crate::cache::{lookup, CacheStore};
use crate::config::ServiceConfig;
use crate::currency::{CurrencyConverter, RateSource};
use crate::error::FlightServiceError;
use crate::offers::{FlightOffer, FlightOrder, PriceConfirmation, SimplifiedOffer, Traveler};
use crate::provider::FlightProvider;

const NS_FLIGHT: &str = "flight";
const NS_PRICE: &str = "price";
const NS_BOOKING: &str = "booking";

/// One-way trip search parameters. Doubles as the cache-key source for all
/// three namespaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub adults: u32,
}

impl SearchQuery {
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        departure_date: NaiveDate,
        adults: u32,
    ) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            departure_date,
            adults,
        }
    }

    /// Trip key: `origin|destination|date|adults`. `|` cannot appear in
    /// IATA codes or ISO dates, so keys never collide across trips.
    pub fn trip_key(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.origin, self.destination, self.departure_date, self.adults
        )
    }
}

pub struct FlightService {
    provider: Arc<dyn FlightProvider>,
    cache: Arc<dyn CacheStore>,
    converter: CurrencyConverter,
    // Provider and cache carry their own configs; the service only needs
    // the display currency once the converter is built.
    display_currency: String,
}

impl FlightService {
    pub fn new(
        provider: Arc<dyn FlightProvider>,
        cache: Arc<dyn CacheStore>,
        rates: Arc<dyn RateSource>,
        config: ServiceConfig,
    ) -> Self {
        let converter = CurrencyConverter::new(rates, &config.exchange);
        Self {
            provider,
            cache,
            converter,
            display_currency: config.display_currency,
        }
    }

    /// Raw offer set for a trip, served from the cache within the TTL.
    /// Ordering is whatever the provider returned.
    async fn raw_offers(&self, query: &SearchQuery) -> Result<Vec<FlightOffer>, FlightServiceError> {
        let provider = &self.provider;
        lookup(
            self.cache.as_ref(),
            NS_FLIGHT,
            &query.trip_key(),
            None,
            || async move { provider.search_offers(query).await },
        )
        .await
    }

    /// Search offers for a trip, reshaped with prices converted into the
    /// configured display currency.
    pub async fn search(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<SimplifiedOffer>, FlightServiceError> {
        let offers = self.raw_offers(query).await?;
        tracing::debug!(trip = %query.trip_key(), count = offers.len(), "search returned offers");

        let display = self.display_currency.as_str();
        let conversions = offers.iter().map(|offer| async move {
            let amount = offer.price.amount()?;
            let converted = self
                .converter
                .convert(amount, &offer.price.currency, display)
                .await?;
            Ok::<_, FlightServiceError>(SimplifiedOffer::from_offer(offer, converted, display))
        });

        try_join_all(conversions).await
    }

    /// Confirm the price of the offer at `offer_index` within the trip's
    /// raw result set. Confirmations are cached per trip and offer, so two
    /// different offers on the same trip never share an entry.
    pub async fn confirm_price(
        &self,
        query: &SearchQuery,
        offer_index: usize,
    ) -> Result<PriceConfirmation, FlightServiceError> {
        let offers = self.raw_offers(query).await?;
        let offer = offers
            .get(offer_index)
            .ok_or(FlightServiceError::OfferIndexOutOfRange {
                index: offer_index,
                len: offers.len(),
            })?;

        let key = format!("{}|{}", query.trip_key(), offer.id);
        let provider = &self.provider;
        lookup(self.cache.as_ref(), NS_PRICE, &key, None, || async move {
            provider.price_offer(offer).await
        })
        .await
    }

    /// Book the offer at `offer_index` for the given travelers. The booking
    /// cache entry is keyed by trip, offer and traveler identity, so an
    /// identical re-invocation returns the existing order without creating
    /// another one, while a different traveler gets a fresh booking.
    pub async fn book(
        &self,
        query: &SearchQuery,
        offer_index: usize,
        travelers: &[Traveler],
    ) -> Result<FlightOrder, FlightServiceError> {
        let confirmation = self.confirm_price(query, offer_index).await?;
        let priced_offer = confirmation.flight_offers.first().ok_or_else(|| {
            FlightServiceError::MalformedResponse(
                "price confirmation contained no offers".to_string(),
            )
        })?;

        let key = format!(
            "{}|{}|{}",
            query.trip_key(),
            priced_offer.id,
            traveler_fingerprint(travelers)
        );
        let provider = &self.provider;
        lookup(self.cache.as_ref(), NS_BOOKING, &key, None, || async move {
            provider.create_order(priced_offer, travelers).await
        })
        .await
    }
}

/// Deterministic identity component for booking keys. Name and date of
/// birth are what the provider itself uses to match travelers.
fn traveler_fingerprint(travelers: &[Traveler]) -> String {
    travelers
        .iter()
        .map(|t| {
            format!(
                "{}_{}_{}",
                t.name.first_name.to_lowercase(),
                t.name.last_name.to_lowercase(),
                t.date_of_birth
            )
        })
        .collect::<Vec<_>>()
        .join(",")
}
