// Provider data model and the simplified view handed to callers.
//
// Only the fields the service consumes are typed; everything else the
// provider sends is kept verbatim in `extra` so a search offer can be
// submitted back to the pricing endpoint unchanged.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FlightServiceError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlightOffer {
    pub id: String,
    #[serde(default)]
    pub validating_airline_codes: Vec<String>,
    #[serde(default)]
    pub itineraries: Vec<Itinerary>,
    #[serde(default)]
    pub number_of_bookable_seats: u32,
    pub price: OfferPrice,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub number: String,
    pub departure: FlightEndpoint,
    pub arrival: FlightEndpoint,
    #[serde(default)]
    pub duration: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlightEndpoint {
    pub iata_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal: Option<String>,
    /// Local date-time as sent by the provider, e.g. "2024-06-01T08:15:00".
    pub at: String,
}

/// Offer price as quoted by the provider. `grand_total` arrives as a string
/// on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OfferPrice {
    pub currency: String,
    pub grand_total: String,
}

impl OfferPrice {
    pub fn amount(&self) -> Result<f64, FlightServiceError> {
        self.grand_total.parse().map_err(|_| {
            FlightServiceError::MalformedResponse(format!(
                "offer grandTotal is not a number: {:?}",
                self.grand_total
            ))
        })
    }
}

/// Pricing-endpoint response. The confirmed offers are typed because the
/// booking call submits the first of them; the rest stays opaque.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceConfirmation {
    #[serde(default)]
    pub flight_offers: Vec<FlightOffer>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Order record returned by the booking endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightOrder {
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Traveler {
    pub id: String,
    pub date_of_birth: NaiveDate,
    pub name: TravelerName,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelerName {
    pub first_name: String,
    pub last_name: String,
}

/// Caller-facing offer with the price converted to the display currency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimplifiedOffer {
    pub id: String,
    pub airline: String,
    pub segments: Vec<SimplifiedSegment>,
    pub number_of_bookable_seats: u32,
    pub price: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimplifiedSegment {
    pub flight_number: String,
    pub departure: FlightEndpoint,
    pub arrival: FlightEndpoint,
    pub duration: String,
}

impl SimplifiedOffer {
    /// Reshape a raw offer, attaching an already-converted price.
    pub fn from_offer(offer: &FlightOffer, price: f64, currency: &str) -> Self {
        let airline = offer
            .validating_airline_codes
            .first()
            .cloned()
            .unwrap_or_default();

        let segments = offer
            .itineraries
            .first()
            .map(|itinerary| {
                itinerary
                    .segments
                    .iter()
                    .map(|segment| SimplifiedSegment {
                        flight_number: segment.number.clone(),
                        departure: segment.departure.clone(),
                        arrival: segment.arrival.clone(),
                        duration: humanize_duration(&segment.duration),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: offer.id.clone(),
            airline,
            segments,
            number_of_bookable_seats: offer.number_of_bookable_seats,
            price,
            currency: currency.to_string(),
        }
    }
}

/// Turn an ISO-8601 duration ("PT5H30M") into a short human-readable form
/// ("5h 30m"). Anything that does not look like an ISO duration is returned
/// unchanged.
pub fn humanize_duration(iso: &str) -> String {
    let Some(rest) = iso.strip_prefix('P') else {
        return iso.to_string();
    };

    let (days_part, time_part) = match rest.split_once('T') {
        Some((d, t)) => (d, t),
        None => (rest, ""),
    };

    let days = match days_part.strip_suffix('D') {
        Some(n) => match n.parse::<u32>() {
            Ok(n) => n,
            Err(_) => return iso.to_string(),
        },
        None if days_part.is_empty() => 0,
        None => return iso.to_string(),
    };

    let mut hours = 0u32;
    let mut minutes = 0u32;
    let mut digits = String::new();
    for ch in time_part.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        let Ok(value) = digits.parse::<u32>() else {
            return iso.to_string();
        };
        digits.clear();
        match ch {
            'H' => hours = value,
            'M' => minutes = value,
            // Seconds never show up in airline durations; ignore them.
            'S' => {}
            _ => return iso.to_string(),
        }
    }
    if !digits.is_empty() {
        return iso.to_string();
    }

    let total_hours = days * 24 + hours;
    match (total_hours, minutes) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn sample_offer(id: &str, grand_total: &str, currency: &str) -> FlightOffer {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "source": "GDS",
            "validatingAirlineCodes": ["AI"],
            "numberOfBookableSeats": 4,
            "itineraries": [{
                "duration": "PT6H15M",
                "segments": [{
                    "number": "101",
                    "carrierCode": "AI",
                    "departure": { "iataCode": "JFK", "terminal": "4", "at": "2024-06-01T08:15:00" },
                    "arrival": { "iataCode": "LAX", "at": "2024-06-01T11:30:00" },
                    "duration": "PT6H15M"
                }]
            }],
            "price": { "currency": currency, "grandTotal": grand_total }
        }))
        .expect("sample offer should deserialize")
    }

    #[test]
    fn unconsumed_provider_fields_round_trip() {
        let offer = sample_offer("1", "100.00", "USD");
        assert_eq!(offer.extra.get("source"), Some(&Value::from("GDS")));

        let json = serde_json::to_value(&offer).unwrap();
        assert_eq!(json["source"], "GDS");
        assert_eq!(json["itineraries"][0]["segments"][0]["carrierCode"], "AI");
        assert_eq!(json["price"]["grandTotal"], "100.00");
    }

    #[test]
    fn grand_total_parses_to_amount() {
        let offer = sample_offer("1", "1234.56", "EUR");
        assert_eq!(offer.price.amount().unwrap(), 1234.56);

        let bad = sample_offer("1", "n/a", "EUR");
        assert!(matches!(
            bad.price.amount(),
            Err(FlightServiceError::MalformedResponse(_))
        ));
    }

    #[test]
    fn simplified_offer_takes_primary_airline_and_segments() {
        let offer = sample_offer("7", "100.00", "USD");
        let simplified = SimplifiedOffer::from_offer(&offer, 8300.0, "INR");

        assert_eq!(simplified.id, "7");
        assert_eq!(simplified.airline, "AI");
        assert_eq!(simplified.number_of_bookable_seats, 4);
        assert_eq!(simplified.price, 8300.0);
        assert_eq!(simplified.currency, "INR");
        assert_eq!(simplified.segments.len(), 1);
        assert_eq!(simplified.segments[0].flight_number, "101");
        assert_eq!(simplified.segments[0].duration, "6h 15m");
        assert_eq!(simplified.segments[0].departure.iata_code, "JFK");
    }

    #[test_case("PT5H30M", "5h 30m")]
    #[test_case("PT2H", "2h")]
    #[test_case("PT45M", "45m")]
    #[test_case("P1DT2H15M", "26h 15m")]
    #[test_case("PT0H0M", "0m")]
    #[test_case("6 hours", "6 hours"; "non iso input passes through")]
    #[test_case("PTXX", "PTXX"; "garbage after prefix passes through")]
    fn humanize_duration_cases(input: &str, expected: &str) {
        assert_eq!(humanize_duration(input), expected);
    }
}
