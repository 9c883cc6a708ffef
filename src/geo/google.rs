use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

use super::{Geocoder, PlaceResult, place_tags};
use crate::exif::GpsCoords;

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Google Maps Geocoding API client.
pub struct GoogleMapsGeocoder {
    api_key: String,
    client: Client,
}

impl GoogleMapsGeocoder {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
        }
    }

    async fn query(&self, param: &str, value: &str) -> Result<Vec<GeocodeResult>> {
        let resp = self
            .client
            .get(GEOCODE_URL)
            .query(&[(param, value), ("key", self.api_key.as_str())])
            .send()
            .await
            .context("Google Maps request failed")?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .context("Failed to read Google Maps response")?;

        if !status.is_success() {
            anyhow::bail!("Google Maps API error ({status}): {text}");
        }

        parse_geocode_response(&text)
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeocodeResult {
    #[serde(flatten)]
    place: PlaceResult,
    #[serde(default)]
    geometry: Option<Geometry>,
}

#[derive(Debug, Clone, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Clone, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// Parse a Geocoding API body. `ZERO_RESULTS` is an empty list; any other
/// non-`OK` status is an error carrying the API's message.
pub(crate) fn parse_geocode_response(body: &str) -> Result<Vec<GeocodeResult>> {
    let resp: GeocodeResponse =
        serde_json::from_str(body).context("Failed to parse Google Maps response JSON")?;

    match resp.status.as_str() {
        "OK" => Ok(resp.results),
        "ZERO_RESULTS" => Ok(Vec::new()),
        status => anyhow::bail!(
            "Google Maps geocoding failed: {status} ({})",
            resp.error_message.as_deref().unwrap_or("no error message")
        ),
    }
}

fn first_location(results: &[GeocodeResult]) -> Option<GpsCoords> {
    results.iter().find_map(|r| {
        r.geometry.as_ref().map(|g| GpsCoords {
            latitude: g.location.lat,
            longitude: g.location.lng,
        })
    })
}

#[async_trait::async_trait]
impl Geocoder for GoogleMapsGeocoder {
    async fn locate(&self, place: &str) -> Result<Option<GpsCoords>> {
        let results = self.query("address", place).await?;
        let coords = first_location(&results);
        log::debug!("Geocoded {place:?} to {coords:?}");
        Ok(coords)
    }

    async fn describe(&self, coords: GpsCoords, limit: usize) -> Result<Vec<String>> {
        let latlng = format!("{},{}", coords.latitude, coords.longitude);
        let results = self.query("latlng", &latlng).await?;
        let places: Vec<PlaceResult> = results.into_iter().map(|r| r.place).collect();
        let tags = place_tags(&places, limit);
        log::debug!("Reverse geocoded {latlng} to {} tag(s)", tags.len());
        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OK_BODY: &str = r#"{
        "status": "OK",
        "results": [
            {
                "formatted_address": "Drottninggatan 1, 111 51 Stockholm, Sweden",
                "address_components": [
                    { "long_name": "Drottninggatan", "short_name": "Drottninggatan", "types": ["route"] },
                    { "long_name": "Sweden", "short_name": "SE", "types": ["country", "political"] }
                ],
                "geometry": { "location": { "lat": 59.3313, "lng": 18.0649 }, "location_type": "ROOFTOP" }
            }
        ]
    }"#;

    #[test]
    fn ok_body_yields_location_and_places() {
        let results = parse_geocode_response(OK_BODY).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(
            first_location(&results),
            Some(GpsCoords { latitude: 59.3313, longitude: 18.0649 })
        );
        let places: Vec<PlaceResult> = results.into_iter().map(|r| r.place).collect();
        assert_eq!(place_tags(&places, 3), vec!["drottninggatan", "drottninggatan 1", "111 51 stockholm"]);
    }

    #[test]
    fn zero_results_is_not_found() {
        let results = parse_geocode_response(r#"{"status": "ZERO_RESULTS", "results": []}"#).unwrap();
        assert!(results.is_empty());
        assert_eq!(first_location(&results), None);
    }

    #[test]
    fn error_status_carries_message() {
        let err = parse_geocode_response(
            r#"{"status": "REQUEST_DENIED", "error_message": "The provided API key is invalid.", "results": []}"#,
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("REQUEST_DENIED"), "{msg}");
        assert!(msg.contains("API key is invalid"), "{msg}");
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(parse_geocode_response("<html>").is_err());
    }
}
