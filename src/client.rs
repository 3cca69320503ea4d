//! Geocoding API client.
//!
//! Provides async address lookups against a Google-compatible geocoding
//! endpoint. Uses reqwest with rustls for TLS.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::GeocoderConfig;
use crate::errors::SeismomapError;
use crate::models::Coordinate;

/// User agent string for API requests.
const USER_AGENT: &str = concat!("seismomap/", env!("CARGO_PKG_VERSION"));

/// Path of the JSON geocoding endpoint.
const GEOCODE_PATH: &str = "/maps/api/geocode/json";

/// Resolves a free-text address to a coordinate.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Look up `address`.
    ///
    /// Returns `Ok(None)` when the service has no match.
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, SeismomapError>;
}

/// Geocoding response envelope.
#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: GeocodeGeometry,
}

#[derive(Debug, Deserialize)]
struct GeocodeGeometry {
    location: Coordinate,
}

impl GeocodeResponse {
    /// Extract the first coordinate, mapping service statuses to results.
    fn into_coordinate(self) -> Result<Option<Coordinate>, SeismomapError> {
        match self.status.as_str() {
            "OK" => match self.results.into_iter().next() {
                Some(result) => Ok(Some(result.geometry.location)),
                None => Err(SeismomapError::InvalidResponse(
                    "status OK with no results".into(),
                )),
            },
            "ZERO_RESULTS" => Ok(None),
            _ => Err(SeismomapError::Api {
                status: self.status,
                message: self.error_message.unwrap_or_default(),
            }),
        }
    }
}

/// Client for the Google Maps geocoding API.
pub struct GoogleGeocoder {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GoogleGeocoder {
    /// Create a new geocoding client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: &GeocoderConfig) -> Result<Self, SeismomapError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    #[instrument(skip(self))]
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, SeismomapError> {
        let url = format!("{}{GEOCODE_PATH}", self.base_url);

        debug!("geocoding via {}", url);

        let mut query = vec![("address", address)];
        if let Some(key) = self.api_key.as_deref() {
            query.push(("key", key));
        }

        let response = self.client.get(&url).query(&query).send().await?;

        // Check status before parsing
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SeismomapError::Api {
                status: status.as_u16().to_string(),
                message: body,
            });
        }

        let body: GeocodeResponse = response.json().await?;
        let coordinate = body.into_coordinate()?;

        debug!(found = coordinate.is_some(), "geocode settled");
        Ok(coordinate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Option<Coordinate>, SeismomapError> {
        serde_json::from_str::<GeocodeResponse>(json)
            .expect("failed to parse response")
            .into_coordinate()
    }

    #[test]
    fn test_first_result_wins() {
        let json = r#"{
            "status": "OK",
            "results": [
                {"geometry": {"location": {"lat": 51.1784, "lng": -115.5708}}},
                {"geometry": {"location": {"lat": 0.0, "lng": 0.0}}}
            ]
        }"#;
        let coordinate = parse(json).unwrap().unwrap();
        assert!((coordinate.lat - 51.1784).abs() < 0.0001);
        assert!((coordinate.lng - (-115.5708)).abs() < 0.0001);
    }

    #[test]
    fn test_zero_results_is_none() {
        let json = r#"{"status": "ZERO_RESULTS", "results": []}"#;
        assert!(parse(json).unwrap().is_none());
    }

    #[test]
    fn test_denied_is_api_error() {
        let json = r#"{"status": "REQUEST_DENIED", "results": [], "error_message": "bad key"}"#;
        let err = parse(json).unwrap_err();
        assert!(matches!(
            err,
            SeismomapError::Api { ref status, ref message } if status == "REQUEST_DENIED" && message == "bad key"
        ));
    }

    #[test]
    fn test_client_builds_from_config() {
        let config = GeocoderConfig {
            base_url: "http://localhost:9/".into(),
            ..GeocoderConfig::default()
        };
        let geocoder = GoogleGeocoder::new(&config).unwrap();
        assert_eq!(geocoder.base_url, "http://localhost:9");
    }
}
