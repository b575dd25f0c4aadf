use async_trait::async_trait;
use courier_core::{Coordinates, DisabledGeocoder, GeocodeError, Geocoder};
use courier_shared::Masked;
use serde::Deserialize;
use std::sync::Arc;

use crate::app_config::GeocodingConfig;
use crate::resiliency::{CircuitBreaker, Guarded};

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

/// Picks the first match out of a Google Geocoding API response body.
pub fn parse_response(body: &str) -> Result<Option<Coordinates>, GeocodeError> {
    let response: GeocodeResponse =
        serde_json::from_str(body).map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

    match response.status.as_str() {
        "OK" => Ok(response
            .results
            .first()
            .map(|r| Coordinates::new(r.geometry.location.lat, r.geometry.location.lng))),
        "ZERO_RESULTS" => Ok(None),
        other => Err(GeocodeError::Unavailable(match response.error_message {
            Some(message) => format!("{}: {}", other, message),
            None => other.to_string(),
        })),
    }
}

/// Google Maps geocoder behind a circuit breaker.
pub struct GoogleGeocoder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    breaker: CircuitBreaker,
}

impl GoogleGeocoder {
    pub fn new(config: &GeocodingConfig, api_key: &str) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GeocodeError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: api_key.to_string(),
            breaker: CircuitBreaker::new(
                "geocoder",
                config.failure_threshold,
                config.reset_timeout(),
            ),
        })
    }

    async fn request(&self, address: &str) -> Result<Option<Coordinates>, GeocodeError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeocodeError::Timeout
                } else {
                    GeocodeError::Unavailable(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Unavailable(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| GeocodeError::Unavailable(e.without_url().to_string()))?;
        parse_response(&body)
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, GeocodeError> {
        tracing::debug!(address = %Masked::from(address), "Geocoding delivery address");
        match self.breaker.call(|| self.request(address)).await {
            Guarded::Completed(result) => result,
            Guarded::Rejected => Err(GeocodeError::CircuitOpen),
        }
    }
}

/// Google geocoder when an API key is configured, otherwise a no-op.
pub fn build_geocoder(config: &GeocodingConfig) -> Result<Arc<dyn Geocoder>, GeocodeError> {
    match config.api_key() {
        Some(key) => {
            tracing::info!(endpoint = %config.endpoint, "Geocoding enabled");
            Ok(Arc::new(GoogleGeocoder::new(config, key)?))
        }
        None => {
            tracing::warn!("No geocoding API key configured; orders will be stored without coordinates");
            Ok(Arc::new(DisabledGeocoder))
        }
    }
}
