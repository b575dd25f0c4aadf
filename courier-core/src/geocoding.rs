use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("Geocoder unavailable: {0}")]
    Unavailable(String),
    #[error("Geocoder timed out")]
    Timeout,
    #[error("Geocoder circuit is open")]
    CircuitOpen,
    #[error("Unexpected geocoder response: {0}")]
    InvalidResponse(String),
}

/// Best-effort address lookup. `Ok(None)` means the provider answered but
/// found nothing for the address.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, GeocodeError>;
}

/// Used when no geocoding provider is configured.
pub struct DisabledGeocoder;

#[async_trait]
impl Geocoder for DisabledGeocoder {
    async fn geocode(&self, _address: &str) -> Result<Option<Coordinates>, GeocodeError> {
        tracing::debug!("Geocoding disabled, skipping lookup");
        Ok(None)
    }
}
