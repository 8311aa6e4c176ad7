pub mod cache;
pub mod google;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::types::Location;

pub use cache::CachedGeocoder;
pub use google::GoogleGeocoder;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("service returned {0}")]
    Api(String),
    #[error("geocoding is not configured")]
    Unavailable,
}

/// Address lookup. `Ok(None)` means the service answered but knows no such place.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, address: &str) -> Result<Option<Location>, GeocodeError>;
}

/// Used when no API key is configured; every lookup fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledGeocoder;

#[async_trait]
impl Geocoder for DisabledGeocoder {
    async fn resolve(&self, _address: &str) -> Result<Option<Location>, GeocodeError> {
        Err(GeocodeError::Unavailable)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub address: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub success: bool,
}

/// Resolves every address in order. Failures are reported per entry.
pub async fn geocode_addresses<G>(geocoder: &G, addresses: &[String]) -> Vec<GeocodeResult>
where
    G: Geocoder + ?Sized,
{
    let mut results = Vec::with_capacity(addresses.len());

    for address in addresses {
        let location = match geocoder.resolve(address).await {
            Ok(location) => location,
            Err(e) => {
                warn!("Geocoding failed for {:?}: {}", address, e);
                None
            }
        };

        results.push(GeocodeResult {
            address: address.clone(),
            lat: location.map(|l| l.lat),
            lng: location.map(|l| l.lng),
            success: location.is_some(),
        });
    }

    info!(
        "Geocoded {}/{} address(es)",
        results.iter().filter(|r| r.success).count(),
        results.len()
    );
    results
}
