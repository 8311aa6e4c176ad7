use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Request};
use serde::Deserialize;
use tracing::debug;

use crate::domain::types::Location;

use super::{GeocodeError, Geocoder};

const BASE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Google Geocoding API client.
#[derive(Debug, Clone)]
pub struct GoogleGeocoder {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GoogleGeocoder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn request(&self, address: &str) -> Result<Request, GeocodeError> {
        Ok(self
            .client
            .get(&self.base_url)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .timeout(Duration::from_secs(10))
            .build()?)
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn resolve(&self, address: &str) -> Result<Option<Location>, GeocodeError> {
        debug!("Geocoding {:?}", address);

        let request = self.request(address)?;
        let response = self.client.execute(request).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Api(format!("HTTP {status}")));
        }

        parse_response(response.json().await?)
    }
}

pub fn parse_response(response: GeocodeResponse) -> Result<Option<Location>, GeocodeError> {
    match response.status.as_str() {
        "OK" => Ok(response
            .results
            .first()
            .map(|result| result.geometry.location)),
        "ZERO_RESULTS" => Ok(None),
        _ => Err(GeocodeError::Api(response.status)),
    }
}

#[derive(Debug, Deserialize)]
pub struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeocodeCandidate {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
}
