use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Request};
use serde::Deserialize;
use tracing::{debug, trace};

use crate::domain::types::Location;

use super::{CostCell, SourceError, TrafficMode, TravelCostSource};

const BASE_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Google Distance Matrix API client.
#[derive(Debug, Clone)]
pub struct GoogleDistanceMatrix {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GoogleDistanceMatrix {
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

    /// Builds the GET request for one tile. Live mode asks for traffic-aware durations.
    pub fn request(
        &self,
        origins: &[Location],
        destinations: &[Location],
        mode: TrafficMode,
    ) -> Result<Request, SourceError> {
        let origins_param = join_locations(origins);
        let destinations_param = join_locations(destinations);

        let mut request = self
            .client
            .get(&self.base_url)
            .query(&[
                ("origins", origins_param.as_str()),
                ("destinations", destinations_param.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS));

        if mode == TrafficMode::Live {
            request = request.query(&[("departure_time", "now"), ("traffic_model", "best_guess")]);
        }

        Ok(request.build()?)
    }
}

#[async_trait]
impl TravelCostSource for GoogleDistanceMatrix {
    async fn query(
        &self,
        origins: &[Location],
        destinations: &[Location],
        mode: TrafficMode,
    ) -> Result<Vec<Vec<CostCell>>, SourceError> {
        let request = self.request(origins, destinations, mode)?;

        debug!(
            "Requesting {}x{} distance matrix ({:?})",
            origins.len(),
            destinations.len(),
            mode
        );

        let response = self.client.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Api(format!("HTTP {status}")));
        }

        let body: DistanceMatrixResponse = response.json().await?;
        parse_response(body, origins.len(), destinations.len(), mode)
    }
}

fn join_locations(locations: &[Location]) -> String {
    locations
        .iter()
        .map(Location::to_query_param)
        .collect::<Vec<String>>()
        .join("|")
}

/// Converts a decoded response into a grid of cells.
pub fn parse_response(
    response: DistanceMatrixResponse,
    num_origins: usize,
    num_destinations: usize,
    mode: TrafficMode,
) -> Result<Vec<Vec<CostCell>>, SourceError> {
    if response.status != "OK" {
        if mode == TrafficMode::Live && response.status == "INVALID_REQUEST" {
            return Err(SourceError::TrafficUnavailable);
        }
        return Err(SourceError::Api(match response.error_message {
            Some(message) => format!("{}: {}", response.status, message),
            None => response.status,
        }));
    }

    if response.rows.len() != num_origins {
        return Err(SourceError::Malformed(format!(
            "expected {} rows, got {}",
            num_origins,
            response.rows.len()
        )));
    }

    let mut grid = Vec::with_capacity(num_origins);
    for (i, row) in response.rows.into_iter().enumerate() {
        if row.elements.len() != num_destinations {
            return Err(SourceError::Malformed(format!(
                "row {} has {} elements, expected {}",
                i,
                row.elements.len(),
                num_destinations
            )));
        }

        let mut cells = Vec::with_capacity(num_destinations);
        for (j, element) in row.elements.into_iter().enumerate() {
            if element.status != "OK" {
                trace!("Element ({}, {}) unreachable: {}", i, j, element.status);
                cells.push(CostCell::unreachable());
                continue;
            }

            let duration = match mode {
                TrafficMode::Live => element.duration_in_traffic.or(element.duration),
                TrafficMode::Plain => element.duration,
            };

            match (duration, element.distance) {
                (Some(duration), Some(distance)) => {
                    cells.push(CostCell::ok(duration.value, distance.value))
                }
                _ if mode == TrafficMode::Live => return Err(SourceError::TrafficUnavailable),
                _ => {
                    return Err(SourceError::Malformed(format!(
                        "element ({i}, {j}) is OK but has no duration or distance"
                    )))
                }
            }
        }
        grid.push(cells);
    }

    Ok(grid)
}

#[derive(Debug, Deserialize)]
pub struct DistanceMatrixResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct Row {
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    status: String,
    duration: Option<Value>,
    duration_in_traffic: Option<Value>,
    distance: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Value {
    value: u64,
}
