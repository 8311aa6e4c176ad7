pub mod google;
pub mod straight_line;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::types::Location;

pub use google::GoogleDistanceMatrix;
pub use straight_line::StraightLineSource;

/// Whether a query should ask for live-traffic durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficMode {
    Live,
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStatus {
    Ok,
    Unreachable,
}

/// One origin/destination pair as reported by a travel-cost source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostCell {
    pub duration_seconds: u64,
    pub distance_meters: u64,
    pub status: CellStatus,
}

impl CostCell {
    pub fn ok(duration_seconds: u64, distance_meters: u64) -> Self {
        Self {
            duration_seconds,
            distance_meters,
            status: CellStatus::Ok,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            duration_seconds: 0,
            distance_meters: 0,
            status: CellStatus::Unreachable,
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    /// Live traffic is not available for this query; a plain query may still work.
    #[error("traffic data unavailable")]
    TrafficUnavailable,
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("service returned {0}")]
    Api(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Pairwise travel-cost lookup. Returns one row per origin and one cell per
/// destination in each row.
#[async_trait]
pub trait TravelCostSource: Send + Sync {
    async fn query(
        &self,
        origins: &[Location],
        destinations: &[Location],
        mode: TrafficMode,
    ) -> Result<Vec<Vec<CostCell>>, SourceError>;
}
