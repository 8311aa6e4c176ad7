use async_trait::async_trait;

use crate::config::constant::STRAIGHT_LINE_SPEED_KMH;
use crate::domain::types::Location;
use crate::utils::haversine_km;

use super::{CostCell, SourceError, TrafficMode, TravelCostSource};

/// Offline source: great-circle distance driven at a constant speed.
#[derive(Debug, Clone, Copy)]
pub struct StraightLineSource {
    speed_kmh: f64,
}

impl Default for StraightLineSource {
    fn default() -> Self {
        Self {
            speed_kmh: STRAIGHT_LINE_SPEED_KMH,
        }
    }
}

impl StraightLineSource {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    pub fn cell(&self, from: Location, to: Location) -> CostCell {
        let km = haversine_km(from, to);
        let seconds = km / self.speed_kmh * 3600.0;
        CostCell::ok(seconds.round() as u64, (km * 1000.0).round() as u64)
    }
}

#[async_trait]
impl TravelCostSource for StraightLineSource {
    async fn query(
        &self,
        origins: &[Location],
        destinations: &[Location],
        _mode: TrafficMode,
    ) -> Result<Vec<Vec<CostCell>>, SourceError> {
        Ok(origins
            .iter()
            .map(|&from| destinations.iter().map(|&to| self.cell(from, to)).collect())
            .collect())
    }
}
