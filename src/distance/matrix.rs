use std::ops::Range;

use futures::stream::{self, StreamExt};
use itertools::iproduct;
use tracing::{debug, error, info, instrument, warn};

use crate::config::constant::{MAX_CONCURRENT_REQUESTS, MAX_ELEMENTS, SENTINEL_COST};
use crate::config::Settings;
use crate::domain::types::{CostMatrix, Location};
use crate::error::OptimizeError;

use super::providers::{CellStatus, CostCell, SourceError, TrafficMode, TravelCostSource};

/// One square block of the matrix, fetched with a single source query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub rows: Range<usize>,
    pub cols: Range<usize>,
}

/// Builds duration and distance matrices from a travel-cost source, one tile
/// per query. Failed cells and failed tiles are filled with the sentinel cost.
pub struct CostMatrixBuilder<'a, S: ?Sized> {
    source: &'a S,
    max_elements: usize,
    max_concurrent_requests: usize,
}

impl<'a, S> CostMatrixBuilder<'a, S>
where
    S: TravelCostSource + ?Sized,
{
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            max_elements: MAX_ELEMENTS,
            max_concurrent_requests: MAX_CONCURRENT_REQUESTS,
        }
    }

    pub fn from_settings(source: &'a S, settings: &Settings) -> Self {
        Self::new(source)
            .with_max_elements(settings.matrix_max_elements)
            .with_max_concurrent_requests(settings.matrix_max_concurrent_requests)
    }

    pub fn with_max_elements(mut self, max_elements: usize) -> Self {
        self.max_elements = max_elements.max(1);
        self
    }

    pub fn with_max_concurrent_requests(mut self, max_concurrent_requests: usize) -> Self {
        self.max_concurrent_requests = max_concurrent_requests.max(1);
        self
    }

    /// Side of a tile: the largest `c` with `c * c <= max_elements`.
    pub fn chunk_size(&self) -> usize {
        let mut side = (self.max_elements as f64).sqrt() as usize;
        while side * side > self.max_elements {
            side -= 1;
        }
        while (side + 1) * (side + 1) <= self.max_elements {
            side += 1;
        }
        side.max(1)
    }

    pub fn tiles(&self, size: usize) -> Vec<Tile> {
        let side = self.chunk_size();
        let starts: Vec<usize> = (0..size).step_by(side).collect();

        iproduct!(starts.iter(), starts.iter())
            .map(|(&row, &col)| Tile {
                rows: row..(row + side).min(size),
                cols: col..(col + side).min(size),
            })
            .collect()
    }

    #[instrument(skip_all, fields(locations = locations.len()))]
    pub async fn build(&self, locations: &[Location]) -> Result<CostMatrix, OptimizeError> {
        if locations.is_empty() {
            return Err(OptimizeError::Validation(
                "cannot build a cost matrix without locations".into(),
            ));
        }

        let size = locations.len();
        let tiles = self.tiles(size);
        info!(
            "Building {}x{} cost matrix with {} request(s) of up to {} elements",
            size,
            size,
            tiles.len(),
            self.max_elements
        );

        let results: Vec<(Tile, Result<Vec<Vec<CostCell>>, SourceError>)> =
            stream::iter(tiles.into_iter().map(|tile| async move {
                let origins = &locations[tile.rows.clone()];
                let destinations = &locations[tile.cols.clone()];
                let result = self.query_with_fallback(origins, destinations).await;
                (tile, result)
            }))
            .buffer_unordered(self.max_concurrent_requests)
            .collect()
            .await;

        let mut matrix = CostMatrix::filled(size, SENTINEL_COST);
        let mut failed_tiles = 0;
        let mut unreachable_cells = 0;

        for (tile, result) in results {
            let grid = match result.and_then(|grid| check_shape(grid, &tile)) {
                Ok(grid) => grid,
                Err(e) => {
                    error!(
                        "Matrix request for rows {:?}, cols {:?} failed: {}",
                        tile.rows, tile.cols, e
                    );
                    failed_tiles += 1;
                    continue;
                }
            };

            for (row, cells) in tile.rows.clone().zip(grid) {
                for (col, cell) in tile.cols.clone().zip(cells) {
                    match cell.status {
                        CellStatus::Ok => {
                            matrix.set(row, col, cell.duration_seconds, cell.distance_meters)
                        }
                        CellStatus::Unreachable => {
                            matrix.set(row, col, SENTINEL_COST, SENTINEL_COST);
                            unreachable_cells += 1;
                        }
                    }
                }
            }
            debug!("Wrote tile rows {:?}, cols {:?}", tile.rows, tile.cols);
        }

        if failed_tiles > 0 || unreachable_cells > 0 {
            warn!(
                failed_tiles,
                unreachable_cells, "Cost matrix degraded to sentinel values"
            );
        }
        info!("Cost matrix ready ({} unusable cells)", matrix.unusable_cells());

        Ok(matrix)
    }

    async fn query_with_fallback(
        &self,
        origins: &[Location],
        destinations: &[Location],
    ) -> Result<Vec<Vec<CostCell>>, SourceError> {
        match self
            .source
            .query(origins, destinations, TrafficMode::Live)
            .await
        {
            Err(SourceError::TrafficUnavailable) => {
                warn!("Traffic data not available, retrying without traffic");
                self.source
                    .query(origins, destinations, TrafficMode::Plain)
                    .await
            }
            other => other,
        }
    }
}

fn check_shape(
    grid: Vec<Vec<CostCell>>,
    tile: &Tile,
) -> Result<Vec<Vec<CostCell>>, SourceError> {
    let rows_ok = grid.len() == tile.rows.len();
    let cols_ok = grid.iter().all(|cells| cells.len() == tile.cols.len());
    if rows_ok && cols_ok {
        Ok(grid)
    } else {
        Err(SourceError::Malformed(format!(
            "expected a {}x{} grid",
            tile.rows.len(),
            tile.cols.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// Encodes the location index in `lat` so every cell is predictable.
    fn indexed(n: usize) -> Vec<Location> {
        (0..n).map(|i| Location::new(i as f64, 0.0)).collect()
    }

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TravelCostSource for Counting {
        async fn query(
            &self,
            origins: &[Location],
            destinations: &[Location],
            _mode: TrafficMode,
        ) -> Result<Vec<Vec<CostCell>>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(origins
                .iter()
                .map(|o| {
                    destinations
                        .iter()
                        .map(|d| {
                            let (i, j) = (o.lat as u64, d.lat as u64);
                            if i == 1 && j == 2 {
                                CostCell::unreachable()
                            } else {
                                CostCell::ok(i * 1000 + j, j * 1000 + i)
                            }
                        })
                        .collect()
                })
                .collect())
        }
    }

    struct Failing;

    #[async_trait]
    impl TravelCostSource for Failing {
        async fn query(
            &self,
            _origins: &[Location],
            _destinations: &[Location],
            _mode: TrafficMode,
        ) -> Result<Vec<Vec<CostCell>>, SourceError> {
            Err(SourceError::Api("UNKNOWN_ERROR".into()))
        }
    }

    #[derive(Default)]
    struct NoTraffic {
        modes: Mutex<Vec<TrafficMode>>,
    }

    #[async_trait]
    impl TravelCostSource for NoTraffic {
        async fn query(
            &self,
            origins: &[Location],
            destinations: &[Location],
            mode: TrafficMode,
        ) -> Result<Vec<Vec<CostCell>>, SourceError> {
            self.modes.lock().unwrap().push(mode);
            match mode {
                TrafficMode::Live => Err(SourceError::TrafficUnavailable),
                TrafficMode::Plain => {
                    Ok(vec![vec![CostCell::ok(7, 70); destinations.len()]; origins.len()])
                }
            }
        }
    }

    #[test]
    fn chunk_size_is_the_integer_square_root() {
        let source = Failing;
        assert_eq!(CostMatrixBuilder::new(&source).chunk_size(), 10);
        assert_eq!(CostMatrixBuilder::new(&source).with_max_elements(99).chunk_size(), 9);
        assert_eq!(CostMatrixBuilder::new(&source).with_max_elements(1).chunk_size(), 1);
        assert_eq!(CostMatrixBuilder::new(&source).with_max_elements(25).tiles(23).len(), 25);
    }

    #[tokio::test]
    async fn writes_every_cell_into_place() {
        let source = Counting::default();
        let builder = CostMatrixBuilder::new(&source).with_max_concurrent_requests(3);

        let matrix = builder.build(&indexed(23)).await.unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 9);
        for i in 0..23 {
            for j in 0..23 {
                if i == 1 && j == 2 {
                    assert_eq!(matrix.duration(i, j), SENTINEL_COST);
                    assert_eq!(matrix.distance(i, j), SENTINEL_COST);
                } else {
                    assert_eq!(matrix.duration(i, j), (i * 1000 + j) as u64);
                    assert_eq!(matrix.distance(i, j), (j * 1000 + i) as u64);
                }
            }
        }
        assert_eq!(matrix.unusable_cells(), 1);
    }

    #[tokio::test]
    async fn failing_source_degrades_to_sentinel() {
        let matrix = CostMatrixBuilder::new(&Failing)
            .build(&indexed(12))
            .await
            .unwrap();

        assert_eq!(matrix.size(), 12);
        assert_eq!(matrix.unusable_cells(), 144);
    }

    #[tokio::test]
    async fn retries_without_traffic_once() {
        let source = NoTraffic::default();

        let matrix = CostMatrixBuilder::new(&source)
            .build(&indexed(3))
            .await
            .unwrap();

        assert_eq!(
            *source.modes.lock().unwrap(),
            vec![TrafficMode::Live, TrafficMode::Plain]
        );
        assert_eq!(matrix.duration(2, 1), 7);
        assert_eq!(matrix.distance(0, 0), 70);
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let result = CostMatrixBuilder::new(&Failing).build(&[]).await;
        assert!(matches!(result, Err(OptimizeError::Validation(_))));
    }
}
