use serde::{Deserialize, Serialize};

use crate::config::constant::SENTINEL_COST;

/// A resolved latitude/longitude pair, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// `lat,lng` as accepted by the Google APIs.
    pub fn to_query_param(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

/// Index of a worker, and therefore of that worker's depot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DepotIdx(usize);

impl DepotIdx {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn get(self) -> usize {
        self.0
    }
}

/// Index of a job in the caller's job list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct JobIdx(usize);

impl JobIdx {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn get(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    Depot(DepotIdx),
    Job(JobIdx),
}

/// Maps typed nodes onto rows/columns of the cost matrix.
///
/// The matrix is laid out as `[depot_0 .. depot_{W-1}, job_0 .. job_{J-1}]`;
/// this type is the only place that knows about that convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLayout {
    num_workers: usize,
    num_jobs: usize,
}

impl NodeLayout {
    pub fn new(num_workers: usize, num_jobs: usize) -> Self {
        Self {
            num_workers,
            num_jobs,
        }
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn num_jobs(&self) -> usize {
        self.num_jobs
    }

    pub fn size(&self) -> usize {
        self.num_workers + self.num_jobs
    }

    pub fn matrix_index(&self, node: Node) -> usize {
        match node {
            Node::Depot(depot) => depot.get(),
            Node::Job(job) => self.num_workers + job.get(),
        }
    }

    pub fn jobs(&self) -> impl Iterator<Item = JobIdx> {
        (0..self.num_jobs).map(JobIdx::new)
    }
}

/// Resolved depots (one per worker, in worker order) and job locations.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateSet {
    pub depots: Vec<Location>,
    pub jobs: Vec<Location>,
}

impl CoordinateSet {
    pub fn new(depots: Vec<Location>, jobs: Vec<Location>) -> Self {
        Self { depots, jobs }
    }

    pub fn layout(&self) -> NodeLayout {
        NodeLayout::new(self.depots.len(), self.jobs.len())
    }

    /// Depots followed by jobs, in matrix order.
    pub fn combined(&self) -> Vec<Location> {
        self.depots.iter().chain(self.jobs.iter()).copied().collect()
    }

    pub fn location(&self, node: Node) -> Location {
        match node {
            Node::Depot(depot) => self.depots[depot.get()],
            Node::Job(job) => self.jobs[job.get()],
        }
    }
}

/// Square travel duration (seconds) and distance (meters) matrices, stored flat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostMatrix {
    size: usize,
    durations: Vec<u64>,
    distances: Vec<u64>,
}

impl CostMatrix {
    pub fn filled(size: usize, value: u64) -> Self {
        Self {
            size,
            durations: vec![value; size * size],
            distances: vec![value; size * size],
        }
    }

    /// Builds a matrix from row-major nested vectors. Panics if either is not square
    /// or if the two differ in size.
    pub fn from_rows(durations: Vec<Vec<u64>>, distances: Vec<Vec<u64>>) -> Self {
        let size = durations.len();
        assert_eq!(distances.len(), size, "duration and distance matrices differ in size");
        assert!(
            durations.iter().chain(distances.iter()).all(|row| row.len() == size),
            "cost matrix rows must have {size} columns"
        );

        Self {
            size,
            durations: durations.into_iter().flatten().collect(),
            distances: distances.into_iter().flatten().collect(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn duration(&self, from: usize, to: usize) -> u64 {
        self.durations[from * self.size + to]
    }

    pub fn distance(&self, from: usize, to: usize) -> u64 {
        self.distances[from * self.size + to]
    }

    pub fn set(&mut self, from: usize, to: usize, duration: u64, distance: u64) {
        let index = from * self.size + to;
        self.durations[index] = duration;
        self.distances[index] = distance;
    }

    /// Whether the edge carries the unreachable/unknown sentinel.
    pub fn is_unusable(&self, from: usize, to: usize) -> bool {
        self.duration(from, to) >= SENTINEL_COST || self.distance(from, to) >= SENTINEL_COST
    }

    pub fn unusable_cells(&self) -> usize {
        (0..self.size)
            .flat_map(|from| (0..self.size).map(move |to| (from, to)))
            .filter(|&(from, to)| self.is_unusable(from, to))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_keeps_depots_before_jobs() {
        let layout = NodeLayout::new(2, 3);

        assert_eq!(layout.size(), 5);
        assert_eq!(layout.matrix_index(Node::Depot(DepotIdx::new(1))), 1);
        assert_eq!(layout.matrix_index(Node::Job(JobIdx::new(0))), 2);
        assert_eq!(layout.jobs().map(JobIdx::get).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn coordinate_set_combines_in_matrix_order() {
        let set = CoordinateSet::new(
            vec![Location::new(1.0, 1.0)],
            vec![Location::new(2.0, 2.0), Location::new(3.0, 3.0)],
        );

        let combined = set.combined();
        assert_eq!(combined.len(), 3);
        assert_eq!(combined[0], Location::new(1.0, 1.0));
        assert_eq!(set.location(Node::Job(JobIdx::new(1))), Location::new(3.0, 3.0));
    }

    #[test]
    fn matrix_cells_are_independent() {
        let mut matrix = CostMatrix::filled(3, SENTINEL_COST);
        matrix.set(0, 1, 60, 1000);

        assert_eq!(matrix.duration(0, 1), 60);
        assert_eq!(matrix.distance(0, 1), 1000);
        assert_eq!(matrix.duration(1, 0), SENTINEL_COST);
        assert!(!matrix.is_unusable(0, 1));
        assert!(matrix.is_unusable(1, 0));
        assert_eq!(matrix.unusable_cells(), 8);
    }

    #[test]
    #[should_panic]
    fn from_rows_rejects_ragged_input() {
        CostMatrix::from_rows(vec![vec![0, 1], vec![0]], vec![vec![0, 1], vec![0, 1]]);
    }
}
