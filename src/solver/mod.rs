pub mod construction;
pub mod local_search;
pub mod statistics;

use std::cmp::max;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{error, info, instrument};

use crate::config::constant::{BALANCE_COEFFICIENT, GLS_LAMBDA_COEFFICIENT, TIME_LIMIT_SECS};
use crate::domain::solution::{Route, Solution};
use crate::domain::types::{CostMatrix, DepotIdx, JobIdx, Node, NodeLayout};
use crate::error::OptimizeError;
use crate::evaluation::fitness::{balanced_objective, route_duration};

use construction::cheapest_insertion;
use local_search::search::guided_local_search;
use statistics::SearchStatistics;

/// Lifecycle of a single `solve` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolverPhase {
    Unsolved,
    Constructing,
    Improving,
    Solved,
    Infeasible,
}

#[derive(Debug, Clone)]
pub struct SolverParams {
    pub time_limit: Duration,
    /// Weight of the longest route duration against the total duration.
    pub balance_coefficient: u64,
    pub lambda_coefficient: f64,
    /// Iterations without a new best before the search gives up early.
    /// Derived from the instance size when `None`.
    pub max_no_improvement: Option<usize>,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(TIME_LIMIT_SECS),
            balance_coefficient: BALANCE_COEFFICIENT,
            lambda_coefficient: GLS_LAMBDA_COEFFICIENT,
            max_no_improvement: None,
        }
    }
}

impl SolverParams {
    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }
}

/// Calculate maximum iterations without improvement based on problem size
pub fn calculate_max_no_improvement(locations_len: usize) -> usize {
    let scaling_factor = if locations_len < 50 { 15.0 } else { 9.0 };
    max(
        300,
        (scaling_factor * (locations_len as f64).powf(1.33)) as usize,
    )
}

/// Read-only view over the cost matrix with typed node access.
#[derive(Debug, Clone, Copy)]
pub struct RoutingProblem<'a> {
    pub matrix: &'a CostMatrix,
    pub layout: NodeLayout,
}

impl<'a> RoutingProblem<'a> {
    pub fn new(matrix: &'a CostMatrix, layout: NodeLayout) -> Self {
        Self { matrix, layout }
    }

    pub fn duration_between(&self, from: Node, to: Node) -> u64 {
        self.matrix
            .duration(self.layout.matrix_index(from), self.layout.matrix_index(to))
    }

    pub fn route_duration(&self, worker: DepotIdx, jobs: &[JobIdx]) -> u64 {
        route_duration(worker, jobs, self.matrix, &self.layout)
    }
}

/// Balanced multi-depot solver: cheapest insertion followed by a time-bounded
/// guided local search.
#[derive(Debug, Clone, Default)]
pub struct RouteSolver {
    params: SolverParams,
}

impl RouteSolver {
    pub fn new(params: SolverParams) -> Self {
        Self { params }
    }

    pub fn solve(
        &self,
        matrix: &CostMatrix,
        num_workers: usize,
        num_jobs: usize,
    ) -> Result<Solution, OptimizeError> {
        self.solve_with_statistics(matrix, num_workers, num_jobs)
            .map(|(solution, _)| solution)
    }

    #[instrument(skip_all, fields(workers = num_workers, jobs = num_jobs))]
    pub fn solve_with_statistics(
        &self,
        matrix: &CostMatrix,
        num_workers: usize,
        num_jobs: usize,
    ) -> Result<(Solution, SearchStatistics), OptimizeError> {
        if num_workers == 0 {
            return Err(OptimizeError::Validation("At least one worker is required".into()));
        }
        if num_jobs == 0 {
            return Err(OptimizeError::Validation("At least one job is required".into()));
        }

        let layout = NodeLayout::new(num_workers, num_jobs);
        if matrix.size() != layout.size() {
            return Err(OptimizeError::Validation(format!(
                "cost matrix is {0}x{0} but {1} workers and {2} jobs need {3}x{3}",
                matrix.size(),
                num_workers,
                num_jobs,
                layout.size()
            )));
        }

        let started = Instant::now();
        let deadline = started + self.params.time_limit;
        let problem = RoutingProblem::new(matrix, layout);
        let mut statistics = SearchStatistics::default();

        statistics.transition(SolverPhase::Unsolved);
        statistics.transition(SolverPhase::Constructing);

        let initial = match cheapest_insertion(&problem, self.params.balance_coefficient) {
            Ok(routes) => routes,
            Err(e) => {
                statistics.transition(SolverPhase::Infeasible);
                error!("Construction failed: {}", e);
                return Err(e);
            }
        };

        statistics.transition(SolverPhase::Improving);
        let best = guided_local_search(&problem, initial, &self.params, deadline, &mut statistics);

        let routes: Vec<Route> = best
            .iter()
            .enumerate()
            .map(|(worker, jobs)| Route::from_jobs(DepotIdx::new(worker), jobs, matrix, &layout))
            .collect();
        let durations: Vec<u64> = routes.iter().map(|r| r.duration_seconds).collect();
        let solution = Solution {
            objective: balanced_objective(&durations, self.params.balance_coefficient),
            routes,
        };

        if let Err(reason) = solution.verify(&layout) {
            statistics.transition(SolverPhase::Infeasible);
            error!("Search produced an invalid solution: {}", reason);
            return Err(OptimizeError::SolverInfeasible(reason));
        }

        statistics.transition(SolverPhase::Solved);
        statistics.elapsed = started.elapsed();

        info!(
            objective = solution.objective,
            max_duration = solution.max_duration(),
            iterations = statistics.iterations,
            elapsed_ms = statistics.elapsed.as_millis() as u64,
            "Solution found"
        );

        Ok((solution, statistics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::constant::SENTINEL_COST;

    fn quick() -> RouteSolver {
        RouteSolver::new(SolverParams::default().with_time_limit(Duration::from_millis(200)))
    }

    #[test]
    fn rejects_degenerate_calls() {
        let matrix = CostMatrix::filled(2, 1);

        assert!(matches!(quick().solve(&matrix, 2, 0), Err(OptimizeError::Validation(_))));
        assert!(matches!(quick().solve(&matrix, 0, 2), Err(OptimizeError::Validation(_))));
        assert!(matches!(quick().solve(&matrix, 1, 2), Err(OptimizeError::Validation(_))));
    }

    #[test]
    fn single_worker_visits_every_job() {
        let matrix = CostMatrix::from_rows(
            vec![
                vec![0, 1, 2, 3],
                vec![1, 0, 1, 2],
                vec![2, 1, 0, 1],
                vec![3, 2, 1, 0],
            ],
            vec![vec![10; 4]; 4],
        );

        let (solution, statistics) = quick().solve_with_statistics(&matrix, 1, 3).unwrap();

        let route = solution.route(DepotIdx::new(0));
        assert_eq!(route.job_count(), 3);
        // out along the line and back: 1 + 1 + 1 + 3
        assert_eq!(route.duration_seconds, 6);
        assert_eq!(route.distance_meters, 40);
        assert_eq!(
            statistics.phases,
            vec![
                SolverPhase::Unsolved,
                SolverPhase::Constructing,
                SolverPhase::Improving,
                SolverPhase::Solved
            ]
        );
    }

    #[test]
    fn unreachable_job_is_still_assigned() {
        // job 1 (index 3) is unreachable from everywhere
        let mut matrix = CostMatrix::filled(4, 5);
        for i in 0..4 {
            matrix.set(i, i, 0, 0);
            if i != 3 {
                matrix.set(i, 3, SENTINEL_COST, SENTINEL_COST);
                matrix.set(3, i, SENTINEL_COST, SENTINEL_COST);
            }
        }

        let solution = quick().solve(&matrix, 2, 2).unwrap();

        assert_eq!(solution.jobs_assigned(), 2);
        assert!(solution.max_duration() >= SENTINEL_COST);
    }

    #[test]
    fn max_no_improvement_scales_with_size() {
        assert_eq!(calculate_max_no_improvement(5), 300);
        assert!(calculate_max_no_improvement(200) > 300);
    }
}
