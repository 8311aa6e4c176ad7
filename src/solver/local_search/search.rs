use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, span, trace, Level};

use crate::domain::types::JobIdx;
use crate::evaluation::penalty::ArcPenalties;
use crate::solver::statistics::{SearchStatistics, StopReason};
use crate::solver::{calculate_max_no_improvement, RoutingProblem, SolverParams};

use super::neighbourhood::{generate_moves, Move};
use super::working_solution::WorkingSolution;

const IMPROVEMENT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
struct ScoredMove {
    index: usize,
    objective: u64,
    penalized: f64,
}

/// Score every move against the penalized objective and return the best one.
/// Ties go to the move generated first, so the choice does not depend on
/// how rayon splits the work.
fn best_move(
    current: &WorkingSolution,
    moves: &[Move],
    penalties: &ArcPenalties,
    lambda: f64,
) -> Option<ScoredMove> {
    moves
        .par_iter()
        .enumerate()
        .map(|(index, mv)| {
            let (objective, penalized) = current.evaluate(mv, penalties, lambda);
            ScoredMove {
                index,
                objective,
                penalized,
            }
        })
        .min_by(|a, b| {
            a.penalized
                .total_cmp(&b.penalized)
                .then(a.index.cmp(&b.index))
        })
}

fn penalty_weight(current: &WorkingSolution, lambda_coefficient: f64) -> f64 {
    let arcs = current.arc_count().max(1) as f64;
    (lambda_coefficient * current.total_duration() as f64 / arcs).max(1.0)
}

/// Guided local search over relocate, exchange and 2-opt moves.
///
/// Moves are taken while they lower the penalized objective. At a local optimum
/// the arcs with the highest utility are penalized, which pushes the search
/// out of the basin. The best solution by true objective is returned.
pub fn guided_local_search(
    problem: &RoutingProblem,
    initial: Vec<Vec<JobIdx>>,
    params: &SolverParams,
    deadline: Instant,
    statistics: &mut SearchStatistics,
) -> Vec<Vec<JobIdx>> {
    let search_span = span!(Level::DEBUG, "guided_local_search");
    let _guard = search_span.enter();

    let max_no_improvement = params
        .max_no_improvement
        .unwrap_or_else(|| calculate_max_no_improvement(problem.layout.size()));

    let mut penalties = ArcPenalties::new(problem.layout.size());
    let mut current =
        WorkingSolution::new(problem, initial, params.balance_coefficient, &penalties);
    let lambda = penalty_weight(&current, params.lambda_coefficient);

    let mut best_routes = current.routes().to_vec();
    let mut best_objective = current.objective();
    statistics.initial_objective = best_objective;
    statistics.record_best(0, best_objective);

    debug!(
        "Starting search: objective = {}, lambda = {:.2}, max_no_improvement = {}",
        best_objective, lambda, max_no_improvement
    );

    let mut iteration = 0;
    let mut stagnation = 0;

    let stop_reason = loop {
        if Instant::now() >= deadline {
            break StopReason::TimeLimit;
        }
        if stagnation >= max_no_improvement {
            break StopReason::Stagnation;
        }

        let moves = generate_moves(current.routes());
        let Some(chosen) = best_move(&current, &moves, &penalties, lambda) else {
            break StopReason::NoMoves;
        };
        iteration += 1;

        let previous_objective = current.objective();

        if chosen.penalized + IMPROVEMENT_EPSILON < current.penalized(lambda) {
            let mv = moves[chosen.index];
            let introduced = current.apply(&mv, &penalties);
            statistics.moves_applied += 1;
            trace!("Iteration {}: applied {:?}", iteration, mv);

            if current.objective() >= previous_objective {
                for (from, to) in introduced {
                    penalties.increment(from, to);
                }
                current.refresh_penalties(&penalties);
            }
        } else {
            let penalized = penalties.penalize_max_utility(
                current.routes(),
                problem.matrix,
                &problem.layout,
            );
            current.refresh_penalties(&penalties);
            statistics.local_optima += 1;
            trace!("Iteration {}: local optimum, penalized {} arc(s)", iteration, penalized);
        }

        if current.objective() < best_objective {
            best_objective = current.objective();
            best_routes = current.routes().to_vec();
            statistics.record_best(iteration, best_objective);
            stagnation = 0;
            info!("New best at iteration {}: objective = {}", iteration, best_objective);
        } else {
            stagnation += 1;
        }
    };

    statistics.iterations = iteration;
    statistics.stop_reason = Some(stop_reason);
    debug!(
        "Search stopped after {} iteration(s): {:?}",
        iteration, stop_reason
    );

    best_routes
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::types::{CostMatrix, DepotIdx, NodeLayout};
    use crate::evaluation::fitness::{balanced_objective, route_duration};

    fn jobs(ids: &[usize]) -> Vec<JobIdx> {
        ids.iter().copied().map(JobIdx::new).collect()
    }

    fn params(max_no_improvement: usize) -> SolverParams {
        SolverParams {
            max_no_improvement: Some(max_no_improvement),
            ..SolverParams::default()
        }
    }

    fn objective(routes: &[Vec<JobIdx>], matrix: &CostMatrix, layout: &NodeLayout) -> u64 {
        let durations: Vec<u64> = routes
            .iter()
            .enumerate()
            .map(|(w, r)| route_duration(DepotIdx::new(w), r, matrix, layout))
            .collect();
        balanced_objective(&durations, 100)
    }

    #[test]
    fn spreads_an_overloaded_route() {
        let matrix = CostMatrix::filled(6, 10);
        let layout = NodeLayout::new(2, 4);
        let problem = RoutingProblem::new(&matrix, layout);
        let mut statistics = SearchStatistics::default();

        let best = guided_local_search(
            &problem,
            vec![jobs(&[0, 1, 2, 3]), vec![]],
            &params(50),
            Instant::now() + Duration::from_secs(5),
            &mut statistics,
        );

        assert_eq!(best[0].len(), 2);
        assert_eq!(best[1].len(), 2);
        assert_eq!(statistics.initial_objective, 50 + 100 * 50);
        assert_eq!(statistics.best_objective, 60 + 100 * 30);
        assert_eq!(statistics.stop_reason, Some(StopReason::Stagnation));
    }

    #[test]
    fn never_returns_worse_than_the_start() {
        let mut matrix = CostMatrix::filled(7, 0);
        for i in 0..7 {
            for j in 0..7 {
                if i != j {
                    matrix.set(i, j, ((i * 31 + j * 17) % 23 + 1) as u64, 1);
                }
            }
        }
        let layout = NodeLayout::new(2, 5);
        let problem = RoutingProblem::new(&matrix, layout);
        let initial = vec![jobs(&[4, 0, 3]), jobs(&[2, 1])];
        let start = objective(&initial, &matrix, &layout);
        let mut statistics = SearchStatistics::default();

        let best = guided_local_search(
            &problem,
            initial,
            &params(100),
            Instant::now() + Duration::from_secs(5),
            &mut statistics,
        );

        assert!(objective(&best, &matrix, &layout) <= start);
        assert_eq!(objective(&best, &matrix, &layout), statistics.best_objective);
        let mut all: Vec<usize> = best.iter().flatten().map(|j| j.get()).collect();
        all.sort();
        assert_eq!(all, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn stops_when_there_is_nothing_to_move() {
        let matrix = CostMatrix::filled(2, 3);
        let problem = RoutingProblem::new(&matrix, NodeLayout::new(1, 1));
        let mut statistics = SearchStatistics::default();

        let best = guided_local_search(
            &problem,
            vec![jobs(&[0])],
            &params(10),
            Instant::now() + Duration::from_secs(5),
            &mut statistics,
        );

        assert_eq!(best, vec![jobs(&[0])]);
        assert_eq!(statistics.iterations, 0);
        assert_eq!(statistics.stop_reason, Some(StopReason::NoMoves));
    }

    #[test]
    fn respects_an_expired_deadline() {
        let matrix = CostMatrix::filled(4, 3);
        let problem = RoutingProblem::new(&matrix, NodeLayout::new(1, 3));
        let mut statistics = SearchStatistics::default();

        guided_local_search(
            &problem,
            vec![jobs(&[0, 1, 2])],
            &params(10),
            Instant::now(),
            &mut statistics,
        );

        assert_eq!(statistics.stop_reason, Some(StopReason::TimeLimit));
    }
}
