use tracing::{debug, info};

use crate::domain::types::{DepotIdx, JobIdx, Node};
use crate::error::OptimizeError;
use crate::evaluation::fitness::balanced_objective;

use super::RoutingProblem;

#[derive(Debug, Clone, Copy)]
struct Candidate {
    objective: u64,
    job: JobIdx,
    worker: usize,
    position: usize,
}

/// Greedy cheapest insertion against the balanced objective.
///
/// Each round inserts the unassigned job whose best position, over all workers,
/// yields the lowest objective. Unreachable edges are just expensive, so every
/// job always has a position and the construction runs to completion.
pub fn cheapest_insertion(
    problem: &RoutingProblem,
    coefficient: u64,
) -> Result<Vec<Vec<JobIdx>>, OptimizeError> {
    let layout = problem.layout;
    let num_workers = layout.num_workers();

    let mut routes: Vec<Vec<JobIdx>> = vec![vec![]; num_workers];
    let mut durations: Vec<u64> = vec![0; num_workers];
    let mut unassigned: Vec<JobIdx> = layout.jobs().collect();

    while !unassigned.is_empty() {
        let total = durations.iter().fold(0u64, |acc, d| acc.saturating_add(*d));
        let max_other = max_excluding_each(&durations);

        let mut best: Option<Candidate> = None;

        for &job in &unassigned {
            let job_node = Node::Job(job);

            for (worker, route) in routes.iter().enumerate() {
                let depot = Node::Depot(DepotIdx::new(worker));

                for position in 0..=route.len() {
                    let prev = if position == 0 { depot } else { Node::Job(route[position - 1]) };
                    let next = route.get(position).map_or(depot, |&j| Node::Job(j));

                    let removed = if route.is_empty() {
                        0
                    } else {
                        problem.duration_between(prev, next)
                    };
                    let added = problem
                        .duration_between(prev, job_node)
                        .saturating_add(problem.duration_between(job_node, next));

                    let new_duration =
                        durations[worker].saturating_sub(removed).saturating_add(added);
                    let new_total = total
                        .saturating_sub(durations[worker])
                        .saturating_add(new_duration);
                    let longest = new_duration.max(max_other[worker]);
                    let objective =
                        new_total.saturating_add(coefficient.saturating_mul(longest));

                    if best.map_or(true, |b| objective < b.objective) {
                        best = Some(Candidate {
                            objective,
                            job,
                            worker,
                            position,
                        });
                    }
                }
            }
        }

        let Some(chosen) = best else {
            return Err(OptimizeError::SolverInfeasible(format!(
                "could not place {} remaining job(s)",
                unassigned.len()
            )));
        };

        routes[chosen.worker].insert(chosen.position, chosen.job);
        durations[chosen.worker] =
            problem.route_duration(DepotIdx::new(chosen.worker), &routes[chosen.worker]);
        unassigned.retain(|&job| job != chosen.job);

        debug!(
            "Inserted job {} into worker {} at position {} (objective {})",
            chosen.job.get(),
            chosen.worker,
            chosen.position,
            chosen.objective
        );
    }

    info!(
        "Initial solution constructed, objective = {}",
        balanced_objective(&durations, coefficient)
    );

    Ok(routes)
}

/// For every index, the maximum of all other entries (0 when there are none).
fn max_excluding_each(values: &[u64]) -> Vec<u64> {
    let mut first = (usize::MAX, 0u64);
    let mut second = 0u64;

    for (index, &value) in values.iter().enumerate() {
        if first.0 == usize::MAX || value > first.1 {
            second = first.1;
            first = (index, value);
        } else if value > second {
            second = value;
        }
    }

    (0..values.len())
        .map(|index| if index == first.0 { second } else { first.1 })
        .collect()
}
