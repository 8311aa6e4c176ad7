use crate::domain::types::{CostMatrix, DepotIdx, JobIdx, Node, NodeLayout};

/// Matrix-index arcs of the closed tour `depot -> jobs.. -> depot`.
/// An empty route has no arcs; a worker is never charged depot-to-depot.
pub fn route_arcs<'a>(
    worker: DepotIdx,
    jobs: &'a [JobIdx],
    layout: &'a NodeLayout,
) -> impl Iterator<Item = (usize, usize)> + 'a {
    let depot = layout.matrix_index(Node::Depot(worker));
    let inner = jobs.iter().map(move |&job| layout.matrix_index(Node::Job(job)));

    let stops: Vec<usize> = if jobs.is_empty() {
        vec![]
    } else {
        std::iter::once(depot)
            .chain(inner)
            .chain(std::iter::once(depot))
            .collect()
    };

    (1..stops.len()).map(move |i| (stops[i - 1], stops[i]))
}

pub fn route_duration(
    worker: DepotIdx,
    jobs: &[JobIdx],
    matrix: &CostMatrix,
    layout: &NodeLayout,
) -> u64 {
    route_arcs(worker, jobs, layout)
        .map(|(from, to)| matrix.duration(from, to))
        .fold(0u64, u64::saturating_add)
}

pub fn route_distance(
    worker: DepotIdx,
    jobs: &[JobIdx],
    matrix: &CostMatrix,
    layout: &NodeLayout,
) -> u64 {
    route_arcs(worker, jobs, layout)
        .map(|(from, to)| matrix.distance(from, to))
        .fold(0u64, u64::saturating_add)
}

/// `total + coefficient * span`, where the span is the longest route duration.
///
/// Every route starts its duration at zero, so the span between the earliest
/// start and the latest end is the maximum route duration.
pub fn balanced_objective(durations: &[u64], coefficient: u64) -> u64 {
    let total = durations.iter().fold(0u64, |acc, d| acc.saturating_add(*d));
    let span = durations.iter().copied().max().unwrap_or(0);
    total.saturating_add(coefficient.saturating_mul(span))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_job_matrix() -> (CostMatrix, NodeLayout) {
        let durations = vec![vec![99, 10, 20], vec![11, 0, 5], vec![21, 6, 0]];
        let distances = vec![vec![99, 1, 2], vec![1, 0, 3], vec![2, 3, 0]];
        (CostMatrix::from_rows(durations, distances), NodeLayout::new(1, 2))
    }

    #[test]
    fn arcs_close_the_tour_at_the_depot() {
        let (_, layout) = two_job_matrix();
        let jobs = [JobIdx::new(1), JobIdx::new(0)];
        let arcs: Vec<_> = route_arcs(DepotIdx::new(0), &jobs, &layout).collect();

        assert_eq!(arcs, vec![(0, 2), (2, 1), (1, 0)]);
    }

    #[test]
    fn asymmetric_costs_follow_direction() {
        let (matrix, layout) = two_job_matrix();

        let depot = DepotIdx::new(0);
        let forward = route_duration(depot, &[JobIdx::new(0), JobIdx::new(1)], &matrix, &layout);
        let backward = route_duration(depot, &[JobIdx::new(1), JobIdx::new(0)], &matrix, &layout);

        assert_eq!(forward, 10 + 5 + 21);
        assert_eq!(backward, 20 + 6 + 11);
    }

    #[test]
    fn idle_worker_is_not_charged_the_depot_self_loop() {
        let (matrix, layout) = two_job_matrix();
        assert_eq!(route_duration(DepotIdx::new(0), &[], &matrix, &layout), 0);
        assert_eq!(route_distance(DepotIdx::new(0), &[], &matrix, &layout), 0);
    }

    #[test]
    fn objective_prefers_balanced_split_over_cheaper_total() {
        // one worker does everything
        let lopsided = balanced_objective(&[100, 0], 100);
        // slightly more travel overall but split evenly
        let balanced = balanced_objective(&[60, 60], 100);

        assert!(balanced < lopsided);
        assert_eq!(balanced, 120 + 100 * 60);
    }
}
