use crate::domain::types::{DepotIdx, JobIdx};
use crate::evaluation::fitness::{balanced_objective, route_arcs};
use crate::evaluation::penalty::ArcPenalties;
use crate::solver::RoutingProblem;

use super::neighbourhood::Move;

/// Mutable search state with cached per-route durations and penalty sums.
#[derive(Debug, Clone)]
pub struct WorkingSolution<'p> {
    problem: &'p RoutingProblem<'p>,
    coefficient: u64,
    routes: Vec<Vec<JobIdx>>,
    durations: Vec<u64>,
    penalties: Vec<u64>,
    objective: u64,
}

impl<'p> WorkingSolution<'p> {
    pub fn new(
        problem: &'p RoutingProblem<'p>,
        routes: Vec<Vec<JobIdx>>,
        coefficient: u64,
        arc_penalties: &ArcPenalties,
    ) -> Self {
        let durations: Vec<u64> = routes
            .iter()
            .enumerate()
            .map(|(worker, jobs)| problem.route_duration(DepotIdx::new(worker), jobs))
            .collect();
        let objective = balanced_objective(&durations, coefficient);

        let mut solution = Self {
            problem,
            coefficient,
            penalties: vec![0; routes.len()],
            routes,
            durations,
            objective,
        };
        solution.refresh_penalties(arc_penalties);
        solution
    }

    pub fn routes(&self) -> &[Vec<JobIdx>] {
        &self.routes
    }

    pub fn objective(&self) -> u64 {
        self.objective
    }

    pub fn total_duration(&self) -> u64 {
        self.durations.iter().fold(0u64, |acc, d| acc.saturating_add(*d))
    }

    pub fn arc_count(&self) -> usize {
        self.routes
            .iter()
            .filter(|jobs| !jobs.is_empty())
            .map(|jobs| jobs.len() + 1)
            .sum()
    }

    pub fn penalized(&self, lambda: f64) -> f64 {
        self.objective as f64 + lambda * self.penalties.iter().sum::<u64>() as f64
    }

    /// Objective and penalized objective the solution would have after `mv`.
    pub fn evaluate(&self, mv: &Move, arc_penalties: &ArcPenalties, lambda: f64) -> (u64, f64) {
        let layout = &self.problem.layout;
        let mut durations = self.durations.clone();
        let mut penalty: u64 = self.penalties.iter().sum();

        for (worker, jobs) in mv.changed_routes(&self.routes) {
            durations[worker.get()] = self.problem.route_duration(worker, &jobs);
            penalty = penalty - self.penalties[worker.get()]
                + arc_penalties.route_penalty(worker, &jobs, layout);
        }

        let objective = balanced_objective(&durations, self.coefficient);
        (objective, objective as f64 + lambda * penalty as f64)
    }

    /// Applies `mv` and returns the arcs it introduced.
    pub fn apply(&mut self, mv: &Move, arc_penalties: &ArcPenalties) -> Vec<(usize, usize)> {
        let layout = self.problem.layout;
        let mut introduced = Vec::new();

        for (worker, jobs) in mv.changed_routes(&self.routes) {
            let index = worker.get();
            let previous: Vec<(usize, usize)> =
                route_arcs(worker, &self.routes[index], &layout).collect();
            introduced
                .extend(route_arcs(worker, &jobs, &layout).filter(|arc| !previous.contains(arc)));

            self.durations[index] = self.problem.route_duration(worker, &jobs);
            self.penalties[index] = arc_penalties.route_penalty(worker, &jobs, &layout);
            self.routes[index] = jobs;
        }

        self.objective = balanced_objective(&self.durations, self.coefficient);
        introduced
    }

    pub fn refresh_penalties(&mut self, arc_penalties: &ArcPenalties) {
        let layout = self.problem.layout;
        for (worker, jobs) in self.routes.iter().enumerate() {
            self.penalties[worker] =
                arc_penalties.route_penalty(DepotIdx::new(worker), jobs, &layout);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{CostMatrix, NodeLayout};

    #[test]
    fn evaluate_matches_apply() {
        let mut matrix = CostMatrix::filled(5, 0);
        for i in 0..5 {
            for j in 0..5 {
                matrix.set(i, j, (i as u64 + 1) * (j as u64 + 2) % 17, 1);
            }
        }
        let problem = RoutingProblem::new(&matrix, NodeLayout::new(2, 3));
        let penalties = ArcPenalties::new(5);
        let mut solution = WorkingSolution::new(
            &problem,
            vec![vec![JobIdx::new(0), JobIdx::new(1)], vec![JobIdx::new(2)]],
            100,
            &penalties,
        );

        let mv = Move::Relocate {
            from: DepotIdx::new(0),
            from_pos: 1,
            to: DepotIdx::new(1),
            to_pos: 1,
        };
        let (objective, _) = solution.evaluate(&mv, &penalties, 1.0);
        let introduced = solution.apply(&mv, &penalties);

        assert_eq!(solution.objective(), objective);
        assert_eq!(solution.routes()[1], vec![JobIdx::new(2), JobIdx::new(1)]);
        // job 0 -> depot 0 closes the shortened route; depot 1 -> job 2 is kept
        assert_eq!(introduced, vec![(2, 0), (4, 3), (3, 1)]);
    }

    #[test]
    fn penalties_raise_the_penalized_objective() {
        let matrix = CostMatrix::filled(3, 10);
        let problem = RoutingProblem::new(&matrix, NodeLayout::new(1, 2));
        let mut penalties = ArcPenalties::new(3);
        let mut solution = WorkingSolution::new(
            &problem,
            vec![vec![JobIdx::new(0), JobIdx::new(1)]],
            100,
            &penalties,
        );
        let before = solution.penalized(2.0);

        penalties.increment(0, 1);
        solution.refresh_penalties(&penalties);

        assert_eq!(solution.penalized(2.0), before + 2.0);
        assert_eq!(solution.objective(), 30 + 100 * 30);
        assert_eq!(solution.arc_count(), 3);
    }
}
