use crate::domain::types::{CostMatrix, DepotIdx, JobIdx, NodeLayout};
use crate::evaluation::fitness::route_arcs;

/// Guided-local-search penalty counters, one per directed arc of the matrix.
#[derive(Debug, Clone)]
pub struct ArcPenalties {
    size: usize,
    counts: Vec<u32>,
}

impl ArcPenalties {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            counts: vec![0; size * size],
        }
    }

    pub fn get(&self, from: usize, to: usize) -> u32 {
        self.counts[from * self.size + to]
    }

    pub fn increment(&mut self, from: usize, to: usize) {
        let count = &mut self.counts[from * self.size + to];
        *count = count.saturating_add(1);
    }

    pub fn route_penalty(&self, worker: DepotIdx, jobs: &[JobIdx], layout: &NodeLayout) -> u64 {
        route_arcs(worker, jobs, layout)
            .map(|(from, to)| self.get(from, to) as u64)
            .sum()
    }

    /// Penalizes the arcs with the highest utility `cost / (1 + penalty)` among
    /// those used by `routes`. Returns how many arcs were penalized.
    pub fn penalize_max_utility(
        &mut self,
        routes: &[Vec<JobIdx>],
        matrix: &CostMatrix,
        layout: &NodeLayout,
    ) -> usize {
        let arcs: Vec<(usize, usize, f64)> = routes
            .iter()
            .enumerate()
            .flat_map(|(worker, jobs)| route_arcs(DepotIdx::new(worker), jobs, layout))
            .map(|(from, to)| {
                let utility = matrix.duration(from, to) as f64 / (1.0 + self.get(from, to) as f64);
                (from, to, utility)
            })
            .collect();

        let Some(max_utility) = arcs.iter().map(|a| a.2).max_by(f64::total_cmp) else {
            return 0;
        };

        let mut penalized = 0;
        for (from, to, utility) in arcs {
            if (max_utility - utility).abs() <= f64::EPSILON * max_utility.max(1.0) {
                self.increment(from, to);
                penalized += 1;
            }
        }
        penalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn penalizes_the_most_expensive_arc_first() {
        let layout = NodeLayout::new(1, 2);
        let matrix = CostMatrix::from_rows(
            vec![vec![0, 10, 50], vec![10, 0, 5], vec![50, 5, 0]],
            vec![vec![0; 3]; 3],
        );
        let routes = vec![vec![JobIdx::new(0), JobIdx::new(1)]];
        let mut penalties = ArcPenalties::new(layout.size());

        // arcs: 0->1 (10), 1->2 (5), 2->0 (50)
        assert_eq!(penalties.penalize_max_utility(&routes, &matrix, &layout), 1);
        assert_eq!(penalties.get(2, 0), 1);
        assert_eq!(penalties.route_penalty(DepotIdx::new(0), &routes[0], &layout), 1);

        // utility of 2->0 drops to 25, still the highest
        penalties.penalize_max_utility(&routes, &matrix, &layout);
        assert_eq!(penalties.get(2, 0), 2);

        // 50 / 3 ~ 16.7 > 10, then 50 / 4 = 12.5 > 10, then 50 / 5 = 10 ties with 0->1
        penalties.penalize_max_utility(&routes, &matrix, &layout);
        penalties.penalize_max_utility(&routes, &matrix, &layout);
        assert_eq!(penalties.penalize_max_utility(&routes, &matrix, &layout), 2);
        assert_eq!(penalties.get(0, 1), 1);
    }

    #[test]
    fn no_arcs_means_nothing_to_penalize() {
        let layout = NodeLayout::new(2, 1);
        let matrix = CostMatrix::filled(3, 1);
        let mut penalties = ArcPenalties::new(3);

        assert_eq!(penalties.penalize_max_utility(&[vec![], vec![]], &matrix, &layout), 0);
    }
}
