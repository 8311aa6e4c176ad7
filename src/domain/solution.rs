use crate::domain::types::{CostMatrix, DepotIdx, JobIdx, Node, NodeLayout};
use crate::evaluation::fitness::{route_distance, route_duration};

/// One worker's closed tour: own depot, zero or more jobs, own depot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub worker: DepotIdx,
    pub nodes: Vec<Node>,
    pub duration_seconds: u64,
    pub distance_meters: u64,
}

impl Route {
    pub fn from_jobs(
        worker: DepotIdx,
        jobs: &[JobIdx],
        matrix: &CostMatrix,
        layout: &NodeLayout,
    ) -> Self {
        let mut nodes = Vec::with_capacity(jobs.len() + 2);
        nodes.push(Node::Depot(worker));
        nodes.extend(jobs.iter().map(|&job| Node::Job(job)));
        nodes.push(Node::Depot(worker));

        Self {
            worker,
            nodes,
            duration_seconds: route_duration(worker, jobs, matrix, layout),
            distance_meters: route_distance(worker, jobs, matrix, layout),
        }
    }

    pub fn jobs(&self) -> impl Iterator<Item = JobIdx> + '_ {
        self.nodes.iter().filter_map(|node| match node {
            Node::Job(job) => Some(*job),
            Node::Depot(_) => None,
        })
    }

    pub fn job_count(&self) -> usize {
        self.jobs().count()
    }
}

/// One route per worker, covering every job exactly once.
#[derive(Debug, Clone)]
pub struct Solution {
    pub routes: Vec<Route>,
    pub objective: u64,
}

impl Solution {
    pub fn route(&self, worker: DepotIdx) -> &Route {
        &self.routes[worker.get()]
    }

    pub fn max_duration(&self) -> u64 {
        self.routes.iter().map(|r| r.duration_seconds).max().unwrap_or(0)
    }

    pub fn jobs_assigned(&self) -> usize {
        self.routes.iter().map(Route::job_count).sum()
    }

    /// Checks the structural invariants: routes in worker order, each bounded by
    /// its own depot, and every job visited exactly once.
    pub fn verify(&self, layout: &NodeLayout) -> Result<(), String> {
        if self.routes.len() != layout.num_workers() {
            return Err(format!(
                "expected {} routes, found {}",
                layout.num_workers(),
                self.routes.len()
            ));
        }

        let mut seen = vec![0usize; layout.num_jobs()];

        for (index, route) in self.routes.iter().enumerate() {
            let depot = Node::Depot(DepotIdx::new(index));
            if route.worker.get() != index
                || route.nodes.len() < 2
                || route.nodes.first() != Some(&depot)
                || route.nodes.last() != Some(&depot)
            {
                return Err(format!("route {index} is not bounded by its own depot"));
            }

            let inner = &route.nodes[1..route.nodes.len() - 1];
            for node in inner {
                match node {
                    Node::Job(job) if job.get() < seen.len() => seen[job.get()] += 1,
                    Node::Job(job) => {
                        return Err(format!("route {index} visits unknown job {}", job.get()))
                    }
                    Node::Depot(_) => return Err(format!("route {index} passes through a depot")),
                }
            }
        }

        if let Some((job, count)) = seen.iter().enumerate().find(|(_, &count)| count != 1) {
            return Err(format!("job {job} is visited {count} times"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> CostMatrix {
        // depot 0, jobs 0 and 1 at indices 1 and 2
        CostMatrix::from_rows(
            vec![vec![7, 10, 20], vec![10, 0, 5], vec![20, 5, 0]],
            vec![vec![7, 100, 200], vec![100, 0, 50], vec![200, 50, 0]],
        )
    }

    #[test]
    fn route_from_jobs_sums_arcs() {
        let layout = NodeLayout::new(1, 2);
        let route = Route::from_jobs(
            DepotIdx::new(0),
            &[JobIdx::new(0), JobIdx::new(1)],
            &matrix(),
            &layout,
        );

        assert_eq!(route.nodes.len(), 4);
        assert_eq!(route.duration_seconds, 10 + 5 + 20);
        assert_eq!(route.distance_meters, 100 + 50 + 200);
        assert_eq!(route.job_count(), 2);
    }

    #[test]
    fn empty_route_costs_nothing() {
        let layout = NodeLayout::new(1, 2);
        let route = Route::from_jobs(DepotIdx::new(0), &[], &matrix(), &layout);

        assert_eq!(route.nodes, vec![Node::Depot(DepotIdx::new(0)); 2]);
        assert_eq!(route.duration_seconds, 0);
        assert_eq!(route.distance_meters, 0);
    }

    #[test]
    fn verify_detects_missing_and_duplicate_jobs() {
        let layout = NodeLayout::new(1, 2);
        let m = matrix();

        let ok = Solution {
            routes: vec![Route::from_jobs(
                DepotIdx::new(0),
                &[JobIdx::new(1), JobIdx::new(0)],
                &m,
                &layout,
            )],
            objective: 0,
        };
        assert!(ok.verify(&layout).is_ok());

        let missing = Solution {
            routes: vec![Route::from_jobs(DepotIdx::new(0), &[JobIdx::new(1)], &m, &layout)],
            objective: 0,
        };
        assert!(missing.verify(&layout).is_err());

        let duplicate = Solution {
            routes: vec![Route::from_jobs(
                DepotIdx::new(0),
                &[JobIdx::new(0), JobIdx::new(1), JobIdx::new(0)],
                &m,
                &layout,
            )],
            objective: 0,
        };
        assert!(duplicate.verify(&layout).is_err());
    }

    #[test]
    fn verify_rejects_a_route_with_a_single_depot_node() {
        let layout = NodeLayout::new(1, 0);
        let solution = Solution {
            routes: vec![Route {
                worker: DepotIdx::new(0),
                nodes: vec![Node::Depot(DepotIdx::new(0))],
                duration_seconds: 0,
                distance_meters: 0,
            }],
            objective: 0,
        };

        assert!(solution.verify(&layout).is_err());
    }
}
