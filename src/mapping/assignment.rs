use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::constant::FAR_JOB_THRESHOLD_KM;
use crate::domain::solution::{Route, Solution};
use crate::domain::types::{CoordinateSet, JobIdx, Location, Node};
use crate::setup::init_types::{JobInput, WorkerInput};
use crate::utils::haversine_km;

/// One job on a worker's route. `order` is 1-based.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub job_id: String,
    pub order: usize,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerRoute {
    pub worker_id: String,
    pub worker_name: String,
    #[serde(rename = "jobs")]
    pub assignments: Vec<Assignment>,
    pub total_duration_seconds: u64,
    pub total_distance_meters: u64,
    /// Depot, jobs in visiting order, depot.
    pub optimized_path: Vec<Location>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    FarJobs,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    #[serde(rename = "type")]
    pub kind: WarningKind,
    pub message: String,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FarJob {
    pub job: JobIdx,
    pub distance_km: f64,
}

/// Jobs further than `threshold_km` from the first worker's depot.
pub fn detect_far_jobs(coordinates: &CoordinateSet, threshold_km: f64) -> Vec<FarJob> {
    let Some(&reference) = coordinates.depots.first() else {
        return vec![];
    };

    coordinates
        .jobs
        .iter()
        .enumerate()
        .filter_map(|(index, &location)| {
            let distance_km = haversine_km(reference, location);
            (distance_km > threshold_km).then_some(FarJob {
                job: JobIdx::new(index),
                distance_km,
            })
        })
        .collect()
}

/// Translates solver routes back into caller ids and locations.
pub struct AssignmentMapper<'a> {
    jobs: &'a [JobInput],
    workers: &'a [WorkerInput],
    coordinates: &'a CoordinateSet,
}

impl<'a> AssignmentMapper<'a> {
    pub fn new(
        jobs: &'a [JobInput],
        workers: &'a [WorkerInput],
        coordinates: &'a CoordinateSet,
    ) -> Self {
        Self {
            jobs,
            workers,
            coordinates,
        }
    }

    pub fn map(
        &self,
        solution: &Solution,
        far_jobs: &[FarJob],
    ) -> (BTreeMap<String, WorkerRoute>, Vec<Warning>) {
        let routes = solution
            .routes
            .iter()
            .map(|route| {
                let mapped = self.map_route(route);
                (mapped.worker_id.clone(), mapped)
            })
            .collect();

        (routes, self.warnings(far_jobs))
    }

    fn map_route(&self, route: &Route) -> WorkerRoute {
        let worker = &self.workers[route.worker.get()];

        let assignments: Vec<Assignment> = route
            .jobs()
            .enumerate()
            .map(|(position, job)| Assignment {
                job_id: self.jobs[job.get()].id.clone(),
                order: position + 1,
                location: self.coordinates.location(Node::Job(job)),
            })
            .collect();

        let worker_name = worker.name.clone().unwrap_or_else(|| "Unknown".to_string());
        info!(
            "{}: {} jobs, {:.1} km, {:.0} min",
            worker_name,
            assignments.len(),
            route.distance_meters as f64 / 1000.0,
            route.duration_seconds as f64 / 60.0
        );

        WorkerRoute {
            worker_id: worker.id.clone(),
            worker_name,
            assignments,
            total_duration_seconds: route.duration_seconds,
            total_distance_meters: route.distance_meters,
            optimized_path: route
                .nodes
                .iter()
                .map(|&node| self.coordinates.location(node))
                .collect(),
        }
    }

    /// Jobs beyond the far-job threshold from the first worker's depot, each logged.
    pub fn far_jobs(&self) -> Vec<FarJob> {
        let far_jobs = detect_far_jobs(self.coordinates, FAR_JOB_THRESHOLD_KM);
        for far in &far_jobs {
            warn!("Far job: {}", self.far_job_detail(far));
        }
        far_jobs
    }

    fn far_job_detail(&self, far: &FarJob) -> String {
        let job = &self.jobs[far.job.get()];
        let label = job
            .address
            .as_deref()
            .filter(|address| !address.trim().is_empty())
            .unwrap_or(&job.id);
        format!("{}: {:.0} km away", label, far.distance_km)
    }

    pub fn warnings(&self, far_jobs: &[FarJob]) -> Vec<Warning> {
        if far_jobs.is_empty() {
            return vec![];
        }

        vec![Warning {
            kind: WarningKind::FarJobs,
            message: format!(
                "{} job(s) are more than {:.0}km from the depot. \
                 Consider updating worker depot addresses.",
                far_jobs.len(),
                FAR_JOB_THRESHOLD_KM
            ),
            details: far_jobs.iter().map(|far| self.far_job_detail(far)).collect(),
        }]
    }
}
