use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::config::Settings;
use crate::distance::matrix::CostMatrixBuilder;
use crate::distance::providers::TravelCostSource;
use crate::domain::types::{CoordinateSet, Location};
use crate::error::OptimizeError;
use crate::geocoding::Geocoder;
use crate::mapping::assignment::AssignmentMapper;
use crate::setup::init_types::*;
use crate::solver::statistics::SearchStatistics;
use crate::solver::{RouteSolver, SolverParams};

/// Rejects malformed requests before any lookup is made.
pub fn validate_request(request: &OptimizeRequest) -> Result<(), OptimizeError> {
    if request.jobs.is_empty() {
        return Err(OptimizeError::Validation("At least one job is required".into()));
    }
    if request.workers.is_empty() {
        return Err(OptimizeError::Validation("At least one worker is required".into()));
    }
    if request.time_limit_seconds == Some(0) {
        return Err(OptimizeError::Validation("time_limit_seconds must be positive".into()));
    }

    let mut worker_ids = HashSet::new();
    for worker in &request.workers {
        if worker.id.trim().is_empty() {
            return Err(OptimizeError::Validation("worker id must not be empty".into()));
        }
        if !worker_ids.insert(worker.id.as_str()) {
            return Err(OptimizeError::Validation(format!("duplicate worker id {}", worker.id)));
        }
        check_coordinates(&format!("worker {}", worker.id), worker.depot_lat, worker.depot_lng)?;
    }

    let mut job_ids = HashSet::new();
    for job in &request.jobs {
        if job.id.trim().is_empty() {
            return Err(OptimizeError::Validation("job id must not be empty".into()));
        }
        if !job_ids.insert(job.id.as_str()) {
            return Err(OptimizeError::Validation(format!("duplicate job id {}", job.id)));
        }
        check_coordinates(&format!("job {}", job.id), job.latitude, job.longitude)?;
    }

    Ok(())
}

fn check_coordinates(
    owner: &str,
    lat: Option<f64>,
    lng: Option<f64>,
) -> Result<Option<Location>, OptimizeError> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(OptimizeError::Validation(format!(
                    "{owner} has latitude {lat} outside [-90, 90]"
                )));
            }
            if !(-180.0..=180.0).contains(&lng) {
                return Err(OptimizeError::Validation(format!(
                    "{owner} has longitude {lng} outside [-180, 180]"
                )));
            }
            Ok(Some(Location::new(lat, lng)))
        }
        (None, None) => Ok(None),
        _ => Err(OptimizeError::Validation(format!(
            "{owner} needs both latitude and longitude"
        ))),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

async fn geocode<G>(geocoder: &G, address: &str, owner: &str) -> Result<Location, OptimizeError>
where
    G: Geocoder + ?Sized,
{
    match geocoder.resolve(address).await {
        Ok(Some(location)) => Ok(location),
        Ok(None) => Err(OptimizeError::Resolution(format!(
            "could not geocode {owner} address {address:?}"
        ))),
        Err(e) => Err(OptimizeError::Resolution(format!(
            "could not geocode {owner} address {address:?}: {e}"
        ))),
    }
}

/// Resolves one depot per worker and one location per job, in input order.
pub async fn resolve_locations<G>(
    request: &OptimizeRequest,
    geocoder: &G,
    settings: &Settings,
) -> Result<CoordinateSet, OptimizeError>
where
    G: Geocoder + ?Sized,
{
    let mut depots = Vec::with_capacity(request.workers.len());
    for (index, worker) in request.workers.iter().enumerate() {
        let owner = format!("worker {}", worker.id);
        let name = worker.name.as_deref().unwrap_or("Unknown");

        let depot = if let Some(location) =
            check_coordinates(&owner, worker.depot_lat, worker.depot_lng)?
        {
            debug!("Worker {} ({}): using provided depot coordinates", index, name);
            location
        } else if let Some(address) = non_empty(&worker.depot_address) {
            debug!("Worker {} ({}): geocoding depot {:?}", index, name, address);
            geocode(geocoder, address, &owner).await?
        } else {
            info!("Worker {} ({}): using default depot", index, name);
            settings.default_depot
        };
        depots.push(depot);
    }

    let mut jobs = Vec::with_capacity(request.jobs.len());
    for (index, job) in request.jobs.iter().enumerate() {
        let owner = format!("job {}", job.id);

        let location = if let Some(location) =
            check_coordinates(&owner, job.latitude, job.longitude)?
        {
            location
        } else if let Some(address) = non_empty(&job.address) {
            debug!("Job {}: geocoding {:?}", index, address);
            geocode(geocoder, address, &owner).await?
        } else {
            return Err(OptimizeError::Validation(format!("job {} missing location", job.id)));
        };
        jobs.push(location);
    }

    Ok(CoordinateSet::new(depots, jobs))
}

/// Runs the full pipeline: validation, location resolution, matrix build,
/// solve, and mapping back to caller ids.
pub async fn optimize_routes<S, G>(
    request: &OptimizeRequest,
    source: &S,
    geocoder: &G,
    settings: &Settings,
) -> Result<OptimizationResponse, OptimizeError>
where
    S: TravelCostSource + ?Sized,
    G: Geocoder + ?Sized,
{
    optimize_routes_with_statistics(request, source, geocoder, settings)
        .await
        .map(|(response, _)| response)
}

#[instrument(
    name = "optimize_routes",
    skip_all,
    fields(jobs = request.jobs.len(), workers = request.workers.len())
)]
pub async fn optimize_routes_with_statistics<S, G>(
    request: &OptimizeRequest,
    source: &S,
    geocoder: &G,
    settings: &Settings,
) -> Result<(OptimizationResponse, SearchStatistics), OptimizeError>
where
    S: TravelCostSource + ?Sized,
    G: Geocoder + ?Sized,
{
    info!(
        "Starting route optimization: {} workers, {} jobs",
        request.workers.len(),
        request.jobs.len()
    );

    validate_request(request)?;
    let coordinates = resolve_locations(request, geocoder, settings).await?;
    info!("All coordinates prepared");

    let mapper = AssignmentMapper::new(&request.jobs, &request.workers, &coordinates);
    let far_jobs = mapper.far_jobs();

    let matrix = CostMatrixBuilder::from_settings(source, settings)
        .build(&coordinates.combined())
        .await?;

    let time_limit = request
        .time_limit_seconds
        .map(Duration::from_secs)
        .unwrap_or(settings.solver_time_limit);
    let solver = RouteSolver::new(SolverParams::default().with_time_limit(time_limit));
    let (num_workers, num_jobs) = (coordinates.depots.len(), coordinates.jobs.len());

    info!("Running solver with {:?} time limit", time_limit);
    let (solution, statistics) = tokio::task::spawn_blocking(move || {
        solver.solve_with_statistics(&matrix, num_workers, num_jobs)
    })
    .await
    .map_err(|e| OptimizeError::Internal(format!("solver task failed: {e}")))??;

    let (routes, warnings) = mapper.map(&solution, &far_jobs);
    let jobs_assigned = solution.jobs_assigned();

    info!(
        "Total jobs assigned: {}/{}",
        jobs_assigned,
        request.jobs.len()
    );

    let response = OptimizationResponse {
        routes,
        warnings,
        metadata: ResponseMetadata {
            num_jobs: request.jobs.len(),
            num_workers: request.workers.len(),
            jobs_assigned,
            timestamp: Utc::now(),
        },
    };

    Ok((response, statistics))
}
