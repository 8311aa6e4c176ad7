use std::f64::consts::PI;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::domain::types::Location;
use crate::setup::init_types::{JobInput, OptimizeRequest, WorkerInput};

const KM_PER_DEGREE: f64 = 111.195;

/// Uniform random point within `radius_km` of `center`.
fn random_point(rng: &mut ChaCha8Rng, center: Location, radius_km: f64) -> Location {
    let distance = radius_km * rng.gen::<f64>().sqrt();
    let bearing = rng.gen_range(0.0..2.0 * PI);

    let dlat = distance * bearing.cos() / KM_PER_DEGREE;
    let dlng = distance * bearing.sin() / (KM_PER_DEGREE * center.lat.to_radians().cos());

    Location::new(
        (center.lat + dlat).clamp(-90.0, 90.0),
        (center.lng + dlng).clamp(-180.0, 180.0),
    )
}

/// Generates a reproducible request: depots close to `center`, jobs anywhere
/// within `radius_km`.
pub fn generate_random_request(
    num_workers: usize,
    num_jobs: usize,
    center: Location,
    radius_km: f64,
    seed: u64,
) -> OptimizeRequest {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let workers: Vec<WorkerInput> = (1..=num_workers)
        .map(|n| {
            let depot = random_point(&mut rng, center, radius_km / 4.0);
            WorkerInput {
                id: format!("worker-{n}"),
                name: Some(format!("Worker {n}")),
                depot_address: None,
                depot_lat: Some(depot.lat),
                depot_lng: Some(depot.lng),
            }
        })
        .collect();

    let jobs: Vec<JobInput> = (1..=num_jobs)
        .map(|n| {
            let location = random_point(&mut rng, center, radius_km);
            JobInput {
                id: format!("job-{n:03}"),
                address: None,
                latitude: Some(location.lat),
                longitude: Some(location.lng),
            }
        })
        .collect();

    info!(
        "Generated {} workers and {} jobs around ({}, {}) with seed {}",
        num_workers, num_jobs, center.lat, center.lng, seed
    );

    OptimizeRequest {
        jobs,
        workers,
        time_limit_seconds: None,
    }
}
