use std::env;
use std::time::Duration;

use dotenv::dotenv;
use tracing::{info, warn};

use crate::domain::types::Location;
use crate::error::OptimizeError;

pub mod constant {
    /// Cost written for unreachable or unknown cells. Anything at or above it is unusable.
    pub const SENTINEL_COST: u64 = 999_999;
    /// Origin x destination pairs accepted by one Distance Matrix call.
    pub const MAX_ELEMENTS: usize = 100;
    pub const MAX_CONCURRENT_REQUESTS: usize = 4;
    pub const BALANCE_COEFFICIENT: u64 = 100;
    pub const GLS_LAMBDA_COEFFICIENT: f64 = 0.1;
    pub const TIME_LIMIT_SECS: u64 = 5;
    pub const FAR_JOB_THRESHOLD_KM: f64 = 200.0;
    pub const EARTH_RADIUS_KM: f64 = 6371.0;
    /// Boston City Hall.
    pub const DEFAULT_DEPOT: (f64, f64) = (42.3601, -71.0589);
    pub const GEOCODE_CACHE_TTL_SECS: i64 = 30 * 24 * 60 * 60;
    pub const DATABASE_URL: &str = "sqlite:route_optimizer.sqlite";
    pub const STRAIGHT_LINE_SPEED_KMH: f64 = 40.0;
}

/// Process-level settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub google_api_key: Option<String>,
    pub database_url: String,
    pub matrix_max_elements: usize,
    pub matrix_max_concurrent_requests: usize,
    pub solver_time_limit: Duration,
    pub geocode_cache_ttl_secs: i64,
    pub default_depot: Location,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            google_api_key: None,
            database_url: constant::DATABASE_URL.to_string(),
            matrix_max_elements: constant::MAX_ELEMENTS,
            matrix_max_concurrent_requests: constant::MAX_CONCURRENT_REQUESTS,
            solver_time_limit: Duration::from_secs(constant::TIME_LIMIT_SECS),
            geocode_cache_ttl_secs: constant::GEOCODE_CACHE_TTL_SECS,
            default_depot: Location::new(constant::DEFAULT_DEPOT.0, constant::DEFAULT_DEPOT.1),
        }
    }
}

impl Settings {
    /// Loads `.env` (if present) and reads settings from the environment.
    pub fn from_env() -> Result<Self, OptimizeError> {
        dotenv().ok();
        let settings = Self::from_lookup(|key| env::var(key).ok())?;

        if settings.google_api_key.is_some() {
            info!("Loaded Google Maps API key from environment");
        } else {
            warn!("GOOGLE_MAPS_API_KEY not set, only offline sources are available");
        }

        Ok(settings)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, OptimizeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let google_api_key = lookup("GOOGLE_MAPS_API_KEY").filter(|key| !key.trim().is_empty());
        let database_url = lookup("DATABASE_URL").unwrap_or(defaults.database_url);

        let matrix_max_elements: usize =
            parse_or(&lookup, "MATRIX_MAX_ELEMENTS", defaults.matrix_max_elements)?;
        if matrix_max_elements == 0 {
            return Err(OptimizeError::Config("MATRIX_MAX_ELEMENTS must be positive".into()));
        }

        let matrix_max_concurrent_requests: usize = parse_or(
            &lookup,
            "MATRIX_MAX_CONCURRENT_REQUESTS",
            defaults.matrix_max_concurrent_requests,
        )?;
        if matrix_max_concurrent_requests == 0 {
            return Err(OptimizeError::Config(
                "MATRIX_MAX_CONCURRENT_REQUESTS must be positive".into(),
            ));
        }

        let time_limit_secs: u64 =
            parse_or(&lookup, "SOLVER_TIME_LIMIT_SECS", constant::TIME_LIMIT_SECS)?;
        if time_limit_secs == 0 {
            return Err(OptimizeError::Config("SOLVER_TIME_LIMIT_SECS must be positive".into()));
        }

        let geocode_cache_ttl_secs: i64 =
            parse_or(&lookup, "GEOCODE_CACHE_TTL_SECS", defaults.geocode_cache_ttl_secs)?;
        if geocode_cache_ttl_secs <= 0 {
            return Err(OptimizeError::Config("GEOCODE_CACHE_TTL_SECS must be positive".into()));
        }

        Ok(Self {
            google_api_key,
            database_url,
            matrix_max_elements,
            matrix_max_concurrent_requests,
            solver_time_limit: Duration::from_secs(time_limit_secs),
            geocode_cache_ttl_secs,
            default_depot: defaults.default_depot,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, OptimizeError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| OptimizeError::Config(format!("{key} has an invalid value: {raw:?}"))),
        None => Ok(default),
    }
}
