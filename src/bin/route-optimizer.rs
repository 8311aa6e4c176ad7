use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::*;
use dotenv::dotenv;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use route_optimizer::config::Settings;
use route_optimizer::database::sqlx::db_connection;
use route_optimizer::distance::providers::{
    GoogleDistanceMatrix, StraightLineSource, TravelCostSource,
};
use route_optimizer::fixtures::data_generator::generate_random_request;
use route_optimizer::geocoding::{
    geocode_addresses, CachedGeocoder, DisabledGeocoder, Geocoder, GoogleGeocoder,
};
use route_optimizer::setup::{
    optimize_routes_with_statistics, OptimizationResponse, OptimizeRequest,
};
use route_optimizer::OptimizeError;

#[derive(Parser)]
#[clap(author, version, about = "Balanced multi-depot route optimizer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize a JSON request and print the response
    Optimize {
        request: PathBuf,

        /// Use straight-line travel costs instead of the Google API
        #[arg(long)]
        offline: bool,

        /// Write the best-so-far objective trace as CSV
        #[arg(long)]
        trace: Option<PathBuf>,
    },
    /// Geocode one or more addresses
    Geocode {
        #[arg(required = true)]
        addresses: Vec<String>,
    },
    /// Solve a generated request with straight-line costs
    Demo {
        #[arg(short, long, default_value_t = 3)]
        workers: usize,

        #[arg(short, long, default_value_t = 25)]
        jobs: usize,

        #[arg(short, long, default_value_t = 42)]
        seed: u64,
    },
}

/// Initialize tracing and environment
fn init_tracing_and_env() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
    Ok(())
}

async fn build_geocoder(settings: &Settings) -> Box<dyn Geocoder> {
    let Some(api_key) = settings.google_api_key.as_deref() else {
        return Box::new(DisabledGeocoder);
    };

    let google = GoogleGeocoder::new(api_key);
    match db_connection(&settings.database_url).await {
        Ok(pool) => Box::new(CachedGeocoder::new(google, pool, settings.geocode_cache_ttl_secs)),
        Err(e) => {
            warn!("Geocode cache unavailable, continuing without it: {}", e);
            Box::new(google)
        }
    }
}

fn build_source(settings: &Settings, offline: bool) -> Box<dyn TravelCostSource> {
    match (offline, settings.google_api_key.as_deref()) {
        (false, Some(api_key)) => Box::new(GoogleDistanceMatrix::new(api_key)),
        (false, None) => {
            warn!("GOOGLE_MAPS_API_KEY not set, falling back to straight-line costs");
            Box::new(StraightLineSource::default())
        }
        (true, _) => Box::new(StraightLineSource::default()),
    }
}

fn print_summary(response: &OptimizationResponse) {
    for route in response.routes.values() {
        let line = format!(
            "{:<16} {:>3} jobs {:>8.1} km {:>6.0} min",
            route.worker_name,
            route.assignments.len(),
            route.total_distance_meters as f64 / 1000.0,
            route.total_duration_seconds as f64 / 60.0
        );
        if route.assignments.is_empty() {
            eprintln!("{}", line.dimmed());
        } else {
            eprintln!("{}", line.green());
        }
    }

    for warning in &response.warnings {
        eprintln!("{}", warning.message.yellow().bold());
        for detail in &warning.details {
            eprintln!("  - {}", detail.yellow());
        }
    }

    eprintln!(
        "{}",
        format!(
            "Assigned {}/{} jobs to {} workers",
            response.metadata.jobs_assigned,
            response.metadata.num_jobs,
            response.metadata.num_workers
        )
        .bold()
    );
}

async fn optimize(
    request: OptimizeRequest,
    settings: &Settings,
    offline: bool,
    trace: Option<PathBuf>,
) -> Result<(), OptimizeError> {
    let source = build_source(settings, offline);
    let geocoder = build_geocoder(settings).await;

    let (response, statistics) =
        optimize_routes_with_statistics(&request, source.as_ref(), geocoder.as_ref(), settings)
            .await?;

    if let Some(path) = trace {
        statistics
            .save_to_csv(&path)
            .map_err(|e| OptimizeError::Internal(format!("could not write trace: {e}")))?;
        info!("Search trace written to {}", path.display());
    }

    let json = serde_json::to_string_pretty(&response)
        .map_err(|e| OptimizeError::Internal(e.to_string()))?;
    println!("{json}");
    print_summary(&response);

    Ok(())
}

async fn run(cli: Cli) -> Result<(), OptimizeError> {
    let settings = Settings::from_env()?;

    match cli.command {
        Commands::Optimize {
            request,
            offline,
            trace,
        } => {
            let raw = fs::read_to_string(&request).map_err(|e| {
                OptimizeError::Validation(format!("cannot read {}: {e}", request.display()))
            })?;
            let request: OptimizeRequest = serde_json::from_str(&raw)
                .map_err(|e| OptimizeError::Validation(format!("invalid request JSON: {e}")))?;
            optimize(request, &settings, offline, trace).await
        }
        Commands::Geocode { addresses } => {
            let geocoder = build_geocoder(&settings).await;
            let results = geocode_addresses(geocoder.as_ref(), &addresses).await;
            let json = serde_json::to_string_pretty(&results)
                .map_err(|e| OptimizeError::Internal(e.to_string()))?;
            println!("{json}");
            Ok(())
        }
        Commands::Demo {
            workers,
            jobs,
            seed,
        } => {
            let request =
                generate_random_request(workers, jobs, settings.default_depot, 20.0, seed);
            optimize(request, &settings, true, None).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = init_tracing_and_env() {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", format!("[{}]", e.kind()).red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
