use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mapping::assignment::{Warning, WorkerRoute};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobInput {
    pub id: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerInput {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub depot_address: Option<String>,
    #[serde(default)]
    pub depot_lat: Option<f64>,
    #[serde(default)]
    pub depot_lng: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizeRequest {
    pub jobs: Vec<JobInput>,
    pub workers: Vec<WorkerInput>,
    #[serde(default)]
    pub time_limit_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseMetadata {
    pub num_jobs: usize,
    pub num_workers: usize,
    pub jobs_assigned: usize,
    pub timestamp: DateTime<Utc>,
}

/// Routes keyed by worker id, plus diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResponse {
    pub routes: BTreeMap<String, WorkerRoute>,
    pub warnings: Vec<Warning>,
    pub metadata: ResponseMetadata,
}
