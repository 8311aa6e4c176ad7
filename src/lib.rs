pub mod config;
pub mod database;
pub mod distance;
pub mod domain;
pub mod error;
pub mod evaluation;
pub mod fixtures;
pub mod geocoding;
pub mod mapping;
pub mod setup;
pub mod solver;
pub mod utils;

pub use error::OptimizeError;
