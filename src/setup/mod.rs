pub mod init;
pub mod init_types;

pub use init::{
    optimize_routes, optimize_routes_with_statistics, resolve_locations, validate_request,
};
pub use init_types::{JobInput, OptimizationResponse, OptimizeRequest, WorkerInput};
