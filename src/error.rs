use thiserror::Error;

/// Errors surfaced to callers of the optimization pipeline.
///
/// Partial data-source failures are not represented here: the matrix builder
/// degrades them to sentinel costs and the pipeline reports them as warnings.
#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Could not resolve location: {0}")]
    Resolution(String),

    #[error("No solution found: {0}")]
    SolverInfeasible(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OptimizeError {
    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            OptimizeError::Validation(_) => "validation_error",
            OptimizeError::Resolution(_) => "resolution_error",
            OptimizeError::SolverInfeasible(_) => "solver_infeasible",
            OptimizeError::Config(_) => "config_error",
            OptimizeError::Database(_) => "database_error",
            OptimizeError::Internal(_) => "internal_error",
        }
    }
}
