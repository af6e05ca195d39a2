//! Error types for the ts-app service layer.

use std::path::PathBuf;

/// Unified error for all front ends.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to load scenario {path}: {message}")]
    ScenarioLoad { path: PathBuf, message: String },

    #[error("Failed to save scenario {path}: {message}")]
    ScenarioSave { path: PathBuf, message: String },

    #[error("Scenario validation failed: {0}")]
    Validation(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Run worker error: {0}")]
    Worker(String),
}

/// Result type for ts-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<ts_model::ValidationError> for AppError {
    fn from(err: ts_model::ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<ts_dynamics::DynamicsError> for AppError {
    fn from(err: ts_dynamics::DynamicsError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<ts_sim::SimError> for AppError {
    fn from(err: ts_sim::SimError) -> Self {
        AppError::Simulation(err.to_string())
    }
}

impl From<ts_results::ResultsError> for AppError {
    fn from(err: ts_results::ResultsError) -> Self {
        match err {
            ts_results::ResultsError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            other => AppError::Results(other.to_string()),
        }
    }
}
