//! ts-results: run manifests and telemetry storage.

pub mod hash;
pub mod sink;
pub mod store;
pub mod types;

pub use hash::compute_fingerprint;
pub use sink::JsonlTelemetrySink;
pub use store::RunStore;
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("Invalid run id '{run_id}'")]
    InvalidRunId { run_id: String },
}
