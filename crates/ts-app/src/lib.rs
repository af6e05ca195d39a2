//! Shared application service layer for twinsec.
//!
//! Front ends (the CLI, an API server, a UI) go through this crate to load
//! scenarios, execute runs, and query stored telemetry.

pub mod error;
pub mod progress;
pub mod query;
pub mod run_service;
pub mod scenario_service;

pub use error::{AppError, AppResult};
pub use progress::{RunProgressEvent, RunStage, SimulationProgress};
pub use query::{
    RunSummary, SeriesKind, SignalSummary, extract_signal_series, get_run_summary,
    list_signal_names,
};
pub use run_service::{
    PROGRESS_BUFFER, RunHandle, RunOptions, RunRequest, RunResponse, execute_run,
    execute_run_with_progress, list_runs, load_run, spawn_run,
};
pub use scenario_service::{
    ScenarioSummary, list_model_types, load_attack_plan, load_scenario, save_scenario,
    summarize_scenario,
};
