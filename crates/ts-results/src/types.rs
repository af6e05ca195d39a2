//! Result data types.

use serde::{Deserialize, Serialize};
use ts_sim::RunStatus;

pub type RunId = String;

/// Metadata stored next to a run's telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub scenario_name: String,
    pub model_name: String,
    pub model_type: String,
    pub method: String,
    pub dt: f64,
    pub duration: f64,
    pub seed: u64,
    pub attack_count: usize,
    pub status: RunStatus,
    pub steps: u64,
    pub total_steps: u64,
    pub final_time: f64,
    #[serde(default)]
    pub attack_failures: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// RFC 3339 creation time.
    pub timestamp: String,
    pub fingerprint: String,
    pub engine_version: String,
}
