//! Per-step telemetry record and run snapshots.

use serde::{Deserialize, Serialize};
use ts_attacks::ActiveAttack;
use ts_core::{ControlMap, SignalMap, StateMap};

/// One record per simulation step, emitted to the telemetry sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Simulation time at the start of the step (seconds).
    pub timestamp: f64,
    /// Ground-truth signals computed from the plant state.
    pub real_signals: SignalMap,
    /// Signals after attack injection, as seen by the controller.
    pub observed_signals: SignalMap,
    pub control_actions: ControlMap,
    /// Attacks active during this step, in registration order.
    pub active_attacks: Vec<ActiveAttack>,
}

impl TelemetryRecord {
    /// `observed - real` for a signal present in both maps.
    pub fn deviation(&self, signal: &str) -> Option<f64> {
        let real = self.real_signals.get(signal)?;
        let observed = self.observed_signals.get(signal)?;
        Some(observed - real)
    }

    pub fn is_attacked(&self, signal: &str) -> bool {
        self.active_attacks.iter().any(|a| a.target_signal == signal)
    }
}

/// Current simulation state of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub t: f64,
    pub state: StateMap,
    pub signals: SignalMap,
    pub control: ControlMap,
}
