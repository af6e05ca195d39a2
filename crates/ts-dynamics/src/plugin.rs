//! DynamicsPlugin trait for pluggable process models.

use std::fmt;

use ts_core::{ControlMap, SignalMap, StateMap};
use ts_model::ModelDefinition;

use crate::error::{DynamicsError, DynamicsResult};

/// Trait for process models driven by the simulator.
///
/// A DynamicsPlugin must implement:
/// - Initial state derived from the model's parameters and initial conditions
/// - Derivatives dx/dt = f(t, x, u) with one entry per state variable
/// - Projection from state to namespaced sensor signals
///
/// All three are pure: plugins hold no per-run state, so one instance can be
/// shared by every run in the process.
pub trait DynamicsPlugin: Send + Sync + fmt::Debug {
    /// Model-type tag this plugin is registered under.
    fn model_type(&self) -> &'static str;

    /// Reject parameter sets the dynamics cannot run with.
    fn validate(&self, _model: &ModelDefinition) -> DynamicsResult<()> {
        Ok(())
    }

    /// Return the state at t=0.
    fn initial_state(&self, model: &ModelDefinition) -> DynamicsResult<StateMap>;

    /// Compute the state derivative.
    ///
    /// Physical limits are enforced by zeroing a derivative at its boundary,
    /// never by clamping the state value itself.
    fn derivatives(
        &self,
        t: f64,
        state: &StateMap,
        control: &ControlMap,
        model: &ModelDefinition,
    ) -> DynamicsResult<StateMap>;

    /// Observable signals, named `<component>.<measurement>`.
    fn signals(&self, state: &StateMap) -> DynamicsResult<SignalMap>;
}

/// Look up a state variable.
pub(crate) fn state_value(state: &StateMap, name: &str) -> DynamicsResult<f64> {
    state
        .get(name)
        .copied()
        .ok_or_else(|| DynamicsError::MissingState {
            name: name.to_string(),
        })
}

pub(crate) fn require_positive(name: &'static str, value: f64) -> DynamicsResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DynamicsError::InvalidParameter {
            name,
            value,
            reason: "must be positive",
        })
    }
}

pub(crate) fn require_non_negative(name: &'static str, value: f64) -> DynamicsResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(DynamicsError::InvalidParameter {
            name,
            value,
            reason: "must be non-negative",
        })
    }
}
