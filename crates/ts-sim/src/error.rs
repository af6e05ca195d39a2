//! Error types for simulation operations.
//!
//! Every `SimError` is fatal to the run that produced it. Recoverable
//! per-step faults (attack handler failures) never surface here; they are
//! reported as data in the step outcome.

use thiserror::Error;
use ts_attacks::AttackError;
use ts_controls::ControlError;
use ts_core::CoreError;
use ts_dynamics::DynamicsError;
use ts_model::ValidationError;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Invalid model definition: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Dynamics(#[from] DynamicsError),

    #[error("Controller error: {0}")]
    Control(#[from] ControlError),

    #[error("Attack registration failed: {0}")]
    Attack(#[from] AttackError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Non-finite {what} at t={t}: {value}")]
    NonFinite { what: String, value: f64, t: f64 },

    #[error("Derivative set does not match state variables: {what}")]
    StateMismatch { what: String },

    #[error("Controlled variable '{name}' is not produced by the model (signals: {})", .available.join(", "))]
    UnknownControlledVariable { name: String, available: Vec<String> },

    #[error("Cannot {op} a run in status {status}")]
    InvalidTransition { op: &'static str, status: String },

    #[error("Collaborator error: {message}")]
    Collaborator { message: String },
}

pub type SimResult<T> = Result<T, SimError>;
