//! Error types for controllers.

use thiserror::Error;

pub type ControlResult<T> = Result<T, ControlError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument provided to a control function.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// The controlled variable is not present in the observed signals.
    #[error("Controlled variable '{name}' not found in observed signals")]
    MissingSignal { name: String },

    #[error("Non-finite controller output for {name}: {value}")]
    NonFinite { name: String, value: f64 },

    #[error("{controller} controller does not support {operation}")]
    Unsupported {
        controller: &'static str,
        operation: &'static str,
    },
}
