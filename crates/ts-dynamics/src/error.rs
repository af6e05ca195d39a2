//! Error types for dynamics plugins.

use thiserror::Error;

/// Errors raised by plugins and the plugin registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DynamicsError {
    #[error("No dynamics plugin registered for model type '{model_type}' (available: {})", .available.join(", "))]
    UnknownModelType {
        model_type: String,
        available: Vec<String>,
    },

    #[error("Plugin already registered for model type '{model_type}'")]
    DuplicatePlugin { model_type: String },

    #[error("Missing state variable: {name}")]
    MissingState { name: String },

    #[error("Invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
}

pub type DynamicsResult<T> = Result<T, DynamicsError>;
