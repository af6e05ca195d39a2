//! Error types for attack registration and application.

use thiserror::Error;

use crate::record::AttackKind;

/// Result type for attack operations.
pub type AttackResult<T> = Result<T, AttackError>;

/// Errors raised while validating or applying attacks.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AttackError {
    /// A kind-specific required parameter is absent.
    #[error("Attack '{attack_id}' ({kind}) requires parameter '{name}'")]
    MissingParameter {
        attack_id: String,
        kind: AttackKind,
        name: &'static str,
    },

    /// A parameter is present but unusable.
    #[error("Attack '{attack_id}': invalid parameter '{name}' ({reason})")]
    InvalidParameter {
        attack_id: String,
        name: &'static str,
        reason: String,
    },

    /// Trigger time or duration is out of range.
    #[error("Attack '{attack_id}': invalid timing ({reason})")]
    InvalidTiming { attack_id: String, reason: String },

    /// Identifier or target signal is empty.
    #[error("Attack '{attack_id}': {what} must not be empty")]
    Empty { attack_id: String, what: &'static str },

    /// An attack with the same identifier is already registered.
    #[error("Attack '{attack_id}' is already registered")]
    DuplicateId { attack_id: String },

    /// No attack with this identifier is registered.
    #[error("Attack '{attack_id}' is not registered")]
    UnknownAttack { attack_id: String },

    /// A handler produced a value that cannot be observed.
    #[error("Attack '{attack_id}' produced non-finite value {value}")]
    NonFiniteOutput { attack_id: String, value: f64 },
}
