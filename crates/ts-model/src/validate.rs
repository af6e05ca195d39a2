//! Structural validation of scenarios and model definitions.
//!
//! Plugin-specific parameter checks live with the plugins; this module only
//! rejects definitions no run could start from.

use std::collections::{BTreeMap, HashSet};

use ts_attacks::{AttackAction, AttackError, AttackRecord};
use ts_core::first_non_finite;

use crate::schema::{ControllerConfig, ControllerKind, LATEST_VERSION, ModelDefinition, Scenario};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing value: {field}")]
    Missing { field: String },

    #[error("Invalid attack: {0}")]
    Attack(#[from] AttackError),

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_scenario(scenario: &Scenario) -> Result<(), ValidationError> {
    if scenario.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: scenario.version,
        });
    }
    validate_model(&scenario.model)?;
    validate_attacks(&scenario.attacks)
}

pub fn validate_model(model: &ModelDefinition) -> Result<(), ValidationError> {
    if model.model_type.trim().is_empty() {
        return Err(ValidationError::Missing {
            field: "model.type".to_string(),
        });
    }

    let solver = &model.simulation;
    positive_finite("simulation.dt", solver.dt)?;
    positive_finite("simulation.duration", solver.duration)?;

    finite_map("parameters", &model.parameters)?;
    finite_map("initial_conditions", &model.initial_conditions)?;
    finite_map("control.manual_setpoints", &model.control.manual_setpoints)?;

    if let Some(controller) = &model.controller {
        validate_controller(controller)?;
    }
    Ok(())
}

pub fn validate_attacks(attacks: &[AttackRecord]) -> Result<(), ValidationError> {
    let mut ids = HashSet::new();
    for attack in attacks {
        if !ids.insert(attack.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: attack.id.clone(),
                context: "attacks".to_string(),
            });
        }
        AttackAction::from_record(attack)?;
    }
    Ok(())
}

fn validate_controller(controller: &ControllerConfig) -> Result<(), ValidationError> {
    // Unsupported controllers are ignored at run time.
    if controller.kind == ControllerKind::Unsupported {
        return Ok(());
    }

    for (field, value) in [
        ("controller.Kp", controller.kp),
        ("controller.Ki", controller.ki),
        ("controller.Kd", controller.kd),
        ("controller.setpoint", controller.setpoint),
        ("controller.output_min", controller.output_min),
        ("controller.output_max", controller.output_max),
    ] {
        if !value.is_finite() {
            return Err(ValidationError::InvalidValue {
                field: field.to_string(),
                value: value.to_string(),
                reason: "must be finite".to_string(),
            });
        }
    }

    if controller.output_min >= controller.output_max {
        return Err(ValidationError::InvalidValue {
            field: "controller.output_min".to_string(),
            value: controller.output_min.to_string(),
            reason: format!(
                "must be less than output_max ({})",
                controller.output_max
            ),
        });
    }

    if controller.controlled_variable.trim().is_empty() {
        return Err(ValidationError::Missing {
            field: "controller.controlled_variable".to_string(),
        });
    }
    if controller.manipulated_variable.trim().is_empty() {
        return Err(ValidationError::Missing {
            field: "controller.manipulated_variable".to_string(),
        });
    }
    Ok(())
}

fn positive_finite(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "must be positive and finite".to_string(),
        })
    }
}

fn finite_map(context: &str, values: &BTreeMap<String, f64>) -> Result<(), ValidationError> {
    match first_non_finite(values) {
        Some((name, value)) => Err(ValidationError::InvalidValue {
            field: format!("{context}.{name}"),
            value: value.to_string(),
            reason: "must be finite".to_string(),
        }),
        None => Ok(()),
    }
}
