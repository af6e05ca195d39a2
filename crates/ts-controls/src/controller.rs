//! Controller trait and selection from a model definition.

use std::fmt;

use tracing::warn;
use ts_core::{ControlMap, SignalMap};
use ts_model::{ControllerKind, ModelDefinition};

use crate::error::{ControlError, ControlResult};
use crate::manual::ManualController;
use crate::pid::{PidConfig, PidController};

/// Maps observed signals to manipulated-variable targets.
///
/// Controllers are stateful across steps and owned by exactly one run.
pub trait Controller: Send + fmt::Debug {
    /// Short name for logs and manifests.
    fn kind(&self) -> &'static str;

    /// Compute control actions for one step of length `dt`.
    fn compute(&mut self, observed: &SignalMap, dt: f64) -> ControlResult<ControlMap>;

    /// Clear accumulated state (integral, previous error).
    fn reset(&mut self);

    /// Retarget a closed-loop controller. Accumulated state is kept.
    fn set_setpoint(&mut self, _setpoint: f64) -> ControlResult<()> {
        Err(ControlError::Unsupported {
            controller: self.kind(),
            operation: "setpoint changes",
        })
    }

    /// Signals this controller reads.
    fn inputs(&self) -> Vec<&str> {
        Vec::new()
    }
}

/// Select the controller configured for `model`.
///
/// No controller section, or one whose type is not implemented, yields a
/// `ManualController` over `control.manual_setpoints`.
pub fn build_controller(model: &ModelDefinition) -> ControlResult<Box<dyn Controller>> {
    let manual = || -> Box<dyn Controller> {
        Box::new(ManualController::new(model.control.manual_setpoints.clone()))
    };
    match &model.controller {
        None => Ok(manual()),
        Some(cfg) => match cfg.kind {
            ControllerKind::Pid => Ok(Box::new(PidController::new(PidConfig::from(cfg))?)),
            ControllerKind::Unsupported => {
                warn!(
                    model = %model.name,
                    "unsupported controller type, falling back to manual setpoints"
                );
                Ok(manual())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ts_model::ControllerConfig;

    #[test]
    fn no_controller_is_manual() {
        let model = ModelDefinition::new("m", "tank").with_manual_setpoint("valve_in_target", 0.3);
        let mut c = build_controller(&model).unwrap();
        assert_eq!(c.kind(), "manual");
        let out = c.compute(&SignalMap::new(), 0.1).unwrap();
        assert_eq!(out["valve_in_target"], 0.3);
    }

    #[test]
    fn pid_is_selected() {
        let model = ModelDefinition::new("m", "tank").with_controller(ControllerConfig::default());
        let c = build_controller(&model).unwrap();
        assert_eq!(c.kind(), "pid");
        assert_eq!(c.inputs(), vec!["tank.level_sensor"]);
    }

    #[test]
    fn manual_controller_has_no_setpoint() {
        let model = ModelDefinition::new("m", "tank");
        let mut c = build_controller(&model).unwrap();
        assert!(matches!(
            c.set_setpoint(1.0),
            Err(ControlError::Unsupported {
                controller: "manual",
                ..
            })
        ));
    }

    #[test]
    fn unsupported_falls_back_to_manual() {
        let cfg = ControllerConfig {
            kind: ControllerKind::Unsupported,
            ..ControllerConfig::default()
        };
        let model = ModelDefinition::new("m", "tank").with_controller(cfg);
        assert_eq!(build_controller(&model).unwrap().kind(), "manual");
    }

    #[test]
    fn invalid_bounds_are_rejected() {
        let cfg = ControllerConfig {
            output_min: 1.0,
            output_max: 0.0,
            ..ControllerConfig::default()
        };
        let model = ModelDefinition::new("m", "tank").with_controller(cfg);
        assert!(build_controller(&model).is_err());
    }
}
