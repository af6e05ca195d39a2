//! Scenario and model definition schema.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_attacks::AttackRecord;

pub const LATEST_VERSION: u32 = 1;

/// A runnable scenario: one model plus the attacks scripted against it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    #[serde(default = "default_version")]
    pub version: u32,
    pub name: String,
    pub model: ModelDefinition,
    #[serde(default)]
    pub attacks: Vec<AttackRecord>,
}

/// Attacks stored separately from the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AttackPlan {
    #[serde(default)]
    pub attacks: Vec<AttackRecord>,
}

/// Immutable description of the simulated process for one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelDefinition {
    pub name: String,
    /// Selects the dynamics plugin.
    #[serde(rename = "type", default = "default_model_type")]
    pub model_type: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
    #[serde(default)]
    pub initial_conditions: BTreeMap<String, f64>,
    #[serde(default)]
    pub simulation: SolverConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<ControllerConfig>,
    #[serde(default)]
    pub control: ManualControl,
}

impl ModelDefinition {
    pub fn new(name: impl Into<String>, model_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model_type: model_type.into(),
            parameters: BTreeMap::new(),
            initial_conditions: BTreeMap::new(),
            simulation: SolverConfig::default(),
            controller: None,
            control: ManualControl::default(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: f64) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    pub fn with_initial(mut self, name: impl Into<String>, value: f64) -> Self {
        self.initial_conditions.insert(name.into(), value);
        self
    }

    pub fn with_solver(mut self, method: IntegrationMethod, dt: f64, duration: f64) -> Self {
        self.simulation = SolverConfig {
            method,
            dt,
            duration,
        };
        self
    }

    pub fn with_controller(mut self, controller: ControllerConfig) -> Self {
        self.controller = Some(controller);
        self
    }

    pub fn with_manual_setpoint(mut self, name: impl Into<String>, value: f64) -> Self {
        self.control.manual_setpoints.insert(name.into(), value);
        self
    }

    /// Parameter value, or `default` when absent.
    pub fn parameter(&self, name: &str, default: f64) -> f64 {
        self.parameters.get(name).copied().unwrap_or(default)
    }

    /// Initial-condition value, or `default` when absent.
    pub fn initial(&self, name: &str, default: f64) -> f64 {
        self.initial_conditions.get(name).copied().unwrap_or(default)
    }
}

/// Fixed-step integration scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationMethod {
    /// Forward Euler, 1st order, one derivative evaluation per step.
    #[serde(alias = "forward_euler")]
    Euler,
    /// Classical Runge-Kutta, 4th order, four derivative evaluations per step.
    #[default]
    #[serde(alias = "RK4", alias = "runge_kutta")]
    Rk4,
}

impl IntegrationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Euler => "euler",
            Self::Rk4 => "rk4",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default)]
    pub method: IntegrationMethod,
    /// Step size (seconds)
    #[serde(default = "default_dt")]
    pub dt: f64,
    /// Simulated duration (seconds)
    #[serde(default = "default_duration")]
    pub duration: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            method: IntegrationMethod::default(),
            dt: default_dt(),
            duration: default_duration(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerKind {
    #[default]
    Pid,
    /// Any type this engine does not implement; the run falls back to
    /// manual setpoints.
    #[serde(other)]
    Unsupported,
}

/// Closed-loop controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(rename = "type", default)]
    pub kind: ControllerKind,
    #[serde(rename = "Kp", alias = "kp", default = "default_kp")]
    pub kp: f64,
    #[serde(rename = "Ki", alias = "ki", default = "default_ki")]
    pub ki: f64,
    #[serde(rename = "Kd", alias = "kd", default = "default_kd")]
    pub kd: f64,
    #[serde(default)]
    pub setpoint: f64,
    #[serde(default)]
    pub output_min: f64,
    #[serde(default = "default_output_max")]
    pub output_max: f64,
    /// Observed signal fed back to the controller.
    #[serde(default = "default_controlled_variable")]
    pub controlled_variable: String,
    /// Control-map key written by the controller.
    #[serde(default = "default_manipulated_variable")]
    pub manipulated_variable: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            kind: ControllerKind::Pid,
            kp: default_kp(),
            ki: default_ki(),
            kd: default_kd(),
            setpoint: 0.0,
            output_min: 0.0,
            output_max: default_output_max(),
            controlled_variable: default_controlled_variable(),
            manipulated_variable: default_manipulated_variable(),
        }
    }
}

/// Open-loop control targets used when no controller is configured.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ManualControl {
    #[serde(default)]
    pub manual_setpoints: BTreeMap<String, f64>,
}

fn default_version() -> u32 {
    LATEST_VERSION
}

fn default_model_type() -> String {
    "tank".to_string()
}

fn default_dt() -> f64 {
    0.1
}

fn default_duration() -> f64 {
    100.0
}

fn default_kp() -> f64 {
    1.0
}

fn default_ki() -> f64 {
    0.1
}

fn default_kd() -> f64 {
    0.05
}

fn default_output_max() -> f64 {
    1.0
}

fn default_controlled_variable() -> String {
    "tank.level_sensor".to_string()
}

fn default_manipulated_variable() -> String {
    "valve_in_target".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_model_gets_defaults() {
        let model: ModelDefinition = serde_json::from_str(r#"{ "name": "t" }"#).unwrap();
        assert_eq!(model.model_type, "tank");
        assert_eq!(model.simulation.method, IntegrationMethod::Rk4);
        assert_eq!(model.simulation.dt, 0.1);
        assert_eq!(model.simulation.duration, 100.0);
        assert!(model.controller.is_none());
        assert!(model.control.manual_setpoints.is_empty());
    }

    #[test]
    fn controller_uses_gain_field_names() {
        let json = r#"{ "type": "pid", "Kp": 2.0, "Ki": 0.0, "Kd": 0.0, "setpoint": 7.0 }"#;
        let cfg: ControllerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.kind, ControllerKind::Pid);
        assert_eq!(cfg.kp, 2.0);
        assert_eq!(cfg.ki, 0.0);
        assert_eq!(cfg.output_max, 1.0);
        assert_eq!(cfg.controlled_variable, "tank.level_sensor");
        assert_eq!(cfg.manipulated_variable, "valve_in_target");
    }

    #[test]
    fn unknown_controller_type_is_unsupported() {
        let cfg: ControllerConfig = serde_json::from_str(r#"{ "type": "mpc" }"#).unwrap();
        assert_eq!(cfg.kind, ControllerKind::Unsupported);
    }

    #[test]
    fn method_aliases() {
        let m: IntegrationMethod = serde_json::from_str("\"RK4\"").unwrap();
        assert_eq!(m, IntegrationMethod::Rk4);
        let m: IntegrationMethod = serde_json::from_str("\"euler\"").unwrap();
        assert_eq!(m, IntegrationMethod::Euler);
    }

    #[test]
    fn parameter_lookup_with_default() {
        let model = ModelDefinition::new("t", "tank").with_parameter("area", 4.0);
        assert_eq!(model.parameter("area", 10.0), 4.0);
        assert_eq!(model.parameter("Cv_in", 0.05), 0.05);
        assert_eq!(model.initial("level", 5.0), 5.0);
    }
}
