//! PID controller with anti-windup.
//!
//! Output:
//!   e = setpoint - measured
//!   u = Kp*e + Ki*integral(e dt) + Kd*(e - e_prev)/dt
//!
//! The output is clamped to `[out_min, out_max]`. When it saturates, the
//! integral contribution of the current step is reverted so the accumulator
//! does not wind up while the actuator is at a limit.

use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_core::{ControlMap, SignalMap};
use ts_model::ControllerConfig;

use crate::controller::Controller;
use crate::error::{ControlError, ControlResult};

/// PID configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PidConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub setpoint: f64,
    pub out_min: f64,
    pub out_max: f64,
    /// Observed signal used as the process variable.
    pub controlled_variable: String,
    /// Control-map key the output is written to.
    pub manipulated_variable: String,
}

impl From<&ControllerConfig> for PidConfig {
    fn from(cfg: &ControllerConfig) -> Self {
        Self {
            kp: cfg.kp,
            ki: cfg.ki,
            kd: cfg.kd,
            setpoint: cfg.setpoint,
            out_min: cfg.output_min,
            out_max: cfg.output_max,
            controlled_variable: cfg.controlled_variable.clone(),
            manipulated_variable: cfg.manipulated_variable.clone(),
        }
    }
}

impl PidConfig {
    /// Pure update: next state and the individual terms for one sample.
    pub fn update(&self, state: &PidState, measured: f64, dt: f64) -> (PidState, PidTerms) {
        let error = self.setpoint - measured;

        let p = self.kp * error;

        let mut integral = state.integral + error * dt;
        let i = self.ki * integral;

        let d = if dt > 0.0 {
            self.kd * (error - state.prev_error) / dt
        } else {
            0.0
        };

        let raw = p + i + d;
        let output = raw.clamp(self.out_min, self.out_max);
        let saturated = output != raw;
        if saturated {
            // Anti-windup
            integral -= error * dt;
        }

        let next = PidState {
            integral,
            prev_error: error,
        };
        let terms = PidTerms {
            error,
            p,
            i,
            d,
            output,
            saturated,
        };
        (next, terms)
    }
}

/// PID accumulator state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PidState {
    pub integral: f64,
    pub prev_error: f64,
}

/// Breakdown of one controller evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidTerms {
    pub error: f64,
    pub p: f64,
    pub i: f64,
    pub d: f64,
    pub output: f64,
    pub saturated: bool,
}

/// Stateful PID bound to one controlled/manipulated variable pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PidController {
    config: PidConfig,
    state: PidState,
}

impl PidController {
    pub fn new(config: PidConfig) -> ControlResult<Self> {
        if !(config.out_min < config.out_max) {
            return Err(ControlError::InvalidArg {
                what: "out_min must be less than out_max",
            });
        }
        if ![config.kp, config.ki, config.kd, config.setpoint]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(ControlError::InvalidArg {
                what: "gains and setpoint must be finite",
            });
        }
        if config.controlled_variable.is_empty() || config.manipulated_variable.is_empty() {
            return Err(ControlError::InvalidArg {
                what: "controlled and manipulated variables must be named",
            });
        }
        Ok(Self {
            config,
            state: PidState::default(),
        })
    }

    pub fn config(&self) -> &PidConfig {
        &self.config
    }

    pub fn state(&self) -> PidState {
        self.state
    }

    pub fn setpoint(&self) -> f64 {
        self.config.setpoint
    }

    /// Advance the controller with one measurement.
    pub fn update(&mut self, measured: f64, dt: f64) -> PidTerms {
        let (next, terms) = self.config.update(&self.state, measured, dt);
        self.state = next;
        terms
    }
}

impl Controller for PidController {
    fn kind(&self) -> &'static str {
        "pid"
    }

    fn compute(&mut self, observed: &SignalMap, dt: f64) -> ControlResult<ControlMap> {
        let name = &self.config.controlled_variable;
        let measured = observed
            .get(name)
            .copied()
            .ok_or_else(|| ControlError::MissingSignal { name: name.clone() })?;

        let terms = self.update(measured, dt);
        if !terms.output.is_finite() {
            return Err(ControlError::NonFinite {
                name: self.config.manipulated_variable.clone(),
                value: terms.output,
            });
        }
        debug!(
            measured,
            error = terms.error,
            p = terms.p,
            i = terms.i,
            d = terms.d,
            output = terms.output,
            saturated = terms.saturated,
            "pid update"
        );

        let mut out = ControlMap::new();
        out.insert(self.config.manipulated_variable.clone(), terms.output);
        Ok(out)
    }

    fn reset(&mut self) {
        self.state = PidState::default();
    }

    fn set_setpoint(&mut self, setpoint: f64) -> ControlResult<()> {
        if !setpoint.is_finite() {
            return Err(ControlError::InvalidArg {
                what: "setpoint must be finite",
            });
        }
        self.config.setpoint = setpoint;
        Ok(())
    }

    fn inputs(&self) -> Vec<&str> {
        vec![self.config.controlled_variable.as_str()]
    }
}
