//! Tank with a linear outlet resistance.
//!
//!   dh/dt = (q_in - k_out * h) / area
//!
//! With constant inflow the level has the closed form
//! `h(t) = q_in/k_out + (h0 - q_in/k_out) * exp(-k_out * t / area)`.

use ts_core::{ControlMap, SignalMap, StateMap};
use ts_model::ModelDefinition;

use crate::error::DynamicsResult;
use crate::plugin::{DynamicsPlugin, require_non_negative, require_positive, state_value};
use crate::tank::{LEVEL, LEVEL_SIGNAL};

/// Control key overriding the `q_in` parameter.
pub const INFLOW_TARGET: &str = "inflow";

#[derive(Debug, Clone, Copy, Default)]
pub struct LinearTankPlugin;

impl LinearTankPlugin {
    fn params(model: &ModelDefinition) -> (f64, f64, f64) {
        (
            model.parameter("area", 10.0),
            model.parameter("k_out", 0.5),
            model.parameter("q_in", 0.0),
        )
    }
}

impl DynamicsPlugin for LinearTankPlugin {
    fn model_type(&self) -> &'static str {
        "linear_tank"
    }

    fn validate(&self, model: &ModelDefinition) -> DynamicsResult<()> {
        let (area, k_out, _) = Self::params(model);
        require_positive("area", area)?;
        require_non_negative("k_out", k_out)
    }

    fn initial_state(&self, model: &ModelDefinition) -> DynamicsResult<StateMap> {
        Ok(StateMap::from([(
            LEVEL.to_string(),
            model.initial("level", 5.0),
        )]))
    }

    fn derivatives(
        &self,
        _t: f64,
        state: &StateMap,
        control: &ControlMap,
        model: &ModelDefinition,
    ) -> DynamicsResult<StateMap> {
        let (area, k_out, q_in) = Self::params(model);
        let q_in = control.get(INFLOW_TARGET).copied().unwrap_or(q_in);
        let h = state_value(state, LEVEL)?;

        let mut dh_dt = (q_in - k_out * h) / area;
        if h <= 0.0 && dh_dt < 0.0 {
            dh_dt = 0.0;
        }
        Ok(StateMap::from([(LEVEL.to_string(), dh_dt)]))
    }

    fn signals(&self, state: &StateMap) -> DynamicsResult<SignalMap> {
        Ok(SignalMap::from([(
            LEVEL_SIGNAL.to_string(),
            state_value(state, LEVEL)?,
        )]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draining_rate_is_proportional_to_level() {
        let model = ModelDefinition::new("lt", "linear_tank")
            .with_parameter("area", 2.0)
            .with_parameter("k_out", 0.4);
        let state = StateMap::from([(LEVEL.to_string(), 5.0)]);
        let d = LinearTankPlugin
            .derivatives(0.0, &state, &ControlMap::new(), &model)
            .unwrap();
        assert!((d[LEVEL] + 1.0).abs() < 1e-12);
    }

    #[test]
    fn inflow_control_overrides_parameter() {
        let model = ModelDefinition::new("lt", "linear_tank").with_parameter("k_out", 0.0);
        let state = StateMap::from([(LEVEL.to_string(), 1.0)]);
        let control = ControlMap::from([(INFLOW_TARGET.to_string(), 5.0)]);
        let d = LinearTankPlugin
            .derivatives(0.0, &state, &control, &model)
            .unwrap();
        assert!((d[LEVEL] - 0.5).abs() < 1e-12);
    }
}
