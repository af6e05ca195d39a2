//! Water tank with inlet and outlet control valves.
//!
//! Equations:
//!   dh/dt = (Q_in - Q_out) / A
//!   Q_in  = Cv_in  * valve_in  * sqrt(dP_in)
//!   Q_out = Cv_out * valve_out * sqrt(2 g max(h, 0))
//!   d(valve)/dt = (valve_target - valve) / tau_valve
//!
//! State variables: `h`, `valve_in_position`, `valve_out_position`.
//! Control targets: `valve_in_target`, `valve_out_target` (a missing target
//! holds the valve where it is).

use ts_core::{ControlMap, SignalMap, StateMap};
use ts_model::ModelDefinition;

use crate::error::DynamicsResult;
use crate::lag::FirstOrderLag;
use crate::plugin::{DynamicsPlugin, require_non_negative, require_positive, state_value};

/// Gravitational acceleration (m/s^2).
pub const GRAVITY: f64 = 9.81;

pub const LEVEL: &str = "h";
pub const VALVE_IN: &str = "valve_in_position";
pub const VALVE_OUT: &str = "valve_out_position";

pub const VALVE_IN_TARGET: &str = "valve_in_target";
pub const VALVE_OUT_TARGET: &str = "valve_out_target";

pub const LEVEL_SIGNAL: &str = "tank.level_sensor";
pub const VALVE_IN_SIGNAL: &str = "tank.valve_in_position";
pub const VALVE_OUT_SIGNAL: &str = "tank.valve_out_position";

/// Tank parameters with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct TankParams {
    /// Cross-section area (m^2)
    pub area: f64,
    pub cv_in: f64,
    pub cv_out: f64,
    /// Inlet pressure differential (Pa)
    pub dp_in: f64,
    /// Valve time constant (s)
    pub tau_valve: f64,
    /// Optional valve slew limit (1/s)
    pub valve_rate_limit: Option<f64>,
    /// Level at which filling stops (m)
    pub max_height: f64,
}

impl TankParams {
    pub fn from_model(model: &ModelDefinition) -> Self {
        Self {
            area: model.parameter("area", 10.0),
            cv_in: model.parameter("Cv_in", 0.05),
            cv_out: model.parameter("Cv_out", 0.05),
            dp_in: model.parameter("dP_in", 2e5),
            tau_valve: model.parameter("tau_valve", 2.0),
            valve_rate_limit: model.parameters.get("valve_rate_limit").copied(),
            max_height: model.parameter("max_height", 10.0),
        }
    }

    fn valve_lag(&self) -> DynamicsResult<FirstOrderLag> {
        let lag = FirstOrderLag::new(self.tau_valve)?;
        match self.valve_rate_limit {
            Some(limit) => lag.with_rate_limit(limit),
            None => Ok(lag),
        }
    }

    /// Inlet volumetric flow for a valve position (m^3/s).
    pub fn inflow(&self, valve_in: f64) -> f64 {
        self.cv_in * valve_in * self.dp_in.sqrt()
    }

    /// Gravity-driven outlet flow for a valve position and level (m^3/s).
    pub fn outflow(&self, valve_out: f64, level: f64) -> f64 {
        self.cv_out * valve_out * (2.0 * GRAVITY * level.max(0.0)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TankPlugin;

impl DynamicsPlugin for TankPlugin {
    fn model_type(&self) -> &'static str {
        "tank"
    }

    fn validate(&self, model: &ModelDefinition) -> DynamicsResult<()> {
        let p = TankParams::from_model(model);
        require_positive("area", p.area)?;
        require_positive("tau_valve", p.tau_valve)?;
        require_positive("max_height", p.max_height)?;
        require_non_negative("dP_in", p.dp_in)?;
        require_non_negative("Cv_in", p.cv_in)?;
        require_non_negative("Cv_out", p.cv_out)?;
        p.valve_lag()?;
        Ok(())
    }

    fn initial_state(&self, model: &ModelDefinition) -> DynamicsResult<StateMap> {
        let mut state = StateMap::new();
        state.insert(LEVEL.to_string(), model.initial("level", 5.0));
        state.insert(VALVE_IN.to_string(), model.initial(VALVE_IN, 0.5));
        state.insert(VALVE_OUT.to_string(), model.initial(VALVE_OUT, 0.5));
        Ok(state)
    }

    fn derivatives(
        &self,
        _t: f64,
        state: &StateMap,
        control: &ControlMap,
        model: &ModelDefinition,
    ) -> DynamicsResult<StateMap> {
        let p = TankParams::from_model(model);
        let lag = p.valve_lag()?;

        let h = state_value(state, LEVEL)?;
        let valve_in = state_value(state, VALVE_IN)?;
        let valve_out = state_value(state, VALVE_OUT)?;

        let valve_in_target = control.get(VALVE_IN_TARGET).copied().unwrap_or(valve_in);
        let valve_out_target = control.get(VALVE_OUT_TARGET).copied().unwrap_or(valve_out);

        let mut dh_dt = (p.inflow(valve_in) - p.outflow(valve_out, h)) / p.area;

        // Level cannot drop below empty or rise above the rim.
        if h <= 0.0 && dh_dt < 0.0 {
            dh_dt = 0.0;
        }
        if h >= p.max_height && dh_dt > 0.0 {
            dh_dt = 0.0;
        }

        let mut derivatives = StateMap::new();
        derivatives.insert(LEVEL.to_string(), dh_dt);
        derivatives.insert(VALVE_IN.to_string(), lag.derivative(valve_in, valve_in_target));
        derivatives.insert(
            VALVE_OUT.to_string(),
            lag.derivative(valve_out, valve_out_target),
        );
        Ok(derivatives)
    }

    fn signals(&self, state: &StateMap) -> DynamicsResult<SignalMap> {
        let mut signals = SignalMap::new();
        signals.insert(LEVEL_SIGNAL.to_string(), state_value(state, LEVEL)?);
        signals.insert(VALVE_IN_SIGNAL.to_string(), state_value(state, VALVE_IN)?);
        signals.insert(VALVE_OUT_SIGNAL.to_string(), state_value(state, VALVE_OUT)?);
        Ok(signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_model() -> ModelDefinition {
        ModelDefinition::new("tank", "tank")
            .with_parameter("area", 10.0)
            .with_parameter("Cv_in", 0.05)
            .with_parameter("Cv_out", 0.05)
            .with_parameter("dP_in", 2e5)
    }

    fn state(h: f64, valve_in: f64, valve_out: f64) -> StateMap {
        StateMap::from([
            (LEVEL.to_string(), h),
            (VALVE_IN.to_string(), valve_in),
            (VALVE_OUT.to_string(), valve_out),
        ])
    }

    #[test]
    fn filling_from_empty() {
        let model = reference_model();
        let d = TankPlugin
            .derivatives(0.0, &state(0.0, 1.0, 0.0), &ControlMap::new(), &model)
            .unwrap();
        // inflow = 0.05 * sqrt(2e5) = 22.36, outflow = 0
        let p = TankParams::from_model(&model);
        assert!((p.inflow(1.0) - 22.3607).abs() < 1e-3);
        assert!((d[LEVEL] - 2.23607).abs() < 1e-4);
        assert_eq!(d[VALVE_IN], 0.0);
        assert_eq!(d[VALVE_OUT], 0.0);
    }

    #[test]
    fn draining_stops_at_empty() {
        let model = reference_model();
        let d = TankPlugin
            .derivatives(0.0, &state(-1e-9, 0.0, 1.0), &ControlMap::new(), &model)
            .unwrap();
        assert_eq!(d[LEVEL], 0.0);
    }

    #[test]
    fn filling_stops_at_max_height() {
        let model = reference_model().with_parameter("max_height", 8.0);
        let d = TankPlugin
            .derivatives(0.0, &state(8.0, 1.0, 0.0), &ControlMap::new(), &model)
            .unwrap();
        assert_eq!(d[LEVEL], 0.0);
    }

    #[test]
    fn valves_follow_targets() {
        let model = reference_model().with_parameter("tau_valve", 2.0);
        let control = ControlMap::from([
            (VALVE_IN_TARGET.to_string(), 1.0),
            (VALVE_OUT_TARGET.to_string(), 0.0),
        ]);
        let d = TankPlugin
            .derivatives(0.0, &state(5.0, 0.5, 0.5), &control, &model)
            .unwrap();
        assert!((d[VALVE_IN] - 0.25).abs() < 1e-12);
        assert!((d[VALVE_OUT] + 0.25).abs() < 1e-12);
    }

    #[test]
    fn initial_state_defaults() {
        let s = TankPlugin
            .initial_state(&ModelDefinition::new("t", "tank"))
            .unwrap();
        assert_eq!(s[LEVEL], 5.0);
        assert_eq!(s[VALVE_IN], 0.5);
        assert_eq!(s[VALVE_OUT], 0.5);
    }

    #[test]
    fn signals_are_namespaced() {
        let sig = TankPlugin.signals(&state(3.0, 0.2, 0.7)).unwrap();
        assert_eq!(sig[LEVEL_SIGNAL], 3.0);
        assert_eq!(sig[VALVE_IN_SIGNAL], 0.2);
        assert_eq!(sig[VALVE_OUT_SIGNAL], 0.7);
        for name in sig.keys() {
            assert!(ts_core::split_signal_name(name).is_ok());
        }
    }

    #[test]
    fn validate_rejects_bad_geometry() {
        let bad = reference_model().with_parameter("area", 0.0);
        assert!(TankPlugin.validate(&bad).is_err());
        let bad = reference_model().with_parameter("dP_in", -1.0);
        assert!(TankPlugin.validate(&bad).is_err());
        let bad = reference_model().with_parameter("tau_valve", 0.0);
        assert!(TankPlugin.validate(&bad).is_err());
        assert!(TankPlugin.validate(&reference_model()).is_ok());
    }

    #[test]
    fn missing_state_is_an_error() {
        let mut s = state(1.0, 0.0, 0.0);
        s.remove(VALVE_OUT);
        assert!(TankPlugin.signals(&s).is_err());
    }
}
