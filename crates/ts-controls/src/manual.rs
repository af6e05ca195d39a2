use ts_core::{ControlMap, SignalMap};

use crate::controller::Controller;
use crate::error::ControlResult;

/// Open-loop controller returning fixed setpoints every step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManualController {
    setpoints: ControlMap,
}

impl ManualController {
    pub fn new(setpoints: ControlMap) -> Self {
        Self { setpoints }
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.setpoints.insert(name.into(), value);
    }
}

impl Controller for ManualController {
    fn kind(&self) -> &'static str {
        "manual"
    }

    fn compute(&mut self, _observed: &SignalMap, _dt: f64) -> ControlResult<ControlMap> {
        Ok(self.setpoints.clone())
    }

    fn reset(&mut self) {}
}
