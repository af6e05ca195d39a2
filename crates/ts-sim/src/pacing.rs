//! Wall-clock pacing between steps.
//!
//! Simulation time never depends on pacing. A pacer only decides how long
//! the run loop waits after each step, and must return promptly once the
//! run is stopped.

use std::time::Duration;

use crate::control::RunControl;

pub trait Pacer {
    /// Wait before the next step.
    fn pace(&mut self, control: &RunControl);
}

/// Run as fast as possible.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPacing;

impl Pacer for NoPacing {
    fn pace(&mut self, _control: &RunControl) {}
}

/// Fixed wall-clock delay after every step, e.g. for live display.
#[derive(Debug, Clone, Copy)]
pub struct FixedInterval {
    pub interval: Duration,
}

impl FixedInterval {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Pacer for FixedInterval {
    fn pace(&mut self, control: &RunControl) {
        control.sleep(self.interval);
    }
}
