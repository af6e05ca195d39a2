//! Closed-loop and open-loop control for the twinsec simulator.
//!
//! Controllers read the *observed* signal map, which may have been corrupted
//! by an attack, and produce targets for the plant's manipulated variables.
//!
//! - `PidController`: PID with output clamping and anti-windup
//! - `ManualController`: constant setpoints, used when no (supported)
//!   controller is configured
//! - `build_controller`: picks one from a model definition

pub mod controller;
pub mod error;
pub mod manual;
pub mod pid;

pub use controller::{Controller, build_controller};
pub use error::{ControlError, ControlResult};
pub use manual::ManualController;
pub use pid::{PidConfig, PidController, PidState, PidTerms};
