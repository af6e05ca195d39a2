//! Pluggable process dynamics.
//!
//! Provides:
//! - `DynamicsPlugin` trait: initial state, derivatives and observable signals
//! - `PluginRegistry`: explicit model-type -> plugin table
//! - First-order lag used for valve positioners
//! - `tank` and `linear_tank` reference plugins

pub mod error;
pub mod lag;
pub mod linear_tank;
pub mod plugin;
pub mod registry;
pub mod tank;

pub use error::{DynamicsError, DynamicsResult};
pub use lag::FirstOrderLag;
pub use linear_tank::LinearTankPlugin;
pub use plugin::DynamicsPlugin;
pub use registry::PluginRegistry;
pub use tank::{TankParams, TankPlugin};
