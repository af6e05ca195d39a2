//! Deterministic fixed-step simulation of OT processes with attack injection.
//!
//! Provides:
//! - Euler and RK4 fixed-step integrators over a `TransientModel`
//! - `Simulator`: per-run orchestrator (plugin, controller, attack catalog)
//! - Collaborator traits for attack storage, run status and telemetry
//! - `RunControl`: pause/resume/stop and live attack commands
//! - Pacers decoupling wall-clock cadence from simulation time

pub mod collab;
pub mod control;
pub mod error;
pub mod integrator;
pub mod layout;
pub mod model;
pub mod pacing;
pub mod simulator;
pub mod status;
pub mod telemetry;

pub use collab::{
    AttackRepository, Collaborators, FanoutTelemetry, InMemoryAttackRepository, MemoryTelemetry,
    NullSink, RunStatusSink, StatusLog, StatusUpdate, TelemetrySink,
};
pub use control::{RunCommand, RunControl};
pub use error::{SimError, SimResult};
pub use integrator::{ForwardEuler, Integrator, IntegratorType, RK4};
pub use layout::StateLayout;
pub use model::{PluginRhs, TransientModel};
pub use pacing::{FixedInterval, NoPacing, Pacer};
pub use simulator::{RunReport, SimOptions, SimProgress, Simulator, StepOutcome};
pub use status::RunStatus;
pub use telemetry::{SimulationState, TelemetryRecord};
