//! Scripted cyberattack injection for simulated OT telemetry.
//!
//! Attacks sit between the ground-truth signals computed by a dynamics plugin
//! and the observed signals consumed by controllers and downstream detectors.
//!
//! # Architecture
//!
//! - [`AttackRecord`] is the serialized, untyped description of one attack
//!   (kind, target signal, time window, kind-specific parameters).
//! - [`AttackAction`] is the validated, typed corruption rule built from a
//!   record at registration time.
//! - [`AttackInjector`] is the per-run catalog. It recomputes every attack's
//!   lifecycle status from simulation time at each step and corrupts the
//!   targeted signals.
//!
//! Each injector owns its own seeded RNG, so noise attacks are reproducible
//! and no state is shared between concurrently running simulations.

pub mod action;
pub mod error;
pub mod injector;
pub mod record;

pub use action::{AttackAction, ApplyContext};
pub use error::{AttackError, AttackResult};
pub use injector::{ActiveAttack, AttackFailure, AttackInjector, Injection, StatusTransition};
pub use record::{AttackKind, AttackParams, AttackRecord, AttackStatus, ParamValue};
