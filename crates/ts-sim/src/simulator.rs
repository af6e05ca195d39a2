//! Run orchestration: one `Simulator` per run.
//!
//! Per step, in order:
//! 1. real signals from the plant state
//! 2. attack injection -> observed signals
//! 3. controller (or manual setpoints) on the observed signals
//! 4. integrate the real state with the control action held constant
//! 5. emit telemetry
//! 6. commit the new state and advance time
//!
//! A step either commits completely or the run is marked failed; no partial
//! state is ever kept.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use ts_attacks::{AttackFailure, AttackInjector, AttackRecord, AttackStatus, StatusTransition};
use ts_controls::{Controller, build_controller};
use ts_core::{ControlMap, first_non_finite, step_count};
use ts_dynamics::{DynamicsPlugin, PluginRegistry};
use ts_model::{ModelDefinition, validate_model};

use crate::collab::{AttackRepository, Collaborators, RunStatusSink};
use crate::control::{RunCommand, RunControl};
use crate::error::{SimError, SimResult};
use crate::integrator::IntegratorType;
use crate::layout::StateLayout;
use crate::model::PluginRhs;
use crate::pacing::Pacer;
use crate::status::RunStatus;
use crate::telemetry::{SimulationState, TelemetryRecord};

/// Per-run options that are not part of the model definition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimOptions {
    /// Seed for the attack injector's noise RNG.
    pub seed: u64,
}

/// Progress callback payload, one per completed step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimProgress {
    pub step: u64,
    pub total_steps: u64,
    pub sim_time: f64,
    pub duration: f64,
    pub fraction_complete: f64,
}

/// Outcome of one successful step.
#[derive(Debug, Clone, Default)]
pub struct StepOutcome {
    /// Index of the step just executed.
    pub step: u64,
    /// Simulation time at the start of the step.
    pub t: f64,
    pub transitions: Vec<StatusTransition>,
    /// Attack handlers that failed; the real value was used instead.
    pub failures: Vec<AttackFailure>,
    /// `true` once the configured duration has been covered.
    pub finished: bool,
}

/// Summary returned when a run loop ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub status: RunStatus,
    pub steps: u64,
    pub total_steps: u64,
    pub final_time: f64,
    pub attack_failures: u64,
    pub error: Option<String>,
}

/// Orchestrator for a single run. Owns the plant state, the controller and
/// the attack catalog; nothing here is shared with other runs.
pub struct Simulator {
    run_id: String,
    model: ModelDefinition,
    plugin: Arc<dyn DynamicsPlugin>,
    controller: Box<dyn Controller>,
    injector: AttackInjector,
    integrator: IntegratorType,
    layout: StateLayout,
    state: SimulationState,
    dt: f64,
    total_steps: u64,
    step_index: u64,
    status: RunStatus,
    error: Option<String>,
    attack_failures: u64,
    control: RunControl,
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("run_id", &self.run_id)
            .field("model_type", &self.model.model_type)
            .field("status", &self.status)
            .field("step", &self.step_index)
            .field("total_steps", &self.total_steps)
            .finish()
    }
}

impl Simulator {
    /// Resolve the plugin, build the initial state and controller, and load
    /// the run's attacks.
    ///
    /// Any failure is fatal: the status sink receives `Failed` and no
    /// simulator is returned.
    pub fn initialize(
        run_id: impl Into<String>,
        model: ModelDefinition,
        registry: &PluginRegistry,
        options: SimOptions,
        collab: &mut Collaborators<'_>,
    ) -> SimResult<Self> {
        let run_id = run_id.into();
        info!(
            run_id = %run_id,
            model = %model.name,
            model_type = %model.model_type,
            method = model.simulation.method.as_str(),
            dt = model.simulation.dt,
            duration = model.simulation.duration,
            "initializing simulation"
        );
        match Self::build(&run_id, model, registry, options, collab.attacks) {
            Ok(mut sim) => {
                sim.set_status(RunStatus::Initialized, collab.status);
                Ok(sim)
            }
            Err(e) => {
                let message = e.to_string();
                error!(run_id = %run_id, error = %message, "initialization failed");
                collab
                    .status
                    .update(&run_id, RunStatus::Failed, 0.0, Some(&message));
                Err(e)
            }
        }
    }

    fn build(
        run_id: &str,
        model: ModelDefinition,
        registry: &PluginRegistry,
        options: SimOptions,
        attacks: &dyn AttackRepository,
    ) -> SimResult<Self> {
        validate_model(&model)?;
        let plugin = registry.resolve(&model.model_type)?;
        plugin.validate(&model)?;

        let dt = model.simulation.dt;
        let total_steps = step_count(model.simulation.duration, dt)?;

        let initial = plugin.initial_state(&model)?;
        if let Some((name, value)) = first_non_finite(&initial) {
            return Err(SimError::NonFinite {
                what: format!("initial state {name}"),
                value,
                t: 0.0,
            });
        }
        let layout = StateLayout::from_state(&initial)?;
        let signals = plugin.signals(&initial)?;

        let controller = build_controller(&model)?;
        for input in controller.inputs() {
            if !signals.contains_key(input) {
                return Err(SimError::UnknownControlledVariable {
                    name: input.to_string(),
                    available: signals.keys().cloned().collect(),
                });
            }
        }

        let mut injector = AttackInjector::new(options.seed);
        let records = attacks.load_attacks_for_run(run_id)?;
        let mut loaded = 0usize;
        for record in records {
            if matches!(record.status, AttackStatus::Completed | AttackStatus::Failed) {
                debug!(attack_id = %record.id, status = %record.status, "skipping finished attack");
                continue;
            }
            injector.register(record)?;
            loaded += 1;
        }
        info!(
            run_id,
            attacks = loaded,
            controller = controller.kind(),
            steps = total_steps,
            "simulation initialized"
        );

        Ok(Self {
            run_id: run_id.to_string(),
            integrator: IntegratorType::from(model.simulation.method),
            plugin,
            controller,
            injector,
            layout,
            state: SimulationState {
                t: 0.0,
                state: initial,
                signals,
                control: ControlMap::new(),
            },
            dt,
            total_steps,
            step_index: 0,
            status: RunStatus::NotInitialized,
            error: None,
            attack_failures: 0,
            control: RunControl::new(),
            model,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn model(&self) -> &ModelDefinition {
        &self.model
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Snapshot of time, state, last signals and last control action.
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn steps_taken(&self) -> u64 {
        self.step_index
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn injector(&self) -> &AttackInjector {
        &self.injector
    }

    /// Handle for pausing, resuming, stopping and arming attacks from
    /// another thread.
    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    /// Use an externally created handle, e.g. one handed out before the run
    /// was initialized.
    pub fn set_control(&mut self, control: RunControl) {
        self.control = control;
    }

    /// Register an attack directly (outside the run loop).
    pub fn register_attack(&mut self, record: AttackRecord) -> SimResult<()> {
        self.injector.register(record)?;
        Ok(())
    }

    pub fn remove_attack(&mut self, attack_id: &str) -> SimResult<AttackRecord> {
        Ok(self.injector.remove(attack_id)?)
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            run_id: self.run_id.clone(),
            status: self.status,
            steps: self.step_index,
            total_steps: self.total_steps,
            final_time: self.state.t,
            attack_failures: self.attack_failures,
            error: self.error.clone(),
        }
    }

    /// Execute one step.
    ///
    /// An `Err` is fatal: the run is marked `Failed` before returning and the
    /// state of the failed step is discarded.
    pub fn step(&mut self, collab: &mut Collaborators<'_>) -> SimResult<StepOutcome> {
        if self.status.is_terminal() || self.status == RunStatus::NotInitialized {
            return Err(SimError::InvalidTransition {
                op: "step",
                status: self.status.to_string(),
            });
        }
        if self.status == RunStatus::Initialized {
            self.set_status(RunStatus::Running, collab.status);
        }
        match self.advance(collab) {
            Ok(outcome) => {
                if outcome.finished {
                    info!(
                        run_id = %self.run_id,
                        steps = self.step_index,
                        t = self.state.t,
                        "simulation completed"
                    );
                    self.set_status(RunStatus::Completed, collab.status);
                }
                Ok(outcome)
            }
            Err(e) => {
                self.fail(&e, collab.status);
                Err(e)
            }
        }
    }

    fn advance(&mut self, collab: &mut Collaborators<'_>) -> SimResult<StepOutcome> {
        let step = self.step_index;
        let t = step as f64 * self.dt;

        // Signals are pure in the state; the cached ones match the committed state.
        let real = self.state.signals.clone();

        let injection = self.injector.inject(t, step, &real);
        for transition in &injection.transitions {
            if let Err(e) =
                collab
                    .attacks
                    .update_attack_status(&self.run_id, &transition.attack_id, transition.to)
            {
                warn!(
                    run_id = %self.run_id,
                    attack_id = %transition.attack_id,
                    error = %e,
                    "failed to persist attack status"
                );
            }
        }

        let control = self.controller.compute(&injection.observed, self.dt)?;
        if let Some((name, value)) = first_non_finite(&control) {
            return Err(SimError::NonFinite {
                what: format!("control action {name}"),
                value,
                t,
            });
        }

        let x = self.layout.to_vector(&self.state.state)?;
        let mut rhs = PluginRhs {
            plugin: self.plugin.as_ref(),
            model: &self.model,
            control: &control,
            layout: &self.layout,
        };
        let x_next = self.integrator.step(&mut rhs, t, &x, self.dt)?;
        let next_state = self.layout.to_map(&x_next);
        if let Some((name, value)) = first_non_finite(&next_state) {
            return Err(SimError::NonFinite {
                what: format!("state {name}"),
                value,
                t: t + self.dt,
            });
        }
        let next_signals = self.plugin.signals(&next_state)?;

        let record = TelemetryRecord {
            timestamp: t,
            real_signals: real,
            observed_signals: injection.observed,
            control_actions: control,
            active_attacks: self.injector.active_attacks(),
        };
        collab.telemetry.emit(&self.run_id, &record)?;

        // Commit.
        self.step_index = step + 1;
        self.state = SimulationState {
            t: self.step_index as f64 * self.dt,
            state: next_state,
            signals: next_signals,
            control: record.control_actions,
        };
        self.attack_failures += injection.failures.len() as u64;

        Ok(StepOutcome {
            step,
            t,
            transitions: injection.transitions,
            failures: injection.failures,
            finished: self.step_index >= self.total_steps,
        })
    }

    /// Drive the run to a terminal status.
    ///
    /// The control handle is checked at every step boundary: stop ends the
    /// run as `Stopped`, pause blocks until resume or stop. Queued attack
    /// commands are applied before the next step.
    pub fn run(
        &mut self,
        collab: &mut Collaborators<'_>,
        pacer: &mut dyn Pacer,
        mut progress: Option<&mut dyn FnMut(SimProgress)>,
    ) -> SimResult<RunReport> {
        if self.status.is_terminal() || self.status == RunStatus::NotInitialized {
            return Err(SimError::InvalidTransition {
                op: "run",
                status: self.status.to_string(),
            });
        }
        info!(
            run_id = %self.run_id,
            steps = self.total_steps,
            dt = self.dt,
            "simulation running"
        );
        self.set_status(RunStatus::Running, collab.status);

        let control = self.control.clone();
        while !self.status.is_terminal() {
            if control.is_stopped() {
                info!(run_id = %self.run_id, steps = self.step_index, "simulation stopped");
                self.set_status(RunStatus::Stopped, collab.status);
                break;
            }

            self.apply_commands(&control);

            if control.is_paused() {
                self.set_status(RunStatus::Paused, collab.status);
                info!(run_id = %self.run_id, t = self.state.t, "simulation paused");
                if !control.wait_while_paused() {
                    info!(run_id = %self.run_id, t = self.state.t, "simulation resumed");
                    self.set_status(RunStatus::Running, collab.status);
                }
                continue;
            }

            if self.step_index >= self.total_steps {
                self.set_status(RunStatus::Completed, collab.status);
                break;
            }

            // Failure has already been recorded by `step`.
            if self.step(collab).is_err() {
                break;
            }

            if let Some(cb) = progress.as_deref_mut() {
                cb(SimProgress {
                    step: self.step_index,
                    total_steps: self.total_steps,
                    sim_time: self.state.t,
                    duration: self.model.simulation.duration,
                    fraction_complete: self.fraction_complete(),
                });
            }

            if !self.status.is_terminal() {
                pacer.pace(&control);
            }
        }

        Ok(self.report())
    }

    fn apply_commands(&mut self, control: &RunControl) {
        for command in control.take_commands() {
            match command {
                RunCommand::ArmAttack(record) => {
                    let id = record.id.clone();
                    if let Err(e) = self.injector.register(record) {
                        warn!(run_id = %self.run_id, attack_id = %id, error = %e, "attack rejected");
                    }
                }
                RunCommand::DisarmAttack(id) => match self.injector.remove(&id) {
                    Ok(_) => info!(run_id = %self.run_id, attack_id = %id, "attack disarmed"),
                    Err(e) => {
                        warn!(run_id = %self.run_id, attack_id = %id, error = %e, "disarm failed")
                    }
                },
                RunCommand::ResetController => {
                    self.controller.reset();
                    info!(run_id = %self.run_id, t = self.state.t, "controller reset");
                }
                RunCommand::SetSetpoint(setpoint) => match self.controller.set_setpoint(setpoint) {
                    Ok(()) => info!(run_id = %self.run_id, setpoint, "setpoint changed"),
                    Err(e) => {
                        warn!(run_id = %self.run_id, setpoint, error = %e, "setpoint rejected")
                    }
                },
            }
        }
    }

    fn fraction_complete(&self) -> f64 {
        if self.total_steps == 0 {
            1.0
        } else {
            self.step_index as f64 / self.total_steps as f64
        }
    }

    fn fail(&mut self, e: &SimError, status: &mut dyn RunStatusSink) {
        let message = e.to_string();
        error!(
            run_id = %self.run_id,
            step = self.step_index,
            t = self.state.t,
            error = %message,
            "simulation failed"
        );
        self.error = Some(message);
        self.set_status(RunStatus::Failed, status);
    }

    fn set_status(&mut self, next: RunStatus, sink: &mut dyn RunStatusSink) {
        if self.status == next {
            return;
        }
        debug!(run_id = %self.run_id, from = %self.status, to = %next, "run status");
        self.status = next;
        sink.update(
            &self.run_id,
            next,
            self.fraction_complete(),
            self.error.as_deref(),
        );
    }
}
