//! Run execution service.
//!
//! A run is validated, simulated to a terminal status, and (when a store is
//! given) persisted as a manifest plus streamed JSONL telemetry. Runs can be
//! executed on the calling thread or spawned onto a worker thread that is
//! steered through a [`RunHandle`].

use std::path::Path;
use std::sync::mpsc::{Receiver, TrySendError, sync_channel};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};
use ts_attacks::AttackRecord;
use ts_core::step_count;
use ts_dynamics::PluginRegistry;
use ts_model::{Scenario, validate_scenario};
use ts_results::{JsonlTelemetrySink, RunManifest, RunStore, compute_fingerprint};
use ts_sim::{
    Collaborators, FanoutTelemetry, FixedInterval, MemoryTelemetry, NoPacing, Pacer, RunControl,
    RunReport, RunStatus, RunStatusSink, SimOptions, SimProgress, Simulator, TelemetryRecord,
    TelemetrySink,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::progress::{RunProgressEvent, RunStage, SimulationProgress};

/// Options for executing a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Seed for the noise attack RNG.
    pub seed: u64,
    /// Wall-clock delay after each step. `None` runs as fast as possible.
    pub pacing: Option<Duration>,
    /// Use this run id instead of a fresh UUID.
    pub run_id: Option<String>,
    /// Keep telemetry in memory and return it in the response.
    pub keep_telemetry: bool,
    pub engine_version: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            pacing: None,
            run_id: None,
            keep_telemetry: true,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Request to execute a run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub scenario: Scenario,
    pub options: RunOptions,
    /// Where to persist the run. `None` keeps everything in memory.
    pub store: Option<RunStore>,
}

impl RunRequest {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            options: RunOptions::default(),
            store: None,
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_store(mut self, store: RunStore) -> Self {
        self.store = Some(store);
        self
    }
}

/// Response from a run execution.
///
/// A run that ended `Failed` is still a response; check `report.status`.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub report: RunReport,
    pub manifest: RunManifest,
    /// Empty unless `keep_telemetry` was set.
    pub telemetry: Vec<TelemetryRecord>,
    pub wall_time_s: f64,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    run_id: &str,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
    simulation: Option<SimulationProgress>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent {
            run_id: run_id.to_string(),
            stage,
            elapsed_wall_s: started.elapsed().as_secs_f64(),
            message,
            simulation,
        });
    }
}

/// Logs lifecycle transitions.
#[derive(Debug, Default)]
struct LoggingStatusSink;

impl RunStatusSink for LoggingStatusSink {
    fn update(&mut self, run_id: &str, status: RunStatus, progress: f64, error: Option<&str>) {
        match error {
            Some(message) => warn!(run_id, %status, progress, error = message, "run status"),
            None => info!(run_id, %status, progress, "run status"),
        }
    }
}

pub fn execute_run(request: RunRequest) -> AppResult<RunResponse> {
    execute_run_with_progress(request, None)
}

pub fn execute_run_with_progress(
    request: RunRequest,
    progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    execute(request, RunControl::new(), progress_cb)
}

fn execute(
    request: RunRequest,
    control: RunControl,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let RunRequest {
        scenario,
        options,
        store,
    } = request;
    let run_id = options
        .run_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    emit_progress(
        &mut progress_cb,
        &run_id,
        RunStage::LoadingScenario,
        started,
        Some(format!("Validating scenario '{}'", scenario.name)),
        None,
    );
    validate_scenario(&scenario)?;

    emit_progress(
        &mut progress_cb,
        &run_id,
        RunStage::Initializing,
        started,
        Some(format!("Initializing {} model", scenario.model.model_type)),
        None,
    );

    let registry = PluginRegistry::with_builtin();
    let mut memory = MemoryTelemetry::default();
    let mut writer = match &store {
        Some(store) => Some(store.telemetry_writer(&run_id)?),
        None => None,
    };
    let mut status = LoggingStatusSink;

    let outcome = {
        let mut sinks: Vec<&mut dyn TelemetrySink> = Vec::new();
        if options.keep_telemetry {
            sinks.push(&mut memory);
        }
        if let Some(writer) = writer.as_mut() {
            sinks.push(writer);
        }
        let mut telemetry = FanoutTelemetry::new(sinks);
        let mut collab = Collaborators {
            attacks: &scenario.attacks,
            status: &mut status,
            telemetry: &mut telemetry,
        };
        simulate(
            &run_id,
            &scenario,
            &registry,
            &options,
            control,
            &mut collab,
            &mut progress_cb,
            started,
        )
    };

    let records_written = finish_writer(writer)?;

    let report = match outcome {
        Ok(report) => report,
        Err(e) => {
            // Initialization failed; persist the failure so the run is
            // still listed.
            let message = e.to_string();
            error!(run_id = %run_id, error = %message, "run could not start");
            if let Some(store) = &store {
                let report = failed_report(&run_id, &scenario, message);
                let manifest = build_manifest(&scenario, &scenario.attacks, &options, &report);
                if let Err(save_err) = store.save_manifest(&manifest) {
                    warn!(run_id = %run_id, error = %save_err, "could not persist failed run");
                }
            }
            return Err(e);
        }
    };

    emit_progress(
        &mut progress_cb,
        &run_id,
        RunStage::Saving,
        started,
        Some(format!("Recording {} status", report.status)),
        None,
    );
    let manifest = build_manifest(&scenario, &scenario.attacks, &options, &report);
    if let Some(store) = &store {
        store.save_manifest(&manifest)?;
        info!(
            run_id = %run_id,
            records = records_written,
            dir = %store.root().display(),
            "run saved"
        );
    }

    emit_progress(
        &mut progress_cb,
        &run_id,
        RunStage::Completed,
        started,
        Some(format!(
            "Run {} after {} of {} steps",
            report.status, report.steps, report.total_steps
        )),
        None,
    );

    Ok(RunResponse {
        run_id,
        report,
        manifest,
        telemetry: memory.records,
        wall_time_s: started.elapsed().as_secs_f64(),
    })
}

#[allow(clippy::too_many_arguments)]
fn simulate(
    run_id: &str,
    scenario: &Scenario,
    registry: &PluginRegistry,
    options: &RunOptions,
    control: RunControl,
    collab: &mut Collaborators<'_>,
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    started: Instant,
) -> AppResult<RunReport> {
    let mut sim = Simulator::initialize(
        run_id,
        scenario.model.clone(),
        registry,
        SimOptions { seed: options.seed },
        collab,
    )?;
    sim.set_control(control);

    emit_progress(
        progress_cb,
        run_id,
        RunStage::Running,
        started,
        Some(format!("Simulating {} steps", sim.total_steps())),
        None,
    );

    let mut pacer: Box<dyn Pacer> = match options.pacing {
        Some(interval) => Box::new(FixedInterval::new(interval)),
        None => Box::new(NoPacing),
    };
    let mut on_step = |p: SimProgress| {
        emit_progress(
            progress_cb,
            run_id,
            RunStage::Running,
            started,
            None,
            Some(SimulationProgress::from(p)),
        );
    };
    let report = sim.run(collab, pacer.as_mut(), Some(&mut on_step))?;
    Ok(report)
}

fn finish_writer(writer: Option<JsonlTelemetrySink>) -> AppResult<u64> {
    match writer {
        Some(writer) => Ok(writer.finish()?),
        None => Ok(0),
    }
}

fn failed_report(run_id: &str, scenario: &Scenario, message: String) -> RunReport {
    let solver = &scenario.model.simulation;
    RunReport {
        run_id: run_id.to_string(),
        status: RunStatus::Failed,
        steps: 0,
        total_steps: step_count(solver.duration, solver.dt).unwrap_or_default(),
        final_time: 0.0,
        attack_failures: 0,
        error: Some(message),
    }
}

fn build_manifest(
    scenario: &Scenario,
    attacks: &[AttackRecord],
    options: &RunOptions,
    report: &RunReport,
) -> RunManifest {
    let model = &scenario.model;
    RunManifest {
        run_id: report.run_id.clone(),
        scenario_name: scenario.name.clone(),
        model_name: model.name.clone(),
        model_type: model.model_type.clone(),
        method: model.simulation.method.as_str().to_string(),
        dt: model.simulation.dt,
        duration: model.simulation.duration,
        seed: options.seed,
        attack_count: attacks.len(),
        status: report.status,
        steps: report.steps,
        total_steps: report.total_steps,
        final_time: report.final_time,
        attack_failures: report.attack_failures,
        error: report.error.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        fingerprint: compute_fingerprint(model, attacks, options.seed),
        engine_version: options.engine_version.clone(),
    }
}

/// Progress events buffered per spawned run. Events beyond this are dropped
/// until the consumer catches up; the joined response is authoritative.
pub const PROGRESS_BUFFER: usize = 256;

/// A run executing on its own worker thread.
///
/// Every handle owns an independent simulator; controlling one run never
/// affects another.
pub struct RunHandle {
    run_id: String,
    control: RunControl,
    progress_rx: Receiver<RunProgressEvent>,
    handle: JoinHandle<AppResult<RunResponse>>,
}

/// Start a run on a worker thread.
pub fn spawn_run(mut request: RunRequest) -> AppResult<RunHandle> {
    let run_id = request
        .options
        .run_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    request.options.run_id = Some(run_id.clone());

    let control = RunControl::new();
    let worker_control = control.clone();
    let (tx, rx) = sync_channel(PROGRESS_BUFFER);

    let handle = thread::Builder::new()
        .name(format!("run-{run_id}"))
        .spawn(move || {
            let mut dropped = 0u64;
            let mut forward = |event: RunProgressEvent| match tx.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => dropped += 1,
                // Receiver gone; the run continues.
                Err(TrySendError::Disconnected(_)) => {}
            };
            let result = execute(request, worker_control, Some(&mut forward));
            if dropped > 0 {
                debug!(dropped, "progress events dropped on a full buffer");
            }
            result
        })
        .map_err(|e| AppError::Worker(e.to_string()))?;

    Ok(RunHandle {
        run_id,
        control,
        progress_rx: rx,
        handle,
    })
}

impl RunHandle {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// A clone of the run's control handle, e.g. for another thread.
    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    pub fn pause(&self) -> bool {
        self.control.pause()
    }

    pub fn resume(&self) -> bool {
        self.control.resume()
    }

    pub fn stop(&self) -> bool {
        self.control.stop()
    }

    /// Queue an attack to be registered at the next step boundary.
    pub fn arm_attack(&self, record: AttackRecord) {
        self.control.arm_attack(record);
    }

    pub fn disarm_attack(&self, attack_id: impl Into<String>) {
        self.control.disarm_attack(attack_id);
    }

    /// Clear the controller's accumulated state at the next step boundary.
    pub fn reset_controller(&self) {
        self.control.reset_controller();
    }

    /// Retarget the controller at the next step boundary. Open-loop
    /// controllers reject this with a warning and the run continues.
    pub fn set_setpoint(&self, setpoint: f64) {
        self.control.set_setpoint(setpoint);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Next buffered progress event, if any.
    pub fn try_progress(&self) -> Option<RunProgressEvent> {
        self.progress_rx.try_recv().ok()
    }

    /// Block until the next progress event. `None` once the worker is done.
    pub fn recv_progress(&self) -> Option<RunProgressEvent> {
        self.progress_rx.recv().ok()
    }

    /// Wait for the worker and return its result.
    pub fn join(self) -> AppResult<RunResponse> {
        self.handle
            .join()
            .map_err(|_| AppError::Worker(format!("run {} panicked", self.run_id)))?
    }
}

/// Stored runs under `root`, oldest first.
pub fn list_runs(root: &Path) -> AppResult<Vec<RunManifest>> {
    let store = RunStore::new(root.to_path_buf())?;
    Ok(store.list_runs()?)
}

/// Manifest and telemetry of a stored run.
pub fn load_run(root: &Path, run_id: &str) -> AppResult<(RunManifest, Vec<TelemetryRecord>)> {
    let store = RunStore::new(root.to_path_buf())?;
    let manifest = store.load_manifest(run_id)?;
    let telemetry = store.load_telemetry(run_id)?;
    Ok((manifest, telemetry))
}
