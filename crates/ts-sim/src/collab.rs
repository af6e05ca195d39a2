//! Boundaries to the systems a run reads from and reports to.
//!
//! The simulator only depends on these traits. In-memory implementations
//! are provided for tests and for callers that keep everything in process.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use ts_attacks::{AttackRecord, AttackStatus};

use crate::error::SimResult;
use crate::status::RunStatus;
use crate::telemetry::TelemetryRecord;

/// Source of the attacks scripted for a run.
pub trait AttackRepository {
    /// Attacks registered for `run_id`, in registration order.
    fn load_attacks_for_run(&self, run_id: &str) -> SimResult<Vec<AttackRecord>>;

    /// Persist an attack's new lifecycle status.
    fn update_attack_status(
        &self,
        _run_id: &str,
        _attack_id: &str,
        _status: AttackStatus,
    ) -> SimResult<()> {
        Ok(())
    }
}

/// Receives run lifecycle transitions.
pub trait RunStatusSink {
    /// `progress` is the completed fraction of steps in `[0, 1]`.
    fn update(&mut self, run_id: &str, status: RunStatus, progress: f64, error: Option<&str>);
}

/// Receives one telemetry record per step.
pub trait TelemetrySink {
    fn emit(&mut self, run_id: &str, record: &TelemetryRecord) -> SimResult<()>;
}

/// Everything a run talks to besides its own state.
pub struct Collaborators<'a> {
    pub attacks: &'a dyn AttackRepository,
    pub status: &'a mut dyn RunStatusSink,
    pub telemetry: &'a mut dyn TelemetrySink,
}

/// The same attacks for every run id.
impl AttackRepository for Vec<AttackRecord> {
    fn load_attacks_for_run(&self, _run_id: &str) -> SimResult<Vec<AttackRecord>> {
        Ok(self.clone())
    }
}

/// Attack records keyed by run id, with status write-back.
#[derive(Debug, Default)]
pub struct InMemoryAttackRepository {
    runs: Mutex<BTreeMap<String, Vec<AttackRecord>>>,
}

impl InMemoryAttackRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, run_id: impl Into<String>, attacks: Vec<AttackRecord>) {
        self.lock().insert(run_id.into(), attacks);
    }

    /// Stored records for a run, including any status written back.
    pub fn attacks(&self, run_id: &str) -> Vec<AttackRecord> {
        self.lock().get(run_id).cloned().unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<AttackRecord>>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AttackRepository for InMemoryAttackRepository {
    fn load_attacks_for_run(&self, run_id: &str) -> SimResult<Vec<AttackRecord>> {
        Ok(self.attacks(run_id))
    }

    fn update_attack_status(
        &self,
        run_id: &str,
        attack_id: &str,
        status: AttackStatus,
    ) -> SimResult<()> {
        let mut runs = self.lock();
        if let Some(record) = runs
            .get_mut(run_id)
            .and_then(|records| records.iter_mut().find(|r| r.id == attack_id))
        {
            record.status = status;
        }
        Ok(())
    }
}

/// One status update as received by [`StatusLog`].
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub run_id: String,
    pub status: RunStatus,
    pub progress: f64,
    pub error: Option<String>,
}

/// Records every status update.
#[derive(Debug, Default)]
pub struct StatusLog {
    pub updates: Vec<StatusUpdate>,
}

impl StatusLog {
    pub fn statuses(&self) -> Vec<RunStatus> {
        self.updates.iter().map(|u| u.status).collect()
    }

    pub fn last(&self) -> Option<&StatusUpdate> {
        self.updates.last()
    }
}

impl RunStatusSink for StatusLog {
    fn update(&mut self, run_id: &str, status: RunStatus, progress: f64, error: Option<&str>) {
        self.updates.push(StatusUpdate {
            run_id: run_id.to_string(),
            status,
            progress,
            error: error.map(str::to_string),
        });
    }
}

/// Keeps every telemetry record in memory.
#[derive(Debug, Default)]
pub struct MemoryTelemetry {
    pub records: Vec<TelemetryRecord>,
}

impl TelemetrySink for MemoryTelemetry {
    fn emit(&mut self, _run_id: &str, record: &TelemetryRecord) -> SimResult<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RunStatusSink for NullSink {
    fn update(&mut self, _run_id: &str, _status: RunStatus, _progress: f64, _error: Option<&str>) {}
}

impl TelemetrySink for NullSink {
    fn emit(&mut self, _run_id: &str, _record: &TelemetryRecord) -> SimResult<()> {
        Ok(())
    }
}

/// Forwards each record to several sinks in order.
pub struct FanoutTelemetry<'a> {
    sinks: Vec<&'a mut dyn TelemetrySink>,
}

impl<'a> FanoutTelemetry<'a> {
    pub fn new(sinks: Vec<&'a mut dyn TelemetrySink>) -> Self {
        Self { sinks }
    }
}

impl TelemetrySink for FanoutTelemetry<'_> {
    fn emit(&mut self, run_id: &str, record: &TelemetryRecord) -> SimResult<()> {
        for sink in &mut self.sinks {
            sink.emit(run_id, record)?;
        }
        Ok(())
    }
}
