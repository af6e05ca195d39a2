//! Per-run attack catalog and per-step signal corruption.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ts_core::SignalMap;

use crate::action::{ApplyContext, AttackAction};
use crate::error::{AttackError, AttackResult};
use crate::record::{AttackKind, AttackParams, AttackRecord, AttackStatus};

/// Telemetry view of an attack that is corrupting a signal this step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveAttack {
    pub id: String,
    pub kind: AttackKind,
    pub target_signal: String,
    pub parameters: AttackParams,
}

/// Status change observed while resolving a step.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusTransition {
    pub attack_id: String,
    pub from: AttackStatus,
    pub to: AttackStatus,
    pub t: f64,
}

/// Recoverable handler failure. The real value was used for the target signal.
#[derive(Debug, Clone, PartialEq)]
pub struct AttackFailure {
    pub attack_id: String,
    pub target_signal: String,
    pub t: f64,
    pub error: AttackError,
}

/// Outcome of resolving attacks for one step.
#[derive(Debug, Clone, Default)]
pub struct Injection {
    pub observed: SignalMap,
    pub transitions: Vec<StatusTransition>,
    pub failures: Vec<AttackFailure>,
}

#[derive(Debug, Clone)]
struct AttackEntry {
    record: AttackRecord,
    action: AttackAction,
    status: AttackStatus,
    failures: u64,
}

/// Attack catalog owned by a single simulation run.
///
/// Attacks are kept in registration order. When several active attacks
/// target the same signal they are chained in that order, each one
/// transforming the previous output.
#[derive(Debug, Clone)]
pub struct AttackInjector {
    entries: Vec<AttackEntry>,
    rng: ChaCha8Rng,
}

impl Default for AttackInjector {
    fn default() -> Self {
        Self::new(0)
    }
}

impl AttackInjector {
    /// Create an empty catalog whose noise draws are seeded by `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            entries: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Validate and register an attack. The record's stored status is
    /// ignored; lifecycle starts at `armed` and is driven by time.
    pub fn register(&mut self, record: AttackRecord) -> AttackResult<()> {
        if self.entries.iter().any(|e| e.record.id == record.id) {
            return Err(AttackError::DuplicateId {
                attack_id: record.id,
            });
        }
        let action = AttackAction::from_record(&record)?;

        info!(
            attack_id = %record.id,
            kind = %record.kind,
            target = %record.target_signal,
            trigger_time = record.trigger_time,
            duration = ?record.duration,
            "attack registered"
        );

        self.entries.push(AttackEntry {
            record,
            action,
            status: AttackStatus::Armed,
            failures: 0,
        });
        Ok(())
    }

    /// Remove an attack by identifier, returning its record.
    pub fn remove(&mut self, attack_id: &str) -> AttackResult<AttackRecord> {
        let index = self
            .entries
            .iter()
            .position(|e| e.record.id == attack_id)
            .ok_or_else(|| AttackError::UnknownAttack {
                attack_id: attack_id.to_string(),
            })?;
        let entry = self.entries.remove(index);
        info!(attack_id, "attack removed");
        Ok(entry.record)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &AttackRecord> {
        self.entries.iter().map(|e| &e.record)
    }

    pub fn status(&self, attack_id: &str) -> Option<AttackStatus> {
        self.entry(attack_id).map(|e| e.status)
    }

    /// Number of steps in which this attack's handler failed.
    pub fn failure_count(&self, attack_id: &str) -> Option<u64> {
        self.entry(attack_id).map(|e| e.failures)
    }

    /// `(id, status)` for every attack in registration order.
    pub fn statuses(&self) -> Vec<(&str, AttackStatus)> {
        self.entries
            .iter()
            .map(|e| (e.record.id.as_str(), e.status))
            .collect()
    }

    /// Attacks whose status is `active`, in registration order.
    pub fn active_attacks(&self) -> Vec<ActiveAttack> {
        self.entries
            .iter()
            .filter(|e| e.status == AttackStatus::Active)
            .map(|e| ActiveAttack {
                id: e.record.id.clone(),
                kind: e.record.kind,
                target_signal: e.record.target_signal.clone(),
                parameters: e.record.parameters.clone(),
            })
            .collect()
    }

    /// Resolve all attacks at simulation time `t` and corrupt `real`.
    ///
    /// Signals without an active attack are passed through unchanged. If any
    /// handler in a signal's chain fails, that signal keeps its real value for
    /// this step and the failing attack is reported as `failed`.
    pub fn inject(&mut self, t: f64, step_index: u64, real: &SignalMap) -> Injection {
        let mut injection = Injection {
            observed: real.clone(),
            ..Injection::default()
        };

        for entry in &mut self.entries {
            let next = entry.record.status_at(t);
            if entry.status != next {
                info!(
                    attack_id = %entry.record.id,
                    from = %entry.status,
                    to = %next,
                    t,
                    "attack status changed"
                );
                injection.transitions.push(StatusTransition {
                    attack_id: entry.record.id.clone(),
                    from: entry.status,
                    to: next,
                    t,
                });
                entry.status = next;
            }
        }

        for (signal, &real_value) in real {
            let mut value = real_value;
            for entry in self
                .entries
                .iter_mut()
                .filter(|e| e.status == AttackStatus::Active && &e.record.target_signal == signal)
            {
                let ctx = ApplyContext {
                    step_index,
                    elapsed: t - entry.record.trigger_time,
                };
                match entry.action.apply(&entry.record.id, value, &ctx, &mut self.rng) {
                    Ok(attacked) => value = attacked,
                    Err(error) => {
                        warn!(
                            attack_id = %entry.record.id,
                            signal = %signal,
                            t,
                            %error,
                            "attack handler failed, using real value"
                        );
                        entry.status = AttackStatus::Failed;
                        entry.failures += 1;
                        injection.transitions.push(StatusTransition {
                            attack_id: entry.record.id.clone(),
                            from: AttackStatus::Active,
                            to: AttackStatus::Failed,
                            t,
                        });
                        injection.failures.push(AttackFailure {
                            attack_id: entry.record.id.clone(),
                            target_signal: signal.clone(),
                            t,
                            error,
                        });
                        value = real_value;
                        break;
                    }
                }
            }
            injection.observed.insert(signal.clone(), value);
        }

        injection
    }

    fn entry(&self, attack_id: &str) -> Option<&AttackEntry> {
        self.entries.iter().find(|e| e.record.id == attack_id)
    }
}
