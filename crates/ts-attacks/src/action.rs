//! Typed corruption rules built from validated attack records.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::debug;
use ts_core::split_signal_name;

use crate::error::{AttackError, AttackResult};
use crate::record::{AttackKind, AttackRecord};

/// Per-application inputs supplied by the injector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApplyContext {
    /// Global simulation step index.
    pub step_index: u64,
    /// Simulation time elapsed since the attack's trigger time (seconds).
    pub elapsed: f64,
}

/// Validated attack behaviour.
#[derive(Debug, Clone)]
pub enum AttackAction {
    DenyOfService { blocked_value: f64 },
    FalseData { false_value: f64 },
    Replay { buffer: Vec<f64> },
    Ramp { rate: f64 },
    RandomNoise { noise: Normal<f64> },
}

impl AttackAction {
    /// Validate a record and build its action.
    ///
    /// Validation is kind-specific and also covers the record's identifier,
    /// target signal and time window.
    pub fn from_record(record: &AttackRecord) -> AttackResult<Self> {
        validate_header(record)?;

        let action = match record.kind {
            AttackKind::DenyOfService => {
                let blocked_value = optional_scalar(record, "blocked_value")?.unwrap_or(0.0);
                Self::DenyOfService { blocked_value }
            }
            AttackKind::FalseDataInjection => Self::FalseData {
                false_value: required_scalar(record, "false_value")?,
            },
            AttackKind::Replay => Self::Replay {
                buffer: required_series(record, "replay_buffer")?,
            },
            AttackKind::Ramp => Self::Ramp {
                rate: required_scalar(record, "rate")?,
            },
            AttackKind::RandomNoise => {
                let std_dev = required_scalar(record, "noise_std")?;
                if std_dev < 0.0 {
                    return Err(AttackError::InvalidParameter {
                        attack_id: record.id.clone(),
                        name: "noise_std",
                        reason: format!("must be non-negative, got {std_dev}"),
                    });
                }
                let noise = Normal::new(0.0, std_dev).map_err(|e| AttackError::InvalidParameter {
                    attack_id: record.id.clone(),
                    name: "noise_std",
                    reason: e.to_string(),
                })?;
                Self::RandomNoise { noise }
            }
        };
        Ok(action)
    }

    pub fn kind(&self) -> AttackKind {
        match self {
            Self::DenyOfService { .. } => AttackKind::DenyOfService,
            Self::FalseData { .. } => AttackKind::FalseDataInjection,
            Self::Replay { .. } => AttackKind::Replay,
            Self::Ramp { .. } => AttackKind::Ramp,
            Self::RandomNoise { .. } => AttackKind::RandomNoise,
        }
    }

    /// Corrupt `value` according to this action.
    ///
    /// `attack_id` is only used to label errors and log lines.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        attack_id: &str,
        value: f64,
        ctx: &ApplyContext,
        rng: &mut R,
    ) -> AttackResult<f64> {
        let attacked = match self {
            Self::DenyOfService { blocked_value } => *blocked_value,
            Self::FalseData { false_value } => *false_value,
            Self::Replay { buffer } => {
                if buffer.is_empty() {
                    return Err(AttackError::InvalidParameter {
                        attack_id: attack_id.to_string(),
                        name: "replay_buffer",
                        reason: "buffer is empty".to_string(),
                    });
                }
                let index = (ctx.step_index % buffer.len() as u64) as usize;
                buffer[index]
            }
            Self::Ramp { rate } => value + rate * ctx.elapsed,
            Self::RandomNoise { noise } => value + noise.sample(rng),
        };

        if !attacked.is_finite() {
            return Err(AttackError::NonFiniteOutput {
                attack_id: attack_id.to_string(),
                value: attacked,
            });
        }

        debug!(
            attack_id,
            kind = %self.kind(),
            real = value,
            attacked,
            "attack applied"
        );
        Ok(attacked)
    }
}

fn validate_header(record: &AttackRecord) -> AttackResult<()> {
    if record.id.trim().is_empty() {
        return Err(AttackError::Empty {
            attack_id: record.id.clone(),
            what: "id",
        });
    }
    if record.target_signal.trim().is_empty() {
        return Err(AttackError::Empty {
            attack_id: record.id.clone(),
            what: "target_signal",
        });
    }
    if let Err(err) = split_signal_name(&record.target_signal) {
        return Err(AttackError::InvalidParameter {
            attack_id: record.id.clone(),
            name: "target_signal",
            reason: err.to_string(),
        });
    }
    if !record.trigger_time.is_finite() || record.trigger_time < 0.0 {
        return Err(AttackError::InvalidTiming {
            attack_id: record.id.clone(),
            reason: format!(
                "trigger_time must be finite and >= 0, got {}",
                record.trigger_time
            ),
        });
    }
    if let Some(duration) = record.duration {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(AttackError::InvalidTiming {
                attack_id: record.id.clone(),
                reason: format!("duration must be finite and > 0, got {duration}"),
            });
        }
    }
    Ok(())
}

fn optional_scalar(record: &AttackRecord, name: &'static str) -> AttackResult<Option<f64>> {
    let Some(value) = record.parameters.get(name) else {
        return Ok(None);
    };
    let scalar = value
        .as_scalar()
        .ok_or_else(|| AttackError::InvalidParameter {
            attack_id: record.id.clone(),
            name,
            reason: "expected a number".to_string(),
        })?;
    if !scalar.is_finite() {
        return Err(AttackError::InvalidParameter {
            attack_id: record.id.clone(),
            name,
            reason: format!("must be finite, got {scalar}"),
        });
    }
    Ok(Some(scalar))
}

fn required_scalar(record: &AttackRecord, name: &'static str) -> AttackResult<f64> {
    optional_scalar(record, name)?.ok_or_else(|| AttackError::MissingParameter {
        attack_id: record.id.clone(),
        kind: record.kind,
        name,
    })
}

fn required_series(record: &AttackRecord, name: &'static str) -> AttackResult<Vec<f64>> {
    let value = record
        .parameters
        .get(name)
        .ok_or_else(|| AttackError::MissingParameter {
            attack_id: record.id.clone(),
            kind: record.kind,
            name,
        })?;
    let series = value
        .as_series()
        .ok_or_else(|| AttackError::InvalidParameter {
            attack_id: record.id.clone(),
            name,
            reason: "expected a list of numbers".to_string(),
        })?;
    if series.is_empty() {
        return Err(AttackError::InvalidParameter {
            attack_id: record.id.clone(),
            name,
            reason: "must not be empty".to_string(),
        });
    }
    if let Some(bad) = series.iter().find(|v| !v.is_finite()) {
        return Err(AttackError::InvalidParameter {
            attack_id: record.id.clone(),
            name,
            reason: format!("contains non-finite value {bad}"),
        });
    }
    Ok(series.to_vec())
}
