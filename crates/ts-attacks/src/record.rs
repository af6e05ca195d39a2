//! Serialized attack descriptions and lifecycle status.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Supported attack kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttackKind {
    /// Blocks the signal: the observer sees a fixed blocked value.
    #[serde(rename = "dos", alias = "deny_of_service", alias = "denial_of_service")]
    DenyOfService,
    /// Substitutes a fabricated value for the real one.
    #[serde(rename = "false_data_injection", alias = "fdi")]
    FalseDataInjection,
    /// Plays back a recorded sequence, cycling indefinitely.
    #[serde(rename = "replay_attack", alias = "replay")]
    Replay,
    /// Adds an offset growing linearly with time since trigger.
    #[serde(rename = "ramp_attack", alias = "ramp")]
    Ramp,
    /// Adds zero-mean Gaussian noise.
    #[serde(rename = "random_noise", alias = "noise")]
    RandomNoise,
}

impl AttackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DenyOfService => "dos",
            Self::FalseDataInjection => "false_data_injection",
            Self::Replay => "replay_attack",
            Self::Ramp => "ramp_attack",
            Self::RandomNoise => "random_noise",
        }
    }
}

impl fmt::Display for AttackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an attack relative to simulation time.
///
/// `Armed -> Active -> Completed`, recomputed from time at every step.
/// `Failed` marks a step in which the handler could not produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackStatus {
    #[default]
    Armed,
    Active,
    Completed,
    Failed,
}

impl AttackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Armed => "armed",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for AttackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single kind-specific parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Scalar(f64),
    Series(Vec<f64>),
}

impl ParamValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::Series(_) => None,
        }
    }

    pub fn as_series(&self) -> Option<&[f64]> {
        match self {
            Self::Series(values) => Some(values),
            Self::Scalar(_) => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(values: Vec<f64>) -> Self {
        Self::Series(values)
    }
}

/// Kind-specific parameter mapping.
pub type AttackParams = BTreeMap<String, ParamValue>;

/// One scripted attack as stored by the scenario or attack repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackRecord {
    pub id: String,
    #[serde(alias = "attack_type")]
    pub kind: AttackKind,
    pub target_signal: String,
    /// Simulation time (seconds) at which the attack becomes active.
    pub trigger_time: f64,
    /// Active window length in seconds. `None` keeps the attack active forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub parameters: AttackParams,
    #[serde(default)]
    pub status: AttackStatus,
}

impl AttackRecord {
    pub fn new(
        id: impl Into<String>,
        kind: AttackKind,
        target_signal: impl Into<String>,
        trigger_time: f64,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            target_signal: target_signal.into(),
            trigger_time,
            duration: None,
            parameters: AttackParams::new(),
            status: AttackStatus::Armed,
        }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Whether `t` lies in `[trigger_time, trigger_time + duration)`.
    pub fn window_contains(&self, t: f64) -> bool {
        if t < self.trigger_time {
            return false;
        }
        match self.duration {
            Some(duration) => t < self.trigger_time + duration,
            None => true,
        }
    }

    /// Time-driven lifecycle status at simulation time `t`.
    pub fn status_at(&self, t: f64) -> AttackStatus {
        if t < self.trigger_time {
            AttackStatus::Armed
        } else if self.window_contains(t) {
            AttackStatus::Active
        } else {
            AttackStatus::Completed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_half_open_window() {
        let rec = AttackRecord::new("a1", AttackKind::DenyOfService, "tank.level_sensor", 10.0)
            .with_duration(5.0);
        assert_eq!(rec.status_at(9.99), AttackStatus::Armed);
        assert_eq!(rec.status_at(10.0), AttackStatus::Active);
        assert_eq!(rec.status_at(14.99), AttackStatus::Active);
        assert_eq!(rec.status_at(15.0), AttackStatus::Completed);
    }

    #[test]
    fn open_ended_window_never_completes() {
        let rec = AttackRecord::new("a1", AttackKind::Ramp, "tank.level_sensor", 1.0);
        assert_eq!(rec.status_at(1.0e9), AttackStatus::Active);
    }

    #[test]
    fn kind_names_accept_aliases() {
        let kind: AttackKind = serde_json::from_str("\"fdi\"").unwrap();
        assert_eq!(kind, AttackKind::FalseDataInjection);
        let kind: AttackKind = serde_json::from_str("\"replay_attack\"").unwrap();
        assert_eq!(kind, AttackKind::Replay);
        assert_eq!(
            serde_json::to_string(&AttackKind::DenyOfService).unwrap(),
            "\"dos\""
        );
    }

    #[test]
    fn record_deserializes_with_defaults() {
        let json = r#"{
            "id": "r1",
            "attack_type": "replay",
            "target_signal": "tank.level_sensor",
            "trigger_time": 0.0,
            "parameters": { "replay_buffer": [1.0, 2.0, 3.0] }
        }"#;
        let rec: AttackRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.kind, AttackKind::Replay);
        assert_eq!(rec.duration, None);
        assert_eq!(rec.status, AttackStatus::Armed);
        assert_eq!(
            rec.parameters["replay_buffer"].as_series(),
            Some(&[1.0, 2.0, 3.0][..])
        );
    }
}
