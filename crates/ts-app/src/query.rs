//! Query helpers for extracting data from loaded runs.

use std::collections::{BTreeMap, BTreeSet};

use ts_sim::TelemetryRecord;

use crate::error::{AppError, AppResult};

/// Summary of a run's time range and data.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub time_range: (f64, f64),
    pub record_count: usize,
    pub signal_names: Vec<String>,
    /// Steps during which at least one attack was active.
    pub attacked_steps: usize,
    /// Largest |observed - real| over all signals and steps.
    pub max_deviation: f64,
    pub attack_ids: Vec<String>,
    pub signals: Vec<SignalSummary>,
}

/// Attack exposure of one sensor signal.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSummary {
    pub name: String,
    pub attacked_steps: usize,
    pub max_deviation: f64,
}

/// Which view of a signal to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    /// Ground truth from the plant.
    Real,
    /// What the controller saw after attacks.
    Observed,
    /// Actuator command.
    Control,
}

pub fn get_run_summary(records: &[TelemetryRecord]) -> AppResult<RunSummary> {
    if records.is_empty() {
        return Err(AppError::InvalidInput("No records in run".to_string()));
    }

    let t_min = records.first().map(|r| r.timestamp).unwrap_or(0.0);
    let t_max = records.last().map(|r| r.timestamp).unwrap_or(0.0);

    let mut attack_ids = BTreeSet::new();
    let mut attacked_steps = 0;
    let mut max_deviation = 0.0_f64;
    let mut per_signal: BTreeMap<&str, SignalSummary> = BTreeMap::new();
    for record in records {
        if !record.active_attacks.is_empty() {
            attacked_steps += 1;
        }
        attack_ids.extend(record.active_attacks.iter().map(|a| a.id.clone()));
        for name in record.real_signals.keys() {
            let entry = per_signal
                .entry(name.as_str())
                .or_insert_with(|| SignalSummary {
                    name: name.clone(),
                    attacked_steps: 0,
                    max_deviation: 0.0,
                });
            if record.is_attacked(name) {
                entry.attacked_steps += 1;
            }
            if let Some(dev) = record.deviation(name) {
                entry.max_deviation = entry.max_deviation.max(dev.abs());
                max_deviation = max_deviation.max(dev.abs());
            }
        }
    }

    Ok(RunSummary {
        time_range: (t_min, t_max),
        record_count: records.len(),
        signal_names: list_signal_names(records),
        attacked_steps,
        max_deviation,
        attack_ids: attack_ids.into_iter().collect(),
        signals: per_signal.into_values().collect(),
    })
}

/// Sensor signal names present in a run.
pub fn list_signal_names(records: &[TelemetryRecord]) -> Vec<String> {
    if let Some(first) = records.first() {
        first.real_signals.keys().cloned().collect()
    } else {
        Vec::new()
    }
}

/// Extract `(t, value)` pairs for one signal.
///
/// Records that lack the signal are skipped; a name that never appears is
/// an error.
pub fn extract_signal_series(
    records: &[TelemetryRecord],
    signal: &str,
    kind: SeriesKind,
) -> AppResult<Vec<(f64, f64)>> {
    let series: Vec<(f64, f64)> = records
        .iter()
        .filter_map(|record| {
            let values = match kind {
                SeriesKind::Real => &record.real_signals,
                SeriesKind::Observed => &record.observed_signals,
                SeriesKind::Control => &record.control_actions,
            };
            values.get(signal).map(|v| (record.timestamp, *v))
        })
        .collect();

    if series.is_empty() && !records.is_empty() {
        return Err(AppError::InvalidInput(format!(
            "Unknown {} signal: {}",
            match kind {
                SeriesKind::Real => "real",
                SeriesKind::Observed => "observed",
                SeriesKind::Control => "control",
            },
            signal
        )));
    }
    Ok(series)
}
