//! Named value maps shared by plugins, controllers and the attack injector.
//!
//! Ordered maps keep iteration (and therefore telemetry and RNG draw order)
//! deterministic across runs.

use std::collections::BTreeMap;

use crate::{CoreError, CoreResult, Real};

/// State-variable name -> value.
pub type StateMap = BTreeMap<String, Real>;
/// Signal name (`<component>.<measurement>`) -> value.
pub type SignalMap = BTreeMap<String, Real>;
/// Manipulated-variable name -> value.
pub type ControlMap = BTreeMap<String, Real>;

/// Split a namespaced signal name into `(component, measurement)`.
pub fn split_signal_name(name: &str) -> CoreResult<(&str, &str)> {
    match name.split_once('.') {
        Some((component, measurement)) if !component.is_empty() && !measurement.is_empty() => {
            Ok((component, measurement))
        }
        _ => Err(CoreError::InvalidSignalName {
            name: name.to_string(),
        }),
    }
}

/// First non-finite entry of a map, if any.
pub fn first_non_finite(values: &BTreeMap<String, Real>) -> Option<(&str, Real)> {
    values
        .iter()
        .find(|(_, v)| !v.is_finite())
        .map(|(k, v)| (k.as_str(), *v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_valid_name() {
        assert_eq!(
            split_signal_name("tank.level_sensor").unwrap(),
            ("tank", "level_sensor")
        );
        // Only the first dot separates the component.
        assert_eq!(
            split_signal_name("plant.tank.level").unwrap(),
            ("plant", "tank.level")
        );
    }

    #[test]
    fn split_rejects_unqualified_names() {
        assert!(split_signal_name("level").is_err());
        assert!(split_signal_name(".level").is_err());
        assert!(split_signal_name("tank.").is_err());
    }

    #[test]
    fn detects_non_finite_entries() {
        let mut m = StateMap::new();
        m.insert("a".into(), 1.0);
        assert!(first_non_finite(&m).is_none());
        m.insert("b".into(), Real::INFINITY);
        assert_eq!(first_non_finite(&m).map(|(k, _)| k), Some("b"));
    }
}
