//! Fixed ordering between named state maps and solver vectors.

use nalgebra::DVector;
use ts_core::StateMap;

use crate::error::{SimError, SimResult};

/// State-variable order for one run, fixed at initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLayout {
    names: Vec<String>,
}

impl StateLayout {
    pub fn from_state(state: &StateMap) -> SimResult<Self> {
        if state.is_empty() {
            return Err(SimError::StateMismatch {
                what: "model produced no state variables".to_string(),
            });
        }
        Ok(Self {
            names: state.keys().cloned().collect(),
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Pack a map into a vector. The map must hold exactly the layout's keys.
    pub fn to_vector(&self, values: &StateMap) -> SimResult<DVector<f64>> {
        if values.len() != self.names.len() {
            return Err(SimError::StateMismatch {
                what: format!(
                    "expected {} entries ({}), got {}",
                    self.names.len(),
                    self.names.join(", "),
                    values.len()
                ),
            });
        }
        let mut v = DVector::zeros(self.names.len());
        for (i, name) in self.names.iter().enumerate() {
            v[i] = *values.get(name).ok_or_else(|| SimError::StateMismatch {
                what: format!("missing '{name}'"),
            })?;
        }
        Ok(v)
    }

    pub fn to_map(&self, v: &DVector<f64>) -> StateMap {
        self.names
            .iter()
            .zip(v.iter())
            .map(|(name, value)| (name.clone(), *value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_vector_round_trip() {
        let state = StateMap::from([("b".to_string(), 2.0), ("a".to_string(), 1.0)]);
        let layout = StateLayout::from_state(&state).unwrap();
        assert_eq!(layout.names(), ["a", "b"]);
        let v = layout.to_vector(&state).unwrap();
        assert_eq!(v.as_slice(), &[1.0, 2.0]);
        assert_eq!(layout.to_map(&v), state);
    }

    #[test]
    fn mismatched_keys_are_rejected() {
        let layout = StateLayout::from_state(&StateMap::from([("h".to_string(), 1.0)])).unwrap();
        let wrong = StateMap::from([("x".to_string(), 1.0)]);
        assert!(layout.to_vector(&wrong).is_err());
        let extra = StateMap::from([("h".to_string(), 1.0), ("x".to_string(), 1.0)]);
        assert!(layout.to_vector(&extra).is_err());
    }

    #[test]
    fn empty_state_is_rejected() {
        assert!(StateLayout::from_state(&StateMap::new()).is_err());
    }
}
