//! TransientModel trait and the adapter that exposes a dynamics plugin to
//! the integrators.

use nalgebra::DVector;
use ts_core::ControlMap;
use ts_dynamics::DynamicsPlugin;
use ts_model::ModelDefinition;

use crate::error::{SimError, SimResult};
use crate::layout::StateLayout;

/// Trait for systems advanced by a fixed-step integrator.
///
/// A TransientModel must implement:
/// - RHS computation: x_dot = f(t, x)
/// - Scalar field arithmetic for integration: add states, scale by scalar
pub trait TransientModel {
    /// State type (must be Clone).
    type State: Clone;

    /// Compute state derivative dxdt = f(t, x).
    fn rhs(&mut self, t: f64, x: &Self::State) -> SimResult<Self::State>;

    /// Add two states element-wise: result = a + b.
    fn add(&self, a: &Self::State, b: &Self::State) -> Self::State;

    /// Scale a state by a scalar: result = scale * a.
    fn scale(&self, a: &Self::State, scale: f64) -> Self::State;
}

/// Plugin derivatives with the control action held constant.
///
/// Every stage of a multi-stage step sees the same `control`; it is not
/// re-derived from intermediate states.
pub struct PluginRhs<'a> {
    pub plugin: &'a dyn DynamicsPlugin,
    pub model: &'a ModelDefinition,
    pub control: &'a ControlMap,
    pub layout: &'a StateLayout,
}

impl TransientModel for PluginRhs<'_> {
    type State = DVector<f64>;

    fn rhs(&mut self, t: f64, x: &DVector<f64>) -> SimResult<DVector<f64>> {
        let state = self.layout.to_map(x);
        let derivatives = self
            .plugin
            .derivatives(t, &state, self.control, self.model)?;
        if let Some((name, value)) = ts_core::first_non_finite(&derivatives) {
            return Err(SimError::NonFinite {
                what: format!("derivative d{name}/dt"),
                value,
                t,
            });
        }
        self.layout.to_vector(&derivatives)
    }

    fn add(&self, a: &DVector<f64>, b: &DVector<f64>) -> DVector<f64> {
        a + b
    }

    fn scale(&self, a: &DVector<f64>, scale: f64) -> DVector<f64> {
        a * scale
    }
}
