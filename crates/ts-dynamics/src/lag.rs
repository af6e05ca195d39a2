//! First-order lag with optional rate limiting.

use crate::error::{DynamicsError, DynamicsResult};

/// First-order positioner (e.g., a valve following its command).
///
/// Dynamics: dpos/dt = (target - pos) / tau, optionally clamped to
/// [-rate_limit, rate_limit].
#[derive(Clone, Debug, PartialEq)]
pub struct FirstOrderLag {
    /// Time constant (seconds)
    pub tau: f64,
    /// Rate limit (1/second)
    pub rate_limit: Option<f64>,
}

impl FirstOrderLag {
    pub fn new(tau: f64) -> DynamicsResult<Self> {
        if !(tau.is_finite() && tau > 0.0) {
            return Err(DynamicsError::InvalidParameter {
                name: "tau",
                value: tau,
                reason: "must be positive",
            });
        }
        Ok(Self {
            tau,
            rate_limit: None,
        })
    }

    pub fn with_rate_limit(mut self, rate_limit: f64) -> DynamicsResult<Self> {
        if !(rate_limit.is_finite() && rate_limit > 0.0) {
            return Err(DynamicsError::InvalidParameter {
                name: "rate_limit",
                value: rate_limit,
                reason: "must be positive",
            });
        }
        self.rate_limit = Some(rate_limit);
        Ok(self)
    }

    /// Position derivative given current position and target.
    pub fn derivative(&self, position: f64, target: f64) -> f64 {
        let raw = (target - position) / self.tau;
        match self.rate_limit {
            Some(limit) => raw.clamp(-limit, limit),
            None => raw,
        }
    }
}
