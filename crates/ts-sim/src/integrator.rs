//! Fixed-step time integrators.

use ts_model::IntegrationMethod;

use crate::error::SimResult;
use crate::model::TransientModel;

/// Trait for time integrators.
pub trait Integrator {
    /// Advance state by one time step using the transient model.
    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State>;
}

/// Classical RK4 (Runge-Kutta 4th order) integrator.
#[derive(Clone, Debug)]
pub struct RK4;

impl Integrator for RK4 {
    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        let k1 = model.rhs(t, x)?;

        let x2 = model.add(x, &model.scale(&k1, 0.5 * dt));
        let k2 = model.rhs(t + 0.5 * dt, &x2)?;

        let x3 = model.add(x, &model.scale(&k2, 0.5 * dt));
        let k3 = model.rhs(t + 0.5 * dt, &x3)?;

        let x4 = model.add(x, &model.scale(&k3, dt));
        let k4 = model.rhs(t + dt, &x4)?;

        // Combine: x_new = x + (dt/6) * (k1 + 2*k2 + 2*k3 + k4)
        let k_sum = model.add(
            &model.add(&k1, &model.scale(&k2, 2.0)),
            &model.add(&model.scale(&k3, 2.0), &k4),
        );

        Ok(model.add(x, &model.scale(&k_sum, dt / 6.0)))
    }
}

/// Forward Euler (explicit, 1st order).
/// Calls rhs() once per step instead of 4 times (RK4).
#[derive(Clone, Debug)]
pub struct ForwardEuler;

impl Integrator for ForwardEuler {
    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        let xdot = model.rhs(t, x)?;
        Ok(model.add(x, &model.scale(&xdot, dt)))
    }
}

/// Integrator selection, fixed for the lifetime of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IntegratorType {
    /// 4th-order Runge-Kutta (default, 4 rhs calls per step).
    #[default]
    RK4,
    /// Forward Euler (1st-order, 1 rhs call per step).
    ForwardEuler,
}

impl From<IntegrationMethod> for IntegratorType {
    fn from(method: IntegrationMethod) -> Self {
        match method {
            IntegrationMethod::Euler => IntegratorType::ForwardEuler,
            IntegrationMethod::Rk4 => IntegratorType::RK4,
        }
    }
}

impl IntegratorType {
    pub fn step<M: TransientModel>(
        self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        match self {
            IntegratorType::RK4 => RK4.step(model, t, x, dt),
            IntegratorType::ForwardEuler => ForwardEuler.step(model, t, x, dt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// dx/dt = -k x, exact solution x0 * exp(-k t).
    struct Decay {
        k: f64,
        calls: usize,
    }

    impl TransientModel for Decay {
        type State = f64;

        fn rhs(&mut self, _t: f64, x: &f64) -> SimResult<f64> {
            self.calls += 1;
            Ok(-self.k * x)
        }

        fn add(&self, a: &f64, b: &f64) -> f64 {
            a + b
        }

        fn scale(&self, a: &f64, scale: f64) -> f64 {
            a * scale
        }
    }

    fn integrate(kind: IntegratorType, dt: f64, t_end: f64) -> f64 {
        let mut model = Decay { k: 0.5, calls: 0 };
        let steps = (t_end / dt).round() as usize;
        let mut x = 1.0;
        for i in 0..steps {
            x = kind.step(&mut model, i as f64 * dt, &x, dt).unwrap();
        }
        x
    }

    #[test]
    fn rhs_call_counts() {
        let mut model = Decay { k: 1.0, calls: 0 };
        RK4.step(&mut model, 0.0, &1.0, 0.1).unwrap();
        assert_eq!(model.calls, 4);
        ForwardEuler.step(&mut model, 0.0, &1.0, 0.1).unwrap();
        assert_eq!(model.calls, 5);
    }

    #[test]
    fn euler_single_step() {
        let mut model = Decay { k: 2.0, calls: 0 };
        let x = ForwardEuler.step(&mut model, 0.0, &1.0, 0.1).unwrap();
        assert!((x - 0.8).abs() < 1e-12);
    }

    #[test]
    fn rk4_matches_exponential() {
        let exact = (-0.5f64 * 2.0).exp();
        let x = integrate(IntegratorType::RK4, 0.1, 2.0);
        assert!((x - exact).abs() < 1e-7);
    }

    #[test]
    fn convergence_orders() {
        let exact = (-0.5f64 * 2.0).exp();
        let e1 = (integrate(IntegratorType::ForwardEuler, 0.1, 2.0) - exact).abs();
        let e2 = (integrate(IntegratorType::ForwardEuler, 0.05, 2.0) - exact).abs();
        let euler_ratio = e1 / e2;
        assert!((1.8..2.2).contains(&euler_ratio), "euler ratio {euler_ratio}");

        let r1 = (integrate(IntegratorType::RK4, 0.2, 2.0) - exact).abs();
        let r2 = (integrate(IntegratorType::RK4, 0.1, 2.0) - exact).abs();
        let rk4_ratio = r1 / r2;
        assert!((14.0..18.0).contains(&rk4_ratio), "rk4 ratio {rk4_ratio}");
    }

    #[test]
    fn method_mapping() {
        assert_eq!(
            IntegratorType::from(IntegrationMethod::Euler),
            IntegratorType::ForwardEuler
        );
        assert_eq!(IntegratorType::from(IntegrationMethod::Rk4), IntegratorType::RK4);
    }
}
