use crate::CoreError;

/// Floating point type used throughout system
pub type Real = f64;

/// Number of fixed steps needed to cover `duration` with step `dt`.
///
/// A trailing fraction of a step smaller than `1e-9 * dt` is ignored so that
/// e.g. `duration = 1.0, dt = 0.1` yields exactly 10 steps.
pub fn step_count(duration: Real, dt: Real) -> Result<u64, CoreError> {
    if !(dt > 0.0) || !dt.is_finite() {
        return Err(CoreError::InvalidArg {
            what: "dt must be positive and finite",
        });
    }
    if !(duration > 0.0) || !duration.is_finite() {
        return Err(CoreError::InvalidArg {
            what: "duration must be positive and finite",
        });
    }
    let steps = (duration / dt - 1e-9).ceil().max(1.0);
    Ok(steps as u64)
}
