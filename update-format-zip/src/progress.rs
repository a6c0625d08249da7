/// Receives fractional progress of a verification pass.
///
/// Within one verification the observed values are non-decreasing and stay
/// inside `[0.0, 1.0]`.
pub trait Progress {
    fn set(&mut self, fraction: f64);
}

/// Sink for callers that do not surface progress.
pub struct NullProgress;

impl Progress for NullProgress {
    fn set(&mut self, _fraction: f64) {}
}
