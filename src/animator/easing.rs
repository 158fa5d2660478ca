//! Easing curves used by window transitions.

/// Cubic ease-out: `1 - (1 - t)^3`.
///
/// Input is clamped to `[0, 1]`, so `ease_out_cubic(0.0) == 0.0` and
/// `ease_out_cubic(1.0) == 1.0` exactly. Non-finite input maps to `NaN`, which
/// the frame validator rejects.
pub fn ease_out_cubic(progress: f64) -> f64 {
    if !progress.is_finite() {
        return f64::NAN;
    }
    let t = progress.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Progress of `step` out of `steps`, in `[0, 1]`.
pub fn progress(step: u32, steps: u32) -> f64 {
    if steps == 0 {
        return 1.0;
    }
    f64::from(step.min(steps)) / f64::from(steps)
}

/// Linear interpolation between two integer coordinates.
pub fn lerp(start: i32, end: i32, eased: f64) -> f64 {
    let start = f64::from(start);
    start + (f64::from(end) - start) * eased
}
