//! Finite, restartable frame generators for window transitions.

use super::easing::{ease_out_cubic, lerp, progress};
use super::geometry::{GeometryLimits, WindowBounds};
use crate::error::{Error, Result};
use std::time::Duration;

/// An eased transition between two bounds.
///
/// Immutable once an animation begins; `step_delay = duration / steps`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationSpec {
    pub start: WindowBounds,
    pub end: WindowBounds,
    pub duration: Duration,
    pub steps: u32,
}

impl AnimationSpec {
    /// Create a spec; `steps` must be at least 1.
    pub fn new(
        start: WindowBounds,
        end: WindowBounds,
        duration: Duration,
        steps: u32,
    ) -> Result<Self> {
        if steps == 0 {
            return Err(Error::invalid_input("animation needs at least one step"));
        }
        Ok(Self {
            start,
            end,
            duration,
            steps,
        })
    }

    /// Same as [`AnimationSpec::new`] with a millisecond duration.
    pub fn from_millis(
        start: WindowBounds,
        end: WindowBounds,
        duration_ms: u64,
        steps: u32,
    ) -> Result<Self> {
        Self::new(start, end, Duration::from_millis(duration_ms), steps)
    }

    /// Delay between two consecutive frames.
    pub fn step_delay(&self) -> Duration {
        self.duration / self.steps
    }

    /// First step whose elapsed time reaches `offset`, capped at the last step.
    pub fn step_at(&self, offset: Duration) -> u32 {
        let delay = self.step_delay();
        if delay.is_zero() {
            return 0;
        }
        let step = (offset.as_secs_f64() / delay.as_secs_f64()).ceil();
        (step as u32).min(self.steps)
    }

    /// Frame for `step` in `[0, steps]`.
    ///
    /// The first frame is exactly `start` and the last exactly `end`; every
    /// frame is checked against `limits`.
    pub fn frame(&self, step: u32, limits: GeometryLimits) -> Result<WindowBounds> {
        if step > self.steps {
            return Err(Error::invalid_input(format!(
                "step {} beyond last step {}",
                step, self.steps
            )));
        }
        let eased = ease_out_cubic(progress(step, self.steps));
        WindowBounds::from_f64(
            lerp(self.start.x, self.end.x, eased),
            lerp(self.start.y, self.end.y, eased),
            lerp(self.start.width, self.end.width, eased),
            lerp(self.start.height, self.end.height, eased),
            limits,
        )
    }

    /// Iterate every frame in order.
    pub fn frames(self, limits: GeometryLimits) -> StepIter {
        StepIter::new(self, limits)
    }
}

/// A single frame produced by [`StepIter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub step: u32,
    pub bounds: WindowBounds,
}

/// Yields `steps + 1` frames in strictly increasing step order.
///
/// A frame that fails validation is yielded once as an error and the
/// iterator is exhausted afterwards: invalid geometry truncates, never skips.
#[derive(Debug, Clone)]
pub struct StepIter {
    spec: AnimationSpec,
    limits: GeometryLimits,
    next: u32,
    halted: bool,
}

impl StepIter {
    pub fn new(spec: AnimationSpec, limits: GeometryLimits) -> Self {
        Self {
            spec,
            limits,
            next: 0,
            halted: false,
        }
    }

    pub fn spec(&self) -> &AnimationSpec {
        &self.spec
    }

    /// Step index the next call to `next` will produce.
    pub fn next_step(&self) -> u32 {
        self.next
    }

    /// Whether any frame has been produced yet.
    pub fn started(&self) -> bool {
        self.next > 0
    }

    pub fn is_done(&self) -> bool {
        self.halted || self.next > self.spec.steps
    }

    /// Continue from `step`; frames before it are never produced.
    pub fn seek(&mut self, step: u32) {
        self.next = step.min(self.spec.steps.saturating_add(1));
    }

    /// Stop producing frames.
    pub fn halt(&mut self) {
        self.halted = true;
    }

}

impl Iterator for StepIter {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_done() {
            return None;
        }
        let step = self.next;
        match self.spec.frame(step, self.limits) {
            Ok(bounds) => {
                self.next += 1;
                Some(Ok(Frame { step, bounds }))
            }
            Err(e) => {
                self.halted = true;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.is_done() {
            (0, Some(0))
        } else {
            let remaining = u64::from(self.spec.steps) - u64::from(self.next) + 1;
            (0, usize::try_from(remaining).ok())
        }
    }
}
