//! Window animator.
//!
//! Owns the overlay window handle and moves it between the collapsed
//! off-screen position and the target geometry of the current mode. Every
//! transition is a [`StepIter`]; the caller drives it by sleeping for
//! [`WindowAnimator::next_delay`] and calling [`WindowAnimator::tick`], so the
//! animator never touches a timer itself and is fully testable without one.

use super::geometry::{OverlayLayout, OverlayMode, WindowBounds};
use super::steps::{AnimationSpec, StepIter};
use super::window::WindowHandle;
use crate::config::{AnimationConfig, WindowConfig};
use crate::error::Result;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Advisory visual cues for the content rendered inside the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlaySignal {
    FadeIn,
    FadeOut,
}

/// Whether the overlay is considered on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Hidden,
    Visible,
}

/// The transition currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationKind {
    SlideIn,
    SlideOut,
    Resize,
}

/// Result of a single [`WindowAnimator::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing was in flight.
    Idle,
    /// A frame was applied and more follow.
    Stepped { step: u32 },
    /// The last frame was applied.
    Finished(AnimationKind),
    /// The animation was aborted on invalid geometry or a window error.
    Halted(AnimationKind),
}

#[derive(Debug)]
struct ActiveAnimation {
    kind: AnimationKind,
    frames: StepIter,
    /// Wait before the first frame, consumed by the first tick.
    settle: Option<Duration>,
    /// Step at which the fade-in cue fires; cleared once sent.
    fade_in_step: Option<u32>,
}

/// Mutable animator state.
#[derive(Debug, Default)]
pub struct AnimatorState {
    visibility: Visibility,
    mode: OverlayMode,
    active: Option<ActiveAnimation>,
}

/// Drives the overlay window through eased transitions.
pub struct WindowAnimator<W: WindowHandle> {
    window: W,
    layout: OverlayLayout,
    timing: AnimationConfig,
    state: AnimatorState,
    signal_tx: mpsc::UnboundedSender<OverlaySignal>,
}

impl<W: WindowHandle> WindowAnimator<W> {
    /// Create an animator for a hidden window.
    pub fn new(
        window: W,
        window_config: WindowConfig,
        timing: AnimationConfig,
        signal_tx: mpsc::UnboundedSender<OverlaySignal>,
    ) -> Self {
        Self {
            window,
            layout: OverlayLayout::new(window_config),
            timing,
            state: AnimatorState::default(),
            signal_tx,
        }
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }

    pub fn layout(&self) -> &OverlayLayout {
        &self.layout
    }

    pub fn visibility(&self) -> Visibility {
        self.state.visibility
    }

    pub fn mode(&self) -> OverlayMode {
        self.state.mode
    }

    pub fn is_animating(&self) -> bool {
        self.state.active.is_some()
    }

    pub fn active_kind(&self) -> Option<AnimationKind> {
        self.state.active.as_ref().map(|a| a.kind)
    }

    /// Visible and not on its way out.
    pub fn is_shown(&self) -> bool {
        self.state.visibility == Visibility::Visible
            && self.active_kind() != Some(AnimationKind::SlideOut)
    }

    /// How long the driver should wait before the next [`tick`](Self::tick).
    pub fn next_delay(&self) -> Option<Duration> {
        let active = self.state.active.as_ref()?;
        Some(
            active
                .settle
                .unwrap_or_else(|| active.frames.spec().step_delay()),
        )
    }

    /// Slide from the collapsed off-screen position to the target for `mode`.
    pub fn slide_in(&mut self, mode: OverlayMode) -> Result<()> {
        if !self.window.is_visible() {
            self.window.show()?;
        }
        self.state.visibility = Visibility::Visible;
        self.start_slide_in(mode, None)
    }

    /// Slide from the current bounds to the collapsed off-screen position for
    /// `mode`, then hide the window.
    pub fn slide_out(&mut self, mode: OverlayMode) -> Result<()> {
        let work_area = self.window.work_area_width();
        let spec = AnimationSpec::from_millis(
            self.window.bounds(),
            self.layout.offscreen(mode, work_area),
            self.timing.slide_out_duration_ms,
            self.timing.slide_out_steps,
        )?;

        info!(
            "Sliding out from {} to {} ({} mode)",
            spec.start, spec.end, mode
        );
        self.emit(OverlaySignal::FadeOut);
        self.begin(ActiveAnimation {
            kind: AnimationKind::SlideOut,
            frames: spec.frames(self.layout.limits()),
            settle: None,
            fade_in_step: None,
        });
        Ok(())
    }

    /// Ease from the window's current bounds to `target`.
    pub fn resize_to(&mut self, target: WindowBounds, duration_ms: u64) -> Result<()> {
        let start = self.window.bounds();
        let spec =
            AnimationSpec::from_millis(start, target, duration_ms, self.timing.resize_steps)?;

        debug!("Resizing from {} to {}", start, target);
        self.begin(ActiveAnimation {
            kind: AnimationKind::Resize,
            frames: spec.frames(self.layout.limits()),
            settle: None,
            fade_in_step: None,
        });
        Ok(())
    }

    /// VISIBLE slides out; HIDDEN shows the window and slides in after the
    /// settle delay. A window still sliding out reverses without settling.
    pub fn toggle_visibility(&mut self) -> Result<()> {
        let mode = self.state.mode;
        if self.is_shown() {
            return self.slide_out(mode);
        }

        let settle = if self.window.is_visible() {
            None
        } else {
            self.window.show()?;
            Some(Duration::from_millis(self.timing.settle_delay_ms))
        };
        self.state.visibility = Visibility::Visible;
        self.start_slide_in(mode, settle)
    }

    /// Switch target geometry. Resizes when shown, otherwise only records the
    /// mode for the next slide-in. Returns whether the mode changed.
    pub fn set_mode(&mut self, mode: OverlayMode) -> Result<bool> {
        if mode == self.state.mode {
            return Ok(false);
        }
        info!("Switching overlay to {} mode", mode);
        self.state.mode = mode;

        if self.is_shown() {
            let target = self.layout.target(mode, self.window.work_area_width());
            self.resize_to(target, self.timing.resize_duration_ms)?;
        }
        Ok(true)
    }

    /// Re-centre after the display work area changed.
    ///
    /// An in-flight animation keeps its remaining step count and timing but
    /// is re-aimed at the geometry for the new work area.
    pub fn on_display_metrics_changed(&mut self) -> Result<()> {
        if !self.window.is_visible() {
            return Ok(());
        }
        let work_area = self.window.work_area_width();
        let mode = self.state.mode;
        let current = self.window.bounds();
        let limits = self.layout.limits();

        let Some(active) = self.state.active.as_mut() else {
            let target = self.layout.target(mode, work_area);
            debug!("Display changed, re-centring at x={}", target.x);
            return self.window.set_position(target.x, 0);
        };

        let end = match active.kind {
            AnimationKind::SlideOut => self.layout.offscreen(mode, work_area),
            AnimationKind::SlideIn | AnimationKind::Resize => self.layout.target(mode, work_area),
        };
        let old = *active.frames.spec();

        if !active.frames.started() {
            let start = match active.kind {
                AnimationKind::SlideIn => self.layout.offscreen(mode, work_area),
                AnimationKind::SlideOut | AnimationKind::Resize => current,
            };
            let spec = AnimationSpec::new(start, end, old.duration, old.steps)?;
            active.frames = spec.frames(limits);
        } else {
            // Frame 0 of the new spec is where the window already is.
            let done = active.frames.next_step() - 1;
            let remaining = old.steps.saturating_sub(done).max(1);
            let spec =
                AnimationSpec::new(current, end, old.step_delay() * remaining, remaining)?;
            active.frames = spec.frames(limits);
            active.frames.seek(1);
            active.fade_in_step = active.fade_in_step.map(|at| at.saturating_sub(done));
        }
        debug!("Display changed, {:?} re-aimed at {}", active.kind, end);
        Ok(())
    }

    /// Drop the in-flight animation without applying further frames.
    pub fn cancel(&mut self) {
        if let Some(previous) = self.state.active.take() {
            debug!(
                "Cancelled {:?} at step {}",
                previous.kind,
                previous.frames.next_step()
            );
        }
    }

    /// Apply the next frame of the in-flight animation.
    pub fn tick(&mut self) -> TickOutcome {
        let Some(active) = self.state.active.as_mut() else {
            return TickOutcome::Idle;
        };
        if active.settle.take().is_some() {
            debug!("Settle delay elapsed, starting {:?}", active.kind);
        }

        let kind = active.kind;
        let steps = active.frames.spec().steps;
        let frame = match active.frames.next() {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => {
                error!("Invalid position or size values, halting {:?}: {}", kind, e);
                return self.halt(kind);
            }
            None => {
                self.state.active = None;
                return TickOutcome::Finished(kind);
            }
        };

        if let Err(e) = self.window.set_bounds(frame.bounds) {
            error!("Error setting bounds: {}", e);
            return self.halt(kind);
        }
        debug!("Step {}/{}: {}", frame.step, steps, frame.bounds);

        let fade_in = active.fade_in_step.is_some_and(|at| frame.step >= at);
        if fade_in {
            active.fade_in_step = None;
        }
        let last = frame.step == steps;

        if fade_in {
            self.emit(OverlaySignal::FadeIn);
        }
        if last {
            self.state.active = None;
            self.complete(kind);
            return TickOutcome::Finished(kind);
        }
        TickOutcome::Stepped { step: frame.step }
    }

    /// Slide in from the off-screen position, or from the current bounds
    /// when superseding an animation that already moved the window.
    fn start_slide_in(&mut self, mode: OverlayMode, settle: Option<Duration>) -> Result<()> {
        let work_area = self.window.work_area_width();
        let start = if self.is_animating() {
            self.window.bounds()
        } else {
            self.layout.offscreen(mode, work_area)
        };
        let spec = AnimationSpec::from_millis(
            start,
            self.layout.target(mode, work_area),
            self.timing.slide_in_duration_ms,
            self.timing.slide_in_steps,
        )?;
        let fade_in_at = spec.step_at(Duration::from_millis(self.timing.fade_in_delay_ms));

        self.state.mode = mode;
        info!(
            "Sliding in from {} to {} ({} mode)",
            spec.start, spec.end, mode
        );
        self.begin(ActiveAnimation {
            kind: AnimationKind::SlideIn,
            frames: spec.frames(self.layout.limits()),
            settle,
            fade_in_step: Some(fade_in_at),
        });
        Ok(())
    }

    /// Replace any in-flight animation and apply the first frame unless a
    /// settle delay is pending.
    fn begin(&mut self, animation: ActiveAnimation) {
        if let Some(previous) = self.state.active.take() {
            debug!(
                "Superseding {:?} at step {} with {:?}",
                previous.kind,
                previous.frames.next_step(),
                animation.kind
            );
            if previous.fade_in_step.is_some() && animation.kind != AnimationKind::SlideOut {
                self.emit(OverlaySignal::FadeIn);
            }
        }

        let deferred = animation.settle.is_some();
        self.state.active = Some(animation);
        if !deferred {
            self.tick();
        }
    }

    fn halt(&mut self, kind: AnimationKind) -> TickOutcome {
        if let Some(active) = self.state.active.take()
            && active.fade_in_step.is_some()
        {
            self.emit(OverlaySignal::FadeIn);
        }
        TickOutcome::Halted(kind)
    }

    fn complete(&mut self, kind: AnimationKind) {
        match kind {
            AnimationKind::SlideIn => {
                info!("Animation complete - window at final position and size");
            }
            AnimationKind::SlideOut => {
                if let Err(e) = self.window.hide() {
                    error!("Failed to hide window: {}", e);
                }
                self.state.visibility = Visibility::Hidden;
                info!("Animation complete - window hidden");
            }
            AnimationKind::Resize => debug!("Resize complete"),
        }
    }

    fn emit(&self, signal: OverlaySignal) {
        if self.signal_tx.send(signal).is_err() {
            debug!("No listener for {:?}", signal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animator::window::{VirtualWindow, WindowOptions};
    use crate::error::Error;
    use pretty_assertions::assert_eq;

    const WORK_AREA: i32 = 1440;

    /// Records every applied bound; optionally fails after `fail_after` applies.
    struct RecordingWindow {
        inner: VirtualWindow,
        applied: Vec<WindowBounds>,
        fail_after: Option<usize>,
    }

    impl RecordingWindow {
        fn new() -> Self {
            let initial = WindowBounds::new(560, -140, 320, 140);
            Self {
                inner: VirtualWindow::create(WindowOptions::overlay(initial), WORK_AREA),
                applied: Vec::new(),
                fail_after: None,
            }
        }
    }

    impl WindowHandle for RecordingWindow {
        fn bounds(&self) -> WindowBounds {
            self.inner.bounds()
        }
        fn set_bounds(&mut self, bounds: WindowBounds) -> Result<()> {
            if self.fail_after.is_some_and(|n| self.applied.len() >= n) {
                return Err(Error::terminal("window destroyed"));
            }
            self.applied.push(bounds);
            self.inner.set_bounds(bounds)
        }
        fn set_position(&mut self, x: i32, y: i32) -> Result<()> {
            self.inner.set_position(x, y)
        }
        fn show(&mut self) -> Result<()> {
            self.inner.show()
        }
        fn hide(&mut self) -> Result<()> {
            self.inner.hide()
        }
        fn is_visible(&self) -> bool {
            self.inner.is_visible()
        }
        fn work_area_width(&self) -> i32 {
            self.inner.work_area_width()
        }
    }

    fn animator() -> (
        WindowAnimator<RecordingWindow>,
        mpsc::UnboundedReceiver<OverlaySignal>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let animator = WindowAnimator::new(
            RecordingWindow::new(),
            WindowConfig::default(),
            AnimationConfig::default(),
            tx,
        );
        (animator, rx)
    }

    fn run_to_end(animator: &mut WindowAnimator<RecordingWindow>) -> TickOutcome {
        let mut last = TickOutcome::Idle;
        for _ in 0..1000 {
            match animator.tick() {
                TickOutcome::Idle => return last,
                outcome => last = outcome,
            }
        }
        panic!("animation never finished");
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<OverlaySignal>) -> Vec<OverlaySignal> {
        let mut signals = Vec::new();
        while let Ok(signal) = rx.try_recv() {
            signals.push(signal);
        }
        signals
    }

    #[test]
    fn test_slide_in_lands_on_normal_target() {
        let (mut animator, mut rx) = animator();
        animator.slide_in(OverlayMode::Normal).unwrap();

        // First frame is applied synchronously.
        assert_eq!(animator.window().applied.len(), 1);
        assert_eq!(
            animator.next_delay(),
            Some(Duration::from_millis(400) / 30)
        );

        assert_eq!(
            run_to_end(&mut animator),
            TickOutcome::Finished(AnimationKind::SlideIn)
        );
        let applied = &animator.window().applied;
        assert_eq!(applied.len(), 31);
        assert_eq!(applied[0], WindowBounds::new(620, -140, 200, 1));
        assert_eq!(*applied.last().unwrap(), WindowBounds::new(560, 0, 320, 140));
        assert!(applied.iter().all(|b| b.width >= 100 && b.height >= 1));
        assert_eq!(animator.visibility(), Visibility::Visible);
        assert_eq!(drain(&mut rx), vec![OverlaySignal::FadeIn]);
    }

    #[test]
    fn test_slide_out_hides_then_toggle_shows_and_slides_in() {
        let (mut animator, mut rx) = animator();
        animator.slide_in(OverlayMode::Normal).unwrap();
        run_to_end(&mut animator);
        drain(&mut rx);

        animator.slide_out(OverlayMode::Normal).unwrap();
        assert_eq!(drain(&mut rx), vec![OverlaySignal::FadeOut]);
        assert_eq!(
            run_to_end(&mut animator),
            TickOutcome::Finished(AnimationKind::SlideOut)
        );
        assert!(!animator.window().is_visible());
        assert_eq!(animator.visibility(), Visibility::Hidden);
        assert_eq!(
            *animator.window().applied.last().unwrap(),
            WindowBounds::new(620, -140, 200, 1)
        );

        let applied_before = animator.window().applied.len();
        animator.toggle_visibility().unwrap();
        assert!(animator.window().is_visible());
        assert_eq!(animator.visibility(), Visibility::Visible);
        // Nothing moves until the settle delay has elapsed.
        assert_eq!(animator.window().applied.len(), applied_before);
        assert_eq!(animator.next_delay(), Some(Duration::from_millis(100)));

        assert_eq!(
            run_to_end(&mut animator),
            TickOutcome::Finished(AnimationKind::SlideIn)
        );
        assert_eq!(animator.window().bounds(), WindowBounds::new(560, 0, 320, 140));
    }

    #[test]
    fn test_toggle_while_sliding_out_reverses() {
        let (mut animator, _rx) = animator();
        animator.slide_in(OverlayMode::Normal).unwrap();
        run_to_end(&mut animator);

        animator.toggle_visibility().unwrap();
        assert_eq!(animator.active_kind(), Some(AnimationKind::SlideOut));
        animator.tick();

        animator.toggle_visibility().unwrap();
        assert_eq!(animator.active_kind(), Some(AnimationKind::SlideIn));
        run_to_end(&mut animator);
        assert!(animator.window().is_visible());
        assert_eq!(animator.visibility(), Visibility::Visible);
    }

    #[test]
    fn test_mode_switch_cancels_slide_in_and_resizes_from_current() {
        let (mut animator, mut rx) = animator();
        animator.slide_in(OverlayMode::Normal).unwrap();
        for _ in 0..5 {
            animator.tick();
        }
        let mid = animator.window().bounds();

        assert!(animator.set_mode(OverlayMode::Expanded).unwrap());
        assert_eq!(animator.active_kind(), Some(AnimationKind::Resize));
        // Resize starts from the queried bounds, not an assumed position.
        assert_eq!(*animator.window().applied.last().unwrap(), mid);
        // The superseded slide-in still reveals the content.
        assert_eq!(drain(&mut rx), vec![OverlaySignal::FadeIn]);

        run_to_end(&mut animator);
        assert_eq!(animator.window().bounds(), WindowBounds::new(495, 0, 450, 250));
        assert!(!animator.set_mode(OverlayMode::Expanded).unwrap());
    }

    #[test]
    fn test_mode_switch_while_hidden_only_records() {
        let (mut animator, _rx) = animator();
        assert!(animator.set_mode(OverlayMode::Expanded).unwrap());
        assert!(!animator.is_animating());
        assert!(animator.window().applied.is_empty());

        animator.toggle_visibility().unwrap();
        run_to_end(&mut animator);
        assert_eq!(animator.window().bounds(), WindowBounds::new(495, 0, 450, 250));
    }

    #[test]
    fn test_window_error_aborts_animation() {
        let (mut animator, _rx) = animator();
        animator.window_mut().fail_after = Some(4);
        animator.slide_in(OverlayMode::Normal).unwrap();

        assert_eq!(
            run_to_end(&mut animator),
            TickOutcome::Halted(AnimationKind::SlideIn)
        );
        assert!(!animator.is_animating());
        assert_eq!(animator.window().applied.len(), 4);
        assert_eq!(animator.tick(), TickOutcome::Idle);
    }

    #[test]
    fn test_invalid_target_halts_without_applying_it() {
        let (mut animator, _rx) = animator();
        animator.slide_in(OverlayMode::Normal).unwrap();
        run_to_end(&mut animator);
        let applied_before = animator.window().applied.len();

        animator
            .resize_to(WindowBounds::new(0, 0, 20, 0), 300)
            .unwrap();
        run_to_end(&mut animator);
        assert!(!animator.is_animating());
        for bounds in &animator.window().applied[applied_before..] {
            assert!(bounds.width >= 100 && bounds.height >= 1);
        }
    }

    #[test]
    fn test_display_change_recentres() {
        let (mut animator, _rx) = animator();
        animator.slide_in(OverlayMode::Normal).unwrap();
        run_to_end(&mut animator);

        animator.window_mut().inner.set_work_area_width(1920);
        animator.on_display_metrics_changed().unwrap();
        assert_eq!(animator.window().bounds(), WindowBounds::new(800, 0, 320, 140));
    }

    #[test]
    fn test_display_change_during_slide_in_lands_centred() {
        let (mut animator, mut rx) = animator();
        animator.slide_in(OverlayMode::Normal).unwrap();
        for _ in 0..5 {
            animator.tick();
        }
        let applied_before = animator.window().applied.len();

        animator.window_mut().inner.set_work_area_width(1920);
        animator.on_display_metrics_changed().unwrap();
        assert_eq!(animator.active_kind(), Some(AnimationKind::SlideIn));

        assert_eq!(
            run_to_end(&mut animator),
            TickOutcome::Finished(AnimationKind::SlideIn)
        );
        assert_eq!(animator.window().bounds(), WindowBounds::new(800, 0, 320, 140));
        // The remaining step count is unchanged.
        assert_eq!(animator.window().applied.len(), 31);
        assert!(animator.window().applied.len() > applied_before);
        assert_eq!(drain(&mut rx), vec![OverlaySignal::FadeIn]);
    }

    #[test]
    fn test_display_change_before_settle_starts_from_new_offscreen() {
        let (mut animator, _rx) = animator();
        animator.toggle_visibility().unwrap();
        animator.window_mut().inner.set_work_area_width(1920);
        animator.on_display_metrics_changed().unwrap();

        animator.tick();
        assert_eq!(
            animator.window().applied[0],
            WindowBounds::new(860, -140, 200, 1)
        );
        run_to_end(&mut animator);
        assert_eq!(animator.window().bounds(), WindowBounds::new(800, 0, 320, 140));
    }

    #[test]
    fn test_display_change_during_slide_out_still_hides() {
        let (mut animator, _rx) = animator();
        animator.slide_in(OverlayMode::Normal).unwrap();
        run_to_end(&mut animator);
        animator.slide_out(OverlayMode::Normal).unwrap();
        animator.tick();

        animator.window_mut().inner.set_work_area_width(1920);
        animator.on_display_metrics_changed().unwrap();
        assert_eq!(
            run_to_end(&mut animator),
            TickOutcome::Finished(AnimationKind::SlideOut)
        );
        assert_eq!(animator.window().bounds(), WindowBounds::new(860, -140, 200, 1));
        assert!(!animator.window().is_visible());
    }

    #[test]
    fn test_double_toggle_before_settle_never_reaches_screen() {
        let (mut animator, _rx) = animator();
        animator.toggle_visibility().unwrap();
        animator.toggle_visibility().unwrap();
        assert_eq!(animator.active_kind(), Some(AnimationKind::SlideOut));

        // Every frame stays above the top edge.
        assert_eq!(
            animator.window().bounds(),
            WindowBounds::new(560, -140, 320, 140)
        );
        run_to_end(&mut animator);
        assert!(animator.window().applied.iter().all(|b| b.bottom() <= 0));
        assert!(!animator.window().is_visible());
        assert_eq!(animator.visibility(), Visibility::Hidden);
    }

    #[test]
    fn test_reversed_slide_out_resumes_from_current_bounds() {
        let (mut animator, _rx) = animator();
        animator.slide_in(OverlayMode::Normal).unwrap();
        run_to_end(&mut animator);

        animator.toggle_visibility().unwrap();
        for _ in 0..3 {
            animator.tick();
        }
        let mid = animator.window().bounds();
        let applied_before = animator.window().applied.len();

        animator.toggle_visibility().unwrap();
        assert_eq!(animator.active_kind(), Some(AnimationKind::SlideIn));
        // No settle pause and no jump back off screen.
        assert_eq!(animator.window().applied[applied_before], mid);
        run_to_end(&mut animator);
        let offscreen = WindowBounds::new(620, -140, 200, 1);
        assert!(
            animator.window().applied[applied_before..]
                .iter()
                .all(|b| *b != offscreen)
        );
        assert_eq!(animator.window().bounds(), WindowBounds::new(560, 0, 320, 140));
    }
}
