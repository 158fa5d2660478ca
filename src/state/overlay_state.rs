//! What the UI needs to know about the overlay window.

use crate::animator::{
    OverlayMode, OverlaySignal, Visibility, WindowAnimator, WindowBounds, WindowHandle,
};

/// Snapshot of the animator, refreshed after every change.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayState {
    pub bounds: WindowBounds,
    pub window_visible: bool,
    pub visibility: Visibility,
    pub mode: OverlayMode,
    pub animating: bool,
    /// Driven by fade-in / fade-out signals.
    pub content_visible: bool,
    /// Wallet panel requested, independent of question expansion.
    pub wallet_mode: bool,
}

impl OverlayState {
    pub fn sync<W: WindowHandle>(&mut self, animator: &WindowAnimator<W>) {
        self.bounds = animator.window().bounds();
        self.window_visible = animator.window().is_visible();
        self.visibility = animator.visibility();
        self.mode = animator.mode();
        self.animating = animator.is_animating();
    }

    pub fn apply_signal(&mut self, signal: OverlaySignal) {
        self.content_visible = signal == OverlaySignal::FadeIn;
    }

    /// Mode to return to once a question closes.
    pub fn resting_mode(&self) -> OverlayMode {
        if self.wallet_mode {
            OverlayMode::Expanded
        } else {
            OverlayMode::Normal
        }
    }
}
