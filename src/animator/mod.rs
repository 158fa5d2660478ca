//! Overlay window animation.
//!
//! Geometry, easing and the frame generator are pure and independent of any
//! window system; [`WindowAnimator`] applies frames to a [`WindowHandle`].

mod easing;
mod engine;
mod geometry;
mod steps;
mod window;

pub use easing::{ease_out_cubic, lerp, progress};
pub use engine::{
    AnimationKind, AnimatorState, OverlaySignal, TickOutcome, Visibility, WindowAnimator,
};
pub use geometry::{
    GeometryLimits, MIN_WINDOW_HEIGHT, MIN_WINDOW_WIDTH, OverlayLayout, OverlayMode, WindowBounds,
};
pub use steps::{AnimationSpec, Frame, StepIter};
pub use window::{VirtualWindow, WindowHandle, WindowOptions};
