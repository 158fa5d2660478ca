//! Window geometry and overlay modes.

use crate::config::WindowConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Position and size of the overlay window, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindowBounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl WindowBounds {
    /// Create bounds from integer components.
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Bounds horizontally centred on a work area of the given width.
    pub fn centered(work_area_width: i32, y: i32, width: i32, height: i32) -> Self {
        let x = (f64::from(work_area_width - width) / 2.0).round() as i32;
        Self::new(x, y, width, height)
    }

    /// Round floating point components into bounds, rejecting anything the
    /// window system should never see.
    pub fn from_f64(
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        limits: GeometryLimits,
    ) -> Result<Self> {
        let bounds = Self::new(
            round_component("x", x)?,
            round_component("y", y)?,
            round_component("width", width)?,
            round_component("height", height)?,
        );
        bounds.validate(limits)?;
        Ok(bounds)
    }

    /// Check the size floors.
    pub fn validate(&self, limits: GeometryLimits) -> Result<()> {
        if self.width < limits.min_width {
            return Err(Error::geometry(format!(
                "width {} below minimum {}",
                self.width, limits.min_width
            )));
        }
        if self.height < limits.min_height {
            return Err(Error::geometry(format!(
                "height {} below minimum {}",
                self.height, limits.min_height
            )));
        }
        Ok(())
    }

    /// Right edge (exclusive).
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// Bottom edge (exclusive).
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }
}

impl std::fmt::Display for WindowBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}) {}x{}",
            self.x, self.y, self.width, self.height
        )
    }
}

fn round_component(name: &str, value: f64) -> Result<i32> {
    if !value.is_finite() {
        return Err(Error::geometry(format!("{} is not finite: {}", name, value)));
    }
    let rounded = value.round();
    if rounded < f64::from(i32::MIN) || rounded > f64::from(i32::MAX) {
        return Err(Error::geometry(format!("{} out of range: {}", name, value)));
    }
    Ok(rounded as i32)
}

/// Hard floor for the window width, whatever the configuration says.
pub const MIN_WINDOW_WIDTH: i32 = 100;
/// Hard floor for the window height.
pub const MIN_WINDOW_HEIGHT: i32 = 1;

/// Minimum size ever applied to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryLimits {
    pub min_width: i32,
    pub min_height: i32,
}

impl Default for GeometryLimits {
    fn default() -> Self {
        Self {
            min_width: MIN_WINDOW_WIDTH,
            min_height: MIN_WINDOW_HEIGHT,
        }
    }
}

/// Which target geometry the overlay uses when shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayMode {
    /// Compact notch.
    #[default]
    Normal,
    /// Wallet / voting panel.
    Expanded,
}

impl std::fmt::Display for OverlayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Expanded => write!(f, "expanded"),
        }
    }
}

/// Resolves overlay modes to concrete bounds on a given work area.
#[derive(Debug, Clone)]
pub struct OverlayLayout {
    config: WindowConfig,
}

impl OverlayLayout {
    pub fn new(config: WindowConfig) -> Self {
        Self { config }
    }

    pub fn limits(&self) -> GeometryLimits {
        GeometryLimits {
            min_width: self.config.min_width.max(MIN_WINDOW_WIDTH),
            min_height: self.config.min_height.max(MIN_WINDOW_HEIGHT),
        }
    }

    /// Size of the overlay in the given mode.
    pub fn size(&self, mode: OverlayMode) -> (i32, i32) {
        match mode {
            OverlayMode::Normal => (self.config.normal_width, self.config.normal_height),
            OverlayMode::Expanded => (self.config.expanded_width, self.config.expanded_height),
        }
    }

    /// Fully shown bounds: anchored at the top, horizontally centred.
    pub fn target(&self, mode: OverlayMode, work_area_width: i32) -> WindowBounds {
        let (width, height) = self.size(mode);
        WindowBounds::centered(work_area_width, 0, width, height)
    }

    /// Collapsed bounds above the screen edge that slides start from and end at.
    pub fn offscreen(&self, mode: OverlayMode, work_area_width: i32) -> WindowBounds {
        let (_, height) = self.size(mode);
        WindowBounds::centered(
            work_area_width,
            -height,
            self.config.collapsed_width,
            self.config.min_height.max(MIN_WINDOW_HEIGHT),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered() {
        let bounds = WindowBounds::centered(1440, 0, 320, 140);
        assert_eq!(bounds, WindowBounds::new(560, 0, 320, 140));
        assert_eq!(bounds.right(), 880);
    }

    #[test]
    fn test_from_f64_rejects_non_finite() {
        let limits = GeometryLimits::default();
        assert!(WindowBounds::from_f64(f64::NAN, 0.0, 200.0, 10.0, limits).is_err());
        assert!(WindowBounds::from_f64(0.0, f64::INFINITY, 200.0, 10.0, limits).is_err());
        assert!(WindowBounds::from_f64(0.0, 0.0, 1e12, 10.0, limits).is_err());
    }

    #[test]
    fn test_from_f64_enforces_floors() {
        let limits = GeometryLimits::default();
        assert!(WindowBounds::from_f64(0.0, 0.0, 99.4, 10.0, limits).is_err());
        assert!(WindowBounds::from_f64(0.0, 0.0, 200.0, 0.4, limits).is_err());
        let ok = WindowBounds::from_f64(10.4, -3.6, 99.5, 0.5, limits).unwrap();
        assert_eq!(ok, WindowBounds::new(10, -4, 100, 1));
    }

    #[test]
    fn test_layout_targets() {
        let layout = OverlayLayout::new(WindowConfig::default());
        assert_eq!(
            layout.target(OverlayMode::Normal, 1000),
            WindowBounds::new(340, 0, 320, 140)
        );
        assert_eq!(
            layout.target(OverlayMode::Expanded, 1000),
            WindowBounds::new(275, 0, 450, 250)
        );
        assert_eq!(
            layout.offscreen(OverlayMode::Expanded, 1000),
            WindowBounds::new(400, -250, 200, 1)
        );
    }

    #[test]
    fn test_limits_never_drop_below_floor() {
        let layout = OverlayLayout::new(WindowConfig {
            min_width: 10,
            min_height: 0,
            ..WindowConfig::default()
        });
        assert_eq!(layout.limits(), GeometryLimits::default());
        assert_eq!(layout.offscreen(OverlayMode::Normal, 1000).height, 1);
    }
}
