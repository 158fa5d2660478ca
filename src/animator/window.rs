//! The window primitive the animator drives.

use super::geometry::WindowBounds;
use crate::error::Result;

/// Creation options for the overlay window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowOptions {
    pub frameless: bool,
    pub transparent: bool,
    pub always_on_top: bool,
    pub resizable: bool,
    pub skip_taskbar: bool,
    /// Initial bounds; the window starts hidden.
    pub initial_bounds: WindowBounds,
}

impl WindowOptions {
    /// Overlay defaults: frameless, transparent, pinned, out of the taskbar.
    pub fn overlay(initial_bounds: WindowBounds) -> Self {
        Self {
            frameless: true,
            transparent: true,
            always_on_top: true,
            resizable: false,
            skip_taskbar: true,
            initial_bounds,
        }
    }
}

/// Operations the animator needs from a native or virtual window.
pub trait WindowHandle: Send {
    /// Current bounds as reported by the window system.
    fn bounds(&self) -> WindowBounds;

    /// Apply new bounds.
    fn set_bounds(&mut self, bounds: WindowBounds) -> Result<()>;

    /// Move without resizing.
    fn set_position(&mut self, x: i32, y: i32) -> Result<()>;

    fn show(&mut self) -> Result<()>;

    fn hide(&mut self) -> Result<()>;

    fn is_visible(&self) -> bool;

    /// Width of the primary display's work area.
    fn work_area_width(&self) -> i32;
}

/// An in-process window whose bounds are rendered by the terminal UI.
#[derive(Debug, Clone)]
pub struct VirtualWindow {
    options: WindowOptions,
    bounds: WindowBounds,
    visible: bool,
    work_area_width: i32,
}

impl VirtualWindow {
    /// Create a hidden window.
    pub fn create(options: WindowOptions, work_area_width: i32) -> Self {
        tracing::debug!(
            "Creating overlay window at {} (work area {}px)",
            options.initial_bounds,
            work_area_width
        );
        Self {
            bounds: options.initial_bounds,
            options,
            visible: false,
            work_area_width,
        }
    }

    pub fn options(&self) -> &WindowOptions {
        &self.options
    }

    /// Display metrics changed.
    pub fn set_work_area_width(&mut self, width: i32) {
        self.work_area_width = width;
    }
}

impl WindowHandle for VirtualWindow {
    fn bounds(&self) -> WindowBounds {
        self.bounds
    }

    fn set_bounds(&mut self, bounds: WindowBounds) -> Result<()> {
        self.bounds = bounds;
        Ok(())
    }

    fn set_position(&mut self, x: i32, y: i32) -> Result<()> {
        self.bounds.x = x;
        self.bounds.y = y;
        Ok(())
    }

    fn show(&mut self) -> Result<()> {
        self.visible = true;
        Ok(())
    }

    fn hide(&mut self) -> Result<()> {
        self.visible = false;
        Ok(())
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn work_area_width(&self) -> i32 {
        self.work_area_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_window_lifecycle() {
        let initial = WindowBounds::new(560, -140, 320, 140);
        let mut window = VirtualWindow::create(WindowOptions::overlay(initial), 1440);
        assert!(!window.is_visible());
        assert!(window.options().always_on_top);
        assert!(!window.options().resizable);
        assert_eq!(window.bounds(), initial);

        window.show().unwrap();
        window.set_position(10, 0).unwrap();
        assert!(window.is_visible());
        assert_eq!(window.bounds(), WindowBounds::new(10, 0, 320, 140));

        window.set_work_area_width(1920);
        assert_eq!(window.work_area_width(), 1920);
        window.hide().unwrap();
        assert!(!window.is_visible());
    }
}
