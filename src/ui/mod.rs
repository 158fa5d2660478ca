//! UI rendering using ratatui.
//!
//! The terminal stands in for the desktop: the overlay window is drawn at its
//! pixel bounds scaled down to cells, with a status bar underneath.

mod layout;
mod widgets;

pub use layout::{Layout, centered_rect};
pub use widgets::{CellScale, Notch, Prompt, StatusBar};

use crate::config::UiConfig;
use crate::state::Store;
use ratatui::Frame;
use ratatui::layout::Rect;

/// Main UI renderer.
pub struct Ui {
    scale: CellScale,
    show_status_bar: bool,
    hint: String,
}

impl Ui {
    pub fn new(config: &UiConfig, hint: impl Into<String>) -> Self {
        Self {
            scale: CellScale {
                px_per_col: config.px_per_col,
                px_per_row: config.px_per_row,
            },
            show_status_bar: config.show_status_bar,
            hint: hint.into(),
        }
    }

    pub fn scale(&self) -> CellScale {
        self.scale
    }

    /// Render the entire UI.
    pub fn render(&self, frame: &mut Frame, store: &Store) {
        let layout = Layout::new(frame.area(), self.show_status_bar);

        Notch::render(frame, layout.stage_area, store, self.scale);
        StatusBar::render(frame, layout.status_area, store, &self.hint);

        if store.app.is_editing() {
            let popup = centered_rect(60, 20, layout.stage_area);
            let popup = Rect {
                height: popup.height.max(4).min(layout.stage_area.height),
                ..popup
            };
            Prompt::render(frame, popup, store);
        }

        // Render notification if present
        if let Some(notification) = &store.app.notification {
            widgets::render_notification(frame, layout.notification_area, notification);
        }
    }
}
