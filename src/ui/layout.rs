//! Layout management for the TUI.

use ratatui::layout::{Constraint, Direction, Layout as RatatuiLayout, Rect};

/// UI layout areas.
pub struct Layout {
    /// The simulated desktop the overlay lives on.
    pub stage_area: Rect,
    /// Status bar area (bottom).
    pub status_area: Rect,
    /// Notification area (overlaid, bottom right of the stage).
    pub notification_area: Rect,
}

impl Layout {
    /// Create a new layout from the terminal area.
    pub fn new(area: Rect, show_status_bar: bool) -> Self {
        let status_height = u16::from(show_status_bar);
        let chunks = RatatuiLayout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),                // Stage
                Constraint::Length(status_height), // Status bar
            ])
            .split(area);
        let stage_area = chunks[0];

        let width = (stage_area.width / 2).clamp(stage_area.width.min(30), stage_area.width);
        let height = 3.min(stage_area.height);
        let notification_area = Rect {
            x: stage_area.x + stage_area.width - width,
            y: stage_area.y + stage_area.height - height,
            width,
            height,
        };

        Self {
            stage_area,
            status_area: chunks[1],
            notification_area,
        }
    }
}

/// Create a centered popup area.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = RatatuiLayout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    RatatuiLayout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
