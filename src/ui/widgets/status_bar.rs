//! Status bar widget.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::animator::Visibility;
use crate::market::VotingState;
use crate::state::Store;
use chrono::Utc;

/// Status bar widget.
pub struct StatusBar;

impl StatusBar {
    /// Render the status bar.
    pub fn render(frame: &mut Frame, area: Rect, store: &Store, hint: &str) {
        if area.height == 0 {
            return;
        }

        let wallet_status = match store.wallet.short_address() {
            Some(address) => {
                Span::styled(format!("● {}", address), Style::default().fg(Color::Green))
            }
            None if store.wallet.connecting => {
                Span::styled("◌ Connecting", Style::default().fg(Color::Yellow))
            }
            None => Span::styled("○ No wallet", Style::default().fg(Color::Red)),
        };

        let voting = match (store.voting.state(), store.voting.session()) {
            (VotingState::Open, Some(session)) => Span::styled(
                format!(" Voting #{} {}s ", session.market.id, session.remaining_secs(Utc::now())),
                Style::default().fg(Color::Yellow),
            ),
            (VotingState::Closing, _) => Span::styled(
                " Settling ",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::ITALIC),
            ),
            _ => Span::styled(" Idle ", Style::default().fg(Color::Gray)),
        };

        let overlay = &store.overlay;
        let overlay_status = Span::styled(
            match overlay.visibility {
                Visibility::Visible => format!(" {} ", overlay.mode),
                Visibility::Hidden => " hidden ".to_string(),
            },
            Style::default().fg(Color::Cyan),
        );

        let help_hint = Span::styled(
            format!(" {} ", hint),
            Style::default().fg(Color::Gray),
        );

        // Create the status line
        let left_content = vec![
            Span::styled(
                " ◆ notchbet ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" | "),
            wallet_status,
            Span::raw(" | "),
            voting,
            Span::raw(" | "),
            overlay_status,
        ];

        let status_line = Line::from(left_content);

        // Calculate padding for right-aligned help hint
        let left_len: usize = status_line.spans.iter().map(|s| s.content.chars().count()).sum();
        let right_len = help_hint.content.chars().count();
        let padding = (area.width as usize).saturating_sub(left_len + right_len);

        let mut full_line = status_line.spans;
        full_line.push(Span::raw(" ".repeat(padding)));
        full_line.push(help_hint);

        let paragraph =
            Paragraph::new(Line::from(full_line)).style(Style::default().bg(Color::DarkGray));

        frame.render_widget(paragraph, area);
    }
}
