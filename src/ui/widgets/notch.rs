//! The overlay itself, projected from pixel bounds onto terminal cells.

use crate::animator::{OverlayMode, WindowBounds};
use crate::market::{Side, VotingState};
use crate::state::Store;
use chrono::Utc;
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
};

/// Pixels per terminal cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellScale {
    pub px_per_col: u16,
    pub px_per_row: u16,
}

impl CellScale {
    /// Map window bounds onto `stage`, clipping whatever lies outside it.
    pub fn project(&self, bounds: WindowBounds, stage: Rect) -> Option<Rect> {
        let col_px = i32::from(self.px_per_col.max(1));
        let row_px = i32::from(self.px_per_row.max(1));

        let left = bounds.x.div_euclid(col_px);
        let right = (bounds.right() + col_px - 1).div_euclid(col_px);
        let top = bounds.y.div_euclid(row_px);
        let bottom = (bounds.bottom() + row_px - 1).div_euclid(row_px);

        let left = left.max(0);
        let top = top.max(0);
        let right = right.min(i32::from(stage.width));
        let bottom = bottom.min(i32::from(stage.height));
        if right <= left || bottom <= top {
            return None;
        }

        Some(Rect {
            x: stage.x + u16::try_from(left).ok()?,
            y: stage.y + u16::try_from(top).ok()?,
            width: u16::try_from(right - left).ok()?,
            height: u16::try_from(bottom - top).ok()?,
        })
    }
}

/// Overlay widget.
pub struct Notch;

impl Notch {
    /// Render the overlay if its window is visible and on stage.
    pub fn render(frame: &mut Frame, stage: Rect, store: &Store, scale: CellScale) {
        let overlay = &store.overlay;
        if !overlay.window_visible {
            return;
        }
        let Some(area) = scale.project(overlay.bounds, stage) else {
            return;
        };

        frame.render_widget(Clear, area);
        let block = Block::default()
            .borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::DarkGray))
            .style(Style::default().bg(Color::Black));

        if !overlay.content_visible {
            frame.render_widget(block, area);
            return;
        }

        let lines = if store.voting.state() != VotingState::Idle {
            Self::question_lines(store)
        } else if overlay.mode == OverlayMode::Expanded && overlay.wallet_mode {
            Self::wallet_lines(store)
        } else {
            Self::idle_lines(store)
        };

        let paragraph = Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn question_lines(store: &Store) -> Vec<Line<'static>> {
        let Some(session) = store.voting.session() else {
            return Vec::new();
        };
        let remaining = session.remaining_secs(Utc::now());
        let closing = store.voting.state() == VotingState::Closing;

        let mine = store
            .wallet
            .identity()
            .and_then(|id| session.vote_of(&id))
            .or(session.local_only());

        let countdown = if closing {
            Span::styled("settling…", Style::default().fg(Color::Yellow))
        } else {
            Span::styled(
                format!("⏱ {}s", remaining),
                Style::default().fg(if remaining <= 5 {
                    Color::Red
                } else {
                    Color::Cyan
                }),
            )
        };

        let mut lines = vec![
            Line::from(Span::styled(
                session.market.question.clone(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(countdown),
            Line::from(vec![
                Span::styled(
                    format!("YES {}", session.yes_count),
                    Style::default().fg(Color::Green),
                ),
                Span::raw("  ·  "),
                Span::styled(
                    format!("NO {}", session.no_count),
                    Style::default().fg(Color::Red),
                ),
            ]),
        ];

        lines.push(match mine {
            Some(side) => {
                let note = if session.local_only().is_some() && !store.wallet.is_connected() {
                    " (local only)"
                } else {
                    ""
                };
                Line::from(Span::styled(
                    format!("You voted {}{}", side, note),
                    Style::default().fg(Color::Yellow),
                ))
            }
            None if !closing => Line::from(vec![
                Span::styled("[y]", Style::default().fg(Color::Green)),
                Span::raw(" Yes   "),
                Span::styled("[n]", Style::default().fg(Color::Red)),
                Span::raw(" No"),
            ]),
            None => Line::default(),
        });
        lines
    }

    fn wallet_lines(store: &Store) -> Vec<Line<'static>> {
        let wallet = &store.wallet;
        let dim = Style::default().fg(Color::DarkGray);

        let mut lines = vec![Line::from(Span::styled(
            format!("Wallet · {}", wallet.network),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))];

        if wallet.connecting {
            lines.push(Line::from(Span::styled(
                "Connecting…",
                Style::default().fg(Color::Yellow),
            )));
            return lines;
        }

        match wallet.short_address() {
            Some(address) => {
                lines.push(Line::from(address));
                let balance = match (wallet.balance, wallet.loading_balance) {
                    (_, true) => "…".to_string(),
                    (Some(balance), false) => format!("{} {}", balance.round_dp(4), wallet.symbol),
                    (None, false) => "-".to_string(),
                };
                lines.push(Line::from(vec![
                    Span::styled("Balance ", dim),
                    Span::raw(balance),
                ]));
                lines.push(Line::from(vec![
                    Span::styled("Credited ", dim),
                    Span::raw(format!("{} {}", wallet.credited.round_dp(6), wallet.symbol)),
                    Span::styled("  Rewards ", dim),
                    Span::raw(format!("{}", wallet.rewards.round_dp(6))),
                ]));
                if wallet.recharging {
                    lines.push(Line::from(Span::styled(
                        "Confirming recharge…",
                        Style::default().fg(Color::Yellow),
                    )));
                }
                lines.push(Line::from(Span::styled(
                    "[b] refresh  [r] recharge  [d] disconnect",
                    dim,
                )));
            }
            None => {
                if let Some(error) = &wallet.last_error {
                    lines.push(Line::from(Span::styled(
                        error.clone(),
                        Style::default().fg(Color::Red),
                    )));
                }
                lines.push(Line::from(Span::styled("[c] connect with private key", dim)));
            }
        }
        lines
    }

    fn idle_lines(store: &Store) -> Vec<Line<'static>> {
        let mut lines = vec![Line::from(Span::styled(
            "Waiting for the next question",
            Style::default().fg(Color::DarkGray),
        ))];

        if let Some(report) = &store.last_settlement {
            let summary = match report.winning_side {
                Some(side) => {
                    let color = if side == Side::Yes {
                        Color::Green
                    } else {
                        Color::Red
                    };
                    Span::styled(
                        format!("#{}: {} won", report.market_id, side),
                        Style::default().fg(color),
                    )
                }
                None => Span::raw(format!("#{}: no votes", report.market_id)),
            };
            lines.push(Line::from(summary));

            let reward = store
                .wallet
                .identity()
                .and_then(|id| report.reward_for(&id));
            if let Some(amount) = reward {
                lines.push(Line::from(Span::styled(
                    format!("+{} {}", amount.round_dp(6), store.wallet.symbol),
                    Style::default().fg(Color::Green),
                )));
            }
        }
        lines
    }
}
