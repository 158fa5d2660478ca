//! Text entry popup for the wallet prompts.

use crate::state::{InputMode, Store};
use crate::wallet::{PRIVATE_KEY_LEN, TX_HASH_LEN};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};
use rust_decimal::Decimal;

/// Popup shown while the app is in an editing mode.
pub struct Prompt;

impl Prompt {
    pub fn render(frame: &mut Frame, area: Rect, store: &Store) {
        let buffer = &store.app.input_buffer;
        let (title, hint, complete) = match store.app.input_mode {
            InputMode::Normal => return,
            InputMode::KeyEntry => {
                let digits = hex_digits(buffer);
                (
                    " Private key ".to_string(),
                    format!(
                        "{}/{} hex digits · Enter connect · Esc cancel",
                        digits, PRIVATE_KEY_LEN
                    ),
                    digits == PRIVATE_KEY_LEN,
                )
            }
            InputMode::RechargeAmount => (
                format!(" Recharge amount ({}) ", store.wallet.symbol),
                "Enter continue · Esc cancel".to_string(),
                buffer
                    .trim()
                    .parse::<Decimal>()
                    .is_ok_and(|v| v > Decimal::ZERO),
            ),
            InputMode::RechargeTxHash => {
                let amount = store
                    .wallet
                    .pending_recharge
                    .map(|a| format!("{} {} sent? ", a, store.wallet.symbol))
                    .unwrap_or_default();
                (
                    " Transaction hash ".to_string(),
                    format!("{}Enter confirm · Esc cancel", amount),
                    hex_digits(buffer) == TX_HASH_LEN,
                )
            }
        };

        frame.render_widget(Clear, area);
        let hint_color = if complete {
            Color::Green
        } else {
            Color::DarkGray
        };

        let room = usize::from(area.width.saturating_sub(4));
        // Only the length of a key is shown, never the key.
        let shown = if store.app.input_mode == InputMode::KeyEntry {
            "•".repeat(buffer.chars().count().min(room))
        } else {
            tail(buffer, room)
        };
        let cursor = Span::styled("▏", Style::default().fg(Color::Cyan));
        let lines = vec![
            Line::from(vec![Span::raw(shown), cursor]),
            Line::from(Span::styled(hint, Style::default().fg(hint_color))),
        ];

        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(paragraph, area);
    }
}

fn hex_digits(buffer: &str) -> usize {
    buffer.strip_prefix("0x").unwrap_or(buffer).chars().count()
}

/// The last `width` characters, so the cursor end stays in view.
fn tail(text: &str, width: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(width)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_keeps_cursor_end() {
        assert_eq!(tail("0xabcdef", 4), "cdef");
        assert_eq!(tail("12", 4), "12");
        assert_eq!(tail("", 0), "");
    }

    #[test]
    fn test_hex_digits_ignores_prefix() {
        assert_eq!(hex_digits("0xab"), 2);
        assert_eq!(hex_digits("ab"), 2);
    }
}
