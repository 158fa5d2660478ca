//! Application-level state.

use super::Notification;
use std::time::{Duration, Instant};

/// Input mode for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    /// Typing a private key.
    KeyEntry,
    /// Typing the amount to recharge.
    RechargeAmount,
    /// Pasting the hash of a sent recharge.
    RechargeTxHash,
}

/// Global application state.
#[derive(Debug, Default)]
pub struct AppState {
    /// Current input mode.
    pub input_mode: InputMode,
    /// Current notification.
    pub notification: Option<Notification>,
    /// When the current notification disappears.
    notification_expires: Option<Instant>,
    /// Whether the app should quit.
    pub should_quit: bool,
    /// Key entry buffer.
    pub input_buffer: String,
    /// Cursor position in input buffer.
    pub cursor_position: usize,
    /// Terminal size in cells.
    pub terminal_size: (u16, u16),
}

impl AppState {
    /// Create a new application state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if in an input mode.
    pub fn is_editing(&self) -> bool {
        self.input_mode != InputMode::Normal
    }

    pub fn notify(&mut self, notification: Notification, now: Instant) {
        self.notification_expires = Some(now + Duration::from_secs(notification.duration_secs));
        self.notification = Some(notification);
    }

    pub fn dismiss_notification(&mut self) {
        self.notification = None;
        self.notification_expires = None;
    }

    /// Drop the notification once its time is up.
    pub fn expire_notification(&mut self, now: Instant) {
        if self.notification_expires.is_some_and(|at| now >= at) {
            self.dismiss_notification();
        }
    }

    /// Clear the input buffer.
    pub fn clear_input(&mut self) {
        self.input_buffer.clear();
        self.cursor_position = 0;
    }

    /// Take the buffer contents, leaving it empty.
    pub fn take_input(&mut self) -> String {
        self.cursor_position = 0;
        std::mem::take(&mut self.input_buffer)
    }

    /// Add a character to the input buffer.
    pub fn push_char(&mut self, c: char) {
        self.input_buffer.insert(self.cursor_position, c);
        self.cursor_position += c.len_utf8();
    }

    /// Insert pasted text at the cursor, ignoring whitespace.
    pub fn push_str(&mut self, text: &str) {
        for c in text.chars().filter(|c| !c.is_whitespace()) {
            self.push_char(c);
        }
    }

    /// Remove the character before the cursor.
    pub fn pop_char(&mut self) {
        if let Some(c) = self.input_buffer[..self.cursor_position].chars().next_back() {
            self.cursor_position -= c.len_utf8();
            self.input_buffer.remove(self.cursor_position);
        }
    }

    /// Move cursor left.
    pub fn cursor_left(&mut self) {
        if let Some(c) = self.input_buffer[..self.cursor_position].chars().next_back() {
            self.cursor_position -= c.len_utf8();
        }
    }

    /// Move cursor right.
    pub fn cursor_right(&mut self) {
        if let Some(c) = self.input_buffer[self.cursor_position..].chars().next() {
            self.cursor_position += c.len_utf8();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_editing() {
        let mut state = AppState::new();
        state.push_str(" 0xab\ncd ");
        assert_eq!(state.input_buffer, "0xabcd");
        state.cursor_left();
        state.pop_char();
        assert_eq!(state.input_buffer, "0xabd");
        state.cursor_right();
        state.push_char('e');
        assert_eq!(state.take_input(), "0xabde");
        assert_eq!(state.cursor_position, 0);
        assert!(state.input_buffer.is_empty());
    }

    #[test]
    fn test_notification_expiry() {
        let mut state = AppState::new();
        let now = Instant::now();
        state.notify(Notification::info("hello"), now);
        state.expire_notification(now + Duration::from_secs(1));
        assert!(state.notification.is_some());
        state.expire_notification(now + Duration::from_secs(3));
        assert!(state.notification.is_none());
    }
}
