//! Event handling for notchbet.
//!
//! This module reads terminal events on a background task and turns them
//! into actions, including the global toggle shortcut.

mod handler;
mod input;

pub use handler::{EventHandler, Hotkey};
pub use input::{InputEvent, Key, KeyBinding, Modifiers};

use crate::error::Result;
use crossterm::event::{Event as CrosstermEvent, KeyEvent};
use std::time::Duration;
use tokio::sync::mpsc;

/// Terminal event types.
#[derive(Debug, Clone)]
pub enum Event {
    /// Terminal tick (for periodic updates).
    Tick,
    /// Key press event.
    Key(KeyEvent),
    /// Terminal resize event; the display work area changed.
    Resize(u16, u16),
    /// Paste event.
    Paste(String),
}

/// Configuration for the event loop.
#[derive(Debug, Clone)]
pub struct EventConfig {
    /// Tick rate for the event loop.
    pub tick_rate: Duration,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            tick_rate: Duration::from_millis(250),
        }
    }
}

impl EventConfig {
    /// Create a new event config with the specified tick rate in milliseconds.
    pub fn with_tick_rate_ms(mut self, ms: u64) -> Self {
        self.tick_rate = Duration::from_millis(ms);
        self
    }
}

/// Event loop for handling terminal events.
pub struct EventLoop {
    /// Event sender.
    event_tx: mpsc::UnboundedSender<Event>,
    /// Event receiver.
    event_rx: mpsc::UnboundedReceiver<Event>,
    /// Configuration.
    config: EventConfig,
}

impl EventLoop {
    /// Create a new event loop.
    pub fn new(config: EventConfig) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            event_tx,
            event_rx,
            config,
        }
    }

    /// Start the event loop.
    pub fn start(self) -> (mpsc::UnboundedReceiver<Event>, tokio::task::JoinHandle<()>) {
        let event_tx = self.event_tx;
        let tick_rate = self.config.tick_rate;

        let handle = tokio::spawn(async move {
            let mut tick_interval = tokio::time::interval(tick_rate);

            loop {
                let event = tokio::select! {
                    _ = tick_interval.tick() => Event::Tick,
                    maybe_event = Self::read_crossterm_event() => {
                        match maybe_event {
                            Ok(Some(event)) => event,
                            Ok(None) => continue,
                            Err(e) => {
                                tracing::warn!("Failed to read terminal event: {}", e);
                                continue;
                            }
                        }
                    }
                };

                if event_tx.send(event).is_err() {
                    break;
                }
            }
        });

        (self.event_rx, handle)
    }

    async fn read_crossterm_event() -> Result<Option<Event>> {
        if crossterm::event::poll(Duration::from_millis(10))? {
            Ok(match crossterm::event::read()? {
                CrosstermEvent::Key(key) => Some(Event::Key(key)),
                CrosstermEvent::Resize(w, h) => Some(Event::Resize(w, h)),
                CrosstermEvent::Paste(s) => Some(Event::Paste(s)),
                _ => None,
            })
        } else {
            Ok(None)
        }
    }
}
