//! Main application module.
//!
//! This module contains the main `App` struct that owns the terminal and runs
//! the event loop. Everything that mutates the window handle or the voting
//! session runs on this single loop through the [`Controller`]; network work
//! is spawned and reports back as actions.

mod controller;

pub use controller::{Controller, work_area_width};

use crate::animator::{
    OverlayLayout, OverlayMode, OverlaySignal, VirtualWindow, WindowAnimator, WindowBounds,
    WindowOptions,
};
use crate::config::Config;
use crate::error::Result;
use crate::events::{EventConfig, EventHandler, EventLoop};
use crate::state::{Action, Store};
use crate::store;
use crate::ui::Ui;
use crate::wallet::{KeyStore, WalletConnector};

use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// The main application.
pub struct App {
    /// Terminal.
    terminal: Terminal<CrosstermBackend<Stdout>>,
    /// Store, animator and collaborators.
    controller: Controller,
    /// UI renderer.
    ui: Ui,
    /// Event handler.
    event_handler: EventHandler,
    /// Action receiver.
    action_rx: mpsc::UnboundedReceiver<Action>,
    /// Fade cues from the animator.
    signal_rx: mpsc::UnboundedReceiver<OverlaySignal>,
    /// Configuration.
    config: Config,
}

impl App {
    /// Create a new application.
    pub async fn new(config: Config) -> Result<Self> {
        let market_store = store::from_config(&config.database)?;
        let key_store = match KeyStore::default_location() {
            Ok(key_store) => Some(key_store),
            Err(e) => {
                warn!("Credential storage unavailable, auto-reconnect disabled: {}", e);
                None
            }
        };
        let wallet = Arc::new(WalletConnector::new(
            config.wallet.clone(),
            market_store.clone(),
            key_store,
        )?);

        // Set up terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        let size = terminal.size()?;

        // Create action channel
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        // Create store
        let mut store = Store::new(&config, action_tx);
        store.app.terminal_size = (size.width, size.height);

        // Create event handler
        let event_handler = EventHandler::new(config.keybindings.clone());
        let toggle = event_handler
            .hotkey()
            .map(|_| config.keybindings.toggle_window.clone())
            .unwrap_or_else(|| config.keybindings.hide.clone());
        let ui = Ui::new(
            &config.ui,
            format!(
                "{} toggle · {} wallet · {} quit",
                toggle, config.keybindings.wallet_mode, config.keybindings.quit
            ),
        );

        // Create the overlay window hidden above the top edge
        let work_area = work_area_width(size.width, &config.ui);
        let (width, height) =
            OverlayLayout::new(config.window.clone()).size(OverlayMode::Normal);
        let window = VirtualWindow::create(
            WindowOptions::overlay(WindowBounds::centered(work_area, -height, width, height)),
            work_area,
        );
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let animator = WindowAnimator::new(
            window,
            config.window.clone(),
            config.animation.clone(),
            signal_tx,
        );

        let controller = Controller::new(config.clone(), store, animator, market_store, wallet);

        Ok(Self {
            terminal,
            controller,
            ui,
            event_handler,
            action_rx,
            signal_rx,
            config,
        })
    }

    /// Run the application event loop.
    pub async fn run(&mut self) -> Result<()> {
        let (mut event_rx, event_task) = EventLoop::new(
            EventConfig::default().with_tick_rate_ms(self.config.ui.tick_rate_ms),
        )
        .start();

        // Initial reveal: show, settle, slide in.
        self.controller.start();

        let mut poll_interval =
            tokio::time::interval(Duration::from_secs(self.config.poller.interval_secs.max(1)));
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut countdown = tokio::time::interval(Duration::from_secs(1));
        countdown.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Main event loop
        loop {
            // Render UI
            self.controller.sync_overlay();
            let store = &self.controller.store;
            self.terminal.draw(|frame| {
                self.ui.render(frame, store);
            })?;

            let step_delay = self.controller.next_frame_delay();
            let frame_due = step_delay.is_some();

            tokio::select! {
                // Handle terminal events
                Some(event) = event_rx.recv() => {
                    let action = self.event_handler.handle(event, &self.controller.store);
                    if let Some(action) = action {
                        self.controller.handle_action(action);
                    }
                }

                // Handle actions from the channel
                Some(action) = self.action_rx.recv() => {
                    self.controller.handle_action(action);
                }

                // Fade cues from the animator
                Some(signal) = self.signal_rx.recv() => {
                    self.controller.store.reduce(Action::Overlay(signal));
                }

                // Next animation frame
                _ = tokio::time::sleep(step_delay.unwrap_or_default()), if frame_due => {
                    self.controller.step_animation();
                }

                _ = poll_interval.tick(), if self.config.poller.enabled => {
                    self.controller.handle_action(Action::PollMarkets);
                }

                _ = countdown.tick() => {
                    self.controller.handle_action(Action::CountdownTick);
                }
            }

            // Check if we should quit
            if self.controller.store.app.should_quit {
                break;
            }
        }

        self.controller.shutdown();
        self.event_handler.shutdown();
        event_task.abort();
        info!("Shutting down");
        Ok(())
    }
}

impl Drop for App {
    fn drop(&mut self) {
        // Restore terminal state
        let _ = disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableBracketedPaste
        );
        let _ = self.terminal.show_cursor();
    }
}
