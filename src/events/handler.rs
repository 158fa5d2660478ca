//! Event handler for processing input events.

use super::input::{InputEvent, KeyBinding};
use super::Event;
use crate::config::KeyBindings;
use crate::market::Side;
use crate::state::{Action, Command, InputMode, Notification, Store};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use tracing::{error, info};

/// The shortcut that toggles the overlay from anywhere in the app.
#[derive(Debug, Clone)]
pub struct Hotkey {
    binding: KeyBinding,
    registered: bool,
}

impl Hotkey {
    /// Parse and register `accelerator`. A failure is logged and the app
    /// continues without the shortcut.
    pub fn register(accelerator: &str) -> Option<Self> {
        match KeyBinding::parse(accelerator) {
            Ok(binding) => {
                info!("Registered global shortcut {}", binding);
                Some(Self {
                    binding,
                    registered: true,
                })
            }
            Err(e) => {
                error!("Failed to register global shortcut '{}': {}", accelerator, e);
                None
            }
        }
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn matches(&self, input: &InputEvent) -> bool {
        self.registered && input.matches_binding(&self.binding)
    }

    pub fn unregister(&mut self) {
        if self.registered {
            self.registered = false;
            info!("Unregistered global shortcut {}", self.binding);
        }
    }
}

/// Handles input events and produces actions.
pub struct EventHandler {
    /// Key bindings.
    keybindings: KeyBindings,
    /// Global toggle, if registration succeeded.
    hotkey: Option<Hotkey>,
}

impl EventHandler {
    /// Create a handler and register the toggle shortcut.
    pub fn new(keybindings: KeyBindings) -> Self {
        let hotkey = Hotkey::register(&keybindings.toggle_window);
        Self {
            keybindings,
            hotkey,
        }
    }

    pub fn hotkey(&self) -> Option<&Hotkey> {
        self.hotkey.as_ref()
    }

    /// Release the toggle shortcut.
    pub fn shutdown(&mut self) {
        if let Some(hotkey) = self.hotkey.as_mut() {
            hotkey.unregister();
        }
    }

    /// Map a terminal event to an action, given the current state.
    pub fn handle(&self, event: Event, store: &Store) -> Option<Action> {
        match event {
            Event::Tick => Some(Action::Tick),
            Event::Resize(cols, rows) => Some(Action::Resize(cols, rows)),
            Event::Paste(text) if store.app.is_editing() => Some(Action::InputPaste(text)),
            Event::Paste(_) => None,
            Event::Key(key) => self.handle_key(key, store),
        }
    }

    /// Handle a key event and return an optional action.
    fn handle_key(&self, key: KeyEvent, store: &Store) -> Option<Action> {
        // Only process key press events
        if key.kind != KeyEventKind::Press {
            return None;
        }

        let input = InputEvent::from(key);
        // The toggle works in every mode.
        if self.hotkey.as_ref().is_some_and(|h| h.matches(&input)) {
            return Some(Action::Command(Command::ToggleWindow));
        }

        match store.app.input_mode {
            InputMode::Normal => self.handle_normal_mode(&input, store),
            InputMode::KeyEntry | InputMode::RechargeAmount | InputMode::RechargeTxHash => {
                self.handle_text_entry(key, &input)
            }
        }
    }

    fn handle_normal_mode(&self, input: &InputEvent, store: &Store) -> Option<Action> {
        let keys = &self.keybindings;

        if input.matches(&keys.quit) {
            return Some(Action::Command(Command::QuitApp));
        }

        if input.matches(&keys.hide) {
            return store
                .overlay
                .content_visible
                .then_some(Action::Command(Command::ToggleWindow));
        }

        if input.matches(&keys.vote_yes) {
            return Some(Action::CastVote(Side::Yes));
        }
        if input.matches(&keys.vote_no) {
            return Some(Action::CastVote(Side::No));
        }

        if input.matches(&keys.wallet_mode) {
            return Some(Action::Command(Command::WalletMode(
                !store.overlay.wallet_mode,
            )));
        }

        if input.matches(&keys.connect) && !store.wallet.is_connected() && !store.wallet.connecting
        {
            return Some(Action::SetInputMode(InputMode::KeyEntry));
        }
        if input.matches(&keys.disconnect) && store.wallet.is_connected() {
            return Some(Action::DisconnectWallet);
        }
        if input.matches(&keys.refresh_balance) && store.wallet.is_connected() {
            return Some(Action::RefreshBalance);
        }
        if input.matches(&keys.recharge) && store.wallet.is_connected() {
            if store.wallet.receiving_address.is_none() {
                return Some(Action::ShowNotification(Notification::warning(
                    "Receiving address not configured",
                )));
            }
            return (!store.wallet.recharging)
                .then_some(Action::SetInputMode(InputMode::RechargeAmount));
        }

        None
    }

    fn handle_text_entry(&self, key: KeyEvent, input: &InputEvent) -> Option<Action> {
        match key.code {
            KeyCode::Esc => Some(Action::SetInputMode(InputMode::Normal)),
            KeyCode::Enter => Some(Action::SubmitInput),
            KeyCode::Backspace => Some(Action::InputBackspace),
            KeyCode::Left => Some(Action::CursorLeft),
            KeyCode::Right => Some(Action::CursorRight),
            _ => input.char().map(Action::InputChar),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crossterm::event::KeyModifiers;
    use tokio::sync::mpsc;

    fn store() -> Store {
        let (tx, _rx) = mpsc::unbounded_channel();
        Store::new(&Config::default(), tx)
    }

    fn key(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent::new(code, modifiers))
    }

    #[test]
    fn test_hotkey_toggles_in_every_mode() {
        let handler = EventHandler::new(KeyBindings::default());
        let mut store = store();
        let alt_l = key(KeyCode::Char('l'), KeyModifiers::ALT);

        assert!(matches!(
            handler.handle(alt_l.clone(), &store),
            Some(Action::Command(Command::ToggleWindow))
        ));
        store.app.input_mode = InputMode::KeyEntry;
        assert!(matches!(
            handler.handle(alt_l, &store),
            Some(Action::Command(Command::ToggleWindow))
        ));
    }

    #[test]
    fn test_bad_hotkey_is_not_fatal() {
        let keybindings = KeyBindings {
            toggle_window: "alt+".to_string(),
            ..KeyBindings::default()
        };
        let handler = EventHandler::new(keybindings);
        assert!(handler.hotkey().is_none());
        assert!(matches!(
            handler.handle(key(KeyCode::Char('y'), KeyModifiers::NONE), &store()),
            Some(Action::CastVote(Side::Yes))
        ));
    }

    #[test]
    fn test_unregister() {
        let mut handler = EventHandler::new(KeyBindings::default());
        handler.shutdown();
        assert!(!handler.hotkey().unwrap().is_registered());
        assert!(
            handler
                .handle(key(KeyCode::Char('l'), KeyModifiers::ALT), &store())
                .is_none()
        );
    }

    #[test]
    fn test_wallet_keys_depend_on_connection() {
        let handler = EventHandler::new(KeyBindings::default());
        let mut store = store();
        let c = key(KeyCode::Char('c'), KeyModifiers::NONE);
        let d = key(KeyCode::Char('d'), KeyModifiers::NONE);

        assert!(matches!(
            handler.handle(c.clone(), &store),
            Some(Action::SetInputMode(InputMode::KeyEntry))
        ));
        assert!(handler.handle(d.clone(), &store).is_none());

        store.wallet.address = Some("0xabc".to_string());
        assert!(handler.handle(c, &store).is_none());
        assert!(matches!(
            handler.handle(d, &store),
            Some(Action::DisconnectWallet)
        ));
    }

    #[test]
    fn test_recharge_key() {
        let handler = EventHandler::new(KeyBindings::default());
        let mut store = store();
        let r = key(KeyCode::Char('r'), KeyModifiers::NONE);

        assert!(handler.handle(r.clone(), &store).is_none());

        store.wallet.address = Some("0xabc".to_string());
        assert!(matches!(
            handler.handle(r.clone(), &store),
            Some(Action::ShowNotification(_))
        ));

        store.wallet.receiving_address = Some("0xdef".to_string());
        assert!(matches!(
            handler.handle(r.clone(), &store),
            Some(Action::SetInputMode(InputMode::RechargeAmount))
        ));

        store.wallet.recharging = true;
        assert!(handler.handle(r, &store).is_none());
    }

    #[test]
    fn test_recharge_prompts_capture_text() {
        let handler = EventHandler::new(KeyBindings::default());
        let mut store = store();
        for mode in [InputMode::RechargeAmount, InputMode::RechargeTxHash] {
            store.app.input_mode = mode;
            assert!(matches!(
                handler.handle(key(KeyCode::Char('n'), KeyModifiers::NONE), &store),
                Some(Action::InputChar('n'))
            ));
            assert!(matches!(
                handler.handle(key(KeyCode::Esc, KeyModifiers::NONE), &store),
                Some(Action::SetInputMode(InputMode::Normal))
            ));
        }
    }

    #[test]
    fn test_key_entry_captures_characters() {
        let handler = EventHandler::new(KeyBindings::default());
        let mut store = store();
        store.app.input_mode = InputMode::KeyEntry;

        // 'y' is typed, not a vote.
        assert!(matches!(
            handler.handle(key(KeyCode::Char('y'), KeyModifiers::NONE), &store),
            Some(Action::InputChar('y'))
        ));
        assert!(matches!(
            handler.handle(key(KeyCode::Enter, KeyModifiers::NONE), &store),
            Some(Action::SubmitInput)
        ));
        assert!(matches!(
            handler.handle(Event::Paste("0xab".into()), &store),
            Some(Action::InputPaste(_))
        ));
    }

    #[test]
    fn test_escape_hides_only_when_shown() {
        let handler = EventHandler::new(KeyBindings::default());
        let mut store = store();
        let esc = key(KeyCode::Esc, KeyModifiers::NONE);
        assert!(handler.handle(esc.clone(), &store).is_none());
        store.overlay.content_visible = true;
        assert!(matches!(
            handler.handle(esc, &store),
            Some(Action::Command(Command::ToggleWindow))
        ));
    }
}
