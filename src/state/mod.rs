//! State management for notchbet.
//!
//! This module provides centralized state management with a unidirectional
//! data flow pattern inspired by Redux/Elm architecture. Actions that only
//! touch display state are reduced here; actions with side effects are
//! intercepted by the app first.

mod app_state;
mod overlay_state;
mod wallet_state;

pub use app_state::{AppState, InputMode};
pub use overlay_state::OverlayState;
pub use wallet_state::WalletState;

use crate::animator::OverlaySignal;
use crate::config::Config;
use crate::market::{Market, MarketPoller, SettlementReport, Side, VotingMachine};
use crate::wallet::ConnectOutcome;
use rust_decimal::Decimal;
use std::time::Instant;
use tokio::sync::mpsc;

/// Commands the overlay accepts from its UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ToggleWindow,
    WalletMode(bool),
    ExpandForQuestion,
    CollapseAfterQuestion,
    QuitApp,
}

/// Actions that can be dispatched to modify state.
#[derive(Debug, Clone)]
pub enum Action {
    Command(Command),

    // Input
    SetInputMode(InputMode),
    InputChar(char),
    InputPaste(String),
    InputBackspace,
    CursorLeft,
    CursorRight,
    SubmitInput,

    // Overlay
    Overlay(OverlaySignal),
    Resize(u16, u16),

    // Voting
    CastVote(Side),
    PollMarkets,
    MarketFetched(Option<Market>),
    MarketFetchFailed(String),
    CountdownTick,
    SessionSettled(SettlementReport),

    // Wallet
    ConnectWallet(Secret),
    WalletConnected(ConnectOutcome),
    DisconnectWallet,
    WalletDisconnected,
    RefreshBalance,
    RechargeValidated(Decimal),
    RechargeCompleted(Decimal),
    RechargeFailed(String),
    BalanceLoaded {
        balance: Option<Decimal>,
        credited: Decimal,
        rewards: Decimal,
    },

    // UI
    ShowNotification(Notification),
    Tick,
}

/// Key material travelling through the action channel; never printed.
#[derive(Clone)]
pub struct Secret(pub String);

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret(***)")
    }
}

/// A notification to display to the user.
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
    pub duration_secs: u64,
}

/// Notification severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NotificationLevel::Info,
            duration_secs: 3,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NotificationLevel::Success,
            duration_secs: 3,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NotificationLevel::Warning,
            duration_secs: 5,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NotificationLevel::Error,
            duration_secs: 10,
        }
    }

    pub fn with_duration(mut self, secs: u64) -> Self {
        self.duration_secs = secs;
        self
    }
}

/// The global state store.
#[derive(Debug)]
pub struct Store {
    /// Application state.
    pub app: AppState,
    /// Overlay window snapshot.
    pub overlay: OverlayState,
    /// Wallet display state.
    pub wallet: WalletState,
    /// Voting lifecycle.
    pub voting: VotingMachine,
    /// New-market detection.
    pub poller: MarketPoller,
    /// Last settled session, shown until the next question.
    pub last_settlement: Option<SettlementReport>,
    /// Action sender for dispatching actions.
    action_tx: mpsc::UnboundedSender<Action>,
}

impl Store {
    /// Create a new store with the given action sender.
    pub fn new(config: &Config, action_tx: mpsc::UnboundedSender<Action>) -> Self {
        Self {
            app: AppState::new(),
            overlay: OverlayState::default(),
            wallet: WalletState::new(&config.wallet.network_name, &config.wallet.symbol)
                .with_receiving_address(config.wallet.receiving_address.clone()),
            voting: VotingMachine::new(config.voting.duration_secs),
            poller: MarketPoller::new(),
            last_settlement: None,
            action_tx,
        }
    }

    /// A sender for background tasks.
    pub fn sender(&self) -> mpsc::UnboundedSender<Action> {
        self.action_tx.clone()
    }

    pub fn notify(&mut self, notification: Notification) {
        self.app.notify(notification, Instant::now());
    }

    /// Apply an action to update state.
    pub fn reduce(&mut self, action: Action) {
        match action {
            // Input
            Action::SetInputMode(mode) => {
                if self.app.input_mode == InputMode::RechargeTxHash && mode == InputMode::Normal {
                    self.wallet.pending_recharge = None;
                }
                self.app.input_mode = mode;
                self.app.clear_input();
            }
            Action::InputChar(c) => self.app.push_char(c),
            Action::InputPaste(text) => self.app.push_str(&text),
            Action::InputBackspace => self.app.pop_char(),
            Action::CursorLeft => self.app.cursor_left(),
            Action::CursorRight => self.app.cursor_right(),

            // Overlay
            Action::Overlay(signal) => self.overlay.apply_signal(signal),
            Action::Resize(cols, rows) => self.app.terminal_size = (cols, rows),

            // Voting
            Action::SessionSettled(report) => {
                self.voting.finish();
                self.last_settlement = Some(report);
            }

            // Wallet
            Action::ConnectWallet(_) => {
                self.wallet.connecting = true;
                self.wallet.last_error = None;
            }
            Action::WalletConnected(outcome) => {
                self.wallet.apply_connect(&outcome);
                match &outcome {
                    ConnectOutcome::Connected { address } => {
                        self.notify(Notification::success(format!("Connected {}", address)));
                    }
                    ConnectOutcome::Failed { error } => {
                        self.notify(Notification::error(error.clone()));
                    }
                }
            }
            Action::WalletDisconnected => {
                self.wallet.clear();
                self.notify(Notification::info("Wallet disconnected"));
            }
            Action::RefreshBalance => self.wallet.loading_balance = true,
            Action::RechargeValidated(amount) => {
                self.wallet.recharging = false;
                self.wallet.pending_recharge = Some(amount);
                self.app.input_mode = InputMode::RechargeTxHash;
                self.app.clear_input();
                let to = self.wallet.receiving_address.clone().unwrap_or_default();
                self.notify(
                    Notification::info(format!(
                        "Send {} {} to {}, then paste the transaction hash",
                        amount, self.wallet.symbol, to
                    ))
                    .with_duration(30),
                );
            }
            Action::RechargeCompleted(amount) => {
                self.wallet.recharging = false;
                self.wallet.pending_recharge = None;
                self.notify(Notification::success(format!(
                    "Recharge of {} {} credited",
                    amount, self.wallet.symbol
                )));
            }
            Action::RechargeFailed(reason) => {
                self.wallet.recharging = false;
                self.wallet.pending_recharge = None;
                self.notify(Notification::error(reason));
            }
            Action::BalanceLoaded {
                balance,
                credited,
                rewards,
            } => {
                self.wallet.loading_balance = false;
                if balance.is_some() {
                    self.wallet.balance = balance;
                }
                self.wallet.credited = credited;
                self.wallet.rewards = rewards;
            }

            // UI
            Action::ShowNotification(notification) => self.notify(notification),
            Action::Tick => self.app.expire_notification(Instant::now()),

            // Quit
            Action::Command(Command::QuitApp) => {
                self.app.should_quit = true;
            }

            // Side effects are handled by the app before reaching here.
            Action::Command(_)
            | Action::SubmitInput
            | Action::CastVote(_)
            | Action::PollMarkets
            | Action::MarketFetched(_)
            | Action::MarketFetchFailed(_)
            | Action::CountdownTick
            | Action::DisconnectWallet => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::VotingState;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn store() -> (Store, mpsc::UnboundedReceiver<Action>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Store::new(&Config::default(), tx), rx)
    }

    #[test]
    fn test_sender_reaches_receiver() {
        let (store, mut rx) = store();
        store.sender().send(Action::PollMarkets).unwrap();
        assert!(matches!(rx.try_recv(), Ok(Action::PollMarkets)));
    }

    #[test]
    fn test_key_entry_mode_starts_empty() {
        let (mut store, _rx) = store();
        store.reduce(Action::SetInputMode(InputMode::KeyEntry));
        store.reduce(Action::InputChar('a'));
        store.reduce(Action::SetInputMode(InputMode::Normal));
        store.reduce(Action::SetInputMode(InputMode::KeyEntry));
        assert!(store.app.input_buffer.is_empty());
        assert!(store.app.is_editing());
    }

    #[test]
    fn test_recharge_validated_asks_for_hash() {
        let (mut store, _rx) = store();
        store.wallet.receiving_address = Some("0xdef".to_string());
        store.wallet.recharging = true;
        store.reduce(Action::RechargeValidated(dec!(2.5)));

        assert_eq!(store.app.input_mode, InputMode::RechargeTxHash);
        assert_eq!(store.wallet.pending_recharge, Some(dec!(2.5)));
        assert!(!store.wallet.recharging);
        let notification = store.app.notification.clone().unwrap();
        assert_eq!(
            notification.message,
            "Send 2.5 POL to 0xdef, then paste the transaction hash"
        );

        // Cancelling the hash prompt drops the pending amount.
        store.reduce(Action::SetInputMode(InputMode::Normal));
        assert_eq!(store.wallet.pending_recharge, None);
    }

    #[test]
    fn test_recharge_outcomes() {
        let (mut store, _rx) = store();
        store.wallet.recharging = true;
        store.reduce(Action::RechargeCompleted(dec!(1)));
        assert!(!store.wallet.recharging);
        assert_eq!(
            store.app.notification.as_ref().map(|n| n.level),
            Some(NotificationLevel::Success)
        );

        store.wallet.recharging = true;
        store.wallet.pending_recharge = Some(dec!(1));
        store.reduce(Action::RechargeFailed("Transaction failed on chain".into()));
        assert!(!store.wallet.recharging);
        assert_eq!(store.wallet.pending_recharge, None);
        let notification = store.app.notification.clone().unwrap();
        assert_eq!(notification.level, NotificationLevel::Error);
        assert_eq!(notification.message, "Transaction failed on chain");
    }

    #[test]
    fn test_wallet_lifecycle() {
        let (mut store, _rx) = store();
        store.reduce(Action::ConnectWallet(Secret("k".into())));
        assert!(store.wallet.connecting);
        store.reduce(Action::WalletConnected(ConnectOutcome::Connected {
            address: "0xAbC".into(),
        }));
        assert_eq!(store.wallet.identity().as_deref(), Some("0xabc"));
        store.reduce(Action::BalanceLoaded {
            balance: Some(dec!(1.5)),
            credited: dec!(0.25),
            rewards: dec!(0.0015),
        });
        assert_eq!(store.wallet.rewards, dec!(0.0015));
        assert_eq!(store.wallet.balance, Some(dec!(1.5)));
        store.reduce(Action::WalletDisconnected);
        assert!(!store.wallet.is_connected());
        assert_eq!(store.wallet.balance, None);
    }

    #[test]
    fn test_settlement_returns_machine_to_idle() {
        let (mut store, _rx) = store();
        let market = Market::new(1, "Q?");
        store.voting.open(market, Utc::now()).unwrap();
        store.voting.close().unwrap();
        assert_eq!(store.voting.state(), VotingState::Closing);

        store.reduce(Action::SessionSettled(SettlementReport {
            market_id: 1,
            winning_side: None,
            distribution: None,
            result_persisted: true,
            credited: 0,
            failed: 0,
        }));
        assert!(store.voting.is_idle());
        assert!(store.last_settlement.is_some());
    }

    #[test]
    fn test_overlay_signals() {
        let (mut store, _rx) = store();
        store.reduce(Action::Overlay(OverlaySignal::FadeIn));
        assert!(store.overlay.content_visible);
        store.reduce(Action::Overlay(OverlaySignal::FadeOut));
        assert!(!store.overlay.content_visible);
    }

    #[test]
    fn test_secret_is_redacted() {
        let action = Action::ConnectWallet(Secret("deadbeef".into()));
        assert!(!format!("{:?}", action).contains("deadbeef"));
    }

    #[test]
    fn test_quit_command() {
        let (mut store, _rx) = store();
        store.reduce(Action::Command(Command::QuitApp));
        assert!(store.app.should_quit);
    }
}
