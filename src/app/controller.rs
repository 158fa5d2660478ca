//! Action handling and the voting lifecycle.
//!
//! The controller owns the store and the animator and turns actions into
//! state changes, window commands and spawned network work. It knows nothing
//! about the terminal, so the whole lifecycle can be driven from tests.

use crate::animator::{OverlayMode, TickOutcome, VirtualWindow, WindowAnimator};
use crate::config::{Config, UiConfig};
use crate::error::Error;
use crate::market::{
    Market, PollDecision, Settlement, SettlementReport, Side, VoteOutcome, normalize_identity,
};
use crate::state::{Action, Command, InputMode, Notification, Secret, Store};
use crate::store::MarketStore;
use crate::wallet::{WalletConnector, failure_reason, parse_recharge_amount};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Display work-area width in pixels for a terminal `cols` wide.
pub fn work_area_width(cols: u16, ui: &UiConfig) -> i32 {
    i32::from(cols) * i32::from(ui.px_per_col.max(1))
}

/// Store, animator and collaborators behind the event loop.
pub struct Controller {
    pub store: Store,
    animator: WindowAnimator<VirtualWindow>,
    market_store: Arc<dyn MarketStore>,
    settlement: Arc<Settlement>,
    wallet: Arc<WalletConnector>,
    config: Config,
}

impl Controller {
    pub fn new(
        config: Config,
        store: Store,
        animator: WindowAnimator<VirtualWindow>,
        market_store: Arc<dyn MarketStore>,
        wallet: Arc<WalletConnector>,
    ) -> Self {
        let settlement = Arc::new(Settlement::new(
            market_store.clone(),
            config.rewards.clone(),
        ));
        Self {
            store,
            animator,
            market_store,
            settlement,
            wallet,
            config,
        }
    }

    pub fn animator(&self) -> &WindowAnimator<VirtualWindow> {
        &self.animator
    }

    /// Reconnect a stored wallet if configured, then reveal the overlay.
    pub fn start(&mut self) {
        if self.config.wallet.auto_reconnect {
            self.spawn_reconnect();
        }
        self.handle_command(Command::ToggleWindow);
    }

    /// Stop any animation in flight.
    pub fn shutdown(&mut self) {
        self.animator.cancel();
    }

    /// Copy the window snapshot into the store for rendering.
    pub fn sync_overlay(&mut self) {
        self.store.overlay.sync(&self.animator);
    }

    /// Delay before the next animation frame, if one is running.
    pub fn next_frame_delay(&self) -> Option<Duration> {
        self.animator.next_delay()
    }

    pub fn step_animation(&mut self) {
        match self.animator.tick() {
            TickOutcome::Finished(kind) => debug!("{:?} finished", kind),
            TickOutcome::Halted(kind) => debug!("{:?} halted", kind),
            TickOutcome::Stepped { .. } | TickOutcome::Idle => {}
        }
    }

    /// Handle an action.
    pub fn handle_action(&mut self, action: Action) {
        match action {
            Action::Command(command) => self.handle_command(command),
            Action::SubmitInput => self.submit_input(),
            Action::ConnectWallet(key) => self.connect_wallet(key),
            Action::WalletConnected(outcome) => {
                let connected = outcome.is_success();
                self.store.reduce(Action::WalletConnected(outcome));
                if connected {
                    self.refresh_balance();
                }
            }
            Action::DisconnectWallet => self.disconnect_wallet(),
            Action::RefreshBalance => self.refresh_balance(),
            Action::RechargeCompleted(amount) => {
                self.store.reduce(Action::RechargeCompleted(amount));
                self.refresh_balance();
            }
            Action::CastVote(side) => self.cast_vote(side),
            Action::PollMarkets => self.poll_markets(),
            Action::MarketFetched(latest) => self.on_market_fetched(latest, Utc::now()),
            Action::MarketFetchFailed(reason) => {
                self.store.poller.fetch_failed(&Error::application(reason));
            }
            Action::CountdownTick => self.countdown(Utc::now()),
            Action::SessionSettled(report) => self.on_settled(report),
            Action::Resize(cols, rows) => {
                self.store.reduce(Action::Resize(cols, rows));
                let width = work_area_width(cols, &self.config.ui);
                self.animator.window_mut().set_work_area_width(width);
                if let Err(e) = self.animator.on_display_metrics_changed() {
                    warn!("Failed to re-centre overlay: {}", e);
                }
            }
            other => self.store.reduce(other),
        }
    }

    pub fn handle_command(&mut self, command: Command) {
        let result = match command {
            Command::ToggleWindow => self.animator.toggle_visibility(),
            Command::WalletMode(enable) => {
                self.store.overlay.wallet_mode = enable;
                if enable && self.store.wallet.is_connected() {
                    self.refresh_balance();
                }
                // A question keeps the panel expanded.
                let mode = if self.store.voting.is_idle() {
                    self.store.overlay.resting_mode()
                } else {
                    OverlayMode::Expanded
                };
                self.animator.set_mode(mode).map(|_| ())
            }
            Command::ExpandForQuestion => {
                self.animator.set_mode(OverlayMode::Expanded).map(|_| ())
            }
            Command::CollapseAfterQuestion => self
                .animator
                .set_mode(self.store.overlay.resting_mode())
                .map(|_| ()),
            Command::QuitApp => {
                self.store.reduce(Action::Command(Command::QuitApp));
                Ok(())
            }
        };

        if let Err(e) = result {
            error!("Overlay command {:?} failed: {}", command, e);
        }
    }

    /// Advance the open session to `now`; close and settle it when its
    /// time is up.
    pub fn countdown(&mut self, now: DateTime<Utc>) {
        let Some(result) = self.store.voting.tick(now) else {
            return;
        };

        self.handle_command(Command::CollapseAfterQuestion);
        let settlement = self.settlement.clone();
        let tx = self.store.sender();
        tokio::spawn(async move {
            let report = settlement.settle(&result).await;
            let _ = tx.send(Action::SessionSettled(report));
        });
    }

    fn submit_input(&mut self) {
        let mode = self.store.app.input_mode;
        let input = self.store.app.take_input();
        let pending = self.store.wallet.pending_recharge;
        self.store.reduce(Action::SetInputMode(InputMode::Normal));

        match mode {
            InputMode::Normal => {}
            InputMode::KeyEntry => self.connect_wallet(Secret(input)),
            InputMode::RechargeAmount => self.begin_recharge(&input),
            InputMode::RechargeTxHash => self.confirm_recharge(input, pending),
        }
    }

    fn cast_vote(&mut self, side: Side) {
        let identity = self.store.wallet.identity();
        let market_id = self.store.voting.session().map(|s| s.market.id);

        match self.store.voting.cast_vote(identity.as_deref(), side) {
            VoteOutcome::Accepted { identity, side } => {
                self.store.notify(
                    Notification::success(format!("Voted {}", side))
                        .with_duration(self.config.ui.message_secs),
                );
                if let Some(market_id) = market_id {
                    let settlement = self.settlement.clone();
                    tokio::spawn(async move {
                        settlement.record_vote(market_id, &identity, side).await;
                    });
                }
            }
            VoteOutcome::LocalOnly(side) => {
                self.store.notify(Notification::info(format!(
                    "Voted {} locally. Connect a wallet to earn rewards",
                    side
                )));
            }
            VoteOutcome::AlreadyVoted => {
                self.store
                    .notify(Notification::info("You already voted on this question"));
            }
            VoteOutcome::NotOpen => debug!("Vote ignored, no open question"),
        }
    }

    fn poll_markets(&mut self) {
        if !self.store.poller.begin_fetch(self.store.voting.is_idle()) {
            return;
        }
        let market_store = self.market_store.clone();
        let tx = self.store.sender();
        tokio::spawn(async move {
            let action = match market_store.latest_market().await {
                Ok(latest) => Action::MarketFetched(latest),
                Err(e) => Action::MarketFetchFailed(e.to_string()),
            };
            let _ = tx.send(action);
        });
    }

    fn on_market_fetched(&mut self, latest: Option<Market>, now: DateTime<Utc>) {
        let decision = self.store.poller.observe(latest, self.store.voting.is_idle());
        let PollDecision::NewMarket(market) = decision else {
            return;
        };

        match self.store.voting.open(market, now) {
            Ok(session) => {
                let question = session.market.question.clone();
                self.store.last_settlement = None;
                self.store.notify(Notification::info(question));
                if self.config.voting.expand_on_question {
                    self.handle_command(Command::ExpandForQuestion);
                }
            }
            Err(e) => warn!("Could not open voting session: {}", e),
        }
    }

    fn on_settled(&mut self, report: SettlementReport) {
        let reward = self
            .store
            .wallet
            .identity()
            .and_then(|id| report.reward_for(&id));
        let message = match (report.winning_side, reward) {
            (Some(side), Some(amount)) => Notification::success(format!(
                "{} wins! +{} {}",
                side,
                amount.round_dp(6),
                self.store.wallet.symbol
            )),
            (Some(side), None) => Notification::info(format!("{} wins", side)),
            (None, _) => Notification::info("Question closed with no votes"),
        };

        self.store.reduce(Action::SessionSettled(report));
        self.store
            .notify(message.with_duration(self.config.ui.message_secs));
        if reward.is_some() {
            self.refresh_balance();
        }
    }

    fn connect_wallet(&mut self, key: Secret) {
        if key.0.trim().is_empty() {
            return;
        }
        self.store.reduce(Action::ConnectWallet(key.clone()));
        let wallet = self.wallet.clone();
        let tx = self.store.sender();
        tokio::spawn(async move {
            let outcome = wallet.connect_with_private_key(&key.0).await;
            let _ = tx.send(Action::WalletConnected(outcome));
        });
    }

    fn spawn_reconnect(&mut self) {
        let wallet = self.wallet.clone();
        let tx = self.store.sender();
        tokio::spawn(async move {
            // Nothing stored means nothing to report.
            if let Some(outcome) = wallet.reconnect().await {
                let _ = tx.send(Action::WalletConnected(outcome));
            }
        });
    }

    fn disconnect_wallet(&mut self) {
        let wallet = self.wallet.clone();
        let tx = self.store.sender();
        tokio::spawn(async move {
            wallet.disconnect().await;
            let _ = tx.send(Action::WalletDisconnected);
        });
    }

    /// Bounds are checked here; the balance check needs the node.
    fn begin_recharge(&mut self, input: &str) {
        let amount = match parse_recharge_amount(input, &self.config.wallet) {
            Ok(amount) => amount,
            Err(e) => {
                self.store.notify(Notification::warning(failure_reason(&e)));
                return;
            }
        };

        self.store.wallet.recharging = true;
        let wallet = self.wallet.clone();
        let tx = self.store.sender();
        tokio::spawn(async move {
            let action = match wallet.validate_recharge(amount).await {
                Ok(()) => Action::RechargeValidated(amount),
                Err(e) => {
                    warn!("Recharge of {} rejected: {}", amount, e);
                    Action::RechargeFailed(failure_reason(&e))
                }
            };
            let _ = tx.send(action);
        });
    }

    fn confirm_recharge(&mut self, tx_hash: String, expected: Option<Decimal>) {
        if tx_hash.trim().is_empty() {
            return;
        }
        self.store.wallet.recharging = true;
        let wallet = self.wallet.clone();
        let tx = self.store.sender();
        tokio::spawn(async move {
            let action = match wallet.confirm_recharge(&tx_hash).await {
                Ok(amount) => {
                    if let Some(expected) = expected.filter(|e| *e != amount) {
                        warn!(
                            "Recharge {} credited {}, {} was expected",
                            tx_hash, amount, expected
                        );
                    }
                    Action::RechargeCompleted(amount)
                }
                Err(e) => {
                    warn!("Recharge {} not credited: {}", tx_hash, e);
                    Action::RechargeFailed(failure_reason(&e))
                }
            };
            let _ = tx.send(action);
        });
    }

    fn refresh_balance(&mut self) {
        self.store.reduce(Action::RefreshBalance);
        let wallet = self.wallet.clone();
        let market_store = self.market_store.clone();
        let tx = self.store.sender();
        tokio::spawn(async move {
            let balance = match wallet.balance().await {
                Ok(balance) => Some(balance),
                Err(e) => {
                    warn!("{}", e);
                    let _ = tx.send(Action::ShowNotification(Notification::warning(
                        failure_reason(&e),
                    )));
                    None
                }
            };
            let credited = wallet.credited_balance().await;
            let rewards = match wallet.identity().await {
                Some(identity) => market_store
                    .balance(&normalize_identity(&identity.address))
                    .await
                    .unwrap_or_else(|e| {
                        warn!("Failed to load reward balance: {}", e);
                        Default::default()
                    }),
                None => Default::default(),
            };
            let _ = tx.send(Action::BalanceLoaded {
                balance,
                credited,
                rewards,
            });
        });
    }
}
