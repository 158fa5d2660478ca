//! Configuration settings for notchbet.

use crate::animator::{MIN_WINDOW_HEIGHT, MIN_WINDOW_WIDTH};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable prefix for overrides, e.g. `NOTCHBET__DATABASE__URL`.
const ENV_PREFIX: &str = "NOTCHBET";

/// Upper bound on the frame count of any single animation.
pub const MAX_ANIMATION_STEPS: u32 = 1000;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Overlay geometry.
    pub window: WindowConfig,
    /// Animation timing.
    pub animation: AnimationConfig,
    /// Market polling.
    pub poller: PollerConfig,
    /// Voting sessions.
    pub voting: VotingConfig,
    /// Reward payout parameters.
    pub rewards: RewardsConfig,
    /// Wallet / RPC configuration.
    pub wallet: WalletConfig,
    /// Remote data store.
    pub database: DatabaseConfig,
    /// UI configuration.
    pub ui: UiConfig,
    /// Key bindings.
    pub keybindings: KeyBindings,
}

impl Config {
    /// Load configuration from file, returning default if file doesn't exist.
    pub fn load_or_default() -> crate::Result<Self> {
        Self::load(None)
    }

    /// Load configuration from file, layering environment overrides on top.
    pub fn load(path: Option<PathBuf>) -> crate::Result<Self> {
        let config_path = path.unwrap_or_else(default_config_path);

        let settings = ::config::Config::builder()
            .add_source(::config::File::from(config_path).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::Error::config(e.to_string()))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| crate::Error::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn save(&self, path: Option<PathBuf>) -> crate::Result<()> {
        let config_path = path.unwrap_or_else(default_config_path);

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::config(e.to_string()))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Reject settings the animator or voting machine cannot run with.
    pub fn validate(&self) -> crate::Result<()> {
        let a = &self.animation;
        for steps in [a.slide_in_steps, a.slide_out_steps, a.resize_steps] {
            if steps == 0 || steps > MAX_ANIMATION_STEPS {
                return Err(crate::Error::config(format!(
                    "animation steps must be between 1 and {}",
                    MAX_ANIMATION_STEPS
                )));
            }
        }
        let w = &self.window;
        if w.min_width < MIN_WINDOW_WIDTH || w.min_height < MIN_WINDOW_HEIGHT {
            return Err(crate::Error::config(format!(
                "minimum overlay size is {}x{}",
                MIN_WINDOW_WIDTH, MIN_WINDOW_HEIGHT
            )));
        }
        if w.normal_width < w.min_width || w.expanded_width < w.min_width {
            return Err(crate::Error::config(format!(
                "overlay widths must be at least {}",
                w.min_width
            )));
        }
        if w.collapsed_width < w.min_width {
            return Err(crate::Error::config("collapsed geometry below minimum"));
        }
        if self.voting.duration_secs == 0 {
            return Err(crate::Error::config("voting duration must be positive"));
        }
        if self.poller.interval_secs == 0 {
            return Err(crate::Error::config("poll interval must be positive"));
        }
        if self.wallet.min_recharge <= Decimal::ZERO
            || self.wallet.max_recharge < self.wallet.min_recharge
        {
            return Err(crate::Error::config("invalid recharge bounds"));
        }
        Ok(())
    }
}

fn default_config_path() -> PathBuf {
    super::config_dir()
        .map(|p| p.join("config.toml"))
        .unwrap_or_else(|_| PathBuf::from("config.toml"))
}

/// Overlay geometry in pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Width in normal (compact) mode.
    pub normal_width: i32,
    /// Height in normal (compact) mode.
    pub normal_height: i32,
    /// Width in expanded (wallet/voting) mode.
    pub expanded_width: i32,
    /// Height in expanded (wallet/voting) mode.
    pub expanded_height: i32,
    /// Width the overlay slides in from and out to.
    pub collapsed_width: i32,
    /// Smallest width ever applied to the window.
    pub min_width: i32,
    /// Smallest height ever applied to the window.
    pub min_height: i32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            normal_width: 320,
            normal_height: 140,
            expanded_width: 450,
            expanded_height: 250,
            collapsed_width: 200,
            min_width: 100,
            min_height: 1,
        }
    }
}

/// Animation timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub slide_in_duration_ms: u64,
    pub slide_in_steps: u32,
    pub slide_out_duration_ms: u64,
    pub slide_out_steps: u32,
    pub resize_duration_ms: u64,
    pub resize_steps: u32,
    /// Delay between `show()` and the start of a slide-in.
    pub settle_delay_ms: u64,
    /// Time into a slide-in at which the fade-in signal fires.
    pub fade_in_delay_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            slide_in_duration_ms: 400,
            slide_in_steps: 30,
            slide_out_duration_ms: 300,
            slide_out_steps: 20,
            resize_duration_ms: 300,
            resize_steps: 20,
            settle_delay_ms: 100,
            fade_in_delay_ms: 200,
        }
    }
}

/// Market polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Whether to poll for markets at all.
    pub enabled: bool,
    /// Seconds between polls.
    pub interval_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 3,
        }
    }
}

/// Voting sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VotingConfig {
    /// Length of the voting window in seconds.
    pub duration_secs: u32,
    /// Expand the overlay while a session is open.
    pub expand_on_question: bool,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            duration_secs: 30,
            expand_on_question: true,
        }
    }
}

/// Reward payout parameters, in native currency units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardsConfig {
    /// Paid to every winning voter.
    pub base_reward: Decimal,
    /// Added to the bonus pool per losing vote.
    pub bonus_per_losing_vote: Decimal,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            base_reward: dec!(0.001),
            bonus_per_losing_vote: dec!(0.0005),
        }
    }
}

/// Wallet / RPC configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// JSON-RPC endpoint.
    pub rpc_url: String,
    /// Expected chain id.
    pub chain_id: u64,
    /// Human readable network name.
    pub network_name: String,
    /// Native currency symbol.
    pub symbol: String,
    /// Address recharges are sent to.
    pub receiving_address: Option<String>,
    /// Smallest accepted recharge amount.
    pub min_recharge: Decimal,
    /// Largest accepted recharge amount.
    pub max_recharge: Decimal,
    /// Reconnect with the stored credential at startup.
    pub auto_reconnect: bool,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://rpc-amoy.polygon.technology".to_string(),
            chain_id: 80002,
            network_name: "Polygon Amoy".to_string(),
            symbol: "POL".to_string(),
            receiving_address: None,
            min_recharge: dec!(0.001),
            max_recharge: dec!(100),
            auto_reconnect: true,
            timeout_secs: 30,
        }
    }
}

/// Remote data store. Without a URL the app runs against an in-memory store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgREST base URL, e.g. `https://<project>.supabase.co`.
    pub url: Option<String>,
    /// Anonymous API key.
    pub anon_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            timeout_secs: 10,
        }
    }
}

/// UI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Tick rate in milliseconds for UI updates.
    pub tick_rate_ms: u64,
    /// Horizontal pixels represented by one terminal cell.
    pub px_per_col: u16,
    /// Vertical pixels represented by one terminal cell.
    pub px_per_row: u16,
    /// Show status bar.
    pub show_status_bar: bool,
    /// Seconds a status message stays visible.
    pub message_secs: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: 250,
            px_per_col: 8,
            px_per_row: 16,
            show_status_bar: true,
            message_secs: 3,
        }
    }
}

/// Key bindings configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    /// Global toggle for the overlay.
    pub toggle_window: String,
    /// Hide the overlay from inside it.
    pub hide: String,
    /// Quit the application.
    pub quit: String,
    /// Vote yes on the open question.
    pub vote_yes: String,
    /// Vote no on the open question.
    pub vote_no: String,
    /// Switch between normal and wallet mode.
    pub wallet_mode: String,
    /// Start private key entry.
    pub connect: String,
    /// Disconnect the wallet.
    pub disconnect: String,
    /// Refresh balances.
    pub refresh_balance: String,
    /// Start a recharge.
    pub recharge: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            toggle_window: "alt+l".to_string(),
            hide: "Esc".to_string(),
            quit: "ctrl+q".to_string(),
            vote_yes: "y".to_string(),
            vote_no: "n".to_string(),
            wallet_mode: "w".to_string(),
            connect: "c".to_string(),
            disconnect: "d".to_string(),
            refresh_balance: "b".to_string(),
            recharge: "r".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window.normal_width, 320);
        assert_eq!(config.window.expanded_height, 250);
        assert_eq!(config.voting.duration_secs, 30);
        assert_eq!(config.poller.interval_secs, 3);
    }

    #[test]
    fn test_zero_steps_rejected() {
        let mut config = Config::default();
        config.animation.resize_steps = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_step_ceiling_and_size_floor() {
        let mut config = Config::default();
        config.animation.slide_in_steps = u32::MAX;
        assert!(config.validate().is_err());
        config.animation.slide_in_steps = MAX_ANIMATION_STEPS;
        assert!(config.validate().is_ok());

        config.window.min_width = 50;
        config.window.collapsed_width = 60;
        assert!(config.validate().is_err());
        config.window.min_width = 100;
        config.window.min_height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [voting]
            duration_secs = 10

            [rewards]
            base_reward = "0.002"
            "#,
        )
        .unwrap();
        assert_eq!(config.voting.duration_secs, 10);
        assert_eq!(config.rewards.base_reward, dec!(0.002));
        assert_eq!(config.rewards.bonus_per_losing_vote, dec!(0.0005));
        assert_eq!(config.window.collapsed_width, 200);
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("notchbet-missing-config.toml");
        let _ = std::fs::remove_file(&path);
        let config = Config::load(Some(path)).unwrap();
        assert_eq!(config.keybindings.toggle_window, "alt+l");
    }
}
