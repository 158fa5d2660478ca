//! Wallet connection.
//!
//! The connector validates a private key, derives the signer address and
//! checks the configured node before reporting a connection. Failures cross
//! the connector boundary as [`ConnectOutcome::Failed`] with a readable
//! reason rather than as errors.

mod connector;
mod key_store;
mod rpc;

pub use connector::{WalletConnector, derive_address};
pub use key_store::KeyStore;
pub use rpc::{RpcClient, Transaction, TransactionReceipt, parse_quantity, wei_to_decimal};

use crate::config::WalletConfig;
use crate::error::{Error, Result};
use rust_decimal::Decimal;

/// Length of a private key in hex digits, without the `0x` prefix.
pub const PRIVATE_KEY_LEN: usize = 64;

/// Length of a transaction hash in hex digits, without the `0x` prefix.
pub const TX_HASH_LEN: usize = 64;

/// The signer identity votes and rewards are tagged with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletIdentity {
    pub address: String,
    pub connected: bool,
}

/// Result of a connect attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected { address: String },
    Failed { error: String },
}

impl ConnectOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn address(&self) -> Option<&str> {
        match self {
            Self::Connected { address } => Some(address),
            Self::Failed { .. } => None,
        }
    }
}

/// Snapshot of the connection for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub address: Option<String>,
    pub network: String,
}

/// Strip an optional `0x` prefix and check length and alphabet.
///
/// Runs before any network call so a malformed key never reaches the node.
pub fn validate_private_key(key: &str) -> Result<&str> {
    let key = key.trim();
    let clean = key.strip_prefix("0x").unwrap_or(key);
    if clean.len() != PRIVATE_KEY_LEN {
        return Err(Error::invalid_input(format!(
            "Invalid private key length: {}. Expected {} characters.",
            clean.len(),
            PRIVATE_KEY_LEN
        )));
    }
    if !clean.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::invalid_input(
            "Invalid private key format. Must be hexadecimal.",
        ));
    }
    Ok(clean)
}

/// Check a recharge amount against the configured bounds.
pub fn check_recharge_amount(amount: Decimal, config: &WalletConfig) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::invalid_input("Amount must be greater than 0"));
    }
    if amount < config.min_recharge {
        return Err(Error::invalid_input(format!(
            "Minimum recharge is {} {}",
            config.min_recharge, config.symbol
        )));
    }
    if amount > config.max_recharge {
        return Err(Error::invalid_input(format!(
            "Maximum recharge is {} {}",
            config.max_recharge, config.symbol
        )));
    }
    Ok(())
}

/// Parse a typed recharge amount and check it against the bounds.
pub fn parse_recharge_amount(input: &str, config: &WalletConfig) -> Result<Decimal> {
    let amount: Decimal = input
        .trim()
        .parse()
        .map_err(|_| Error::invalid_input("Invalid amount"))?;
    check_recharge_amount(amount, config)?;
    Ok(amount)
}

/// Normalise a transaction hash to lowercase `0x`-prefixed form.
pub fn validate_tx_hash(hash: &str) -> Result<String> {
    let hash = hash.trim();
    let clean = hash.strip_prefix("0x").unwrap_or(hash);
    if clean.len() != TX_HASH_LEN || !clean.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::invalid_input(format!(
            "Invalid transaction hash. Expected 0x followed by {} hex digits.",
            TX_HASH_LEN
        )));
    }
    Ok(format!("0x{}", clean.to_ascii_lowercase()))
}

/// The message shown to the user for a failed wallet operation.
pub fn failure_reason(error: &Error) -> String {
    match error {
        Error::InvalidInput(msg) | Error::Wallet(msg) | Error::Network(msg) => msg.clone(),
        other => other.to_string(),
    }
}
