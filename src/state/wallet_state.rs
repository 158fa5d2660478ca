//! Wallet state shown in the overlay.

use crate::market::normalize_identity;
use crate::wallet::ConnectOutcome;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Default)]
pub struct WalletState {
    /// Checksummed address of the connected wallet.
    pub address: Option<String>,
    pub network: String,
    pub symbol: String,
    /// On-chain balance, once loaded.
    pub balance: Option<Decimal>,
    /// Recharges credited in the data store.
    pub credited: Decimal,
    /// Voting rewards balance in the data store.
    pub rewards: Decimal,
    /// A connect attempt is outstanding.
    pub connecting: bool,
    /// A balance refresh is outstanding.
    pub loading_balance: bool,
    pub last_error: Option<String>,
    /// Where recharges are sent, if configured.
    pub receiving_address: Option<String>,
    /// Amount accepted for a recharge, awaiting its transaction hash.
    pub pending_recharge: Option<Decimal>,
    /// A recharge is being validated or confirmed.
    pub recharging: bool,
}

impl WalletState {
    pub fn new(network: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    pub fn with_receiving_address(mut self, address: Option<String>) -> Self {
        self.receiving_address = address;
        self
    }

    /// Connected, a receiving address is set and no recharge is in flight.
    pub fn can_recharge(&self) -> bool {
        self.is_connected() && self.receiving_address.is_some() && !self.recharging
    }

    pub fn is_connected(&self) -> bool {
        self.address.is_some()
    }

    /// Identity votes are tagged with.
    pub fn identity(&self) -> Option<String> {
        self.address.as_deref().map(normalize_identity)
    }

    /// Address shortened for the notch, `0x1234…abcd`.
    pub fn short_address(&self) -> Option<String> {
        let address = self.address.as_deref()?;
        if address.len() <= 12 {
            return Some(address.to_string());
        }
        Some(format!(
            "{}…{}",
            &address[..6],
            &address[address.len() - 4..]
        ))
    }

    pub fn apply_connect(&mut self, outcome: &ConnectOutcome) {
        self.connecting = false;
        match outcome {
            ConnectOutcome::Connected { address } => {
                self.address = Some(address.clone());
                self.last_error = None;
            }
            ConnectOutcome::Failed { error } => {
                self.last_error = Some(error.clone());
            }
        }
    }

    pub fn clear(&mut self) {
        self.address = None;
        self.balance = None;
        self.credited = Decimal::ZERO;
        self.rewards = Decimal::ZERO;
        self.connecting = false;
        self.loading_balance = false;
        self.pending_recharge = None;
        self.recharging = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_and_identity() {
        let mut wallet = WalletState::new("Polygon Amoy", "POL");
        wallet.connecting = true;
        wallet.apply_connect(&ConnectOutcome::Connected {
            address: "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf".to_string(),
        });
        assert!(!wallet.connecting);
        assert_eq!(
            wallet.identity().as_deref(),
            Some("0x7e5f4552091a69125d5dfcb7b8c2659029395bdf")
        );
        assert_eq!(wallet.short_address().as_deref(), Some("0x7E5F…5Bdf"));

        wallet.clear();
        assert!(!wallet.is_connected());
    }

    #[test]
    fn test_failed_connect_keeps_previous_address() {
        let mut wallet = WalletState::new("Polygon Amoy", "POL");
        wallet.apply_connect(&ConnectOutcome::Failed {
            error: "Network connection failed".to_string(),
        });
        assert!(wallet.address.is_none());
        assert_eq!(wallet.last_error.as_deref(), Some("Network connection failed"));
    }

    #[test]
    fn test_recharge_needs_receiving_address() {
        let mut wallet = WalletState::new("Polygon Amoy", "POL");
        wallet.address = Some("0xabc".to_string());
        assert!(!wallet.can_recharge());

        let mut wallet = wallet.with_receiving_address(Some("0xdef".to_string()));
        assert!(wallet.can_recharge());
        wallet.recharging = true;
        assert!(!wallet.can_recharge());
    }
}
