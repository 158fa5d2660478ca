//! Private-key wallet connector.

use super::key_store::KeyStore;
use super::rpc::{RpcClient, wei_to_decimal};
use super::{
    ConnectOutcome, ConnectionStatus, WalletIdentity, check_recharge_amount, failure_reason,
    validate_private_key, validate_tx_hash,
};
use crate::config::WalletConfig;
use crate::error::{Error, Result};
use crate::market::normalize_identity;
use crate::store::{MarketStore, RechargeRecord};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Derive the checksummed address for a validated key.
pub fn derive_address(clean_key: &str) -> Result<String> {
    let signer: PrivateKeySigner = clean_key
        .parse()
        .map_err(|e| Error::wallet(format!("Invalid private key: {}", e)))?;
    Ok(Signer::address(&signer).to_string())
}

/// Connects a wallet from a private key and answers balance queries.
///
/// Only the connector writes the connected address; everything else reads
/// it through [`WalletConnector::identity`].
pub struct WalletConnector {
    config: WalletConfig,
    rpc: RpcClient,
    store: Arc<dyn MarketStore>,
    key_store: Option<KeyStore>,
    address: RwLock<Option<String>>,
}

impl WalletConnector {
    pub fn new(
        config: WalletConfig,
        store: Arc<dyn MarketStore>,
        key_store: Option<KeyStore>,
    ) -> Result<Self> {
        let rpc = RpcClient::new(&config.rpc_url, config.timeout_secs)?;
        Ok(Self {
            config,
            rpc,
            store,
            key_store,
            address: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    /// Ask the node for its chain id. Any failure is reported as a connectivity error.
    async fn check_node(&self) -> Result<()> {
        match self.rpc.chain_id().await {
            Ok(chain_id) => {
                if chain_id != self.config.chain_id {
                    warn!(
                        "Node at {} reports chain id {}, expected {}",
                        self.rpc.url(),
                        chain_id,
                        self.config.chain_id
                    );
                }
                info!(
                    "Connected to {} (chain id {})",
                    self.config.network_name, chain_id
                );
                Ok(())
            }
            Err(e) => {
                error!("Failed to reach {}: {}", self.rpc.url(), e);
                Err(Error::network("Network connection failed"))
            }
        }
    }

    async fn try_connect(&self, private_key: &str) -> Result<String> {
        let clean = validate_private_key(private_key)?;
        let address = derive_address(clean)?;
        self.check_node().await?;

        *self.address.write().await = Some(address.clone());
        info!("Wallet connected: {}", address);

        if let Some(key_store) = &self.key_store
            && let Err(e) = key_store.save(clean).await
        {
            warn!("Failed to store wallet credential: {}", e);
        }
        Ok(address)
    }

    /// Validate the key, check the node and mark the wallet connected.
    pub async fn connect_with_private_key(&self, private_key: &str) -> ConnectOutcome {
        match self.try_connect(private_key).await {
            Ok(address) => {
                match self.balance().await {
                    Ok(balance) => info!("Balance: {} {}", balance, self.config.symbol),
                    Err(e) => warn!("Balance fetch after connect failed: {}", e),
                }
                ConnectOutcome::Connected { address }
            }
            Err(e) => {
                warn!("Wallet connection failed: {}", e);
                ConnectOutcome::Failed {
                    error: failure_reason(&e),
                }
            }
        }
    }

    /// Connect with the stored credential, if one exists.
    pub async fn reconnect(&self) -> Option<ConnectOutcome> {
        let key_store = self.key_store.as_ref()?;
        let key = match key_store.load().await {
            Ok(key) => key?,
            Err(e) => {
                warn!("Could not read stored wallet credential: {}", e);
                return None;
            }
        };
        info!("Reconnecting wallet from stored credential");
        Some(self.connect_with_private_key(&key).await)
    }

    /// Forget the connection and the stored credential.
    pub async fn disconnect(&self) {
        self.address.write().await.take();
        if let Some(key_store) = &self.key_store
            && let Err(e) = key_store.remove().await
        {
            warn!("Failed to remove stored wallet credential: {}", e);
        }
        info!("Wallet disconnected");
    }

    pub async fn address(&self) -> Option<String> {
        self.address.read().await.clone()
    }

    pub async fn identity(&self) -> Option<WalletIdentity> {
        self.address().await.map(|address| WalletIdentity {
            address,
            connected: true,
        })
    }

    pub async fn connection_status(&self) -> ConnectionStatus {
        let address = self.address().await;
        ConnectionStatus {
            connected: address.is_some(),
            address,
            network: self.config.network_name.clone(),
        }
    }

    /// On-chain balance of the connected wallet.
    pub async fn balance(&self) -> Result<Decimal> {
        let address = self
            .address()
            .await
            .ok_or_else(|| Error::wallet("Wallet not connected"))?;
        self.rpc
            .balance(&address)
            .await
            .map_err(|e| Error::network(format!("Failed to fetch balance: {}", e)))
    }

    /// Sum of recharges credited to the connected wallet. Zero on failure.
    pub async fn credited_balance(&self) -> Decimal {
        let Some(address) = self.address().await else {
            return Decimal::ZERO;
        };
        match self
            .store
            .credited_recharges(&normalize_identity(&address))
            .await
        {
            Ok(total) => total,
            Err(e) => {
                error!("Failed to get credited balance: {}", e);
                Decimal::ZERO
            }
        }
    }

    /// Check a recharge before it is handed to the wallet library.
    pub async fn validate_recharge(&self, amount: Decimal) -> Result<()> {
        if self.address().await.is_none() || self.config.receiving_address.is_none() {
            return Err(Error::wallet(
                "Wallet not connected or receiving address not configured",
            ));
        }
        check_recharge_amount(amount, &self.config)?;
        let balance = self.balance().await?;
        if amount > balance {
            return Err(Error::invalid_input("Insufficient balance"));
        }
        Ok(())
    }

    /// Look a sent recharge up on chain and credit it.
    ///
    /// The transaction must be mined successfully, come from the connected
    /// wallet and pay the receiving address. The on-chain value is what gets
    /// credited, whatever amount was typed before sending.
    pub async fn confirm_recharge(&self, tx_hash: &str) -> Result<Decimal> {
        let hash = validate_tx_hash(tx_hash)?;
        let address = self
            .address()
            .await
            .ok_or_else(|| Error::wallet("Wallet not connected"))?;
        let receiving = self
            .config
            .receiving_address
            .as_deref()
            .ok_or_else(|| Error::wallet("Receiving address not configured"))?;

        let receipt = self.rpc.receipt(&hash).await.map_err(|e| {
            error!("Receipt lookup for {} failed: {}", hash, e);
            Error::network("Transaction confirmation failed")
        })?;
        match receipt {
            Some(receipt) if receipt.succeeded() => {}
            Some(_) => return Err(Error::wallet("Transaction failed on chain")),
            None => return Err(Error::wallet("Transaction not confirmed yet")),
        }

        let tx = self
            .rpc
            .transaction(&hash)
            .await
            .map_err(|e| {
                error!("Transaction lookup for {} failed: {}", hash, e);
                Error::network("Transaction confirmation failed")
            })?
            .ok_or_else(|| Error::wallet("Transaction not found"))?;
        if normalize_identity(&tx.from) != normalize_identity(&address) {
            return Err(Error::invalid_input(
                "Transaction was not sent from the connected wallet",
            ));
        }
        if tx.to.as_deref().map(normalize_identity) != Some(normalize_identity(receiving)) {
            return Err(Error::invalid_input(
                "Transaction does not pay the receiving address",
            ));
        }

        let amount = wei_to_decimal(&tx.value)?;
        if amount <= Decimal::ZERO {
            return Err(Error::invalid_input("Transaction carries no value"));
        }
        self.record_recharge(&hash, amount).await?;
        Ok(amount)
    }

    /// Record a confirmed recharge against the connected wallet.
    pub async fn record_recharge(&self, tx_hash: &str, amount: Decimal) -> Result<()> {
        let address = self
            .address()
            .await
            .ok_or_else(|| Error::wallet("Wallet not connected"))?;
        let record = RechargeRecord {
            user_address: normalize_identity(&address),
            credited_amount: amount,
            tx_hash: tx_hash.to_string(),
            network: self.config.network_name.to_lowercase().replace(' ', "-"),
            created_at: Utc::now(),
        };
        self.store.insert_recharge(&record).await?;
        info!("Recorded recharge {} of {} {}", tx_hash, amount, self.config.symbol);
        Ok(())
    }
}
