//! Remote data collaborator.
//!
//! The app reads markets and writes votes, results, balances and reward
//! transactions through [`MarketStore`]. [`RestStore`] talks to a
//! PostgREST (Supabase) endpoint; [`MemoryStore`] backs offline mode and tests.

mod ledger;
mod memory;
mod rest;

pub use ledger::RewardLedger;
pub use memory::MemoryStore;
pub use rest::RestStore;

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::market::{Market, Side};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// A voter's position on a market, keyed by `(market_id, user_address)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPosition {
    pub market_id: i64,
    pub user_address: String,
    pub yes_shares: u32,
    pub no_shares: u32,
}

impl UserPosition {
    /// Position for a single vote.
    pub fn from_vote(market_id: i64, identity: &str, side: Side) -> Self {
        let (yes_shares, no_shares) = match side {
            Side::Yes => (1, 0),
            Side::No => (0, 1),
        };
        Self {
            market_id,
            user_address: identity.to_string(),
            yes_shares,
            no_shares,
        }
    }
}

/// Final counts written back to a market row once voting closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketResult {
    pub market_id: i64,
    pub yes_votes: u32,
    pub no_votes: u32,
    pub winning_side: Option<Side>,
}

/// Kind of an entry in the transaction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Reward,
}

/// Immutable transaction log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardTransaction {
    pub id: Uuid,
    pub user_address: String,
    pub market_id: i64,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub created_at: DateTime<Utc>,
}

impl RewardTransaction {
    pub fn reward(identity: &str, market_id: i64, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_address: identity.to_string(),
            market_id,
            amount,
            kind: TransactionType::Reward,
            created_at: Utc::now(),
        }
    }
}

/// A confirmed wallet recharge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RechargeRecord {
    pub user_address: String,
    pub credited_amount: Decimal,
    pub tx_hash: String,
    pub network: String,
    pub created_at: DateTime<Utc>,
}

/// Persistence operations the core depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketStore: Send + Sync {
    /// Most recent market by id, if any.
    async fn latest_market(&self) -> Result<Option<Market>>;

    /// Insert or replace a voter's position.
    async fn upsert_position(&self, position: &UserPosition) -> Result<()>;

    /// Write final counts and close the market.
    async fn record_result(&self, result: &MarketResult) -> Result<()>;

    /// Running reward balance for an identity (zero when unknown).
    async fn balance(&self, identity: &str) -> Result<Decimal>;

    /// Insert or replace the running reward balance.
    async fn set_balance(&self, identity: &str, balance: Decimal) -> Result<()>;

    /// Append to the transaction log.
    async fn append_transaction(&self, transaction: &RewardTransaction) -> Result<()>;

    /// Sum of credited recharges for an identity.
    async fn credited_recharges(&self, identity: &str) -> Result<Decimal>;

    /// Store a confirmed recharge.
    async fn insert_recharge(&self, record: &RechargeRecord) -> Result<()>;
}

/// Build the store described by the configuration.
pub fn from_config(config: &DatabaseConfig) -> Result<Arc<dyn MarketStore>> {
    match (&config.url, &config.anon_key) {
        (Some(url), Some(key)) => Ok(Arc::new(RestStore::new(url, key, config.timeout_secs)?)),
        (Some(_), None) => Err(crate::Error::config(
            "database.url is set but database.anon_key is missing",
        )),
        _ => {
            tracing::warn!("No database configured, using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_from_vote() {
        let position = UserPosition::from_vote(6, "0xabc", Side::No);
        assert_eq!((position.yes_shares, position.no_shares), (0, 1));
    }

    #[test]
    fn test_transaction_serializes_type_field() {
        let tx = RewardTransaction::reward("0xabc", 6, Decimal::new(15, 4));
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "reward");
        assert_eq!(json["market_id"], 6);
    }

    #[test]
    fn test_from_config_requires_key_with_url() {
        let config = DatabaseConfig {
            url: Some("https://example.supabase.co".to_string()),
            anon_key: None,
            timeout_secs: 5,
        };
        assert!(from_config(&config).is_err());
        assert!(from_config(&DatabaseConfig::default()).is_ok());
    }
}
