//! In-memory store.

use super::{MarketResult, MarketStore, RechargeRecord, RewardTransaction, UserPosition};
use crate::error::Result;
use crate::market::{Market, MarketStatus, Side};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    markets: Vec<Market>,
    results: HashMap<i64, MarketResult>,
    positions: HashMap<(i64, String), UserPosition>,
    balances: HashMap<String, Decimal>,
    transactions: Vec<RewardTransaction>,
    recharges: Vec<RechargeRecord>,
}

/// Tables held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a market with the next id and return it.
    pub async fn publish_market(&self, question: impl Into<String>) -> Market {
        let mut tables = self.tables.write().await;
        let id = tables.markets.iter().map(|m| m.id).max().unwrap_or(0) + 1;
        let market = Market::new(id, question);
        tables.markets.push(market.clone());
        market
    }

    /// Insert a market row as-is.
    pub async fn insert_market(&self, market: Market) {
        self.tables.write().await.markets.push(market);
    }

    pub async fn market(&self, id: i64) -> Option<Market> {
        self.tables
            .read()
            .await
            .markets
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    pub async fn result(&self, market_id: i64) -> Option<MarketResult> {
        self.tables.read().await.results.get(&market_id).cloned()
    }

    pub async fn position(&self, market_id: i64, identity: &str) -> Option<UserPosition> {
        self.tables
            .read()
            .await
            .positions
            .get(&(market_id, identity.to_string()))
            .cloned()
    }

    pub async fn transactions(&self) -> Vec<RewardTransaction> {
        self.tables.read().await.transactions.clone()
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn latest_market(&self) -> Result<Option<Market>> {
        Ok(self
            .tables
            .read()
            .await
            .markets
            .iter()
            .max_by_key(|m| m.id)
            .cloned())
    }

    async fn upsert_position(&self, position: &UserPosition) -> Result<()> {
        let key = (position.market_id, position.user_address.clone());
        self.tables
            .write()
            .await
            .positions
            .insert(key, position.clone());
        Ok(())
    }

    async fn record_result(&self, result: &MarketResult) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(market) = tables.markets.iter_mut().find(|m| m.id == result.market_id) {
            market.status = MarketStatus::Closed;
        }
        tables.results.insert(result.market_id, result.clone());
        Ok(())
    }

    async fn balance(&self, identity: &str) -> Result<Decimal> {
        Ok(self
            .tables
            .read()
            .await
            .balances
            .get(identity)
            .copied()
            .unwrap_or_default())
    }

    async fn set_balance(&self, identity: &str, balance: Decimal) -> Result<()> {
        self.tables
            .write()
            .await
            .balances
            .insert(identity.to_string(), balance);
        Ok(())
    }

    async fn append_transaction(&self, transaction: &RewardTransaction) -> Result<()> {
        self.tables
            .write()
            .await
            .transactions
            .push(transaction.clone());
        Ok(())
    }

    async fn credited_recharges(&self, identity: &str) -> Result<Decimal> {
        Ok(self
            .tables
            .read()
            .await
            .recharges
            .iter()
            .filter(|r| r.user_address == identity)
            .map(|r| r.credited_amount)
            .sum())
    }

    async fn insert_recharge(&self, record: &RechargeRecord) -> Result<()> {
        self.tables.write().await.recharges.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_latest_market_by_id() {
        let store = MemoryStore::new();
        assert!(store.latest_market().await.unwrap().is_none());

        store.insert_market(Market::new(9, "nine")).await;
        store.insert_market(Market::new(4, "four")).await;
        assert_eq!(store.latest_market().await.unwrap().unwrap().id, 9);

        let next = store.publish_market("ten").await;
        assert_eq!(next.id, 10);
    }

    #[tokio::test]
    async fn test_position_upsert_replaces() {
        let store = MemoryStore::new();
        store
            .upsert_position(&UserPosition::from_vote(1, "0xa", Side::Yes))
            .await
            .unwrap();
        store
            .upsert_position(&UserPosition::from_vote(1, "0xa", Side::No))
            .await
            .unwrap();
        let position = store.position(1, "0xa").await.unwrap();
        assert_eq!(position.no_shares, 1);
        assert_eq!(position.yes_shares, 0);
    }

    #[tokio::test]
    async fn test_record_result_closes_market() {
        let store = MemoryStore::new();
        let market = store.publish_market("q").await;
        store
            .record_result(&MarketResult {
                market_id: market.id,
                yes_votes: 2,
                no_votes: 1,
                winning_side: Some(Side::Yes),
            })
            .await
            .unwrap();
        assert_eq!(store.market(market.id).await.unwrap().status, MarketStatus::Closed);
        assert_eq!(store.result(market.id).await.unwrap().yes_votes, 2);
    }

    #[tokio::test]
    async fn test_credited_recharges_sum() {
        let store = MemoryStore::new();
        for amount in [dec!(0.5), dec!(1.25)] {
            store
                .insert_recharge(&RechargeRecord {
                    user_address: "0xa".to_string(),
                    credited_amount: amount,
                    tx_hash: "0xhash".to_string(),
                    network: "polygon-amoy".to_string(),
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }
        assert_eq!(store.credited_recharges("0xa").await.unwrap(), dec!(1.75));
        assert_eq!(store.credited_recharges("0xb").await.unwrap(), Decimal::ZERO);
    }
}
