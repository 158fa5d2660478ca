//! Serialised reward postings.

use super::{MarketStore, RewardTransaction};
use crate::error::Result;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Credits rewards to running balances.
///
/// The balance update is read-modify-write against the store, so postings for
/// the same identity hold a per-identity lock for the whole sequence.
pub struct RewardLedger {
    store: Arc<dyn MarketStore>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RewardLedger {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn MarketStore> {
        &self.store
    }

    async fn lock_for(&self, identity: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(identity.to_string())
            .or_default()
            .clone()
    }

    /// Add `amount` to the identity's balance and log the transaction.
    /// Returns the new balance.
    pub async fn credit(&self, identity: &str, market_id: i64, amount: Decimal) -> Result<Decimal> {
        let lock = self.lock_for(identity).await;
        let _guard = lock.lock().await;

        let current = self.store.balance(identity).await?;
        let updated = current + amount;
        self.store.set_balance(identity, updated).await?;
        self.store
            .append_transaction(&RewardTransaction::reward(identity, market_id, amount))
            .await?;

        debug!(
            "Credited {} to {} for market {} (balance {})",
            amount, identity, market_id, updated
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use futures::future::join_all;
    use rust_decimal_macros::dec;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_credits_do_not_lose_updates() {
        let memory = Arc::new(MemoryStore::new());
        let ledger = Arc::new(RewardLedger::new(memory.clone()));

        let tasks = (0..50).map(|market_id| {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.credit("0xa", market_id, dec!(0.001)).await })
        });
        for joined in join_all(tasks).await {
            joined.unwrap().unwrap();
        }

        assert_eq!(memory.balance("0xa").await.unwrap(), dec!(0.050));
        assert_eq!(memory.transactions().await.len(), 50);
    }

    #[tokio::test]
    async fn test_credit_returns_new_balance() {
        let memory = Arc::new(MemoryStore::new());
        memory.set_balance("0xa", dec!(1)).await.unwrap();
        let ledger = RewardLedger::new(memory.clone());
        assert_eq!(ledger.credit("0xa", 1, dec!(0.0015)).await.unwrap(), dec!(1.0015));
    }
}
