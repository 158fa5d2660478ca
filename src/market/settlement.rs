//! Best-effort persistence of votes, results and rewards.
//!
//! The in-memory session is the source of truth while voting runs; every
//! write here is logged on failure and never retried or propagated.

use super::rewards::{RewardDistribution, winning_side};
use super::session::SessionResult;
use super::types::Side;
use crate::config::RewardsConfig;
use crate::store::{MarketResult, MarketStore, RewardLedger, UserPosition};
use futures::future::join_all;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Summary of a settled session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementReport {
    pub market_id: i64,
    pub winning_side: Option<Side>,
    pub distribution: Option<RewardDistribution>,
    pub result_persisted: bool,
    pub credited: usize,
    pub failed: usize,
}

impl SettlementReport {
    /// Amount credited to `identity`, if it was a paid winner.
    pub fn reward_for(&self, identity: &str) -> Option<Decimal> {
        self.distribution
            .as_ref()?
            .per_voter
            .iter()
            .find(|(id, _)| id == identity)
            .map(|(_, amount)| *amount)
    }
}

/// Writes session data to the store.
pub struct Settlement {
    store: Arc<dyn MarketStore>,
    ledger: Arc<RewardLedger>,
    rewards: RewardsConfig,
}

impl Settlement {
    pub fn new(store: Arc<dyn MarketStore>, rewards: RewardsConfig) -> Self {
        let ledger = Arc::new(RewardLedger::new(store.clone()));
        Self {
            store,
            ledger,
            rewards,
        }
    }

    /// Persist a single accepted vote. Returns whether the write succeeded.
    pub async fn record_vote(&self, market_id: i64, identity: &str, side: Side) -> bool {
        let position = UserPosition::from_vote(market_id, identity, side);
        match self.store.upsert_position(&position).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Failed to store {} vote of {} on market {}: {}",
                    side, identity, market_id, e
                );
                false
            }
        }
    }

    /// Persist final counts and pay out winners.
    pub async fn settle(&self, result: &SessionResult) -> SettlementReport {
        let market_id = result.market.id;
        let distribution = RewardDistribution::compute(result, &self.rewards);
        let total_votes = result.yes_count + result.no_count;
        let winner = (total_votes > 0).then(|| winning_side(result.yes_count, result.no_count));

        let result_persisted = match self
            .store
            .record_result(&MarketResult {
                market_id,
                yes_votes: result.yes_count,
                no_votes: result.no_count,
                winning_side: winner,
            })
            .await
        {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to store result for market {}: {}", market_id, e);
                false
            }
        };

        let (mut credited, mut failed) = (0, 0);
        if let Some(dist) = &distribution {
            let postings = dist.per_voter.iter().map(|(identity, amount)| {
                let ledger = self.ledger.clone();
                async move {
                    let outcome = ledger.credit(identity, market_id, *amount).await;
                    (identity, outcome)
                }
            });
            for (identity, outcome) in join_all(postings).await {
                match outcome {
                    Ok(_) => credited += 1,
                    Err(e) => {
                        failed += 1;
                        error!("Failed to credit reward to {}: {}", identity, e);
                    }
                }
            }
            info!(
                "Market {} settled: {} wins, {} paid {} each ({} failed)",
                market_id, dist.winning_side, credited, dist.reward_per_winner, failed
            );
        } else {
            info!("Market {} closed with no votes, nothing to distribute", market_id);
        }

        SettlementReport {
            market_id,
            winning_side: winner,
            distribution,
            result_persisted,
            credited,
            failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::market::{Market, Vote};
    use crate::store::{MemoryStore, MockMarketStore};

    fn three_to_one() -> SessionResult {
        let votes = [("0xa", Side::Yes), ("0xb", Side::Yes), ("0xc", Side::Yes), ("0xd", Side::No)];
        SessionResult {
            market: Market::new(6, "Q?"),
            yes_count: 3,
            no_count: 1,
            votes: votes
                .iter()
                .map(|(identity, side)| Vote {
                    identity: identity.to_string(),
                    side: *side,
                })
                .collect(),
            local_only: None,
        }
    }

    #[tokio::test]
    async fn test_settle_pays_winners_and_closes_market() {
        let memory = Arc::new(MemoryStore::new());
        memory.insert_market(Market::new(6, "Q?")).await;
        let settlement = Settlement::new(memory.clone(), RewardsConfig::default());

        let report = settlement.settle(&three_to_one()).await;
        assert!(report.result_persisted);
        assert_eq!(report.credited, 3);
        assert_eq!(report.winning_side, Some(Side::Yes));
        assert!(report.reward_for("0xd").is_none());

        let paid = memory.balance("0xa").await.unwrap();
        assert_eq!(Some(paid), report.reward_for("0xa"));
        assert_eq!(memory.balance("0xd").await.unwrap(), Decimal::ZERO);
        assert_eq!(memory.transactions().await.len(), 3);
        assert_eq!(memory.result(6).await.unwrap().winning_side, Some(Side::Yes));
    }

    #[tokio::test]
    async fn test_settle_without_votes() {
        let memory = Arc::new(MemoryStore::new());
        let settlement = Settlement::new(memory.clone(), RewardsConfig::default());
        let result = SessionResult {
            market: Market::new(7, "Q?"),
            yes_count: 0,
            no_count: 0,
            votes: Vec::new(),
            local_only: Some(Side::Yes),
        };
        let report = settlement.settle(&result).await;
        assert!(report.distribution.is_none());
        assert_eq!(report.winning_side, None);
        assert!(memory.transactions().await.is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failures_are_contained() {
        let mut store = MockMarketStore::new();
        store
            .expect_record_result()
            .returning(|_| Err(Error::database("503 Service Unavailable")));
        store
            .expect_balance()
            .returning(|_| Err(Error::network("timeout")));
        store
            .expect_upsert_position()
            .returning(|_| Err(Error::database("conflict")));

        let settlement = Settlement::new(Arc::new(store), RewardsConfig::default());
        let report = settlement.settle(&three_to_one()).await;
        assert!(!report.result_persisted);
        assert_eq!(report.credited, 0);
        assert_eq!(report.failed, 3);
        // The computed distribution survives the failed writes.
        assert_eq!(report.distribution.unwrap().per_voter.len(), 3);

        assert!(!settlement.record_vote(6, "0xa", Side::Yes).await);
    }

    #[tokio::test]
    async fn test_record_vote_writes_position() {
        let memory = Arc::new(MemoryStore::new());
        let settlement = Settlement::new(memory.clone(), RewardsConfig::default());
        assert!(settlement.record_vote(6, "0xa", Side::No).await);
        assert_eq!(memory.position(6, "0xa").await.unwrap().no_shares, 1);
    }
}
