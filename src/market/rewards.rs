//! Reward computation for closed sessions.

use super::session::SessionResult;
use super::types::Side;
use crate::config::RewardsConfig;
use rust_decimal::Decimal;

/// Side that wins a closed session.
///
/// Strictly more yes votes wins for yes; every other case, ties included,
/// resolves to no.
pub fn winning_side(yes_count: u32, no_count: u32) -> Side {
    if yes_count > no_count {
        Side::Yes
    } else {
        Side::No
    }
}

/// Payout for one closed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardDistribution {
    pub market_id: i64,
    pub winning_side: Side,
    pub winning_votes: u32,
    pub losing_votes: u32,
    pub reward_per_winner: Decimal,
    /// `(identity, amount)` for every reward-eligible winner.
    pub per_voter: Vec<(String, Decimal)>,
}

impl RewardDistribution {
    /// Compute the payout, or `None` when no votes were cast.
    ///
    /// `reward_per_winner = base + losing_votes * bonus / winning_votes`.
    pub fn compute(result: &SessionResult, config: &RewardsConfig) -> Option<Self> {
        if result.yes_count + result.no_count == 0 {
            return None;
        }

        let winning_side = winning_side(result.yes_count, result.no_count);
        let (winning_votes, losing_votes) = match winning_side {
            Side::Yes => (result.yes_count, result.no_count),
            Side::No => (result.no_count, result.yes_count),
        };

        let bonus_pool = Decimal::from(losing_votes) * config.bonus_per_losing_vote;
        let reward_per_winner = if winning_votes > 0 {
            config.base_reward + bonus_pool / Decimal::from(winning_votes)
        } else {
            config.base_reward
        };

        let per_voter = result
            .votes
            .iter()
            .filter(|vote| vote.side == winning_side)
            .map(|vote| (vote.identity.clone(), reward_per_winner))
            .collect();

        Some(Self {
            market_id: result.market.id,
            winning_side,
            winning_votes,
            losing_votes,
            reward_per_winner,
            per_voter,
        })
    }

    /// Sum paid out across all winners.
    pub fn total(&self) -> Decimal {
        self.per_voter.iter().map(|(_, amount)| *amount).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.per_voter.is_empty()
    }
}
