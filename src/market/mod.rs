//! Market polling and the voting lifecycle.

mod poller;
mod rewards;
mod session;
mod settlement;
mod types;

pub use poller::{MarketPoller, PollDecision};
pub use rewards::{RewardDistribution, winning_side};
pub use session::{SessionResult, VoteOutcome, VotingMachine, VotingSession, VotingState};
pub use settlement::{Settlement, SettlementReport};
pub use types::{Market, MarketStatus, Side, Vote, normalize_identity};
