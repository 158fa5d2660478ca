//! Voting sessions and the state machine that runs them.

use super::types::{Market, Side, Vote, normalize_identity};
use crate::error::{Error, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use tracing::{debug, info};

/// Lifecycle of the voting machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VotingState {
    /// No active market; the poller may open a session.
    #[default]
    Idle,
    /// Countdown running, votes accepted.
    Open,
    /// Tally frozen, settlement in progress.
    Closing,
}

impl std::fmt::Display for VotingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Open => write!(f, "Open"),
            Self::Closing => write!(f, "Closing"),
        }
    }
}

/// The bounded window during which votes for one market are accepted.
#[derive(Debug, Clone)]
pub struct VotingSession {
    pub market: Market,
    pub opens_at: DateTime<Utc>,
    pub duration_secs: u32,
    pub yes_count: u32,
    pub no_count: u32,
    /// Reward-eligible voters, keyed by normalised identity.
    voters: HashMap<String, Side>,
    /// Vote cast on this device without a connected wallet.
    local_only: Option<Side>,
}

impl VotingSession {
    fn new(market: Market, opens_at: DateTime<Utc>, duration_secs: u32) -> Self {
        Self {
            market,
            opens_at,
            duration_secs,
            yes_count: 0,
            no_count: 0,
            voters: HashMap::new(),
            local_only: None,
        }
    }

    pub fn closes_at(&self) -> DateTime<Utc> {
        self.opens_at + ChronoDuration::seconds(i64::from(self.duration_secs))
    }

    /// Whole seconds left at `now`, rounded up.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u32 {
        let left = self.closes_at().signed_duration_since(now).num_milliseconds();
        if left <= 0 {
            0
        } else {
            let secs = (left + 999) / 1000;
            secs.min(i64::from(self.duration_secs)) as u32
        }
    }

    pub fn has_voted(&self, identity: &str) -> bool {
        self.voters.contains_key(&normalize_identity(identity))
    }

    pub fn vote_of(&self, identity: &str) -> Option<Side> {
        self.voters.get(&normalize_identity(identity)).copied()
    }

    pub fn local_only(&self) -> Option<Side> {
        self.local_only
    }

    pub fn total_votes(&self) -> u32 {
        self.yes_count + self.no_count
    }

    fn freeze(&self) -> SessionResult {
        let mut votes: Vec<Vote> = self
            .voters
            .iter()
            .map(|(identity, side)| Vote {
                identity: identity.clone(),
                side: *side,
            })
            .collect();
        votes.sort_by(|a, b| a.identity.cmp(&b.identity));

        SessionResult {
            market: self.market.clone(),
            yes_count: self.yes_count,
            no_count: self.no_count,
            votes,
            local_only: self.local_only,
        }
    }
}

/// Frozen tally of a closed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResult {
    pub market: Market,
    pub yes_count: u32,
    pub no_count: u32,
    pub votes: Vec<Vote>,
    pub local_only: Option<Side>,
}

/// Outcome of [`VotingMachine::cast_vote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Counted, to be persisted and eligible for rewards.
    Accepted { identity: String, side: Side },
    /// Counted for display only; no wallet was connected.
    LocalOnly(Side),
    /// This identity already voted in the session; nothing changed.
    AlreadyVoted,
    /// No session is accepting votes.
    NotOpen,
}

/// Runs one voting session at a time: `Idle -> Open -> Closing -> Idle`.
#[derive(Debug)]
pub struct VotingMachine {
    state: VotingState,
    session: Option<VotingSession>,
    duration_secs: u32,
}

impl VotingMachine {
    pub fn new(duration_secs: u32) -> Self {
        Self {
            state: VotingState::Idle,
            session: None,
            duration_secs,
        }
    }

    pub fn state(&self) -> VotingState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == VotingState::Idle
    }

    pub fn session(&self) -> Option<&VotingSession> {
        self.session.as_ref()
    }

    /// Open a session for `market`. Fails unless the machine is idle.
    pub fn open(&mut self, market: Market, now: DateTime<Utc>) -> Result<&VotingSession> {
        if self.state != VotingState::Idle {
            return Err(Error::application(format!(
                "cannot open market {} while a session is {}",
                market.id, self.state
            )));
        }
        info!(
            "Opening {}s voting session for market {}: {}",
            self.duration_secs, market.id, market.question
        );
        self.state = VotingState::Open;
        Ok(self
            .session
            .insert(VotingSession::new(market, now, self.duration_secs)))
    }

    /// Record a vote.
    ///
    /// `identity` is the connected wallet address, if any. Without one the
    /// vote only feeds the local display counter.
    pub fn cast_vote(&mut self, identity: Option<&str>, side: Side) -> VoteOutcome {
        if self.state != VotingState::Open {
            return VoteOutcome::NotOpen;
        }
        let Some(session) = self.session.as_mut() else {
            return VoteOutcome::NotOpen;
        };

        match identity {
            Some(address) => {
                let identity = normalize_identity(address);
                if session.voters.contains_key(&identity) {
                    debug!("Duplicate vote from {} ignored", identity);
                    return VoteOutcome::AlreadyVoted;
                }
                match side {
                    Side::Yes => session.yes_count += 1,
                    Side::No => session.no_count += 1,
                }
                session.voters.insert(identity.clone(), side);
                info!(
                    "Vote {} from {} (yes={}, no={})",
                    side, identity, session.yes_count, session.no_count
                );
                VoteOutcome::Accepted { identity, side }
            }
            None => {
                if session.local_only.is_some() {
                    return VoteOutcome::AlreadyVoted;
                }
                session.local_only = Some(side);
                debug!("Local-only vote {} recorded", side);
                VoteOutcome::LocalOnly(side)
            }
        }
    }

    /// Advance the countdown. Returns the frozen tally exactly once, when the
    /// session moves to `Closing`.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<SessionResult> {
        if self.state != VotingState::Open {
            return None;
        }
        let session = self.session.as_ref()?;
        if session.remaining_secs(now) > 0 {
            return None;
        }
        self.close()
    }

    /// Close the open session immediately.
    pub fn close(&mut self) -> Option<SessionResult> {
        if self.state != VotingState::Open {
            return None;
        }
        let result = self.session.as_ref()?.freeze();
        info!(
            "Voting closed for market {} (yes={}, no={})",
            result.market.id, result.yes_count, result.no_count
        );
        self.state = VotingState::Closing;
        Some(result)
    }

    /// Settlement finished; discard the session.
    pub fn finish(&mut self) {
        if self.state == VotingState::Closing {
            self.session = None;
            self.state = VotingState::Idle;
            debug!("Voting machine idle");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn open_machine() -> VotingMachine {
        let mut machine = VotingMachine::new(30);
        machine.open(Market::new(6, "Will BTC close green?"), now()).unwrap();
        machine
    }

    #[test]
    fn test_open_only_from_idle() {
        let mut machine = open_machine();
        assert_eq!(machine.state(), VotingState::Open);
        assert!(machine.open(Market::new(7, "Another?"), now()).is_err());
        assert_eq!(machine.session().unwrap().market.id, 6);
    }

    #[test]
    fn test_duplicate_vote_is_ignored() {
        let mut machine = open_machine();
        assert_eq!(
            machine.cast_vote(Some("0xAAA"), Side::Yes),
            VoteOutcome::Accepted {
                identity: "0xaaa".to_string(),
                side: Side::Yes
            }
        );
        assert_eq!(
            machine.cast_vote(Some("0xaaa"), Side::No),
            VoteOutcome::AlreadyVoted
        );
        let session = machine.session().unwrap();
        assert_eq!((session.yes_count, session.no_count), (1, 0));
        assert_eq!(session.vote_of("0xAaA"), Some(Side::Yes));
    }

    #[test]
    fn test_unconnected_vote_is_local_only() {
        let mut machine = open_machine();
        assert_eq!(machine.cast_vote(None, Side::No), VoteOutcome::LocalOnly(Side::No));
        assert_eq!(machine.cast_vote(None, Side::Yes), VoteOutcome::AlreadyVoted);

        let session = machine.session().unwrap();
        assert_eq!(session.total_votes(), 0);
        assert_eq!(session.local_only(), Some(Side::No));
    }

    #[test]
    fn test_countdown_closes_once() {
        let mut machine = open_machine();
        machine.cast_vote(Some("0x1"), Side::Yes);

        assert!(machine.tick(now() + ChronoDuration::seconds(29)).is_none());
        assert_eq!(
            machine.session().unwrap().remaining_secs(now() + ChronoDuration::milliseconds(29_500)),
            1
        );

        let result = machine.tick(now() + ChronoDuration::seconds(30)).unwrap();
        assert_eq!(result.yes_count, 1);
        assert_eq!(machine.state(), VotingState::Closing);

        // A stale timer firing again cannot close twice.
        assert!(machine.tick(now() + ChronoDuration::seconds(31)).is_none());
        assert!(machine.close().is_none());

        // Votes after closing are rejected.
        assert_eq!(machine.cast_vote(Some("0x2"), Side::No), VoteOutcome::NotOpen);

        machine.finish();
        assert!(machine.is_idle());
        assert!(machine.session().is_none());
    }

    #[test]
    fn test_vote_before_expiry_is_in_tally() {
        let mut machine = open_machine();
        let expiry = now() + ChronoDuration::seconds(30);
        machine.cast_vote(Some("0x1"), Side::No);
        machine.cast_vote(Some("0x2"), Side::No);
        let result = machine.tick(expiry).unwrap();
        assert_eq!(result.no_count, 2);
        assert_eq!(
            result.votes,
            vec![
                Vote { identity: "0x1".into(), side: Side::No },
                Vote { identity: "0x2".into(), side: Side::No },
            ]
        );
    }
}
