//! Detects newly created markets.

use super::types::Market;
use crate::error::Error;
use crate::store::MarketStore;
use tracing::{debug, info, warn};

/// What a poll concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollDecision {
    /// First successful poll; records the newest id without opening anything.
    Baseline(Option<i64>),
    /// Nothing newer than the last seen id.
    NoChange,
    /// A session is active, the tick body was skipped.
    Skipped,
    /// The fetch failed; try again next tick.
    FetchFailed,
    /// A market newer than anything seen so far.
    NewMarket(Market),
}

/// Tracks the newest market id seen.
///
/// The first successful fetch only establishes a baseline so markets that
/// already existed at startup are never replayed. Ids that are not strictly
/// greater than the last seen one are ignored even if the row changed.
#[derive(Debug, Default)]
pub struct MarketPoller {
    baseline_established: bool,
    last_seen_id: Option<i64>,
    fetch_in_flight: bool,
}

impl MarketPoller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_seen_id(&self) -> Option<i64> {
        self.last_seen_id
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline_established
    }

    /// Whether a fetch should start now. Marks the fetch as in flight.
    ///
    /// Before the baseline exists a fetch always runs; afterwards only while
    /// no session is active. Overlapping fetches are never started.
    pub fn begin_fetch(&mut self, session_idle: bool) -> bool {
        if self.fetch_in_flight {
            debug!("Market fetch still in flight, skipping tick");
            return false;
        }
        if self.baseline_established && !session_idle {
            return false;
        }
        self.fetch_in_flight = true;
        true
    }

    /// Consume a fetch result.
    pub fn observe(&mut self, latest: Option<Market>, session_idle: bool) -> PollDecision {
        self.fetch_in_flight = false;

        if !self.baseline_established {
            self.baseline_established = true;
            self.last_seen_id = latest.as_ref().map(|m| m.id);
            info!("Market baseline established at {:?}", self.last_seen_id);
            return PollDecision::Baseline(self.last_seen_id);
        }

        if !session_idle {
            return PollDecision::Skipped;
        }

        match latest {
            Some(market) if self.last_seen_id.is_none_or(|seen| market.id > seen) => {
                info!("New market {}: {}", market.id, market.question);
                self.last_seen_id = Some(market.id);
                PollDecision::NewMarket(market)
            }
            _ => PollDecision::NoChange,
        }
    }

    /// Record a failed fetch.
    pub fn fetch_failed(&mut self, error: &Error) -> PollDecision {
        self.fetch_in_flight = false;
        warn!("Market fetch failed, retrying next tick: {}", error);
        PollDecision::FetchFailed
    }

    /// Run one complete poll against the store.
    pub async fn poll(&mut self, store: &dyn MarketStore, session_idle: bool) -> PollDecision {
        if !self.begin_fetch(session_idle) {
            return PollDecision::Skipped;
        }
        match store.latest_market().await {
            Ok(latest) => self.observe(latest, session_idle),
            Err(e) => self.fetch_failed(&e),
        }
    }
}
