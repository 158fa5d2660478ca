//! Market domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status stored on a market row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    #[default]
    Open,
    Closed,
}

impl std::fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// A single yes/no betting question.
///
/// Identity is the monotonically increasing `id`; nothing else about the row
/// is used to decide whether it is new.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub id: i64,
    pub question: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: MarketStatus,
}

impl Market {
    pub fn new(id: i64, question: impl Into<String>) -> Self {
        Self {
            id,
            question: question.into(),
            created_at: Utc::now(),
            status: MarketStatus::Open,
        }
    }
}

/// Which answer a vote backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Yes,
    No,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Self::Yes => Self::No,
            Self::No => Self::Yes,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yes => write!(f, "yes"),
            Self::No => write!(f, "no"),
        }
    }
}

/// An accepted, reward-eligible vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    pub identity: String,
    pub side: Side,
}

/// Normalised form of a wallet address used for deduplication and storage.
pub fn normalize_identity(address: &str) -> String {
    address.trim().to_lowercase()
}
