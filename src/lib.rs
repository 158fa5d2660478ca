//! # notchbet - a notch overlay for quick yes/no prediction questions
//!
//! A small panel hangs from the top edge of the screen, slides down on a
//! global shortcut and expands when a new question appears in the market
//! table. Votes are tagged with the connected wallet address and winners
//! are credited once the countdown ends.
//!
//! ## Architecture
//!
//! - **Animator**: Overlay geometry and stepped slide/resize animations
//! - **Market**: Polling, voting sessions and reward settlement
//! - **Store**: Remote market table access (PostgREST or in-memory)
//! - **Wallet**: Private key connection and JSON-RPC balance lookups
//! - **State**: Centralized state management
//! - **Events**: Input handling and event processing
//! - **UI**: Layout and rendering logic
//! - **Config**: Configuration management

pub mod animator;
pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod market;
pub mod state;
pub mod store;
pub mod ui;
pub mod wallet;

pub use app::App;
pub use config::Config;
pub use error::{Error, Result};
