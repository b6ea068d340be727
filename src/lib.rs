//! Alpha Signal Engine Library
//!
//! Turns a market overlay for one trading pair into a tier-aware trading
//! recommendation (WAIT / ARM / READY / ENTER / RUG_WARNING) with a bounded
//! confidence and human-readable reasons.

pub mod cli;
pub mod clock;
pub mod config;
pub mod dexscreener;
pub mod error;
pub mod filter;
pub mod overlay;
pub mod strategy;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use overlay::{MarketOverlay, NormalizedOverlay};
pub use strategy::{evaluate, Action, Decision, DecisionEngine, Evaluator, Tier};
