//! Smart Money Module
//!
//! Wallet-cohort signals:
//! - Wallet tiers (S/A/B/C) as assigned by the wallet ranker upstream
//! - Convergence: several ranked wallets hitting the same token in a window
//! - Alpha Score: token-level score from the lead wallet tier and market data

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

pub mod alpha_score;
pub mod convergence;

pub use alpha_score::{alpha_reasons, alpha_score, AlphaInputs};
pub use convergence::{
    canonical_token_key, ConvergenceReading, ConvergenceState, ConvergenceStatus,
    ConvergenceTracker,
};

/// Wallet quality tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WalletTier {
    S,
    A,
    B,
    C,
}

impl WalletTier {
    /// Alpha score boost for a signal led by this tier
    pub fn alpha_boost(&self) -> i32 {
        match self {
            WalletTier::S => 50,
            WalletTier::A => 35,
            WalletTier::B => 20,
            WalletTier::C => 10,
        }
    }
}

impl std::fmt::Display for WalletTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletTier::S => write!(f, "S"),
            WalletTier::A => write!(f, "A"),
            WalletTier::B => write!(f, "B"),
            WalletTier::C => write!(f, "C"),
        }
    }
}

impl FromStr for WalletTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "S" => Ok(WalletTier::S),
            "A" => Ok(WalletTier::A),
            "B" => Ok(WalletTier::B),
            "C" => Ok(WalletTier::C),
            other => Err(Error::Config(format!("unknown wallet tier '{}'", other))),
        }
    }
}
