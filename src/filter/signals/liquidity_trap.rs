//! Liquidity trap detection
//!
//! Heavy volume on a thin pool is the classic pump-trap signature: price
//! can be pushed around cheaply and exits slip badly.

use serde::{Deserialize, Serialize};

use crate::overlay::NormalizedOverlay;

/// Ratio reported when the pool has no liquidity at all
pub const RATIO_SENTINEL: f64 = 9999.0;

/// Trap severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrapSeverity {
    #[default]
    Low,
    Med,
    High,
}

impl std::fmt::Display for TrapSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrapSeverity::Low => write!(f, "LOW"),
            TrapSeverity::Med => write!(f, "MED"),
            TrapSeverity::High => write!(f, "HIGH"),
        }
    }
}

/// Liquidity trap reading
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LiquidityTrap {
    pub trap: bool,
    pub severity: TrapSeverity,
    /// volume / liquidity, for diagnostics only
    pub ratio: Option<f64>,
    pub reason: String,
}

impl LiquidityTrap {
    /// Detect a trap from 24h volume and pool liquidity
    pub fn detect(liquidity_usd: f64, volume_24h_usd: f64) -> Self {
        let thin = volume_24h_usd >= 300_000.0 && liquidity_usd < 25_000.0;
        let very_thin = volume_24h_usd >= 600_000.0 && liquidity_usd < 50_000.0;
        let trap = thin || very_thin;

        let severity = if very_thin {
            TrapSeverity::High
        } else if thin {
            TrapSeverity::Med
        } else {
            TrapSeverity::Low
        };

        let ratio = if liquidity_usd > 0.0 {
            ((volume_24h_usd / liquidity_usd) * 100.0).round() / 100.0
        } else {
            RATIO_SENTINEL
        };

        Self {
            trap,
            severity,
            ratio: Some(ratio),
            reason: if trap {
                "High volume without liquidity support (possible trap)".to_string()
            } else {
                "No obvious trap".to_string()
            },
        }
    }

    pub fn from_overlay(overlay: &NormalizedOverlay) -> Self {
        Self::detect(overlay.liquidity_usd, overlay.volume_24h_usd)
    }
}
