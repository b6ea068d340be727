//! Subscription tiers and their decision thresholds
//!
//! The state machine is tier-agnostic: only the threshold record varies.
//! Higher tiers get lower score bars, more rug tolerance and more
//! sensitive leading indicators.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    #[default]
    Basic,
    Pro,
    #[serde(alias = "PRO+")]
    ProPlus,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Basic, Tier::Pro, Tier::ProPlus];

    /// Resolve a tier name, falling back to BASIC for anything unknown
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to BASIC tier");
            Tier::Basic
        })
    }

    /// Config section name
    pub fn key(&self) -> &'static str {
        match self {
            Tier::Basic => "basic",
            Tier::Pro => "pro",
            Tier::ProPlus => "proplus",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Basic => write!(f, "BASIC"),
            Tier::Pro => write!(f, "PRO"),
            Tier::ProPlus => write!(f, "PROPLUS"),
        }
    }
}

impl FromStr for Tier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BASIC" => Ok(Tier::Basic),
            "PRO" => Ok(Tier::Pro),
            "PROPLUS" | "PRO+" | "PRO_PLUS" => Ok(Tier::ProPlus),
            _ => Err(Error::UnknownTier(s.to_string())),
        }
    }
}

/// Threshold record for one tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub score_enter: f64,
    pub score_ready: f64,
    pub score_arm: f64,
    pub rug_max_enter: f64,
    pub rug_max_ready: f64,
    pub rug_max_arm: f64,
    /// Risk at or above this forces RUG_WARNING
    pub rug_hard_threshold: f64,
    /// Leading indicators required for the early paths
    pub min_confirmations: u32,
    pub volume_surge_multiplier: f64,
    pub tx_accel_threshold: f64,
    pub buy_ratio_accel_min: f64,
    pub sell_streak_max: u32,
}

impl TierThresholds {
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Basic => Self {
                score_enter: 78.0,
                score_ready: 70.0,
                score_arm: 62.0,
                rug_max_enter: 60.0,
                rug_max_ready: 65.0,
                rug_max_arm: 70.0,
                rug_hard_threshold: 82.0,
                min_confirmations: 3,
                volume_surge_multiplier: 3.0,
                tx_accel_threshold: 1.8,
                buy_ratio_accel_min: 0.15,
                sell_streak_max: 4,
            },
            Tier::Pro => Self {
                score_enter: 72.0,
                score_ready: 65.0,
                score_arm: 58.0,
                rug_max_enter: 65.0,
                rug_max_ready: 70.0,
                rug_max_arm: 75.0,
                rug_hard_threshold: 85.0,
                min_confirmations: 2,
                volume_surge_multiplier: 2.5,
                tx_accel_threshold: 1.5,
                buy_ratio_accel_min: 0.12,
                sell_streak_max: 5,
            },
            Tier::ProPlus => Self {
                score_enter: 68.0,
                score_ready: 62.0,
                score_arm: 55.0,
                rug_max_enter: 68.0,
                rug_max_ready: 72.0,
                rug_max_arm: 78.0,
                rug_hard_threshold: 88.0,
                min_confirmations: 2,
                volume_surge_multiplier: 2.0,
                tx_accel_threshold: 1.4,
                buy_ratio_accel_min: 0.10,
                sell_streak_max: 6,
            },
        }
    }

    /// Consistency checks used by config validation
    pub fn validate(&self, tier: Tier) -> anyhow::Result<()> {
        if !(self.score_arm <= self.score_ready && self.score_ready <= self.score_enter) {
            anyhow::bail!(
                "{}: score bars must satisfy arm <= ready <= enter ({} / {} / {})",
                tier,
                self.score_arm,
                self.score_ready,
                self.score_enter
            );
        }
        if !(self.rug_max_enter <= self.rug_max_ready && self.rug_max_ready <= self.rug_max_arm) {
            anyhow::bail!(
                "{}: rug maxima must satisfy enter <= ready <= arm ({} / {} / {})",
                tier,
                self.rug_max_enter,
                self.rug_max_ready,
                self.rug_max_arm
            );
        }
        if !(self.rug_hard_threshold > 0.0 && self.rug_hard_threshold <= 100.0) {
            anyhow::bail!(
                "{}: rug_hard_threshold must be in (0, 100], got {}",
                tier,
                self.rug_hard_threshold
            );
        }
        if self.min_confirmations == 0 {
            anyhow::bail!("{}: min_confirmations must be at least 1", tier);
        }
        if self.tx_accel_threshold <= 1.0 || self.volume_surge_multiplier <= 1.0 {
            anyhow::bail!(
                "{}: tx_accel_threshold and volume_surge_multiplier must exceed 1.0",
                tier
            );
        }
        if !(0.0..1.0).contains(&self.buy_ratio_accel_min) {
            anyhow::bail!("{}: buy_ratio_accel_min must be in [0, 1)", tier);
        }
        Ok(())
    }
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self::for_tier(Tier::Basic)
    }
}

fn default_basic() -> TierThresholds {
    TierThresholds::for_tier(Tier::Basic)
}

fn default_pro() -> TierThresholds {
    TierThresholds::for_tier(Tier::Pro)
}

fn default_proplus() -> TierThresholds {
    TierThresholds::for_tier(Tier::ProPlus)
}

/// One threshold record per tier, loaded once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierTable {
    #[serde(default = "default_basic")]
    pub basic: TierThresholds,
    #[serde(default = "default_pro")]
    pub pro: TierThresholds,
    #[serde(default = "default_proplus")]
    pub proplus: TierThresholds,
}

impl TierTable {
    pub fn get(&self, tier: Tier) -> &TierThresholds {
        match tier {
            Tier::Basic => &self.basic,
            Tier::Pro => &self.pro,
            Tier::ProPlus => &self.proplus,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for tier in Tier::ALL {
            self.get(tier).validate(tier)?;
        }
        Ok(())
    }
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            basic: default_basic(),
            pro: default_pro(),
            proplus: default_proplus(),
        }
    }
}
