//! Shared types for the decision engine

use serde::{Deserialize, Serialize};

use super::rug_risk::RugRiskResult;
use super::tiers::Tier;
use crate::filter::signals::{EntryZone, LeadingIndicators, LiquidityTrap};
use crate::filter::smart_money::ConvergenceReading;

/// Recommended action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Wait,
    Arm,
    Ready,
    Enter,
    /// Hard override, reachable from any state
    RugWarning,
}

impl Action {
    /// Highest confidence this action may report
    pub fn confidence_ceiling(&self) -> u8 {
        match self {
            Action::Enter => 85,
            Action::Ready => 75,
            Action::Arm => 65,
            Action::Wait => 50,
            Action::RugWarning => 99,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Wait => write!(f, "WAIT"),
            Action::Arm => write!(f, "ARM"),
            Action::Ready => write!(f, "READY"),
            Action::Enter => write!(f, "ENTER"),
            Action::RugWarning => write!(f, "RUG_WARNING"),
        }
    }
}

/// Readings the decision was derived from, kept for audit
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionSignals {
    /// Score the thresholds were compared against
    pub score: f64,
    /// Aggregator output before the action ceiling
    pub raw_confidence: u8,
    pub rug: RugRiskResult,
    pub liq_trap: LiquidityTrap,
    pub entry_zone: EntryZone,
    pub breakout: bool,
    pub rising: bool,
    pub convergence: ConvergenceReading,
    pub indicators: LeadingIndicators,
    pub early_entry: bool,
}

/// Output of one evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub action: Action,
    /// In [1, 99], never above the action's ceiling
    pub confidence: u8,
    /// At most seven, most important first
    pub reasons: Vec<String>,
    pub tags: Vec<String>,
    pub tier: Tier,
    pub signals: DecisionSignals,
}

impl Decision {
    /// Whether this decision recommends acting now
    pub fn is_actionable(&self) -> bool {
        self.action == Action::Enter
    }

    pub fn is_rug_warning(&self) -> bool {
        self.action == Action::RugWarning
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}%) [{}]", self.action, self.confidence, self.tier)?;
        if let Some(first) = self.reasons.first() {
            write!(f, " {}", first)?;
        }
        Ok(())
    }
}
