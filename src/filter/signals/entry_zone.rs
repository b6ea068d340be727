//! Entry zone classification
//!
//! Separates tokens that have not moved yet from ones that are already
//! overextended. The entry score is a ranking hint only, never a gate.

use serde::{Deserialize, Serialize};

use crate::overlay::NormalizedOverlay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Zone {
    /// Move already happened, chase risk
    Chase,
    /// Nothing has happened yet, better risk/reward
    Early,
    #[default]
    Neutral,
}

impl Zone {
    pub fn entry_score(&self) -> u8 {
        match self {
            Zone::Early => 82,
            Zone::Neutral => 62,
            Zone::Chase => 30,
        }
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Zone::Chase => write!(f, "CHASE"),
            Zone::Early => write!(f, "EARLY"),
            Zone::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Entry zone reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EntryZone {
    pub zone: Zone,
    pub entry_score: u8,
    pub reason: String,
}

impl Default for EntryZone {
    fn default() -> Self {
        Self {
            zone: Zone::Neutral,
            entry_score: 60,
            reason: "Mixed conditions".to_string(),
        }
    }
}

impl EntryZone {
    /// Classify from 1h and 24h price change (percent)
    pub fn classify(price_change_1h: f64, price_change_24h: f64) -> Self {
        // Sustained overextension counts as chase even below the 1h bar
        let chase = price_change_1h >= 25.0 || (price_change_1h >= 18.0 && price_change_24h >= 80.0);
        let early = price_change_1h <= 8.0 && price_change_24h <= 45.0;

        let zone = if chase {
            Zone::Chase
        } else if early {
            Zone::Early
        } else {
            Zone::Neutral
        };

        let reason = match zone {
            Zone::Chase => "Overextended, chase risk",
            Zone::Early => "Early move, better RR",
            Zone::Neutral => "Mixed conditions",
        };

        Self {
            zone,
            entry_score: zone.entry_score(),
            reason: reason.to_string(),
        }
    }

    pub fn from_overlay(overlay: &NormalizedOverlay) -> Self {
        Self::classify(overlay.price_change_1h, overlay.price_change_24h)
    }
}
