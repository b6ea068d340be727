//! Confidence aggregation
//!
//! Explainable linear scorer: starts from a neutral baseline and applies
//! ordered additive adjustments. Every adjustment that fires leaves a reason
//! string, so any confidence value can be traced back term by term.

use serde::Serialize;

use crate::filter::signals::{EntryZone, LiquidityTrap, TrapSeverity, Zone};
use crate::filter::smart_money::{ConvergenceReading, ConvergenceStatus};
use crate::overlay::NormalizedOverlay;
use crate::strategy::rug_risk::RugRiskResult;

const BASELINE: i32 = 55;
const MAX_REASONS: usize = 7;

/// Derived readings fed to the aggregator alongside the overlay
#[derive(Debug, Clone, Copy)]
pub struct Signals<'a> {
    pub rug: &'a RugRiskResult,
    pub trap: &'a LiquidityTrap,
    pub entry_zone: &'a EntryZone,
    pub convergence: &'a ConvergenceReading,
    pub breakout: bool,
    pub social_velocity: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aggregate {
    /// Confidence in [1, 99]
    pub confidence: u8,
    pub reasons: Vec<String>,
}

struct Tally {
    value: i32,
    reasons: Vec<String>,
}

impl Tally {
    fn add(&mut self, delta: i32, reason: impl Into<String>) {
        self.value += delta;
        self.reasons.push(reason.into());
    }
}

pub fn aggregate(overlay: &NormalizedOverlay, signals: &Signals<'_>) -> Aggregate {
    let mut t = Tally {
        value: BASELINE,
        reasons: Vec::new(),
    };

    // Rug gradient
    let risk = signals.rug.risk;
    if risk <= 35 {
        t.add(10, format!("Low rug risk ({})", risk));
    } else if risk >= 65 {
        t.add(-16, format!("High rug risk ({})", risk));
    }

    // Liquidity trap
    if signals.trap.trap {
        let penalty = if signals.trap.severity == TrapSeverity::High { -20 } else { -12 };
        t.add(penalty, format!("Liquidity trap ({})", signals.trap.severity));
    }

    // Alpha score, only when one was supplied
    if let Some(score) = overlay.score {
        if score >= 85.0 {
            t.add(18, format!("Elite alpha score ({:.0})", score));
        } else if score >= 78.0 {
            t.add(10, format!("Strong alpha score ({:.0})", score));
        } else if score < 60.0 {
            t.add(-12, format!("Weak alpha score ({:.0})", score));
        }
    }

    // Momentum
    if overlay.rising {
        t.add(10, "Velocity rising");
    } else {
        t.add(-6, "Velocity not rising");
    }
    if signals.breakout {
        t.add(12, "Breakout detected");
    } else {
        t.add(-6, "No breakout");
    }

    // Wallet convergence
    match signals.convergence.status {
        ConvergenceStatus::Strong => t.add(18, "Strong wallet convergence"),
        ConvergenceStatus::Med => t.add(9, "Medium wallet convergence"),
        ConvergenceStatus::Weak => t.add(3, "Weak wallet convergence"),
        ConvergenceStatus::None => t.add(-3, "No wallet convergence"),
    }

    // Absolute depth and activity
    let liq = overlay.liquidity_usd;
    if liq >= 50_000.0 {
        t.add(10, format!("Deep liquidity (${:.0})", liq));
    } else if liq >= 15_000.0 {
        t.add(4, format!("Adequate liquidity (${:.0})", liq));
    } else {
        t.add(-12, format!("Shallow liquidity (${:.0})", liq));
    }

    let vol = overlay.volume_24h_usd;
    if vol >= 250_000.0 {
        t.add(10, format!("Heavy 24h volume (${:.0})", vol));
    } else if vol >= 120_000.0 {
        t.add(6, format!("Solid 24h volume (${:.0})", vol));
    } else if vol > 0.0 && vol < 60_000.0 {
        t.add(-8, format!("Light 24h volume (${:.0})", vol));
    }

    let social = signals.social_velocity;
    if social >= 60.0 {
        t.add(4, format!("Social velocity hot ({:.0})", social));
    } else if social >= 30.0 {
        t.add(2, format!("Social velocity warm ({:.0})", social));
    }

    // Entry zone
    match signals.entry_zone.zone {
        Zone::Chase => t.add(-18, "Chasing an extended move"),
        Zone::Early => t.add(8, "Early entry zone"),
        Zone::Neutral => {}
    }

    let mut reasons = t.reasons;
    reasons.truncate(MAX_REASONS);

    Aggregate {
        confidence: t.value.clamp(1, 99) as u8,
        reasons,
    }
}
