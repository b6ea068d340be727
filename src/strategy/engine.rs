//! Decision engine
//!
//! Tier-aware state machine over the estimator outputs. Rules are checked
//! in strict priority order: RUG_WARNING (hard override), ENTER, READY,
//! ARM, then WAIT as the default. The engine is total: every overlay maps
//! to exactly one action, and the reported confidence never exceeds the
//! chosen action's ceiling.

use tracing::debug;

use super::rug_risk::{compute_rug_risk, CRASH_1H_PCT, CRASH_5M_PCT};
use super::tiers::{Tier, TierTable, TierThresholds};
use super::types::{Action, Decision, DecisionSignals};
use crate::filter::scoring::{aggregate, Signals};
use crate::filter::signals::{Breakout, EntryZone, LeadingIndicators, LiquidityTrap, Zone};
use crate::overlay::{MarketOverlay, NormalizedOverlay};

/// Liquidity drop that forces a rug warning on its own
const LIQ_DROP_CRASH_PCT: f64 = 35.0;
/// Early rug composite: sell streak plus one of these
const EARLY_RUG_5M_PCT: f64 = -10.0;
const EARLY_RUG_LIQ_DROP_PCT: f64 = 25.0;
/// Liquidity drop worth reporting in a rug warning
const LIQ_DROP_REPORT_PCT: f64 = 18.0;

const MAX_REASONS: usize = 7;
const RUG_CONFIDENCE_EARLY: u8 = 85;
const RUG_CONFIDENCE_HARD: u8 = 98;

/// Evaluate an overlay against the built-in threshold table
pub fn evaluate(overlay: &MarketOverlay, tier: Tier) -> Decision {
    decide_normalized(
        &overlay.normalize(),
        tier,
        &TierThresholds::for_tier(tier),
    )
}

/// Decision engine bound to a (possibly configured) threshold table
#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    tiers: TierTable,
}

impl DecisionEngine {
    pub fn new(tiers: TierTable) -> Self {
        Self { tiers }
    }

    pub fn thresholds(&self, tier: Tier) -> &TierThresholds {
        self.tiers.get(tier)
    }

    pub fn decide(&self, overlay: &MarketOverlay, tier: Tier) -> Decision {
        decide_normalized(&overlay.normalize(), tier, self.tiers.get(tier))
    }
}

/// Core state machine over a normalized overlay
pub fn decide_normalized(
    overlay: &NormalizedOverlay,
    tier: Tier,
    thresholds: &TierThresholds,
) -> Decision {
    let rug = compute_rug_risk(overlay);
    let liq_trap = overlay
        .liq_trap
        .clone()
        .unwrap_or_else(|| LiquidityTrap::from_overlay(overlay));
    let entry_zone = overlay
        .entry_zone
        .clone()
        .unwrap_or_else(|| EntryZone::from_overlay(overlay));
    let breakout = overlay
        .breakout
        .unwrap_or_else(|| Breakout::detect(overlay).breakout);
    let convergence = overlay.convergence.clone();
    let indicators = LeadingIndicators::detect(overlay, thresholds);

    let agg = aggregate(
        overlay,
        &Signals {
            rug: &rug,
            trap: &liq_trap,
            entry_zone: &entry_zone,
            convergence: &convergence,
            breakout,
            social_velocity: overlay.social_velocity,
        },
    );

    // Without an upstream alpha score the aggregate stands in for it
    let score = overlay.score.unwrap_or(agg.confidence as f64);
    let risk = rug.risk as f64;
    let rising = overlay.rising;
    let ch5 = overlay.price_change_5m;
    let ch1h = overlay.price_change_1h;
    let liq = overlay.liquidity_usd;
    let vol = overlay.volume_24h_usd;
    let liq_drop = overlay.liquidity_drop_pct;

    let mut tags = vec![
        format!("SCORE:{:.0}", score),
        format!("RUG:{}", rug.risk),
        format!("RISK:{}", rug.level),
        if rug.hard_fail { "HARDFAIL:ON" } else { "HARDFAIL:OFF" }.to_string(),
        if rising { "ACCEL:ON" } else { "ACCEL:OFF" }.to_string(),
        if breakout { "BREAKOUT:ON" } else { "BREAKOUT:OFF" }.to_string(),
        format!("CHG5M:{:.1}", ch5),
        format!("LIQDROP:{:.0}", liq_drop),
        format!("CONV:{}", convergence.status),
        if liq_trap.trap {
            format!("TRAP:{}", liq_trap.severity)
        } else {
            "TRAP:OFF".to_string()
        },
        format!("ENTRY:{}", entry_zone.zone),
        format!("TIER:{}", tier),
        format!("INDICATORS:{}", indicators.count),
    ];

    // RUG_WARNING
    let crash_now =
        rug.crash || ch5 <= CRASH_5M_PCT || ch1h <= CRASH_1H_PCT || liq_drop >= LIQ_DROP_CRASH_PCT;
    let hard_risk = risk >= thresholds.rug_hard_threshold;
    let early_rug = indicators.sell_streak
        && (ch5 <= EARLY_RUG_5M_PCT || liq_drop >= EARLY_RUG_LIQ_DROP_PCT);
    let early_rug_confirmed =
        tier != Tier::Basic && early_rug && indicators.count >= thresholds.min_confirmations;

    if crash_now || hard_risk || early_rug_confirmed {
        let mut reasons = vec!["Rug/crash conditions detected".to_string()];
        if ch5 <= CRASH_5M_PCT {
            reasons.push(format!("Crash 5m ({:.1}%)", ch5));
        }
        if ch1h <= CRASH_1H_PCT {
            reasons.push(format!("Crash 1h ({:.1}%)", ch1h));
        }
        if liq_drop >= LIQ_DROP_REPORT_PCT {
            reasons.push(format!("Liquidity drop ({:.0}%)", liq_drop));
        }
        if rug.crash && ch5 > CRASH_5M_PCT && ch1h > CRASH_1H_PCT {
            reasons.push("Crash flagged on weak flow".to_string());
        }
        if indicators.sell_streak {
            reasons.push(format!("Sell streak ({} polls)", overlay.sell_streak_count));
        }
        reasons.push(format!("Rug risk {}/100", rug.risk));
        reasons.truncate(MAX_REASONS);

        let confidence = if early_rug_confirmed && !crash_now && !hard_risk {
            RUG_CONFIDENCE_EARLY
        } else {
            RUG_CONFIDENCE_HARD
        };

        tags.push("RUG:WARNING".to_string());
        debug!(%tier, risk = rug.risk, crash_now, hard_risk, early_rug_confirmed, "Rug warning");

        return Decision {
            action: Action::RugWarning,
            confidence,
            reasons,
            tags,
            tier,
            signals: DecisionSignals {
                score,
                raw_confidence: agg.confidence,
                rug,
                liq_trap,
                entry_zone,
                breakout,
                rising,
                convergence,
                indicators,
                early_entry: false,
            },
        };
    }

    // ENTER
    let base_enter = score >= thresholds.score_enter
        && risk <= thresholds.rug_max_enter
        && rising
        && !liq_trap.trap
        && entry_zone.zone != Zone::Chase
        && !rug.hard_fail;

    let standard_enter = base_enter
        && (breakout || (liq >= 50_000.0 && vol >= 120_000.0))
        && convergence.status.is_confirmed();

    let early_enter = tier != Tier::Basic
        && base_enter
        && indicators.count >= thresholds.min_confirmations
        && indicators.any_acceleration()
        && (liq >= 30_000.0 || vol >= 80_000.0);

    let mut reasons = agg.reasons;
    let early_entry = early_enter && !standard_enter;

    let action = if standard_enter || early_enter {
        if early_entry {
            reasons.insert(0, format!("Early entry ({} indicators)", indicators.count));
        }
        Action::Enter
    } else if score >= thresholds.score_ready
        && risk <= thresholds.rug_max_ready
        && (rising || breakout)
    {
        Action::Ready
    } else if score >= thresholds.score_arm && risk <= thresholds.rug_max_arm {
        Action::Arm
    } else {
        Action::Wait
    };

    if rug.hard_fail {
        reasons.insert(0, "Rug hard-fail: entry blocked".to_string());
    }
    reasons.truncate(MAX_REASONS);

    let confidence = agg.confidence.min(action.confidence_ceiling()).max(1);

    debug!(
        %tier,
        %action,
        confidence,
        raw_confidence = agg.confidence,
        score,
        risk = rug.risk,
        "Decision computed"
    );

    Decision {
        action,
        confidence,
        reasons,
        tags,
        tier,
        signals: DecisionSignals {
            score,
            raw_confidence: agg.confidence,
            rug,
            liq_trap,
            entry_zone,
            breakout,
            rising,
            convergence,
            indicators,
            early_entry,
        },
    }
}
