//! Rug Risk Estimation
//!
//! Additive heuristic over liquidity depth, FDV/liquidity, crash windows,
//! liquidity drain between polls, 5m order flow and volume-without-depth.
//! Missing data contributes its cautious branch, never a bonus.

use serde::{Deserialize, Serialize};

use crate::overlay::NormalizedOverlay;

const BASE_RISK: f64 = 18.0;
const MAX_REASONS: usize = 6;

/// Short-window crash cutoffs (percent)
pub const CRASH_5M_PCT: f64 = -18.0;
pub const CRASH_1H_PCT: f64 = -35.0;
pub const CRASH_24H_PCT: f64 = -70.0;

/// Weak-flow and drain conditions that turn a price drop into a crash
const CRASH_BUY_RATIO_MAX: f64 = 0.38;
const CRASH_LIQ_DROP_PCT: f64 = 18.0;

/// Partial rug reading supplied by an upstream source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RugReading {
    pub risk: Option<f64>,
    pub crash: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Min,
    Low,
    Med,
    High,
    Extreme,
}

impl RiskLevel {
    pub fn from_risk(risk: u8) -> Self {
        match risk {
            80.. => RiskLevel::Extreme,
            65..=79 => RiskLevel::High,
            45..=64 => RiskLevel::Med,
            25..=44 => RiskLevel::Low,
            _ => RiskLevel::Min,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Min => write!(f, "MIN"),
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Med => write!(f, "MED"),
            RiskLevel::High => write!(f, "HIGH"),
            RiskLevel::Extreme => write!(f, "EXTREME"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RugRiskResult {
    pub risk: u8,
    pub level: RiskLevel,
    pub hard_fail: bool,
    pub crash: bool,
    pub reasons: Vec<String>,
}

/// Compute rug risk from a normalized overlay.
///
/// A supplied `rug.risk` replaces the computed score (level and hard-fail
/// follow it); a supplied `rug.crash == true` sets the crash flag.
pub fn compute_rug_risk(overlay: &NormalizedOverlay) -> RugRiskResult {
    let liq = overlay.liquidity_usd;
    let vol = overlay.volume_24h_usd;
    let tx5 = overlay.tx_5m();
    let buy_ratio = overlay.buy_ratio_5m();
    let liq_drop = overlay.liquidity_drop_pct;
    let ratio = overlay.fdv_liquidity_ratio();

    let mut risk = BASE_RISK;
    let mut reasons: Vec<String> = Vec::new();

    // Liquidity depth
    if liq < 5_000.0 {
        risk += 35.0;
        reasons.push("Very low liquidity".into());
    } else if liq < 10_000.0 {
        risk += 26.0;
        reasons.push("Low liquidity".into());
    } else if liq < 25_000.0 {
        risk += 14.0;
        reasons.push("Thin liquidity".into());
    } else {
        risk += 2.0;
        reasons.push("Liquidity looks ok".into());
    }

    // FDV / liquidity
    match ratio {
        Some(r) if r >= 500.0 => {
            risk += 22.0;
            reasons.push(format!("FDV/liquidity extreme ({:.0}x)", r));
        }
        Some(r) if r >= 250.0 => {
            risk += 14.0;
            reasons.push(format!("FDV/liquidity high ({:.0}x)", r));
        }
        Some(_) => {}
        None => {
            risk += 6.0;
            reasons.push("FDV/liquidity unavailable".into());
        }
    }

    // Crash windows
    let crash_5m = overlay.price_change_5m <= CRASH_5M_PCT;
    let crash_1h = overlay.price_change_1h <= CRASH_1H_PCT;
    if crash_5m {
        risk += 32.0;
        reasons.push(format!("5m crash {:.1}%", overlay.price_change_5m));
    }
    if crash_1h {
        risk += 28.0;
        reasons.push(format!("1h crash {:.1}%", overlay.price_change_1h));
    }
    if overlay.price_change_24h <= CRASH_24H_PCT {
        risk += 22.0;
        reasons.push(format!("24h collapse {:.1}%", overlay.price_change_24h));
    }

    // Liquidity drain since the previous poll
    if liq_drop >= 45.0 {
        risk += 40.0;
        reasons.push(format!("Liquidity drained {:.0}%", liq_drop));
    } else if liq_drop >= 30.0 {
        risk += 26.0;
        reasons.push(format!("Liquidity dropping {:.0}%", liq_drop));
    } else if liq_drop >= 18.0 {
        risk += 14.0;
        reasons.push(format!("Liquidity slipping {:.0}%", liq_drop));
    }

    // 5m order flow
    if tx5 >= 12 {
        if buy_ratio <= CRASH_BUY_RATIO_MAX {
            risk += 18.0;
            reasons.push(format!("Sell-dominant flow ({:.0}% buys)", buy_ratio * 100.0));
        } else if buy_ratio >= 0.65 {
            risk -= 6.0;
            reasons.push(format!("Buy-dominant flow ({:.0}% buys)", buy_ratio * 100.0));
        }
    }

    // Volume without depth
    if vol >= 300_000.0 && liq < 25_000.0 {
        risk += 14.0;
        reasons.push("High volume without liquidity support".into());
    }

    let weak_flow = tx5 == 0 || buy_ratio <= CRASH_BUY_RATIO_MAX || liq_drop >= CRASH_LIQ_DROP_PCT;
    let mut crash = (crash_5m || crash_1h) && weak_flow;

    let mut risk = risk.clamp(0.0, 100.0).round() as u8;

    if let Some(reading) = &overlay.rug {
        if let Some(supplied) = reading.risk.filter(|r| r.is_finite()) {
            risk = supplied.clamp(0.0, 100.0).round() as u8;
        }
        if reading.crash == Some(true) {
            crash = true;
            reasons.insert(0, "Upstream crash flag".into());
        }
    }

    let hard_fail = risk >= 85 || liq < 5_000.0 || ratio.is_some_and(|r| r > 500.0);

    reasons.truncate(MAX_REASONS);

    RugRiskResult {
        risk,
        level: RiskLevel::from_risk(risk),
        hard_fail,
        crash,
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::MarketOverlay;

    fn healthy() -> NormalizedOverlay {
        NormalizedOverlay {
            liquidity_usd: 80_000.0,
            volume_24h_usd: 150_000.0,
            fdv: 2_000_000.0,
            buys_5m: 10,
            sells_5m: 8,
            buy_ratio_prev: 0.5,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_overlay_is_cautious() {
        let r = compute_rug_risk(&MarketOverlay::default().normalize());
        // 18 + 35 (liquidity) + 6 (no fdv)
        assert_eq!(r.risk, 59);
        assert_eq!(r.level, RiskLevel::Med);
        assert!(r.hard_fail);
        assert!(!r.crash);
    }

    #[test]
    fn test_healthy_pool_is_low_risk() {
        let r = compute_rug_risk(&healthy());
        assert_eq!(r.risk, 20);
        assert_eq!(r.level, RiskLevel::Min);
        assert!(!r.hard_fail);
        assert_eq!(r.reasons, vec!["Liquidity looks ok".to_string()]);
    }

    #[test]
    fn test_level_is_monotonic_step() {
        assert_eq!(RiskLevel::from_risk(24), RiskLevel::Min);
        assert_eq!(RiskLevel::from_risk(25), RiskLevel::Low);
        assert_eq!(RiskLevel::from_risk(45), RiskLevel::Med);
        assert_eq!(RiskLevel::from_risk(64), RiskLevel::Med);
        assert_eq!(RiskLevel::from_risk(65), RiskLevel::High);
        assert_eq!(RiskLevel::from_risk(79), RiskLevel::High);
        assert_eq!(RiskLevel::from_risk(80), RiskLevel::Extreme);
        assert_eq!(RiskLevel::from_risk(81), RiskLevel::Extreme);

        let mut prev = RiskLevel::Min;
        for risk in 0..=100u8 {
            let level = RiskLevel::from_risk(risk);
            assert!(level >= prev);
            prev = level;
        }
    }

    #[test]
    fn test_crash_needs_weak_flow() {
        // Price crash with strong buying is not flagged as a crash
        let mut o = healthy();
        o.price_change_5m = -20.0;
        o.buys_5m = 30;
        o.sells_5m = 5;
        let r = compute_rug_risk(&o);
        assert!(!r.crash);
        assert!(r.reasons.iter().any(|s| s.starts_with("5m crash")));

        // No flow at all counts as weak
        o.buys_5m = 0;
        o.sells_5m = 0;
        assert!(compute_rug_risk(&o).crash);
    }

    #[test]
    fn test_liquidity_drain_triggers_crash() {
        let mut o = healthy();
        o.price_change_1h = -40.0;
        o.buys_5m = 15;
        o.sells_5m = 15;
        o.liquidity_drop_pct = 31.0;
        let r = compute_rug_risk(&o);
        assert!(r.crash);
        // 20 + 28 + 26
        assert_eq!(r.risk, 74);
    }

    #[test]
    fn test_supplied_risk_overrides() {
        let mut o = healthy();
        o.rug = Some(RugReading {
            risk: Some(90.0),
            crash: None,
        });
        let r = compute_rug_risk(&o);
        assert_eq!(r.risk, 90);
        assert_eq!(r.level, RiskLevel::Extreme);
        assert!(r.hard_fail);

        o.rug = Some(RugReading {
            risk: None,
            crash: Some(true),
        });
        let r = compute_rug_risk(&o);
        assert!(r.crash);
        assert_eq!(r.risk, 20);
    }

    #[test]
    fn test_fdv_ratio_hard_fail() {
        let mut o = healthy();
        o.fdv = 50_000_000.0; // 625x
        let r = compute_rug_risk(&o);
        assert!(r.hard_fail);
        assert!(r.reasons.iter().any(|s| s.contains("extreme")));
    }

    #[test]
    fn test_reasons_capped() {
        let o = NormalizedOverlay {
            volume_24h_usd: 400_000.0,
            price_change_5m: -30.0,
            price_change_1h: -50.0,
            price_change_24h: -80.0,
            liquidity_drop_pct: 50.0,
            buys_5m: 2,
            sells_5m: 20,
            ..Default::default()
        };
        let r = compute_rug_risk(&o);
        assert_eq!(r.reasons.len(), 6);
        assert_eq!(r.risk, 100);
        assert_eq!(r.reasons[0], "Very low liquidity");
    }
}
