//! Alpha Score Computation
//!
//! Token-level alpha score (0-100) for a signal. Formula:
//! - Lead wallet tier: S +50, A +35, B +20, C +10
//! - Social velocity: up to +30
//! - Liquidity and 24h volume bands (only when known)
//! - Momentum extremes on the 1h and 24h windows

use serde::{Deserialize, Serialize};

use super::WalletTier;
use crate::overlay::MarketOverlay;

const BASE_SCORE: i32 = 20;
const MAX_REASONS: usize = 6;

/// Inputs to the alpha score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlphaInputs {
    /// Tier of the wallet that led the signal, if any
    pub wallet_tier: Option<WalletTier>,
    pub social_velocity: f64,
    pub liquidity_usd: Option<f64>,
    pub volume_24h_usd: Option<f64>,
    pub price_change_1h: Option<f64>,
    pub price_change_24h: Option<f64>,
}

impl AlphaInputs {
    pub fn from_overlay(overlay: &MarketOverlay, wallet_tier: Option<WalletTier>) -> Self {
        Self {
            wallet_tier,
            social_velocity: overlay.social_velocity.unwrap_or(0.0),
            liquidity_usd: overlay.liquidity_usd,
            volume_24h_usd: overlay.volume_24h_usd,
            price_change_1h: overlay.price_change_1h,
            price_change_24h: overlay.price_change_24h,
        }
    }
}

fn known(v: Option<f64>) -> Option<f64> {
    v.filter(|v| v.is_finite())
}

fn velocity_points(v: f64) -> i32 {
    if !v.is_finite() || v <= 0.0 {
        return 0;
    }
    ((v / 3.0).floor() as i32).min(30)
}

fn liquidity_points(liq: f64) -> i32 {
    match liq {
        l if l >= 100_000.0 => 18,
        l if l >= 50_000.0 => 14,
        l if l >= 20_000.0 => 10,
        l if l >= 10_000.0 => 6,
        l if l >= 5_000.0 => 3,
        _ => -4,
    }
}

fn volume_points(vol: f64) -> i32 {
    match vol {
        v if v >= 500_000.0 => 12,
        v if v >= 200_000.0 => 9,
        v if v >= 100_000.0 => 7,
        v if v >= 25_000.0 => 4,
        _ => -2,
    }
}

fn momentum_1h_points(ch: f64) -> i32 {
    if ch >= 80.0 {
        8
    } else if ch >= 30.0 {
        5
    } else if ch <= -40.0 {
        -6
    } else {
        0
    }
}

fn momentum_24h_points(ch: f64) -> i32 {
    if ch >= 200.0 {
        6
    } else if ch <= -60.0 {
        -6
    } else {
        0
    }
}

/// Alpha score clamped to [0, 100]
pub fn alpha_score(inputs: &AlphaInputs) -> u8 {
    let mut score = BASE_SCORE;

    if let Some(tier) = inputs.wallet_tier {
        score += tier.alpha_boost();
    }
    score += velocity_points(inputs.social_velocity);
    if let Some(liq) = known(inputs.liquidity_usd) {
        score += liquidity_points(liq);
    }
    if let Some(vol) = known(inputs.volume_24h_usd) {
        score += volume_points(vol);
    }
    if let Some(ch) = known(inputs.price_change_1h) {
        score += momentum_1h_points(ch);
    }
    if let Some(ch) = known(inputs.price_change_24h) {
        score += momentum_24h_points(ch);
    }

    score.clamp(0, 100) as u8
}

/// Human-readable drivers of the alpha score, at most six
pub fn alpha_reasons(inputs: &AlphaInputs) -> Vec<String> {
    let mut reasons = Vec::new();

    if let Some(tier) = inputs.wallet_tier {
        reasons.push(format!("Tier {} wallet signal", tier));
    }

    let vel = velocity_points(inputs.social_velocity);
    if vel >= 15 {
        reasons.push(format!("High social velocity ({:.0})", inputs.social_velocity));
    } else if vel > 0 {
        reasons.push(format!("Social velocity {:.0}", inputs.social_velocity));
    }

    match known(inputs.liquidity_usd) {
        Some(liq) if liq >= 50_000.0 => reasons.push(format!("Deep liquidity (${:.0})", liq)),
        Some(liq) if liq < 5_000.0 => reasons.push(format!("Thin liquidity (${:.0})", liq)),
        _ => {}
    }

    if let Some(vol) = known(inputs.volume_24h_usd).filter(|v| *v >= 200_000.0) {
        reasons.push(format!("Strong 24h volume (${:.0})", vol));
    }

    if let Some(ch) = known(inputs.price_change_1h) {
        if ch >= 30.0 {
            reasons.push(format!("1h momentum +{:.1}%", ch));
        } else if ch <= -40.0 {
            reasons.push(format!("1h dump {:.1}%", ch));
        }
    }

    if let Some(ch) = known(inputs.price_change_24h) {
        if ch >= 200.0 {
            reasons.push(format!("24h run +{:.0}%", ch));
        } else if ch <= -60.0 {
            reasons.push(format!("24h collapse {:.0}%", ch));
        }
    }

    reasons.truncate(MAX_REASONS);
    reasons
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_score_only() {
        assert_eq!(alpha_score(&AlphaInputs::default()), 20);
        assert!(alpha_reasons(&AlphaInputs::default()).is_empty());
    }

    #[test]
    fn test_full_signal() {
        let inputs = AlphaInputs {
            wallet_tier: Some(WalletTier::S),
            social_velocity: 45.0,
            liquidity_usd: Some(120_000.0),
            volume_24h_usd: Some(600_000.0),
            price_change_1h: Some(35.0),
            price_change_24h: Some(20.0),
        };
        // 20 + 50 + 15 + 18 + 12 + 5 + 0 = 120, clamped
        assert_eq!(alpha_score(&inputs), 100);
        let reasons = alpha_reasons(&inputs);
        assert_eq!(reasons[0], "Tier S wallet signal");
        assert!(reasons.len() <= 6);
    }

    #[test]
    fn test_velocity_capped_at_thirty() {
        let inputs = AlphaInputs {
            social_velocity: 100.0,
            ..Default::default()
        };
        assert_eq!(alpha_score(&inputs), 50);
    }

    #[test]
    fn test_weak_market_penalties() {
        let inputs = AlphaInputs {
            liquidity_usd: Some(1_000.0),
            volume_24h_usd: Some(5_000.0),
            price_change_1h: Some(-50.0),
            price_change_24h: Some(-70.0),
            ..Default::default()
        };
        // 20 - 4 - 2 - 6 - 6
        assert_eq!(alpha_score(&inputs), 2);
    }

    #[test]
    fn test_unknown_market_data_is_neutral() {
        let inputs = AlphaInputs {
            wallet_tier: Some(WalletTier::B),
            ..Default::default()
        };
        assert_eq!(alpha_score(&inputs), 40);
    }
}
