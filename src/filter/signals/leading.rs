//! Leading indicators
//!
//! Order-flow changes that tend to precede price: buy-ratio and
//! transaction-count acceleration, short-window volume surges, and
//! consecutive sell-dominant polls. Sensitivity comes from the tier table.

use serde::Serialize;

use crate::overlay::NormalizedOverlay;
use crate::strategy::tiers::TierThresholds;

/// A sell streak never counts below this many polls
const SELL_STREAK_FLOOR: u32 = 3;
/// Sell streak fires this many polls before the tier maximum
const SELL_STREAK_OFFSET: u32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadingIndicators {
    pub buy_ratio_accel: bool,
    pub tx_accel: bool,
    pub volume_surge: bool,
    pub sell_streak: bool,
    pub count: u32,
}

impl LeadingIndicators {
    pub fn detect(overlay: &NormalizedOverlay, thresholds: &TierThresholds) -> Self {
        let buy_ratio_accel =
            overlay.buy_ratio_5m() - overlay.buy_ratio_prev > thresholds.buy_ratio_accel_min;

        let tx_accel_ratio = if overlay.tx_5m_prev > 0.0 {
            overlay.tx_5m() as f64 / overlay.tx_5m_prev
        } else {
            1.0
        };
        let tx_accel = tx_accel_ratio >= thresholds.tx_accel_threshold;

        let volume_surge_ratio = if overlay.volume_5m_baseline > 0.0 {
            overlay.volume_5m / overlay.volume_5m_baseline
        } else {
            1.0
        };
        let volume_surge = volume_surge_ratio >= thresholds.volume_surge_multiplier;

        let sell_streak_min = thresholds
            .sell_streak_max
            .saturating_sub(SELL_STREAK_OFFSET)
            .max(SELL_STREAK_FLOOR);
        let sell_streak = overlay.sell_streak_count >= sell_streak_min;

        let count = [buy_ratio_accel, tx_accel, volume_surge, sell_streak]
            .iter()
            .filter(|fired| **fired)
            .count() as u32;

        Self {
            buy_ratio_accel,
            tx_accel,
            volume_surge,
            sell_streak,
            count,
        }
    }

    /// Any of the bullish acceleration indicators
    pub fn any_acceleration(&self) -> bool {
        self.buy_ratio_accel || self.tx_accel || self.volume_surge
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::tiers::Tier;

    #[test]
    fn test_neutral_overlay_fires_nothing() {
        let ind = LeadingIndicators::detect(
            &NormalizedOverlay {
                buy_ratio_prev: 0.5,
                ..Default::default()
            },
            &TierThresholds::for_tier(Tier::Basic),
        );
        assert_eq!(ind, LeadingIndicators::default());
    }

    #[test]
    fn test_acceleration_indicators() {
        let overlay = NormalizedOverlay {
            buys_5m: 40,
            sells_5m: 10,
            buy_ratio_prev: 0.5,
            tx_5m_prev: 20.0,
            volume_5m: 9_000.0,
            volume_5m_baseline: 3_000.0,
            ..Default::default()
        };
        let ind = LeadingIndicators::detect(&overlay, &TierThresholds::for_tier(Tier::Basic));
        assert!(ind.buy_ratio_accel); // 0.8 - 0.5 > 0.15
        assert!(ind.tx_accel); // 50 / 20 = 2.5 >= 1.8
        assert!(ind.volume_surge); // 3.0 >= 3.0
        assert!(!ind.sell_streak);
        assert_eq!(ind.count, 3);
        assert!(ind.any_acceleration());
    }

    #[test]
    fn test_sell_streak_threshold_per_tier() {
        let overlay = NormalizedOverlay {
            sell_streak_count: 3,
            buy_ratio_prev: 0.5,
            ..Default::default()
        };
        // BASIC: max(3, 4 - 2) = 3
        assert!(LeadingIndicators::detect(&overlay, &TierThresholds::for_tier(Tier::Basic)).sell_streak);
        // PROPLUS: max(3, 6 - 2) = 4
        assert!(
            !LeadingIndicators::detect(&overlay, &TierThresholds::for_tier(Tier::ProPlus)).sell_streak
        );
    }

    #[test]
    fn test_more_sensitive_tiers_fire_earlier() {
        let overlay = NormalizedOverlay {
            volume_5m: 2_200.0,
            volume_5m_baseline: 1_000.0,
            buy_ratio_prev: 0.5,
            ..Default::default()
        };
        assert!(!LeadingIndicators::detect(&overlay, &TierThresholds::for_tier(Tier::Basic)).volume_surge);
        assert!(LeadingIndicators::detect(&overlay, &TierThresholds::for_tier(Tier::ProPlus)).volume_surge);
    }
}
