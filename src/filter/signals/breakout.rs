//! Breakout detection
//!
//! Momentum ignition from price alone, price with volume or liquidity
//! support, or period-over-period acceleration versus the previous poll.

use serde::Serialize;

use crate::overlay::NormalizedOverlay;

/// Which rule fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakoutTrigger {
    PriceSurge,
    VolumeBacked,
    LiquidityBacked,
    VolumeAcceleration,
    LiquidityAcceleration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakout {
    pub breakout: bool,
    pub triggers: Vec<BreakoutTrigger>,
}

impl Breakout {
    pub fn detect(overlay: &NormalizedOverlay) -> Self {
        let ch1h = overlay.price_change_1h;
        let mut triggers = Vec::new();

        if ch1h >= 8.0 {
            triggers.push(BreakoutTrigger::PriceSurge);
        }
        if overlay.volume_24h_usd >= 120_000.0 && ch1h >= 3.0 {
            triggers.push(BreakoutTrigger::VolumeBacked);
        }
        if overlay.liquidity_usd >= 50_000.0 && ch1h >= 2.0 {
            triggers.push(BreakoutTrigger::LiquidityBacked);
        }
        // Acceleration is only known when a fresh previous poll exists
        if overlay.volume_accel_pct.is_some_and(|pct| pct >= 15.0) {
            triggers.push(BreakoutTrigger::VolumeAcceleration);
        }
        if overlay.liquidity_accel_pct.is_some_and(|pct| pct >= 5.0) {
            triggers.push(BreakoutTrigger::LiquidityAcceleration);
        }

        Self {
            breakout: !triggers.is_empty(),
            triggers,
        }
    }
}
