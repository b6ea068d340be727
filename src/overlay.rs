//! Market overlay input and normalization
//!
//! `MarketOverlay` is what callers hand us: every field optional, JSON in
//! camelCase, sub-readings possibly missing or malformed. It is normalized
//! exactly once into a `NormalizedOverlay` with concrete values; estimators
//! and the decision engine only ever see the normalized form.

use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};

use crate::dexscreener::DexPair;
use crate::filter::signals::{EntryZone, LiquidityTrap};
use crate::filter::smart_money::ConvergenceReading;
use crate::strategy::rug_risk::RugReading;

/// Raw market reading for one trading pair at one point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketOverlay {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub liquidity_usd: Option<f64>,
    #[serde(default, rename = "volume24hUsd", deserialize_with = "lenient_f64")]
    pub volume_24h_usd: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fdv: Option<f64>,

    #[serde(default, rename = "priceChange5m", deserialize_with = "lenient_f64")]
    pub price_change_5m: Option<f64>,
    #[serde(default, rename = "priceChange1h", deserialize_with = "lenient_f64")]
    pub price_change_1h: Option<f64>,
    #[serde(default, rename = "priceChange24h", deserialize_with = "lenient_f64")]
    pub price_change_24h: Option<f64>,

    #[serde(default, rename = "buys5m", deserialize_with = "lenient_count")]
    pub buys_5m: Option<u32>,
    #[serde(default, rename = "sells5m", deserialize_with = "lenient_count")]
    pub sells_5m: Option<u32>,

    /// Percent of liquidity lost since the previous poll of the same pool
    #[serde(default, deserialize_with = "lenient_f64")]
    pub liquidity_drop_pct: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub pair_age_minutes: Option<f64>,

    /// Alpha score (0-100) if already computed upstream
    #[serde(default, deserialize_with = "lenient_f64")]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub rising: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub breakout: Option<bool>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub social_velocity: Option<f64>,

    // Pre-computed readings
    #[serde(default, deserialize_with = "lenient")]
    pub rug: Option<RugReading>,
    #[serde(default, deserialize_with = "lenient")]
    pub convergence: Option<ConvergenceReading>,
    #[serde(default, deserialize_with = "lenient")]
    pub liq_trap: Option<LiquidityTrap>,
    #[serde(default, deserialize_with = "lenient")]
    pub entry_zone: Option<EntryZone>,

    // Leading indicator inputs (previous poll of the same pool)
    #[serde(default, deserialize_with = "lenient_f64")]
    pub buy_ratio_prev: Option<f64>,
    #[serde(default, rename = "tx5mPrev", deserialize_with = "lenient_f64")]
    pub tx_5m_prev: Option<f64>,
    #[serde(default, rename = "volume5m", deserialize_with = "lenient_f64")]
    pub volume_5m: Option<f64>,
    #[serde(default, rename = "volume5mBaseline", deserialize_with = "lenient_f64")]
    pub volume_5m_baseline: Option<f64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub sell_streak_count: Option<u32>,

    // Period-over-period acceleration versus the previous poll
    #[serde(default, deserialize_with = "lenient_f64")]
    pub volume_accel_pct: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub liquidity_accel_pct: Option<f64>,
}

impl MarketOverlay {
    /// Build an overlay from a Dexscreener pair
    pub fn from_pair(pair: &DexPair, now: DateTime<Utc>) -> Self {
        let price_change = pair.price_change.as_ref();
        let m5 = pair.txns.as_ref().and_then(|t| t.m5.as_ref());

        let pair_age_minutes = pair
            .pair_created_at
            .and_then(|created_ms| now.timestamp_millis().checked_sub(created_ms))
            .filter(|age_ms| *age_ms >= 0)
            .map(|age_ms| age_ms as f64 / 60_000.0);

        Self {
            liquidity_usd: pair.liquidity.as_ref().and_then(|l| l.usd),
            volume_24h_usd: pair.volume.as_ref().and_then(|v| v.h24),
            fdv: pair.fdv,
            price_change_5m: price_change.and_then(|pc| pc.m5),
            price_change_1h: price_change.and_then(|pc| pc.h1),
            price_change_24h: price_change.and_then(|pc| pc.h24),
            buys_5m: m5.map(|t| t.buys),
            sells_5m: m5.map(|t| t.sells),
            volume_5m: pair.volume.as_ref().and_then(|v| v.m5),
            pair_age_minutes,
            ..Default::default()
        }
    }

    /// Coerce into concrete values. Never fails.
    pub fn normalize(&self) -> NormalizedOverlay {
        let volume_5m = non_negative(self.volume_5m);

        NormalizedOverlay {
            liquidity_usd: non_negative(self.liquidity_usd),
            volume_24h_usd: non_negative(self.volume_24h_usd),
            fdv: non_negative(self.fdv),
            price_change_5m: finite(self.price_change_5m),
            price_change_1h: finite(self.price_change_1h),
            price_change_24h: finite(self.price_change_24h),
            buys_5m: self.buys_5m.unwrap_or(0),
            sells_5m: self.sells_5m.unwrap_or(0),
            liquidity_drop_pct: non_negative(self.liquidity_drop_pct),
            pair_age_minutes: self.pair_age_minutes.filter(|v| v.is_finite() && *v >= 0.0),
            score: self
                .score
                .filter(|v| v.is_finite())
                .map(|v| v.clamp(0.0, 100.0)),
            rising: self.rising.unwrap_or(false),
            breakout: self.breakout,
            social_velocity: non_negative(self.social_velocity).min(100.0),
            rug: self.rug.clone(),
            convergence: self.convergence.clone().unwrap_or_default(),
            liq_trap: self.liq_trap.clone(),
            entry_zone: self.entry_zone.clone(),
            buy_ratio_prev: self
                .buy_ratio_prev
                .filter(|v| v.is_finite())
                .map(|v| v.clamp(0.0, 1.0))
                .unwrap_or(0.5),
            tx_5m_prev: non_negative(self.tx_5m_prev),
            volume_5m,
            volume_5m_baseline: self
                .volume_5m_baseline
                .filter(|v| v.is_finite() && *v >= 0.0)
                .unwrap_or(volume_5m),
            sell_streak_count: self.sell_streak_count.unwrap_or(0),
            volume_accel_pct: self.volume_accel_pct.filter(|v| v.is_finite()),
            liquidity_accel_pct: self.liquidity_accel_pct.filter(|v| v.is_finite()),
        }
    }
}

/// Overlay with every field resolved to a concrete value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedOverlay {
    pub liquidity_usd: f64,
    pub volume_24h_usd: f64,
    pub fdv: f64,
    pub price_change_5m: f64,
    pub price_change_1h: f64,
    pub price_change_24h: f64,
    pub buys_5m: u32,
    pub sells_5m: u32,
    pub liquidity_drop_pct: f64,
    pub pair_age_minutes: Option<f64>,
    pub score: Option<f64>,
    pub rising: bool,
    pub breakout: Option<bool>,
    pub social_velocity: f64,
    pub rug: Option<RugReading>,
    pub convergence: ConvergenceReading,
    pub liq_trap: Option<LiquidityTrap>,
    pub entry_zone: Option<EntryZone>,
    pub buy_ratio_prev: f64,
    pub tx_5m_prev: f64,
    pub volume_5m: f64,
    pub volume_5m_baseline: f64,
    pub sell_streak_count: u32,
    pub volume_accel_pct: Option<f64>,
    pub liquidity_accel_pct: Option<f64>,
}

impl NormalizedOverlay {
    /// Total 5-minute transactions
    pub fn tx_5m(&self) -> u32 {
        self.buys_5m.saturating_add(self.sells_5m)
    }

    /// 5-minute buy ratio, 0.5 when there is no flow
    pub fn buy_ratio_5m(&self) -> f64 {
        let total = self.tx_5m();
        if total > 0 {
            self.buys_5m as f64 / total as f64
        } else {
            0.5
        }
    }

    /// FDV / liquidity, only when both are known
    pub fn fdv_liquidity_ratio(&self) -> Option<f64> {
        (self.fdv > 0.0 && self.liquidity_usd > 0.0).then(|| self.fdv / self.liquidity_usd)
    }
}

fn finite(v: Option<f64>) -> f64 {
    v.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn non_negative(v: Option<f64>) -> f64 {
    finite(v).max(0.0)
}

/// Deserialize anything; a value of the wrong shape becomes `None`
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Numbers, or numeric strings as Dexscreener sometimes sends them
fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_f64(deserializer)?
        .filter(|v| *v >= 0.0)
        .map(|v| v.min(u32::MAX as f64) as u32))
}
