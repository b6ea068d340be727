//! Pool history cache
//!
//! Keeps the last observed reading per pool (`chain:pairAddress`) so that
//! cross-poll signals can be derived: liquidity drop, volume and liquidity
//! acceleration, previous buy ratio and tx count, and sell streaks.
//! Readings older than the staleness window are treated as absent.

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::clock::{window_start, Clock, SystemClock};
use crate::overlay::MarketOverlay;

/// Configuration for the pool history cache
#[derive(Debug, Clone)]
pub struct PoolCacheConfig {
    /// Observations older than this are ignored
    pub staleness: Duration,
    /// Maximum tracked pools before the stalest is evicted
    pub max_pools: usize,
}

impl Default for PoolCacheConfig {
    fn default() -> Self {
        Self {
            staleness: Duration::minutes(12),
            max_pools: 5_000,
        }
    }
}

/// Pool identity key
pub fn pool_key(chain: &str, pair_address: &str) -> String {
    format!(
        "{}:{}",
        chain.trim().to_ascii_lowercase(),
        pair_address.trim()
    )
}

/// One observation of a pool
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSnapshot {
    pub liquidity_usd: f64,
    pub volume_5m: f64,
    pub volume_24h_usd: f64,
    pub buys_5m: u32,
    pub sells_5m: u32,
    pub observed_at: DateTime<Utc>,
}

impl PoolSnapshot {
    pub fn from_overlay(overlay: &MarketOverlay, observed_at: DateTime<Utc>) -> Self {
        let n = overlay.normalize();
        Self {
            liquidity_usd: n.liquidity_usd,
            volume_5m: n.volume_5m,
            volume_24h_usd: n.volume_24h_usd,
            buys_5m: n.buys_5m,
            sells_5m: n.sells_5m,
            observed_at,
        }
    }

    fn tx_5m(&self) -> u32 {
        self.buys_5m.saturating_add(self.sells_5m)
    }

    fn buy_ratio(&self) -> Option<f64> {
        let total = self.tx_5m();
        (total > 0).then(|| self.buys_5m as f64 / total as f64)
    }

    fn sell_dominant(&self) -> bool {
        self.sells_5m > self.buys_5m
    }
}

/// Change of a pool versus its previous fresh observation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolDelta {
    /// Whether a fresh previous observation existed
    pub has_previous: bool,
    pub liquidity_drop_pct: Option<f64>,
    pub liquidity_accel_pct: Option<f64>,
    pub volume_accel_pct: Option<f64>,
    pub buy_ratio_prev: Option<f64>,
    pub tx_5m_prev: Option<f64>,
    pub volume_5m_baseline: Option<f64>,
    /// Consecutive sell-dominant observations, including this one
    pub sell_streak_count: u32,
}

impl PoolDelta {
    /// Fill overlay fields the caller left empty
    pub fn apply_to(&self, overlay: &mut MarketOverlay) {
        overlay.liquidity_drop_pct = overlay.liquidity_drop_pct.or(self.liquidity_drop_pct);
        overlay.liquidity_accel_pct = overlay.liquidity_accel_pct.or(self.liquidity_accel_pct);
        overlay.volume_accel_pct = overlay.volume_accel_pct.or(self.volume_accel_pct);
        overlay.buy_ratio_prev = overlay.buy_ratio_prev.or(self.buy_ratio_prev);
        overlay.tx_5m_prev = overlay.tx_5m_prev.or(self.tx_5m_prev);
        overlay.volume_5m_baseline = overlay.volume_5m_baseline.or(self.volume_5m_baseline);
        if overlay.sell_streak_count.is_none() {
            overlay.sell_streak_count = Some(self.sell_streak_count);
        }
    }
}

fn pct_change(prev: f64, cur: f64) -> Option<f64> {
    (prev > 0.0).then(|| (cur - prev) * 100.0 / prev)
}

#[derive(Debug, Clone)]
struct PoolEntry {
    snapshot: PoolSnapshot,
    sell_streak: u32,
}

/// Cache statistics for monitoring
#[derive(Default)]
pub struct PoolCacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub stale: AtomicU64,
    pub evictions: AtomicU64,
}

impl PoolCacheStats {
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let total = hits + self.misses.load(Ordering::Relaxed) + self.stale.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

pub struct PoolHistoryCache {
    config: PoolCacheConfig,
    pools: DashMap<String, PoolEntry>,
    clock: Arc<dyn Clock>,
    stats: Arc<PoolCacheStats>,
}

impl PoolHistoryCache {
    pub fn new() -> Self {
        Self::with_config(PoolCacheConfig::default(), Arc::new(SystemClock))
    }

    pub fn with_config(config: PoolCacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            pools: DashMap::with_capacity(config.max_pools.min(1_024)),
            config,
            clock,
            stats: Arc::new(PoolCacheStats::default()),
        }
    }

    /// Record a new observation and return its delta against the previous one
    pub fn observe(&self, pool: &str, snapshot: PoolSnapshot) -> PoolDelta {
        let cutoff = window_start(self.clock.now(), self.config.staleness);

        let delta = match self.pools.entry(pool.to_string()) {
            Entry::Occupied(mut occupied) => {
                let prev = occupied.get();
                let fresh = prev.snapshot.observed_at >= cutoff;
                let counter = if fresh { &self.stats.hits } else { &self.stats.stale };
                counter.fetch_add(1, Ordering::Relaxed);

                let delta = Self::compute_delta(fresh.then_some(prev), &snapshot);
                occupied.insert(PoolEntry {
                    snapshot,
                    sell_streak: delta.sell_streak_count,
                });
                delta
            }
            Entry::Vacant(vacant) => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                let delta = Self::compute_delta(None, &snapshot);
                vacant.insert(PoolEntry {
                    snapshot,
                    sell_streak: delta.sell_streak_count,
                });
                delta
            }
        };

        if self.pools.len() > self.config.max_pools {
            self.evict_stalest(pool);
        }

        debug!(
            pool,
            has_previous = delta.has_previous,
            liquidity_drop_pct = ?delta.liquidity_drop_pct,
            sell_streak = delta.sell_streak_count,
            "Pool observed"
        );

        delta
    }

    fn compute_delta(prev: Option<&PoolEntry>, cur: &PoolSnapshot) -> PoolDelta {
        let Some(prev) = prev else {
            return PoolDelta {
                sell_streak_count: u32::from(cur.sell_dominant()),
                ..Default::default()
            };
        };
        let p = &prev.snapshot;

        let liquidity_accel_pct = pct_change(p.liquidity_usd, cur.liquidity_usd);
        let liquidity_drop_pct = liquidity_accel_pct.map(|pct| (-pct).max(0.0));

        // Prefer the short window; fall back to 24h when 5m is missing
        let volume_accel_pct = if p.volume_5m > 0.0 && cur.volume_5m > 0.0 {
            pct_change(p.volume_5m, cur.volume_5m)
        } else {
            pct_change(p.volume_24h_usd, cur.volume_24h_usd)
        };

        let sell_streak_count = if cur.sell_dominant() {
            prev.sell_streak.saturating_add(1)
        } else {
            0
        };

        PoolDelta {
            has_previous: true,
            liquidity_drop_pct,
            liquidity_accel_pct,
            volume_accel_pct,
            buy_ratio_prev: p.buy_ratio(),
            tx_5m_prev: Some(p.tx_5m() as f64),
            volume_5m_baseline: (p.volume_5m > 0.0).then_some(p.volume_5m),
            sell_streak_count,
        }
    }

    /// Previous fresh snapshot for a pool, if any
    pub fn get(&self, pool: &str) -> Option<PoolSnapshot> {
        let cutoff = window_start(self.clock.now(), self.config.staleness);
        self.pools
            .get(pool)
            .filter(|e| e.snapshot.observed_at >= cutoff)
            .map(|e| e.snapshot.clone())
    }

    /// Drop every observation older than the staleness window
    pub fn purge_stale(&self) -> usize {
        let cutoff = window_start(self.clock.now(), self.config.staleness);
        let before = self.pools.len();
        self.pools.retain(|_, e| e.snapshot.observed_at >= cutoff);
        before.saturating_sub(self.pools.len())
    }

    /// Evict the oldest observation other than `keep`
    fn evict_stalest(&self, keep: &str) {
        let stalest = self
            .pools
            .iter()
            .filter(|e| e.key() != keep)
            .min_by_key(|e| e.snapshot.observed_at)
            .map(|e| e.key().clone());
        if let Some(key) = stalest {
            self.pools.remove(&key);
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn stats(&self) -> Arc<PoolCacheStats> {
        self.stats.clone()
    }
}

impl Default for PoolHistoryCache {
    fn default() -> Self {
        Self::new()
    }
}
