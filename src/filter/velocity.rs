//! Social velocity tracking
//!
//! Bounded window of 0-100 velocity samples per token; `is_rising` looks for
//! a non-decreasing run over the last three samples with enough lift.
//! `VelocityStore` keeps one tracker per token, forgetting tokens that go
//! quiet and capping how many it holds.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

use crate::clock::{window_start, Clock, SystemClock};

pub const DEFAULT_WINDOW: usize = 10;
pub const DEFAULT_MIN_DELTA: f64 = 6.0;
pub const DEFAULT_MIN_NOW: f64 = 20.0;

#[derive(Debug, Clone)]
pub struct VelocityTracker {
    samples: VecDeque<f64>,
    window: usize,
}

impl VelocityTracker {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    pub fn with_window(window: usize) -> Self {
        let window = window.max(1);
        Self {
            samples: VecDeque::with_capacity(window),
            window,
        }
    }

    /// Record a sample, clamped to [0, 100]. Non-finite values count as 0.
    pub fn push(&mut self, v: f64) {
        let v = if v.is_finite() { v.clamp(0.0, 100.0) } else { 0.0 };
        self.samples.push_back(v);
        while self.samples.len() > self.window {
            self.samples.pop_front();
        }
    }

    /// Latest sample, 0 when empty
    pub fn current(&self) -> f64 {
        self.samples.back().copied().unwrap_or(0.0)
    }

    pub fn is_rising(&self, min_delta: f64, min_now: f64) -> bool {
        let n = self.samples.len();
        if n < 3 {
            return false;
        }
        let (a, b, c) = (self.samples[n - 3], self.samples[n - 2], self.samples[n - 1]);
        c >= min_now && b >= a && c >= b && c - a >= min_delta
    }

    /// `is_rising` with the default lift (6) and floor (20)
    pub fn rising(&self) -> bool {
        self.is_rising(DEFAULT_MIN_DELTA, DEFAULT_MIN_NOW)
    }

    /// Last sample minus first sample in the window
    pub fn slope(&self) -> f64 {
        match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) if self.samples.len() >= 2 => last - first,
            _ => 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for VelocityTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct VelocityStoreConfig {
    /// Tokens without a sample for this long are dropped
    pub staleness: Duration,
    /// Maximum tracked tokens before the quietest is evicted
    pub max_tokens: usize,
}

impl Default for VelocityStoreConfig {
    fn default() -> Self {
        Self {
            staleness: Duration::minutes(30),
            max_tokens: 5_000,
        }
    }
}

struct VelocityEntry {
    tracker: VelocityTracker,
    updated_at: DateTime<Utc>,
}

/// Per-token velocity trackers keyed by canonical token key
pub struct VelocityStore {
    config: VelocityStoreConfig,
    tokens: DashMap<String, VelocityEntry>,
    clock: Arc<dyn Clock>,
}

impl VelocityStore {
    pub fn new() -> Self {
        Self::with_config(VelocityStoreConfig::default(), Arc::new(SystemClock))
    }

    pub fn with_config(config: VelocityStoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            tokens: DashMap::with_capacity(config.max_tokens.min(1_024)),
            config,
            clock,
        }
    }

    /// Record a sample for `token`. A stale tracker starts over.
    pub fn push(&self, token: &str, v: f64) {
        let now = self.clock.now();
        let cutoff = window_start(now, self.config.staleness);
        {
            let mut entry = self
                .tokens
                .entry(token.to_string())
                .or_insert_with(|| VelocityEntry {
                    tracker: VelocityTracker::new(),
                    updated_at: now,
                });
            if entry.updated_at < cutoff {
                entry.tracker = VelocityTracker::new();
            }
            entry.tracker.push(v);
            entry.updated_at = now;
        }

        if self.tokens.len() > self.config.max_tokens {
            self.evict_quietest(token);
        }
    }

    /// Latest sample and rising flag for a token with fresh samples
    pub fn reading(&self, token: &str) -> Option<(f64, bool)> {
        let cutoff = window_start(self.clock.now(), self.config.staleness);
        self.tokens
            .get(token)
            .filter(|e| e.updated_at >= cutoff && !e.tracker.is_empty())
            .map(|e| (e.tracker.current(), e.tracker.rising()))
    }

    /// Drop every token without a sample inside the staleness window
    pub fn purge_stale(&self) -> usize {
        let cutoff = window_start(self.clock.now(), self.config.staleness);
        let before = self.tokens.len();
        self.tokens.retain(|_, e| e.updated_at >= cutoff);
        let evicted = before.saturating_sub(self.tokens.len());
        if evicted > 0 {
            debug!(evicted, remaining = self.tokens.len(), "Velocity trackers purged");
        }
        evicted
    }

    fn evict_quietest(&self, keep: &str) {
        let quietest = self
            .tokens
            .iter()
            .filter(|e| e.key() != keep)
            .min_by_key(|e| e.updated_at)
            .map(|e| e.key().clone());
        if let Some(key) = quietest {
            self.tokens.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Default for VelocityStore {
    fn default() -> Self {
        Self::new()
    }
}
