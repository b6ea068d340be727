//! Convergence Tracking
//!
//! Keeps a timestamped log of ranked-wallet hits per token and reduces it to
//! a status (NONE/WEAK/MED/STRONG) and a 0-100 strength.
//!
//! Tokens are keyed by contract address, never by symbol: symbols collide
//! across chains and launchpads. EVM addresses are lowercased; base58
//! addresses are case-sensitive and kept as given.
//!
//! Each token's append-and-prune runs under that key's DashMap shard lock,
//! so concurrent `note`/`get` calls cannot lose updates.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use super::WalletTier;
use crate::clock::{window_start, Clock, SystemClock};

/// Default sliding window (12 minutes)
pub const DEFAULT_WINDOW_MS: i64 = 12 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConvergenceStatus {
    #[default]
    None,
    Weak,
    Med,
    Strong,
}

impl ConvergenceStatus {
    /// MED or STRONG
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ConvergenceStatus::Med | ConvergenceStatus::Strong)
    }
}

impl std::fmt::Display for ConvergenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConvergenceStatus::None => write!(f, "NONE"),
            ConvergenceStatus::Weak => write!(f, "WEAK"),
            ConvergenceStatus::Med => write!(f, "MED"),
            ConvergenceStatus::Strong => write!(f, "STRONG"),
        }
    }
}

/// Convergence as consumed by the decision engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConvergenceReading {
    pub status: ConvergenceStatus,
    pub strength: u8,
    pub s_count: u32,
    pub a_count: u32,
}

/// Full convergence state for one token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvergenceState {
    pub token: String,
    pub status: ConvergenceStatus,
    pub strength: u8,
    pub s_count: u32,
    pub a_count: u32,
    /// Distinct wallets of any tier
    pub total: u32,
}

impl ConvergenceState {
    fn empty(token: String) -> Self {
        Self {
            token,
            status: ConvergenceStatus::None,
            strength: 0,
            s_count: 0,
            a_count: 0,
            total: 0,
        }
    }

    fn from_hits(token: String, hits: &[Hit]) -> Self {
        let mut uniq_s = HashSet::new();
        let mut uniq_a = HashSet::new();
        let mut uniq_all = HashSet::new();

        for hit in hits {
            match hit.tier {
                WalletTier::S => {
                    uniq_s.insert(hit.wallet.as_str());
                }
                WalletTier::A => {
                    uniq_a.insert(hit.wallet.as_str());
                }
                WalletTier::B | WalletTier::C => {}
            }
            uniq_all.insert(hit.wallet.as_str());
        }

        let s_count = uniq_s.len() as u32;
        let a_count = uniq_a.len() as u32;
        let total = uniq_all.len() as u32;

        Self {
            token,
            status: classify(s_count, a_count, total),
            strength: strength(s_count, a_count),
            s_count,
            a_count,
            total,
        }
    }
}

impl From<&ConvergenceState> for ConvergenceReading {
    fn from(state: &ConvergenceState) -> Self {
        Self {
            status: state.status,
            strength: state.strength,
            s_count: state.s_count,
            a_count: state.a_count,
        }
    }
}

/// Status from distinct wallet counts
pub fn classify(s_count: u32, a_count: u32, total: u32) -> ConvergenceStatus {
    if s_count >= 2 || (s_count >= 1 && a_count >= 2) {
        ConvergenceStatus::Strong
    } else if s_count >= 1 || a_count >= 2 {
        ConvergenceStatus::Med
    } else if total >= 1 {
        ConvergenceStatus::Weak
    } else {
        ConvergenceStatus::None
    }
}

/// 45 per S wallet, 18 per A wallet, capped at 100
pub fn strength(s_count: u32, a_count: u32) -> u8 {
    let raw = 45u64 * s_count as u64 + 18u64 * a_count as u64;
    raw.min(100) as u8
}

/// Canonical token key, `None` for blank input
pub fn canonical_token_key(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let evm = trimmed.len() > 2
        && trimmed
            .get(..2)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("0x"));
    if evm {
        Some(trimmed.to_ascii_lowercase())
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Debug, Clone)]
struct Hit {
    wallet: String,
    tier: WalletTier,
    at: DateTime<Utc>,
}

/// Shared store of wallet hits per token
pub struct ConvergenceTracker {
    hits: DashMap<String, Vec<Hit>>,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl ConvergenceTracker {
    /// Tracker with the default 12 minute window and the system clock
    pub fn new() -> Self {
        Self::with_clock(Duration::milliseconds(DEFAULT_WINDOW_MS), Arc::new(SystemClock))
    }

    pub fn with_clock(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            hits: DashMap::new(),
            window,
            clock,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record that `wallet` (of `tier`) acted on `token`.
    /// Returns false when the token or wallet is blank.
    pub fn note(&self, token: &str, wallet: &str, tier: WalletTier) -> bool {
        let (Some(key), wallet) = (canonical_token_key(token), wallet.trim()) else {
            return false;
        };
        if wallet.is_empty() {
            return false;
        }

        let now = self.clock.now();
        let cutoff = window_start(now, self.window);

        let mut entry = self.hits.entry(key).or_default();
        entry.push(Hit {
            wallet: wallet.to_string(),
            tier,
            at: now,
        });
        entry.retain(|h| h.at >= cutoff);

        debug!(
            token = %entry.key(),
            wallet,
            tier = %tier,
            hits = entry.len(),
            "Convergence hit noted"
        );
        true
    }

    /// Current state for `token`, pruning expired hits first
    pub fn get(&self, token: &str) -> ConvergenceState {
        let Some(key) = canonical_token_key(token) else {
            return ConvergenceState::empty(String::new());
        };
        let cutoff = window_start(self.clock.now(), self.window);

        let (state, emptied) = match self.hits.get_mut(&key) {
            Some(mut hits) => {
                hits.retain(|h| h.at >= cutoff);
                (
                    ConvergenceState::from_hits(key.clone(), &hits),
                    hits.is_empty(),
                )
            }
            None => (ConvergenceState::empty(key.clone()), false),
        };

        if emptied {
            // Re-checked under the lock: a concurrent note may have refilled it
            self.hits.remove_if(&key, |_, hits| hits.is_empty());
        }

        state
    }

    /// Strongest tokens, by strength then distinct wallet count
    pub fn list_top(&self, limit: usize) -> Vec<ConvergenceState> {
        let keys: Vec<String> = self.hits.iter().map(|e| e.key().clone()).collect();

        let mut out: Vec<ConvergenceState> = keys
            .iter()
            .map(|k| self.get(k))
            .filter(|s| s.total > 0)
            .collect();

        out.sort_by(|a, b| b.strength.cmp(&a.strength).then(b.total.cmp(&a.total)));
        out.truncate(limit);
        out
    }

    /// Number of tokens with live hits (may include not-yet-pruned entries)
    pub fn tracked_tokens(&self) -> usize {
        self.hits.len()
    }

    /// Drop expired hits on every token, evicting tokens left empty.
    /// Returns the number of tokens evicted.
    pub fn purge_expired(&self) -> usize {
        let cutoff = window_start(self.clock.now(), self.window);
        let before = self.hits.len();
        self.hits.retain(|_, hits| {
            hits.retain(|h| h.at >= cutoff);
            !hits.is_empty()
        });
        let evicted = before.saturating_sub(self.hits.len());
        if evicted > 0 {
            debug!(evicted, "Expired convergence tokens purged");
        }
        evicted
    }
}

impl Default for ConvergenceTracker {
    fn default() -> Self {
        Self::new()
    }
}
