//! Stateful evaluator
//!
//! Owns the stores the pure engine cannot: wallet convergence, pool history
//! and per-token social velocity. Every call enriches the caller's overlay
//! with whatever those stores know, leaving caller-supplied fields alone,
//! then hands it to the engine.

use chrono::Duration;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::engine::DecisionEngine;
use super::tiers::{Tier, TierTable};
use super::types::Decision;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::dexscreener::{DexPair, DexTarget, PairSource};
use crate::error::Result;
use crate::filter::cache::{pool_key, PoolCacheConfig, PoolHistoryCache, PoolSnapshot};
use crate::filter::smart_money::{
    alpha_reasons, alpha_score, canonical_token_key, AlphaInputs, ConvergenceReading,
    ConvergenceTracker, WalletTier,
};
use crate::filter::velocity::{VelocityStore, VelocityStoreConfig};
use crate::overlay::MarketOverlay;

/// Decision for a fetched pair, with the data it was made from
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairDecision {
    pub chain: String,
    pub pair_address: String,
    pub token: String,
    pub symbol: String,
    pub url: Option<String>,
    /// Set when the alpha score was computed here rather than supplied
    pub alpha_score: Option<u8>,
    pub alpha_reasons: Vec<String>,
    pub overlay: MarketOverlay,
    pub decision: Decision,
}

pub struct Evaluator {
    engine: DecisionEngine,
    convergence: Arc<ConvergenceTracker>,
    pools: Arc<PoolHistoryCache>,
    velocity: VelocityStore,
    clock: Arc<dyn Clock>,
}

impl Evaluator {
    pub fn new(
        tiers: TierTable,
        convergence_window: Duration,
        pool_config: PoolCacheConfig,
        velocity_config: VelocityStoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine: DecisionEngine::new(tiers),
            convergence: Arc::new(ConvergenceTracker::with_clock(
                convergence_window,
                clock.clone(),
            )),
            pools: Arc::new(PoolHistoryCache::with_config(pool_config, clock.clone())),
            velocity: VelocityStore::with_config(velocity_config, clock.clone()),
            clock,
        }
    }

    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Self {
        info!(
            convergence_window_secs = config.convergence.window_secs,
            max_pools = config.pool_history.max_pools,
            velocity_staleness_secs = config.velocity.staleness_secs,
            "Evaluator initialized"
        );
        Self::new(
            config.tiers.clone(),
            config.convergence.window(),
            config.pool_history.cache_config(),
            config.velocity.store_config(),
            clock,
        )
    }

    pub fn convergence(&self) -> &Arc<ConvergenceTracker> {
        &self.convergence
    }

    pub fn pools(&self) -> &Arc<PoolHistoryCache> {
        &self.pools
    }

    pub fn velocity(&self) -> &VelocityStore {
        &self.velocity
    }

    /// Drop expired entries from every store; returns how many went
    pub fn purge_stale(&self) -> usize {
        let pools = self.pools.purge_stale();
        let tokens = self.convergence.purge_expired();
        let velocity = self.velocity.purge_stale();
        let total = pools + tokens + velocity;
        if total > 0 {
            debug!(pools, tokens, velocity, "Evaluator stores purged");
        }
        total
    }

    /// Record a ranked wallet acting on `token`
    pub fn note_hit(&self, token: &str, wallet: &str, tier: WalletTier) -> bool {
        self.convergence.note(token, wallet, tier)
    }

    /// Record a social-velocity sample for `token`
    pub fn note_velocity(&self, token: &str, velocity: f64) {
        let Some(key) = canonical_token_key(token) else {
            return;
        };
        self.velocity.push(&key, velocity);
    }

    /// Stateless evaluation with the configured thresholds
    pub fn evaluate(&self, overlay: &MarketOverlay, tier: Tier) -> Decision {
        self.engine.decide(overlay, tier)
    }

    /// Evaluate one poll of `pool`, enriched from the stores
    pub fn evaluate_pool(
        &self,
        pool: &str,
        token: Option<&str>,
        overlay: &MarketOverlay,
        tier: Tier,
    ) -> Decision {
        let mut overlay = overlay.clone();
        self.enrich(pool, token, &mut overlay);
        self.engine.decide(&overlay, tier)
    }

    /// Fetch a pair by chain and id, then evaluate it
    pub async fn evaluate_remote(
        &self,
        source: &dyn PairSource,
        chain: &str,
        id: &str,
        tier: Tier,
    ) -> Result<PairDecision> {
        let pair = source.fetch_pair(chain, id).await?;
        Ok(self.evaluate_pair(&pair, tier))
    }

    /// Resolve a parsed Dexscreener URL, then evaluate it
    pub async fn evaluate_target(
        &self,
        source: &dyn PairSource,
        target: &DexTarget,
        tier: Tier,
    ) -> Result<PairDecision> {
        let pair = source.resolve(target).await?;
        Ok(self.evaluate_pair(&pair, tier))
    }

    pub fn evaluate_pair(&self, pair: &DexPair, tier: Tier) -> PairDecision {
        let pool = pool_key(&pair.chain_id, &pair.pair_address);
        let token = pair.base_token.address.as_str();

        let mut overlay = MarketOverlay::from_pair(pair, self.clock.now());
        self.enrich(&pool, Some(token), &mut overlay);

        let (alpha, reasons) = match overlay.score {
            Some(_) => (None, Vec::new()),
            None => {
                let inputs = AlphaInputs::from_overlay(&overlay, self.lead_tier(token));
                let score = alpha_score(&inputs);
                overlay.score = Some(score as f64);
                (Some(score), alpha_reasons(&inputs))
            }
        };

        let decision = self.engine.decide(&overlay, tier);
        debug!(
            pool = %pool,
            symbol = pair.symbol(),
            action = %decision.action,
            confidence = decision.confidence,
            "Pair evaluated"
        );

        PairDecision {
            chain: pair.chain_id.clone(),
            pair_address: pair.pair_address.clone(),
            token: token.to_string(),
            symbol: pair.symbol().to_string(),
            url: pair.url.clone(),
            alpha_score: alpha,
            alpha_reasons: reasons,
            overlay,
            decision,
        }
    }

    fn enrich(&self, pool: &str, token: Option<&str>, overlay: &mut MarketOverlay) {
        let delta = self
            .pools
            .observe(pool, PoolSnapshot::from_overlay(overlay, self.clock.now()));
        delta.apply_to(overlay);

        let Some(token) = token else {
            return;
        };

        if overlay.convergence.is_none() {
            let state = self.convergence.get(token);
            if state.total > 0 {
                overlay.convergence = Some(ConvergenceReading::from(&state));
            }
        }

        if let Some((current, rising)) =
            canonical_token_key(token).and_then(|k| self.velocity.reading(&k))
        {
            overlay.social_velocity = overlay.social_velocity.or(Some(current));
            overlay.rising = overlay.rising.or(Some(rising));
        }
    }

    /// Best wallet tier currently converging on `token`
    fn lead_tier(&self, token: &str) -> Option<WalletTier> {
        let state = self.convergence.get(token);
        if state.s_count > 0 {
            Some(WalletTier::S)
        } else if state.a_count > 0 {
            Some(WalletTier::A)
        } else {
            None
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::from_config(&Config::default(), Arc::new(SystemClock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::dexscreener::{BaseToken, Liquidity, PriceChange, TxnCount, Txns, Volume};
    use crate::error::Error;
    use crate::strategy::types::Action;
    use async_trait::async_trait;

    const MINT: &str = "7GCihgDB8fe6KNjn2MYtkzZcRjQy3t9GHdC8uHYmW2hr";

    fn evaluator() -> (Evaluator, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_millis(1_700_000_000_000));
        let eval = Evaluator::from_config(&Config::default(), clock.clone());
        (eval, clock)
    }

    fn healthy(liq: f64) -> MarketOverlay {
        MarketOverlay {
            liquidity_usd: Some(liq),
            volume_24h_usd: Some(200_000.0),
            fdv: Some(1_000_000.0),
            price_change_5m: Some(1.0),
            price_change_1h: Some(5.0),
            price_change_24h: Some(10.0),
            buys_5m: Some(20),
            sells_5m: Some(10),
            ..Default::default()
        }
    }

    struct StaticSource {
        pair: DexPair,
    }

    #[async_trait]
    impl PairSource for StaticSource {
        async fn fetch_pair(&self, _chain: &str, _id: &str) -> Result<DexPair> {
            Ok(self.pair.clone())
        }

        async fn search_token(&self, _address: &str) -> Result<DexPair> {
            Ok(self.pair.clone())
        }
    }

    struct EmptySource;

    #[async_trait]
    impl PairSource for EmptySource {
        async fn fetch_pair(&self, chain: &str, id: &str) -> Result<DexPair> {
            Err(Error::PairNotFound {
                chain: chain.to_string(),
                id: id.to_string(),
            })
        }

        async fn search_token(&self, address: &str) -> Result<DexPair> {
            Err(Error::PairNotFound {
                chain: "*".to_string(),
                id: address.to_string(),
            })
        }
    }

    fn dex_pair() -> DexPair {
        DexPair {
            chain_id: "solana".into(),
            dex_id: "raydium".into(),
            pair_address: "PAIR1".into(),
            base_token: BaseToken {
                address: MINT.into(),
                name: None,
                symbol: Some("DOG".into()),
            },
            price_change: Some(PriceChange {
                m5: Some(1.0),
                h1: Some(5.0),
                h6: None,
                h24: Some(10.0),
            }),
            txns: Some(Txns {
                m5: Some(TxnCount { buys: 20, sells: 10 }),
                ..Default::default()
            }),
            volume: Some(Volume {
                m5: Some(4_000.0),
                h24: Some(200_000.0),
                ..Default::default()
            }),
            liquidity: Some(Liquidity {
                usd: Some(100_000.0),
                ..Default::default()
            }),
            fdv: Some(1_000_000.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_liquidity_drain_between_polls_warns() {
        let (eval, clock) = evaluator();

        let first = eval.evaluate_pool("solana:PAIR1", None, &healthy(100_000.0), Tier::Pro);
        assert_ne!(first.action, Action::RugWarning);

        clock.advance_millis(30_000);
        let second = eval.evaluate_pool("solana:PAIR1", None, &healthy(50_000.0), Tier::Pro);
        assert_eq!(second.action, Action::RugWarning);
        assert_eq!(second.confidence, 98);
        assert!(second.reasons.iter().any(|r| r == "Liquidity drop (50%)"));
    }

    #[test]
    fn test_stale_history_is_ignored() {
        let (eval, clock) = evaluator();

        eval.evaluate_pool("solana:PAIR1", None, &healthy(100_000.0), Tier::Pro);
        clock.advance(Duration::minutes(30));
        let later = eval.evaluate_pool("solana:PAIR1", None, &healthy(50_000.0), Tier::Pro);
        assert_ne!(later.action, Action::RugWarning);
    }

    #[test]
    fn test_caller_liquidity_drop_wins() {
        let (eval, clock) = evaluator();

        eval.evaluate_pool("solana:PAIR1", None, &healthy(100_000.0), Tier::Pro);
        clock.advance_millis(30_000);
        let mut overlay = healthy(50_000.0);
        overlay.liquidity_drop_pct = Some(0.0);
        let decision = eval.evaluate_pool("solana:PAIR1", None, &overlay, Tier::Pro);
        assert_ne!(decision.action, Action::RugWarning);
    }

    #[test]
    fn test_convergence_filled_from_tracker() {
        let (eval, _clock) = evaluator();
        assert!(eval.note_hit(MINT, "w1", WalletTier::S));
        assert!(eval.note_hit(MINT, "w2", WalletTier::S));
        assert!(eval.note_hit(MINT, "w3", WalletTier::A));

        let decision = eval.evaluate_pool("solana:PAIR1", Some(MINT), &healthy(100_000.0), Tier::Pro);
        assert_eq!(decision.signals.convergence.s_count, 2);
        assert_eq!(decision.signals.convergence.a_count, 1);
        assert!(decision.signals.convergence.status.is_confirmed());
    }

    #[test]
    fn test_convergence_expires() {
        let (eval, clock) = evaluator();
        eval.note_hit(MINT, "w1", WalletTier::S);
        clock.advance(Duration::minutes(13));

        let decision = eval.evaluate_pool("solana:PAIR1", Some(MINT), &healthy(100_000.0), Tier::Pro);
        assert_eq!(decision.signals.convergence, ConvergenceReading::default());
    }

    #[test]
    fn test_velocity_fills_rising() {
        let (eval, _clock) = evaluator();
        for v in [10.0, 20.0, 30.0] {
            eval.note_velocity(MINT, v);
        }

        let decision = eval.evaluate_pool("solana:PAIR1", Some(MINT), &healthy(100_000.0), Tier::Pro);
        assert!(decision.signals.rising);

        let mut overlay = healthy(100_000.0);
        overlay.rising = Some(false);
        let decision = eval.evaluate_pool("solana:PAIR1", Some(MINT), &overlay, Tier::Pro);
        assert!(!decision.signals.rising);
    }

    #[test]
    fn test_purge_stale_empties_every_store() {
        let (eval, clock) = evaluator();
        eval.note_hit(MINT, "w1", WalletTier::S);
        eval.note_velocity(MINT, 40.0);
        eval.evaluate_pool("solana:PAIR1", Some(MINT), &healthy(100_000.0), Tier::Pro);
        assert_eq!(eval.purge_stale(), 0);

        clock.advance(Duration::hours(1));
        assert_eq!(eval.purge_stale(), 3);
        assert!(eval.pools().is_empty());
        assert_eq!(eval.convergence().tracked_tokens(), 0);
        assert!(eval.velocity().is_empty());
    }

    #[test]
    fn test_velocity_store_is_bounded() {
        let clock = Arc::new(ManualClock::at_millis(1_700_000_000_000));
        let mut config = Config::default();
        config.velocity.max_tokens = 3;
        let eval = Evaluator::from_config(&config, clock.clone());

        for i in 0..10 {
            eval.note_velocity(&format!("token{}", i), 30.0);
            clock.advance_millis(1_000);
        }
        assert_eq!(eval.velocity().len(), 3);
    }

    #[tokio::test]
    async fn test_evaluate_remote_computes_alpha() {
        let (eval, _clock) = evaluator();
        eval.note_hit(MINT, "whale", WalletTier::S);
        let source = StaticSource { pair: dex_pair() };

        let result = eval
            .evaluate_remote(&source, "solana", "PAIR1", Tier::Pro)
            .await
            .unwrap();

        let alpha = result.alpha_score.unwrap();
        assert_eq!(result.decision.signals.score, alpha as f64);
        assert_eq!(result.overlay.score, Some(alpha as f64));
        assert!(result
            .alpha_reasons
            .iter()
            .any(|r| r == "Tier S wallet signal"));
        assert_eq!(result.symbol, "DOG");
        assert_eq!(result.token, MINT);
        assert_eq!(eval.pools().len(), 1);
    }

    #[test]
    fn test_evaluate_target_token_url() {
        let (eval, _clock) = evaluator();
        let source = StaticSource { pair: dex_pair() };
        let target = DexTarget::Token {
            address: MINT.into(),
        };

        let result =
            tokio_test::block_on(eval.evaluate_target(&source, &target, Tier::Basic)).unwrap();
        assert_eq!(result.chain, "solana");
        assert_eq!(result.pair_address, "PAIR1");
        assert_eq!(result.decision.tier, Tier::Basic);
        assert!(result.alpha_score.is_some());
    }

    #[tokio::test]
    async fn test_evaluate_remote_propagates_not_found() {
        let (eval, _clock) = evaluator();
        let err = eval
            .evaluate_remote(&EmptySource, "solana", "nope", Tier::Pro)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PairNotFound { .. }));
        assert!(eval.pools().is_empty());
    }
}
