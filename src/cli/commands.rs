//! CLI command implementations

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info, warn};

use crate::clock::SystemClock;
use crate::config::Config;
use crate::dexscreener::{parse_dex_url, sanitize_for_log, DexScreenerClient};
use crate::overlay::MarketOverlay;
use crate::strategy::{DecisionEngine, Evaluator, Tier};

/// One-shot decision for a Dexscreener URL
pub async fn decide(config: &Config, url: &str, tier: &str) -> Result<()> {
    let tier = Tier::from_name(tier);
    let target = parse_dex_url(url)?;
    let client = DexScreenerClient::new(&config.dexscreener)?;
    let evaluator = Evaluator::from_config(config, Arc::new(SystemClock));

    info!("Fetching {} ...", sanitize_for_log(url));
    let result = evaluator
        .evaluate_target(&client, &target, tier)
        .await
        .with_context(|| format!("Failed to evaluate {}", sanitize_for_log(url)))?;

    info!(
        "{} ({}): {}",
        result.symbol, result.pair_address, result.decision
    );
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Evaluate a JSON overlay from a file, or stdin when `file` is "-"
pub async fn eval(config: &Config, file: &str, tier: &str) -> Result<()> {
    let tier = Tier::from_name(tier);
    let overlay = read_overlay(file).await?;
    let engine = DecisionEngine::new(config.tiers.clone());

    let decision = engine.decide(&overlay, tier);
    debug!("Decision: {}", decision);
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

/// Poll a pair and log a decision per poll until `count` polls or Ctrl-C
pub async fn watch(
    config: &Config,
    url: &str,
    tier: &str,
    interval_secs: Option<u64>,
    count: Option<u64>,
) -> Result<()> {
    let tier = Tier::from_name(tier);
    let target = parse_dex_url(url)?;
    let client = DexScreenerClient::new(&config.dexscreener)?;
    let evaluator = Evaluator::from_config(config, Arc::new(SystemClock));

    let every = interval_secs.unwrap_or(config.watch.interval_secs).max(1);
    let mut ticker = tokio::time::interval(Duration::from_secs(every));
    let mut polls: u64 = 0;

    info!(
        "Watching {} every {}s (tier {})",
        sanitize_for_log(url),
        every,
        tier
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                evaluator.purge_stale();
                match evaluator.evaluate_target(&client, &target, tier).await {
                    Ok(result) => {
                        let d = &result.decision;
                        info!(
                            "{} [{}] {} ({}%) score={:.0} rug={} | {}",
                            result.symbol,
                            result.pair_address,
                            d.action,
                            d.confidence,
                            d.signals.score,
                            d.signals.rug.risk,
                            d.reasons.join("; ")
                        );
                        if d.is_rug_warning() {
                            warn!("RUG WARNING on {}: {}", result.symbol, d.reasons.join("; "));
                        }
                        println!("{}", serde_json::to_string(&result)?);
                    }
                    // Bad URL or address will not fix itself
                    Err(e) if e.is_input_error() => return Err(e.into()),
                    Err(e) => error!("Poll failed: {}", e),
                }

                polls += 1;
                if count.is_some_and(|max| polls >= max) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    let stats = evaluator.pools().stats();
    info!(
        "Watch finished after {} polls (history hit rate {:.0}%)",
        polls,
        stats.hit_rate() * 100.0
    );
    Ok(())
}

/// Show current configuration
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

async fn read_overlay(file: &str) -> Result<MarketOverlay> {
    let raw = if file == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("Failed to read overlay from stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(Path::new(file))
            .await
            .with_context(|| format!("Failed to read overlay file {}", file))?
    };

    serde_json::from_str(&raw).context("Overlay is not valid JSON")
}
