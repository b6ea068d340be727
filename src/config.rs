//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::filter::cache::PoolCacheConfig;
use crate::filter::velocity::VelocityStoreConfig;
use crate::strategy::tiers::{Tier, TierTable, TierThresholds};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Decision thresholds per subscription tier
    #[serde(default)]
    pub tiers: TierTable,
    #[serde(default)]
    pub convergence: ConvergenceConfig,
    #[serde(default)]
    pub pool_history: PoolHistoryConfig,
    #[serde(default)]
    pub velocity: VelocityConfig,
    #[serde(default)]
    pub dexscreener: DexScreenerConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConvergenceConfig {
    /// Sliding window for wallet hits
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolHistoryConfig {
    /// Previous polls older than this are ignored
    #[serde(default = "default_window_secs")]
    pub staleness_secs: u64,
    #[serde(default = "default_max_pools")]
    pub max_pools: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VelocityConfig {
    /// Tokens without a reading for this long are forgotten
    #[serde(default = "default_velocity_staleness_secs")]
    pub staleness_secs: u64,
    #[serde(default = "default_max_pools")]
    pub max_tokens: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DexScreenerConfig {
    #[serde(default = "default_dexscreener_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchConfig {
    /// Poll interval for `watch`
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

// Default value functions
fn default_window_secs() -> u64 {
    720 // 12 minutes
}
fn default_velocity_staleness_secs() -> u64 {
    1_800
}
fn default_max_pools() -> usize {
    5_000
}
fn default_dexscreener_url() -> String {
    "https://api.dexscreener.com".to_string()
}
fn default_timeout_ms() -> u64 {
    10_000
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    250
}
fn default_interval_secs() -> u64 {
    30
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
        }
    }
}

impl Default for PoolHistoryConfig {
    fn default() -> Self {
        Self {
            staleness_secs: default_window_secs(),
            max_pools: default_max_pools(),
        }
    }
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            staleness_secs: default_velocity_staleness_secs(),
            max_tokens: default_max_pools(),
        }
    }
}

impl Default for DexScreenerConfig {
    fn default() -> Self {
        Self {
            base_url: default_dexscreener_url(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

impl PoolHistoryConfig {
    pub fn cache_config(&self) -> PoolCacheConfig {
        PoolCacheConfig {
            staleness: secs(self.staleness_secs),
            max_pools: self.max_pools,
        }
    }
}

impl ConvergenceConfig {
    pub fn window(&self) -> chrono::Duration {
        secs(self.window_secs)
    }
}

impl VelocityConfig {
    pub fn store_config(&self) -> VelocityStoreConfig {
        VelocityStoreConfig {
            staleness: secs(self.staleness_secs),
            max_tokens: self.max_tokens,
        }
    }
}

/// Upper bound for every window, staleness and retry delay setting
pub const MAX_WINDOW_SECS: u64 = 7 * 86_400;
pub const MAX_RETRIES: u32 = 10;

/// Clamped to `MAX_WINDOW_SECS` so the conversion never overflows
fn secs(value: u64) -> chrono::Duration {
    chrono::Duration::seconds(value.min(MAX_WINDOW_SECS) as i64)
}

/// Seed every tier field so a file or env var may override a single one
fn tier_defaults(
    mut builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
    for tier in Tier::ALL {
        let t = TierThresholds::for_tier(tier);
        let key = |field: &str| format!("tiers.{}.{}", tier.key(), field);
        builder = builder
            .set_default(key("score_enter"), t.score_enter)?
            .set_default(key("score_ready"), t.score_ready)?
            .set_default(key("score_arm"), t.score_arm)?
            .set_default(key("rug_max_enter"), t.rug_max_enter)?
            .set_default(key("rug_max_ready"), t.rug_max_ready)?
            .set_default(key("rug_max_arm"), t.rug_max_arm)?
            .set_default(key("rug_hard_threshold"), t.rug_hard_threshold)?
            .set_default(key("min_confirmations"), t.min_confirmations as i64)?
            .set_default(key("volume_surge_multiplier"), t.volume_surge_multiplier)?
            .set_default(key("tx_accel_threshold"), t.tx_accel_threshold)?
            .set_default(key("buy_ratio_accel_min"), t.buy_ratio_accel_min)?
            .set_default(key("sell_streak_max"), t.sell_streak_max as i64)?;
    }
    Ok(builder)
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = tier_defaults(config::Config::builder())?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix ALPHA__)
            .add_source(
                config::Environment::with_prefix("ALPHA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.tiers.validate().context("Invalid tier thresholds")?;

        check_window("convergence.window_secs", self.convergence.window_secs)?;
        check_window("pool_history.staleness_secs", self.pool_history.staleness_secs)?;
        check_window("velocity.staleness_secs", self.velocity.staleness_secs)?;

        if self.pool_history.max_pools == 0 {
            anyhow::bail!("pool_history.max_pools must be positive");
        }

        if self.velocity.max_tokens == 0 {
            anyhow::bail!("velocity.max_tokens must be positive");
        }

        url::Url::parse(&self.dexscreener.base_url)
            .with_context(|| format!("Invalid dexscreener.base_url: {}", self.dexscreener.base_url))?;

        if self.dexscreener.timeout_ms == 0 {
            anyhow::bail!("dexscreener.timeout_ms must be positive");
        }

        if self.dexscreener.max_retries > MAX_RETRIES {
            anyhow::bail!("dexscreener.max_retries must be at most {}", MAX_RETRIES);
        }

        if self.dexscreener.retry_base_delay_ms > MAX_WINDOW_SECS * 1_000 {
            anyhow::bail!(
                "dexscreener.retry_base_delay_ms must be at most {}",
                MAX_WINDOW_SECS * 1_000
            );
        }

        if self.watch.interval_secs == 0 {
            anyhow::bail!("watch.interval_secs must be positive");
        }

        Ok(())
    }

    /// Get a display-safe version of the config (masks query strings)
    pub fn masked_display(&self) -> String {
        let mut out = format!(
            r#"Configuration:
  Convergence:
    window: {}s
  Pool history:
    staleness: {}s
    max_pools: {}
  Velocity:
    staleness: {}s
    max_tokens: {}
  Dexscreener:
    base_url: {}
    timeout: {}ms
    max_retries: {}
    retry_base_delay: {}ms
  Watch:
    interval: {}s
  Tiers:
"#,
            self.convergence.window_secs,
            self.pool_history.staleness_secs,
            self.pool_history.max_pools,
            self.velocity.staleness_secs,
            self.velocity.max_tokens,
            mask_url(&self.dexscreener.base_url),
            self.dexscreener.timeout_ms,
            self.dexscreener.max_retries,
            self.dexscreener.retry_base_delay_ms,
            self.watch.interval_secs,
        );

        for tier in Tier::ALL {
            let t = self.tiers.get(tier);
            out.push_str(&format!(
                "    {}: enter {}/{} ready {}/{} arm {}/{} hard {} confirmations {}\n",
                tier,
                t.score_enter,
                t.rug_max_enter,
                t.score_ready,
                t.rug_max_ready,
                t.score_arm,
                t.rug_max_arm,
                t.rug_hard_threshold,
                t.min_confirmations,
            ));
        }

        out
    }
}

fn check_window(name: &str, value: u64) -> Result<()> {
    if value == 0 {
        anyhow::bail!("{} must be positive", name);
    }
    if value > MAX_WINDOW_SECS {
        anyhow::bail!("{} must be at most {}", name, MAX_WINDOW_SECS);
    }
    Ok(())
}

/// Mask sensitive parts of URL (API keys, etc.)
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.convergence.window_secs, 720);
        assert_eq!(config.pool_history.max_pools, 5_000);
        assert_eq!(config.watch.interval_secs, 30);
        assert_eq!(config.tiers.get(Tier::Pro).score_enter, 72.0);
        config.validate().unwrap();
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.tiers, TierTable::default());
        assert_eq!(config.dexscreener.base_url, "https://api.dexscreener.com");
    }

    #[test]
    fn test_load_partial_tier_override() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[tiers.pro]
score_enter = 70

[watch]
interval_secs = 5
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.tiers.pro.score_enter, 70.0);
        // Untouched fields keep their tier default
        assert_eq!(config.tiers.pro.score_ready, 65.0);
        assert_eq!(config.tiers.pro.min_confirmations, 2);
        assert_eq!(config.tiers.basic, TierThresholds::for_tier(Tier::Basic));
        assert_eq!(config.watch.interval_secs, 5);
    }

    #[test]
    fn test_load_rejects_inconsistent_tiers() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[tiers.basic]\nscore_arm = 95").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_validate_zero_window() {
        let mut config = Config::default();
        config.convergence.window_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_windows() {
        let mut config = Config::default();
        config.convergence.window_secs = 9_000_000_000_000_000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pool_history.staleness_secs = u64::MAX;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.velocity.staleness_secs = MAX_WINDOW_SECS + 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.convergence.window_secs = MAX_WINDOW_SECS;
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_unbounded_retries() {
        let mut config = Config::default();
        config.dexscreener.max_retries = u32::MAX;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.dexscreener.retry_base_delay_ms = u64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_window_conversion_saturates() {
        let config = ConvergenceConfig {
            window_secs: u64::MAX,
        };
        assert_eq!(
            config.window(),
            chrono::Duration::seconds(MAX_WINDOW_SECS as i64)
        );
    }

    #[test]
    fn test_masked_display() {
        let mut config = Config::default();
        config.dexscreener.base_url = "https://proxy.example.com?key=secret".to_string();
        let shown = config.masked_display();
        assert!(shown.contains("https://proxy.example.com?***"));
        assert!(!shown.contains("secret"));
        assert!(shown.contains("PROPLUS"));
    }

    #[test]
    fn test_mask_url() {
        assert_eq!(
            mask_url("https://api.example.com?key=secret"),
            "https://api.example.com?***"
        );
        assert_eq!(mask_url("https://api.example.com"), "https://api.example.com");
    }
}
