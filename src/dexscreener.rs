// DexScreener API client: pair lookup for the decision engine
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::DexScreenerConfig;
use crate::error::{Error, Result};

const MAX_ADDRESS_LEN: usize = 100;

lazy_static! {
    /// 0x followed by 40 hex chars
    static ref EVM_ADDRESS: Regex =
        Regex::new(r"^0x[a-fA-F0-9]{40}$").expect("Invalid EVM address regex");
    /// Base58 alphabet, 32-44 chars
    static ref BASE58_ADDRESS: Regex =
        Regex::new(r"^[1-9A-HJ-NP-Za-km-z]{32,44}$").expect("Invalid base58 address regex");
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceChange {
    pub m5: Option<f64>,
    pub h1: Option<f64>,
    pub h6: Option<f64>,
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Txns {
    pub m5: Option<TxnCount>,
    pub h1: Option<TxnCount>,
    pub h6: Option<TxnCount>,
    pub h24: Option<TxnCount>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TxnCount {
    #[serde(default)]
    pub buys: u32,
    #[serde(default)]
    pub sells: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Liquidity {
    pub usd: Option<f64>,
    pub base: Option<f64>,
    pub quote: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Volume {
    pub m5: Option<f64>,
    pub h1: Option<f64>,
    pub h6: Option<f64>,
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaseToken {
    pub address: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DexPair {
    #[serde(rename = "chainId")]
    pub chain_id: String,
    #[serde(rename = "dexId", default)]
    pub dex_id: String,
    pub url: Option<String>,
    #[serde(rename = "pairAddress")]
    pub pair_address: String,
    #[serde(rename = "baseToken")]
    pub base_token: BaseToken,
    #[serde(rename = "priceNative")]
    pub price_native: Option<String>,
    #[serde(rename = "priceUsd")]
    pub price_usd: Option<String>,
    #[serde(rename = "priceChange")]
    pub price_change: Option<PriceChange>,
    pub txns: Option<Txns>,
    pub volume: Option<Volume>,
    pub liquidity: Option<Liquidity>,
    #[serde(rename = "marketCap")]
    pub market_cap: Option<f64>,
    #[serde(rename = "fdv")]
    pub fdv: Option<f64>,
    /// Pool creation time, unix millis
    #[serde(rename = "pairCreatedAt")]
    pub pair_created_at: Option<i64>,
}

impl DexPair {
    pub fn liquidity_usd(&self) -> f64 {
        self.liquidity
            .as_ref()
            .and_then(|l| l.usd)
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }

    pub fn symbol(&self) -> &str {
        self.base_token.symbol.as_deref().unwrap_or("???")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PairResponse {
    pair: Option<DexPair>,
    pairs: Option<Vec<DexPair>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SearchResponse {
    pairs: Option<Vec<DexPair>>,
}

/// What a Dexscreener URL points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DexTarget {
    Pair { chain: String, id: String },
    Token { address: String },
}

/// Parse `/<chain>/<id>`, `/pair/<chain>/<id>` or `/token/<address>`
pub fn parse_dex_url(input: &str) -> Result<DexTarget> {
    let parsed = Url::parse(input.trim())
        .map_err(|_| Error::InvalidDexUrl(sanitize_for_log(input)))?;
    let parts: Vec<&str> = parsed
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    match parts.as_slice() {
        ["pair", chain, id, ..] => Ok(DexTarget::Pair {
            chain: chain.to_ascii_lowercase(),
            id: id.to_string(),
        }),
        ["token", address, ..] => {
            validate_address(address)?;
            Ok(DexTarget::Token {
                address: address.to_string(),
            })
        }
        [chain, id, ..] => Ok(DexTarget::Pair {
            chain: chain.to_ascii_lowercase(),
            id: id.to_string(),
        }),
        _ => Err(Error::InvalidDexUrl(sanitize_for_log(input))),
    }
}

/// EVM hex or base58 (Solana-style) address
pub fn is_valid_address(address: &str) -> bool {
    EVM_ADDRESS.is_match(address) || BASE58_ADDRESS.is_match(address)
}

fn validate_address(address: &str) -> Result<()> {
    if address.len() > MAX_ADDRESS_LEN || !is_valid_address(address) {
        return Err(Error::InvalidAddress(sanitize_for_log(address)));
    }
    Ok(())
}

/// Truncate and strip control characters before echoing user input
pub fn sanitize_for_log(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_ADDRESS_LEN)
        .collect()
}

/// Pair with the deepest USD liquidity
pub fn deepest_pair(pairs: Vec<DexPair>) -> Option<DexPair> {
    pairs.into_iter().max_by(|a, b| {
        a.liquidity_usd()
            .partial_cmp(&b.liquidity_usd())
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

/// Market data source for pairs
#[async_trait]
pub trait PairSource: Send + Sync {
    /// Pair by chain and pair id, falling back to the token's deepest pool
    async fn fetch_pair(&self, chain: &str, id: &str) -> Result<DexPair>;

    /// Deepest pair for a token address on any chain
    async fn search_token(&self, address: &str) -> Result<DexPair>;

    async fn resolve(&self, target: &DexTarget) -> Result<DexPair> {
        match target {
            DexTarget::Pair { chain, id } => self.fetch_pair(chain, id).await,
            DexTarget::Token { address } => self.search_token(address).await,
        }
    }
}

pub struct DexScreenerClient {
    client: reqwest::Client,
    base_url: Url,
    config: DexScreenerConfig,
}

impl DexScreenerClient {
    pub fn new(config: &DexScreenerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::Config(format!("dexscreener.base_url: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            config: config.clone(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config("dexscreener.base_url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET with retries on 429, 5xx and transport errors
    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        with_retries(&self.config, url.path(), || self.get_json_once(url)).await
    }

    async fn get_json_once<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let resp = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::DexScreener {
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Backoff between attempts. The attempt count is bounded by `with_retries`.
fn retry_policy(config: &DexScreenerConfig) -> ExponentialBackoff {
    let base = config.retry_base_delay_ms;
    ExponentialBackoff {
        initial_interval: Duration::from_millis(base),
        max_interval: Duration::from_millis(base.saturating_mul(4)),
        max_elapsed_time: None,
        ..Default::default()
    }
}

/// Run `op` at most `max_retries + 1` times, retrying only retryable errors
async fn with_retries<T, F, Fut>(config: &DexScreenerConfig, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_retries = config.max_retries;
    let mut attempts: u32 = 0;

    retry(retry_policy(config), || {
        attempts = attempts.saturating_add(1);
        let attempt = attempts;
        let fut = op();
        async move {
            match fut.await {
                Ok(value) => Ok(value),
                Err(e) if e.is_retryable() && attempt <= max_retries => {
                    warn!(url = %what, attempt, "Retryable Dexscreener error: {}", e);
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        }
    })
    .await
}

#[async_trait]
impl PairSource for DexScreenerClient {
    async fn fetch_pair(&self, chain: &str, id: &str) -> Result<DexPair> {
        let pair_url = self.endpoint(&["latest", "dex", "pairs", chain, id])?;
        match self.get_json::<PairResponse>(&pair_url).await {
            Ok(resp) => {
                if let Some(pair) = resp.pair.or_else(|| resp.pairs.and_then(deepest_pair)) {
                    return Ok(pair);
                }
                debug!(chain, id, "No pair at pair endpoint, trying token pools");
            }
            Err(e) => debug!(chain, id, "Pair endpoint failed ({}), trying token pools", e),
        }

        let pools_url = self.endpoint(&["token-pairs", "v1", chain, id])?;
        let pools: Vec<DexPair> = self.get_json(&pools_url).await?;
        deepest_pair(pools).ok_or_else(|| Error::PairNotFound {
            chain: chain.to_string(),
            id: sanitize_for_log(id),
        })
    }

    async fn search_token(&self, address: &str) -> Result<DexPair> {
        validate_address(address)?;

        let mut url = self.endpoint(&["latest", "dex", "search"])?;
        url.query_pairs_mut().append_pair("q", address);
        let resp: SearchResponse = self.get_json(&url).await?;
        let pairs = resp.pairs.unwrap_or_default();

        // Prefer pools where the token is the base asset
        let (exact, other): (Vec<_>, Vec<_>) = pairs
            .into_iter()
            .partition(|p| p.base_token.address.eq_ignore_ascii_case(address));
        let candidates = if exact.is_empty() { other } else { exact };

        deepest_pair(candidates).ok_or_else(|| Error::PairNotFound {
            chain: "*".to_string(),
            id: address.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    const SOL_MINT: &str = "7GCihgDB8fe6KNjn2MYtkzZcRjQy3t9GHdC8uHYmW2hr";

    fn pair(address: &str, liq: f64) -> DexPair {
        DexPair {
            chain_id: "solana".into(),
            pair_address: address.into(),
            liquidity: Some(Liquidity {
                usd: Some(liq),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn fast_retries(max_retries: u32) -> DexScreenerConfig {
        DexScreenerConfig {
            max_retries,
            retry_base_delay_ms: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_retries_stop_after_limit() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = with_retries(&fast_retries(2), "/pairs", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::DexScreener { status: 503 })
        })
        .await;

        assert!(matches!(result, Err(Error::DexScreener { status: 503 })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_retry_on_client_error() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = with_retries(&fast_retries(5), "/pairs", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::DexScreener { status: 404 })
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_recovers() {
        let calls = &AtomicU32::new(0);
        let result = with_retries(&fast_retries(3), "/pairs", || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(Error::DexScreener { status: 429 })
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_retry_policy_huge_delay() {
        let policy = retry_policy(&DexScreenerConfig {
            retry_base_delay_ms: u64::MAX,
            ..Default::default()
        });
        assert_eq!(policy.max_interval, Duration::from_millis(u64::MAX));
        assert!(policy.max_elapsed_time.is_none());
    }

    #[test]
    fn test_parse_chain_pair_url() {
        let t = parse_dex_url("https://dexscreener.com/Solana/abc123").unwrap();
        assert_eq!(
            t,
            DexTarget::Pair {
                chain: "solana".into(),
                id: "abc123".into()
            }
        );
    }

    #[test]
    fn test_parse_explicit_pair_url() {
        let t = parse_dex_url("https://dexscreener.com/pair/base/0xdeadbeef?maker=1").unwrap();
        assert_eq!(
            t,
            DexTarget::Pair {
                chain: "base".into(),
                id: "0xdeadbeef".into()
            }
        );
    }

    #[test]
    fn test_parse_token_url() {
        let url = format!("https://dexscreener.com/token/{}", SOL_MINT);
        assert_eq!(
            parse_dex_url(&url).unwrap(),
            DexTarget::Token {
                address: SOL_MINT.into()
            }
        );

        let err = parse_dex_url("https://dexscreener.com/token/not-an-address").unwrap_err();
        assert!(matches!(err, Error::InvalidAddress(_)));
        assert!(err.is_input_error());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_dex_url("not a url"),
            Err(Error::InvalidDexUrl(_))
        ));
        assert!(matches!(
            parse_dex_url("https://dexscreener.com/solana"),
            Err(Error::InvalidDexUrl(_))
        ));
    }

    #[test]
    fn test_address_validation() {
        assert!(is_valid_address("0x52908400098527886E0F7030069857D2E4169EE7"));
        assert!(is_valid_address(SOL_MINT));
        assert!(!is_valid_address("0x123"));
        // base58 has no 0, O, I or l
        assert!(!is_valid_address("0OIl0OIl0OIl0OIl0OIl0OIl0OIl0OIl"));
    }

    #[test]
    fn test_sanitize_for_log() {
        assert_eq!(sanitize_for_log("abc\r\ndef\t"), "abcdef");
        assert_eq!(sanitize_for_log(&"x".repeat(500)).len(), 100);
    }

    #[test]
    fn test_deepest_pair() {
        let best = deepest_pair(vec![pair("a", 10.0), pair("b", 900.0), pair("c", 50.0)]).unwrap();
        assert_eq!(best.pair_address, "b");
        assert!(deepest_pair(Vec::new()).is_none());
    }

    #[test]
    fn test_pair_deserialize() {
        let json = r#"{
            "chainId": "solana",
            "dexId": "raydium",
            "pairAddress": "PAIR1",
            "baseToken": {"address": "MINT1", "symbol": "DOG"},
            "priceChange": {"m5": -1.5, "h1": 9.0, "h24": 40.0},
            "txns": {"m5": {"buys": 12, "sells": 4}},
            "volume": {"m5": 3000, "h24": 220000},
            "liquidity": {"usd": 60000},
            "fdv": 900000,
            "pairCreatedAt": 1700000000000
        }"#;
        let p: DexPair = serde_json::from_str(json).unwrap();
        assert_eq!(p.symbol(), "DOG");
        assert_eq!(p.liquidity_usd(), 60_000.0);
        assert_eq!(p.pair_created_at, Some(1_700_000_000_000));
        assert_eq!(p.txns.unwrap().m5.unwrap().buys, 12);
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = DexScreenerClient::new(&DexScreenerConfig::default()).unwrap();
        let url = client.endpoint(&["latest", "dex", "pairs", "solana", "a/b"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.dexscreener.com/latest/dex/pairs/solana/a%2Fb"
        );
    }
}
