//! Error types for the signal engine
//!
//! The scoring core is total and never produces these. They come from the
//! edges: configuration, tier parsing and the market data fetcher.

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the signal engine
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown tier: {0}")]
    UnknownTier(String),

    // Market data errors
    #[error("Invalid Dexscreener URL: {0}")]
    InvalidDexUrl(String),

    #[error("Invalid token address format: {0}")]
    InvalidAddress(String),

    #[error("Pair not found: {chain}/{id}")]
    PairNotFound { chain: String, id: String },

    #[error("Dexscreener HTTP {status}")]
    DexScreener { status: u16 },

    #[error("HTTP error: {0}")]
    Http(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) => true,
            // 429 and 5xx are worth another attempt, other statuses are not
            Error::DexScreener { status } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Check if this error was caused by caller input rather than the upstream API
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidDexUrl(_) | Error::InvalidAddress(_) | Error::UnknownTier(_)
        )
    }
}

// Conversion from reqwest errors
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Error::DexScreener {
                status: status.as_u16(),
            },
            None => Error::Http(e.to_string()),
        }
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
