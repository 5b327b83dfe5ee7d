//! vlr-harvest: a resilient multi-page harvest engine
//!
//! This crate fetches bounded page ranges from a slow, occasionally failing
//! upstream site, hands every fetched document to an injected extractor and
//! memoizes the aggregated results for a bounded time window.

pub mod cache;
pub mod config;
pub mod harvest;
pub mod http;

use thiserror::Error;

/// Main error type for harvest operations
///
/// Per-page and per-detail failures are absorbed by the engine and reported
/// as outcome metadata. Only the variants below ever reach a caller.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid harvest request: {0}")]
    InvalidRequest(String),

    #[error("No data retrieved for '{source_name}': all pages failed {failed_pages:?}")]
    NoData {
        source_name: String,
        failed_pages: Vec<u32>,
    },

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),
}

/// Errors raised by a single outbound request
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}")]
    Connect { url: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },
}

impl FetchError {
    /// Classifies a reqwest error the same way for every caller
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if err.is_connect() {
            FetchError::Connect {
                url: url.to_string(),
            }
        } else if let Some(status) = err.status() {
            FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// Errors raised by an extractor for one document
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("Malformed markup on page {page}: {message}")]
    Malformed { page: u32, message: String },
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use cache::{CacheKey, CacheStore};
pub use config::Config;
pub use harvest::{
    plan, EnrichedHarvester, Enricher, EnrichmentTask, Extractor, HarvestOutcome, HarvestRequest,
    Harvester, PageRange, PageTemplate, RetryPolicy,
};
pub use http::{ConnectionManager, HttpClient};
