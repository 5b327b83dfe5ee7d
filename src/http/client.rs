//! Outbound HTTP client
//!
//! This module handles every request the engine sends, including:
//! - Building the reqwest client with default headers and pool limits
//! - Bounding the number of requests in flight across all harvests
//! - Per-request timeouts
//! - Error classification into [`FetchError`]

use crate::config::HttpConfig;
use crate::FetchError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};

/// Shared handle to the outbound client
///
/// Cloning is cheap: clones share the connection pool and the in-flight
/// permit budget.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    permits: Arc<Semaphore>,
    max_connections: usize,
    default_timeout: Duration,
}

/// Builds the reqwest client with proper configuration
///
/// # Example
///
/// ```no_run
/// use vlr_harvest::config::HttpConfig;
/// use vlr_harvest::http::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(config.timeout())
        .connect_timeout(config.connect_timeout())
        .pool_max_idle_per_host(config.max_idle_per_host)
        .gzip(true)
        .brotli(true)
        .build()
}

impl HttpClient {
    /// Creates a client from configuration
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::from_client(build_http_client(config)?, config))
    }

    /// Wraps an already built reqwest client with the configured limits
    pub fn from_client(inner: Client, config: &HttpConfig) -> Self {
        let max_connections = config.max_connections.max(1);
        Self {
            inner,
            permits: Arc::new(Semaphore::new(max_connections)),
            max_connections,
            default_timeout: config.timeout(),
        }
    }

    /// Maximum number of requests this client lets run at once
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Number of requests currently in flight
    pub fn in_flight(&self) -> usize {
        self.max_connections - self.permits.available_permits()
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Fetches a page body
    ///
    /// Any non-2xx status is an error. `timeout` overrides the client
    /// default for this request only. The in-flight permit is held until
    /// the whole body has been read.
    ///
    /// # Arguments
    ///
    /// * `url` - The page to fetch
    /// * `timeout` - Per-request timeout, or `None` for the client default
    ///
    /// # Returns
    ///
    /// The response body as text, or a classified `FetchError`
    pub async fn get_text(&self, url: &str, timeout: Option<Duration>) -> Result<String, FetchError> {
        let _permit = self.permit(url).await?;
        let response = self.send(url, timeout).await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))
    }

    /// Returns the status code of a GET without judging it
    pub async fn get_status(&self, url: &str, timeout: Option<Duration>) -> Result<u16, FetchError> {
        let _permit = self.permit(url).await?;
        let response = self.send(url, timeout).await?;
        Ok(response.status().as_u16())
    }

    async fn permit(&self, url: &str) -> Result<SemaphorePermit<'_>, FetchError> {
        self.permits
            .acquire()
            .await
            .map_err(|_| FetchError::Transport {
                url: url.to_string(),
                message: "connection pool closed".to_string(),
            })
    }

    async fn send(
        &self,
        url: &str,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, FetchError> {
        tracing::trace!("GET {}", url);

        self.inner
            .get(url)
            .timeout(timeout.unwrap_or(self.default_timeout))
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))
    }
}
