//! Harvest parameters and their validation

use crate::config::{HarvestDefaults, LimitsConfig};
use crate::harvest::range::{plan, PageRange};
use crate::HarvestError;
use std::time::Duration;

/// Retry and pacing settings for one harvest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per page, including the first one
    pub max_retries: u32,

    /// Pause between successful page fetches; also the backoff base
    pub request_delay: Duration,

    /// Timeout of each individual request
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            request_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }
}

impl From<&HarvestDefaults> for RetryPolicy {
    fn from(defaults: &HarvestDefaults) -> Self {
        Self {
            max_retries: defaults.max_retries,
            request_delay: Duration::from_millis(defaults.request_delay_ms),
            timeout: Duration::from_secs(defaults.timeout_secs),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): `request_delay * 2^attempt`
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.request_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Attempt budget per page, never below one
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Rejects settings outside the configured bounds
    pub fn validate(&self, limits: &LimitsConfig) -> Result<(), HarvestError> {
        if self.max_retries < 1 || self.max_retries > limits.max_retries {
            return Err(HarvestError::InvalidRequest(format!(
                "Max retries ({}) must be between 1 and {}",
                self.max_retries, limits.max_retries
            )));
        }

        let delay_ms = self.request_delay.as_millis();
        if delay_ms < u128::from(limits.min_request_delay_ms)
            || delay_ms > u128::from(limits.max_request_delay_ms)
        {
            return Err(HarvestError::InvalidRequest(format!(
                "Request delay ({}ms) must be between {}ms and {}ms",
                delay_ms, limits.min_request_delay_ms, limits.max_request_delay_ms
            )));
        }

        let timeout = self.timeout.as_secs();
        if self.timeout < Duration::from_secs(limits.min_timeout_secs)
            || self.timeout > Duration::from_secs(limits.max_timeout_secs)
        {
            return Err(HarvestError::InvalidRequest(format!(
                "Timeout ({}s) must be between {}s and {}s",
                timeout, limits.min_timeout_secs, limits.max_timeout_secs
            )));
        }

        Ok(())
    }
}

/// Caller-supplied parameters of one harvest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestRequest {
    /// Window size used when at most one bound is given
    pub page_count: u32,
    pub from_page: Option<u32>,
    pub to_page: Option<u32>,
    pub retry: RetryPolicy,
}

impl Default for HarvestRequest {
    fn default() -> Self {
        Self {
            page_count: 1,
            from_page: None,
            to_page: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl HarvestRequest {
    /// A request for the first `page_count` pages
    pub fn pages(page_count: u32) -> Self {
        Self {
            page_count,
            ..Self::default()
        }
    }

    pub fn from_page(mut self, page: u32) -> Self {
        self.from_page = Some(page);
        self
    }

    pub fn to_page(mut self, page: u32) -> Self {
        self.to_page = Some(page);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The concrete page range this request covers
    pub fn range(&self) -> PageRange {
        plan(self.page_count, self.from_page, self.to_page)
    }

    /// Number of pages the caller asked for, before clamping
    fn requested_window(&self) -> u64 {
        match (self.from_page, self.to_page) {
            (Some(from), Some(to)) => (u64::from(to) + 1).saturating_sub(u64::from(from)).max(1),
            _ => u64::from(self.page_count),
        }
    }

    /// Rejects bad bounds and oversized or out-of-range settings
    ///
    /// Runs before any network activity so callers never pay for a request
    /// that could not be served.
    pub fn validate(&self, limits: &LimitsConfig) -> Result<(), HarvestError> {
        if self.page_count < 1 {
            return Err(HarvestError::InvalidRequest(
                "Page count must be >= 1".to_string(),
            ));
        }

        if self.from_page == Some(0) || self.to_page == Some(0) {
            return Err(HarvestError::InvalidRequest(
                "Page numbers are 1-based".to_string(),
            ));
        }

        if let (Some(from), Some(to)) = (self.from_page, self.to_page) {
            if to < from {
                return Err(HarvestError::InvalidRequest(format!(
                    "To page ({}) must not be before from page ({})",
                    to, from
                )));
            }
        }

        let window = self.requested_window();
        if window > u64::from(limits.max_page_window) {
            return Err(HarvestError::InvalidRequest(format!(
                "Requested page window ({}) exceeds the maximum allowed ({})",
                window, limits.max_page_window
            )));
        }

        self.retry.validate(limits)
    }
}
