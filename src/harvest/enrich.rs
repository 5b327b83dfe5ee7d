//! Concurrent detail-page enrichment
//!
//! Every primary record that carries a detail URL gets one secondary fetch.
//! All fetches run at once and results are merged back by position, so the
//! order of the primary list survives whatever order the fetches finish in.

use crate::harvest::extract::DetailExtractor;
use crate::http::HttpClient;
use crate::HarvestError;
use futures::future::join_all;
use scraper::Html;
use serde::Serialize;
use std::time::Duration;

/// A primary record paired with the page holding its extra data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichmentTask<P> {
    pub primary: P,
    /// `None` when the record has nothing to enrich from
    pub secondary_url: Option<String>,
}

impl<P> EnrichmentTask<P> {
    pub fn new(primary: P, secondary_url: impl Into<String>) -> Self {
        Self {
            primary,
            secondary_url: Some(secondary_url.into()),
        }
    }
}

/// A primary record merged with its detail data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enriched<P, D> {
    pub primary: P,
    pub detail: D,
    /// False when `detail` is the extractor's placeholder
    pub resolved: bool,
}

/// Fetches and merges detail pages for a batch of primary records
#[derive(Debug, Clone)]
pub struct Enricher<X> {
    detail: X,
    timeout: Duration,
}

impl<X: DetailExtractor> Enricher<X> {
    pub fn new(detail: X, timeout: Duration) -> Self {
        Self { detail, timeout }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn extract_detail(&self, body: &str) -> Result<X::Detail, HarvestError> {
        let document = Html::parse_document(body);
        Ok(self.detail.extract(&document)?)
    }

    async fn fetch_detail(&self, client: &HttpClient, url: &str) -> Result<X::Detail, HarvestError> {
        let body = client.get_text(url, Some(self.timeout)).await?;
        self.extract_detail(&body)
    }

    async fn resolve(&self, client: &HttpClient, url: Option<&str>) -> Option<X::Detail> {
        let url = url?;
        match self.fetch_detail(client, url).await {
            Ok(detail) => Some(detail),
            Err(e) => {
                tracing::warn!("Failed to fetch detail {}: {}", url, e);
                None
            }
        }
    }

    /// Enriches every task, preserving input order
    ///
    /// Never fails: a task whose detail fetch fails, times out or cannot be
    /// parsed gets the placeholder detail and `resolved == false`.
    ///
    /// # Arguments
    ///
    /// * `client` - Shared outbound client; its in-flight bound caps fan-out
    /// * `tasks` - Primary records with their detail URLs
    ///
    /// # Returns
    ///
    /// One merged item per task, in the order the tasks were given
    pub async fn enrich<P>(
        &self,
        client: &HttpClient,
        tasks: Vec<EnrichmentTask<P>>,
    ) -> Vec<Enriched<P, X::Detail>> {
        let (primaries, urls): (Vec<P>, Vec<Option<String>>) = tasks
            .into_iter()
            .map(|task| (task.primary, task.secondary_url))
            .unzip();

        tracing::debug!("Fetching {} detail pages concurrently", urls.len());

        let details = join_all(urls.iter().map(|url| self.resolve(client, url.as_deref()))).await;

        let merged: Vec<_> = primaries
            .into_iter()
            .zip(details)
            .map(|(primary, detail)| match detail {
                Some(detail) => Enriched {
                    primary,
                    detail,
                    resolved: true,
                },
                None => Enriched {
                    primary,
                    detail: self.detail.placeholder(),
                    resolved: false,
                },
            })
            .collect();

        let degraded = merged.iter().filter(|item| !item.resolved).count();
        if degraded > 0 {
            tracing::warn!(
                "{} of {} records enriched with placeholders",
                degraded,
                merged.len()
            );
        }

        merged
    }
}
