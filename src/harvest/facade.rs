//! Per-content-type entry points
//!
//! A harvester binds a content name, its cache TTL, its URL template and
//! its extractor to the generic engine. It is the only place where cache
//! identity and network work meet: cache first, then the harvest, then the
//! cache again.

use crate::cache::{CacheKey, CacheStore};
use crate::config::LimitsConfig;
use crate::harvest::enrich::{Enriched, Enricher, EnrichmentTask};
use crate::harvest::extract::{DetailExtractor, Extractor};
use crate::harvest::outcome::HarvestOutcome;
use crate::harvest::range::PageRange;
use crate::harvest::request::{HarvestRequest, RetryPolicy};
use crate::harvest::run::run_harvest;
use crate::harvest::template::PageTemplate;
use crate::http::ConnectionManager;
use crate::{HarvestError, Result};
use std::sync::Arc;
use std::time::Duration;

/// Cache of shared harvest outcomes with record type `R`
pub type OutcomeCache<R> = CacheStore<Arc<HarvestOutcome<R>>>;

fn no_data<R>(outcome: &HarvestOutcome<R>) -> HarvestError {
    tracing::error!(
        "No data retrieved for '{}': pages {:?} all failed",
        outcome.source(),
        outcome.failed_pages()
    );
    HarvestError::NoData {
        source_name: outcome.source().to_string(),
        failed_pages: outcome.failed_pages().to_vec(),
    }
}

/// Paginated content harvested page by page
pub struct Harvester<E: Extractor> {
    name: String,
    ttl: Duration,
    template: PageTemplate,
    extractor: E,
    limits: LimitsConfig,
    connections: Arc<ConnectionManager>,
    cache: Arc<OutcomeCache<E::Record>>,
}

impl<E: Extractor> Harvester<E> {
    pub fn new(
        name: &str,
        ttl: Duration,
        template: PageTemplate,
        extractor: E,
        connections: Arc<ConnectionManager>,
        cache: Arc<OutcomeCache<E::Record>>,
    ) -> Self {
        Self {
            name: name.to_string(),
            ttl,
            template,
            extractor,
            limits: LimitsConfig::default(),
            connections,
            cache,
        }
    }

    /// Replaces the bounds requests are validated against
    pub fn with_limits(mut self, limits: LimitsConfig) -> Self {
        self.limits = limits;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Key of the cache entry serving `request`
    ///
    /// Only the page window takes part: retry settings change how hard the
    /// engine tries, not what it returns.
    pub fn cache_key(&self, request: &HarvestRequest) -> CacheKey {
        CacheKey::builder(&self.name)
            .arg(request.page_count)
            .arg(request.from_page)
            .arg(request.to_page)
            .build()
    }

    /// Returns the cached outcome for `request` or harvests it
    ///
    /// # Errors
    ///
    /// * `InvalidRequest` - the request is outside the limits; nothing was fetched
    /// * `NoData` - every planned page failed; nothing is cached
    pub async fn harvest(
        &self,
        request: &HarvestRequest,
    ) -> Result<Arc<HarvestOutcome<E::Record>>> {
        request.validate(&self.limits)?;

        let key = self.cache_key(request);
        if let Some(cached) = self.cache.get(self.ttl, &key) {
            tracing::debug!("Cache hit for '{}' ({})", self.name, key);
            return Ok(cached);
        }
        tracing::debug!("Cache miss for '{}' ({})", self.name, key);

        let client = self.connections.acquire();
        let outcome = run_harvest(
            &client,
            &self.name,
            &self.template,
            &self.extractor,
            request.range(),
            &request.retry,
        )
        .await;

        if outcome.succeeded_pages() == 0 {
            return Err(no_data(&outcome));
        }

        let outcome = Arc::new(outcome);
        self.cache.set(self.ttl, key, Arc::clone(&outcome));
        Ok(outcome)
    }

    /// Drops the cached outcome for `request`; returns whether one existed
    pub fn invalidate(&self, request: &HarvestRequest) -> bool {
        self.cache.invalidate(self.ttl, &self.cache_key(request))
    }
}

/// Single-page listing whose records are completed from detail pages
///
/// The listing goes through the harvest loop as page 1 only, so it gets the
/// same retries as paginated content. Detail fetches use the enricher's own
/// timeout.
pub struct EnrichedHarvester<P, E, X: DetailExtractor> {
    name: String,
    ttl: Duration,
    template: PageTemplate,
    listing: E,
    enricher: Enricher<X>,
    limits: LimitsConfig,
    connections: Arc<ConnectionManager>,
    cache: Arc<OutcomeCache<Enriched<P, X::Detail>>>,
}

impl<P, E, X> EnrichedHarvester<P, E, X>
where
    E: Extractor<Record = EnrichmentTask<P>>,
    X: DetailExtractor,
{
    pub fn new(
        name: &str,
        ttl: Duration,
        template: PageTemplate,
        listing: E,
        enricher: Enricher<X>,
        connections: Arc<ConnectionManager>,
        cache: Arc<OutcomeCache<Enriched<P, X::Detail>>>,
    ) -> Self {
        Self {
            name: name.to_string(),
            ttl,
            template,
            listing,
            enricher,
            limits: LimitsConfig::default(),
            connections,
            cache,
        }
    }

    pub fn with_limits(mut self, limits: LimitsConfig) -> Self {
        self.limits = limits;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::builder(&self.name).build()
    }

    /// Returns the cached enriched listing or builds it
    ///
    /// # Errors
    ///
    /// * `InvalidRequest` - `policy` is outside the limits
    /// * `NoData` - the listing page could not be fetched
    pub async fn harvest(
        &self,
        policy: &RetryPolicy,
    ) -> Result<Arc<HarvestOutcome<Enriched<P, X::Detail>>>> {
        policy.validate(&self.limits)?;

        let key = self.cache_key();
        if let Some(cached) = self.cache.get(self.ttl, &key) {
            tracing::debug!("Cache hit for '{}'", self.name);
            return Ok(cached);
        }

        let client = self.connections.acquire();
        let mut listing = run_harvest(
            &client,
            &self.name,
            &self.template,
            &self.listing,
            PageRange::single(1),
            policy,
        )
        .await;

        if listing.succeeded_pages() == 0 {
            return Err(no_data(&listing));
        }

        let tasks = listing.take_records();
        let enriched = self.enricher.enrich(&client, tasks).await;

        let outcome = Arc::new(listing.replace_records(enriched));
        self.cache.set(self.ttl, key, Arc::clone(&outcome));
        Ok(outcome)
    }

    pub fn invalidate(&self) -> bool {
        self.cache.invalidate(self.ttl, &self.cache_key())
    }
}
