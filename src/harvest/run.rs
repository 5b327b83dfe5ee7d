//! Sequential multi-page harvest loop
//!
//! Pages are fetched one at a time in ascending order. Each page gets a
//! bounded number of attempts with exponential backoff between them; a page
//! that never succeeds is recorded as failed and the loop moves on.

use crate::harvest::extract::Extractor;
use crate::harvest::outcome::HarvestOutcome;
use crate::harvest::range::PageRange;
use crate::harvest::request::RetryPolicy;
use crate::harvest::template::PageTemplate;
use crate::http::HttpClient;
use crate::{ExtractError, HarvestError};
use scraper::Html;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;
use tokio::time::sleep;

/// Parses a page body and runs the extractor over it
///
/// Kept synchronous so the parsed document is dropped before the next
/// await point. A panicking extractor costs only this page: the panic is
/// turned into an `ExtractError` and goes through the retry path.
fn extract_page<E: Extractor>(
    extractor: &E,
    body: &str,
    page: u32,
) -> Result<Vec<E::Record>, HarvestError> {
    let document = Html::parse_document(body);
    match panic::catch_unwind(AssertUnwindSafe(|| extractor.extract(&document, page))) {
        Ok(result) => Ok(result?),
        Err(payload) => Err(ExtractError::Malformed {
            page,
            message: format!("extractor panicked: {}", panic_message(payload.as_ref())),
        }
        .into()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown cause")
}

async fn fetch_page<E: Extractor>(
    client: &HttpClient,
    extractor: &E,
    url: &str,
    page: u32,
    timeout: Duration,
) -> Result<Vec<E::Record>, HarvestError> {
    let body = client.get_text(url, Some(timeout)).await?;
    extract_page(extractor, &body, page)
}

/// Harvests every page of `range`
///
/// Never fails: transport errors, non-2xx statuses, timeouts, extractor
/// errors and extractor panics are retried up to `policy.max_retries`
/// attempts and then recorded in the outcome's failed pages. A 2xx page
/// with no records is a success.
///
/// # Arguments
///
/// * `client` - Shared outbound client
/// * `source` - Content name used in logs and in the outcome
/// * `template` - Builds the URL of each page
/// * `extractor` - Turns one parsed page into records
/// * `range` - Pages to fetch, in ascending order
/// * `policy` - Attempt budget, pacing delay and per-request timeout
///
/// # Returns
///
/// The records of every successful page in page order, with the pages that
/// were abandoned
///
/// # Timing
///
/// After failed attempt `n` (1-based) the loop sleeps
/// `request_delay * 2^n` unless the attempt budget is spent. After every
/// successful page except the last it sleeps `request_delay`.
pub async fn run_harvest<E: Extractor>(
    client: &HttpClient,
    source: &str,
    template: &PageTemplate,
    extractor: &E,
    range: PageRange,
    policy: &RetryPolicy,
) -> HarvestOutcome<E::Record> {
    let attempts = policy.attempts();
    let mut records = Vec::new();
    let mut failed_pages = Vec::new();

    tracing::info!(
        "Harvesting '{}' pages {} ({} pages) with {:?} delay",
        source,
        range,
        range.total(),
        policy.request_delay
    );

    for page in range.pages() {
        let url = template.url_for(page);
        let mut attempt = 0;
        let mut page_records = None;

        while attempt < attempts {
            tracing::info!(
                "Harvesting page {} ({}/{}) attempt {}/{}",
                page,
                range.position(page),
                range.total(),
                attempt + 1,
                attempts
            );

            match fetch_page(client, extractor, &url, page, policy.timeout).await {
                Ok(found) => {
                    page_records = Some(found);
                    break;
                }
                Err(e) => {
                    attempt += 1;
                    tracing::warn!(
                        "Error on page {} attempt {}/{}: {}",
                        page,
                        attempt,
                        attempts,
                        e
                    );
                    if attempt < attempts {
                        sleep(policy.backoff(attempt)).await;
                    }
                }
            }
        }

        match page_records {
            Some(found) => {
                tracing::info!("Page {}: {} items", page, found.len());
                records.extend(found);

                if page < range.end() {
                    sleep(policy.request_delay).await;
                }
            }
            None => {
                tracing::error!("Failed page {} after {} attempts", page, attempts);
                failed_pages.push(page);
            }
        }
    }

    let outcome = HarvestOutcome::new(source, range, records, failed_pages);

    tracing::info!(
        "Harvest of '{}' done: {} records, {}/{} pages OK",
        source,
        outcome.record_count(),
        outcome.succeeded_pages(),
        range.total()
    );

    outcome
}
