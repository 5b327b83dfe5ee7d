use crate::harvest::range::PageRange;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Aggregated result of one harvest
///
/// Built once when the harvest finishes and never mutated afterwards.
/// `succeeded_pages + failed_pages.len() == page_range.total()` and
/// `record_count == records.len()` always hold.
#[derive(Debug, Clone, Serialize)]
pub struct HarvestOutcome<R> {
    source: String,
    records: Vec<R>,
    page_range: PageRange,
    succeeded_pages: u32,
    failed_pages: Vec<u32>,
    record_count: usize,
    harvested_at: DateTime<Utc>,
}

impl<R> HarvestOutcome<R> {
    /// Creates an outcome; every page of `page_range` not listed in
    /// `failed_pages` counts as succeeded
    pub fn new(source: &str, page_range: PageRange, records: Vec<R>, failed_pages: Vec<u32>) -> Self {
        let succeeded_pages = page_range.total().saturating_sub(failed_pages.len() as u32);
        Self {
            source: source.to_string(),
            record_count: records.len(),
            records,
            page_range,
            succeeded_pages,
            failed_pages,
            harvested_at: Utc::now(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Records in page order, then extractor order within a page
    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn page_range(&self) -> PageRange {
        self.page_range
    }

    pub fn succeeded_pages(&self) -> u32 {
        self.succeeded_pages
    }

    /// Pages abandoned after exhausting their retries, ascending
    pub fn failed_pages(&self) -> &[u32] {
        &self.failed_pages
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn harvested_at(&self) -> DateTime<Utc> {
        self.harvested_at
    }

    /// True when at least one page failed
    pub fn is_partial(&self) -> bool {
        !self.failed_pages.is_empty()
    }

    pub fn into_records(self) -> Vec<R> {
        self.records
    }

    /// Moves the records out, leaving the page accounting in place
    pub(crate) fn take_records(&mut self) -> Vec<R> {
        std::mem::take(&mut self.records)
    }

    /// Rebuilds the outcome around a new record list
    pub(crate) fn replace_records<T>(self, records: Vec<T>) -> HarvestOutcome<T> {
        HarvestOutcome {
            source: self.source,
            record_count: records.len(),
            records,
            page_range: self.page_range,
            succeeded_pages: self.succeeded_pages,
            failed_pages: self.failed_pages,
            harvested_at: self.harvested_at,
        }
    }
}
