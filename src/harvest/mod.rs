//! Harvest engine
//!
//! This module contains the core harvesting logic, including:
//! - Page range planning from pagination parameters
//! - The retrying, rate-limited page loop
//! - Concurrent detail-page enrichment
//! - Cached per-content-type harvesters

mod enrich;
mod extract;
mod facade;
mod outcome;
mod range;
mod request;
mod run;
mod template;

pub use enrich::{Enriched, Enricher, EnrichmentTask};
pub use extract::{
    parse_selector, DetailExtractor, Extractor, LinkedSelectorExtractor, SelectorDetail,
    SelectorExtractor, UNKNOWN,
};
pub use facade::{EnrichedHarvester, Harvester, OutcomeCache};
pub use outcome::HarvestOutcome;
pub use range::{plan, PageRange};
pub use request::{HarvestRequest, RetryPolicy};
pub use run::run_harvest;
pub use template::PageTemplate;
