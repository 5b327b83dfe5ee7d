//! Extractor contracts and the configuration-driven selector extractor
//!
//! The harvest loop only ever sees the [`Extractor`] trait: one fetched
//! document plus its page number in, zero or more records out. Parsing is
//! synchronous and the document never outlives the call.

use crate::config::SourceConfig;
use crate::harvest::enrich::EnrichmentTask;
use crate::{ConfigError, ExtractError};
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use url::Url;

/// Turns one listing page into records
pub trait Extractor: Send + Sync {
    type Record;

    fn extract(&self, document: &Html, page: u32) -> Result<Vec<Self::Record>, ExtractError>;
}

impl<F, R> Extractor for F
where
    F: Fn(&Html, u32) -> Result<Vec<R>, ExtractError> + Send + Sync,
{
    type Record = R;

    fn extract(&self, document: &Html, page: u32) -> Result<Vec<R>, ExtractError> {
        self(document, page)
    }
}

/// Turns one detail page into the data merged into a primary record
pub trait DetailExtractor: Send + Sync {
    type Detail;

    fn extract(&self, document: &Html) -> Result<Self::Detail, ExtractError>;

    /// Value used when the detail page could not be fetched or parsed
    fn placeholder(&self) -> Self::Detail;
}

/// Parses a CSS selector, reporting failures as extraction errors
pub fn parse_selector(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::Selector(format!("'{}': {:?}", selector, e)))
}

fn compile_fields(
    fields: impl IntoIterator<Item = (String, String)>,
) -> Result<Vec<(String, Selector)>, ExtractError> {
    fields
        .into_iter()
        .map(|(name, selector)| Ok((name, parse_selector(&selector)?)))
        .collect()
}

/// Collapsed, trimmed text content of an element
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves an href against the page URL
///
/// Returns None for empty, fragment-only and non-HTTP(S) links.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    if absolute.scheme() == "http" || absolute.scheme() == "https" {
        Some(absolute.to_string())
    } else {
        None
    }
}

/// Extracts one JSON object per element matched by an item selector
///
/// Each configured field holds the text of the first descendant matching
/// its selector, or `null`. Every record also carries `page_number`.
#[derive(Debug, Clone)]
pub struct SelectorExtractor {
    item: Selector,
    fields: Vec<(String, Selector)>,
}

impl SelectorExtractor {
    pub fn new(
        item_selector: &str,
        fields: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, ExtractError> {
        Ok(Self {
            item: parse_selector(item_selector)?,
            fields: compile_fields(fields)?,
        })
    }

    pub fn from_source(source: &SourceConfig) -> Result<Self, ConfigError> {
        Self::new(&source.item_selector, source.fields.clone())
            .map_err(|e| ConfigError::InvalidSelector(e.to_string()))
    }

    fn items<'a>(&'a self, document: &'a Html) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        document.select(&self.item)
    }

    fn record(&self, item: ElementRef<'_>, page: u32) -> Value {
        let mut record = Map::new();
        for (name, selector) in &self.fields {
            let value = item
                .select(selector)
                .next()
                .map(|element| Value::String(element_text(element)))
                .unwrap_or(Value::Null);
            record.insert(name.clone(), value);
        }
        record.insert("page_number".to_string(), Value::from(page));
        Value::Object(record)
    }
}

impl Extractor for SelectorExtractor {
    type Record = Value;

    fn extract(&self, document: &Html, page: u32) -> Result<Vec<Value>, ExtractError> {
        Ok(self
            .items(document)
            .map(|item| self.record(item, page))
            .collect())
    }
}

/// Selector extractor that also yields the detail link of every item
///
/// The link is the `href` of the first descendant matching the link
/// selector, or of the item itself when the item carries an `href`.
#[derive(Debug, Clone)]
pub struct LinkedSelectorExtractor {
    inner: SelectorExtractor,
    link: Selector,
    base_url: Url,
}

impl LinkedSelectorExtractor {
    pub fn new(inner: SelectorExtractor, link_selector: &str, base_url: Url) -> Result<Self, ExtractError> {
        Ok(Self {
            inner,
            link: parse_selector(link_selector)?,
            base_url,
        })
    }

    pub fn from_source(source: &SourceConfig) -> Result<Self, ConfigError> {
        let link_selector = source.link_selector.as_deref().ok_or_else(|| {
            ConfigError::Validation(format!("Source '{}' has no link-selector", source.name))
        })?;
        let base_url = Url::parse(&source.url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", source.url, e)))?;

        Self::new(SelectorExtractor::from_source(source)?, link_selector, base_url)
            .map_err(|e| ConfigError::InvalidSelector(e.to_string()))
    }

    fn link_of(&self, item: ElementRef<'_>) -> Option<String> {
        item.select(&self.link)
            .next()
            .and_then(|element| element.value().attr("href"))
            .or_else(|| item.value().attr("href"))
            .and_then(|href| resolve_link(href, &self.base_url))
    }
}

impl Extractor for LinkedSelectorExtractor {
    type Record = EnrichmentTask<Value>;

    fn extract(&self, document: &Html, page: u32) -> Result<Vec<Self::Record>, ExtractError> {
        Ok(self
            .inner
            .items(document)
            .map(|item| EnrichmentTask {
                primary: self.inner.record(item, page),
                secondary_url: self.link_of(item),
            })
            .collect())
    }
}

/// Text that marks a detail field as unavailable
pub const UNKNOWN: &str = "Unknown";

/// Detail extractor mapping field selectors over a whole detail page
///
/// Fields with no match are reported as [`UNKNOWN`]; the placeholder sets
/// every field to [`UNKNOWN`].
#[derive(Debug, Clone)]
pub struct SelectorDetail {
    fields: Vec<(String, Selector)>,
}

impl SelectorDetail {
    pub fn new(fields: impl IntoIterator<Item = (String, String)>) -> Result<Self, ExtractError> {
        Ok(Self {
            fields: compile_fields(fields)?,
        })
    }

    pub fn from_source(source: &SourceConfig) -> Result<Self, ConfigError> {
        Self::new(source.detail_fields.clone())
            .map_err(|e| ConfigError::InvalidSelector(e.to_string()))
    }
}

impl DetailExtractor for SelectorDetail {
    type Detail = Value;

    fn extract(&self, document: &Html) -> Result<Value, ExtractError> {
        let mut detail = Map::new();
        for (name, selector) in &self.fields {
            let text = document
                .select(selector)
                .next()
                .map(element_text)
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| UNKNOWN.to_string());
            detail.insert(name.clone(), Value::String(text));
        }
        Ok(Value::Object(detail))
    }

    fn placeholder(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(name, _)| (name.clone(), Value::String(UNKNOWN.to_string())))
                .collect(),
        )
    }
}
