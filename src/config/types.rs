use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure for vlr-harvest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub harvest: HarvestDefaults,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceConfig>,
}

impl Config {
    /// Looks up a configured source by name
    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }
}

/// Outbound client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Default per-request timeout ceiling (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Connect timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Maximum number of requests in flight across all harvests
    #[serde(rename = "max-connections")]
    pub max_connections: usize,

    /// Maximum number of idle pooled connections per host
    #[serde(rename = "max-idle-per-host")]
    pub max_idle_per_host: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("vlr-harvest/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_connections: 20,
            max_idle_per_host: 10,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Retry settings applied when a caller does not override them
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarvestDefaults {
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Delay between successful page fetches (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,

    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,
}

impl Default for HarvestDefaults {
    fn default() -> Self {
        Self {
            max_retries: 3,
            request_delay_ms: 1000,
            timeout_secs: 30,
        }
    }
}

/// Bounds a harvest request must fall within before any network activity
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest page window a single request may ask for
    #[serde(rename = "max-page-window")]
    pub max_page_window: u32,

    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    #[serde(rename = "min-request-delay-ms")]
    pub min_request_delay_ms: u64,

    #[serde(rename = "max-request-delay-ms")]
    pub max_request_delay_ms: u64,

    #[serde(rename = "min-timeout-secs")]
    pub min_timeout_secs: u64,

    #[serde(rename = "max-timeout-secs")]
    pub max_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_page_window: 100,
            max_retries: 5,
            min_request_delay_ms: 500,
            max_request_delay_ms: 5000,
            min_timeout_secs: 10,
            max_timeout_secs: 120,
        }
    }
}

/// Cache sizing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum entries held per TTL namespace
    #[serde(rename = "max-entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_entries: 1000 }
    }
}

/// One harvestable content type
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Logical content name, also the cache namespace prefix
    pub name: String,

    /// URL of page 1
    pub url: String,

    /// How long a harvest result stays fresh (seconds)
    #[serde(rename = "ttl-secs")]
    pub ttl_secs: u64,

    /// Query parameter carrying the page number on pages after the first
    #[serde(rename = "page-param", default)]
    pub page_param: Option<String>,

    /// CSS selector matching one record per element
    #[serde(rename = "item-selector")]
    pub item_selector: String,

    /// Record field name to CSS selector, evaluated inside each item
    #[serde(default)]
    pub fields: BTreeMap<String, String>,

    /// Selector of the element whose `href` leads to the detail page.
    /// When present the source is harvested with the enrichment step.
    #[serde(rename = "link-selector", default)]
    pub link_selector: Option<String>,

    /// Detail field name to CSS selector, evaluated on the detail page
    #[serde(rename = "detail-fields", default)]
    pub detail_fields: BTreeMap<String, String>,
}

impl SourceConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn is_enriched(&self) -> bool {
        self.link_selector.is_some()
    }
}
