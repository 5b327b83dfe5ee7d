//! vlr-harvest main entry point
//!
//! This is the command-line interface for the harvest engine. Results are
//! written to stdout as JSON; logs go to stderr.

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use vlr_harvest::config::{load_config_with_hash, Config, SourceConfig};
use vlr_harvest::harvest::{
    EnrichedHarvester, Enricher, Harvester, HarvestRequest, LinkedSelectorExtractor,
    OutcomeCache, PageTemplate, RetryPolicy, SelectorDetail, SelectorExtractor,
};
use vlr_harvest::http::{check_health, ConnectionManager};
use vlr_harvest::HarvestError;

/// vlr-harvest: a resilient multi-page harvester
///
/// Harvests a bounded page range of one configured source, retrying failed
/// pages with exponential backoff, and prints the records with a report of
/// which pages succeeded.
#[derive(Parser, Debug)]
#[command(name = "vlr-harvest")]
#[command(version)]
#[command(about = "A resilient multi-page harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Name of the configured source to harvest
    #[arg(value_name = "SOURCE", required_unless_present = "health")]
    source: Option<String>,

    /// Number of pages to harvest when at most one bound is given
    #[arg(short = 'n', long, default_value_t = 1)]
    pages: u32,

    /// First page to harvest (1-based)
    #[arg(long)]
    from: Option<u32>,

    /// Last page to harvest (1-based, inclusive)
    #[arg(long)]
    to: Option<u32>,

    /// Attempts per page (defaults to the config value)
    #[arg(long)]
    max_retries: Option<u32>,

    /// Delay between pages in milliseconds (defaults to the config value)
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Per-request timeout in seconds (defaults to the config value)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Probe the configured source URLs and exit
    #[arg(long)]
    health: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    let connections = Arc::new(ConnectionManager::new(config.http.clone()));

    let result = if cli.health {
        handle_health(&config, &connections).await
    } else {
        handle_harvest(&config, &cli, &connections).await
    };

    connections.release();

    match result {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("vlr_harvest=info,warn"),
            1 => EnvFilter::new("vlr_harvest=debug,info"),
            2 => EnvFilter::new("vlr_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Config defaults overridden by whatever the command line sets
fn retry_policy(config: &Config, cli: &Cli) -> RetryPolicy {
    let defaults = RetryPolicy::from(&config.harvest);
    RetryPolicy {
        max_retries: cli.max_retries.unwrap_or(defaults.max_retries),
        request_delay: cli
            .delay_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.request_delay),
        timeout: cli
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout),
    }
}

/// Renders a result as pretty JSON
fn render<T: Serialize + ?Sized>(value: &T) -> vlr_harvest::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Enriched sources always harvest their single listing page, so a page
/// window on the command line is a mistake rather than something to ignore
fn reject_page_window(cli: &Cli, source_name: &str) -> Result<(), HarvestError> {
    if cli.pages != 1 || cli.from.is_some() || cli.to.is_some() {
        return Err(HarvestError::InvalidRequest(format!(
            "Source '{}' is a single-page listing; --pages, --from and --to do not apply",
            source_name
        )));
    }
    Ok(())
}

fn page_template(source: &SourceConfig) -> Result<PageTemplate, HarvestError> {
    let template = PageTemplate::parse(&source.url)?;
    Ok(match &source.page_param {
        Some(param) => template.with_page_param(param),
        None => template,
    })
}

/// Runs one harvest of the requested source and renders it as JSON
async fn handle_harvest(
    config: &Config,
    cli: &Cli,
    connections: &Arc<ConnectionManager>,
) -> anyhow::Result<String> {
    let name = cli.source.as_deref().unwrap_or_default();
    let source = config
        .source(name)
        .ok_or_else(|| HarvestError::UnknownSource(name.to_string()))?;
    let policy = retry_policy(config, cli);
    let template = page_template(source)?;

    if source.is_enriched() {
        reject_page_window(cli, &source.name)?;
        tracing::info!("Harvesting '{}' with detail enrichment", source.name);

        let enricher = Enricher::new(SelectorDetail::from_source(source)?, policy.timeout);
        let harvester: EnrichedHarvester<Value, _, _> = EnrichedHarvester::new(
            &source.name,
            source.ttl(),
            template,
            LinkedSelectorExtractor::from_source(source)?,
            enricher,
            Arc::clone(connections),
            Arc::new(OutcomeCache::new(config.cache.max_entries)),
        )
        .with_limits(config.limits.clone());

        let outcome = harvester.harvest(&policy).await?;
        return Ok(render(&*outcome)?);
    }

    let request = HarvestRequest {
        page_count: cli.pages,
        from_page: cli.from,
        to_page: cli.to,
        retry: policy,
    };

    let harvester = Harvester::new(
        &source.name,
        source.ttl(),
        template,
        SelectorExtractor::from_source(source)?,
        Arc::clone(connections),
        Arc::new(OutcomeCache::new(config.cache.max_entries)),
    )
    .with_limits(config.limits.clone());

    let outcome = harvester.harvest(&request).await?;
    if outcome.is_partial() {
        tracing::warn!(
            "Partial harvest of '{}': failed pages {:?}",
            source.name,
            outcome.failed_pages()
        );
    }

    Ok(render(&*outcome)?)
}

/// Probes every configured source URL
async fn handle_health(
    config: &Config,
    connections: &Arc<ConnectionManager>,
) -> anyhow::Result<String> {
    let sites: Vec<String> = config.sources.iter().map(|s| s.url.clone()).collect();
    let client = connections.acquire();
    let report = check_health(&client, &sites).await;

    let unhealthy = report.iter().filter(|site| !site.healthy).count();
    tracing::info!("{} of {} sites healthy", report.len() - unhealthy, report.len());

    Ok(render(&report)?)
}
