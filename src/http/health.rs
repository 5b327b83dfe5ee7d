//! Upstream health probe

use crate::http::client::HttpClient;
use serde::Serialize;
use std::time::Duration;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of probing one site
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteHealth {
    pub site: String,
    pub healthy: bool,
    /// `None` when no response was received at all
    pub status: Option<u16>,
}

/// Probes each site once with a short timeout
///
/// A site is healthy only when it answers 200.
pub async fn check_health(client: &HttpClient, sites: &[String]) -> Vec<SiteHealth> {
    let mut results = Vec::with_capacity(sites.len());

    for site in sites {
        let health = match client.get_status(site, Some(HEALTH_TIMEOUT)).await {
            Ok(status) => SiteHealth {
                site: site.clone(),
                healthy: status == 200,
                status: Some(status),
            },
            Err(e) => {
                tracing::warn!("Health check failed for {}: {}", site, e);
                SiteHealth {
                    site: site.clone(),
                    healthy: false,
                    status: None,
                }
            }
        };
        results.push(health);
    }

    results
}
