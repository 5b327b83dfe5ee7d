//! Connection manager owning the single live outbound client

use crate::config::HttpConfig;
use crate::http::client::HttpClient;
use std::sync::{OnceLock, PoisonError, RwLock};

/// Process-wide manager instance
static GLOBAL_MANAGER: OnceLock<ConnectionManager> = OnceLock::new();

/// Lazily builds, shares and releases one [`HttpClient`]
///
/// `acquire` creates the client on first use and after every `release`.
/// Exactly one live client exists per manager; concurrent harvests share it
/// and its connection pool.
#[derive(Debug)]
pub struct ConnectionManager {
    config: HttpConfig,
    slot: RwLock<Option<HttpClient>>,
}

impl ConnectionManager {
    pub fn new(config: HttpConfig) -> Self {
        Self {
            config,
            slot: RwLock::new(None),
        }
    }

    /// Returns the process-wide manager, built from default settings
    pub fn global() -> &'static ConnectionManager {
        GLOBAL_MANAGER.get_or_init(|| ConnectionManager::new(HttpConfig::default()))
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Returns the live client, building one if none exists
    ///
    /// Never fails: if the configured client cannot be built, a client with
    /// reqwest defaults is used and the failure is logged.
    pub fn acquire(&self) -> HttpClient {
        if let Some(client) = self
            .slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return client.clone();
        }

        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);

        // Another acquirer may have won the race for the write lock
        if let Some(client) = slot.as_ref() {
            return client.clone();
        }

        let client = HttpClient::new(&self.config).unwrap_or_else(|e| {
            tracing::warn!("Failed to build configured HTTP client, using defaults: {}", e);
            HttpClient::from_client(reqwest::Client::new(), &self.config)
        });

        tracing::debug!(
            "HTTP client created (max connections: {}, max idle per host: {})",
            self.config.max_connections,
            self.config.max_idle_per_host
        );

        *slot = Some(client.clone());
        client
    }

    /// Drops the live client so the next `acquire` builds a fresh one
    ///
    /// Clones still held by in-flight harvests keep working until they are
    /// dropped. Returns whether a client was live.
    pub fn release(&self) -> bool {
        let released = self
            .slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();

        if released {
            tracing::debug!("HTTP client released");
        }
        released
    }

    pub fn is_live(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(HttpConfig::default())
    }
}
