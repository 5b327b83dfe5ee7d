use crate::cache::key::CacheKey;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// One cached value with its expiry and recency stamp
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    last_used: u64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Expiring map for a single TTL
#[derive(Debug)]
struct Namespace<V> {
    entries: HashMap<CacheKey, CacheEntry<V>>,
    clock: u64,
}

impl<V> Namespace<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            clock: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn purge_expired(&mut self, now: Instant) {
        self.entries.retain(|_, entry| !entry.is_expired(now));
    }

    fn evict_least_recently_used(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            tracing::debug!("Cache full, evicting {}", key);
            self.entries.remove(&key);
        }
    }
}

/// In-memory TTL cache with one independent map per TTL value
///
/// Entries are invisible to `get` once `ttl` has elapsed since insertion and
/// are removed lazily. Each map holds at most `max_entries` entries and
/// evicts the least recently used one when full. All methods take `&self`
/// and are safe to call from concurrent harvests.
#[derive(Debug)]
pub struct CacheStore<V> {
    max_entries: usize,
    namespaces: Mutex<HashMap<Duration, Namespace<V>>>,
}

impl<V: Clone> CacheStore<V> {
    /// Creates an empty store
    ///
    /// # Arguments
    ///
    /// * `max_entries` - Per-namespace capacity; zero is treated as one
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            namespaces: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Duration, Namespace<V>>> {
        self.namespaces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the live value for `key` in the `ttl` namespace
    ///
    /// An expired entry is removed on the way out. A hit marks the entry as
    /// most recently used.
    ///
    /// # Arguments
    ///
    /// * `ttl` - Lifetime that selects the namespace
    /// * `key` - The cache key to look up
    ///
    /// # Returns
    ///
    /// A clone of the stored value, or `None` when missing or expired
    pub fn get(&self, ttl: Duration, key: &CacheKey) -> Option<V> {
        let now = Instant::now();
        let mut namespaces = self.lock();
        let namespace = namespaces.get_mut(&ttl)?;
        let stamp = namespace.tick();

        let entry = namespace.entries.get_mut(key)?;
        if !entry.is_expired(now) {
            entry.last_used = stamp;
            return Some(entry.value.clone());
        }

        namespace.entries.remove(key);
        None
    }

    /// Stores `value` under `key`, replacing any previous entry
    ///
    /// When the namespace is full, expired entries are purged first and
    /// the least recently used entry is evicted if that was not enough.
    ///
    /// # Arguments
    ///
    /// * `ttl` - Lifetime of the entry; also selects the namespace
    /// * `key` - The cache key
    /// * `value` - The value to store
    pub fn set(&self, ttl: Duration, key: CacheKey, value: V) {
        let now = Instant::now();
        let mut namespaces = self.lock();
        let namespace = namespaces.entry(ttl).or_insert_with(Namespace::new);
        let stamp = namespace.tick();

        if !namespace.entries.contains_key(&key) && namespace.entries.len() >= self.max_entries {
            namespace.purge_expired(now);
            if namespace.entries.len() >= self.max_entries {
                namespace.evict_least_recently_used();
            }
        }

        namespace.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now + ttl,
                last_used: stamp,
            },
        );
    }

    /// Removes one entry
    ///
    /// # Returns
    ///
    /// `true` if an entry (live or expired) was present
    pub fn invalidate(&self, ttl: Duration, key: &CacheKey) -> bool {
        self.lock()
            .get_mut(&ttl)
            .map(|namespace| namespace.entries.remove(key).is_some())
            .unwrap_or(false)
    }

    /// Empties every namespace
    pub fn clear_all(&self) {
        for namespace in self.lock().values_mut() {
            namespace.entries.clear();
        }
    }

    /// Number of stored entries across all namespaces, expired ones included
    pub fn len(&self) -> usize {
        self.lock().values().map(|ns| ns.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for CacheStore<V> {
    fn default() -> Self {
        Self::new(1000)
    }
}
