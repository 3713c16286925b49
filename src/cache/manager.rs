/// Generic in-memory cache with per-entry TTL and LRU eviction
///
/// Thread-safe, generic over key/value types. Tracks metrics for monitoring.
/// Expired entries are dropped lazily on the access that discovers them;
/// capacity eviction always removes the least recently used entry, expired
/// or not.
use super::config::CacheConfig;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cache entry with its own absolute expiry
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Cache metrics for monitoring
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub inserts: u64,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Bounded TTL cache with least-recently-used eviction
pub struct CacheManager<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    config: CacheConfig,
    data: Arc<RwLock<HashMap<K, CacheEntry<V>>>>,
    access_order: Arc<RwLock<VecDeque<K>>>, // For LRU tracking
    metrics: Arc<RwLock<CacheMetrics>>,
}

impl<K, V> CacheManager<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Create new cache with given configuration
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            data: Arc::new(RwLock::new(HashMap::new())),
            access_order: Arc::new(RwLock::new(VecDeque::new())),
            metrics: Arc::new(RwLock::new(CacheMetrics::default())),
        }
    }

    /// Get value from cache (returns None if expired or missing)
    ///
    /// A hit marks the entry most recently used. An expired entry is
    /// removed and counted as a miss.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut data = self.data.write();

        if let Some(entry) = data.get(key) {
            if entry.is_expired() {
                data.remove(key);
                self.remove_from_access_order(key);

                let mut metrics = self.metrics.write();
                metrics.misses += 1;
                metrics.expirations += 1;

                return None;
            }

            self.update_access_order(key);

            let mut metrics = self.metrics.write();
            metrics.hits += 1;

            Some(entry.value.clone())
        } else {
            let mut metrics = self.metrics.write();
            metrics.misses += 1;
            None
        }
    }

    /// Insert value with the config-level default TTL
    pub fn insert(&self, key: K, value: V) {
        self.insert_with_ttl(key, value, self.config.ttl);
    }

    /// Insert value with an explicit TTL (evicts LRU if at capacity)
    ///
    /// Overwriting an existing key resets that entry's expiry and recency
    /// without touching any other entry.
    pub fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let mut data = self.data.write();

        if data.len() >= self.config.capacity && !data.contains_key(&key) {
            self.evict_lru(&mut data);
        }

        data.insert(key.clone(), CacheEntry::new(value, ttl));
        self.update_access_order(&key);

        let mut metrics = self.metrics.write();
        metrics.inserts += 1;
    }

    /// Remove specific key from cache
    pub fn remove(&self, key: &K) {
        let mut data = self.data.write();
        data.remove(key);
        self.remove_from_access_order(key);
    }

    /// Clear all entries
    pub fn clear(&self) {
        let mut data = self.data.write();
        data.clear();

        let mut access_order = self.access_order.write();
        access_order.clear();
    }

    /// Get current metrics
    pub fn metrics(&self) -> CacheMetrics {
        self.metrics.read().clone()
    }

    /// Get current cache size
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Private: Evict least recently used entry
    fn evict_lru(&self, data: &mut HashMap<K, CacheEntry<V>>) {
        let mut access_order = self.access_order.write();

        if let Some(lru_key) = access_order.pop_front() {
            data.remove(&lru_key);

            let mut metrics = self.metrics.write();
            metrics.evictions += 1;
        }
    }

    // Private: Update access order for LRU tracking
    fn update_access_order(&self, key: &K) {
        let mut access_order = self.access_order.write();

        // Remove from current position, reinsert at the back (most recent)
        access_order.retain(|k| k != key);
        access_order.push_back(key.clone());
    }

    // Private: Remove key from access order
    fn remove_from_access_order(&self, key: &K) {
        let mut access_order = self.access_order.write();
        access_order.retain(|k| k != key);
    }
}
