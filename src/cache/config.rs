/// Cache configuration per query kind
///
/// TTLs and capacities tuned per accessor: stream lookups use a short TTL
/// because balances and withdrawals move constantly. Each accessor owns its
/// cache instance; nothing is shared across kinds.
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Default time-to-live for cached entries
    pub ttl: Duration,

    /// Maximum number of entries (LRU eviction when exceeded)
    pub capacity: usize,
}

impl CacheConfig {
    /// Streams keyed by recipient wallet
    pub fn streams_by_recipient() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            capacity: 1000,
        }
    }

    /// Streams keyed by token mint
    pub fn streams_by_mint() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            capacity: 1000,
        }
    }

    /// Custom configuration; capacity is clamped to at least one entry
    pub fn custom(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
        }
    }
}
