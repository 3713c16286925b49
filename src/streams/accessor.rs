/// Upstream query accessor: cache in front of a retrying transport
///
/// Per call: cache hit returns immediately; cache miss runs the upstream
/// query under the retry policy, defensively filters the result, and
/// write-throughs on success. Failures are never cached, so the next call
/// retries from scratch. Concurrent misses for the same key each hit the
/// upstream independently; the queries are read-only, so the duplicated
/// work is accepted.
use crate::cache::{CacheConfig, CacheManager, CacheMetrics};
use crate::errors::DashResult;
use crate::retry::RetryPolicy;
use crate::streams::client::StreamsTransport;
use crate::streams::types::{StreamQuery, StreamRecord};
use log::debug;

pub struct StreamAccessor<T: StreamsTransport> {
    transport: T,
    cache: CacheManager<String, Vec<StreamRecord>>,
    retry: RetryPolicy,
}

impl<T: StreamsTransport> StreamAccessor<T> {
    /// The accessor owns its cache; one instance per query-kind family,
    /// constructed at service startup and injected where needed.
    pub fn new(transport: T, cache_config: CacheConfig, retry: RetryPolicy) -> Self {
        Self {
            transport,
            cache: CacheManager::new(cache_config),
            retry,
        }
    }

    /// Accessor with the standard recipient-lookup cache preset
    pub fn for_recipients(transport: T, retry: RetryPolicy) -> Self {
        Self::new(transport, CacheConfig::streams_by_recipient(), retry)
    }

    /// Accessor with the standard mint-lookup cache preset
    pub fn for_mints(transport: T, retry: RetryPolicy) -> Self {
        Self::new(transport, CacheConfig::streams_by_mint(), retry)
    }

    pub async fn streams_by_recipient(&self, recipient: &str) -> DashResult<Vec<StreamRecord>> {
        self.get_streams(&StreamQuery::ByRecipient(recipient.to_string()))
            .await
    }

    pub async fn streams_by_mint(&self, mint: &str) -> DashResult<Vec<StreamRecord>> {
        self.get_streams(&StreamQuery::ByMint(mint.to_string()))
            .await
    }

    pub async fn get_streams(&self, query: &StreamQuery) -> DashResult<Vec<StreamRecord>> {
        let key = query.cache_key();

        if let Some(cached) = self.cache.get(&key) {
            debug!("Cache hit for {}", key);
            return Ok(cached);
        }

        let records = self
            .retry
            .run(query.label(), || self.transport.fetch_streams(query))
            .await?;

        let valid = Self::filter_valid(query, records);

        self.cache.insert(key, valid.clone());
        Ok(valid)
    }

    pub fn cache_metrics(&self) -> CacheMetrics {
        self.cache.metrics()
    }

    /// Drop records the upstream should not have returned: missing ids and
    /// near-matches on the queried field.
    fn filter_valid(query: &StreamQuery, records: Vec<StreamRecord>) -> Vec<StreamRecord> {
        let total = records.len();
        let valid: Vec<StreamRecord> = records
            .into_iter()
            .filter(|r| !r.id.is_empty() && query.matches(r))
            .collect();

        if valid.len() < total {
            debug!(
                "Filtered {} invalid upstream records for {}",
                total - valid.len(),
                query.cache_key()
            );
        }

        valid
    }
}
