//! Resilient query layer for the risk dashboard.
//!
//! Three building blocks, composed per accessor:
//! - a bounded TTL cache with LRU eviction ([`cache`])
//! - a shared retry policy for upstream calls ([`retry`])
//! - stream query accessors that read through the cache ([`streams`])
//!
//! plus the partitioned knowledge store with similarity-ranked retrieval
//! ([`documents`]). Caches and policies are constructed explicitly at
//! startup and injected; nothing in this crate is a global.

pub mod cache;
pub mod config;
pub mod constants;
pub mod documents;
pub mod errors;
pub mod retry;
pub mod streams;

pub use cache::{CacheConfig, CacheManager, CacheMetrics};
pub use config::DashboardConfig;
pub use documents::{KnowledgeDocument, KnowledgeStore, PatchOperation, ScoredDocument};
pub use errors::{DashResult, DashboardError};
pub use retry::{Backoff, RetryPolicy};
pub use streams::{HttpStreamsClient, StreamAccessor, StreamQuery, StreamRecord};
