/// Dashboard configuration
///
/// Loaded once at service startup from a TOML file or from environment
/// variables, then validated before any accessor or store is constructed.
/// A missing upstream endpoint is fatal here, not at call time.
use crate::cache::CacheConfig;
use crate::constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_UPSTREAM_TIMEOUT_SECS};
use crate::errors::{ConfigurationError, DashResult};
use crate::retry::{Backoff, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the streams API
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database path; omitted means an in-memory store
    #[serde(default)]
    pub database_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    pub max_entries: usize,
    pub ttl_seconds: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            ttl_seconds: 60,
        }
    }
}

impl CacheSettings {
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig::custom(Duration::from_secs(self.ttl_seconds), self.max_entries)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: u32,
    /// 0 disables backoff; otherwise linear `base * attempt`
    pub backoff_base_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base_ms: 500,
        }
    }
}

impl RetrySettings {
    pub fn to_policy(&self) -> RetryPolicy {
        let backoff = if self.backoff_base_ms == 0 {
            Backoff::None
        } else {
            Backoff::Linear {
                base: Duration::from_millis(self.backoff_base_ms),
            }
        };
        RetryPolicy::new(self.max_attempts, backoff)
    }
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_UPSTREAM_TIMEOUT_SECS
}

impl DashboardConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> DashResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|_| ConfigurationError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigurationError::InvalidConfig {
                field: "config".to_string(),
                reason: e.to_string(),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Build configuration from `RISKDASH_*` environment variables
    pub fn from_env() -> DashResult<Self> {
        let endpoint = std::env::var("RISKDASH_UPSTREAM_ENDPOINT").unwrap_or_default();
        let api_key = std::env::var("RISKDASH_UPSTREAM_API_KEY").ok();
        let database_path = std::env::var("RISKDASH_STORE_PATH").ok();

        let config = Self {
            upstream: UpstreamConfig {
                endpoint,
                api_key,
                timeout_seconds: default_timeout_seconds(),
            },
            store: StoreConfig { database_path },
            cache: CacheSettings::default(),
            retry: RetrySettings::default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Fail-fast validation, run before anything touches the network
    pub fn validate(&self) -> DashResult<()> {
        if self.upstream.endpoint.trim().is_empty() {
            return Err(ConfigurationError::MissingConfig {
                field: "upstream.endpoint".to_string(),
            }
            .into());
        }

        url::Url::parse(&self.upstream.endpoint).map_err(|e| ConfigurationError::InvalidUrl {
            url: self.upstream.endpoint.clone(),
            error: e.to_string(),
        })?;

        if self.upstream.timeout_seconds == 0 {
            return Err(ConfigurationError::InvalidConfig {
                field: "upstream.timeout_seconds".to_string(),
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }

        if self.cache.max_entries == 0 {
            return Err(ConfigurationError::InvalidConfig {
                field: "cache.max_entries".to_string(),
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
