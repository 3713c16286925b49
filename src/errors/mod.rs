/// Structured error handling for the resilient query layer.
///
/// Three families, matching the decision points of the layer:
/// - `ConfigurationError`: fatal at construction, never retried
/// - `UpstreamError`: transient transport failures, retried up to the policy limit
/// - `StoreError`: document store failures, surfaced per-operation
use std::fmt;

pub type DashResult<T> = Result<T, DashboardError>;

// =============================================================================
// MAIN ERROR TYPE
// =============================================================================

#[derive(Debug, Clone)]
pub enum DashboardError {
    /// Missing or invalid configuration (fatal, surfaced at construction)
    Configuration(ConfigurationError),

    /// Upstream transport failures (candidates for retry)
    Upstream(UpstreamError),

    /// Document store failures
    Store(StoreError),
}

impl fmt::Display for DashboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardError::Configuration(e) => write!(f, "Configuration Error: {}", e),
            DashboardError::Upstream(e) => write!(f, "Upstream Error: {}", e),
            DashboardError::Store(e) => write!(f, "Store Error: {}", e),
        }
    }
}

impl std::error::Error for DashboardError {}

impl DashboardError {
    /// Whether a retry policy may usefully re-run the failed operation.
    ///
    /// Only transient upstream failures qualify; configuration and store
    /// errors are deterministic and retrying them wastes attempts.
    pub fn is_retryable(&self) -> bool {
        match self {
            DashboardError::Upstream(e) => e.is_retryable(),
            DashboardError::Configuration(_) => false,
            DashboardError::Store(_) => false,
        }
    }
}

impl From<ConfigurationError> for DashboardError {
    fn from(e: ConfigurationError) -> Self {
        DashboardError::Configuration(e)
    }
}

impl From<UpstreamError> for DashboardError {
    fn from(e: UpstreamError) -> Self {
        DashboardError::Upstream(e)
    }
}

impl From<StoreError> for DashboardError {
    fn from(e: StoreError) -> Self {
        DashboardError::Store(e)
    }
}

// =============================================================================
// CONFIGURATION ERROR TYPES
// =============================================================================

#[derive(Debug, Clone)]
pub enum ConfigurationError {
    MissingConfig { field: String },
    InvalidConfig { field: String, reason: String },
    InvalidUrl { url: String, error: String },
    FileNotFound { path: String },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::MissingConfig { field } => {
                write!(f, "Missing required config field '{}'", field)
            }
            ConfigurationError::InvalidConfig { field, reason } => {
                write!(f, "Invalid config field '{}': {}", field, reason)
            }
            ConfigurationError::InvalidUrl { url, error } => {
                write!(f, "Invalid URL '{}': {}", url, error)
            }
            ConfigurationError::FileNotFound { path } => {
                write!(f, "Config file not found: {}", path)
            }
        }
    }
}

// =============================================================================
// UPSTREAM ERROR TYPES
// =============================================================================

#[derive(Debug, Clone)]
pub enum UpstreamError {
    HttpStatus {
        endpoint: String,
        status: u16,
        body: Option<String>,
    },
    Network {
        endpoint: String,
        error: String,
    },
    MalformedResponse {
        endpoint: String,
        error: String,
    },
    ClientBuild {
        error: String,
    },
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamError::HttpStatus {
                endpoint,
                status,
                body,
            } => {
                write!(
                    f,
                    "HTTP {} from {}: {}",
                    status,
                    endpoint,
                    body.as_deref().unwrap_or("No body")
                )
            }
            UpstreamError::Network { endpoint, error } => {
                write!(f, "Network failure reaching {}: {}", endpoint, error)
            }
            UpstreamError::MalformedResponse { endpoint, error } => {
                write!(f, "Malformed response from {}: {}", endpoint, error)
            }
            UpstreamError::ClientBuild { error } => {
                write!(f, "Failed to build HTTP client: {}", error)
            }
        }
    }
}

impl UpstreamError {
    pub fn is_retryable(&self) -> bool {
        match self {
            // Server-side failures and rate limiting are worth re-attempting
            UpstreamError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            UpstreamError::Network { .. } => true,
            // A payload we cannot parse will not parse better next time
            UpstreamError::MalformedResponse { .. } => false,
            UpstreamError::ClientBuild { .. } => false,
        }
    }
}

// =============================================================================
// STORE ERROR TYPES
// =============================================================================

#[derive(Debug, Clone)]
pub enum StoreError {
    /// Patch/replace target does not exist
    NotFound { id: String, partition_key: String },

    /// Create collided with an existing (id, partition_key)
    Conflict { id: String, partition_key: String },

    /// Underlying database failure
    Database { message: String },

    /// Stored document body could not be serialized or deserialized
    Serialization { message: String },

    /// Patch operation referenced a path that cannot be written
    InvalidPatch { path: String, reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { id, partition_key } => {
                write!(f, "Document not found: ({}, {})", id, partition_key)
            }
            StoreError::Conflict { id, partition_key } => {
                write!(f, "Document already exists: ({}, {})", id, partition_key)
            }
            StoreError::Database { message } => write!(f, "Database failure: {}", message),
            StoreError::Serialization { message } => {
                write!(f, "Document serialization failure: {}", message)
            }
            StoreError::InvalidPatch { path, reason } => {
                write!(f, "Invalid patch at '{}': {}", path, reason)
            }
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization {
            message: e.to_string(),
        }
    }
}
