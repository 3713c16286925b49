/// Shared constants for the query layer

/// User agent sent with every upstream request
pub const USER_AGENT: &str = "RiskDash/0.1";

/// Default upstream request timeout in seconds
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

/// Default retry attempts for upstream queries
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
