/// Reusable retry policy for upstream calls
///
/// One abstraction shared by every accessor: sequential attempts, a fixed
/// maximum, optional linear backoff between failures. The last failure is
/// surfaced on exhaustion, never swallowed. Non-retryable failures
/// (configuration, malformed payloads) stop the loop immediately.
use crate::errors::{DashResult, DashboardError};
use log::{debug, warn};
use std::future::Future;
use std::time::Duration;

/// Inter-attempt delay strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry immediately
    None,

    /// Wait `base * attempt` after the k-th failed attempt
    Linear { base: Duration },
}

impl Backoff {
    /// Delay to apply after failed attempt `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        match self {
            Backoff::None => None,
            Backoff::Linear { base } => Some(*base * attempt),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    /// Create a policy; at least one attempt is always made
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Policy that retries back-to-back with no delay
    pub fn no_backoff(max_attempts: u32) -> Self {
        Self::new(max_attempts, Backoff::None)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `operation` up to `max_attempts` times.
    ///
    /// Returns the first success immediately. Each failure is logged with
    /// the operation name and attempt number. The operation must be safe to
    /// repeat (all upstream queries in this layer are read-only).
    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt_fn: F) -> DashResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DashResult<T>>,
    {
        let mut last_error: Option<DashboardError> = None;

        for attempt in 1..=self.max_attempts {
            match attempt_fn().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}/{}", operation, attempt, self.max_attempts);
                    }
                    return Ok(value);
                }
                Err(e) => {
                    warn!(
                        "{} failed on attempt {}/{}: {}",
                        operation, attempt, self.max_attempts, e
                    );

                    if !e.is_retryable() {
                        return Err(e);
                    }

                    if attempt < self.max_attempts {
                        if let Some(delay) = self.backoff.delay_for(attempt) {
                            tokio::time::sleep(delay).await;
                        }
                    }
                    last_error = Some(e);
                }
            }
        }

        warn!("{} exhausted {} attempts", operation, self.max_attempts);

        // max_attempts >= 1, so at least one error was recorded
        match last_error {
            Some(e) => Err(e),
            None => unreachable!("retry loop ran zero attempts"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::UpstreamError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> DashboardError {
        DashboardError::Upstream(UpstreamError::Network {
            endpoint: "https://api.example.com".to_string(),
            error: "connection reset".to_string(),
        })
    }

    #[tokio::test]
    async fn termination_after_exhaustion() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::no_backoff(3);

        let result: DashResult<()> = policy
            .run("always_fails", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(transient()) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(
            result,
            Err(DashboardError::Upstream(UpstreamError::Network { .. }))
        ));
    }

    #[tokio::test]
    async fn short_circuit_on_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(5, Backoff::Linear { base: Duration::from_millis(1) });

        let result = policy
            .run("flaky", || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(transient())
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_stops_immediately() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::no_backoff(4);

        let result: DashResult<()> = policy
            .run("bad_payload", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(DashboardError::Upstream(UpstreamError::MalformedResponse {
                        endpoint: "https://api.example.com".to_string(),
                        error: "expected array".to_string(),
                    }))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(result.is_err());
    }

    #[test]
    fn linear_backoff_scales_with_attempt() {
        let backoff = Backoff::Linear {
            base: Duration::from_millis(100),
        };
        assert_eq!(backoff.delay_for(1), Some(Duration::from_millis(100)));
        assert_eq!(backoff.delay_for(3), Some(Duration::from_millis(300)));
        assert_eq!(Backoff::None.delay_for(2), None);
    }

    #[test]
    fn zero_attempts_clamped_to_one() {
        let policy = RetryPolicy::no_backoff(0);
        assert_eq!(policy.max_attempts(), 1);
    }
}
