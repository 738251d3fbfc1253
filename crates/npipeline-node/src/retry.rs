//! Per-node retry policy (spec §3 `RetryDelayConfiguration`, §4.5): pairs
//! a validated [`npipeline_retry::RetryDelayConfig`] with the attempt
//! budget the resilient wrapper around node execution enforces before
//! escalating to `RetryExhausted` (spec §8 scenario 7: "with
//! `maxAttempts=3`").

use npipeline_retry::RetryDelayConfig;

/// A node's resilience attribute: how to wait between retries, and how
/// many attempts to allow before giving up.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    delay: RetryDelayConfig,
    max_attempts: u32,
}

impl RetryPolicy {
    /// Pairs `delay` with `max_attempts` (must be ≥ 1; an attempt budget of
    /// 1 means "try once, no retries").
    #[must_use]
    pub fn new(delay: RetryDelayConfig, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts: max_attempts.max(1),
        }
    }

    /// The validated delay configuration.
    #[must_use]
    pub fn delay(&self) -> &RetryDelayConfig {
        &self.delay
    }

    /// Maximum number of attempts (including the first) before the
    /// resilient wrapper raises `RetryExhausted`.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}
