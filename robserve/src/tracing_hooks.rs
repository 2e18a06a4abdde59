//! Tracing-based observability hooks for provider retries and rate limiting.
//!
//! ```rust
//! use robserve::TracingObservabilityHooks;
//! use rlimit::RateLimitHooks;
//!
//! fn accepts_limit_hooks(_hooks: &dyn RateLimitHooks) {}
//!
//! let hooks = TracingObservabilityHooks;
//! accepts_limit_hooks(&hooks);
//! ```

use std::time::Duration;

use rlimit::{RateLimitHooks, RateLimitInfo};
use rprovider::{ClassifiedError, ProviderId, ProviderOperationHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservabilityHooks;

impl ProviderOperationHooks for TracingObservabilityHooks {
    fn on_attempt_start(&self, provider: &ProviderId, operation: &str, attempt: u32) {
        tracing::info!(
            phase = "provider",
            event = "attempt_start",
            provider = %provider,
            operation,
            attempt
        );
    }

    fn on_retry_scheduled(
        &self,
        provider: &ProviderId,
        operation: &str,
        attempt: u32,
        delay: Duration,
        error: &ClassifiedError,
    ) {
        tracing::warn!(
            phase = "provider",
            event = "retry_scheduled",
            provider = %provider,
            operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            category = %error.category,
            severity = ?error.severity,
            retryable = error.retryable,
            error = %error.message
        );
    }

    fn on_success(&self, provider: &ProviderId, operation: &str, attempts: u32) {
        tracing::info!(
            phase = "provider",
            event = "success",
            provider = %provider,
            operation,
            attempts
        );
    }

    fn on_failure(
        &self,
        provider: &ProviderId,
        operation: &str,
        attempts: u32,
        error: &ClassifiedError,
    ) {
        tracing::error!(
            phase = "provider",
            event = "failure",
            provider = %provider,
            operation,
            attempts,
            category = %error.category,
            severity = ?error.severity,
            retryable = error.retryable,
            error = %error.message
        );
    }
}

impl RateLimitHooks for TracingObservabilityHooks {
    fn on_limit_exceeded(&self, key: &str, info: &RateLimitInfo) {
        tracing::warn!(
            phase = "rate_limit",
            event = "limit_exceeded",
            key,
            limit = info.limit,
            current = info.current,
            reset_time = %info.reset_time
        );
    }

    fn on_cleanup(&self, removed: usize, remaining: usize) {
        tracing::debug!(
            phase = "rate_limit",
            event = "cleanup",
            removed,
            remaining
        );
    }
}
