//! Metrics-based observability hooks for provider retries and rate limiting.
//!
//! ```rust
//! use robserve::MetricsObservabilityHooks;
//! use rprovider::ProviderOperationHooks;
//!
//! fn accepts_provider_hooks(_hooks: &dyn ProviderOperationHooks) {}
//!
//! let hooks = MetricsObservabilityHooks;
//! accepts_provider_hooks(&hooks);
//! ```

use std::time::Duration;

use rlimit::{RateLimitHooks, RateLimitInfo};
use rprovider::{ClassifiedError, ProviderId, ProviderOperationHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl ProviderOperationHooks for MetricsObservabilityHooks {
    fn on_attempt_start(&self, provider: &ProviderId, operation: &str, _attempt: u32) {
        metrics::counter!(
            "relaykit_provider_attempt_start_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    fn on_retry_scheduled(
        &self,
        provider: &ProviderId,
        operation: &str,
        _attempt: u32,
        delay: Duration,
        error: &ClassifiedError,
    ) {
        metrics::counter!(
            "relaykit_provider_retry_scheduled_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string(),
            "category" => error.category.as_str()
        )
        .increment(1);
        metrics::histogram!(
            "relaykit_provider_retry_delay_seconds",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .record(delay.as_secs_f64());
    }

    fn on_success(&self, provider: &ProviderId, operation: &str, attempts: u32) {
        metrics::counter!(
            "relaykit_provider_success_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "relaykit_provider_attempts_per_success",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .record(attempts as f64);
    }

    fn on_failure(
        &self,
        provider: &ProviderId,
        operation: &str,
        attempts: u32,
        error: &ClassifiedError,
    ) {
        metrics::counter!(
            "relaykit_provider_failure_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string(),
            "category" => error.category.as_str(),
            "retryable" => error.retryable.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "relaykit_provider_attempts_per_failure",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .record(attempts as f64);
    }
}

impl RateLimitHooks for MetricsObservabilityHooks {
    fn on_limit_exceeded(&self, _key: &str, _info: &RateLimitInfo) {
        metrics::counter!("relaykit_rate_limit_exceeded_total").increment(1);
    }

    fn on_cleanup(&self, removed: usize, remaining: usize) {
        metrics::counter!("relaykit_rate_limit_cleanup_removed_total").increment(removed as u64);
        metrics::gauge!("relaykit_rate_limit_tracked_keys").set(remaining as f64);
    }
}
