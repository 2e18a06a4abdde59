use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use rlimit::{RateLimitHooks, RateLimitInfo};
use rprovider::{ClassifiedError, ProviderId, ProviderOperationHooks};

/// Runs provider hooks so a panicking observer cannot fail the call it watches.
pub struct SafeProviderHooks<H> {
    inner: H,
}

impl<H> SafeProviderHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ProviderOperationHooks for SafeProviderHooks<H>
where
    H: ProviderOperationHooks,
{
    fn on_attempt_start(&self, provider: &ProviderId, operation: &str, attempt: u32) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_attempt_start(provider, operation, attempt)
        }));
    }

    fn on_retry_scheduled(
        &self,
        provider: &ProviderId,
        operation: &str,
        attempt: u32,
        delay: Duration,
        error: &ClassifiedError,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_retry_scheduled(provider, operation, attempt, delay, error)
        }));
    }

    fn on_success(&self, provider: &ProviderId, operation: &str, attempts: u32) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_success(provider, operation, attempts)
        }));
    }

    fn on_failure(
        &self,
        provider: &ProviderId,
        operation: &str,
        attempts: u32,
        error: &ClassifiedError,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_failure(provider, operation, attempts, error)
        }));
    }
}

pub struct SafeRateLimitHooks<H> {
    inner: H,
}

impl<H> SafeRateLimitHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> RateLimitHooks for SafeRateLimitHooks<H>
where
    H: RateLimitHooks,
{
    fn on_limit_exceeded(&self, key: &str, info: &RateLimitInfo) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_limit_exceeded(key, info)
        }));
    }

    fn on_cleanup(&self, removed: usize, remaining: usize) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_cleanup(removed, remaining)
        }));
    }
}
