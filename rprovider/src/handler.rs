//! Error handler bundling a retry policy, a classifier, and hooks.
//!
//! ```rust
//! use rprovider::{ErrorCategory, ErrorHandler, ProviderId, RetryPolicy};
//!
//! let handler = ErrorHandler::new(RetryPolicy::without_retries());
//! let error = handler.process_error("HTTP 429 Too Many Requests", &ProviderId::Google, None);
//!
//! assert_eq!(error.category, ErrorCategory::RateLimit);
//! assert!(error.retryable);
//! ```

use std::future::Future;
use std::sync::Arc;

use rcommon::SharedClock;

use crate::{
    ClassifiedError, ErrorClassifier, ErrorContext, NoopOperationHooks, ProviderId,
    ProviderOperationHooks, RawError, RetryPolicy, RetryScope, execute_with_retry,
};

#[derive(Clone)]
pub struct ErrorHandler {
    policy: RetryPolicy,
    classifier: ErrorClassifier,
    hooks: Arc<dyn ProviderOperationHooks>,
}

impl ErrorHandler {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            classifier: policy.classifier(),
            policy,
            hooks: Arc::new(NoopOperationHooks),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.classifier = self.classifier.with_clock(clock);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    pub fn process_error(
        &self,
        error: impl Into<RawError>,
        provider: &ProviderId,
        context: Option<ErrorContext>,
    ) -> ClassifiedError {
        self.classifier.classify(error, provider, context)
    }

    /// Retries a zero-argument operation, sleeping on the tokio timer between
    /// attempts. There is no cancellation: wrap `operation` in a timeout to
    /// bound it.
    pub async fn execute_with_retry<T, E, F, Fut>(
        &self,
        provider: &ProviderId,
        context: Option<ErrorContext>,
        operation: F,
    ) -> Result<T, ClassifiedError>
    where
        E: Into<RawError>,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_labeled(provider, "execute", context, operation)
            .await
    }

    pub async fn execute_labeled<T, E, F, Fut>(
        &self,
        provider: &ProviderId,
        operation_name: &str,
        context: Option<ErrorContext>,
        mut operation: F,
    ) -> Result<T, ClassifiedError>
    where
        E: Into<RawError>,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        execute_with_retry(
            RetryScope::new(provider, operation_name).with_context(context),
            &self.policy,
            &self.classifier,
            self.hooks.as_ref(),
            |_| operation(),
            tokio::time::sleep,
        )
        .await
    }
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
