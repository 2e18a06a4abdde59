//! Retry/backoff policy, the retry driver, and operational hook contracts.
//!
//! ```rust
//! use std::time::Duration;
//! use rprovider::RetryPolicy;
//!
//! let policy = RetryPolicy::new(3)
//!     .with_base_delay(Duration::from_millis(100))
//!     .with_max_delay(Duration::from_millis(250))
//!     .with_jitter(false);
//!
//! assert_eq!(policy.backoff_for_attempt(1), Duration::from_millis(100));
//! assert_eq!(policy.backoff_for_attempt(2), Duration::from_millis(200));
//! assert_eq!(policy.backoff_for_attempt(3), Duration::from_millis(250));
//! ```

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ClassifiedError, ErrorCategory, ErrorClassifier, ErrorContext, ProviderId, RawError};

/// Retry settings. Deserializing a partial document keeps the defaults for
/// every omitted field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure; `0` disables retries.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub use_jitter: bool,
    /// When set, only these categories are retried.
    pub retryable_errors: Option<Vec<ErrorCategory>>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            use_jitter: true,
            retryable_errors: None,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn without_retries() -> Self {
        Self::new(0)
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay_ms = duration_millis(delay);
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay_ms = duration_millis(delay);
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, use_jitter: bool) -> Self {
        self.use_jitter = use_jitter;
        self
    }

    pub fn with_retryable_errors(mut self, categories: Vec<ErrorCategory>) -> Self {
        self.retryable_errors = Some(categories);
        self
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// `attempt` counts the attempts made so far, starting at 1. The
    /// `retryable_errors` allow-list applies whichever classifier produced
    /// `error`.
    pub fn should_retry(&self, attempt: u32, error: &ClassifiedError) -> bool {
        error.retryable && self.allows(error.category) && attempt <= self.max_retries
    }

    pub fn allows(&self, category: ErrorCategory) -> bool {
        self.retryable_errors
            .as_ref()
            .is_none_or(|categories| categories.contains(&category))
    }

    /// Un-jittered delay before retry `retry` (1-based), capped at `max_delay`.
    pub fn backoff_for_attempt(&self, retry: u32) -> Duration {
        if self.base_delay_ms == 0 {
            return Duration::ZERO;
        }

        let multiplier = if self.backoff_multiplier.is_finite() && self.backoff_multiplier > 0.0 {
            self.backoff_multiplier
        } else {
            1.0
        };
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let unbounded = self.base_delay().as_secs_f64() * multiplier.powi(exponent);
        let cap = self.max_delay();

        if !unbounded.is_finite() {
            return cap;
        }

        Duration::try_from_secs_f64(unbounded)
            .unwrap_or(cap)
            .min(cap)
    }

    /// Delay actually slept before retry `retry`, jittered when enabled.
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        let delay = self.backoff_for_attempt(retry);
        if self.use_jitter {
            apply_jitter(delay, rand::random::<f64>())
        } else {
            delay
        }
    }

    pub fn classifier(&self) -> ErrorClassifier {
        match &self.retryable_errors {
            Some(categories) => ErrorClassifier::new().with_retryable_errors(categories.clone()),
            None => ErrorClassifier::new(),
        }
    }
}

/// Maps `sample` in `[0, 1]` onto `[delay / 2, delay]`.
pub fn apply_jitter(delay: Duration, sample: f64) -> Duration {
    let sample = if sample.is_finite() {
        sample.clamp(0.0, 1.0)
    } else {
        1.0
    };
    let half = delay.as_secs_f64() / 2.0;

    Duration::try_from_secs_f64(half + half * sample)
        .unwrap_or(delay)
        .min(delay)
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

pub trait ProviderOperationHooks: Send + Sync {
    fn on_attempt_start(&self, _provider: &ProviderId, _operation: &str, _attempt: u32) {}

    fn on_retry_scheduled(
        &self,
        _provider: &ProviderId,
        _operation: &str,
        _attempt: u32,
        _delay: Duration,
        _error: &ClassifiedError,
    ) {
    }

    fn on_success(&self, _provider: &ProviderId, _operation: &str, _attempts: u32) {}

    fn on_failure(
        &self,
        _provider: &ProviderId,
        _operation: &str,
        _attempts: u32,
        _error: &ClassifiedError,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOperationHooks;

impl ProviderOperationHooks for NoopOperationHooks {}

/// What a retried call is about: who is called, under which label, and the
/// context attached to every classification it produces.
#[derive(Debug, Clone)]
pub struct RetryScope<'a> {
    pub provider: &'a ProviderId,
    pub operation: &'a str,
    pub context: Option<ErrorContext>,
}

impl<'a> RetryScope<'a> {
    pub fn new(provider: &'a ProviderId, operation: &'a str) -> Self {
        Self {
            provider,
            operation,
            context: None,
        }
    }

    pub fn with_context(mut self, context: Option<ErrorContext>) -> Self {
        self.context = context;
        self
    }
}

/// Runs `execute` until it succeeds, fails with a non-retryable
/// classification, or exhausts `policy.max_retries`.
///
/// Attempts run strictly one after another; `sleep` is awaited between them.
pub async fn execute_with_retry<T, E, Op, OpFuture, Sleep, SleepFuture>(
    scope: RetryScope<'_>,
    policy: &RetryPolicy,
    classifier: &ErrorClassifier,
    hooks: &dyn ProviderOperationHooks,
    mut execute: Op,
    mut sleep: Sleep,
) -> Result<T, ClassifiedError>
where
    E: Into<RawError>,
    Op: FnMut(u32) -> OpFuture,
    OpFuture: Future<Output = Result<T, E>>,
    Sleep: FnMut(Duration) -> SleepFuture,
    SleepFuture: Future<Output = ()>,
{
    let RetryScope {
        provider,
        operation,
        context,
    } = scope;
    let mut attempt = 1;

    loop {
        hooks.on_attempt_start(provider, operation, attempt);

        match execute(attempt).await {
            Ok(value) => {
                hooks.on_success(provider, operation, attempt);
                return Ok(value);
            }
            Err(error) => {
                let error = classifier.classify(error, provider, context.clone());

                if policy.should_retry(attempt, &error) {
                    let delay = policy.delay_for_attempt(attempt);
                    hooks.on_retry_scheduled(provider, operation, attempt, delay, &error);
                    sleep(delay).await;
                    attempt += 1;
                    continue;
                }

                hooks.on_failure(provider, operation, attempt, &error);
                return Err(error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use super::*;
    use crate::{ProviderError, ProviderId};

    fn classified(error: impl Into<RawError>) -> ClassifiedError {
        ErrorClassifier::default().classify(error, &ProviderId::OpenAi, None)
    }

    #[test]
    fn retry_policy_uses_retryable_flag_and_retry_limit() {
        let policy = RetryPolicy::new(2);
        let retryable = classified(ProviderError::timeout("timed out"));
        let non_retryable = classified(ProviderError::invalid_request("bad request"));

        assert!(policy.should_retry(1, &retryable));
        assert!(policy.should_retry(2, &retryable));
        assert!(!policy.should_retry(3, &retryable));
        assert!(!policy.should_retry(1, &non_retryable));
        assert!(!RetryPolicy::without_retries().should_retry(1, &retryable));
    }

    #[test]
    fn retry_policy_allow_list_narrows_any_classification() {
        let policy = RetryPolicy::new(3).with_retryable_errors(vec![ErrorCategory::Network]);
        let server = classified("503 service unavailable");
        let network = classified("ECONNREFUSED");

        assert!(server.retryable);
        assert!(!policy.allows(ErrorCategory::Server));
        assert!(!policy.should_retry(1, &server));
        assert!(policy.should_retry(1, &network));
    }

    #[test]
    fn retry_policy_backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay_ms: 100,
            max_delay_ms: 250,
            backoff_multiplier: 2.0,
            use_jitter: false,
            retryable_errors: None,
        };

        assert_eq!(policy.backoff_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for_attempt(3), Duration::from_millis(250));
        assert_eq!(policy.backoff_for_attempt(40), Duration::from_millis(250));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
    }

    #[test]
    fn backoff_tolerates_degenerate_settings() {
        let zero = RetryPolicy::default().with_base_delay(Duration::ZERO);
        assert_eq!(zero.backoff_for_attempt(10), Duration::ZERO);

        let negative = RetryPolicy::default()
            .with_base_delay(Duration::from_millis(100))
            .with_backoff_multiplier(-3.0);
        assert_eq!(negative.backoff_for_attempt(3), Duration::from_millis(100));

        let huge = RetryPolicy::default().with_backoff_multiplier(f64::MAX);
        assert_eq!(huge.backoff_for_attempt(u32::MAX), huge.max_delay());
    }

    #[test]
    fn jitter_stays_within_half_and_full_delay() {
        let delay = Duration::from_millis(800);

        assert_eq!(apply_jitter(delay, 0.0), Duration::from_millis(400));
        assert_eq!(apply_jitter(delay, 1.0), delay);
        assert_eq!(apply_jitter(delay, 7.5), delay);
        assert_eq!(apply_jitter(delay, f64::NAN), delay);

        let policy = RetryPolicy::default()
            .with_base_delay(Duration::from_millis(1000))
            .with_max_delay(Duration::from_millis(3000));
        for retry in 1..=6 {
            let cap = policy.backoff_for_attempt(retry);
            let jittered = policy.delay_for_attempt(retry);
            assert!(jittered <= cap);
            assert!(jittered >= cap / 2);
        }
    }

    #[test]
    fn retry_policy_deserializes_partial_documents_over_defaults() {
        let policy: RetryPolicy =
            serde_json::from_str(r#"{"max_retries": 7, "retryable_errors": ["network"]}"#)
                .expect("policy should parse");

        assert_eq!(policy.max_retries, 7);
        assert_eq!(policy.base_delay_ms, 1_000);
        assert!(policy.use_jitter);
        assert_eq!(policy.retryable_errors, Some(vec![ErrorCategory::Network]));
        assert!(policy.classifier().is_retryable(ErrorCategory::Network));
        assert!(!policy.classifier().is_retryable(ErrorCategory::Server));
    }

    #[derive(Default)]
    struct RecordingHooks {
        events: Mutex<Vec<String>>,
    }

    impl ProviderOperationHooks for RecordingHooks {
        fn on_attempt_start(&self, provider: &ProviderId, operation: &str, attempt: u32) {
            self.events
                .lock()
                .expect("events lock")
                .push(format!("start:{provider}:{operation}:{attempt}"));
        }

        fn on_retry_scheduled(
            &self,
            provider: &ProviderId,
            operation: &str,
            attempt: u32,
            _delay: Duration,
            _error: &ClassifiedError,
        ) {
            self.events
                .lock()
                .expect("events lock")
                .push(format!("retry:{provider}:{operation}:{attempt}"));
        }

        fn on_success(&self, provider: &ProviderId, operation: &str, attempts: u32) {
            self.events
                .lock()
                .expect("events lock")
                .push(format!("success:{provider}:{operation}:{attempts}"));
        }

        fn on_failure(
            &self,
            provider: &ProviderId,
            operation: &str,
            attempts: u32,
            error: &ClassifiedError,
        ) {
            self.events
                .lock()
                .expect("events lock")
                .push(format!(
                    "failure:{provider}:{operation}:{attempts}:{}",
                    error.category
                ));
        }
    }

    #[tokio::test]
    async fn execute_with_retry_retries_and_reports_hooks() {
        let policy = RetryPolicy::new(2).with_jitter(false);
        let classifier = policy.classifier();
        let hooks = RecordingHooks::default();
        let attempts = Arc::new(Mutex::new(0_u32));
        let sleeps = Arc::new(Mutex::new(Vec::new()));
        let provider = ProviderId::OpenAi;

        let result = execute_with_retry(
            RetryScope::new(&provider, "generate"),
            &policy,
            &classifier,
            &hooks,
            {
                let attempts = Arc::clone(&attempts);
                move |attempt| {
                    let attempts = Arc::clone(&attempts);
                    async move {
                        *attempts.lock().expect("attempts lock") = attempt;
                        if attempt < 3 {
                            Err(ProviderError::transport("connection reset"))
                        } else {
                            Ok("ok")
                        }
                    }
                }
            },
            {
                let sleeps = Arc::clone(&sleeps);
                move |delay| {
                    let sleeps = Arc::clone(&sleeps);
                    async move {
                        sleeps.lock().expect("sleep lock").push(delay);
                    }
                }
            },
        )
        .await;

        assert_eq!(result.expect("result should succeed"), "ok");
        assert_eq!(*attempts.lock().expect("attempts lock"), 3);
        assert_eq!(
            *sleeps.lock().expect("sleep lock"),
            vec![Duration::from_millis(1_000), Duration::from_millis(2_000)]
        );

        let events = hooks.events.lock().expect("events lock").clone();
        assert!(events.contains(&"retry:openai:generate:1".to_string()));
        assert!(events.contains(&"success:openai:generate:3".to_string()));
    }

    #[tokio::test]
    async fn execute_with_retry_stops_on_non_retryable_error() {
        let policy = RetryPolicy::new(5);
        let classifier = policy.classifier();
        let hooks = RecordingHooks::default();
        let provider = ProviderId::OpenAi;

        let result = execute_with_retry::<(), _, _, _, _, _>(
            RetryScope::new(&provider, "generate"),
            &policy,
            &classifier,
            &hooks,
            |_| async move { Err(ProviderError::invalid_request("bad input")) },
            |_| async move {},
        )
        .await;

        let error = result.expect_err("result should fail");
        assert_eq!(error.category, ErrorCategory::Validation);
        let events = hooks.events.lock().expect("events lock").clone();
        assert_eq!(events.len(), 2);
        assert!(events.iter().any(|item| item == "failure:openai:generate:1:validation"));
    }

    #[tokio::test]
    async fn execute_with_retry_surfaces_last_classification_when_exhausted() {
        let policy = RetryPolicy::new(1);
        let classifier = policy.classifier();
        let provider = ProviderId::Anthropic;
        let calls = Arc::new(Mutex::new(0_u32));

        let result = execute_with_retry::<(), _, _, _, _, _>(
            RetryScope::new(&provider, "generate"),
            &policy,
            &classifier,
            &NoopOperationHooks,
            {
                let calls = Arc::clone(&calls);
                move |attempt| {
                    *calls.lock().expect("calls lock") += 1;
                    async move {
                        if attempt == 1 {
                            Err(RawError::from("503 service unavailable"))
                        } else {
                            Err(RawError::from("429 too many requests"))
                        }
                    }
                }
            },
            |_| async move {},
        )
        .await;

        let error = result.expect_err("retries should be exhausted");
        assert_eq!(*calls.lock().expect("calls lock"), 2);
        assert_eq!(error.category, ErrorCategory::RateLimit);
        assert_eq!(error.provider, ProviderId::Anthropic);
    }

    #[tokio::test]
    async fn execute_with_retry_honors_policy_allow_list_with_default_classifier() {
        let policy = RetryPolicy::new(4).with_retryable_errors(vec![ErrorCategory::Network]);
        let provider = ProviderId::OpenAi;
        let calls = Arc::new(Mutex::new(0_u32));

        let result = execute_with_retry::<(), _, _, _, _, _>(
            RetryScope::new(&provider, "generate"),
            &policy,
            &ErrorClassifier::default(),
            &NoopOperationHooks,
            {
                let calls = Arc::clone(&calls);
                move |_| {
                    *calls.lock().expect("calls lock") += 1;
                    async move { Err(RawError::from("500 internal server error")) }
                }
            },
            |_| async move {},
        )
        .await;

        let error = result.expect_err("server errors are not on the allow-list");
        assert_eq!(*calls.lock().expect("calls lock"), 1);
        assert_eq!(error.category, ErrorCategory::Server);
    }
}
