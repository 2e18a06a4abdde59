//! Failure classification.
//!
//! Any failure a provider call can produce enters through [`RawError`] and
//! leaves as a [`ClassifiedError`]: a category, a severity, a retryable flag
//! and a sanitized user-facing message, with the original error kept intact.
//!
//! Severity by category:
//!
//! | category         | severity |
//! |------------------|----------|
//! | `authentication` | critical |
//! | `server`         | high     |
//! | `network`        | high     |
//! | `timeout`        | medium   |
//! | `rate_limit`     | medium   |
//! | `unknown`        | medium   |
//! | `validation`     | low      |
//!
//! ```rust
//! use rprovider::{ErrorCategory, ErrorClassifier, ProviderId, RawError};
//!
//! let classifier = ErrorClassifier::default();
//! let error = classifier.classify("connect ECONNREFUSED 127.0.0.1:443", &ProviderId::OpenAi, None);
//!
//! assert_eq!(error.category, ErrorCategory::Network);
//! assert!(error.retryable);
//!
//! let absent = classifier.classify(RawError::Absent, &ProviderId::custom("edge"), None);
//! assert_eq!(absent.category, ErrorCategory::Unknown);
//! assert_eq!(absent.provider.as_str(), "edge");
//! ```

use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rcommon::{MetadataMap, SharedClock, system_clock};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ProviderError, ProviderErrorKind, ProviderId};

/// Caller-supplied context attached to a classification, shared by reference.
pub type ErrorContext = Arc<MetadataMap>;

const AUTHENTICATION_PATTERNS: &[&str] = &[
    "unauthorized",
    "invalid api key",
    "401",
    "403",
    "authentication",
    "forbidden",
];
const RATE_LIMIT_PATTERNS: &[&str] = &["rate limit", "429", "too many requests", "quota"];
const TIMEOUT_PATTERNS: &[&str] = &["etimedout", "timed out", "timeout"];
const NETWORK_PATTERNS: &[&str] = &[
    "econnrefused",
    "enotfound",
    "econnreset",
    "network",
    "connection",
];
const SERVER_PATTERNS: &[&str] = &[
    "500",
    "502",
    "503",
    "504",
    "internal server error",
    "service unavailable",
    "bad gateway",
];
const VALIDATION_PATTERNS: &[&str] = &[
    "400",
    "bad request",
    "invalid input",
    "validation",
    "missing required field",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Network,
    Timeout,
    RateLimit,
    Authentication,
    Server,
    Validation,
    Unknown,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 7] = [
        Self::Network,
        Self::Timeout,
        Self::RateLimit,
        Self::Authentication,
        Self::Server,
        Self::Validation,
        Self::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::RateLimit => "rate_limit",
            Self::Authentication => "authentication",
            Self::Server => "server",
            Self::Validation => "validation",
            Self::Unknown => "unknown",
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Authentication => ErrorSeverity::Critical,
            Self::Server | Self::Network => ErrorSeverity::High,
            Self::Timeout | Self::RateLimit | Self::Unknown => ErrorSeverity::Medium,
            Self::Validation => ErrorSeverity::Low,
        }
    }

    /// Transient categories; an allow-list can only narrow this set.
    pub fn is_retryable_by_default(&self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::Server | Self::RateLimit
        )
    }

    fn from_provider_kind(kind: ProviderErrorKind) -> Self {
        match kind {
            ProviderErrorKind::Authentication => Self::Authentication,
            ProviderErrorKind::RateLimited => Self::RateLimit,
            ProviderErrorKind::InvalidRequest => Self::Validation,
            ProviderErrorKind::Timeout => Self::Timeout,
            ProviderErrorKind::Transport => Self::Network,
            ProviderErrorKind::Unavailable => Self::Server,
            ProviderErrorKind::Other => Self::Unknown,
        }
    }
}

impl Display for ErrorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl Display for ErrorSeverity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };

        f.write_str(value)
    }
}

/// Whatever a failing provider call produced.
#[derive(Debug, Clone)]
pub enum RawError {
    Structured(Arc<dyn Error + Send + Sync>),
    Text(String),
    Value(Value),
    Absent,
}

impl RawError {
    pub fn structured<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::Structured(Arc::new(error))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent | Self::Value(Value::Null))
    }

    /// Canonical message; never panics, whatever the payload.
    pub fn message(&self) -> String {
        match self {
            Self::Structured(error) => error.to_string(),
            Self::Text(text) => text.clone(),
            Self::Value(value) => {
                value_message(value).unwrap_or_else(|| "unknown error".to_string())
            }
            Self::Absent => "unknown error".to_string(),
        }
    }

    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Self::Structured(error) => error.downcast_ref::<ProviderError>(),
            _ => None,
        }
    }

    /// Lowercased text the category patterns are matched against.
    fn classification_text(&self) -> String {
        let mut text = self.message();

        match self {
            Self::Structured(error) => {
                if let Some(status) = self.provider_error().and_then(|error| error.status) {
                    text.push(' ');
                    text.push_str(&status.to_string());
                }

                let mut source = error.source();
                while let Some(inner) = source {
                    text.push(' ');
                    text.push_str(&inner.to_string());
                    source = inner.source();
                }
            }
            Self::Value(value) => {
                for hint in value_hints(value) {
                    text.push(' ');
                    text.push_str(&hint);
                }
            }
            Self::Text(_) | Self::Absent => {}
        }

        text.to_lowercase()
    }
}

impl From<ProviderError> for RawError {
    fn from(value: ProviderError) -> Self {
        Self::structured(value)
    }
}

impl From<std::io::Error> for RawError {
    fn from(value: std::io::Error) -> Self {
        Self::structured(value)
    }
}

impl From<Box<dyn Error + Send + Sync>> for RawError {
    fn from(value: Box<dyn Error + Send + Sync>) -> Self {
        Self::Structured(Arc::from(value))
    }
}

impl From<String> for RawError {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for RawError {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Value> for RawError {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Absent,
            other => Self::Value(other),
        }
    }
}

impl<T> From<Option<T>> for RawError
where
    T: Into<RawError>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

fn value_message(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Object(map) => {
            if let Some(message) = map.get("message").and_then(Value::as_str) {
                return Some(message.to_string());
            }

            match map.get("error") {
                Some(Value::String(message)) => Some(message.clone()),
                Some(inner @ Value::Object(_)) => value_message(inner),
                _ => Some(value.to_string()),
            }
        }
        other => Some(other.to_string()),
    }
}

fn value_hints(value: &Value) -> Vec<String> {
    let Value::Object(map) = value else {
        return Vec::new();
    };

    let mut hints = Vec::new();
    let nested = map.get("error").and_then(Value::as_object);
    for object in std::iter::once(map).chain(nested) {
        for key in ["code", "status", "statusCode", "type"] {
            match object.get(key) {
                Some(Value::String(hint)) => hints.push(hint.clone()),
                Some(Value::Number(hint)) => hints.push(hint.to_string()),
                _ => {}
            }
        }
    }

    hints
}

/// Maps a failure onto a category; first matching pattern group wins.
pub fn categorize(error: &RawError) -> ErrorCategory {
    let text = error.classification_text();
    let matches = |patterns: &[&str]| patterns.iter().any(|pattern| text.contains(pattern));

    if matches(AUTHENTICATION_PATTERNS) {
        ErrorCategory::Authentication
    } else if matches(RATE_LIMIT_PATTERNS) {
        ErrorCategory::RateLimit
    } else if matches(TIMEOUT_PATTERNS) {
        ErrorCategory::Timeout
    } else if matches(NETWORK_PATTERNS) {
        ErrorCategory::Network
    } else if matches(SERVER_PATTERNS) {
        ErrorCategory::Server
    } else if matches(VALIDATION_PATTERNS) {
        ErrorCategory::Validation
    } else {
        error
            .provider_error()
            .map_or(ErrorCategory::Unknown, |error| {
                ErrorCategory::from_provider_kind(error.kind)
            })
    }
}

fn user_message(category: ErrorCategory, provider: &ProviderId) -> String {
    match category {
        ErrorCategory::Authentication => {
            format!("Authentication with {provider} failed; check the configured API key.")
        }
        ErrorCategory::RateLimit => {
            format!("{provider} is rate limiting requests; try again shortly.")
        }
        ErrorCategory::Network => {
            format!("Could not reach {provider}; check the network connection.")
        }
        ErrorCategory::Timeout => format!("{provider} did not respond in time."),
        ErrorCategory::Server => {
            format!("{provider} reported an internal error; try again later.")
        }
        ErrorCategory::Validation => format!("{provider} rejected the request as invalid."),
        ErrorCategory::Unknown => {
            format!("An unexpected error occurred while calling {provider}.")
        }
    }
}

#[derive(Debug, Clone)]
pub struct ErrorMetadata {
    pub timestamp: DateTime<Utc>,
    pub context: Option<ErrorContext>,
}

/// The uniform failure surfaced by the retry layer.
#[derive(Debug, Clone)]
pub struct ClassifiedError {
    pub original: RawError,
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub retryable: bool,
    pub provider: ProviderId,
    pub message: String,
    pub user_message: String,
    pub metadata: ErrorMetadata,
}

impl Display for ClassifiedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.category, self.user_message)
    }
}

impl Error for ClassifiedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.original {
            RawError::Structured(error) => Some(error.as_ref()),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct ErrorClassifier {
    retryable_errors: Option<Vec<ErrorCategory>>,
    clock: SharedClock,
}

impl ErrorClassifier {
    pub fn new() -> Self {
        Self {
            retryable_errors: None,
            clock: system_clock(),
        }
    }

    /// Restricts retries to the listed categories.
    pub fn with_retryable_errors(mut self, categories: Vec<ErrorCategory>) -> Self {
        self.retryable_errors = Some(categories);
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn is_retryable(&self, category: ErrorCategory) -> bool {
        category.is_retryable_by_default()
            && self
                .retryable_errors
                .as_ref()
                .is_none_or(|allowed| allowed.contains(&category))
    }

    pub fn classify(
        &self,
        error: impl Into<RawError>,
        provider: &ProviderId,
        context: Option<ErrorContext>,
    ) -> ClassifiedError {
        let original = error.into();
        let category = categorize(&original);

        ClassifiedError {
            message: original.message(),
            original,
            category,
            severity: category.severity(),
            retryable: self.is_retryable(category),
            provider: provider.clone(),
            user_message: user_message(category, provider),
            metadata: ErrorMetadata {
                timestamp: self.clock.now(),
                context,
            },
        }
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for ErrorClassifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorClassifier")
            .field("retryable_errors", &self.retryable_errors)
            .finish_non_exhaustive()
    }
}
