//! Conversation and chat-turn errors.

use std::error::Error;
use std::fmt::{Display, Formatter};

use rlimit::RateLimitInfo;
use rprovider::ClassifiedError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationErrorKind {
    AlreadyExists,
    InvalidMessageFormat,
    Serialization,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationError {
    pub kind: ConversationErrorKind,
    pub message: String,
}

impl ConversationError {
    pub fn new(kind: ConversationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn already_exists(session_id: &str) -> Self {
        Self::new(
            ConversationErrorKind::AlreadyExists,
            format!("session '{session_id}' already has history; pass overwrite to replace it"),
        )
    }

    pub fn invalid_message_format(message: impl Into<String>) -> Self {
        Self::new(ConversationErrorKind::InvalidMessageFormat, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ConversationErrorKind::Serialization, message)
    }
}

impl Display for ConversationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ConversationError {}

impl From<serde_json::Error> for ConversationError {
    fn from(value: serde_json::Error) -> Self {
        Self::serialization(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    InvalidRequest,
    RateLimited,
    Provider,
    Conversation,
}

/// Failure of a single chat turn.
///
/// `rate_limit` is set for [`ChatErrorKind::RateLimited`] and `provider`
/// for [`ChatErrorKind::Provider`].
#[derive(Debug, Clone)]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
    pub rate_limit: Option<RateLimitInfo>,
    pub provider: Option<ClassifiedError>,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            rate_limit: None,
            provider: None,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::InvalidRequest, message)
    }

    pub fn rate_limited(info: RateLimitInfo) -> Self {
        let message = format!(
            "rate limit of {} requests reached; window resets at {}",
            info.limit,
            info.reset_time.to_rfc3339()
        );
        Self {
            rate_limit: Some(info),
            ..Self::new(ChatErrorKind::RateLimited, message)
        }
    }

    pub fn provider(error: ClassifiedError) -> Self {
        Self {
            message: error.user_message.clone(),
            provider: Some(error),
            ..Self::new(ChatErrorKind::Provider, String::new())
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.provider.as_ref().is_some_and(|error| error.retryable)
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ChatError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.provider
            .as_ref()
            .map(|error| error as &(dyn Error + 'static))
    }
}

impl From<ClassifiedError> for ChatError {
    fn from(value: ClassifiedError) -> Self {
        Self::provider(value)
    }
}

impl From<ConversationError> for ChatError {
    fn from(value: ConversationError) -> Self {
        Self::new(ChatErrorKind::Conversation, value.to_string())
    }
}
