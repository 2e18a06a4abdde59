use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitErrorKind {
    NoRuntime,
    InvalidConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitError {
    pub kind: RateLimitErrorKind,
    pub message: String,
}

impl RateLimitError {
    pub fn new(kind: RateLimitErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn no_runtime(message: impl Into<String>) -> Self {
        Self::new(RateLimitErrorKind::NoRuntime, message)
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(RateLimitErrorKind::InvalidConfig, message)
    }
}

impl Display for RateLimitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for RateLimitError {}
