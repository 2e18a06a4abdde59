//! TOML-backed configuration for a whole runtime.
//!
//! Every section and field is optional; anything left out keeps its default.
//!
//! ```rust
//! use relaykit::RelayConfig;
//!
//! let config = RelayConfig::from_toml_str(
//!     r#"
//!     [retry]
//!     max_retries = 5
//!
//!     [rate_limit]
//!     max_requests = 20
//!     "#,
//! )
//! .expect("config should parse");
//!
//! assert_eq!(config.retry.max_retries, 5);
//! assert_eq!(config.rate_limit.max_requests, 20);
//! assert_eq!(config.rate_limit.window_ms, 60_000);
//! assert_eq!(config.conversation.default_user_id, "anonymous");
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

use rchat::ConversationConfig;
use rlimit::RateLimitConfig;
use rprovider::RetryPolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub retry: RetryPolicy,
    pub rate_limit: RateLimitConfig,
    pub conversation: ConversationConfig,
}

impl RelayConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(input).map_err(|error| ConfigError::parse(error.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)
            .map_err(|error| ConfigError::io(format!("{}: {error}", path.display())))?;
        Self::from_toml_str(&input)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|error| ConfigError::parse(error.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rate_limit
            .validate()
            .map_err(|error| ConfigError::invalid(error.message))?;

        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::invalid(
                "retry.backoff_multiplier must be a finite value of at least 1.0",
            ));
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(ConfigError::invalid(
                "retry.max_delay_ms must not be smaller than retry.base_delay_ms",
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    Io,
    Parse,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub kind: ConfigErrorKind,
    pub message: String,
}

impl ConfigError {
    pub fn new(kind: ConfigErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Io, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Parse, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Invalid, message)
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ConfigError {}
