//! Rate limiter configuration.
//!
//! ```rust
//! use std::time::Duration;
//! use rlimit::RateLimitConfig;
//!
//! let config = RateLimitConfig::new(5, Duration::from_secs(1))
//!     .with_key_generator(|identifier| format!("tenant-a:{identifier}"));
//!
//! assert_eq!(config.max_requests, 5);
//! assert_eq!(config.resolve_key("user-1"), "tenant-a:user-1");
//! ```

use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::RateLimitError;

/// Maps a caller identifier to the key its window is stored under.
pub type KeyGenerator = Arc<dyn Fn(&str) -> String + Send + Sync>;

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub window_ms: u64,
    pub max_requests: u32,
    pub cleanup_interval_ms: u64,
    #[serde(skip)]
    pub key_generator: Option<KeyGenerator>,
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window_ms: duration_millis(window),
            ..Self::default()
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window_ms = duration_millis(window);
        self
    }

    pub fn with_max_requests(mut self, max_requests: u32) -> Self {
        self.max_requests = max_requests;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval_ms = duration_millis(interval);
        self
    }

    pub fn with_key_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.key_generator = Some(Arc::new(generator));
        self
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    pub fn resolve_key(&self, identifier: &str) -> String {
        match &self.key_generator {
            Some(generator) => generator(identifier),
            None => identifier.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), RateLimitError> {
        if self.window_ms == 0 {
            return Err(RateLimitError::invalid_config("window_ms must be positive"));
        }
        if self.cleanup_interval_ms == 0 {
            return Err(RateLimitError::invalid_config(
                "cleanup_interval_ms must be positive",
            ));
        }
        Ok(())
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: 60_000,
            max_requests: 100,
            cleanup_interval_ms: 300_000,
            key_generator: None,
        }
    }
}

impl Debug for RateLimitConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitConfig")
            .field("window_ms", &self.window_ms)
            .field("max_requests", &self.max_requests)
            .field("cleanup_interval_ms", &self.cleanup_interval_ms)
            .field("key_generator", &self.key_generator.is_some())
            .finish()
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
