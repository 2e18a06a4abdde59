//! Shared utilities and strongly-typed common values for workspace crates.
//!
//! ```rust
//! use rcommon::{Clock, GenerationOptions, ManualClock, MetadataMap, SessionId};
//!
//! let session = SessionId::from("session-1");
//! let mut metadata = MetadataMap::new();
//! metadata.insert("tenant".to_string(), "acme".to_string());
//!
//! let options = GenerationOptions::default().with_temperature(0.3);
//! let clock = ManualClock::default();
//! let before = clock.now();
//! clock.advance(std::time::Duration::from_secs(1));
//!
//! assert_eq!(session.as_str(), "session-1");
//! assert_eq!(options.temperature, Some(0.3));
//! assert!(clock.now() > before);
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use rcommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod context {
    //! Shared metadata and cross-crate identifier newtypes.
    //!
    //! ```rust
    //! use rcommon::{MetadataMap, SessionId};
    //!
    //! let session = SessionId::new("session-42");
    //! let mut metadata = MetadataMap::new();
    //! metadata.insert("env".to_string(), "test".to_string());
    //!
    //! assert_eq!(session.to_string(), "session-42");
    //! ```

    use std::collections::HashMap;
    use std::fmt::{Display, Formatter};

    use serde::{Deserialize, Serialize};

    pub type MetadataMap = HashMap<String, String>;

    #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct SessionId(String);

    impl SessionId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for SessionId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for SessionId {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for SessionId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }

    impl AsRef<str> for SessionId {
        fn as_ref(&self) -> &str {
            self.as_str()
        }
    }
}

pub mod model {
    //! Shared generation settings used by request types.
    //!
    //! ```rust
    //! use rcommon::GenerationOptions;
    //!
    //! let options = GenerationOptions::default()
    //!     .with_temperature(0.2)
    //!     .with_max_tokens(128);
    //!
    //! assert_eq!(options.temperature, Some(0.2));
    //! assert_eq!(options.max_tokens, Some(128));
    //! ```

    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
    #[serde(default)]
    pub struct GenerationOptions {
        pub temperature: Option<f32>,
        pub max_tokens: Option<u32>,
    }

    impl GenerationOptions {
        pub fn with_temperature(mut self, temperature: f32) -> Self {
            self.temperature = Some(temperature);
            self
        }

        pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
            self.max_tokens = Some(max_tokens);
            self
        }
    }
}

pub mod clock {
    //! Injectable wall clock.
    //!
    //! Components that reason about absolute time (rate-limit windows,
    //! message timestamps, error capture times) read it through [`Clock`] so
    //! tests can drive time with [`ManualClock`].
    //!
    //! ```rust
    //! use std::time::Duration;
    //! use rcommon::{Clock, ManualClock};
    //!
    //! let clock = ManualClock::default();
    //! let start = clock.now();
    //! clock.advance(Duration::from_millis(1500));
    //!
    //! assert_eq!((clock.now() - start).num_milliseconds(), 1500);
    //! ```

    use std::sync::{Arc, Mutex, PoisonError};
    use std::time::Duration;

    use chrono::{DateTime, TimeZone, Utc};

    pub trait Clock: Send + Sync {
        fn now(&self) -> DateTime<Utc>;
    }

    pub type SharedClock = Arc<dyn Clock>;

    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    pub fn system_clock() -> SharedClock {
        Arc::new(SystemClock)
    }

    /// Clock that only moves when told to.
    #[derive(Debug)]
    pub struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        pub fn new(start: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(start),
            }
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
            let delta = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::MAX);
            *now = now.checked_add_signed(delta).unwrap_or(*now);
        }

        pub fn set(&self, at: DateTime<Utc>) {
            *self.now.lock().unwrap_or_else(PoisonError::into_inner) = at;
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            // Fixed epoch keeps test output reproducible.
            let start = Utc
                .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
                .single()
                .unwrap_or_default();
            Self::new(start)
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }
}

pub use clock::{Clock, ManualClock, SharedClock, SystemClock, system_clock};
pub use context::{MetadataMap, SessionId};
pub use future::BoxFuture;
pub use model::GenerationOptions;

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::{Clock, GenerationOptions, ManualClock, SessionId, SharedClock};

    #[test]
    fn session_id_round_trips_strings() {
        let session = SessionId::new("session-1");

        assert_eq!(session.as_str(), "session-1");
        assert_eq!(session.to_string(), "session-1");
        assert_eq!(SessionId::from("session-1".to_string()), session);
    }

    #[test]
    fn session_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&SessionId::new("abc")).expect("serialize");
        assert_eq!(json, "\"abc\"");
    }

    #[test]
    fn generation_options_builder_helpers_set_values() {
        let options = GenerationOptions::default()
            .with_temperature(0.3)
            .with_max_tokens(123);

        assert_eq!(options.temperature, Some(0.3));
        assert_eq!(options.max_tokens, Some(123));
    }

    #[test]
    fn manual_clock_moves_only_when_advanced() {
        let clock = ManualClock::default();
        let first = clock.now();
        assert_eq!(clock.now(), first);

        clock.advance(Duration::from_secs(60));
        assert_eq!((clock.now() - first).num_seconds(), 60);

        clock.set(first);
        assert_eq!(clock.now(), first);
    }

    #[test]
    fn manual_clock_is_usable_as_shared_clock() {
        let manual = Arc::new(ManualClock::default());
        let shared: SharedClock = manual.clone();
        let before = shared.now();

        manual.advance(Duration::from_millis(10));
        assert!(shared.now() > before);
    }
}
