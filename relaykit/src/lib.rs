//! Unified facade over the relaykit workspace crates.
//!
//! This crate is designed to be the single dependency for most applications.
//! It re-exports the core crates and adds TOML configuration, runtime wiring,
//! convenience constructors, and macros.
//!
//! ```rust
//! use relaykit::{RelayConfig, rk_session, turn};
//!
//! let config = RelayConfig::from_toml_str("[rate_limit]\nmax_requests = 30").expect("valid config");
//! let request = turn(rk_session!("session-1", "gpt-4o-mini", user = "u-1"), "hello");
//!
//! assert_eq!(config.rate_limit.max_requests, 30);
//! assert_eq!(request.session.rate_limit_key(), "u-1");
//! ```

mod config;
mod macros;

pub mod prelude;
pub mod runtime;
pub mod util;

pub use rchat;
pub use rcommon;
pub use rlimit;
pub use robserve;
pub use rprovider;

pub use config::{ConfigError, ConfigErrorKind, RelayConfig};
pub use rchat::{
    ChatError, ChatErrorKind, ChatService, ChatServiceBuilder, ChatSession, ChatTurnRequest,
    ChatTurnResult, ConversationConfig, ConversationContext, ConversationError,
    ConversationErrorKind, ConversationExport, ConversationManager, ConversationStats,
    MessageRecord,
};
pub use rcommon::{
    BoxFuture, Clock, GenerationOptions, ManualClock, MetadataMap, SessionId, SharedClock,
    SystemClock, system_clock,
};
pub use rlimit::{
    KeyGenerator, NoopRateLimitHooks, RateLimitConfig, RateLimitError, RateLimitErrorKind,
    RateLimitHooks, RateLimitInfo, RateLimiter,
};
pub use robserve::{
    MetricsObservabilityHooks, SafeProviderHooks, SafeRateLimitHooks, TracingObservabilityHooks,
};
pub use rprovider::{
    ClassifiedError, ErrorCategory, ErrorClassifier, ErrorContext, ErrorHandler, ErrorMetadata,
    ErrorSeverity, GenerateRequest, GenerateRequestBuilder, GenerateResponse, Message,
    ModelProvider, NoopOperationHooks, ProviderError, ProviderErrorKind, ProviderFuture,
    ProviderId, ProviderOperationHooks, RawError, RetryPolicy, Role, TokenUsage,
    execute_with_retry,
};

pub use runtime::{RuntimeBundle, build_runtime, build_runtime_with_hooks, chat_service};
pub use util::{
    assistant_message, parse_provider_id, session, system_message, turn, user_message,
};
