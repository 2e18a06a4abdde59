//! Common imports for most relaykit applications.

pub use crate::{
    assistant_message, build_runtime, build_runtime_with_hooks, chat_service, parse_provider_id,
    session, system_message, turn, user_message,
};
pub use crate::{rk_messages, rk_msg, rk_session};
pub use crate::{
    BoxFuture, ChatError, ChatErrorKind, ChatService, ChatServiceBuilder, ChatSession,
    ChatTurnRequest, ChatTurnResult, ClassifiedError, ConfigError, ConversationConfig,
    ConversationManager, ErrorCategory, ErrorHandler, ErrorSeverity, GenerateRequest,
    GenerateResponse, Message, ModelProvider, ProviderError, ProviderFuture, ProviderId,
    RateLimitConfig, RateLimitInfo, RateLimiter, RawError, RelayConfig, RetryPolicy, Role,
    RuntimeBundle, SessionId, TokenUsage,
};
