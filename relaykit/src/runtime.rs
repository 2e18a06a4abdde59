//! Runtime wiring: one conversation manager, rate limiter, and error handler
//! shared by a chat service.

use std::sync::Arc;

use crate::{
    ChatService, ConversationManager, ErrorHandler, ModelProvider, ProviderOperationHooks,
    RateLimitError, RateLimitHooks, RateLimiter, RelayConfig,
};
use robserve::{SafeProviderHooks, SafeRateLimitHooks, TracingObservabilityHooks};

#[derive(Clone)]
pub struct RuntimeBundle {
    pub conversations: Arc<ConversationManager>,
    pub limiter: Arc<RateLimiter>,
    pub handler: ErrorHandler,
    pub chat: ChatService,
}

impl RuntimeBundle {
    /// Stops the limiter's cleanup task and drops its windows.
    pub fn shutdown(&self) {
        self.limiter.destroy();
    }
}

pub fn chat_service(provider: Arc<dyn ModelProvider>) -> ChatService {
    ChatService::builder(provider).build()
}

/// Builds a runtime that reports through `tracing` and starts the limiter's
/// cleanup task, so it must be called inside a tokio runtime.
pub fn build_runtime(
    provider: Arc<dyn ModelProvider>,
    config: &RelayConfig,
) -> Result<RuntimeBundle, RateLimitError> {
    build_runtime_with_hooks(
        provider,
        config,
        Arc::new(SafeProviderHooks::new(TracingObservabilityHooks)),
        Arc::new(SafeRateLimitHooks::new(TracingObservabilityHooks)),
    )
}

pub fn build_runtime_with_hooks(
    provider: Arc<dyn ModelProvider>,
    config: &RelayConfig,
    provider_hooks: Arc<dyn ProviderOperationHooks>,
    limit_hooks: Arc<dyn RateLimitHooks>,
) -> Result<RuntimeBundle, RateLimitError> {
    let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone())?.with_hooks(limit_hooks));
    limiter.start_cleanup()?;

    let conversations = Arc::new(ConversationManager::new(config.conversation.clone()));
    let handler = ErrorHandler::new(config.retry.clone()).with_hooks(provider_hooks);

    let chat = ChatService::builder(provider)
        .conversations(Arc::clone(&conversations))
        .rate_limiter(Arc::clone(&limiter))
        .error_handler(handler.clone())
        .build();

    Ok(RuntimeBundle {
        conversations,
        limiter,
        handler,
        chat,
    })
}
