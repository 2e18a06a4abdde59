//! Chat turn orchestration: admission, context, resilient generation, and
//! transcript persistence.

use std::sync::Arc;

use rcommon::{MetadataMap, SharedClock, system_clock};
use rlimit::RateLimiter;
use rprovider::{ErrorHandler, GenerateRequest, Message, ModelProvider, Role};

use crate::{ChatError, ChatTurnRequest, ChatTurnResult, ConversationManager};

#[derive(Clone)]
pub struct ChatService {
    provider: Arc<dyn ModelProvider>,
    conversations: Arc<ConversationManager>,
    limiter: Arc<RateLimiter>,
    handler: ErrorHandler,
    clock: SharedClock,
}

impl ChatService {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self::builder(provider).build()
    }

    pub fn builder(provider: Arc<dyn ModelProvider>) -> ChatServiceBuilder {
        ChatServiceBuilder::new(provider)
    }

    pub fn conversations(&self) -> &Arc<ConversationManager> {
        &self.conversations
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn error_handler(&self) -> &ErrorHandler {
        &self.handler
    }

    /// Runs one turn. History only changes when the provider answers.
    pub async fn run_turn(&self, request: ChatTurnRequest) -> Result<ChatTurnResult, ChatError> {
        if request.user_input.trim().is_empty() {
            return Err(ChatError::invalid_request("user_input must not be empty"));
        }

        let ChatTurnRequest {
            session,
            user_input,
            options,
            metadata,
        } = request;

        let admission = self.limiter.check_limit(session.rate_limit_key());
        if admission.is_exceeded {
            return Err(ChatError::rate_limited(admission));
        }

        let context = self.conversations.get_conversation_context(
            session.id.as_str(),
            session.user_id.as_deref(),
            session.system_prompt.as_deref(),
            Some(metadata),
        );
        let user_message = Message::at(Role::User, user_input, self.clock.now());

        let provider_id = self.provider.id();
        let error_context = Arc::new(turn_error_context(
            &context.session_id,
            &context.user_id,
            &session.model,
        ));

        let mut builder = GenerateRequest::builder(session.model.clone())
            .prompt(user_message.content.clone())
            .history(context.messages)
            .options(options);
        if let Some(system_prompt) = context.system_prompt {
            builder = builder.system_prompt(system_prompt);
        }
        for (key, value) in context.metadata {
            builder = builder.metadata(key, value);
        }
        let generate_request = builder.build().map_err(|error| {
            ChatError::provider(self.handler.process_error(
                error,
                &provider_id,
                Some(Arc::clone(&error_context)),
            ))
        })?;

        let response = self
            .handler
            .execute_labeled(&provider_id, "generate", Some(error_context), || {
                self.provider.generate(generate_request.clone())
            })
            .await?;

        let assistant_message = Message::at(
            Role::Assistant,
            response.content.clone(),
            self.clock.now(),
        );
        self.conversations
            .add_messages(session.id.as_str(), vec![user_message, assistant_message]);

        Ok(ChatTurnResult {
            session_id: session.id,
            model: response.model,
            assistant_message: response.content,
            usage: response.usage,
            rate_limit: admission,
        })
    }
}

fn turn_error_context(session_id: &str, user_id: &str, model: &str) -> MetadataMap {
    let mut context = MetadataMap::new();
    context.insert("session_id".to_string(), session_id.to_string());
    context.insert("user_id".to_string(), user_id.to_string());
    context.insert("model".to_string(), model.to_string());
    context
}

pub struct ChatServiceBuilder {
    provider: Arc<dyn ModelProvider>,
    conversations: Option<Arc<ConversationManager>>,
    limiter: Option<Arc<RateLimiter>>,
    handler: Option<ErrorHandler>,
    clock: Option<SharedClock>,
}

impl ChatServiceBuilder {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            provider,
            conversations: None,
            limiter: None,
            handler: None,
            clock: None,
        }
    }

    pub fn conversations(mut self, conversations: Arc<ConversationManager>) -> Self {
        self.conversations = Some(conversations);
        self
    }

    pub fn rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn error_handler(mut self, handler: ErrorHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> ChatService {
        ChatService {
            provider: self.provider,
            conversations: self.conversations.unwrap_or_default(),
            limiter: self.limiter.unwrap_or_default(),
            handler: self.handler.unwrap_or_default(),
            clock: self.clock.unwrap_or_else(system_clock),
        }
    }
}
