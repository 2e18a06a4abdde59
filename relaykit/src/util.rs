//! Small convenience constructors for common types.

use crate::{ChatSession, ChatTurnRequest, Message, ProviderId, Role, SessionId};

pub fn system_message(content: impl Into<String>) -> Message {
    Message::new(Role::System, content)
}

pub fn user_message(content: impl Into<String>) -> Message {
    Message::new(Role::User, content)
}

pub fn assistant_message(content: impl Into<String>) -> Message {
    Message::new(Role::Assistant, content)
}

pub fn session(id: impl Into<SessionId>, model: impl Into<String>) -> ChatSession {
    ChatSession::new(id, model)
}

pub fn turn(session: ChatSession, user_input: impl Into<String>) -> ChatTurnRequest {
    ChatTurnRequest::new(session, user_input)
}

/// Resolves a provider name or common alias. Unrecognized names yield
/// `None`; use [`ProviderId::custom`] for gateways.
pub fn parse_provider_id(value: &str) -> Option<ProviderId> {
    match value.trim().to_ascii_lowercase().as_str() {
        "openai" | "open-ai" | "gpt" => Some(ProviderId::OpenAi),
        "anthropic" | "claude" => Some(ProviderId::Anthropic),
        "google" | "gemini" => Some(ProviderId::Google),
        "meta" | "llama" => Some(ProviderId::Meta),
        "xai" | "x-ai" | "grok" => Some(ProviderId::XAi),
        "deepseek" => Some(ProviderId::DeepSeek),
        "ollama" | "local" => Some(ProviderId::Ollama),
        _ => None,
    }
}
