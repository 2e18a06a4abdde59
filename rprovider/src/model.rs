//! Provider-agnostic identifiers, messages, and generate request/response types.
//!
//! ```rust
//! use rprovider::{GenerateRequest, Message, ProviderErrorKind, Role};
//!
//! let ok = GenerateRequest::builder("gpt-4o-mini")
//!     .prompt("Summarize this diff")
//!     .history(vec![Message::new(Role::User, "earlier question")])
//!     .build();
//! assert!(ok.is_ok());
//!
//! let err = GenerateRequest::builder("")
//!     .prompt("hi")
//!     .build()
//!     .err()
//!     .expect("empty model should fail");
//! assert_eq!(err.kind, ProviderErrorKind::InvalidRequest);
//! ```

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use rcommon::{GenerationOptions, MetadataMap};
use serde::{Deserialize, Serialize};

use crate::ProviderError;

/// Free-form per-message metadata; values may be any JSON.
pub type MessageMetadata = serde_json::Map<String, serde_json::Value>;

/// Identifier of the provider behind a call.
///
/// Known providers get their own variant; anything else is carried verbatim
/// in [`ProviderId::Custom`] so classification can echo it unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderId {
    OpenAi,
    Anthropic,
    Google,
    Meta,
    XAi,
    DeepSeek,
    Ollama,
    Custom(String),
}

impl ProviderId {
    pub fn custom(value: impl Into<String>) -> Self {
        Self::from(value.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
            Self::Meta => "meta",
            Self::XAi => "xai",
            Self::DeepSeek => "deepseek",
            Self::Ollama => "ollama",
            Self::Custom(value) => value.as_str(),
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ProviderId {
    fn from(value: String) -> Self {
        match value.as_str() {
            "openai" => Self::OpenAi,
            "anthropic" => Self::Anthropic,
            "google" => Self::Google,
            "meta" => Self::Meta,
            "xai" => Self::XAi,
            "deepseek" => Self::DeepSeek,
            "ollama" => Self::Ollama,
            _ => Self::Custom(value),
        }
    }
}

impl From<&str> for ProviderId {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<ProviderId> for String {
    fn from(value: ProviderId) -> Self {
        match value {
            ProviderId::Custom(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "MessageMetadata::is_empty")]
    pub metadata: MessageMetadata,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self::at(role, content, Utc::now())
    }

    pub fn at(role: Role, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp,
            metadata: MessageMetadata::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateResponse {
    pub provider: ProviderId,
    pub model: String,
    pub content: String,
    pub usage: TokenUsage,
}

/// A single prompt plus the conversation it continues.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub history: Vec<Message>,
    pub options: GenerationOptions,
    pub metadata: MetadataMap,
}

impl GenerateRequest {
    pub fn builder(model: impl Into<String>) -> GenerateRequestBuilder {
        GenerateRequestBuilder::new(model)
    }

    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system_prompt: None,
            history: Vec::new(),
            options: GenerationOptions::default(),
            metadata: MetadataMap::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.model.trim().is_empty() {
            return Err(ProviderError::invalid_request("model must not be empty"));
        }

        if self.prompt.trim().is_empty() {
            return Err(ProviderError::invalid_request("prompt must not be empty"));
        }

        if let Some(max_tokens) = self.options.max_tokens
            && max_tokens == 0
        {
            return Err(ProviderError::invalid_request(
                "max_tokens must be greater than zero",
            ));
        }

        if let Some(temperature) = self.options.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(ProviderError::invalid_request(
                "temperature must be in the inclusive range 0.0..=2.0",
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequestBuilder {
    model: String,
    prompt: String,
    system_prompt: Option<String>,
    history: Vec<Message>,
    options: GenerationOptions,
    metadata: MetadataMap,
}

impl GenerateRequestBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: String::new(),
            system_prompt: None,
            history: Vec::new(),
            options: GenerationOptions::default(),
            metadata: MetadataMap::new(),
        }
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn history(mut self, messages: Vec<Message>) -> Self {
        self.history.extend(messages);
        self
    }

    pub fn options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.options.max_tokens = Some(max_tokens);
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Result<GenerateRequest, ProviderError> {
        let request = GenerateRequest {
            model: self.model,
            prompt: self.prompt,
            system_prompt: self.system_prompt,
            history: self.history,
            options: self.options,
            metadata: self.metadata,
        };

        request.validate()?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorKind;

    #[test]
    fn provider_id_display_is_stable() {
        assert_eq!(ProviderId::OpenAi.to_string(), "openai");
        assert_eq!(ProviderId::Anthropic.to_string(), "anthropic");
        assert_eq!(ProviderId::XAi.to_string(), "xai");
        assert_eq!(ProviderId::from("deepseek"), ProviderId::DeepSeek);
    }

    #[test]
    fn unknown_provider_ids_are_kept_verbatim() {
        let provider = ProviderId::from("未知");
        assert_eq!(provider, ProviderId::Custom("未知".to_string()));
        assert_eq!(provider.to_string(), "未知");

        let mixed_case = ProviderId::from("OpenAI");
        assert_eq!(mixed_case.as_str(), "OpenAI");
    }

    #[test]
    fn provider_id_serializes_as_string() {
        let json = serde_json::to_string(&ProviderId::Ollama).expect("serialize");
        assert_eq!(json, "\"ollama\"");

        let parsed: ProviderId = serde_json::from_str("\"my-gateway\"").expect("deserialize");
        assert_eq!(parsed, ProviderId::custom("my-gateway"));
    }

    #[test]
    fn role_parse_accepts_known_roles_only() {
        assert_eq!(Role::parse("User"), Some(Role::User));
        assert_eq!(Role::parse(" assistant "), Some(Role::Assistant));
        assert_eq!(Role::parse("tool"), None);
    }

    #[test]
    fn messages_get_unique_ids_and_serialize_roles_lowercase() {
        let first = Message::new(Role::User, "hi");
        let second = Message::new(Role::User, "hi");
        assert_ne!(first.id, second.id);

        let json = serde_json::to_value(&first).expect("serialize");
        assert_eq!(json["role"], "user");
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn message_metadata_keeps_json_values() {
        let message = Message::new(Role::Assistant, "done")
            .with_metadata("tokens", 5)
            .with_metadata("flagged", false)
            .with_metadata("source", "cache");

        let json = serde_json::to_value(&message).expect("serialize");
        assert_eq!(json["metadata"]["tokens"], 5);
        assert_eq!(json["metadata"]["flagged"], false);

        let parsed: Message = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, message);
    }

    #[test]
    fn generate_request_validate_enforces_contract() {
        let err = GenerateRequest::new("  ", "hi")
            .validate()
            .expect_err("empty model must fail");
        assert_eq!(err.kind, ProviderErrorKind::InvalidRequest);

        let err = GenerateRequest::new("gpt", " ")
            .validate()
            .expect_err("empty prompt must fail");
        assert_eq!(err.kind, ProviderErrorKind::InvalidRequest);

        let err = GenerateRequest::builder("gpt")
            .prompt("hi")
            .temperature(2.5)
            .build()
            .expect_err("temperature outside range must fail");
        assert_eq!(err.kind, ProviderErrorKind::InvalidRequest);

        let err = GenerateRequest::builder("gpt")
            .prompt("hi")
            .max_tokens(0)
            .build()
            .expect_err("max_tokens=0 must fail");
        assert_eq!(err.kind, ProviderErrorKind::InvalidRequest);

        let valid = GenerateRequest::builder("gpt")
            .prompt("hi")
            .system_prompt("be brief")
            .temperature(0.4)
            .max_tokens(128)
            .metadata("trace_id", "abc")
            .build()
            .expect("valid request");
        assert_eq!(valid.system_prompt.as_deref(), Some("be brief"));
        assert_eq!(valid.metadata.get("trace_id"), Some(&"abc".to_string()));
    }
}
