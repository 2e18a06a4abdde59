//! Conversation views, import records, and chat turn types.

use chrono::{DateTime, Utc};
use rcommon::{GenerationOptions, MetadataMap, SessionId};
use rlimit::RateLimitInfo;
use rprovider::{Message, MessageMetadata, Role, TokenUsage};
use serde::{Deserialize, Serialize};

use crate::ConversationError;

/// Read-only snapshot handed to a provider call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub session_id: String,
    pub user_id: String,
    pub messages: Vec<Message>,
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub metadata: MetadataMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConversationStats {
    pub message_count: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub system_messages: usize,
    pub first_message: Option<DateTime<Utc>>,
    pub last_message: Option<DateTime<Utc>>,
}

impl ConversationStats {
    pub fn from_messages(messages: &[Message]) -> Self {
        let mut stats = Self {
            message_count: messages.len(),
            first_message: messages.first().map(|message| message.timestamp),
            last_message: messages.last().map(|message| message.timestamp),
            ..Self::default()
        };

        for message in messages {
            match message.role {
                Role::User => stats.user_messages += 1,
                Role::Assistant => stats.assistant_messages += 1,
                Role::System => stats.system_messages += 1,
            }
        }

        stats
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationExport {
    pub session_id: String,
    pub messages: Vec<Message>,
    pub stats: ConversationStats,
    pub exported_at: DateTime<Utc>,
}

impl ConversationExport {
    pub fn to_json(&self) -> Result<String, ConversationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ConversationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Import-ready copies of the exported messages.
    pub fn records(&self) -> Vec<MessageRecord> {
        self.messages.iter().cloned().map(MessageRecord::from).collect()
    }
}

/// Loosely-typed message as it arrives from outside, checked on import.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageRecord {
    pub id: Option<String>,
    pub role: Option<String>,
    pub content: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub metadata: Option<MessageMetadata>,
}

impl MessageRecord {
    pub fn new(role: impl Into<String>, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: Some(role.into()),
            content: Some(content.into()),
            timestamp: Some(timestamp),
            ..Self::default()
        }
    }

    /// Converts the record, naming `index` and every missing field on failure.
    pub fn into_message(self, index: usize) -> Result<Message, ConversationError> {
        let mut missing = Vec::new();
        if self.role.is_none() {
            missing.push("role");
        }
        if self.content.is_none() {
            missing.push("content");
        }
        if self.timestamp.is_none() {
            missing.push("timestamp");
        }

        let (Some(role), Some(content), Some(timestamp)) = (self.role, self.content, self.timestamp)
        else {
            return Err(ConversationError::invalid_message_format(format!(
                "message {index} is missing required field(s): {}",
                missing.join(", ")
            )));
        };

        let role = Role::parse(&role).ok_or_else(|| {
            ConversationError::invalid_message_format(format!(
                "message {index} has unknown role '{role}'"
            ))
        })?;

        let mut message = Message::at(role, content, timestamp);
        if let Some(id) = self.id {
            message = message.with_id(id);
        }
        message.metadata = self.metadata.unwrap_or_default();
        Ok(message)
    }
}

impl From<Message> for MessageRecord {
    fn from(value: Message) -> Self {
        Self {
            id: Some(value.id),
            role: Some(value.role.as_str().to_string()),
            content: Some(value.content),
            timestamp: Some(value.timestamp),
            metadata: (!value.metadata.is_empty()).then_some(value.metadata),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSession {
    pub id: SessionId,
    pub model: String,
    pub system_prompt: Option<String>,
    pub user_id: Option<String>,
}

impl ChatSession {
    pub fn new(id: impl Into<SessionId>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            system_prompt: None,
            user_id: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Identifier the rate limiter counts this session's turns under.
    pub fn rate_limit_key(&self) -> &str {
        self.user_id.as_deref().unwrap_or(self.id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurnRequest {
    pub session: ChatSession,
    pub user_input: String,
    pub options: GenerationOptions,
    pub metadata: MetadataMap,
}

impl ChatTurnRequest {
    pub fn new(session: ChatSession, user_input: impl Into<String>) -> Self {
        Self {
            session,
            user_input: user_input.into(),
            options: GenerationOptions::default(),
            metadata: MetadataMap::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.options.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.options.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurnResult {
    pub session_id: SessionId,
    pub model: String,
    pub assistant_message: String,
    pub usage: TokenUsage,
    pub rate_limit: RateLimitInfo,
}
