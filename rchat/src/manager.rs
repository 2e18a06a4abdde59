//! In-memory, per-session conversation history.
//!
//! Sessions come into existence with their first message and disappear when
//! cleared; an empty history is never stored. Appends keep caller order and
//! never truncate. A configured `max_history` bounds what
//! [`ConversationManager::get_conversation_context`] hands out, and
//! [`ConversationManager::trim_conversation`] applies the same bound to the
//! stored history on request.
//!
//! ```rust
//! use rchat::ConversationManager;
//! use rprovider::{Message, Role};
//!
//! let manager = ConversationManager::default();
//! manager.add_messages(
//!     "s-1",
//!     vec![Message::new(Role::User, "hi"), Message::new(Role::Assistant, "hello")],
//! );
//!
//! assert_eq!(manager.get_conversation_history("s-1").len(), 2);
//! assert!(manager.get_conversation_history("unknown").is_empty());
//! ```

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rcommon::{MetadataMap, SharedClock, system_clock};
use rprovider::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    ConversationContext, ConversationError, ConversationExport, ConversationStats, MessageRecord,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    pub max_history: Option<usize>,
    pub default_user_id: String,
}

impl ConversationConfig {
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = Some(max_history);
        self
    }

    pub fn with_default_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.default_user_id = user_id.into();
        self
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_history: None,
            default_user_id: "anonymous".to_string(),
        }
    }
}

pub struct ConversationManager {
    config: ConversationConfig,
    sessions: Mutex<HashMap<String, Vec<Message>>>,
    clock: SharedClock,
}

impl ConversationManager {
    pub fn new(config: ConversationConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ConversationConfig {
        &self.config
    }

    pub fn add_message(&self, session_id: &str, message: Message) {
        self.add_messages(session_id, vec![message]);
    }

    pub fn add_messages(&self, session_id: &str, messages: Vec<Message>) {
        if messages.is_empty() {
            return;
        }

        self.sessions()
            .entry(session_id.to_string())
            .or_default()
            .extend(messages);
    }

    pub fn get_conversation_history(&self, session_id: &str) -> Vec<Message> {
        self.sessions().get(session_id).cloned().unwrap_or_default()
    }

    pub fn get_recent_messages(&self, session_id: &str, count: usize) -> Vec<Message> {
        self.sessions()
            .get(session_id)
            .map(|messages| tail(messages, count).to_vec())
            .unwrap_or_default()
    }

    /// Messages stamped at or after `since`.
    pub fn get_messages_since(&self, session_id: &str, since: DateTime<Utc>) -> Vec<Message> {
        self.sessions()
            .get(session_id)
            .map(|messages| {
                messages
                    .iter()
                    .filter(|message| message.timestamp >= since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_conversation_context(
        &self,
        session_id: &str,
        user_id: Option<&str>,
        system_prompt: Option<&str>,
        metadata: Option<MetadataMap>,
    ) -> ConversationContext {
        let messages = match self.config.max_history {
            Some(max_history) => self.get_recent_messages(session_id, max_history),
            None => self.get_conversation_history(session_id),
        };

        ConversationContext {
            session_id: session_id.to_string(),
            user_id: user_id
                .map(str::to_string)
                .unwrap_or_else(|| self.config.default_user_id.clone()),
            messages,
            system_prompt: system_prompt.map(str::to_string),
            metadata: metadata.unwrap_or_default(),
        }
    }

    /// Drops the oldest stored messages beyond `max_history`. Returns how many
    /// were removed.
    pub fn trim_conversation(&self, session_id: &str) -> usize {
        let Some(max_history) = self.config.max_history else {
            return 0;
        };

        let mut sessions = self.sessions();
        let Some(messages) = sessions.get_mut(session_id) else {
            return 0;
        };

        let excess = messages.len().saturating_sub(max_history);
        messages.drain(..excess);
        if messages.is_empty() {
            sessions.remove(session_id);
        }
        excess
    }

    pub fn get_conversation_stats(&self, session_id: &str) -> ConversationStats {
        self.sessions()
            .get(session_id)
            .map(|messages| ConversationStats::from_messages(messages))
            .unwrap_or_default()
    }

    pub fn is_session_active(&self, session_id: &str) -> bool {
        self.sessions().contains_key(session_id)
    }

    pub fn get_active_sessions(&self) -> BTreeSet<String> {
        self.sessions().keys().cloned().collect()
    }

    pub fn get_session_count(&self) -> usize {
        self.sessions().len()
    }

    /// Returns whether the session existed.
    pub fn clear_conversation(&self, session_id: &str) -> bool {
        self.sessions().remove(session_id).is_some()
    }

    pub fn clear_all_conversations(&self) {
        self.sessions().clear();
    }

    pub fn export_conversation(&self, session_id: &str) -> ConversationExport {
        let messages = self.get_conversation_history(session_id);
        ConversationExport {
            session_id: session_id.to_string(),
            stats: ConversationStats::from_messages(&messages),
            messages,
            exported_at: self.clock.now(),
        }
    }

    /// Validates every record, then installs them as the session's history.
    ///
    /// Without `overwrite` a session that already has messages is left alone
    /// and the call fails with `AlreadyExists`. Returns the imported count.
    pub fn import_conversation(
        &self,
        session_id: &str,
        records: Vec<MessageRecord>,
        overwrite: bool,
    ) -> Result<usize, ConversationError> {
        let messages = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| record.into_message(index))
            .collect::<Result<Vec<_>, _>>()?;

        let mut sessions = self.sessions();
        if !overwrite && sessions.contains_key(session_id) {
            return Err(ConversationError::already_exists(session_id));
        }

        let imported = messages.len();
        if messages.is_empty() {
            sessions.remove(session_id);
        } else {
            sessions.insert(session_id.to_string(), messages);
        }
        Ok(imported)
    }

    /// Imports from a JSON array of message records or from an exported
    /// conversation document.
    pub fn import_conversation_json(
        &self,
        session_id: &str,
        json: &str,
        overwrite: bool,
    ) -> Result<usize, ConversationError> {
        let document: Value = serde_json::from_str(json)?;
        self.import_conversation(session_id, import_records(document)?, overwrite)
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Vec<Message>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ConversationManager {
    fn default() -> Self {
        Self::new(ConversationConfig::default())
    }
}

impl std::fmt::Debug for ConversationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationManager")
            .field("config", &self.config)
            .field("sessions", &self.get_session_count())
            .finish()
    }
}

/// Decodes each element of a bare array or of an export's `messages` field
/// on its own, so a mistyped record is reported by position.
fn import_records(document: Value) -> Result<Vec<MessageRecord>, ConversationError> {
    let items = match document {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("messages") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(ConversationError::invalid_message_format(format!(
                    "`messages` must be an array, found {}",
                    json_kind(&other)
                )));
            }
            None => {
                return Err(ConversationError::invalid_message_format(
                    "expected an array of messages or an object with a `messages` array",
                ));
            }
        },
        other => {
            return Err(ConversationError::invalid_message_format(format!(
                "expected an array of messages, found {}",
                json_kind(&other)
            )));
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<MessageRecord>(item).map_err(|error| {
                ConversationError::invalid_message_format(format!("message {index}: {error}"))
            })
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn tail(messages: &[Message], count: usize) -> &[Message] {
    &messages[messages.len().saturating_sub(count)..]
}
