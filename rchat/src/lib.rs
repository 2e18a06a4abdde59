//! Conversation history and chat-turn orchestration over model providers.
//!
//! [`ConversationManager`] keeps ordered per-session history in memory.
//! [`ChatService`] runs a turn end to end: it asks the rate limiter for
//! admission, builds the provider request from the session's context, calls
//! the provider through the retrying [`rprovider::ErrorHandler`], and records
//! the exchange once the provider answers.
//!
//! ```rust
//! use rchat::{ConversationConfig, ConversationManager};
//! use rprovider::{Message, Role};
//!
//! let manager = ConversationManager::new(ConversationConfig::default().with_max_history(1));
//! manager.add_message("s-1", Message::new(Role::User, "first"));
//! manager.add_message("s-1", Message::new(Role::User, "second"));
//!
//! let context = manager.get_conversation_context("s-1", None, None, None);
//! assert_eq!(context.user_id, "anonymous");
//! assert_eq!(context.messages.len(), 1);
//! assert_eq!(context.messages[0].content, "second");
//! ```

mod error;
mod manager;
mod service;
mod types;

pub mod prelude {
    pub use crate::{
        ChatError, ChatErrorKind, ChatService, ChatServiceBuilder, ChatSession, ChatTurnRequest,
        ChatTurnResult, ConversationConfig, ConversationContext, ConversationError,
        ConversationErrorKind, ConversationExport, ConversationManager, ConversationStats,
        MessageRecord,
    };
    pub use rcommon::{MetadataMap, SessionId};
}

pub use error::{ChatError, ChatErrorKind, ConversationError, ConversationErrorKind};
pub use manager::{ConversationConfig, ConversationManager};
pub use service::{ChatService, ChatServiceBuilder};
pub use types::{
    ChatSession, ChatTurnRequest, ChatTurnResult, ConversationContext, ConversationExport,
    ConversationStats, MessageRecord,
};
pub use rcommon::{MetadataMap, SessionId};
