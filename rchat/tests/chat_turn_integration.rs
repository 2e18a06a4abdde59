use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use rchat::prelude::*;
use rcommon::ManualClock;
use rlimit::{RateLimitConfig, RateLimiter};
use rprovider::{
    ErrorCategory, ErrorHandler, GenerateRequest, GenerateResponse, ModelProvider, ProviderFuture,
    ProviderId, RawError, RetryPolicy, Role, TokenUsage,
};

/// Times out on every other call, answering with the running history size.
#[derive(Default)]
struct FlakyEchoProvider {
    calls: AtomicU32,
}

impl ModelProvider for FlakyEchoProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Ollama
    }

    fn generate<'a>(
        &'a self,
        request: GenerateRequest,
    ) -> ProviderFuture<'a, Result<GenerateResponse, RawError>> {
        Box::pin(async move {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call % 2 == 0 {
                return Err(RawError::from("request timed out after 30s"));
            }

            Ok(GenerateResponse {
                provider: self.id(),
                model: request.model,
                content: format!("{} prior messages", request.history.len()),
                usage: TokenUsage::default(),
            })
        })
    }
}

fn service_with(
    provider: Arc<FlakyEchoProvider>,
    limiter: Arc<RateLimiter>,
    conversations: Arc<ConversationManager>,
) -> ChatService {
    ChatService::builder(provider)
        .rate_limiter(limiter)
        .conversations(conversations)
        .error_handler(ErrorHandler::new(
            RetryPolicy::new(1)
                .with_base_delay(Duration::from_millis(1))
                .with_jitter(false),
        ))
        .build()
}

#[tokio::test]
async fn multi_turn_conversation_accumulates_history() {
    let provider = Arc::new(FlakyEchoProvider::default());
    let conversations = Arc::new(ConversationManager::default());
    let service = service_with(
        provider.clone(),
        Arc::new(RateLimiter::default()),
        conversations.clone(),
    );
    let session = ChatSession::new("trip-planning", "llama3");

    let first = service
        .run_turn(ChatTurnRequest::new(session.clone(), "where should I go?"))
        .await
        .expect("first turn");
    let second = service
        .run_turn(ChatTurnRequest::new(session, "and in winter?"))
        .await
        .expect("second turn");

    assert_eq!(first.assistant_message, "0 prior messages");
    assert_eq!(second.assistant_message, "2 prior messages");
    assert_eq!(provider.calls.load(Ordering::SeqCst), 4);

    let stats = conversations.get_conversation_stats("trip-planning");
    assert_eq!(stats.message_count, 4);
    assert_eq!(stats.user_messages, 2);
    assert_eq!(stats.assistant_messages, 2);
    let roles: Vec<Role> = conversations
        .get_conversation_history("trip-planning")
        .into_iter()
        .map(|message| message.role)
        .collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User, Role::Assistant]);
}

#[tokio::test]
async fn max_history_limits_what_the_provider_sees() {
    let provider = Arc::new(FlakyEchoProvider::default());
    let conversations = Arc::new(ConversationManager::new(
        ConversationConfig::default().with_max_history(3),
    ));
    let service = service_with(
        provider,
        Arc::new(RateLimiter::default()),
        conversations.clone(),
    );
    let session = ChatSession::new("bounded", "llama3");

    let mut last = String::new();
    for turn in 0..3 {
        last = service
            .run_turn(ChatTurnRequest::new(session.clone(), format!("turn {turn}")))
            .await
            .expect("turn succeeds")
            .assistant_message;
    }

    assert_eq!(last, "3 prior messages");
    assert_eq!(conversations.get_conversation_history("bounded").len(), 6);
}

#[tokio::test]
async fn users_share_a_rate_window_across_sessions() {
    let clock = Arc::new(ManualClock::default());
    let limiter = Arc::new(
        RateLimiter::new(RateLimitConfig::new(2, Duration::from_secs(60)))
            .expect("valid config")
            .with_clock(clock.clone()),
    );
    let service = service_with(
        Arc::new(FlakyEchoProvider::default()),
        limiter.clone(),
        Arc::new(ConversationManager::default()),
    );

    for session_id in ["a", "b"] {
        let session = ChatSession::new(session_id, "llama3").with_user_id("user-A");
        service
            .run_turn(ChatTurnRequest::new(session, "hi"))
            .await
            .expect("within limit");
    }

    let blocked = service
        .run_turn(ChatTurnRequest::new(
            ChatSession::new("c", "llama3").with_user_id("user-A"),
            "hi",
        ))
        .await
        .expect_err("third turn for user-A is throttled");
    assert_eq!(blocked.kind, ChatErrorKind::RateLimited);

    service
        .run_turn(ChatTurnRequest::new(
            ChatSession::new("c", "llama3").with_user_id("user-B"),
            "hi",
        ))
        .await
        .expect("other users are unaffected");

    clock.advance(Duration::from_secs(60));
    service
        .run_turn(ChatTurnRequest::new(
            ChatSession::new("c", "llama3").with_user_id("user-A"),
            "hi again",
        ))
        .await
        .expect("fresh window after reset");
    assert_eq!(
        limiter.get_current_status("user-A").map(|info| info.current),
        Some(1)
    );
}

#[tokio::test]
async fn exhausted_timeouts_surface_as_provider_errors() {
    let provider = Arc::new(FlakyEchoProvider::default());
    let service = ChatService::builder(provider.clone())
        .error_handler(ErrorHandler::new(RetryPolicy::without_retries()))
        .build();

    let error = service
        .run_turn(ChatTurnRequest::new(ChatSession::new("s", "llama3"), "hi"))
        .await
        .expect_err("single timed-out attempt");

    assert_eq!(error.kind, ChatErrorKind::Provider);
    assert!(error.is_retryable());
    assert_eq!(
        error.provider.as_ref().map(|classified| classified.category),
        Some(ErrorCategory::Timeout)
    );
    assert!(!service.conversations().is_session_active("s"));
}

#[tokio::test]
async fn exported_conversations_restore_into_a_fresh_manager() {
    let provider = Arc::new(FlakyEchoProvider::default());
    let conversations = Arc::new(ConversationManager::default());
    let service = service_with(
        provider,
        Arc::new(RateLimiter::default()),
        conversations.clone(),
    );
    service
        .run_turn(ChatTurnRequest::new(ChatSession::new("s", "llama3"), "hello"))
        .await
        .expect("turn");

    let json = conversations
        .export_conversation("s")
        .to_json()
        .expect("export");
    let restored = ConversationManager::default();
    restored
        .import_conversation_json("s", &json, false)
        .expect("import");

    assert_eq!(
        restored.get_conversation_history("s"),
        conversations.get_conversation_history("s")
    );
}
