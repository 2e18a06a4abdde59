/// Creates a single chat [`Message`](crate::Message) from a role shorthand.
///
/// ```rust
/// use relaykit::{Role, rk_msg};
///
/// let message = rk_msg!(assistant => "Done.");
/// assert_eq!(message.role, Role::Assistant);
/// assert_eq!(message.content, "Done.");
/// ```
#[macro_export]
macro_rules! rk_msg {
    (system => $content:expr $(,)?) => {
        $crate::Message::new($crate::Role::System, $content)
    };
    (user => $content:expr $(,)?) => {
        $crate::Message::new($crate::Role::User, $content)
    };
    (assistant => $content:expr $(,)?) => {
        $crate::Message::new($crate::Role::Assistant, $content)
    };
    ($role:ident => $content:expr $(,)?) => {
        compile_error!("unsupported role: use system, user, or assistant");
    };
}

/// Creates a `Vec<Message>` from role/content pairs.
///
/// ```rust
/// use relaykit::{Role, rk_messages};
///
/// let messages = rk_messages![
///     system => "You are concise.",
///     user => "Summarize this repository.",
/// ];
///
/// assert_eq!(messages.len(), 2);
/// assert_eq!(messages[0].role, Role::System);
/// assert_eq!(messages[1].role, Role::User);
/// ```
#[macro_export]
macro_rules! rk_messages {
    () => {
        Vec::<$crate::Message>::new()
    };
    ($($role:ident => $content:expr),+ $(,)?) => {
        vec![$($crate::rk_msg!($role => $content)),+]
    };
}

/// Creates a [`ChatSession`](crate::ChatSession), optionally with a system
/// prompt and a user id.
///
/// ```rust
/// use relaykit::rk_session;
///
/// let session = rk_session!("session-1", "gpt-4o-mini", "Be concise.", user = "u-1");
/// assert_eq!(session.system_prompt.as_deref(), Some("Be concise."));
/// assert_eq!(session.rate_limit_key(), "u-1");
/// ```
#[macro_export]
macro_rules! rk_session {
    ($session_id:expr, $model:expr $(,)?) => {
        $crate::ChatSession::new($session_id, $model)
    };
    ($session_id:expr, $model:expr, user = $user_id:expr $(,)?) => {
        $crate::ChatSession::new($session_id, $model).with_user_id($user_id)
    };
    ($session_id:expr, $model:expr, $system_prompt:expr $(,)?) => {
        $crate::ChatSession::new($session_id, $model).with_system_prompt($system_prompt)
    };
    ($session_id:expr, $model:expr, $system_prompt:expr, user = $user_id:expr $(,)?) => {
        $crate::ChatSession::new($session_id, $model)
            .with_system_prompt($system_prompt)
            .with_user_id($user_id)
    };
}
