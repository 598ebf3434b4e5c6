/// Creates a single history [`Message`](crate::Message) from a role shorthand.
///
/// ```rust
/// use turnstile::{Role, ts_msg};
///
/// let message = ts_msg!(assistant => "Done.");
/// assert_eq!(message.role, Role::Assistant);
/// assert_eq!(message.content, "Done.");
/// ```
#[macro_export]
macro_rules! ts_msg {
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

/// Creates a conversation history from role/content pairs.
///
/// ```rust
/// use turnstile::{Role, ts_history};
///
/// let history = ts_history![
///     user => "Remind me what we decided.",
///     assistant => "Tea, not coffee.",
/// ];
///
/// assert_eq!(history.len(), 2);
/// assert_eq!(history[1].role, Role::Assistant);
/// ```
#[macro_export]
macro_rules! ts_history {
    () => {
        Vec::<$crate::Message>::new()
    };
    ($($role:ident => $content:expr),+ $(,)?) => {
        vec![$($crate::ts_msg!($role => $content)),+]
    };
}
