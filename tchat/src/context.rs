//! Memory context contracts.
//!
//! The memory subsystem is a black box: it hands back one string that is
//! injected verbatim into the provider prompt.

use tcommon::{BoxFuture, ConversationId};

use crate::TurnError;

pub type ContextFuture<'a, T> = BoxFuture<'a, T>;

pub trait ContextSource: Send + Sync {
    fn build_context<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        message: &'a str,
    ) -> ContextFuture<'a, Result<Option<String>, TurnError>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoContext;

impl ContextSource for NoContext {
    fn build_context<'a>(
        &'a self,
        _conversation_id: &'a ConversationId,
        _message: &'a str,
    ) -> ContextFuture<'a, Result<Option<String>, TurnError>> {
        Box::pin(async { Ok(None) })
    }
}

/// Returns the same context for every turn.
#[derive(Debug, Clone)]
pub struct StaticContext {
    context: String,
}

impl StaticContext {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
        }
    }
}

impl ContextSource for StaticContext {
    fn build_context<'a>(
        &'a self,
        _conversation_id: &'a ConversationId,
        _message: &'a str,
    ) -> ContextFuture<'a, Result<Option<String>, TurnError>> {
        Box::pin(async move { Ok(Some(self.context.clone())) })
    }
}
