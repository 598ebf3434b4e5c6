//! Turn request, stream event, and report types.

use std::pin::Pin;

use futures_core::Stream;
use tcommon::{ConversationId, MetadataMap, TurnId};
use tprovider::{Message, ProviderErrorKind, ProviderId, TokenUsage, ToolExchange};
use trouting::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NoProviderAvailable,
    ProvidersExhausted,
    ProviderRejected,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    UserRequested,
    TimedOut,
}

/// Ordered display events for one turn. Produced only by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    TextDelta(String),
    ToolStatus(String),
    ToolCallRequested {
        id: String,
        tool_name: String,
        arguments: String,
    },
    ToolResult {
        id: String,
        result_text: String,
    },
    ToolTurnComplete,
    /// The previous provider failed; narration from its attempt is void.
    ProviderSwitched {
        from: ProviderId,
        to: ProviderId,
    },
    StreamComplete(String),
    StreamFailed {
        kind: FailureKind,
        detail: String,
    },
    StreamCancelled {
        partial_text: String,
        reason: CancelReason,
    },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::StreamComplete(_) | Self::StreamFailed { .. } | Self::StreamCancelled { .. }
        )
    }
}

pub type TurnEventStream<'a> = Pin<Box<dyn Stream<Item = StreamEvent> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub conversation_id: ConversationId,
    pub message: String,
    /// Prior turns, oldest first. The new message is appended by the service.
    pub history: Vec<Message>,
    pub system_prompt: Option<String>,
    pub metadata: MetadataMap,
}

impl TurnRequest {
    pub fn new(conversation_id: impl Into<ConversationId>, message: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            message: message.into(),
            history: Vec::new(),
            system_prompt: None,
            metadata: MetadataMap::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Completed,
    ConnectionFailed(ProviderErrorKind),
    Rejected(ProviderErrorKind),
    InvalidRequest,
    Cancelled,
    NotAdmitted,
    NotRegistered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub provider: ProviderId,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Failed(FailureKind),
    Cancelled(CancelReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    pub conversation_id: ConversationId,
    pub turn_id: TurnId,
    pub category: Option<Category>,
    pub outcome: TurnOutcome,
    /// Text carried by the terminal event.
    pub final_text: String,
    pub attempts: Vec<AttemptRecord>,
    pub tool_exchanges: Vec<ToolExchange>,
    pub usage: TokenUsage,
}

impl TurnReport {
    pub fn is_completed(&self) -> bool {
        self.outcome == TurnOutcome::Completed
    }
}
