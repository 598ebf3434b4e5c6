//! Conversational turn orchestration over routed model providers.
//!
//! A [`TurnService`] classifies each incoming message, routes it to an ordered
//! provider chain, and drives the [`TurnEngine`] on its own task. Callers read
//! the ordered [`StreamEvent`]s from the returned [`TurnHandle`].

mod context;
mod display;
mod engine;
mod error;
mod lock;
mod service;
mod types;

pub mod prelude {
    pub use crate::{
        CancelReason, ContextSource, DisplaySession, DisplayTransition, EnginePolicy,
        FailureKind, StreamEvent, TurnError, TurnErrorKind, TurnHandle, TurnOutcome,
        TurnPolicy, TurnReport, TurnRequest, TurnService, TurnServiceBuilder,
    };
    pub use tcommon::{ConversationId, MetadataMap, TurnId};
    pub use ttooling::{
        DefaultToolRuntime, Tool, ToolError, ToolErrorKind, ToolExecutionContext,
        ToolExecutionResult, ToolRegistry, ToolRuntime,
    };
}

pub use context::{ContextFuture, ContextSource, NoContext, StaticContext};
pub use display::{DisplaySession, DisplayTransition};
pub use engine::{EngineInput, EngineOutcome, EnginePolicy, EventSink, TurnEngine};
pub use error::{TurnError, TurnErrorKind};
pub use lock::{ConversationGuard, ConversationLocks};
pub use service::{TurnHandle, TurnPolicy, TurnService, TurnServiceBuilder};
pub use types::{
    AttemptOutcome, AttemptRecord, CancelReason, FailureKind, StreamEvent, TurnEventStream,
    TurnOutcome, TurnReport, TurnRequest,
};
pub use tcommon::{ConversationId, MetadataMap, TurnId};
