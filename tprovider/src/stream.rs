//! Provider event stream contracts and in-memory stream utilities.
//!
//! ```rust
//! use tprovider::{BoxedEventStream, ProviderEvent, VecEventStream};
//!
//! let stream = VecEventStream::new(vec![Ok(ProviderEvent::TextDelta("hello".into()))]);
//! let _boxed: BoxedEventStream<'static> = Box::pin(stream);
//! ```

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::{ProviderError, StopReason, TokenUsage, ToolCall};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    TextDelta(String),
    /// The model announced a tool call; arguments are still streaming.
    ToolUseStarted { id: String, name: String },
    /// Arguments for a previously started tool call are complete.
    ToolUseReady(ToolCall),
    ResponseEnd {
        stop_reason: StopReason,
        usage: TokenUsage,
    },
}

/// Provider stream contract.
///
/// Invariants for consumers:
/// - Events are emitted in source order.
/// - `ToolUseStarted` precedes the `ToolUseReady` with the same id.
/// - `ResponseEnd` is the last event of one provider response.
/// - Connection-level failures surface as `Err` items or as a stalled stream.
pub trait ModelEventStream: Stream<Item = Result<ProviderEvent, ProviderError>> + Send {}

impl<T> ModelEventStream for T where T: Stream<Item = Result<ProviderEvent, ProviderError>> + Send {}

pub type BoxedEventStream<'a> = Pin<Box<dyn ModelEventStream + 'a>>;

#[derive(Debug)]
pub struct VecEventStream {
    events: VecDeque<Result<ProviderEvent, ProviderError>>,
}

impl VecEventStream {
    pub fn new(events: Vec<Result<ProviderEvent, ProviderError>>) -> Self {
        Self {
            events: events.into(),
        }
    }
}

impl Stream for VecEventStream {
    type Item = Result<ProviderEvent, ProviderError>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<ProviderEvent, ProviderError>>> {
        Poll::Ready(self.events.pop_front())
    }
}
