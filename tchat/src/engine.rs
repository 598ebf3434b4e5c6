//! Streaming tool-use engine.
//!
//! Drives one turn across the routed candidates: opens a provider stream,
//! translates provider events into [`StreamEvent`]s, runs requested tools and
//! feeds their results back, and fails over on connection-level errors. The
//! engine threads its own [`DisplaySession`] through the turn so the final
//! text follows the same suppression and reset rules the renderer applies.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tcommon::{ConversationId, MetadataMap, TurnId};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;
use tprovider::{
    BoxedEventStream, Message, ModelProvider, NoopOperationHooks, ProviderError, ProviderEvent,
    ProviderId, ProviderOperationHooks, ProviderRegistry, ProviderRequest, TokenUsage, ToolCall,
    ToolDefinition, ToolExchange,
};
use trouting::{Admission, CircuitBreakerRegistry, RoutingDecision};
use ttooling::{
    DefaultToolRuntime, ToolError, ToolExecutionContext, ToolExecutionRequest,
    ToolExecutionResult, ToolRuntime,
};

use crate::{
    AttemptOutcome, AttemptRecord, CancelReason, DisplaySession, DisplayTransition, FailureKind,
    StreamEvent, TurnOutcome,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnginePolicy {
    pub max_tool_round_trips: u32,
    pub chunk_timeout: Duration,
    /// Shown when a turn ends without trailing narration.
    pub completion_marker: String,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            max_tool_round_trips: 5,
            chunk_timeout: Duration::from_secs(60),
            completion_marker: "Done.".to_string(),
        }
    }
}

impl EnginePolicy {
    pub fn with_max_tool_round_trips(mut self, max_tool_round_trips: u32) -> Self {
        self.max_tool_round_trips = max_tool_round_trips;
        self
    }

    pub fn with_chunk_timeout(mut self, chunk_timeout: Duration) -> Self {
        self.chunk_timeout = chunk_timeout;
        self
    }

    pub fn with_completion_marker(mut self, completion_marker: impl Into<String>) -> Self {
        self.completion_marker = completion_marker.into();
        self
    }
}

/// Ordered, bounded delivery of one turn's events.
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: mpsc::Sender<StreamEvent>,
}

impl EventSink {
    pub fn new(sender: mpsc::Sender<StreamEvent>) -> Self {
        Self { sender }
    }

    /// Returns false once the consumer has gone away; the turn still runs to
    /// completion so breaker bookkeeping stays accurate.
    pub async fn emit(&self, event: StreamEvent) -> bool {
        match self.sender.send(event).await {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!("turn event dropped, consumer is gone");
                false
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineInput {
    pub conversation_id: ConversationId,
    pub turn_id: TurnId,
    pub decision: RoutingDecision,
    pub system: Option<String>,
    pub context: Option<String>,
    /// Full history including the new user message.
    pub history: Vec<Message>,
    pub metadata: MetadataMap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOutcome {
    pub outcome: TurnOutcome,
    pub final_text: String,
    pub attempts: Vec<AttemptRecord>,
    pub tool_exchanges: Vec<ToolExchange>,
    pub usage: TokenUsage,
}

pub struct TurnEngine {
    providers: ProviderRegistry,
    breakers: Arc<CircuitBreakerRegistry>,
    tools: Arc<dyn ToolRuntime>,
    tool_definitions: Vec<ToolDefinition>,
    policy: EnginePolicy,
    hooks: Arc<dyn ProviderOperationHooks>,
}

impl TurnEngine {
    pub fn new(providers: ProviderRegistry, breakers: Arc<CircuitBreakerRegistry>) -> Self {
        Self {
            providers,
            breakers,
            tools: Arc::new(DefaultToolRuntime::default()),
            tool_definitions: Vec::new(),
            policy: EnginePolicy::default(),
            hooks: Arc::new(NoopOperationHooks),
        }
    }

    pub fn with_tools(
        mut self,
        runtime: Arc<dyn ToolRuntime>,
        definitions: Vec<ToolDefinition>,
    ) -> Self {
        self.tools = runtime;
        self.tool_definitions = definitions;
        self
    }

    pub fn with_policy(mut self, policy: EnginePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn policy(&self) -> &EnginePolicy {
        &self.policy
    }

    pub async fn run(
        &self,
        input: &EngineInput,
        sink: &EventSink,
        cancel: &CancellationToken,
        deadline: Instant,
    ) -> EngineOutcome {
        let mut run = TurnRun {
            engine: self,
            input,
            sink,
            cancel,
            deadline,
            display: DisplaySession::new(),
            pending: Vec::new(),
            exchanges: Vec::new(),
            attempts: Vec::new(),
            usage: TokenUsage::default(),
            round_trips: 0,
        };

        let mut previous: Option<ProviderId> = None;
        let mut attempt_number = 0_u32;
        let mut last_error: Option<ProviderError> = None;

        for candidate in &input.decision.candidates {
            let provider_id = candidate.provider;
            let Some(provider) = self.providers.get(provider_id) else {
                tracing::warn!(provider = %provider_id, "routed provider is not registered");
                run.record(provider_id, AttemptOutcome::NotRegistered);
                continue;
            };

            let admission = self.breakers.try_acquire(provider_id);
            if !admission.is_admitted() {
                tracing::debug!(provider = %provider_id, "breaker rejected routed provider");
                run.record(provider_id, AttemptOutcome::NotAdmitted);
                continue;
            }

            if let Some(from) = previous {
                self.hooks.on_failover(from, provider_id);
                run.emit(StreamEvent::ProviderSwitched {
                    from,
                    to: provider_id,
                })
                .await;
            }
            previous = Some(provider_id);
            attempt_number += 1;

            tracing::info!(
                conversation = %input.conversation_id,
                turn = %input.turn_id,
                provider = %provider_id,
                reason = ?candidate.reason,
                attempt = attempt_number,
                probe = admission == Admission::Probe,
                "starting provider attempt"
            );
            self.hooks.on_attempt_start(provider_id, attempt_number);
            let started_at = Instant::now();

            match run.attempt(provider.as_ref()).await {
                AttemptEnd::Completed => {
                    self.breakers.record_success(provider_id);
                    self.hooks
                        .on_success(provider_id, attempt_number, started_at.elapsed());
                    run.record(provider_id, AttemptOutcome::Completed);
                    return run.complete().await;
                }
                AttemptEnd::ConnectionFailure(error) => {
                    tracing::warn!(
                        provider = %provider_id,
                        error = %error,
                        "provider connection failed, advancing to next candidate"
                    );
                    self.breakers.record_failure(provider_id);
                    self.hooks
                        .on_failure(provider_id, attempt_number, &error, started_at.elapsed());
                    run.record(provider_id, AttemptOutcome::ConnectionFailed(error.kind));
                    run.abandon_pending("the provider connection failed").await;
                    last_error = Some(error);
                }
                AttemptEnd::Rejected(error) => {
                    tracing::warn!(
                        provider = %provider_id,
                        error = %error,
                        "provider rejected the turn content"
                    );
                    // The provider answered, so it counts as healthy.
                    self.breakers.record_success(provider_id);
                    self.hooks
                        .on_failure(provider_id, attempt_number, &error, started_at.elapsed());
                    run.record(provider_id, AttemptOutcome::Rejected(error.kind));
                    run.abandon_pending("the provider rejected the request").await;
                    run.close_tool_turn().await;
                    return run.fail(FailureKind::ProviderRejected, error.message).await;
                }
                AttemptEnd::Invalid(error) => {
                    tracing::error!(
                        provider = %provider_id,
                        error = %error,
                        "turn produced a request no provider can accept"
                    );
                    if admission == Admission::Probe {
                        self.breakers.release_probe(provider_id);
                    }
                    run.record(provider_id, AttemptOutcome::InvalidRequest);
                    run.abandon_pending("the turn request was invalid").await;
                    run.close_tool_turn().await;
                    return run.fail(FailureKind::Internal, error.message).await;
                }
                AttemptEnd::Cancelled(reason) => {
                    if admission == Admission::Probe {
                        self.breakers.release_probe(provider_id);
                    }
                    run.record(provider_id, AttemptOutcome::Cancelled);
                    run.abandon_pending("the turn was cancelled").await;
                    return run.cancelled(reason).await;
                }
            }
        }

        match (previous, last_error) {
            (Some(_), Some(error)) => {
                run.fail(
                    FailureKind::ProvidersExhausted,
                    format!("every routed provider failed; last error: {error}"),
                )
                .await
            }
            _ => {
                run.fail(
                    FailureKind::NoProviderAvailable,
                    "no routed provider admitted the turn",
                )
                .await
            }
        }
    }
}

enum AttemptEnd {
    Completed,
    ConnectionFailure(ProviderError),
    Rejected(ProviderError),
    /// Built locally and refused before reaching the provider.
    Invalid(ProviderError),
    Cancelled(CancelReason),
}

impl AttemptEnd {
    fn from_error(error: ProviderError) -> Self {
        if error.is_connection_failure() {
            Self::ConnectionFailure(error)
        } else {
            Self::Rejected(error)
        }
    }
}

struct TurnRun<'a> {
    engine: &'a TurnEngine,
    input: &'a EngineInput,
    sink: &'a EventSink,
    cancel: &'a CancellationToken,
    deadline: Instant,
    display: DisplaySession,
    /// Calls announced with `ToolCallRequested` that have no result yet.
    pending: Vec<ToolCall>,
    exchanges: Vec<ToolExchange>,
    attempts: Vec<AttemptRecord>,
    usage: TokenUsage,
    round_trips: u32,
}

impl TurnRun<'_> {
    async fn attempt(&mut self, provider: &dyn ModelProvider) -> AttemptEnd {
        loop {
            let request = self.provider_request(provider);
            if let Err(error) = request.validate() {
                return AttemptEnd::Invalid(error);
            }

            let stream = match self.wait_for_chunk(provider.open_stream(request)).await {
                Waited::Ready(Ok(stream)) => stream,
                Waited::Ready(Err(error)) => return AttemptEnd::from_error(error),
                Waited::ChunkTimedOut => return AttemptEnd::ConnectionFailure(self.chunk_timeout()),
                Waited::Interrupted(reason) => return AttemptEnd::Cancelled(reason),
            };

            if let Err(end) = self.consume(stream).await {
                return end;
            }

            if self.pending.is_empty() {
                return AttemptEnd::Completed;
            }

            if self.round_trips >= self.engine.policy.max_tool_round_trips {
                tracing::warn!(
                    turn = %self.input.turn_id,
                    round_trips = self.round_trips,
                    "tool round-trip limit reached, finalising turn"
                );
                self.abandon_pending("the tool round-trip limit was reached")
                    .await;
                self.emit(StreamEvent::ToolTurnComplete).await;
                return AttemptEnd::Completed;
            }

            if let Err(reason) = self.execute_pending().await {
                return AttemptEnd::Cancelled(reason);
            }
            self.round_trips += 1;
        }
    }

    fn provider_request(&self, provider: &dyn ModelProvider) -> ProviderRequest {
        let mut request = ProviderRequest::new(self.input.history.clone())
            .with_tool_exchanges(self.exchanges.clone());
        request.metadata = self.input.metadata.clone();

        if let Some(system) = &self.input.system {
            request = request.with_system(system.clone());
        }
        if let Some(context) = &self.input.context {
            request = request.with_context(context.clone());
        }
        if provider.descriptor().supports_tools() && !self.engine.tool_definitions.is_empty() {
            request = request.with_tools(self.engine.tool_definitions.clone());
        }

        request
    }

    /// Reads one provider response. Tool calls it requests are left in
    /// `pending`.
    async fn consume(&mut self, mut stream: BoxedEventStream<'_>) -> Result<(), AttemptEnd> {
        let mut announced = HashSet::new();

        loop {
            let event = match self.wait_for_chunk(stream.next()).await {
                Waited::Ready(Some(Ok(event))) => event,
                Waited::Ready(Some(Err(error))) => return Err(AttemptEnd::from_error(error)),
                Waited::Ready(None) => {
                    return Err(AttemptEnd::ConnectionFailure(ProviderError::disconnected(
                        "stream ended before the response finished",
                    )));
                }
                Waited::ChunkTimedOut => {
                    return Err(AttemptEnd::ConnectionFailure(self.chunk_timeout()));
                }
                Waited::Interrupted(reason) => return Err(AttemptEnd::Cancelled(reason)),
            };

            match event {
                ProviderEvent::TextDelta(text) => {
                    self.emit(StreamEvent::TextDelta(text)).await;
                }
                ProviderEvent::ToolUseStarted { id, name } => {
                    if announced.insert(id) {
                        self.emit(StreamEvent::ToolStatus(name)).await;
                    }
                }
                ProviderEvent::ToolUseReady(call) => {
                    if announced.insert(call.id.clone()) {
                        self.emit(StreamEvent::ToolStatus(call.name.clone())).await;
                    }
                    self.emit(StreamEvent::ToolCallRequested {
                        id: call.id.clone(),
                        tool_name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    })
                    .await;
                    self.pending.push(call);
                }
                ProviderEvent::ResponseEnd { stop_reason, usage } => {
                    tracing::debug!(
                        turn = %self.input.turn_id,
                        stop_reason = ?stop_reason,
                        pending_tools = self.pending.len(),
                        "provider response finished"
                    );
                    self.usage.accumulate(usage);
                    return Ok(());
                }
            }
        }
    }

    async fn execute_pending(&mut self) -> Result<(), CancelReason> {
        let mut calls = std::mem::take(&mut self.pending).into_iter();

        while let Some(call) = calls.next() {
            let request = ToolExecutionRequest::from(call);
            let context = ToolExecutionContext::new(self.input.conversation_id.clone())
                .with_turn_id(self.input.turn_id.clone());

            let execution = self.engine.tools.execute(request.clone(), context);
            let result = match interruptible(execution, self.cancel, self.deadline).await {
                Ok(result) => result,
                Err(reason) => {
                    self.pending = std::iter::once(request.to_call()).chain(calls).collect();
                    return Err(reason);
                }
            };

            if let Err(error) = &result.outcome {
                tracing::info!(
                    tool = %request.tool_name,
                    error = %error,
                    "tool failed, returning the error to the provider"
                );
            }

            self.emit(StreamEvent::ToolResult {
                id: result.id.clone(),
                result_text: result.result_text(),
            })
            .await;
            self.exchanges.push(result.into_exchange(&request));
        }

        self.emit(StreamEvent::ToolTurnComplete).await;
        Ok(())
    }

    /// Gives every unanswered call a synthetic result so no request is left
    /// dangling.
    async fn abandon_pending(&mut self, reason: &str) {
        for call in std::mem::take(&mut self.pending) {
            let request = ToolExecutionRequest::from(call);
            let result = ToolExecutionResult::failed(&request, ToolError::abandoned(reason));
            self.emit(StreamEvent::ToolResult {
                id: result.id.clone(),
                result_text: result.result_text(),
            })
            .await;
        }
    }

    async fn emit(&mut self, event: StreamEvent) {
        if self.display.apply(&event) == DisplayTransition::Suppressed {
            tracing::trace!(
                turn = %self.input.turn_id,
                text = ?event,
                "suppressed narration inside tool turn"
            );
        }
        self.sink.emit(event).await;
    }

    fn record(&mut self, provider: ProviderId, outcome: AttemptOutcome) {
        self.attempts.push(AttemptRecord { provider, outcome });
    }

    async fn complete(mut self) -> EngineOutcome {
        let final_text = if self.display.current_display().trim().is_empty() {
            self.engine.policy.completion_marker.clone()
        } else {
            self.display.current_display().to_string()
        };

        self.emit(StreamEvent::StreamComplete(final_text.clone()))
            .await;
        self.into_outcome(TurnOutcome::Completed, final_text)
    }

    /// Ends a tool turn the provider left open so its preamble never
    /// survives as narration.
    async fn close_tool_turn(&mut self) {
        if self.display.tool_turn_active() {
            self.emit(StreamEvent::ToolTurnComplete).await;
        }
    }

    async fn fail(mut self, kind: FailureKind, detail: impl Into<String>) -> EngineOutcome {
        let detail = detail.into();
        tracing::warn!(turn = %self.input.turn_id, kind = ?kind, detail = %detail, "turn failed");
        self.emit(StreamEvent::StreamFailed {
            kind,
            detail: detail.clone(),
        })
        .await;
        self.into_outcome(TurnOutcome::Failed(kind), detail)
    }

    async fn cancelled(mut self, reason: CancelReason) -> EngineOutcome {
        let partial_text = self.display.current_display().to_string();
        tracing::info!(turn = %self.input.turn_id, reason = ?reason, "turn cancelled");
        self.emit(StreamEvent::StreamCancelled {
            partial_text: partial_text.clone(),
            reason,
        })
        .await;
        self.into_outcome(TurnOutcome::Cancelled(reason), partial_text)
    }

    fn into_outcome(self, outcome: TurnOutcome, final_text: String) -> EngineOutcome {
        EngineOutcome {
            outcome,
            final_text,
            attempts: self.attempts,
            tool_exchanges: self.exchanges,
            usage: self.usage,
        }
    }

    fn chunk_timeout(&self) -> ProviderError {
        ProviderError::timeout(format!(
            "no provider output within {}ms",
            self.engine.policy.chunk_timeout.as_millis()
        ))
    }

    async fn wait_for_chunk<F: Future>(&self, future: F) -> Waited<F::Output> {
        let chunk_timeout = self.engine.policy.chunk_timeout;
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Waited::Interrupted(CancelReason::UserRequested),
            _ = sleep_until(self.deadline) => Waited::Interrupted(CancelReason::TimedOut),
            output = future => Waited::Ready(output),
            _ = sleep(chunk_timeout) => Waited::ChunkTimedOut,
        }
    }
}

enum Waited<T> {
    Ready(T),
    ChunkTimedOut,
    Interrupted(CancelReason),
}

/// Awaits `future` unless the turn is cancelled or its deadline passes first.
pub(crate) async fn interruptible<F: Future>(
    future: F,
    cancel: &CancellationToken,
    deadline: Instant,
) -> Result<F::Output, CancelReason> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CancelReason::UserRequested),
        _ = sleep_until(deadline) => Err(CancelReason::TimedOut),
        output = future => Ok(output),
    }
}
