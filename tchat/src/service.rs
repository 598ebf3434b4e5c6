//! Turn API: classification, routing, and engine wiring per turn.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tcommon::{ConversationId, TurnId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tprovider::{
    Message, NoopOperationHooks, ProviderOperationHooks, ProviderRegistry, TokenUsage,
    ToolDefinition,
};
use trouting::{Category, CircuitBreakerRegistry, Router, classify_detailed, estimate_tokens};
use ttooling::{DefaultToolRuntime, ToolRegistry, ToolRuntime};

use crate::engine::interruptible;
use crate::{
    CancelReason, ContextSource, ConversationLocks, EngineInput, EnginePolicy, EventSink,
    FailureKind, NoContext, StreamEvent, TurnEngine, TurnError, TurnEventStream, TurnOutcome,
    TurnReport, TurnRequest,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnPolicy {
    pub max_turn_duration: Duration,
    pub event_buffer: usize,
    /// Recent history messages the classifier may look at.
    pub classification_window: usize,
}

impl Default for TurnPolicy {
    fn default() -> Self {
        Self {
            max_turn_duration: Duration::from_secs(120),
            event_buffer: 64,
            classification_window: 6,
        }
    }
}

impl TurnPolicy {
    pub fn with_max_turn_duration(mut self, max_turn_duration: Duration) -> Self {
        self.max_turn_duration = max_turn_duration;
        self
    }

    pub fn with_event_buffer(mut self, event_buffer: usize) -> Self {
        self.event_buffer = event_buffer.max(1);
        self
    }

    pub fn with_classification_window(mut self, classification_window: usize) -> Self {
        self.classification_window = classification_window;
        self
    }
}

/// A running turn: its ordered events, a cancel switch, and the final report.
pub struct TurnHandle {
    turn_id: TurnId,
    events: mpsc::Receiver<StreamEvent>,
    cancel: CancellationToken,
    report: JoinHandle<TurnReport>,
}

impl TurnHandle {
    pub fn turn_id(&self) -> &TurnId {
        &self.turn_id
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    pub fn events(&mut self) -> TurnEventStream<'_> {
        let events = &mut self.events;
        Box::pin(async_stream::stream! {
            while let Some(event) = events.recv().await {
                yield event;
            }
        })
    }

    /// Drains remaining events and waits for the report.
    pub async fn finish(mut self) -> Result<TurnReport, TurnError> {
        while self.events.recv().await.is_some() {}
        Ok(self.report.await?)
    }

    pub async fn collect(mut self) -> Result<(Vec<StreamEvent>, TurnReport), TurnError> {
        let mut events = Vec::new();
        while let Some(event) = self.events.recv().await {
            events.push(event);
        }
        Ok((events, self.report.await?))
    }
}

#[derive(Clone)]
pub struct TurnService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    router: Router,
    engine: TurnEngine,
    context: Arc<dyn ContextSource>,
    locks: ConversationLocks,
    policy: TurnPolicy,
    sequence: AtomicU64,
}

impl TurnService {
    pub fn builder(router: Router, providers: ProviderRegistry) -> TurnServiceBuilder {
        TurnServiceBuilder::new(router, providers)
    }

    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakerRegistry> {
        self.inner.router.breakers()
    }

    pub fn policy(&self) -> &TurnPolicy {
        &self.inner.policy
    }

    /// Starts a turn on its own task. Must be called inside a Tokio runtime.
    pub fn run_turn(&self, request: TurnRequest) -> Result<TurnHandle, TurnError> {
        if request.message.trim().is_empty() {
            return Err(TurnError::invalid_request("message must not be empty"));
        }

        let sequence = self.inner.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let turn_id = TurnId::for_sequence(&request.conversation_id, sequence);
        let (sender, events) = mpsc::channel(self.inner.policy.event_buffer.max(1));
        let cancel = CancellationToken::new();

        let inner = Arc::clone(&self.inner);
        let task_turn_id = turn_id.clone();
        let task_cancel = cancel.clone();
        let report = tokio::spawn(async move {
            inner
                .drive(request, task_turn_id, EventSink::new(sender), task_cancel)
                .await
        });

        Ok(TurnHandle {
            turn_id,
            events,
            cancel,
            report,
        })
    }

    /// Runs a turn to the end for callers that only need the final text.
    pub async fn run_turn_text(&self, request: TurnRequest) -> Result<TurnReport, TurnError> {
        self.run_turn(request)?.finish().await
    }
}

impl ServiceInner {
    async fn drive(
        &self,
        request: TurnRequest,
        turn_id: TurnId,
        sink: EventSink,
        cancel: CancellationToken,
    ) -> TurnReport {
        let TurnRequest {
            conversation_id,
            message,
            history,
            system_prompt,
            metadata,
        } = request;
        let report = ReportSeed {
            conversation_id: conversation_id.clone(),
            turn_id: turn_id.clone(),
        };

        let _guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return report.cancelled(&sink, None, CancelReason::UserRequested).await;
            }
            guard = self.locks.acquire(&conversation_id) => guard,
        };
        let deadline = Instant::now() + self.policy.max_turn_duration;

        let window_start = history
            .len()
            .saturating_sub(self.policy.classification_window);
        let classification = classify_detailed(&message, &history[window_start..]);
        let category = classification.category;
        tracing::info!(
            conversation = %conversation_id,
            turn = %turn_id,
            category = %category,
            signals = ?classification.signals,
            inherited = classification.inherited,
            "classified turn"
        );

        let context_future = self.context.build_context(&conversation_id, &message);
        let context = match interruptible(context_future, &cancel, deadline).await {
            Ok(Ok(context)) => context,
            Ok(Err(error)) => {
                tracing::warn!(
                    conversation = %conversation_id,
                    error = %error,
                    "memory context unavailable, continuing without it"
                );
                None
            }
            Err(reason) => return report.cancelled(&sink, Some(category), reason).await,
        };

        let mut history = history;
        history.push(Message::user(message));

        let context_tokens = estimate_tokens(
            system_prompt
                .iter()
                .chain(context.iter())
                .map(String::as_str)
                .chain(history.iter().map(|message| message.content.as_str())),
        );

        let decision = match self.router.route(category, context_tokens) {
            Ok(decision) => decision,
            Err(error) => {
                let detail = error.message;
                sink.emit(StreamEvent::StreamFailed {
                    kind: FailureKind::NoProviderAvailable,
                    detail: detail.clone(),
                })
                .await;
                return report.finish(
                    Some(category),
                    TurnOutcome::Failed(FailureKind::NoProviderAvailable),
                    detail,
                );
            }
        };

        let input = EngineInput {
            conversation_id,
            turn_id,
            decision,
            system: system_prompt,
            context,
            history,
            metadata,
        };
        let outcome = self.engine.run(&input, &sink, &cancel, deadline).await;

        tracing::info!(
            conversation = %input.conversation_id,
            turn = %input.turn_id,
            outcome = ?outcome.outcome,
            attempts = outcome.attempts.len(),
            tool_exchanges = outcome.tool_exchanges.len(),
            "turn finished"
        );

        TurnReport {
            conversation_id: input.conversation_id,
            turn_id: input.turn_id,
            category: Some(category),
            outcome: outcome.outcome,
            final_text: outcome.final_text,
            attempts: outcome.attempts,
            tool_exchanges: outcome.tool_exchanges,
            usage: outcome.usage,
        }
    }
}

struct ReportSeed {
    conversation_id: ConversationId,
    turn_id: TurnId,
}

impl ReportSeed {
    async fn cancelled(
        self,
        sink: &EventSink,
        category: Option<Category>,
        reason: CancelReason,
    ) -> TurnReport {
        sink.emit(StreamEvent::StreamCancelled {
            partial_text: String::new(),
            reason,
        })
        .await;
        self.finish(category, TurnOutcome::Cancelled(reason), String::new())
    }

    fn finish(
        self,
        category: Option<Category>,
        outcome: TurnOutcome,
        final_text: String,
    ) -> TurnReport {
        TurnReport {
            conversation_id: self.conversation_id,
            turn_id: self.turn_id,
            category,
            outcome,
            final_text,
            attempts: Vec::new(),
            tool_exchanges: Vec::new(),
            usage: TokenUsage::default(),
        }
    }
}

pub struct TurnServiceBuilder {
    router: Router,
    providers: ProviderRegistry,
    tools: Option<(Arc<dyn ToolRuntime>, Vec<ToolDefinition>)>,
    context: Arc<dyn ContextSource>,
    engine_policy: EnginePolicy,
    turn_policy: TurnPolicy,
    hooks: Arc<dyn ProviderOperationHooks>,
    locks: ConversationLocks,
}

impl TurnServiceBuilder {
    pub fn new(router: Router, providers: ProviderRegistry) -> Self {
        Self {
            router,
            providers,
            tools: None,
            context: Arc::new(NoContext),
            engine_policy: EnginePolicy::default(),
            turn_policy: TurnPolicy::default(),
            hooks: Arc::new(NoopOperationHooks),
            locks: ConversationLocks::new(),
        }
    }

    pub fn with_tool_registry(self, registry: Arc<ToolRegistry>) -> Self {
        let definitions = registry.definitions();
        self.with_tool_runtime(Arc::new(DefaultToolRuntime::new(registry)), definitions)
    }

    pub fn with_tool_runtime(
        mut self,
        runtime: Arc<dyn ToolRuntime>,
        definitions: Vec<ToolDefinition>,
    ) -> Self {
        self.tools = Some((runtime, definitions));
        self
    }

    pub fn with_context_source(mut self, context: Arc<dyn ContextSource>) -> Self {
        self.context = context;
        self
    }

    pub fn with_engine_policy(mut self, policy: EnginePolicy) -> Self {
        self.engine_policy = policy;
        self
    }

    pub fn with_turn_policy(mut self, policy: TurnPolicy) -> Self {
        self.turn_policy = policy;
        self
    }

    pub fn with_provider_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Shares turn serialisation with another service instance.
    pub fn with_conversation_locks(mut self, locks: ConversationLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn build(self) -> TurnService {
        let mut engine = TurnEngine::new(self.providers, Arc::clone(self.router.breakers()))
            .with_policy(self.engine_policy)
            .with_hooks(self.hooks);
        if let Some((runtime, definitions)) = self.tools {
            engine = engine.with_tools(runtime, definitions);
        }

        TurnService {
            inner: Arc::new(ServiceInner {
                router: self.router,
                engine,
                context: self.context,
                locks: self.locks,
                policy: self.turn_policy,
                sequence: AtomicU64::new(0),
            }),
        }
    }
}
