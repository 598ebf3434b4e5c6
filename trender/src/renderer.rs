//! Incremental renderer.
//!
//! Consumes a turn's [`StreamEvent`]s and keeps one surface message up to
//! date: intermediate updates are throttled and carry an in-progress marker,
//! the final update is retried once, and markup rejections fall back to plain
//! text for the rest of the turn.

use std::pin::pin;
use std::sync::Arc;

use futures_core::Stream;
use futures_util::StreamExt;
use tchat::{CancelReason, DisplaySession, DisplayTransition, FailureKind, StreamEvent};
use tokio::time::{Instant, sleep, sleep_until};

use crate::{
    DisplaySurface, MessageHandle, NoopRenderHooks, RenderHooks, RenderMode, RenderPolicy,
    RenderReceipt, SurfaceError, UpdateKind, escape_markdown,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalRenderOutcome {
    Delivered { attempts: u32 },
    Failed { attempts: u32, error: SurfaceError },
    /// Delivered, but the surface still showed the in-progress marker.
    MarkerLingered { attempts: u32 },
}

impl FinalRenderOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Delivered { attempts }
            | Self::Failed { attempts, .. }
            | Self::MarkerLingered { attempts } => *attempts,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderEnding {
    Completed,
    Failed(FailureKind),
    Cancelled(CancelReason),
    /// The event stream closed without a terminal event.
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderReport {
    pub ending: RenderEnding,
    /// Text the closing update tried to show.
    pub final_text: String,
    pub outcome: FinalRenderOutcome,
    pub intermediate_updates: u32,
    pub dropped_updates: u32,
    pub mode: RenderMode,
}

pub struct IncrementalRenderer {
    surface: Arc<dyn DisplaySurface>,
    policy: RenderPolicy,
    hooks: Arc<dyn RenderHooks>,
}

impl IncrementalRenderer {
    pub fn new(surface: Arc<dyn DisplaySurface>) -> Self {
        Self {
            surface,
            policy: RenderPolicy::default(),
            hooks: Arc::new(NoopRenderHooks),
        }
    }

    pub fn with_policy(mut self, policy: RenderPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn RenderHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn policy(&self) -> &RenderPolicy {
        &self.policy
    }

    /// Renders one turn. Returns once the stream's terminal event has been
    /// rendered or the stream closes.
    pub async fn render<S>(&self, events: S) -> RenderReport
    where
        S: Stream<Item = StreamEvent>,
    {
        let mut events = pin!(events);
        let mut run = RenderRun::new(self);

        loop {
            let next = if run.dirty {
                tokio::select! {
                    biased;
                    _ = sleep_until(run.next_update_at()) => Next::UpdateDue,
                    event = events.next() => Next::Event(event),
                }
            } else {
                Next::Event(events.next().await)
            };

            let event = match next {
                Next::UpdateDue => {
                    run.flush().await;
                    continue;
                }
                Next::Event(Some(event)) => event,
                Next::Event(None) => return run.interrupted().await,
            };

            let transition = run.session.apply(&event);
            match event {
                StreamEvent::StreamComplete(text) => return run.complete(text).await,
                StreamEvent::StreamFailed { kind, detail } => {
                    return run.failed(kind, &detail).await;
                }
                StreamEvent::StreamCancelled {
                    partial_text,
                    reason,
                } => return run.cancelled(&partial_text, reason).await,
                other => run.observe(transition, other),
            }
        }
    }
}

enum Next {
    UpdateDue,
    Event(Option<StreamEvent>),
}

struct RenderRun<'a> {
    renderer: &'a IncrementalRenderer,
    session: DisplaySession,
    handle: Option<MessageHandle>,
    mode: RenderMode,
    tool: Option<String>,
    /// A failover happened and the new provider has not spoken yet.
    switched: bool,
    dirty: bool,
    last_attempt_at: Option<Instant>,
    intermediate_updates: u32,
    dropped_updates: u32,
}

impl<'a> RenderRun<'a> {
    fn new(renderer: &'a IncrementalRenderer) -> Self {
        Self {
            renderer,
            session: DisplaySession::new(),
            handle: None,
            mode: renderer.policy.mode,
            tool: None,
            switched: false,
            dirty: false,
            last_attempt_at: None,
            intermediate_updates: 0,
            dropped_updates: 0,
        }
    }

    fn policy(&self) -> &'a RenderPolicy {
        &self.renderer.policy
    }

    /// Tracks what the next intermediate update should show. The session has
    /// already applied the event.
    fn observe(&mut self, transition: DisplayTransition, event: StreamEvent) {
        match (transition, event) {
            (DisplayTransition::Appended, _) => {
                self.switched = false;
                self.dirty = true;
            }
            (DisplayTransition::Suppressed, _) => {
                tracing::trace!("narration suppressed during tool turn");
            }
            (DisplayTransition::ToolTurnStarted, StreamEvent::ToolStatus(name)) => {
                self.tool = Some(name);
                self.dirty = true;
            }
            (DisplayTransition::Reset, _) => {
                self.tool = None;
                self.dirty = false;
            }
            (DisplayTransition::ProviderReset, _) => {
                self.tool = None;
                self.switched = true;
                self.dirty = self.handle.is_some();
            }
            _ => {}
        }
    }

    fn next_update_at(&self) -> Instant {
        match self.last_attempt_at {
            Some(at) => at + self.policy().debounce,
            None => Instant::now(),
        }
    }

    fn intermediate_text(&self) -> Option<String> {
        if self.session.tool_turn_active() {
            return self
                .tool
                .as_deref()
                .map(|tool| self.policy().status_line(tool));
        }

        let current = self.session.current_display();
        if current.trim().is_empty() {
            self.switched
                .then(|| self.policy().in_progress(&self.policy().switch_notice))
        } else {
            Some(self.policy().in_progress(current))
        }
    }

    async fn flush(&mut self) {
        self.dirty = false;
        let Some(text) = self.intermediate_text() else {
            return;
        };
        if text == self.session.last_rendered_text() {
            return;
        }

        let started = Instant::now();
        self.last_attempt_at = Some(started);
        match self.deliver(&text).await {
            Ok(_) => {
                self.intermediate_updates += 1;
                self.session.mark_rendered(text, Instant::now());
                self.renderer
                    .hooks
                    .on_update_delivered(UpdateKind::Intermediate, started.elapsed());
            }
            Err(error) => {
                self.dropped_updates += 1;
                tracing::debug!(error = %error, "intermediate update dropped");
                self.renderer
                    .hooks
                    .on_update_dropped(UpdateKind::Intermediate, &error);
            }
        }
    }

    /// Sends or edits, falling back to plain text once if markup is refused.
    async fn deliver(&mut self, text: &str) -> Result<RenderReceipt, SurfaceError> {
        if self.mode == RenderMode::Plain {
            return self.transmit(text, RenderMode::Plain).await;
        }

        match self.transmit(&escape_markdown(text), RenderMode::Markdown).await {
            Err(error) if error.is_formatting() => {
                tracing::warn!(error = %error, "surface rejected markup, switching to plain text");
                self.renderer.hooks.on_plain_fallback(&error);
                self.mode = RenderMode::Plain;
                self.transmit(text, RenderMode::Plain).await
            }
            other => other,
        }
    }

    async fn transmit(
        &mut self,
        payload: &str,
        mode: RenderMode,
    ) -> Result<RenderReceipt, SurfaceError> {
        let renderer = self.renderer;
        if let Some(handle) = &self.handle {
            return renderer.surface.edit(handle, payload, mode).await;
        }

        let handle = renderer.surface.send(payload, mode).await?;
        self.handle = Some(handle);
        Ok(RenderReceipt::new(payload))
    }

    /// Closing update with at most one retry.
    async fn finalize(&mut self, text: &str, kind: UpdateKind) -> FinalRenderOutcome {
        let max_attempts = 2;
        let mut outcome = FinalRenderOutcome::MarkerLingered { attempts: 0 };

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                sleep(self.policy().retry_delay).await;
            }

            let started = Instant::now();
            outcome = match self.deliver(text).await {
                Ok(receipt) if !self.policy().marker_lingers(text, &receipt.visible_text) => {
                    self.session.mark_rendered(text, Instant::now());
                    self.renderer
                        .hooks
                        .on_update_delivered(kind, started.elapsed());
                    FinalRenderOutcome::Delivered { attempts: attempt }
                }
                Ok(receipt) => {
                    tracing::warn!(
                        attempt,
                        visible = %receipt.visible_text,
                        "closing update left the in-progress marker visible"
                    );
                    FinalRenderOutcome::MarkerLingered { attempts: attempt }
                }
                Err(error) => {
                    tracing::warn!(attempt, error = %error, "closing update failed");
                    self.renderer.hooks.on_update_dropped(kind, &error);
                    FinalRenderOutcome::Failed {
                        attempts: attempt,
                        error,
                    }
                }
            };

            if outcome.is_delivered() {
                break;
            }
        }

        self.report_outcome(kind, &outcome);
        outcome
    }

    /// Single best-effort closing update.
    async fn finalize_once(&mut self, text: &str) -> FinalRenderOutcome {
        let started = Instant::now();
        let outcome = match self.deliver(text).await {
            Ok(_) => {
                self.session.mark_rendered(text, Instant::now());
                self.renderer
                    .hooks
                    .on_update_delivered(UpdateKind::Notice, started.elapsed());
                FinalRenderOutcome::Delivered { attempts: 1 }
            }
            Err(error) => {
                self.renderer
                    .hooks
                    .on_update_dropped(UpdateKind::Notice, &error);
                FinalRenderOutcome::Failed { attempts: 1, error }
            }
        };

        self.report_outcome(UpdateKind::Notice, &outcome);
        outcome
    }

    fn report_outcome(&self, kind: UpdateKind, outcome: &FinalRenderOutcome) {
        match outcome {
            FinalRenderOutcome::Delivered { attempts } => tracing::info!(
                kind = kind.as_str(),
                attempts,
                intermediate_updates = self.intermediate_updates,
                "closing update delivered"
            ),
            FinalRenderOutcome::Failed { attempts, error } => tracing::warn!(
                kind = kind.as_str(),
                attempts,
                error = %error,
                "closing update not delivered"
            ),
            FinalRenderOutcome::MarkerLingered { attempts } => tracing::warn!(
                kind = kind.as_str(),
                attempts,
                "closing update still shows the in-progress marker"
            ),
        }
        self.renderer.hooks.on_final_outcome(kind, outcome);
    }

    async fn complete(mut self, text: String) -> RenderReport {
        let outcome = self.finalize(&text, UpdateKind::Final).await;
        self.into_report(RenderEnding::Completed, text, outcome)
    }

    async fn failed(mut self, kind: FailureKind, detail: &str) -> RenderReport {
        tracing::info!(kind = ?kind, detail, "rendering failure notice");
        let notice = self.policy().failure_notice(kind).to_string();
        let outcome = self.finalize(&notice, UpdateKind::Notice).await;
        self.into_report(RenderEnding::Failed(kind), notice, outcome)
    }

    async fn cancelled(mut self, partial_text: &str, reason: CancelReason) -> RenderReport {
        let text = self.policy().partial_text(partial_text, reason);
        let outcome = self.finalize_once(&text).await;
        self.into_report(RenderEnding::Cancelled(reason), text, outcome)
    }

    async fn interrupted(mut self) -> RenderReport {
        tracing::warn!("turn events ended without a terminal event");
        let current = self.session.current_display().to_string();
        let text = if current.trim().is_empty() {
            self.policy().apology_notice.clone()
        } else {
            self.policy()
                .partial_text(&current, CancelReason::UserRequested)
        };
        let outcome = self.finalize_once(&text).await;
        self.into_report(RenderEnding::Interrupted, text, outcome)
    }

    fn into_report(
        self,
        ending: RenderEnding,
        final_text: String,
        outcome: FinalRenderOutcome,
    ) -> RenderReport {
        RenderReport {
            ending,
            final_text,
            outcome,
            intermediate_updates: self.intermediate_updates,
            dropped_updates: self.dropped_updates,
            mode: self.mode,
        }
    }
}
