use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_core::Stream;
use tchat::{CancelReason, FailureKind, StreamEvent};
use tokio::time::{Instant, sleep};
use tprovider::ProviderId;
use trender::prelude::*;
use trender::{SurfaceFuture, UpdateKind, escape_markdown};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Send,
    Edit,
}

#[derive(Debug, Clone)]
struct Call {
    op: Op,
    text: String,
    mode: RenderMode,
    at: Instant,
}

enum Reaction {
    Accept,
    Fail(SurfaceError),
    ShowInstead(String),
}

#[derive(Default)]
struct RecordingSurface {
    calls: Mutex<Vec<Call>>,
    reactions: Mutex<VecDeque<Reaction>>,
    reject_markdown: bool,
}

impl RecordingSurface {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn with_reactions(reactions: Vec<Reaction>) -> Arc<Self> {
        Arc::new(Self {
            reactions: Mutex::new(reactions.into()),
            ..Self::default()
        })
    }

    fn rejecting_markdown() -> Arc<Self> {
        Arc::new(Self {
            reject_markdown: true,
            ..Self::default()
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn react(&self, op: Op, text: &str, mode: RenderMode) -> Result<RenderReceipt, SurfaceError> {
        self.calls.lock().expect("calls lock").push(Call {
            op,
            text: text.to_string(),
            mode,
            at: Instant::now(),
        });

        if self.reject_markdown && mode == RenderMode::Markdown {
            return Err(SurfaceError::formatting("can't parse entities"));
        }

        let reaction = self
            .reactions
            .lock()
            .expect("reactions lock")
            .pop_front()
            .unwrap_or(Reaction::Accept);
        match reaction {
            Reaction::Accept => Ok(RenderReceipt::new(text)),
            Reaction::Fail(error) => Err(error),
            Reaction::ShowInstead(visible) => Ok(RenderReceipt::new(visible)),
        }
    }
}

impl DisplaySurface for RecordingSurface {
    fn send<'a>(
        &'a self,
        text: &'a str,
        mode: RenderMode,
    ) -> SurfaceFuture<'a, Result<MessageHandle, SurfaceError>> {
        Box::pin(async move {
            self.react(Op::Send, text, mode)
                .map(|_| MessageHandle::new("message-1"))
        })
    }

    fn edit<'a>(
        &'a self,
        _handle: &'a MessageHandle,
        text: &'a str,
        mode: RenderMode,
    ) -> SurfaceFuture<'a, Result<RenderReceipt, SurfaceError>> {
        Box::pin(async move { self.react(Op::Edit, text, mode) })
    }
}

#[derive(Default)]
struct RecordingHooks {
    outcomes: Mutex<Vec<(UpdateKind, FinalRenderOutcome)>>,
    fallbacks: Mutex<u32>,
}

impl RenderHooks for RecordingHooks {
    fn on_plain_fallback(&self, _error: &SurfaceError) {
        *self.fallbacks.lock().expect("fallbacks lock") += 1;
    }

    fn on_final_outcome(&self, kind: UpdateKind, outcome: &FinalRenderOutcome) {
        self.outcomes
            .lock()
            .expect("outcomes lock")
            .push((kind, outcome.clone()));
    }
}

/// Yields each event after its delay.
fn timed(events: Vec<(u64, StreamEvent)>) -> impl Stream<Item = StreamEvent> {
    async_stream::stream! {
        for (delay_ms, event) in events {
            if delay_ms > 0 {
                sleep(Duration::from_millis(delay_ms)).await;
            }
            yield event;
        }
    }
}

fn text(value: &str) -> StreamEvent {
    StreamEvent::TextDelta(value.to_string())
}

fn complete(value: &str) -> StreamEvent {
    StreamEvent::StreamComplete(value.to_string())
}

#[tokio::test(start_paused = true)]
async fn intermediate_updates_respect_the_debounce_interval() {
    let surface = RecordingSurface::new();
    let renderer = IncrementalRenderer::new(surface.clone());

    let mut events: Vec<_> = (0..20).map(|index| (100, text(&format!("w{index} ")))).collect();
    let full: String = (0..20).map(|index| format!("w{index} ")).collect();
    events.push((10, complete(&full)));

    let report = renderer.render(timed(events)).await;
    let calls = surface.calls();
    let (last, intermediate) = calls.split_last().expect("at least one call");

    assert!(intermediate.len() >= 2 && intermediate.len() <= 5);
    for pair in intermediate.windows(2) {
        assert!(pair[1].at - pair[0].at >= Duration::from_millis(500));
    }
    assert!(intermediate.iter().all(|call| call.text.ends_with(" …")));
    assert_eq!(intermediate[0].op, Op::Send);
    assert_eq!(last.op, Op::Edit);
    assert_eq!(last.text, full);
    assert_eq!(report.outcome, FinalRenderOutcome::Delivered { attempts: 1 });
    assert_eq!(report.intermediate_updates as usize, intermediate.len());
}

#[tokio::test(start_paused = true)]
async fn lingering_marker_triggers_one_delayed_retry() {
    let surface = RecordingSurface::with_reactions(vec![
        Reaction::Accept,
        Reaction::ShowInstead("Hello …".to_string()),
        Reaction::Accept,
    ]);
    let renderer = IncrementalRenderer::new(surface.clone());

    let report = renderer
        .render(timed(vec![(0, text("Hello")), (10, complete("Hello world"))]))
        .await;
    let calls = surface.calls();

    assert_eq!(calls.len(), 3);
    assert_eq!(calls[1].text, "Hello world");
    assert_eq!(calls[2].text, "Hello world");
    assert!(calls[2].at - calls[1].at >= Duration::from_secs(1));
    assert_eq!(report.outcome, FinalRenderOutcome::Delivered { attempts: 2 });
}

#[tokio::test(start_paused = true)]
async fn final_update_is_attempted_at_most_twice() {
    let surface = RecordingSurface::with_reactions(vec![
        Reaction::Accept,
        Reaction::Fail(SurfaceError::transport("connection reset")),
        Reaction::Fail(SurfaceError::rate_limited("retry after 30")),
    ]);
    let hooks = Arc::new(RecordingHooks::default());
    let renderer = IncrementalRenderer::new(surface.clone()).with_hooks(hooks.clone());

    let report = renderer
        .render(timed(vec![(0, text("Answer")), (10, complete("Answer!"))]))
        .await;

    assert_eq!(surface.calls().len(), 3);
    assert_eq!(report.outcome.attempts(), 2);
    assert!(matches!(
        report.outcome,
        FinalRenderOutcome::Failed { ref error, .. } if error.kind == SurfaceErrorKind::RateLimited
    ));

    let outcomes = hooks.outcomes.lock().expect("outcomes lock").clone();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].0, UpdateKind::Final);
}

#[tokio::test(start_paused = true)]
async fn markup_rejection_falls_back_to_plain_text() {
    let surface = RecordingSurface::rejecting_markdown();
    let hooks = Arc::new(RecordingHooks::default());
    let renderer = IncrementalRenderer::new(surface.clone()).with_hooks(hooks.clone());

    let report = renderer
        .render(timed(vec![(0, text("2+2=4")), (10, complete("2+2=4."))]))
        .await;
    let calls = surface.calls();

    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].mode, RenderMode::Markdown);
    assert_eq!(calls[0].text, escape_markdown("2+2=4 …"));
    assert_eq!(calls[1].mode, RenderMode::Plain);
    assert_eq!(calls[1].text, "2+2=4 …");
    assert_eq!(calls[2].mode, RenderMode::Plain);
    assert_eq!(calls[2].text, "2+2=4.");
    assert_eq!(report.mode, RenderMode::Plain);
    assert!(report.outcome.is_delivered());
    assert_eq!(*hooks.fallbacks.lock().expect("fallbacks lock"), 1);
}

#[tokio::test(start_paused = true)]
async fn tool_turn_shows_status_and_drops_preamble() {
    let surface = RecordingSurface::new();
    let renderer = IncrementalRenderer::new(surface.clone());

    let events = vec![
        (0, text("Let me check")),
        (600, StreamEvent::ToolStatus("calculator".to_string())),
        (600, text("thinking aloud")),
        (
            10,
            StreamEvent::ToolCallRequested {
                id: "call_1".to_string(),
                tool_name: "calculator".to_string(),
                arguments: "{}".to_string(),
            },
        ),
        (
            10,
            StreamEvent::ToolResult {
                id: "call_1".to_string(),
                result_text: "4".to_string(),
            },
        ),
        (10, StreamEvent::ToolTurnComplete),
        (600, text("The answer is 4")),
        (600, complete("The answer is 4")),
    ];

    let report = renderer.render(timed(events)).await;
    let texts: Vec<_> = surface.calls().into_iter().map(|call| call.text).collect();

    assert_eq!(
        texts,
        vec![
            "Let me check …".to_string(),
            "Using calculator…".to_string(),
            "The answer is 4 …".to_string(),
            "The answer is 4".to_string(),
        ]
    );
    assert_eq!(report.ending, RenderEnding::Completed);
}

#[tokio::test(start_paused = true)]
async fn provider_switch_discards_earlier_narration() {
    let surface = RecordingSurface::new();
    let renderer = IncrementalRenderer::new(surface.clone())
        .with_policy(RenderPolicy::default().with_mode(RenderMode::Plain));

    let events = vec![
        (0, text("half an ans")),
        (
            600,
            StreamEvent::ProviderSwitched {
                from: ProviderId::Anthropic,
                to: ProviderId::Moonshot,
            },
        ),
        (600, text("Full answer")),
        (600, complete("Full answer")),
    ];

    renderer.render(timed(events)).await;
    let calls = surface.calls();

    assert_eq!(calls[0].text, "half an ans …");
    assert!(calls[1..].iter().all(|call| !call.text.contains("half")));
    assert_eq!(calls.last().map(|call| call.text.as_str()), Some("Full answer"));
}

#[tokio::test(start_paused = true)]
async fn provider_switch_replaces_stale_narration_before_new_text() {
    let surface = RecordingSurface::new();
    let renderer = IncrementalRenderer::new(surface.clone())
        .with_policy(RenderPolicy::default().with_mode(RenderMode::Plain));

    let events = vec![
        (0, text("half an ans")),
        (
            600,
            StreamEvent::ProviderSwitched {
                from: ProviderId::Anthropic,
                to: ProviderId::Moonshot,
            },
        ),
        (600, text("Full answer")),
        (600, complete("Full answer")),
    ];

    let report = renderer.render(timed(events)).await;
    let calls = surface.calls();
    let texts: Vec<_> = calls.iter().map(|call| call.text.as_str()).collect();

    assert_eq!(
        texts,
        vec![
            "half an ans …",
            "Trying another model …",
            "Full answer …",
            "Full answer",
        ]
    );
    assert!(calls[1].at < calls[2].at);
    assert_eq!(report.intermediate_updates, 3);
}

#[tokio::test(start_paused = true)]
async fn provider_switch_before_any_update_shows_nothing_stale() {
    let surface = RecordingSurface::new();
    let renderer = IncrementalRenderer::new(surface.clone())
        .with_policy(RenderPolicy::default().with_mode(RenderMode::Plain));

    let events = vec![
        (
            0,
            StreamEvent::ProviderSwitched {
                from: ProviderId::Anthropic,
                to: ProviderId::Moonshot,
            },
        ),
        (600, complete("Full answer")),
    ];

    renderer.render(timed(events)).await;
    let texts: Vec<_> = surface.calls().into_iter().map(|call| call.text).collect();

    assert_eq!(texts, vec!["Full answer".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn unavailable_turn_only_shows_the_notice() {
    let surface = RecordingSurface::new();
    let renderer = IncrementalRenderer::new(surface.clone());

    let report = renderer
        .render(timed(vec![(
            0,
            StreamEvent::StreamFailed {
                kind: FailureKind::NoProviderAvailable,
                detail: "every breaker is open".to_string(),
            },
        )]))
        .await;
    let calls = surface.calls();

    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].op, Op::Send);
    assert_eq!(
        calls[0].text,
        escape_markdown(&renderer.policy().unavailable_notice)
    );
    assert_eq!(
        report.ending,
        RenderEnding::Failed(FailureKind::NoProviderAvailable)
    );
}

#[tokio::test(start_paused = true)]
async fn cancelled_turn_keeps_partial_text_with_a_note() {
    let surface = RecordingSurface::new();
    let renderer = IncrementalRenderer::new(surface.clone());

    let report = renderer
        .render(timed(vec![
            (0, text("Working on")),
            (
                10,
                StreamEvent::StreamCancelled {
                    partial_text: "Working on".to_string(),
                    reason: CancelReason::UserRequested,
                },
            ),
        ]))
        .await;
    let calls = surface.calls();
    let expected = renderer
        .policy()
        .partial_text("Working on", CancelReason::UserRequested);

    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].text, escape_markdown(&expected));
    assert_eq!(report.final_text, expected);
    assert_eq!(
        report.ending,
        RenderEnding::Cancelled(CancelReason::UserRequested)
    );
    assert_eq!(report.outcome, FinalRenderOutcome::Delivered { attempts: 1 });
}

#[tokio::test(start_paused = true)]
async fn failed_intermediate_update_is_dropped() {
    let surface = RecordingSurface::with_reactions(vec![Reaction::Fail(
        SurfaceError::transport("timeout"),
    )]);
    let renderer = IncrementalRenderer::new(surface.clone());

    let report = renderer
        .render(timed(vec![
            (0, text("a")),
            (600, text("b")),
            (10, complete("ab")),
        ]))
        .await;
    let calls = surface.calls();

    assert_eq!(report.dropped_updates, 1);
    assert_eq!(report.intermediate_updates, 1);
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[1].op, Op::Send);
    assert_eq!(calls[1].text, "ab …");
    assert_eq!(calls[2].op, Op::Edit);
    assert!(report.outcome.is_delivered());
}

#[tokio::test(start_paused = true)]
async fn closed_stream_without_terminal_event_is_annotated() {
    let surface = RecordingSurface::new();
    let renderer = IncrementalRenderer::new(surface.clone())
        .with_policy(RenderPolicy::default().with_mode(RenderMode::Plain));

    let report = renderer.render(timed(vec![(0, text("Partial"))])).await;

    assert_eq!(report.ending, RenderEnding::Interrupted);
    assert_eq!(report.final_text, "Partial\n\n(stopped)");
    assert_eq!(surface.calls().len(), 2);
}
