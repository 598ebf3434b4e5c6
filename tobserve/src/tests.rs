use std::sync::{Arc, Mutex};
use std::time::Duration;

use tprovider::{ProviderError, ProviderId, ProviderOperationHooks};
use trender::{FinalRenderOutcome, RenderHooks, SurfaceError, UpdateKind};
use trouting::{BreakerPolicy, BreakerHooks, CircuitBreakerRegistry};
use ttooling::{ToolError, ToolExecutionContext, ToolExecutionRequest, ToolRuntimeHooks};

use crate::{
    MetricsObservabilityHooks, SafeBreakerHooks, SafeProviderHooks, SafeRenderHooks,
    SafeToolHooks, TracingObservabilityHooks,
};

fn sample_request() -> ToolExecutionRequest {
    ToolExecutionRequest {
        id: "call-1".to_string(),
        tool_name: "calculator".to_string(),
        arguments: "{}".to_string(),
    }
}

fn sample_context() -> ToolExecutionContext {
    ToolExecutionContext::new("conv-1").with_turn_id("conv-1/1")
}

fn exercise_all<H>(hooks: &H)
where
    H: ProviderOperationHooks + ToolRuntimeHooks + BreakerHooks + RenderHooks,
{
    let provider_error = ProviderError::timeout("no chunk within 60000ms");
    let tool_error = ToolError::execution("division by zero");
    let surface_error = SurfaceError::formatting("can't parse entities");

    hooks.on_attempt_start(ProviderId::Anthropic, 1);
    hooks.on_failure(
        ProviderId::Anthropic,
        1,
        &provider_error,
        Duration::from_millis(60_000),
    );
    hooks.on_failover(ProviderId::Anthropic, ProviderId::Moonshot);
    hooks.on_success(ProviderId::Moonshot, 2, Duration::from_millis(800));

    hooks.on_execution_start(&sample_request(), &sample_context());
    hooks.on_execution_success(
        &sample_request(),
        &sample_context(),
        Duration::from_millis(5),
    );
    hooks.on_execution_failure(
        &sample_request(),
        &sample_context(),
        &tool_error,
        Duration::from_millis(5),
    );

    hooks.on_opened(ProviderId::Mistral, 5, Duration::from_secs(60));
    hooks.on_probe_admitted(ProviderId::Mistral);
    hooks.on_probe_released(ProviderId::Mistral);
    hooks.on_reopened(ProviderId::Mistral, Duration::from_secs(120));
    hooks.on_closed(ProviderId::Mistral);

    hooks.on_update_delivered(UpdateKind::Intermediate, Duration::from_millis(40));
    hooks.on_update_dropped(UpdateKind::Intermediate, &surface_error);
    hooks.on_plain_fallback(&surface_error);
    hooks.on_final_outcome(
        UpdateKind::Final,
        &FinalRenderOutcome::Delivered { attempts: 2 },
    );
    hooks.on_final_outcome(
        UpdateKind::Notice,
        &FinalRenderOutcome::Failed {
            attempts: 2,
            error: SurfaceError::transport("reset"),
        },
    );
}

#[test]
fn tracing_hooks_smoke_test_all_callbacks() {
    exercise_all(&TracingObservabilityHooks);
}

#[test]
fn metrics_hooks_smoke_test_all_callbacks() {
    exercise_all(&MetricsObservabilityHooks);
}

struct PanicHooks;

impl ProviderOperationHooks for PanicHooks {
    fn on_attempt_start(&self, _provider: ProviderId, _attempt: u32) {
        panic!("provider hook panic");
    }

    fn on_failover(&self, _from: ProviderId, _to: ProviderId) {
        panic!("failover hook panic");
    }
}

impl ToolRuntimeHooks for PanicHooks {
    fn on_execution_start(&self, _request: &ToolExecutionRequest, _context: &ToolExecutionContext) {
        panic!("tool hook panic");
    }
}

impl BreakerHooks for PanicHooks {
    fn on_opened(&self, _provider: ProviderId, _failures: u32, _cooldown: Duration) {
        panic!("breaker hook panic");
    }
}

impl RenderHooks for PanicHooks {
    fn on_final_outcome(&self, _kind: UpdateKind, _outcome: &FinalRenderOutcome) {
        panic!("render hook panic");
    }
}

#[test]
fn safe_wrappers_swallow_panics() {
    SafeProviderHooks::new(PanicHooks).on_attempt_start(ProviderId::OpenAi, 1);
    SafeProviderHooks::new(PanicHooks).on_failover(ProviderId::OpenAi, ProviderId::Ollama);
    SafeToolHooks::new(PanicHooks).on_execution_start(&sample_request(), &sample_context());
    SafeBreakerHooks::new(PanicHooks).on_opened(ProviderId::OpenAi, 5, Duration::from_secs(60));
    SafeRenderHooks::new(PanicHooks).on_final_outcome(
        UpdateKind::Final,
        &FinalRenderOutcome::MarkerLingered { attempts: 2 },
    );
}

#[derive(Default)]
struct RecordingBreakerHooks {
    opened: Mutex<Vec<(ProviderId, u32)>>,
}

impl BreakerHooks for RecordingBreakerHooks {
    fn on_opened(&self, provider: ProviderId, consecutive_failures: u32, _cooldown: Duration) {
        self.opened
            .lock()
            .expect("opened lock")
            .push((provider, consecutive_failures));
    }
}

#[test]
fn safe_breaker_hooks_forward_to_inner_hooks() {
    let recording = Arc::new(RecordingBreakerHooks::default());
    let breakers = CircuitBreakerRegistry::new(
        [ProviderId::Anthropic],
        BreakerPolicy::default().with_failure_threshold(2),
    )
    .with_hooks(Arc::new(SafeBreakerHooks::new(ForwardingHooks(
        recording.clone(),
    ))));

    breakers.record_failure(ProviderId::Anthropic);
    breakers.record_failure(ProviderId::Anthropic);

    assert_eq!(
        recording.opened.lock().expect("opened lock").as_slice(),
        &[(ProviderId::Anthropic, 2)]
    );
}

struct ForwardingHooks(Arc<RecordingBreakerHooks>);

impl BreakerHooks for ForwardingHooks {
    fn on_opened(&self, provider: ProviderId, consecutive_failures: u32, cooldown: Duration) {
        self.0.on_opened(provider, consecutive_failures, cooldown);
    }
}
