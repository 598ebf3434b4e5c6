use std::sync::{Arc, Mutex};

use turnstile::prelude::*;
use turnstile::trender::SurfaceFuture;
use turnstile::{
    CostTier, FailureKind, FinalRenderOutcome, MessageHandle, ModelProvider, ProviderError,
    ProviderEvent, ProviderFuture, ProviderRegistry, ProviderRequest, RenderEnding, RenderReceipt,
    StopReason, SurfaceError, TokenUsage, ToolCall, ToolDefinition, TurnOutcome, VecEventStream,
};

/// Answers with a calculator call first, then with whatever the tool said.
struct CalculatorProvider {
    descriptor: ProviderDescriptor,
}

impl CalculatorProvider {
    fn new(id: ProviderId) -> Self {
        Self {
            descriptor: ProviderDescriptor::new(id, "test-model", 32_000)
                .with_cost_tier(CostTier::Economy),
        }
    }
}

impl ModelProvider for CalculatorProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn open_stream<'a>(
        &'a self,
        request: ProviderRequest,
    ) -> ProviderFuture<'a, Result<turnstile::BoxedEventStream<'a>, ProviderError>> {
        Box::pin(async move {
            let events = match request.tool_exchanges.last() {
                None => vec![
                    Ok(ProviderEvent::TextDelta("Let me work that out".to_string())),
                    Ok(ProviderEvent::ToolUseReady(ToolCall {
                        id: "call_1".to_string(),
                        name: "calculator".to_string(),
                        arguments: r#"{"expression":"2+2"}"#.to_string(),
                    })),
                    Ok(ProviderEvent::ResponseEnd {
                        stop_reason: StopReason::ToolUse,
                        usage: TokenUsage::default(),
                    }),
                ],
                Some(exchange) => vec![
                    Ok(ProviderEvent::TextDelta(format!(
                        "The answer is {}",
                        exchange.result.output
                    ))),
                    Ok(ProviderEvent::ResponseEnd {
                        stop_reason: StopReason::EndTurn,
                        usage: TokenUsage::default(),
                    }),
                ],
            };
            Ok(Box::pin(VecEventStream::new(events)) as turnstile::BoxedEventStream<'a>)
        })
    }
}

#[derive(Default)]
struct RecordingSurface {
    texts: Mutex<Vec<String>>,
}

impl RecordingSurface {
    fn texts(&self) -> Vec<String> {
        self.texts.lock().expect("texts lock").clone()
    }
}

impl DisplaySurface for RecordingSurface {
    fn send<'a>(
        &'a self,
        text: &'a str,
        _mode: RenderMode,
    ) -> SurfaceFuture<'a, Result<MessageHandle, SurfaceError>> {
        Box::pin(async move {
            self.texts.lock().expect("texts lock").push(text.to_string());
            Ok(MessageHandle::new("message-1"))
        })
    }

    fn edit<'a>(
        &'a self,
        _handle: &'a MessageHandle,
        text: &'a str,
        _mode: RenderMode,
    ) -> SurfaceFuture<'a, Result<RenderReceipt, SurfaceError>> {
        Box::pin(async move {
            self.texts.lock().expect("texts lock").push(text.to_string());
            Ok(RenderReceipt::new(text))
        })
    }
}

fn calculator_tools() -> Arc<ToolRegistry> {
    let mut tools = ToolRegistry::new();
    tools.register_sync_fn(
        ToolDefinition {
            name: "calculator".to_string(),
            description: "Evaluates arithmetic".to_string(),
            input_schema: r#"{"type":"object"}"#.to_string(),
        },
        |args, _context| {
            let args = turnstile::parse_json_object(&args)?;
            let expression = turnstile::required_string(&args, "expression")?;
            Ok(if expression == "2+2" { "4" } else { "unknown" }.to_string())
        },
    );
    Arc::new(tools)
}

const CONFIG: &str = r#"{
    "fleet": [
        { "id": "mistral", "model": "test-model", "max_context_tokens": 32000, "cost_tier": "economy" }
    ],
    "routing": {
        "preferences": {
            "routine": ["mistral"], "reasoning": ["mistral"], "coding": ["mistral"],
            "safety-sensitive": ["mistral"], "persona": ["mistral"]
        },
        "fallbacks": []
    },
    "render": { "plain_text": true, "debounce_ms": 200 },
    "observability": "none"
}"#;

fn runtime() -> TurnstileRuntime {
    let config = TurnstileConfig::from_json_str(CONFIG).expect("config parses");
    let mut providers = ProviderRegistry::new();
    providers.register(CalculatorProvider::new(ProviderId::Mistral));

    build_runtime_with_tools(config, providers, calculator_tools()).expect("runtime builds")
}

#[tokio::test(start_paused = true)]
async fn configured_runtime_renders_a_tool_turn() {
    let runtime = runtime();
    let surface = Arc::new(RecordingSurface::default());

    let rendered = runtime
        .render_turn(surface.clone(), TurnRequest::new("chat-1", "what is 2+2?"))
        .await
        .expect("turn runs");

    assert_eq!(rendered.turn.outcome, TurnOutcome::Completed);
    assert_eq!(rendered.turn.final_text, "The answer is 4");
    assert_eq!(rendered.render.ending, RenderEnding::Completed);
    assert_eq!(
        rendered.render.outcome,
        FinalRenderOutcome::Delivered { attempts: 1 }
    );

    let texts = surface.texts();
    assert_eq!(texts.last().map(String::as_str), Some("The answer is 4"));
    assert!(texts.iter().all(|text| !text.contains("Let me work") || text.ends_with(" …")));
}

#[tokio::test(start_paused = true)]
async fn open_breakers_render_only_the_unavailable_notice() {
    let runtime = runtime();
    let breakers = runtime.service().breakers();
    for _ in 0..breakers.policy().failure_threshold {
        breakers.record_failure(ProviderId::Mistral);
    }
    let surface = Arc::new(RecordingSurface::default());

    let rendered = runtime
        .render_turn(surface.clone(), TurnRequest::new("chat-2", "hello"))
        .await
        .expect("turn runs");

    assert_eq!(
        rendered.turn.outcome,
        TurnOutcome::Failed(FailureKind::NoProviderAvailable)
    );
    assert_eq!(
        surface.texts(),
        vec![runtime.render_policy().unavailable_notice.clone()]
    );
}

#[tokio::test]
async fn empty_fleet_and_registry_is_a_config_error() {
    let error = match build_runtime(TurnstileConfig::default(), ProviderRegistry::new()) {
        Ok(_) => panic!("an empty deployment should not build"),
        Err(error) => error,
    };
    assert_eq!(error.kind, turnstile::ConfigErrorKind::Invalid);
}

#[tokio::test]
async fn registered_providers_fill_an_empty_fleet() {
    let mut providers = ProviderRegistry::new();
    providers.register(CalculatorProvider::new(ProviderId::Ollama));
    let config = TurnstileConfig::from_json_str(
        r#"{ "routing": { "preferences": {}, "fallbacks": ["ollama"] }, "observability": "none" }"#,
    )
    .expect("config parses");

    let runtime = build_runtime(config, providers).expect("runtime builds");
    let report = runtime
        .service()
        .run_turn_text(TurnRequest::new("chat-3", "hi"))
        .await
        .expect("turn runs");

    assert!(report.is_completed());
    assert_eq!(
        runtime
            .service()
            .router()
            .descriptor(ProviderId::Ollama)
            .map(|descriptor| descriptor.max_context_tokens),
        Some(32_000)
    );
}
