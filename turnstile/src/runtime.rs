//! Runtime wiring: config plus providers in, a ready turn service out.

use std::sync::Arc;

use tchat::{ContextSource, TurnError, TurnReport, TurnRequest, TurnService};
use tcommon::Clock;
use tobserve::{
    MetricsObservabilityHooks, SafeBreakerHooks, SafeProviderHooks, SafeRenderHooks,
    SafeToolHooks, TracingObservabilityHooks,
};
use tprovider::{NoopOperationHooks, ProviderOperationHooks, ProviderRegistry};
use trender::{
    DisplaySurface, IncrementalRenderer, NoopRenderHooks, RenderHooks, RenderPolicy, RenderReport,
};
use trouting::{BreakerHooks, CircuitBreakerRegistry, NoopBreakerHooks, Router};
use ttooling::{DefaultToolRuntime, NoopToolRuntimeHooks, ToolRegistry, ToolRuntimeHooks};

use crate::{ConfigError, ObservabilitySink, TurnstileConfig};

struct HookSet {
    provider: Arc<dyn ProviderOperationHooks>,
    tools: Arc<dyn ToolRuntimeHooks>,
    breaker: Arc<dyn BreakerHooks>,
    render: Arc<dyn RenderHooks>,
}

impl HookSet {
    fn for_sink(sink: ObservabilitySink) -> Self {
        match sink {
            ObservabilitySink::None => Self {
                provider: Arc::new(NoopOperationHooks),
                tools: Arc::new(NoopToolRuntimeHooks),
                breaker: Arc::new(NoopBreakerHooks),
                render: Arc::new(NoopRenderHooks),
            },
            ObservabilitySink::Tracing => Self::wrap(TracingObservabilityHooks),
            ObservabilitySink::Metrics => Self::wrap(MetricsObservabilityHooks),
        }
    }

    fn wrap<H>(hooks: H) -> Self
    where
        H: ProviderOperationHooks + ToolRuntimeHooks + BreakerHooks + RenderHooks + Copy + 'static,
    {
        Self {
            provider: Arc::new(SafeProviderHooks::new(hooks)),
            tools: Arc::new(SafeToolHooks::new(hooks)),
            breaker: Arc::new(SafeBreakerHooks::new(hooks)),
            render: Arc::new(SafeRenderHooks::new(hooks)),
        }
    }
}

/// A configured turn service plus what is needed to render its turns.
#[derive(Clone)]
pub struct TurnstileRuntime {
    service: TurnService,
    render_policy: RenderPolicy,
    render_hooks: Arc<dyn RenderHooks>,
}

impl TurnstileRuntime {
    pub fn service(&self) -> &TurnService {
        &self.service
    }

    pub fn render_policy(&self) -> &RenderPolicy {
        &self.render_policy
    }

    pub fn renderer(&self, surface: Arc<dyn DisplaySurface>) -> IncrementalRenderer {
        IncrementalRenderer::new(surface)
            .with_policy(self.render_policy.clone())
            .with_hooks(Arc::clone(&self.render_hooks))
    }

    pub async fn render_turn(
        &self,
        surface: Arc<dyn DisplaySurface>,
        request: TurnRequest,
    ) -> Result<RenderedTurn, TurnError> {
        render_turn(&self.service, &self.renderer(surface), request).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTurn {
    pub turn: TurnReport,
    pub render: RenderReport,
}

/// Runs one turn and renders its events as they arrive.
pub async fn render_turn(
    service: &TurnService,
    renderer: &IncrementalRenderer,
    request: TurnRequest,
) -> Result<RenderedTurn, TurnError> {
    let mut handle = service.run_turn(request)?;
    let render = renderer.render(handle.events()).await;
    let turn = handle.finish().await?;
    Ok(RenderedTurn { turn, render })
}

pub struct TurnstileBuilder {
    config: TurnstileConfig,
    providers: ProviderRegistry,
    tools: Option<Arc<ToolRegistry>>,
    context: Option<Arc<dyn ContextSource>>,
    clock: Option<Arc<dyn Clock>>,
}

impl TurnstileBuilder {
    pub fn new(config: TurnstileConfig, providers: ProviderRegistry) -> Self {
        Self {
            config,
            providers,
            tools: None,
            context: None,
            clock: None,
        }
    }

    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_context_source(mut self, context: Arc<dyn ContextSource>) -> Self {
        self.context = Some(context);
        self
    }

    /// Clock for breaker cooldowns.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<TurnstileRuntime, ConfigError> {
        let config = self.config;
        config.validate()?;

        let fleet = if config.fleet.is_empty() {
            self.providers.descriptors()
        } else {
            config.fleet.clone()
        };
        if fleet.is_empty() {
            return Err(ConfigError::invalid("no providers are configured"));
        }
        for descriptor in &fleet {
            if !self.providers.contains(descriptor.id) {
                tracing::warn!(
                    provider = %descriptor.id,
                    "fleet provider has no registered implementation; it will be skipped"
                );
            }
        }

        let hooks = HookSet::for_sink(config.observability);

        let mut breakers = CircuitBreakerRegistry::new(
            fleet.iter().map(|descriptor| descriptor.id),
            config.breaker_policy(),
        )
        .with_hooks(Arc::clone(&hooks.breaker));
        if let Some(clock) = self.clock {
            breakers = breakers.with_clock(clock);
        }

        let router = Router::new(config.routing_table(), fleet, Arc::new(breakers));
        let mut builder = TurnService::builder(router, self.providers)
            .with_engine_policy(config.engine_policy())
            .with_turn_policy(config.turn_policy())
            .with_provider_hooks(Arc::clone(&hooks.provider));

        if let Some(registry) = self.tools {
            let definitions = registry.definitions();
            let mut runtime =
                DefaultToolRuntime::new(registry).with_hooks(Arc::clone(&hooks.tools));
            if let Some(timeout) = config.tool_timeout() {
                runtime = runtime.with_timeout(timeout);
            }
            builder = builder.with_tool_runtime(Arc::new(runtime), definitions);
        }
        if let Some(context) = self.context {
            builder = builder.with_context_source(context);
        }

        Ok(TurnstileRuntime {
            service: builder.build(),
            render_policy: config.render_policy(),
            render_hooks: hooks.render,
        })
    }
}

pub fn build_runtime(
    config: TurnstileConfig,
    providers: ProviderRegistry,
) -> Result<TurnstileRuntime, ConfigError> {
    TurnstileBuilder::new(config, providers).build()
}

pub fn build_runtime_with_tools(
    config: TurnstileConfig,
    providers: ProviderRegistry,
    tools: Arc<ToolRegistry>,
) -> Result<TurnstileRuntime, ConfigError> {
    TurnstileBuilder::new(config, providers)
        .with_tools(tools)
        .build()
}
