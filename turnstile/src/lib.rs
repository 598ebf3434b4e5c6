//! Unified facade over the turnstile workspace crates.
//!
//! Most applications depend on this crate alone: it re-exports the routing,
//! turn engine, and rendering crates, loads a [`TurnstileConfig`], and wires
//! everything into a [`TurnstileRuntime`].
//!
//! ```rust
//! use turnstile::{TurnstileConfig, classify, Category};
//!
//! let config = TurnstileConfig::default();
//! assert!(config.fleet.is_empty());
//! assert_eq!(classify("hey there!", &[]), Category::Routine);
//! ```

mod config;
mod macros;
mod runtime;

pub mod prelude;

pub use tchat;
pub use tcommon;
pub use tobserve;
pub use tprovider;
pub use trender;
pub use trouting;
pub use ttooling;

pub use config::{
    BreakerSection, ConfigError, ConfigErrorKind, EngineSection, ObservabilitySink,
    RenderSection, ToolSection, TurnSection, TurnstileConfig,
};
pub use runtime::{
    RenderedTurn, TurnstileBuilder, TurnstileRuntime, build_runtime, build_runtime_with_tools,
    render_turn,
};

pub use tchat::{
    CancelReason, ContextSource, DisplaySession, EnginePolicy, FailureKind, StaticContext,
    StreamEvent, TurnError, TurnErrorKind, TurnHandle, TurnOutcome, TurnPolicy, TurnReport,
    TurnRequest, TurnService,
};
pub use tcommon::{BoxFuture, Clock, ConversationId, MetadataMap, SystemClock, TurnId};
pub use tobserve::{MetricsObservabilityHooks, TracingObservabilityHooks, init_tracing};
pub use tprovider::{
    BoxedEventStream, CostTier, Message, ModelProvider, ProviderDescriptor, ProviderError,
    ProviderErrorKind, ProviderEvent, ProviderFuture, ProviderId, ProviderRegistry,
    ProviderRequest, Role, StopReason, TokenUsage, ToolCall, ToolDefinition, VecEventStream,
};
pub use trender::{
    DisplaySurface, FinalRenderOutcome, IncrementalRenderer, MessageHandle, RenderEnding,
    RenderMode, RenderPolicy, RenderReceipt, RenderReport, SurfaceError, SurfaceErrorKind,
};
pub use trouting::{
    BreakerPolicy, BreakerState, Category, CircuitBreakerRegistry, Classifier, Router,
    RoutingDecision, RoutingError, RoutingTable, classify,
};
pub use ttooling::{
    DefaultToolRuntime, FunctionTool, Tool, ToolError, ToolErrorKind, ToolExecutionContext,
    ToolRegistry, ToolRuntime, parse_json_object, required_string,
};
