//! Common imports for most turnstile applications.

pub use crate::{
    ConfigError, DisplaySurface, IncrementalRenderer, ProviderDescriptor, ProviderId,
    RenderMode, RenderPolicy, RenderedTurn, StreamEvent, ToolRegistry, TurnReport, TurnRequest,
    TurnService, TurnstileBuilder, TurnstileConfig, TurnstileRuntime, build_runtime,
    build_runtime_with_tools, render_turn,
};
pub use crate::{ts_history, ts_msg};
