//! Observability hooks for provider attempts, tool runs, breaker transitions,
//! and rendering.
//!
//! ```rust
//! use tobserve::{MetricsObservabilityHooks, SafeProviderHooks, TracingObservabilityHooks};
//!
//! let _provider_hooks = SafeProviderHooks::new(TracingObservabilityHooks);
//! let _metrics = MetricsObservabilityHooks;
//! ```

mod metrics_hooks;
mod safe_hooks;
mod subscriber;
mod tracing_hooks;

pub use metrics_hooks::MetricsObservabilityHooks;
pub use safe_hooks::{SafeBreakerHooks, SafeProviderHooks, SafeRenderHooks, SafeToolHooks};
pub use subscriber::{DEFAULT_FILTER, init_tracing};
pub use tracing_hooks::TracingObservabilityHooks;

pub mod prelude {
    pub use crate::{
        MetricsObservabilityHooks, SafeBreakerHooks, SafeProviderHooks, SafeRenderHooks,
        SafeToolHooks, TracingObservabilityHooks, init_tracing,
    };
}

#[cfg(test)]
mod tests;
