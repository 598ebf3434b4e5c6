//! Metrics-based observability hooks.
//!
//! ```rust
//! use tobserve::MetricsObservabilityHooks;
//! use tprovider::ProviderOperationHooks;
//!
//! fn accepts_provider_hooks(_hooks: &dyn ProviderOperationHooks) {}
//!
//! let hooks = MetricsObservabilityHooks;
//! accepts_provider_hooks(&hooks);
//! ```

use std::time::Duration;

use tprovider::{ProviderError, ProviderId, ProviderOperationHooks};
use trender::{FinalRenderOutcome, RenderHooks, SurfaceError, UpdateKind};
use trouting::BreakerHooks;
use ttooling::{ToolError, ToolExecutionContext, ToolExecutionRequest, ToolRuntimeHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl ProviderOperationHooks for MetricsObservabilityHooks {
    fn on_attempt_start(&self, provider: ProviderId, _attempt: u32) {
        metrics::counter!(
            "turnstile_provider_attempt_start_total",
            "provider" => provider.to_string()
        )
        .increment(1);
    }

    fn on_success(&self, provider: ProviderId, attempt: u32, elapsed: Duration) {
        metrics::counter!(
            "turnstile_provider_success_total",
            "provider" => provider.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "turnstile_provider_attempt_duration_seconds",
            "provider" => provider.to_string(),
            "status" => "success"
        )
        .record(elapsed.as_secs_f64());
        metrics::histogram!(
            "turnstile_provider_attempts_per_success",
            "provider" => provider.to_string()
        )
        .record(attempt as f64);
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        _attempt: u32,
        error: &ProviderError,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "turnstile_provider_failure_total",
            "provider" => provider.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "turnstile_provider_attempt_duration_seconds",
            "provider" => provider.to_string(),
            "status" => "failure"
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_failover(&self, from: ProviderId, to: ProviderId) {
        metrics::counter!(
            "turnstile_provider_failover_total",
            "from" => from.to_string(),
            "to" => to.to_string()
        )
        .increment(1);
    }
}

impl ToolRuntimeHooks for MetricsObservabilityHooks {
    fn on_execution_start(&self, request: &ToolExecutionRequest, _context: &ToolExecutionContext) {
        metrics::counter!(
            "turnstile_tool_execution_start_total",
            "tool_name" => request.tool_name.clone()
        )
        .increment(1);
    }

    fn on_execution_success(
        &self,
        request: &ToolExecutionRequest,
        _context: &ToolExecutionContext,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "turnstile_tool_execution_success_total",
            "tool_name" => request.tool_name.clone()
        )
        .increment(1);
        metrics::histogram!(
            "turnstile_tool_execution_duration_seconds",
            "tool_name" => request.tool_name.clone(),
            "status" => "success"
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_execution_failure(
        &self,
        request: &ToolExecutionRequest,
        _context: &ToolExecutionContext,
        error: &ToolError,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "turnstile_tool_execution_failure_total",
            "tool_name" => request.tool_name.clone(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "turnstile_tool_execution_duration_seconds",
            "tool_name" => request.tool_name.clone(),
            "status" => "failure"
        )
        .record(elapsed.as_secs_f64());
    }
}

impl BreakerHooks for MetricsObservabilityHooks {
    fn on_opened(&self, provider: ProviderId, _consecutive_failures: u32, cooldown: Duration) {
        metrics::counter!(
            "turnstile_breaker_transition_total",
            "provider" => provider.to_string(),
            "transition" => "opened"
        )
        .increment(1);
        metrics::histogram!(
            "turnstile_breaker_cooldown_seconds",
            "provider" => provider.to_string()
        )
        .record(cooldown.as_secs_f64());
    }

    fn on_probe_admitted(&self, provider: ProviderId) {
        metrics::counter!(
            "turnstile_breaker_transition_total",
            "provider" => provider.to_string(),
            "transition" => "probe_admitted"
        )
        .increment(1);
    }

    fn on_probe_released(&self, provider: ProviderId) {
        metrics::counter!(
            "turnstile_breaker_transition_total",
            "provider" => provider.to_string(),
            "transition" => "probe_released"
        )
        .increment(1);
    }

    fn on_reopened(&self, provider: ProviderId, cooldown: Duration) {
        metrics::counter!(
            "turnstile_breaker_transition_total",
            "provider" => provider.to_string(),
            "transition" => "reopened"
        )
        .increment(1);
        metrics::histogram!(
            "turnstile_breaker_cooldown_seconds",
            "provider" => provider.to_string()
        )
        .record(cooldown.as_secs_f64());
    }

    fn on_closed(&self, provider: ProviderId) {
        metrics::counter!(
            "turnstile_breaker_transition_total",
            "provider" => provider.to_string(),
            "transition" => "closed"
        )
        .increment(1);
    }
}

impl RenderHooks for MetricsObservabilityHooks {
    fn on_update_delivered(&self, kind: UpdateKind, elapsed: Duration) {
        metrics::counter!(
            "turnstile_render_update_total",
            "kind" => kind.as_str(),
            "status" => "delivered"
        )
        .increment(1);
        metrics::histogram!(
            "turnstile_render_update_duration_seconds",
            "kind" => kind.as_str()
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_update_dropped(&self, kind: UpdateKind, error: &SurfaceError) {
        metrics::counter!(
            "turnstile_render_update_total",
            "kind" => kind.as_str(),
            "status" => "dropped",
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
    }

    fn on_plain_fallback(&self, _error: &SurfaceError) {
        metrics::counter!("turnstile_render_plain_fallback_total").increment(1);
    }

    fn on_final_outcome(&self, kind: UpdateKind, outcome: &FinalRenderOutcome) {
        let status = match outcome {
            FinalRenderOutcome::Delivered { .. } => "delivered",
            FinalRenderOutcome::Failed { .. } => "failed",
            FinalRenderOutcome::MarkerLingered { .. } => "marker_lingered",
        };
        metrics::counter!(
            "turnstile_render_final_total",
            "kind" => kind.as_str(),
            "status" => status
        )
        .increment(1);
        metrics::histogram!(
            "turnstile_render_final_attempts",
            "kind" => kind.as_str()
        )
        .record(outcome.attempts() as f64);
    }
}
