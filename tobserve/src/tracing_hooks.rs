//! Tracing-based observability hooks.
//!
//! ```rust
//! use tobserve::TracingObservabilityHooks;
//! use trouting::BreakerHooks;
//!
//! fn accepts_breaker_hooks(_hooks: &dyn BreakerHooks) {}
//!
//! let hooks = TracingObservabilityHooks;
//! accepts_breaker_hooks(&hooks);
//! ```

use std::time::Duration;

use tprovider::{ProviderError, ProviderId, ProviderOperationHooks};
use trender::{FinalRenderOutcome, RenderHooks, SurfaceError, UpdateKind};
use trouting::BreakerHooks;
use ttooling::{ToolError, ToolExecutionContext, ToolExecutionRequest, ToolRuntimeHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservabilityHooks;

impl ProviderOperationHooks for TracingObservabilityHooks {
    fn on_attempt_start(&self, provider: ProviderId, attempt: u32) {
        tracing::info!(
            phase = "provider",
            event = "attempt_start",
            provider = %provider,
            attempt
        );
    }

    fn on_success(&self, provider: ProviderId, attempt: u32, elapsed: Duration) {
        tracing::info!(
            phase = "provider",
            event = "success",
            provider = %provider,
            attempt,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        attempt: u32,
        error: &ProviderError,
        elapsed: Duration,
    ) {
        tracing::error!(
            phase = "provider",
            event = "failure",
            provider = %provider,
            attempt,
            elapsed_ms = elapsed.as_millis() as u64,
            error_kind = ?error.kind,
            connection_failure = error.is_connection_failure(),
            error = %error
        );
    }

    fn on_failover(&self, from: ProviderId, to: ProviderId) {
        tracing::warn!(
            phase = "provider",
            event = "failover",
            from = %from,
            to = %to
        );
    }
}

impl ToolRuntimeHooks for TracingObservabilityHooks {
    fn on_execution_start(&self, request: &ToolExecutionRequest, context: &ToolExecutionContext) {
        tracing::info!(
            phase = "tool",
            event = "execution_start",
            tool_name = request.tool_name,
            tool_call_id = request.id,
            conversation_id = %context.conversation_id,
            turn_id = context.turn_id.as_ref().map(|id| id.as_str())
        );
    }

    fn on_execution_success(
        &self,
        request: &ToolExecutionRequest,
        context: &ToolExecutionContext,
        elapsed: Duration,
    ) {
        tracing::info!(
            phase = "tool",
            event = "execution_success",
            tool_name = request.tool_name,
            tool_call_id = request.id,
            conversation_id = %context.conversation_id,
            turn_id = context.turn_id.as_ref().map(|id| id.as_str()),
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_execution_failure(
        &self,
        request: &ToolExecutionRequest,
        context: &ToolExecutionContext,
        error: &ToolError,
        elapsed: Duration,
    ) {
        tracing::error!(
            phase = "tool",
            event = "execution_failure",
            tool_name = request.tool_name,
            tool_call_id = request.id,
            conversation_id = %context.conversation_id,
            turn_id = context.turn_id.as_ref().map(|id| id.as_str()),
            elapsed_ms = elapsed.as_millis() as u64,
            error_kind = ?error.kind,
            error = %error
        );
    }
}

impl BreakerHooks for TracingObservabilityHooks {
    fn on_opened(&self, provider: ProviderId, consecutive_failures: u32, cooldown: Duration) {
        tracing::warn!(
            phase = "breaker",
            event = "opened",
            provider = %provider,
            consecutive_failures,
            cooldown_ms = cooldown.as_millis() as u64
        );
    }

    fn on_probe_admitted(&self, provider: ProviderId) {
        tracing::info!(phase = "breaker", event = "probe_admitted", provider = %provider);
    }

    fn on_probe_released(&self, provider: ProviderId) {
        tracing::info!(phase = "breaker", event = "probe_released", provider = %provider);
    }

    fn on_reopened(&self, provider: ProviderId, cooldown: Duration) {
        tracing::warn!(
            phase = "breaker",
            event = "reopened",
            provider = %provider,
            cooldown_ms = cooldown.as_millis() as u64
        );
    }

    fn on_closed(&self, provider: ProviderId) {
        tracing::info!(phase = "breaker", event = "closed", provider = %provider);
    }
}

impl RenderHooks for TracingObservabilityHooks {
    fn on_update_delivered(&self, kind: UpdateKind, elapsed: Duration) {
        tracing::debug!(
            phase = "render",
            event = "update_delivered",
            kind = kind.as_str(),
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_update_dropped(&self, kind: UpdateKind, error: &SurfaceError) {
        tracing::warn!(
            phase = "render",
            event = "update_dropped",
            kind = kind.as_str(),
            error_kind = ?error.kind,
            error = %error
        );
    }

    fn on_plain_fallback(&self, error: &SurfaceError) {
        tracing::warn!(phase = "render", event = "plain_fallback", error = %error);
    }

    fn on_final_outcome(&self, kind: UpdateKind, outcome: &FinalRenderOutcome) {
        if outcome.is_delivered() {
            tracing::info!(
                phase = "render",
                event = "final_outcome",
                kind = kind.as_str(),
                attempts = outcome.attempts(),
                delivered = true
            );
        } else {
            tracing::error!(
                phase = "render",
                event = "final_outcome",
                kind = kind.as_str(),
                attempts = outcome.attempts(),
                delivered = false,
                outcome = ?outcome
            );
        }
    }
}
