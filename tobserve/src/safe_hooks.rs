use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use tprovider::{ProviderError, ProviderId, ProviderOperationHooks};
use trender::{FinalRenderOutcome, RenderHooks, SurfaceError, UpdateKind};
use trouting::BreakerHooks;
use ttooling::{ToolError, ToolExecutionContext, ToolExecutionRequest, ToolRuntimeHooks};

pub struct SafeProviderHooks<H> {
    inner: H,
}

impl<H> SafeProviderHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ProviderOperationHooks for SafeProviderHooks<H>
where
    H: ProviderOperationHooks,
{
    fn on_attempt_start(&self, provider: ProviderId, attempt: u32) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_attempt_start(provider, attempt)
        }));
    }

    fn on_success(&self, provider: ProviderId, attempt: u32, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_success(provider, attempt, elapsed)
        }));
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        attempt: u32,
        error: &ProviderError,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_failure(provider, attempt, error, elapsed)
        }));
    }

    fn on_failover(&self, from: ProviderId, to: ProviderId) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_failover(from, to)));
    }
}

pub struct SafeToolHooks<H> {
    inner: H,
}

impl<H> SafeToolHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ToolRuntimeHooks for SafeToolHooks<H>
where
    H: ToolRuntimeHooks,
{
    fn on_execution_start(&self, request: &ToolExecutionRequest, context: &ToolExecutionContext) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_execution_start(request, context)
        }));
    }

    fn on_execution_success(
        &self,
        request: &ToolExecutionRequest,
        context: &ToolExecutionContext,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_execution_success(request, context, elapsed)
        }));
    }

    fn on_execution_failure(
        &self,
        request: &ToolExecutionRequest,
        context: &ToolExecutionContext,
        error: &ToolError,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_execution_failure(request, context, error, elapsed)
        }));
    }
}

pub struct SafeBreakerHooks<H> {
    inner: H,
}

impl<H> SafeBreakerHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> BreakerHooks for SafeBreakerHooks<H>
where
    H: BreakerHooks,
{
    fn on_opened(&self, provider: ProviderId, consecutive_failures: u32, cooldown: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_opened(provider, consecutive_failures, cooldown)
        }));
    }

    fn on_probe_admitted(&self, provider: ProviderId) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_probe_admitted(provider)));
    }

    fn on_probe_released(&self, provider: ProviderId) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_probe_released(provider)));
    }

    fn on_reopened(&self, provider: ProviderId, cooldown: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_reopened(provider, cooldown)
        }));
    }

    fn on_closed(&self, provider: ProviderId) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_closed(provider)));
    }
}

pub struct SafeRenderHooks<H> {
    inner: H,
}

impl<H> SafeRenderHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> RenderHooks for SafeRenderHooks<H>
where
    H: RenderHooks,
{
    fn on_update_delivered(&self, kind: UpdateKind, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_update_delivered(kind, elapsed)
        }));
    }

    fn on_update_dropped(&self, kind: UpdateKind, error: &SurfaceError) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_update_dropped(kind, error)
        }));
    }

    fn on_plain_fallback(&self, error: &SurfaceError) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_plain_fallback(error)));
    }

    fn on_final_outcome(&self, kind: UpdateKind, outcome: &FinalRenderOutcome) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_final_outcome(kind, outcome)
        }));
    }
}
