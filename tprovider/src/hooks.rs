//! Operational hook contracts for provider attempts within a turn.

use std::time::Duration;

use crate::{ProviderError, ProviderId};

pub trait ProviderOperationHooks: Send + Sync {
    /// `attempt` counts providers tried in this turn, starting at 1.
    fn on_attempt_start(&self, _provider: ProviderId, _attempt: u32) {}

    fn on_success(&self, _provider: ProviderId, _attempt: u32, _elapsed: Duration) {}

    fn on_failure(
        &self,
        _provider: ProviderId,
        _attempt: u32,
        _error: &ProviderError,
        _elapsed: Duration,
    ) {
    }

    fn on_failover(&self, _from: ProviderId, _to: ProviderId) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOperationHooks;

impl ProviderOperationHooks for NoopOperationHooks {}
