//! Breaker transition hooks.

use std::time::Duration;

use tprovider::ProviderId;

pub trait BreakerHooks: Send + Sync {
    fn on_opened(&self, _provider: ProviderId, _consecutive_failures: u32, _cooldown: Duration) {}

    fn on_probe_admitted(&self, _provider: ProviderId) {}

    fn on_probe_released(&self, _provider: ProviderId) {}

    fn on_reopened(&self, _provider: ProviderId, _cooldown: Duration) {}

    fn on_closed(&self, _provider: ProviderId) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBreakerHooks;

impl BreakerHooks for NoopBreakerHooks {}
