//! Per-provider circuit breakers.
//!
//! Each provider's state sits behind its own mutex in a map fixed at
//! construction, so routing reads for different providers never contend and
//! writes for one provider are serialised.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tcommon::{Clock, SystemClock};
use tprovider::ProviderId;

use crate::{BreakerHooks, NoopBreakerHooks};

#[derive(Debug, Clone, PartialEq)]
pub struct BreakerPolicy {
    pub failure_threshold: u32,
    pub base_cooldown: Duration,
    pub backoff_multiplier: f64,
    pub max_cooldown: Duration,
}

impl Default for BreakerPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            base_cooldown: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            max_cooldown: Duration::from_secs(15 * 60),
        }
    }
}

impl BreakerPolicy {
    pub fn with_failure_threshold(mut self, failure_threshold: u32) -> Self {
        self.failure_threshold = failure_threshold.max(1);
        self
    }

    pub fn with_base_cooldown(mut self, base_cooldown: Duration) -> Self {
        self.base_cooldown = base_cooldown;
        self
    }

    pub fn with_backoff_multiplier(mut self, backoff_multiplier: f64) -> Self {
        self.backoff_multiplier = backoff_multiplier;
        self
    }

    pub fn with_max_cooldown(mut self, max_cooldown: Duration) -> Self {
        self.max_cooldown = max_cooldown;
        self
    }

    fn next_cooldown(&self, current: Duration) -> Duration {
        let multiplier = if self.backoff_multiplier.is_finite() && self.backoff_multiplier >= 1.0 {
            self.backoff_multiplier
        } else {
            1.0
        };
        let scaled = current.as_secs_f64() * multiplier;
        let capped = scaled.min(self.max_cooldown.as_secs_f64());
        Duration::from_secs_f64(capped).max(self.base_cooldown.min(self.max_cooldown))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    /// Cooldown elapsed: the next admission is a probe, or one is in flight.
    HalfOpen,
}

/// Outcome of asking the breaker for permission to call a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Closed,
    Probe,
    Rejected { retry_after: Option<Duration> },
}

impl Admission {
    pub fn is_admitted(self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub provider: ProviderId,
    pub state: BreakerState,
    pub consecutive_failures: u32,
    pub opened_at: Option<Instant>,
    pub cooldown: Duration,
    pub probe_in_flight: bool,
}

#[derive(Debug)]
struct ProviderBreaker {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    cooldown: Duration,
    probe_in_flight: bool,
}

impl ProviderBreaker {
    fn closed(cooldown: Duration) -> Self {
        Self {
            consecutive_failures: 0,
            opened_at: None,
            cooldown,
            probe_in_flight: false,
        }
    }

    fn cooled_down(&self, now: Instant) -> bool {
        self.opened_at
            .is_some_and(|opened_at| now.saturating_duration_since(opened_at) >= self.cooldown)
    }

    fn state(&self, now: Instant) -> BreakerState {
        match self.opened_at {
            None => BreakerState::Closed,
            Some(_) if self.probe_in_flight || self.cooled_down(now) => BreakerState::HalfOpen,
            Some(_) => BreakerState::Open,
        }
    }

    fn routable(&self, now: Instant) -> bool {
        match self.opened_at {
            None => true,
            Some(_) => !self.probe_in_flight && self.cooled_down(now),
        }
    }
}

enum Transition {
    Opened { failures: u32, cooldown: Duration },
    Reopened { cooldown: Duration },
    Closed,
    ProbeAdmitted,
    ProbeReleased,
}

pub struct CircuitBreakerRegistry {
    policy: BreakerPolicy,
    clock: Arc<dyn Clock>,
    hooks: Arc<dyn BreakerHooks>,
    breakers: HashMap<ProviderId, Mutex<ProviderBreaker>>,
}

impl CircuitBreakerRegistry {
    pub fn new(providers: impl IntoIterator<Item = ProviderId>, policy: BreakerPolicy) -> Self {
        let breakers = providers
            .into_iter()
            .map(|provider| {
                (
                    provider,
                    Mutex::new(ProviderBreaker::closed(policy.base_cooldown)),
                )
            })
            .collect();

        Self {
            policy,
            clock: Arc::new(SystemClock),
            hooks: Arc::new(NoopBreakerHooks),
            breakers,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn BreakerHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn policy(&self) -> &BreakerPolicy {
        &self.policy
    }

    pub fn providers(&self) -> Vec<ProviderId> {
        let mut providers: Vec<_> = self.breakers.keys().copied().collect();
        providers.sort();
        providers
    }

    /// Whether routing may include the provider right now. Unknown providers
    /// are never routable.
    pub fn is_routable(&self, provider: ProviderId) -> bool {
        let now = self.clock.now();
        self.with_breaker(provider, |breaker| breaker.routable(now))
            .unwrap_or(false)
    }

    pub fn state(&self, provider: ProviderId) -> Option<BreakerState> {
        let now = self.clock.now();
        self.with_breaker(provider, |breaker| breaker.state(now))
    }

    pub fn snapshot(&self, provider: ProviderId) -> Option<BreakerSnapshot> {
        let now = self.clock.now();
        self.with_breaker(provider, |breaker| BreakerSnapshot {
            provider,
            state: breaker.state(now),
            consecutive_failures: breaker.consecutive_failures,
            opened_at: breaker.opened_at,
            cooldown: breaker.cooldown,
            probe_in_flight: breaker.probe_in_flight,
        })
    }

    /// Admits a call. A cooled-down OPEN breaker admits exactly one probe and
    /// rejects everything else until that probe reports back.
    pub fn try_acquire(&self, provider: ProviderId) -> Admission {
        let now = self.clock.now();
        let outcome = self.with_breaker(provider, |breaker| {
            let Some(opened_at) = breaker.opened_at else {
                return (Admission::Closed, None);
            };

            if breaker.probe_in_flight {
                return (Admission::Rejected { retry_after: None }, None);
            }

            let elapsed = now.saturating_duration_since(opened_at);
            if elapsed >= breaker.cooldown {
                breaker.probe_in_flight = true;
                (Admission::Probe, Some(Transition::ProbeAdmitted))
            } else {
                (
                    Admission::Rejected {
                        retry_after: Some(breaker.cooldown - elapsed),
                    },
                    None,
                )
            }
        });

        match outcome {
            Some((admission, transition)) => {
                self.report(provider, transition);
                admission
            }
            None => {
                tracing::warn!(provider = %provider, "admission requested for unknown provider");
                Admission::Rejected { retry_after: None }
            }
        }
    }

    pub fn record_success(&self, provider: ProviderId) {
        let base_cooldown = self.policy.base_cooldown;
        let transition = self.with_breaker(provider, |breaker| {
            let was_open = breaker.opened_at.is_some();
            *breaker = ProviderBreaker::closed(base_cooldown);
            was_open.then_some(Transition::Closed)
        });

        self.report(provider, transition.flatten());
    }

    pub fn record_failure(&self, provider: ProviderId) {
        let now = self.clock.now();
        let threshold = self.policy.failure_threshold;
        let transition = self.with_breaker(provider, |breaker| {
            breaker.consecutive_failures = breaker.consecutive_failures.saturating_add(1);

            if breaker.probe_in_flight {
                breaker.probe_in_flight = false;
                breaker.opened_at = Some(now);
                breaker.cooldown = self.policy.next_cooldown(breaker.cooldown);
                return Some(Transition::Reopened {
                    cooldown: breaker.cooldown,
                });
            }

            // Late failures from calls admitted before the breaker opened do
            // not restart the cooldown.
            if breaker.opened_at.is_none() && breaker.consecutive_failures >= threshold {
                breaker.opened_at = Some(now);
                return Some(Transition::Opened {
                    failures: breaker.consecutive_failures,
                    cooldown: breaker.cooldown,
                });
            }

            None
        });

        self.report(provider, transition.flatten());
    }

    /// Returns an in-flight probe without a verdict, e.g. when the turn
    /// carrying it was cancelled.
    pub fn release_probe(&self, provider: ProviderId) {
        let transition = self.with_breaker(provider, |breaker| {
            let released = breaker.probe_in_flight;
            breaker.probe_in_flight = false;
            released.then_some(Transition::ProbeReleased)
        });

        self.report(provider, transition.flatten());
    }

    fn with_breaker<T>(
        &self,
        provider: ProviderId,
        f: impl FnOnce(&mut ProviderBreaker) -> T,
    ) -> Option<T> {
        let breaker = self.breakers.get(&provider)?;
        let mut guard = breaker.lock().unwrap_or_else(PoisonError::into_inner);
        Some(f(&mut guard))
    }

    fn report(&self, provider: ProviderId, transition: Option<Transition>) {
        let Some(transition) = transition else {
            return;
        };

        match transition {
            Transition::Opened { failures, cooldown } => {
                tracing::warn!(
                    provider = %provider,
                    consecutive_failures = failures,
                    cooldown_ms = cooldown.as_millis() as u64,
                    "circuit breaker opened"
                );
                self.hooks.on_opened(provider, failures, cooldown);
            }
            Transition::Reopened { cooldown } => {
                tracing::warn!(
                    provider = %provider,
                    cooldown_ms = cooldown.as_millis() as u64,
                    "probe failed, circuit breaker reopened"
                );
                self.hooks.on_reopened(provider, cooldown);
            }
            Transition::Closed => {
                tracing::info!(provider = %provider, "probe succeeded, circuit breaker closed");
                self.hooks.on_closed(provider);
            }
            Transition::ProbeAdmitted => {
                tracing::info!(provider = %provider, "admitting half-open probe");
                self.hooks.on_probe_admitted(provider);
            }
            Transition::ProbeReleased => {
                tracing::debug!(provider = %provider, "probe released without verdict");
                self.hooks.on_probe_released(provider);
            }
        }
    }
}
