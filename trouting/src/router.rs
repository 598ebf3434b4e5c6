//! Category and context-size aware provider selection.

use std::collections::HashSet;
use std::sync::Arc;

use tprovider::{ProviderDescriptor, ProviderId};

use crate::{Category, CircuitBreakerRegistry, RoutingError, RoutingTable};

const CHARS_PER_TOKEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteReason {
    Primary,
    Escalation,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteCandidate {
    pub provider: ProviderId,
    pub reason: RouteReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    pub category: Category,
    pub context_tokens: u32,
    pub candidates: Vec<RouteCandidate>,
}

impl RoutingDecision {
    pub fn providers(&self) -> Vec<ProviderId> {
        self.candidates
            .iter()
            .map(|candidate| candidate.provider)
            .collect()
    }
}

/// Rough token count for prompt text: one token per four characters.
pub fn estimate_tokens<'a>(texts: impl IntoIterator<Item = &'a str>) -> u32 {
    let chars: usize = texts.into_iter().map(|text| text.chars().count()).sum();
    u32::try_from(chars / CHARS_PER_TOKEN).unwrap_or(u32::MAX)
}

pub struct Router {
    table: RoutingTable,
    fleet: Vec<ProviderDescriptor>,
    breakers: Arc<CircuitBreakerRegistry>,
}

impl Router {
    pub fn new(
        table: RoutingTable,
        fleet: Vec<ProviderDescriptor>,
        breakers: Arc<CircuitBreakerRegistry>,
    ) -> Self {
        Self {
            table,
            fleet,
            breakers,
        }
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.breakers
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    pub fn descriptor(&self, provider: ProviderId) -> Option<&ProviderDescriptor> {
        self.fleet
            .iter()
            .find(|descriptor| descriptor.id == provider)
    }

    pub fn route(
        &self,
        category: Category,
        context_tokens: u32,
    ) -> Result<RoutingDecision, RoutingError> {
        let mut candidates: Vec<RouteCandidate> = Vec::new();
        let mut seen = HashSet::new();

        for (index, provider) in self.table.preferred(category).iter().copied().enumerate() {
            if !self.sufficient(provider, context_tokens) || !seen.insert(provider) {
                continue;
            }

            let reason = match (candidates.is_empty(), index) {
                (true, 0) => RouteReason::Primary,
                (true, _) => RouteReason::Escalation,
                (false, _) => RouteReason::Fallback,
            };
            candidates.push(RouteCandidate { provider, reason });
        }

        if candidates.is_empty()
            && let Some(largest) = self.largest_sufficient(context_tokens)
            && seen.insert(largest)
        {
            candidates.push(RouteCandidate {
                provider: largest,
                reason: RouteReason::Escalation,
            });
        }

        for provider in self.table.fallbacks().iter().copied() {
            if self.sufficient(provider, context_tokens) && seen.insert(provider) {
                candidates.push(RouteCandidate {
                    provider,
                    reason: RouteReason::Fallback,
                });
            }
        }

        let before_filter = candidates.len();
        candidates.retain(|candidate| self.breakers.is_routable(candidate.provider));
        if candidates.len() < before_filter {
            tracing::debug!(
                category = %category,
                excluded = before_filter - candidates.len(),
                "excluded providers with open breakers"
            );
        }

        if candidates.is_empty() && !category.is_pinned() {
            candidates = self.fleet_sweep(context_tokens);
            if let Some(first) = candidates.first() {
                tracing::info!(
                    category = %category,
                    first = %first.provider,
                    swept = candidates.len(),
                    "preferred providers unavailable, sweeping fleet"
                );
            }
        }

        if candidates.is_empty() {
            tracing::warn!(category = %category, context_tokens, "no provider available");
            return Err(RoutingError::no_provider_available(category, context_tokens));
        }

        Ok(RoutingDecision {
            category,
            context_tokens,
            candidates,
        })
    }

    fn sufficient(&self, provider: ProviderId, context_tokens: u32) -> bool {
        self.descriptor(provider)
            .is_some_and(|descriptor| descriptor.fits(context_tokens))
    }

    fn largest_sufficient(&self, context_tokens: u32) -> Option<ProviderId> {
        self.fleet
            .iter()
            .max_by(|left, right| {
                left.max_context_tokens
                    .cmp(&right.max_context_tokens)
                    .then_with(|| right.id.cmp(&left.id))
            })
            .filter(|descriptor| descriptor.fits(context_tokens))
            .map(|descriptor| descriptor.id)
    }

    /// Every routable, sufficient provider in the fleet, cheapest first.
    fn fleet_sweep(&self, context_tokens: u32) -> Vec<RouteCandidate> {
        let mut sweep: Vec<&ProviderDescriptor> = self
            .fleet
            .iter()
            .filter(|descriptor| descriptor.fits(context_tokens))
            .filter(|descriptor| self.breakers.is_routable(descriptor.id))
            .collect();
        sweep.sort_by_key(|descriptor| (descriptor.cost_tier, descriptor.id));
        sweep.dedup_by_key(|descriptor| descriptor.id);

        sweep
            .into_iter()
            .map(|descriptor| RouteCandidate {
                provider: descriptor.id,
                reason: RouteReason::Fallback,
            })
            .collect()
    }
}
