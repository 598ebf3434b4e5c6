//! Turn classification and provider selection.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use tprovider::{ProviderDescriptor, ProviderId};
//! use trouting::{
//!     BreakerPolicy, Category, CircuitBreakerRegistry, RouteReason, Router, RoutingTable,
//! };
//!
//! let fleet = vec![
//!     ProviderDescriptor::new(ProviderId::Mistral, "mistral-large", 32_000),
//!     ProviderDescriptor::new(ProviderId::Anthropic, "claude-sonnet", 200_000),
//! ];
//! let breakers = Arc::new(CircuitBreakerRegistry::new(
//!     fleet.iter().map(|descriptor| descriptor.id),
//!     BreakerPolicy::default(),
//! ));
//! let router = Router::new(RoutingTable::default(), fleet, breakers);
//!
//! let category = trouting::classify("thanks!", &[]);
//! let decision = router.route(category, 10).expect("a provider should be routable");
//!
//! assert_eq!(category, Category::Routine);
//! assert_eq!(decision.candidates[0].provider, ProviderId::Mistral);
//! assert_eq!(decision.candidates[0].reason, RouteReason::Primary);
//! ```

mod breaker;
mod category;
mod classifier;
mod error;
mod hooks;
mod router;
mod table;

pub mod prelude {
    pub use crate::{
        Admission, BreakerPolicy, BreakerState, Category, CircuitBreakerRegistry, RouteReason,
        Router, RoutingDecision, RoutingError, RoutingTable, classify,
    };
}

pub use breaker::{Admission, BreakerPolicy, BreakerSnapshot, BreakerState, CircuitBreakerRegistry};
pub use category::Category;
pub use classifier::{Classification, Classifier, Signal, classify, classify_detailed};
pub use error::{RoutingError, RoutingErrorKind};
pub use hooks::{BreakerHooks, NoopBreakerHooks};
pub use router::{RouteCandidate, RouteReason, Router, RoutingDecision, estimate_tokens};
pub use table::RoutingTable;
