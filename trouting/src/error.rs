use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingErrorKind {
    NoProviderAvailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingError {
    pub kind: RoutingErrorKind,
    pub message: String,
    pub category: Category,
    pub context_tokens: u32,
}

impl RoutingError {
    pub fn no_provider_available(category: Category, context_tokens: u32) -> Self {
        Self {
            kind: RoutingErrorKind::NoProviderAvailable,
            message: format!(
                "no provider is available for {category} turns needing ~{context_tokens} context tokens"
            ),
            category,
            context_tokens,
        }
    }
}

impl Display for RoutingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for RoutingError {}
