//! Shared provider error kinds and error value helpers.
//!
//! Connection-level failures move a turn to the next provider; content-level
//! errors do not.
//!
//! ```rust
//! use tprovider::ProviderError;
//!
//! let timeout = ProviderError::timeout("no chunk within 60s");
//! assert!(timeout.is_connection_failure());
//!
//! let filtered = ProviderError::content_filtered("blocked by policy");
//! assert!(!filtered.is_connection_failure());
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Authentication,
    RateLimited,
    Timeout,
    Disconnected,
    MalformedResponse,
    Unavailable,
    InvalidRequest,
    ContentFiltered,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Authentication, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimited, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message)
    }

    pub fn disconnected(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Disconnected, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::MalformedResponse, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Unavailable, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidRequest, message)
    }

    pub fn content_filtered(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::ContentFiltered, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Other, message)
    }

    /// True when the provider could not be reached or talked to reliably.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self.kind,
            ProviderErrorKind::Authentication
                | ProviderErrorKind::RateLimited
                | ProviderErrorKind::Timeout
                | ProviderErrorKind::Disconnected
                | ProviderErrorKind::MalformedResponse
                | ProviderErrorKind::Unavailable
        )
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ProviderError {}
