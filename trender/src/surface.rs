//! Display surface contract for chat transports.
//!
//! ```rust
//! use trender::{RenderMode, SurfaceError, SurfaceErrorKind};
//!
//! let error = SurfaceError::formatting("can't parse entities");
//! assert_eq!(error.kind, SurfaceErrorKind::Formatting);
//! assert_eq!(RenderMode::default(), RenderMode::Markdown);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

use tcommon::BoxFuture;

pub type SurfaceFuture<'a, T> = BoxFuture<'a, T>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// Structured text; callers escape markup before sending.
    #[default]
    Markdown,
    Plain,
}

/// Opaque reference to a message previously sent on a surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageHandle(String);

impl MessageHandle {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for MessageHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageHandle {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// What the surface reports as visible after an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderReceipt {
    pub visible_text: String,
}

impl RenderReceipt {
    pub fn new(visible_text: impl Into<String>) -> Self {
        Self {
            visible_text: visible_text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceErrorKind {
    /// The surface refused the markup.
    Formatting,
    RateLimited,
    MessageGone,
    Transport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceError {
    pub kind: SurfaceErrorKind,
    pub message: String,
}

impl SurfaceError {
    pub fn new(kind: SurfaceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn formatting(message: impl Into<String>) -> Self {
        Self::new(SurfaceErrorKind::Formatting, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(SurfaceErrorKind::RateLimited, message)
    }

    pub fn message_gone(message: impl Into<String>) -> Self {
        Self::new(SurfaceErrorKind::MessageGone, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(SurfaceErrorKind::Transport, message)
    }

    pub fn is_formatting(&self) -> bool {
        self.kind == SurfaceErrorKind::Formatting
    }
}

impl Display for SurfaceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for SurfaceError {}

/// The chat transport a turn is rendered onto.
pub trait DisplaySurface: Send + Sync {
    fn send<'a>(
        &'a self,
        text: &'a str,
        mode: RenderMode,
    ) -> SurfaceFuture<'a, Result<MessageHandle, SurfaceError>>;

    fn edit<'a>(
        &'a self,
        handle: &'a MessageHandle,
        text: &'a str,
        mode: RenderMode,
    ) -> SurfaceFuture<'a, Result<RenderReceipt, SurfaceError>>;
}
