//! Render lifecycle hooks.

use std::time::Duration;

use crate::{FinalRenderOutcome, SurfaceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    Intermediate,
    Final,
    /// Failure or cancellation notice closing a turn.
    Notice,
}

impl UpdateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Intermediate => "intermediate",
            Self::Final => "final",
            Self::Notice => "notice",
        }
    }
}

pub trait RenderHooks: Send + Sync {
    fn on_update_delivered(&self, _kind: UpdateKind, _elapsed: Duration) {}

    fn on_update_dropped(&self, _kind: UpdateKind, _error: &SurfaceError) {}

    fn on_plain_fallback(&self, _error: &SurfaceError) {}

    fn on_final_outcome(&self, _kind: UpdateKind, _outcome: &FinalRenderOutcome) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRenderHooks;

impl RenderHooks for NoopRenderHooks {}
