//! Incremental rendering of turn events onto a chat display surface.
//!
//! ```rust
//! use std::time::Duration;
//! use trender::RenderPolicy;
//!
//! let policy = RenderPolicy::default().with_debounce(Duration::from_millis(750));
//! assert_eq!(policy.in_progress("Thinking"), "Thinking …");
//! assert_eq!(policy.status_line("search"), "Using search…");
//! ```

mod hooks;
mod policy;
mod renderer;
mod sanitize;
mod surface;

pub mod prelude {
    pub use crate::{
        DisplaySurface, FinalRenderOutcome, IncrementalRenderer, MessageHandle, RenderEnding,
        RenderHooks, RenderMode, RenderPolicy, RenderReceipt, RenderReport, SurfaceError,
        SurfaceErrorKind,
    };
}

pub use hooks::{NoopRenderHooks, RenderHooks, UpdateKind};
pub use policy::RenderPolicy;
pub use renderer::{FinalRenderOutcome, IncrementalRenderer, RenderEnding, RenderReport};
pub use sanitize::escape_markdown;
pub use surface::{
    DisplaySurface, MessageHandle, RenderMode, RenderReceipt, SurfaceError, SurfaceErrorKind,
    SurfaceFuture,
};
