//! Narration bookkeeping shared by the engine and the renderer.
//!
//! ```rust
//! use tchat::{DisplaySession, DisplayTransition, StreamEvent};
//!
//! let mut session = DisplaySession::new();
//! session.apply(&StreamEvent::TextDelta("Let me check…".into()));
//! session.apply(&StreamEvent::ToolStatus("calculator".into()));
//! let suppressed = session.apply(&StreamEvent::TextDelta("thinking".into()));
//! session.apply(&StreamEvent::ToolTurnComplete);
//! session.apply(&StreamEvent::TextDelta("The answer is 4".into()));
//!
//! assert_eq!(suppressed, DisplayTransition::Suppressed);
//! assert_eq!(session.current_display(), "The answer is 4");
//! ```

use tokio::time::Instant;

use crate::StreamEvent;

/// What [`DisplaySession::apply`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayTransition {
    Appended,
    /// Text arrived inside a tool turn and stays out of the display.
    Suppressed,
    ToolTurnStarted,
    /// A tool turn closed and the display was emptied.
    Reset,
    /// Provider failover discarded the previous attempt's narration.
    ProviderReset,
    Finished,
    Unchanged,
}

#[derive(Debug, Clone, Default)]
pub struct DisplaySession {
    accumulated_text: String,
    current_display: String,
    tool_turn_active: bool,
    last_rendered_text: String,
    last_render_at: Option<Instant>,
}

impl DisplaySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &StreamEvent) -> DisplayTransition {
        match event {
            StreamEvent::TextDelta(text) => {
                self.accumulated_text.push_str(text);
                if self.tool_turn_active {
                    DisplayTransition::Suppressed
                } else {
                    self.current_display.push_str(text);
                    DisplayTransition::Appended
                }
            }
            StreamEvent::ToolStatus(_) => {
                self.tool_turn_active = true;
                DisplayTransition::ToolTurnStarted
            }
            StreamEvent::ToolTurnComplete => {
                self.tool_turn_active = false;
                self.current_display.clear();
                DisplayTransition::Reset
            }
            StreamEvent::ProviderSwitched { .. } => {
                self.tool_turn_active = false;
                self.current_display.clear();
                DisplayTransition::ProviderReset
            }
            StreamEvent::ToolCallRequested { .. } | StreamEvent::ToolResult { .. } => {
                DisplayTransition::Unchanged
            }
            StreamEvent::StreamComplete(_)
            | StreamEvent::StreamFailed { .. }
            | StreamEvent::StreamCancelled { .. } => DisplayTransition::Finished,
        }
    }

    /// Every text delta seen this turn, suppressed ones included.
    pub fn accumulated_text(&self) -> &str {
        &self.accumulated_text
    }

    pub fn current_display(&self) -> &str {
        &self.current_display
    }

    pub fn tool_turn_active(&self) -> bool {
        self.tool_turn_active
    }

    pub fn last_rendered_text(&self) -> &str {
        &self.last_rendered_text
    }

    pub fn last_render_at(&self) -> Option<Instant> {
        self.last_render_at
    }

    pub fn mark_rendered(&mut self, text: impl Into<String>, at: Instant) {
        self.last_rendered_text = text.into();
        self.last_render_at = Some(at);
    }
}
