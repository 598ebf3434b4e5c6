//! Render throttling and wording policy.

use std::time::Duration;

use tchat::{CancelReason, FailureKind};

use crate::RenderMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPolicy {
    /// Minimum spacing between intermediate updates.
    pub debounce: Duration,
    /// Wait before the single retry of a final update.
    pub retry_delay: Duration,
    pub in_progress_marker: String,
    pub mode: RenderMode,
    pub apology_notice: String,
    pub unavailable_notice: String,
    /// Replaces a failed provider's narration until the next one speaks.
    pub switch_notice: String,
    pub cancelled_notice: String,
    pub timed_out_notice: String,
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            retry_delay: Duration::from_secs(1),
            in_progress_marker: " …".to_string(),
            mode: RenderMode::Markdown,
            apology_notice: "Sorry, something went wrong while I was answering. Please try again."
                .to_string(),
            unavailable_notice:
                "Sorry, I can't reach any of my models right now. Please try again in a few minutes."
                    .to_string(),
            switch_notice: "Trying another model".to_string(),
            cancelled_notice: "(stopped)".to_string(),
            timed_out_notice: "(stopped: this took too long)".to_string(),
        }
    }
}

impl RenderPolicy {
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_in_progress_marker(mut self, marker: impl Into<String>) -> Self {
        self.in_progress_marker = marker.into();
        self
    }

    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_apology_notice(mut self, notice: impl Into<String>) -> Self {
        self.apology_notice = notice.into();
        self
    }

    pub fn with_unavailable_notice(mut self, notice: impl Into<String>) -> Self {
        self.unavailable_notice = notice.into();
        self
    }

    pub fn with_switch_notice(mut self, notice: impl Into<String>) -> Self {
        self.switch_notice = notice.into();
        self
    }

    pub fn status_line(&self, tool_name: &str) -> String {
        format!("Using {tool_name}…")
    }

    pub fn in_progress(&self, text: &str) -> String {
        format!("{text}{}", self.in_progress_marker)
    }

    /// True when `visible` still shows the marker that `intended` does not.
    pub fn marker_lingers(&self, intended: &str, visible: &str) -> bool {
        let marker = self.in_progress_marker.trim();
        !marker.is_empty()
            && visible.trim_end().ends_with(marker)
            && !intended.trim_end().ends_with(marker)
    }

    pub fn failure_notice(&self, kind: FailureKind) -> &str {
        match kind {
            FailureKind::NoProviderAvailable | FailureKind::ProvidersExhausted => {
                &self.unavailable_notice
            }
            FailureKind::ProviderRejected | FailureKind::Internal => &self.apology_notice,
        }
    }

    pub fn partial_text(&self, partial_text: &str, reason: CancelReason) -> String {
        let notice = match reason {
            CancelReason::UserRequested => &self.cancelled_notice,
            CancelReason::TimedOut => &self.timed_out_notice,
        };
        if partial_text.trim().is_empty() {
            notice.clone()
        } else {
            format!("{}\n\n{notice}", partial_text.trim_end())
        }
    }
}
