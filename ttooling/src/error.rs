//! Tool execution errors and classifications.

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    NotFound,
    InvalidArguments,
    Execution,
    Timeout,
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
    pub tool_name: Option<String>,
    pub tool_call_id: Option<String>,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            tool_name: None,
            tool_call_id: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotFound, message)
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidArguments, message)
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Execution, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Timeout, message)
    }

    /// The turn moved on before the tool was run or finished.
    pub fn abandoned(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Abandoned, message)
    }

    pub fn with_tool_name(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }

    pub fn with_tool_call_id(mut self, tool_call_id: impl Into<String>) -> Self {
        self.tool_call_id = Some(tool_call_id.into());
        self
    }

    /// Text handed back to the model in place of tool output.
    pub fn describe_for_model(&self) -> String {
        match &self.tool_name {
            Some(name) => format!("Tool '{name}' encountered an error: {}", self.message),
            None => format!("Tool encountered an error: {}", self.message),
        }
    }
}

impl Display for ToolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (&self.tool_name, &self.tool_call_id) {
            (Some(tool_name), Some(tool_call_id)) => write!(
                f,
                "{:?} [tool={}, call_id={}]: {}",
                self.kind, tool_name, tool_call_id, self.message
            ),
            (Some(tool_name), None) => {
                write!(f, "{:?} [tool={}]: {}", self.kind, tool_name, self.message)
            }
            _ => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for ToolError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_fields_are_included_in_display() {
        let error = ToolError::not_found("missing")
            .with_tool_name("lookup")
            .with_tool_call_id("call_1");

        let rendered = error.to_string();
        assert!(rendered.contains("lookup"));
        assert!(rendered.contains("call_1"));
    }

    #[test]
    fn model_description_names_the_tool() {
        let error = ToolError::execution("disk full").with_tool_name("save_note");
        assert_eq!(
            error.describe_for_model(),
            "Tool 'save_note' encountered an error: disk full"
        );
    }
}
