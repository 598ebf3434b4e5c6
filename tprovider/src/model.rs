//! Provider-agnostic request and message model types.
//!
//! ```rust
//! use tprovider::{Message, ProviderErrorKind, ProviderRequest, Role};
//!
//! let request = ProviderRequest::new(vec![Message::new(Role::User, "What is 2 + 2?")])
//!     .with_system("You are terse.")
//!     .with_context("user prefers metric units");
//! assert!(request.validate().is_ok());
//!
//! let err = ProviderRequest::new(Vec::new()).validate().expect_err("history required");
//! assert_eq!(err.kind, ProviderErrorKind::InvalidRequest);
//! ```

use tcommon::MetadataMap;

use crate::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub output: String,
    pub is_error: bool,
}

/// A completed tool round trip, replayed to whichever provider continues the turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolExchange {
    pub call: ToolCall,
    pub result: ToolResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    ToolUse,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }

    pub fn accumulate(&mut self, other: TokenUsage) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
    }
}

/// Everything a provider needs to continue one conversational turn.
///
/// `context` is the memory string injected verbatim; `tool_exchanges` holds the
/// tool round trips already completed earlier in the turn.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProviderRequest {
    pub system: Option<String>,
    pub context: Option<String>,
    pub history: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub tool_exchanges: Vec<ToolExchange>,
    pub metadata: MetadataMap,
}

impl ProviderRequest {
    pub fn new(history: Vec<Message>) -> Self {
        Self {
            history,
            ..Self::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_tool_exchanges(mut self, tool_exchanges: Vec<ToolExchange>) -> Self {
        self.tool_exchanges = tool_exchanges;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.history.is_empty() {
            return Err(ProviderError::invalid_request(
                "at least one history message is required",
            ));
        }

        for exchange in &self.tool_exchanges {
            if exchange.call.id != exchange.result.tool_call_id {
                return Err(ProviderError::invalid_request(format!(
                    "tool result '{}' does not answer call '{}'",
                    exchange.result.tool_call_id, exchange.call.id
                )));
            }
        }

        Ok(())
    }
}
