//! Tool runtime context, request, and result types.

use tcommon::{ConversationId, MetadataMap, TurnId};
use tprovider::{ToolCall, ToolExchange, ToolResult};

use crate::ToolError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolExecutionContext {
    pub conversation_id: ConversationId,
    pub turn_id: Option<TurnId>,
    pub metadata: MetadataMap,
}

impl ToolExecutionContext {
    pub fn new(conversation_id: impl Into<ConversationId>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            turn_id: None,
            metadata: MetadataMap::new(),
        }
    }

    pub fn with_turn_id(mut self, turn_id: impl Into<TurnId>) -> Self {
        self.turn_id = Some(turn_id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolExecutionRequest {
    pub id: String,
    pub tool_name: String,
    pub arguments: String,
}

impl From<ToolCall> for ToolExecutionRequest {
    fn from(call: ToolCall) -> Self {
        Self {
            id: call.id,
            tool_name: call.name,
            arguments: call.arguments,
        }
    }
}

impl ToolExecutionRequest {
    pub fn to_call(&self) -> ToolCall {
        ToolCall {
            id: self.id.clone(),
            name: self.tool_name.clone(),
            arguments: self.arguments.clone(),
        }
    }
}

/// Output text or a structured error for one request; never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolExecutionResult {
    pub id: String,
    pub tool_name: String,
    pub outcome: Result<String, ToolError>,
}

impl ToolExecutionResult {
    pub fn succeeded(request: &ToolExecutionRequest, output: impl Into<String>) -> Self {
        Self {
            id: request.id.clone(),
            tool_name: request.tool_name.clone(),
            outcome: Ok(output.into()),
        }
    }

    pub fn failed(request: &ToolExecutionRequest, error: ToolError) -> Self {
        let error = error
            .with_tool_name(request.tool_name.clone())
            .with_tool_call_id(request.id.clone());

        Self {
            id: request.id.clone(),
            tool_name: request.tool_name.clone(),
            outcome: Err(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.outcome.is_err()
    }

    /// Text the model sees; errors become a description it can react to.
    pub fn result_text(&self) -> String {
        match &self.outcome {
            Ok(output) => output.clone(),
            Err(error) => error.describe_for_model(),
        }
    }

    pub fn to_provider_result(&self) -> ToolResult {
        ToolResult {
            tool_call_id: self.id.clone(),
            output: self.result_text(),
            is_error: self.is_error(),
        }
    }

    pub fn into_exchange(self, request: &ToolExecutionRequest) -> ToolExchange {
        ToolExchange {
            call: request.to_call(),
            result: self.to_provider_result(),
        }
    }
}
