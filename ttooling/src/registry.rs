//! Tool registry for lookup by tool name.

use std::future::Future;
use std::sync::Arc;

use tcommon::Registry;
use tprovider::ToolDefinition;

use crate::{FunctionTool, Tool, ToolError, ToolExecutionContext};

#[derive(Default)]
pub struct ToolRegistry {
    tools: Registry<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name(), Arc::new(tool));
    }

    pub fn register_fn<F, Fut>(&mut self, definition: ToolDefinition, handler: F)
    where
        F: Fn(String, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        self.register(FunctionTool::new(definition, handler));
    }

    pub fn register_sync_fn<F>(&mut self, definition: ToolDefinition, handler: F)
    where
        F: Fn(String, ToolExecutionContext) -> Result<String, ToolError> + Send + Sync + 'static,
    {
        self.register(FunctionTool::from_sync(definition, handler));
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| {
                ToolError::not_found(format!("tool '{name}' is not registered")).with_tool_name(name)
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Definitions offered to providers, ordered by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<_> = self.tools.values().map(|tool| tool.definition()).collect();
        definitions.sort_by(|left, right| left.name.cmp(&right.name));
        definitions
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
