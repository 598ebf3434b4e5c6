//! Tools the model may call during a turn.
//!
//! ```rust
//! use tprovider::ToolDefinition;
//! use ttooling::{FunctionTool, Tool, ToolError};
//!
//! let calculator = FunctionTool::from_sync(
//!     ToolDefinition {
//!         name: "calculator".to_string(),
//!         description: "Evaluates a sum".to_string(),
//!         input_schema: r#"{"type":"object"}"#.to_string(),
//!     },
//!     |args, _ctx| {
//!         if args.trim().is_empty() {
//!             return Err(ToolError::invalid_arguments("expression required"));
//!         }
//!         Ok("4".to_string())
//!     },
//! );
//!
//! assert_eq!(calculator.name(), "calculator");
//! ```

use std::future::Future;
use std::sync::Arc;

use tcommon::BoxFuture;
use tprovider::ToolDefinition;

use crate::{ToolError, ToolExecutionContext};

pub type ToolFuture<'a, T> = BoxFuture<'a, T>;

/// An executable capability. Implementations must tolerate being dropped
/// mid-flight: a cancelled turn abandons outstanding invocations.
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    /// Registry key and the name shown in the status line.
    fn name(&self) -> String {
        self.definition().name
    }

    fn invoke<'a>(
        &'a self,
        args_json: &'a str,
        context: &'a ToolExecutionContext,
    ) -> ToolFuture<'a, Result<String, ToolError>>;
}

type Handler =
    dyn Fn(String, ToolExecutionContext) -> ToolFuture<'static, Result<String, ToolError>> + Send + Sync;

/// A tool backed by a closure.
pub struct FunctionTool {
    definition: ToolDefinition,
    handler: Arc<Handler>,
}

impl FunctionTool {
    pub fn new<F, Fut>(definition: ToolDefinition, handler: F) -> Self
    where
        F: Fn(String, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        Self {
            definition,
            handler: Arc::new(move |args_json, context| Box::pin(handler(args_json, context))),
        }
    }

    /// Wraps a handler that finishes without awaiting anything.
    pub fn from_sync<F>(definition: ToolDefinition, handler: F) -> Self
    where
        F: Fn(String, ToolExecutionContext) -> Result<String, ToolError> + Send + Sync + 'static,
    {
        Self::new(definition, move |args_json, context| {
            let output = handler(args_json, context);
            async move { output }
        })
    }
}

impl Tool for FunctionTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    fn name(&self) -> String {
        self.definition.name.clone()
    }

    fn invoke<'a>(
        &'a self,
        args_json: &'a str,
        context: &'a ToolExecutionContext,
    ) -> ToolFuture<'a, Result<String, ToolError>> {
        (self.handler)(args_json.to_string(), context.clone())
    }
}
