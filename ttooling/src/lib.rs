//! Capability layer for registering, looking up, and executing tools.

mod args;
mod error;
mod hooks;
mod registry;
mod runtime;
mod tool;
mod types;

pub mod prelude {
    pub use crate::{
        DefaultToolRuntime, FunctionTool, NoopToolRuntimeHooks, Tool, ToolError, ToolErrorKind,
        ToolExecutionContext, ToolExecutionRequest, ToolExecutionResult, ToolFuture,
        ToolRegistry, ToolRuntime, ToolRuntimeHooks,
    };
}

pub use args::{optional_string, parse_json_object, required_f64, required_string};
pub use error::{ToolError, ToolErrorKind};
pub use hooks::{NoopToolRuntimeHooks, ToolRuntimeHooks};
pub use registry::ToolRegistry;
pub use runtime::{DefaultToolRuntime, ToolRuntime};
pub use tool::{FunctionTool, Tool, ToolFuture};
pub use types::{ToolExecutionContext, ToolExecutionRequest, ToolExecutionResult};
