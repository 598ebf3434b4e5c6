//! Tool runtime trait and default registry-backed executor.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_timer::Delay;
use futures_util::future::{self, Either};

use crate::{
    NoopToolRuntimeHooks, ToolError, ToolExecutionContext, ToolExecutionRequest,
    ToolExecutionResult, ToolFuture, ToolRegistry, ToolRuntimeHooks,
};

/// Executes tool requests. Failures are embedded in the returned result
/// rather than surfaced as an error, so every request yields exactly one
/// result the model can see.
pub trait ToolRuntime: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: ToolExecutionRequest,
        context: ToolExecutionContext,
    ) -> ToolFuture<'a, ToolExecutionResult>;
}

#[derive(Clone)]
pub struct DefaultToolRuntime {
    registry: Arc<ToolRegistry>,
    hooks: Arc<dyn ToolRuntimeHooks>,
    timeout: Option<Duration>,
}

impl Default for DefaultToolRuntime {
    fn default() -> Self {
        Self::new(Arc::new(ToolRegistry::new()))
    }
}

impl DefaultToolRuntime {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            hooks: Arc::new(NoopToolRuntimeHooks),
            timeout: None,
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ToolRuntimeHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Bounds each invocation; an overrun becomes a `Timeout` result.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn registry(&self) -> Arc<ToolRegistry> {
        Arc::clone(&self.registry)
    }

    async fn invoke(
        &self,
        request: &ToolExecutionRequest,
        context: &ToolExecutionContext,
    ) -> Result<String, ToolError> {
        let tool = self.registry.lookup(&request.tool_name)?;
        let invocation = tool.invoke(&request.arguments, context);

        let Some(timeout) = self.timeout else {
            return invocation.await;
        };

        match future::select(invocation, Delay::new(timeout)).await {
            Either::Left((outcome, _)) => outcome,
            Either::Right(((), _)) => Err(ToolError::timeout(format!(
                "tool did not finish within {}ms",
                timeout.as_millis()
            ))),
        }
    }
}

impl ToolRuntime for DefaultToolRuntime {
    fn execute<'a>(
        &'a self,
        request: ToolExecutionRequest,
        context: ToolExecutionContext,
    ) -> ToolFuture<'a, ToolExecutionResult> {
        Box::pin(async move {
            self.hooks.on_execution_start(&request, &context);
            let started_at = Instant::now();

            match self.invoke(&request, &context).await {
                Ok(output) => {
                    self.hooks
                        .on_execution_success(&request, &context, started_at.elapsed());
                    ToolExecutionResult::succeeded(&request, output)
                }
                Err(error) => {
                    let result = ToolExecutionResult::failed(&request, error);
                    if let Err(error) = &result.outcome {
                        self.hooks.on_execution_failure(
                            &request,
                            &context,
                            error,
                            started_at.elapsed(),
                        );
                    }
                    result
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tprovider::ToolDefinition;

    use super::*;
    use crate::{Tool, ToolErrorKind};

    #[derive(Debug)]
    struct EchoTool;

    impl Tool for EchoTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "echo".to_string(),
                description: "Echoes arguments".to_string(),
                input_schema: "{\"type\":\"string\"}".to_string(),
            }
        }

        fn invoke<'a>(
            &'a self,
            args_json: &'a str,
            context: &'a ToolExecutionContext,
        ) -> ToolFuture<'a, Result<String, ToolError>> {
            Box::pin(async move {
                Ok(format!(
                    "conversation={} args={}",
                    context.conversation_id, args_json
                ))
            })
        }
    }

    #[derive(Debug)]
    struct BrokenTool;

    impl Tool for BrokenTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "broken".to_string(),
                description: "Always fails".to_string(),
                input_schema: "{\"type\":\"object\"}".to_string(),
            }
        }

        fn invoke<'a>(
            &'a self,
            _args_json: &'a str,
            _context: &'a ToolExecutionContext,
        ) -> ToolFuture<'a, Result<String, ToolError>> {
            Box::pin(async move { Err(ToolError::execution("tool exploded")) })
        }
    }

    #[derive(Debug)]
    struct StalledTool;

    impl Tool for StalledTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "stalled".to_string(),
                description: "Never finishes".to_string(),
                input_schema: "{\"type\":\"object\"}".to_string(),
            }
        }

        fn invoke<'a>(
            &'a self,
            _args_json: &'a str,
            _context: &'a ToolExecutionContext,
        ) -> ToolFuture<'a, Result<String, ToolError>> {
            Box::pin(future::pending())
        }
    }

    #[derive(Default)]
    struct RecordingHooks {
        started: AtomicUsize,
        failures: Mutex<Vec<ToolErrorKind>>,
    }

    impl ToolRuntimeHooks for RecordingHooks {
        fn on_execution_start(
            &self,
            _request: &ToolExecutionRequest,
            _context: &ToolExecutionContext,
        ) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }

        fn on_execution_failure(
            &self,
            _request: &ToolExecutionRequest,
            _context: &ToolExecutionContext,
            error: &ToolError,
            _elapsed: Duration,
        ) {
            self.failures
                .lock()
                .expect("failures lock should not be poisoned")
                .push(error.kind);
        }
    }

    fn request(id: &str, tool_name: &str, arguments: &str) -> ToolExecutionRequest {
        ToolExecutionRequest {
            id: id.to_string(),
            tool_name: tool_name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[tokio::test]
    async fn runtime_executes_registered_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        let runtime = DefaultToolRuntime::new(Arc::new(registry));

        let result = runtime
            .execute(
                request("call_1", "echo", "hello"),
                ToolExecutionContext::new("conv-1"),
            )
            .await;

        assert_eq!(result.id, "call_1");
        assert_eq!(
            result.outcome,
            Ok("conversation=conv-1 args=hello".to_string())
        );
    }

    #[tokio::test]
    async fn unknown_tool_becomes_not_found_result() {
        let runtime = DefaultToolRuntime::new(Arc::new(ToolRegistry::new()));

        let result = runtime
            .execute(
                request("call_2", "missing", "{}"),
                ToolExecutionContext::new("conv-2"),
            )
            .await;

        let error = result.outcome.expect_err("lookup should fail");
        assert_eq!(error.kind, ToolErrorKind::NotFound);
        assert_eq!(error.tool_call_id.as_deref(), Some("call_2"));
    }

    #[tokio::test]
    async fn tool_failure_is_embedded_and_reported_to_hooks() {
        let mut registry = ToolRegistry::new();
        registry.register(BrokenTool);
        let hooks = Arc::new(RecordingHooks::default());
        let runtime = DefaultToolRuntime::new(Arc::new(registry)).with_hooks(hooks.clone());

        let result = runtime
            .execute(
                request("call_3", "broken", "{}"),
                ToolExecutionContext::new("conv-3"),
            )
            .await;

        assert!(result.is_error());
        let provider_result = result.to_provider_result();
        assert!(provider_result.is_error);
        assert!(provider_result.output.contains("tool exploded"));
        assert_eq!(hooks.started.load(Ordering::SeqCst), 1);
        assert_eq!(
            *hooks.failures.lock().expect("failures lock"),
            vec![ToolErrorKind::Execution]
        );
    }

    #[tokio::test]
    async fn slow_tool_times_out() {
        let mut registry = ToolRegistry::new();
        registry.register(StalledTool);
        let runtime =
            DefaultToolRuntime::new(Arc::new(registry)).with_timeout(Duration::from_millis(20));

        let result = runtime
            .execute(
                request("call_4", "stalled", "{}"),
                ToolExecutionContext::new("conv-4"),
            )
            .await;

        let error = result.outcome.expect_err("tool should time out");
        assert_eq!(error.kind, ToolErrorKind::Timeout);
    }

    #[test]
    fn registry_tracks_registered_tools() {
        let mut registry = ToolRegistry::new();
        assert!(registry.is_empty());

        registry.register(EchoTool);
        registry.register(BrokenTool);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("echo"));

        let names: Vec<_> = registry
            .definitions()
            .into_iter()
            .map(|definition| definition.name)
            .collect();
        assert_eq!(names, vec!["broken".to_string(), "echo".to_string()]);
    }
}
