//! Provider-agnostic streaming contracts for the turnstile routing core.
//!
//! Every LLM backend is reached through [`ModelProvider::open_stream`], which
//! yields [`ProviderEvent`] values. Wire formats live outside this crate.

mod descriptor;
mod error;
mod hooks;
mod model;
mod provider;
mod registry;
mod stream;

pub mod prelude;

pub use descriptor::{CostTier, ProviderCapabilities, ProviderDescriptor, ProviderId};
pub use error::{ProviderError, ProviderErrorKind};
pub use hooks::{NoopOperationHooks, ProviderOperationHooks};
pub use model::{
    Message, ProviderRequest, Role, StopReason, TokenUsage, ToolCall, ToolDefinition,
    ToolExchange, ToolResult,
};
pub use provider::{ModelProvider, ProviderFuture};
pub use registry::ProviderRegistry;
pub use stream::{BoxedEventStream, ModelEventStream, ProviderEvent, VecEventStream};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures_util::StreamExt;

    use super::*;

    struct FakeProvider {
        descriptor: ProviderDescriptor,
    }

    impl ModelProvider for FakeProvider {
        fn descriptor(&self) -> &ProviderDescriptor {
            &self.descriptor
        }

        fn open_stream<'a>(
            &'a self,
            request: ProviderRequest,
        ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
            Box::pin(async move {
                request.validate()?;
                let stream = VecEventStream::new(vec![
                    Ok(ProviderEvent::TextDelta("hello".to_string())),
                    Ok(ProviderEvent::TextDelta(" world".to_string())),
                    Ok(ProviderEvent::ResponseEnd {
                        stop_reason: StopReason::EndTurn,
                        usage: TokenUsage::default(),
                    }),
                ]);
                Ok(Box::pin(stream) as BoxedEventStream<'a>)
            })
        }
    }

    #[tokio::test]
    async fn registered_provider_streams_events_in_order() {
        let mut registry = ProviderRegistry::new();
        registry.register(FakeProvider {
            descriptor: ProviderDescriptor::new(ProviderId::Mistral, "mistral-medium", 32_000),
        });

        let provider: Arc<dyn ModelProvider> =
            registry.get(ProviderId::Mistral).expect("provider should exist");
        let request = ProviderRequest::new(vec![Message::new(Role::User, "hi")]);
        let mut stream = provider.open_stream(request).await.expect("stream should open");

        let mut text = String::new();
        let mut ended = false;
        while let Some(event) = stream.next().await {
            match event.expect("event should be ok") {
                ProviderEvent::TextDelta(delta) => text.push_str(&delta),
                ProviderEvent::ResponseEnd { stop_reason, .. } => {
                    assert_eq!(stop_reason, StopReason::EndTurn);
                    ended = true;
                }
                other => panic!("unexpected event {other:?}"),
            }
        }

        assert_eq!(text, "hello world");
        assert!(ended);
    }

    #[tokio::test]
    async fn open_stream_rejects_invalid_request() {
        let provider = FakeProvider {
            descriptor: ProviderDescriptor::new(ProviderId::Ollama, "llama3", 8_000),
        };

        let error = match provider.open_stream(ProviderRequest::new(Vec::new())).await {
            Ok(_) => panic!("empty history must fail"),
            Err(error) => error,
        };
        assert_eq!(error.kind, ProviderErrorKind::InvalidRequest);
        assert!(!error.is_connection_failure());
    }
}
