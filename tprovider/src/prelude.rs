//! Common `tprovider` imports for downstream crates.

pub use crate::{
    BoxedEventStream, CostTier, Message, ModelEventStream, ModelProvider, NoopOperationHooks,
    ProviderCapabilities, ProviderDescriptor, ProviderError, ProviderErrorKind, ProviderEvent,
    ProviderFuture, ProviderId, ProviderOperationHooks, ProviderRegistry, ProviderRequest, Role,
    StopReason, TokenUsage, ToolCall, ToolDefinition, ToolExchange, ToolResult, VecEventStream,
};
pub use tcommon::{BoxFuture, MetadataMap};
