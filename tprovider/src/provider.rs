use std::future::Future;
use std::pin::Pin;

use crate::{BoxedEventStream, ProviderDescriptor, ProviderError, ProviderId, ProviderRequest};

pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait ModelProvider: Send + Sync {
    fn descriptor(&self) -> &ProviderDescriptor;

    fn id(&self) -> ProviderId {
        self.descriptor().id
    }

    fn open_stream<'a>(
        &'a self,
        request: ProviderRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>>;
}
