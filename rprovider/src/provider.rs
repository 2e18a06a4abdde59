use std::future::Future;
use std::pin::Pin;

use crate::{GenerateRequest, GenerateResponse, ProviderId, RawError};

pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A model backend. Implementations may fail with anything that converts
/// into a [`RawError`]; classification happens in the retry layer.
pub trait ModelProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    fn generate<'a>(
        &'a self,
        request: GenerateRequest,
    ) -> ProviderFuture<'a, Result<GenerateResponse, RawError>>;
}
