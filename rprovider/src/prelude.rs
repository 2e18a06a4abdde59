//! Common `rprovider` imports for downstream crates.

pub use crate::{
    ClassifiedError, ErrorCategory, ErrorClassifier, ErrorContext, ErrorHandler, ErrorMetadata,
    ErrorSeverity, GenerateRequest, GenerateRequestBuilder, GenerateResponse, Message,
    MessageMetadata, ModelProvider, NoopOperationHooks, ProviderError, ProviderErrorKind,
    ProviderFuture, ProviderId, ProviderOperationHooks, RawError, RetryPolicy, RetryScope, Role,
    TokenUsage, execute_with_retry,
};
pub use rcommon::{BoxFuture, MetadataMap};
