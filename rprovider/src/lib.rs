//! Provider contract plus the error-classification and retry engine every
//! provider call goes through.
//!
//! ```rust
//! use rprovider::{ErrorCategory, ErrorHandler, ProviderId, RetryPolicy};
//!
//! let handler = ErrorHandler::new(RetryPolicy::new(2));
//! let error = handler.process_error("connect ECONNREFUSED", &ProviderId::OpenAi, None);
//! assert_eq!(error.category, ErrorCategory::Network);
//! assert!(error.retryable);
//! ```

mod classify;
mod error;
mod handler;
mod model;
mod provider;
mod resilience;

pub mod prelude;

pub use classify::{
    ClassifiedError, ErrorCategory, ErrorClassifier, ErrorContext, ErrorMetadata, ErrorSeverity,
    RawError, categorize,
};
pub use error::{ProviderError, ProviderErrorKind};
pub use handler::ErrorHandler;
pub use model::{
    GenerateRequest, GenerateRequestBuilder, GenerateResponse, Message, MessageMetadata,
    ProviderId, Role, TokenUsage,
};
pub use provider::{ModelProvider, ProviderFuture};
pub use resilience::{
    NoopOperationHooks, ProviderOperationHooks, RetryPolicy, RetryScope, apply_jitter,
    execute_with_retry,
};
pub use rcommon::{BoxFuture, MetadataMap};
