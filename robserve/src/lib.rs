//! Observability hooks for provider retries and rate-limit decisions.
//!
//! ```rust
//! use robserve::{MetricsObservabilityHooks, SafeProviderHooks, SafeRateLimitHooks, TracingObservabilityHooks};
//!
//! let _provider_hooks = SafeProviderHooks::new(TracingObservabilityHooks);
//! let _limit_hooks = SafeRateLimitHooks::new(MetricsObservabilityHooks);
//! ```

mod metrics_hooks;
mod safe_hooks;
mod tracing_hooks;

pub use metrics_hooks::MetricsObservabilityHooks;
pub use safe_hooks::{SafeProviderHooks, SafeRateLimitHooks};
pub use tracing_hooks::TracingObservabilityHooks;

pub mod prelude {
    pub use crate::{
        MetricsObservabilityHooks, SafeProviderHooks, SafeRateLimitHooks,
        TracingObservabilityHooks,
    };
}
