use crate::RateLimitInfo;

/// Observer for limiter decisions and cleanup sweeps.
pub trait RateLimitHooks: Send + Sync {
    fn on_limit_exceeded(&self, _key: &str, _info: &RateLimitInfo) {}

    fn on_cleanup(&self, _removed: usize, _remaining: usize) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRateLimitHooks;

impl RateLimitHooks for NoopRateLimitHooks {}
