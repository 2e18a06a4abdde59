//! Fixed-window request admission.
//!
//! [`RateLimiter`] tracks one counting window per key and answers whether a
//! request may proceed. Going over the limit is a normal answer
//! (`is_exceeded == true`), never an error; the only failures are an invalid
//! config at construction and starting the background sweep outside a tokio
//! runtime.
//!
//! ```rust
//! use std::time::Duration;
//! use rlimit::{RateLimitConfig, RateLimiter};
//!
//! let limiter = RateLimiter::new(RateLimitConfig::new(10, Duration::from_secs(1)))?;
//! let info = limiter.check_limit("user-A");
//!
//! assert_eq!(info.limit, 10);
//! assert_eq!(info.remaining, 9);
//! # Ok::<(), rlimit::RateLimitError>(())
//! ```

mod config;
mod error;
mod hooks;
mod limiter;

pub use config::{KeyGenerator, RateLimitConfig};
pub use error::{RateLimitError, RateLimitErrorKind};
pub use hooks::{NoopRateLimitHooks, RateLimitHooks};
pub use limiter::{RateLimitInfo, RateLimiter};
