//! Fixed-window limiter keyed by caller identifier.
//!
//! Each key owns one window that starts on its first request and lasts
//! `window_ms`. Once the clock reaches the window's reset time the record is
//! replaced wholesale on the next touch, or swept by [`RateLimiter::cleanup_expired`].
//!
//! ```rust
//! use std::time::Duration;
//! use rlimit::{RateLimitConfig, RateLimiter};
//!
//! let limiter = RateLimiter::new(RateLimitConfig::new(2, Duration::from_secs(60)))?;
//!
//! assert!(!limiter.check_limit("user-A").is_exceeded);
//! assert!(!limiter.check_limit("user-A").is_exceeded);
//!
//! let third = limiter.check_limit("user-A");
//! assert!(third.is_exceeded);
//! assert_eq!(third.remaining, 0);
//! # Ok::<(), rlimit::RateLimitError>(())
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use rcommon::{Clock, SharedClock, system_clock};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::{NoopRateLimitHooks, RateLimitConfig, RateLimitError, RateLimitHooks};

/// Snapshot of one key's window as seen by a single call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub current: u32,
    pub remaining: u32,
    pub reset_time: DateTime<Utc>,
    pub is_exceeded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WindowRecord {
    count: u32,
    reset_time: DateTime<Utc>,
    first_request: DateTime<Utc>,
}

impl WindowRecord {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.reset_time
    }
}

type WindowStore = Arc<Mutex<HashMap<String, WindowRecord>>>;

struct CleanupTask {
    cancel: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    records: WindowStore,
    clock: SharedClock,
    hooks: Arc<dyn RateLimitHooks>,
    cleanup: Mutex<Option<CleanupTask>>,
}

impl RateLimiter {
    /// Fails with [`RateLimitErrorKind::InvalidConfig`](crate::RateLimitErrorKind)
    /// when the window or cleanup interval is zero.
    pub fn new(config: RateLimitConfig) -> Result<Self, RateLimitError> {
        config.validate()?;
        Ok(Self::unchecked(config))
    }

    fn unchecked(config: RateLimitConfig) -> Self {
        Self {
            config,
            records: Arc::new(Mutex::new(HashMap::new())),
            clock: system_clock(),
            hooks: Arc::new(NoopRateLimitHooks),
            cleanup: Mutex::new(None),
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn RateLimitHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Admits or rejects one request and counts it when admitted.
    pub fn check_limit(&self, identifier: &str) -> RateLimitInfo {
        let key = self.config.resolve_key(identifier);
        let now = self.clock.now();

        let info = {
            let mut records = lock(&self.records);
            let record = records
                .entry(key.clone())
                .or_insert_with(|| self.fresh_window(now));
            if record.is_expired(now) {
                *record = self.fresh_window(now);
            }

            let is_exceeded = record.count >= self.config.max_requests;
            if !is_exceeded {
                record.count += 1;
            }
            self.info_for(record, is_exceeded)
        };

        if info.is_exceeded {
            self.hooks.on_limit_exceeded(&key, &info);
        }
        info
    }

    /// Same decision as [`check_limit`](Self::check_limit) without recording
    /// anything.
    pub fn check_limit_dry_run(&self, identifier: &str) -> RateLimitInfo {
        let key = self.config.resolve_key(identifier);
        let now = self.clock.now();

        let mut record = {
            let records = lock(&self.records);
            records
                .get(&key)
                .filter(|record| !record.is_expired(now))
                .copied()
                .unwrap_or_else(|| self.fresh_window(now))
        };

        let is_exceeded = record.count >= self.config.max_requests;
        if !is_exceeded {
            record.count += 1;
        }
        self.info_for(&record, is_exceeded)
    }

    /// Counts a request regardless of the limit.
    pub fn increment_counter(&self, identifier: &str) -> RateLimitInfo {
        let key = self.config.resolve_key(identifier);
        let now = self.clock.now();

        let mut records = lock(&self.records);
        let record = records
            .entry(key)
            .or_insert_with(|| self.fresh_window(now));
        if record.is_expired(now) {
            *record = self.fresh_window(now);
        }
        record.count = record.count.saturating_add(1);

        let is_exceeded = record.count > self.config.max_requests;
        self.info_for(record, is_exceeded)
    }

    /// Forgets the window for `identifier`. Returns whether one was stored.
    pub fn reset_limit(&self, identifier: &str) -> bool {
        let key = self.config.resolve_key(identifier);
        lock(&self.records).remove(&key).is_some()
    }

    pub fn reset_all_limits(&self) {
        lock(&self.records).clear();
    }

    pub fn get_current_status(&self, identifier: &str) -> Option<RateLimitInfo> {
        let key = self.config.resolve_key(identifier);
        let now = self.clock.now();

        let records = lock(&self.records);
        records
            .get(&key)
            .filter(|record| !record.is_expired(now))
            .map(|record| self.info_for(record, record.count >= self.config.max_requests))
    }

    /// When the live window for `identifier` saw its first request.
    pub fn window_started_at(&self, identifier: &str) -> Option<DateTime<Utc>> {
        let key = self.config.resolve_key(identifier);
        let now = self.clock.now();

        lock(&self.records)
            .get(&key)
            .filter(|record| !record.is_expired(now))
            .map(|record| record.first_request)
    }

    /// Live windows by stored key.
    pub fn get_all_active_statuses(&self) -> HashMap<String, RateLimitInfo> {
        let now = self.clock.now();

        let records = lock(&self.records);
        records
            .iter()
            .filter(|(_, record)| !record.is_expired(now))
            .map(|(key, record)| {
                let is_exceeded = record.count >= self.config.max_requests;
                (key.clone(), self.info_for(record, is_exceeded))
            })
            .collect()
    }

    /// Number of stored windows, expired ones included until swept.
    pub fn tracked_keys(&self) -> usize {
        lock(&self.records).len()
    }

    /// Removes every expired window once and returns how many went.
    pub fn cleanup_expired(&self) -> usize {
        sweep(&self.records, self.clock.as_ref(), self.hooks.as_ref())
    }

    /// Starts the periodic sweep on the current tokio runtime.
    ///
    /// Calling this while a sweep task is already running does nothing.
    pub fn start_cleanup(&self) -> Result<(), RateLimitError> {
        let mut cleanup = lock(&self.cleanup);
        if cleanup
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
        {
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|error| RateLimitError::no_runtime(error.to_string()))?;

        let (cancel, mut cancelled) = oneshot::channel::<()>();
        let records = Arc::clone(&self.records);
        let clock = Arc::clone(&self.clock);
        let hooks = Arc::clone(&self.hooks);
        let period = self.config.cleanup_interval();

        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut cancelled => break,
                    _ = ticker.tick() => {
                        sweep(&records, clock.as_ref(), hooks.as_ref());
                    }
                }
            }
        });

        *cleanup = Some(CleanupTask { cancel, handle });
        Ok(())
    }

    pub fn is_cleanup_running(&self) -> bool {
        lock(&self.cleanup)
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Stops the sweep task and drops every window.
    pub fn destroy(&self) {
        if let Some(task) = lock(&self.cleanup).take() {
            // A send error means the task already exited.
            let _ = task.cancel.send(());
        }
        self.reset_all_limits();
    }

    fn fresh_window(&self, now: DateTime<Utc>) -> WindowRecord {
        let window = i64::try_from(self.config.window_ms)
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .unwrap_or(TimeDelta::MAX);

        WindowRecord {
            count: 0,
            reset_time: now
                .checked_add_signed(window)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            first_request: now,
        }
    }

    fn info_for(&self, record: &WindowRecord, is_exceeded: bool) -> RateLimitInfo {
        let limit = self.config.max_requests;
        RateLimitInfo {
            limit,
            current: record.count,
            remaining: limit.saturating_sub(record.count),
            reset_time: record.reset_time,
            is_exceeded,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::unchecked(RateLimitConfig::default())
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .field("tracked_keys", &self.tracked_keys())
            .field("cleanup_running", &self.is_cleanup_running())
            .finish()
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        let task = self
            .cleanup
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.handle.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn sweep(
    records: &Mutex<HashMap<String, WindowRecord>>,
    clock: &dyn Clock,
    hooks: &dyn RateLimitHooks,
) -> usize {
    let now = clock.now();
    let (removed, remaining) = {
        let mut records = lock(records);
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now));
        (before - records.len(), records.len())
    };

    hooks.on_cleanup(removed, remaining);
    removed
}
