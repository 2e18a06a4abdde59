use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rlimit::{RateLimitConfig, RateLimitHooks, RateLimiter};

#[derive(Default)]
struct SweepCounter {
    sweeps: AtomicUsize,
    removed: AtomicUsize,
}

impl RateLimitHooks for SweepCounter {
    fn on_cleanup(&self, removed: usize, _remaining: usize) {
        self.sweeps.fetch_add(1, Ordering::SeqCst);
        self.removed.fetch_add(removed, Ordering::SeqCst);
    }
}

fn short_lived_config() -> RateLimitConfig {
    RateLimitConfig::new(1, Duration::from_millis(20))
        .with_cleanup_interval(Duration::from_millis(10))
}

#[tokio::test]
async fn background_sweep_removes_expired_windows() {
    let hooks = Arc::new(SweepCounter::default());
    let limiter = RateLimiter::new(short_lived_config())
        .expect("valid config")
        .with_hooks(hooks.clone());

    limiter.check_limit("user-A");
    limiter.check_limit("user-B");
    assert_eq!(limiter.tracked_keys(), 2);

    limiter.start_cleanup().expect("runtime is available");
    assert!(limiter.is_cleanup_running());

    tokio::time::sleep(Duration::from_millis(120)).await;

    assert_eq!(limiter.tracked_keys(), 0);
    assert!(hooks.sweeps.load(Ordering::SeqCst) >= 1);
    assert_eq!(hooks.removed.load(Ordering::SeqCst), 2);

    limiter.destroy();
}

#[tokio::test]
async fn starting_cleanup_twice_keeps_one_task() {
    let hooks = Arc::new(SweepCounter::default());
    let limiter = RateLimiter::new(
        RateLimitConfig::new(1, Duration::from_secs(60))
            .with_cleanup_interval(Duration::from_millis(25)),
    )
    .expect("valid config")
    .with_hooks(hooks.clone());

    limiter.start_cleanup().expect("first start");
    limiter.start_cleanup().expect("second start is a no-op");

    tokio::time::sleep(Duration::from_millis(110)).await;
    limiter.destroy();

    // One task ticking every 25ms fits at most four sweeps in 110ms.
    let sweeps = hooks.sweeps.load(Ordering::SeqCst);
    assert!((1..=4).contains(&sweeps), "unexpected sweep count {sweeps}");
}

#[tokio::test]
async fn destroy_stops_the_task_and_clears_state() {
    let hooks = Arc::new(SweepCounter::default());
    let limiter = RateLimiter::new(short_lived_config())
        .expect("valid config")
        .with_hooks(hooks.clone());

    limiter.check_limit("user-A");
    limiter.start_cleanup().expect("runtime is available");
    limiter.destroy();

    assert_eq!(limiter.tracked_keys(), 0);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!limiter.is_cleanup_running());

    let before = hooks.sweeps.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(hooks.sweeps.load(Ordering::SeqCst), before);

    assert!(!limiter.check_limit("user-A").is_exceeded);
}

#[tokio::test]
async fn cleanup_can_restart_after_destroy() {
    let limiter = RateLimiter::new(short_lived_config()).expect("valid config");

    limiter.start_cleanup().expect("first start");
    limiter.destroy();
    limiter.start_cleanup().expect("restart after destroy");
    assert!(limiter.is_cleanup_running());

    limiter.check_limit("user-A");
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(limiter.tracked_keys(), 0);

    drop(limiter);
}
