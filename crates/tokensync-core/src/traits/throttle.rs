// # Throttle Trait
//
// The fixed delay the engine honours before each listing to respect the
// upstream rate limit.

use async_trait::async_trait;
use std::time::Duration;

/// Default delay between listings, in seconds
pub const DEFAULT_RATE_LIMIT_SECS: u64 = 12;

/// Trait for rate-limit strategies
#[async_trait]
pub trait Throttle: Send + Sync {
    /// Block until the next listing may be processed
    async fn wait(&self);
}

/// Sleeps for a fixed duration on every call
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    /// Create a fixed delay
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// The configured delay
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_RATE_LIMIT_SECS))
    }
}

#[async_trait]
impl Throttle for FixedDelay {
    async fn wait(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Never waits (tests, offline replays)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Throttle for NoDelay {
    async fn wait(&self) {}
}
