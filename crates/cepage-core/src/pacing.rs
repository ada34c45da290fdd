//! Self-imposed pacing between calls issued by one worker slot.
//!
//! Pacing is an injected strategy rather than a hard-coded delay, so the
//! policy is swappable and tests run without wall-clock sleeps.  This models
//! a blanket anti-throttling pause, not a token-bucket limiter on the
//! upstream service.

use std::time::Duration;

use async_trait::async_trait;

/// Strategy invoked by a worker after each completed call, before it accepts
/// the next item.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self);
}

/// Fixed minimum inter-call interval per worker slot.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }
}

#[async_trait]
impl Pacer for FixedDelay {
    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// No pacing at all.  The default for tests and for callers that rate-limit
/// elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPacing;

#[async_trait]
impl Pacer for NoPacing {
    async fn pause(&self) {}
}
