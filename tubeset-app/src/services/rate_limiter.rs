//! Minimum-interval request spacing shared by the platform clients
//!
//! One limiter sits inside `PlatformHttp`, so playlist pages, watch pages and
//! thumbnails all draw from the same schedule.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Hands out request slots at least `min_interval` apart
#[derive(Debug)]
pub struct RateLimiter {
    /// Earliest instant the next request may go out
    next_slot: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            next_slot: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Limiter for `request_interval_ms`, ready to share between clients
    pub fn shared(request_interval_ms: u64) -> Arc<Self> {
        Arc::new(Self::new(request_interval_ms))
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Sleep until this caller's slot and reserve the following one
    ///
    /// Returns how long the caller was held back. Callers queue on the lock,
    /// so slots are granted in arrival order.
    pub async fn wait(&self) -> Duration {
        let mut next_slot = self.next_slot.lock().await;

        let now = Instant::now();
        let held = match *next_slot {
            Some(slot) if slot > now => {
                tokio::time::sleep_until(slot).await;
                slot - now
            }
            _ => Duration::ZERO,
        };

        *next_slot = Some(Instant::now() + self.min_interval);
        held
    }
}
