//! Process-wide throttle for outbound HTTP calls
//!
//! Third-party APIs (distributor index, swap aggregator) enforce request
//! quotas. Every off-chain call passes through one shared [`Throttle`] that
//! spaces calls by a minimum interval. The throttle is an explicit injected
//! object rather than a global so tests can run it under tokio's paused
//! clock.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Gates outbound calls to at most one per `min_interval`.
///
/// Clones share the same gate; the lock is held across the wait so callers
/// are serialized in arrival order.
#[derive(Clone)]
pub struct Throttle {
    min_interval: Duration,
    last_call: Arc<Mutex<Option<Instant>>>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Arc::new(Mutex::new(None)),
        }
    }

    /// Wait until the minimum interval since the previous call has elapsed,
    /// then record this call's timestamp.
    pub async fn acquire(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(last) = *last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_call_is_immediate() {
        let throttle = Throttle::new(Duration::from_millis(300));
        let start = Instant::now();
        throttle.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaces_consecutive_calls() {
        let throttle = Throttle::new(Duration::from_millis(300));
        let start = Instant::now();

        throttle.acquire().await;
        throttle.acquire().await;
        throttle.acquire().await;

        // Two enforced gaps of 300ms each.
        assert!(start.elapsed() >= Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clones_share_the_gate() {
        let throttle = Throttle::new(Duration::from_millis(300));
        let clone = throttle.clone();
        let start = Instant::now();

        throttle.acquire().await;
        clone.acquire().await;

        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_interval_passed() {
        let throttle = Throttle::new(Duration::from_millis(300));
        throttle.acquire().await;
        sleep(Duration::from_millis(500)).await;

        let before = Instant::now();
        throttle.acquire().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }
}
