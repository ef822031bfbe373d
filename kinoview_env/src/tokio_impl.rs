//! Production implementation of FrameClock using Tokio.

use crate::FrameClock;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// Production clock backed by `tokio::time`.
pub struct TokioClock {
    /// Start time for monotonic duration calculations
    start: Instant,
}

impl TokioClock {
    /// Creates a new TokioClock.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameClock for TokioClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tokio_clock_time() {
        let clock = TokioClock::new();
        let t1 = clock.now();
        clock.sleep(Duration::from_millis(10)).await;
        let t2 = clock.now();

        assert!(t2 > t1);
        assert!(t2 - t1 >= Duration::from_millis(10));
    }
}
