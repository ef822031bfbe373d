//! Frame clock trait driving the render loop.

use async_trait::async_trait;
use std::time::Duration;

/// Source of time for the render loop.
///
/// # Implementations
///
/// - **Production**: `TokioClock` - wraps `tokio::time`
/// - **Simulation**: `VirtualClock` (in `kinoview_sim`) - virtual time that
///   advances only when slept on
#[async_trait]
pub trait FrameClock: Send + Sync + 'static {
    /// Returns the monotonic time since the clock was created.
    fn now(&self) -> Duration;

    /// Suspends until `duration` has elapsed on this clock.
    ///
    /// In production this is a real sleep; in simulation it advances the
    /// virtual clock and returns immediately.
    async fn sleep(&self, duration: Duration);
}
