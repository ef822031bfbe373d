//! Kinoview Host Abstraction Layer
//!
//! This crate isolates everything the visualization engine needs from the
//! environment it runs in, so the same engine code runs inside a real viewer
//! (tokio clock, windowed surface) and inside the headless simulator
//! (virtual clock, in-memory surfaces).
//!
//! # What gets abstracted
//!
//! - Display surfaces (`DisplayHost::lookup`, `DisplayHost::viewport`)
//! - Time (`FrameClock::now`, `FrameClock::sleep`)
//!
//! # Example
//!
//! ```ignore
//! use kinoview_env::{DisplayHost, FrameClock, HeadlessHost, SurfaceId, Viewport};
//!
//! let host = HeadlessHost::new();
//! host.register(SurfaceId::new("robot-visualization-container"), Viewport::new(800, 600));
//!
//! async fn frame_loop<C: FrameClock>(clock: &C) {
//!     loop {
//!         clock.sleep(std::time::Duration::from_millis(16)).await;
//!         tick();
//!     }
//! }
//! ```

mod clock;
mod error;
mod headless;
mod surface;
mod tokio_impl;
mod types;

pub use clock::FrameClock;
pub use error::HostError;
pub use headless::HeadlessHost;
pub use surface::{DisplayHost, SurfaceHandle};
pub use tokio_impl::TokioClock;
pub use types::{SurfaceId, Viewport};
