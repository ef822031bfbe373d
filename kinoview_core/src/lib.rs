//! Kinoview Core - kinematic visualization engine for 6-joint manipulators
//!
//! Turns a stream of joint-angle vectors into a continuously rendered 3D arm:
//! 1. **Frames**: per-joint transforms from a fixed Denavit–Hartenberg table,
//!    chained from the base and fully recomputed on every update
//! 2. **Links**: cylinder segments regenerated between consecutive frame
//!    origins, with degenerate geometry resolved internally
//! 3. **View**: a damped orbit camera and a start/stop render loop that
//!    draws the current scene once per tick
//!
//! ```text
//!   EngineCommand ──► dispatcher::run_engine ◄── FrameClock::sleep
//!                           │
//!                           ▼
//!                   VisualizationEngine
//!        ┌──────────────┬───┴──────────┬──────────────┐
//!   FrameHierarchy  LinkSynthesizer  OrbitCamera   RenderLoop ──► SceneRenderer
//!        ▲
//!     DhTable
//! ```

pub mod camera;
pub mod config;
pub mod dh;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod frames;
pub mod links;
pub mod render;
pub mod render_loop;
pub mod units;

#[cfg(feature = "visualization")]
pub mod visualization;

// Re-export key types for convenience
pub use camera::{CameraConfig, OrbitCamera};
pub use config::{EngineConfig, Palette, RenderConfig, RobotConfig, Theme};
pub use dh::{dh_transform, DhTable, JointSpec, WristBias};
pub use dispatcher::{run_engine, DispatchSummary, EngineCommand, StopReason};
pub use engine::{EngineStats, SceneSnapshot, VisualizationEngine};
pub use error::{ConfigError, EngineError, RenderError};
pub use frames::{FrameHierarchy, FrameNode, FrameParent};
pub use links::{LinkKind, LinkSegment, LinkStyle, LinkSynthesizer};
pub use render::{RecordingRenderer, RenderFrame, SceneRenderer};
pub use render_loop::{RenderLoop, TickOutcome};
