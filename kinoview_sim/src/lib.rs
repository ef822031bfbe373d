//! Kinoview headless scenario harness
//!
//! Drives a [`VisualizationEngine`](kinoview_core::VisualizationEngine)
//! through its command dispatcher on a virtual clock, with no display
//! attached. Every scenario is a scripted stream of poses, resizes and
//! camera moves; after each step the runner snapshots the scene and checks
//! it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   ScenarioRunner                     │
//! │                                                      │
//! │   Driver ──EngineCommand──► run_engine(engine)       │
//! │     ▲          (mpsc)            │                   │
//! │     └──────replies (oneshot)─────┘                   │
//! │                                                      │
//! │   SimContext: virtual clock + seeded ChaCha8 RNG     │
//! │   HeadlessHost: in-memory display surfaces           │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use kinoview_sim::{ScenarioId, ScenarioRunner};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::Home).unwrap();
//! assert!(result.passed);
//! ```

mod context;
mod error;
mod exporter;
mod runner;
pub mod scenarios;

pub use context::SimContext;
pub use error::ScenarioError;
pub use exporter::{ExportFrame, ExportSegment, SceneExport};
pub use runner::{ScenarioResult, ScenarioRunner};
pub use scenarios::{ScenarioId, Step};
