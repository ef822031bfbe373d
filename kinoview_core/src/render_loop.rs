//! Render loop scheduler.
//!
//! The loop does not own a timer. Whoever drives it (the dispatcher, a test,
//! the simulator) calls `tick` at its refresh rate; the loop decides whether
//! anything happens. Pose updates never go through here, so rendering and
//! kinematics stay decoupled.

use crate::camera::OrbitCamera;
use crate::config::Palette;
use crate::frames::FrameHierarchy;
use crate::links::LinkSegment;
use crate::render::{RenderFrame, SceneRenderer};
use kinoview_env::Viewport;
use tracing::{info, trace, warn};

/// Result of one `tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The loop is stopped; nothing was done
    Idle,
    /// One frame was drawn
    Rendered,
    /// The backend reported an error (logged)
    Failed,
}

/// Start/stop scheduler that draws exactly one frame per tick while running.
pub struct RenderLoop {
    renderer: Box<dyn SceneRenderer>,
    running: bool,
    ticks: u64,
    frames_rendered: u64,
    failures: u64,
}

impl std::fmt::Debug for RenderLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderLoop")
            .field("running", &self.running)
            .field("ticks", &self.ticks)
            .field("frames_rendered", &self.frames_rendered)
            .field("failures", &self.failures)
            .finish_non_exhaustive()
    }
}

impl RenderLoop {
    pub fn new(renderer: Box<dyn SceneRenderer>) -> Self {
        Self {
            renderer,
            running: false,
            ticks: 0,
            frames_rendered: 0,
            failures: 0,
        }
    }

    /// Starts the loop. Returns false if it was already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        info!("Render loop started");
        true
    }

    /// Stops the loop. Returns false if it was not running.
    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        info!(
            frames = self.frames_rendered,
            failures = self.failures,
            "Render loop stopped"
        );
        true
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.renderer.set_viewport(viewport);
    }

    /// Advances the camera (when damped) and draws the current scene once.
    pub fn tick(
        &mut self,
        camera: &mut OrbitCamera,
        frames: &FrameHierarchy,
        segments: &[LinkSegment],
        palette: &Palette,
    ) -> TickOutcome {
        if !self.running {
            return TickOutcome::Idle;
        }

        if camera.damping_enabled() {
            camera.update();
        }

        let frame = RenderFrame {
            index: self.ticks,
            segments,
            frames,
            anchor: frames.anchor_world(),
            camera: &*camera,
            palette,
        };
        self.ticks += 1;

        match self.renderer.render(&frame) {
            Ok(()) => {
                self.frames_rendered += 1;
                trace!(frame = frame.index, segments = segments.len(), "Rendered frame");
                TickOutcome::Rendered
            }
            Err(e) => {
                self.failures += 1;
                warn!(frame = frame.index, error = %e, "Renderer failed");
                TickOutcome::Failed
            }
        }
    }

    /// Ticks taken while running.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }
}
