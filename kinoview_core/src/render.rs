//! Renderer seam.
//!
//! The engine hands a borrowed snapshot of its scene to a `SceneRenderer`
//! once per render tick. Backends never mutate engine state.

use crate::camera::OrbitCamera;
use crate::config::Palette;
use crate::error::RenderError;
use crate::frames::FrameHierarchy;
use crate::links::LinkSegment;
use kinoview_env::Viewport;
use nalgebra::Point3;
use std::sync::{Arc, Mutex};

/// Borrowed view of everything needed to draw one frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderFrame<'a> {
    /// Sequence number of this frame (0-based)
    pub index: u64,
    pub segments: &'a [LinkSegment],
    pub frames: &'a FrameHierarchy,
    /// End-effector anchor in world coordinates
    pub anchor: Point3<f64>,
    pub camera: &'a OrbitCamera,
    pub palette: &'a Palette,
}

/// A drawing backend.
pub trait SceneRenderer: Send {
    /// Resizes the drawing buffer.
    fn set_viewport(&mut self, viewport: Viewport);

    /// Draws one frame.
    fn render(&mut self, frame: &RenderFrame<'_>) -> Result<(), RenderError>;
}

/// What a `RecordingRenderer` has seen so far.
#[derive(Debug, Clone, Default)]
pub struct RenderLog {
    pub frames_rendered: u64,
    pub failures: u64,
    pub viewport: Option<Viewport>,

    /// Backing buffer size in physical pixels
    pub buffer_size: Option<(u32, u32)>,

    pub last_segments: Vec<LinkSegment>,
    pub last_anchor: Option<Point3<f64>>,
    pub last_eye: Option<Point3<f64>>,

    /// The anchor in normalized device coordinates
    pub last_anchor_ndc: Option<Point3<f64>>,

    pub last_palette: Option<Palette>,
}

/// Headless renderer that records frames in memory.
///
/// The log is shared, so a caller can keep a `handle()` after the renderer
/// has been boxed into an engine.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    log: Arc<Mutex<RenderLog>>,
    fail: bool,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A renderer whose every `render` call fails (the log still counts them).
    pub fn failing() -> Self {
        Self {
            log: Arc::default(),
            fail: true,
        }
    }

    pub fn handle(&self) -> Arc<Mutex<RenderLog>> {
        Arc::clone(&self.log)
    }

    /// Copy of the current log.
    pub fn snapshot(&self) -> RenderLog {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl SceneRenderer for RecordingRenderer {
    fn set_viewport(&mut self, viewport: Viewport) {
        let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        log.viewport = Some(viewport);
        log.buffer_size = Some(viewport.physical_size());
    }

    fn render(&mut self, frame: &RenderFrame<'_>) -> Result<(), RenderError> {
        let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        if self.fail {
            log.failures += 1;
            return Err(RenderError::backend(format!("frame {} rejected", frame.index)));
        }

        log.frames_rendered += 1;
        log.last_segments.clear();
        log.last_segments.extend_from_slice(frame.segments);
        log.last_anchor = Some(frame.anchor);
        log.last_eye = Some(frame.camera.eye());
        log.last_anchor_ndc = Some(frame.camera.view_projection().transform_point(&frame.anchor));
        log.last_palette = Some(*frame.palette);
        Ok(())
    }
}
