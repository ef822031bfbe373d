//! The visualization engine: pose update pipeline plus everything it feeds.
//!
//! ```text
//! update_pose(angles)
//!     │ validate (length, finiteness)          ── InvalidInput, nothing touched
//!     ▼
//! FrameHierarchy::update_pose                   local = DH(spec, angle)
//!     │                                         world = parent.world · local
//!     ▼
//! LinkSynthesizer::rebuild(world_points)        old segments dropped first
//!     ▼
//! scene state ──► RenderLoop::tick ──► SceneRenderer::render
//! ```
//!
//! The engine is a plain owned value. Callers construct it explicitly and
//! either drive it by hand or hand it to `dispatcher::run_engine`.

use crate::camera::OrbitCamera;
use crate::config::{EngineConfig, Palette, Theme};
use crate::error::EngineError;
use crate::frames::FrameHierarchy;
use crate::links::{LinkSegment, LinkSynthesizer};
use crate::render::SceneRenderer;
use crate::render_loop::{RenderLoop, TickOutcome};
use kinoview_env::{DisplayHost, HostError, SurfaceHandle, SurfaceId, Viewport};
use nalgebra::Point3;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Counters kept across the engine's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub updates_applied: u64,
    pub updates_rejected: u64,
    pub resizes: u64,
}

/// Owned copy of the scene after an update, for export and invariant checks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneSnapshot {
    /// Number of accepted pose updates so far
    pub update: u64,
    pub frame_origins: Vec<Point3<f64>>,
    pub anchor: Point3<f64>,
    pub segments: Vec<LinkSegment>,
    /// Pairs skipped as zero-length by the last rebuild
    pub skipped_links: usize,
    /// Largest deviation from the chain composition law
    pub composition_residual: f64,
    pub camera_eye: Point3<f64>,
    pub aspect: f64,
}

pub struct VisualizationEngine {
    host: Arc<dyn DisplayHost>,
    surface: SurfaceHandle,
    viewport: Viewport,
    config: EngineConfig,

    frames: FrameHierarchy,
    links: LinkSynthesizer,
    camera: OrbitCamera,
    render_loop: RenderLoop,

    theme: Theme,
    palette: Palette,
    stats: EngineStats,
}

impl std::fmt::Debug for VisualizationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisualizationEngine")
            .field("surface", &self.surface)
            .field("viewport", &self.viewport)
            .field("joints", &self.frames.len())
            .field("segments", &self.links.segments().len())
            .field("render_loop", &self.render_loop)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl VisualizationEngine {
    /// Binds the engine to a display surface and builds the initial scene.
    ///
    /// Fails with `InitializationError` if the surface does not exist,
    /// reports an empty viewport, or the configuration is invalid.
    pub fn new(
        host: Arc<dyn DisplayHost>,
        surface_id: &SurfaceId,
        config: EngineConfig,
        renderer: Box<dyn SceneRenderer>,
    ) -> Result<Self, EngineError> {
        config
            .validate()
            .map_err(|e| EngineError::initialization(e.to_string()))?;

        let surface = host.lookup(surface_id)?;
        let viewport = host.viewport(&surface)?;
        if viewport.is_empty() {
            return Err(HostError::InvalidViewport {
                surface: surface_id.to_string(),
                width: viewport.width,
                height: viewport.height,
            }
            .into());
        }

        let table = config
            .robot
            .dh_table()
            .map_err(|e| EngineError::initialization(e.to_string()))?;
        let joint_count = table.len();
        let frames = FrameHierarchy::new(table, config.robot.base_transform(), config.robot.anchor());
        let links = LinkSynthesizer::new(config.links);
        let camera = OrbitCamera::new(config.effective_camera(), viewport);

        let mut render_loop = RenderLoop::new(renderer);
        render_loop.set_viewport(viewport);

        let theme = config.theme;
        let initial_pose = config.initial_pose_for(joint_count);

        let mut engine = Self {
            host,
            surface,
            viewport,
            config,
            frames,
            links,
            camera,
            render_loop,
            theme,
            palette: Palette::for_theme(theme),
            stats: EngineStats::default(),
        };
        engine.update_pose(&initial_pose)?;

        info!(
            surface = %surface_id,
            width = viewport.width,
            height = viewport.height,
            joints = joint_count,
            "Visualization engine initialized"
        );
        Ok(engine)
    }

    /// Applies a joint-angle vector (radians) and regenerates the links.
    ///
    /// On `InvalidInput` the previous frames and segments stay as they were.
    pub fn update_pose(&mut self, angles: &[f64]) -> Result<(), EngineError> {
        if let Err(e) = self.frames.update_pose(angles) {
            self.stats.updates_rejected += 1;
            warn!(error = %e, "Rejected pose update");
            return Err(e);
        }

        let points = self.frames.world_points();
        let segments = self.links.rebuild(&points).len();
        self.stats.updates_applied += 1;

        debug!(
            segments,
            skipped = self.links.skipped(),
            generation = self.links.generation(),
            "Pose applied"
        );
        Ok(())
    }

    /// Re-reads the surface size and updates camera aspect and renderer.
    ///
    /// Kinematic state is not touched.
    pub fn resize(&mut self) -> Result<Viewport, EngineError> {
        let viewport = self.host.viewport(&self.surface)?;

        self.viewport = viewport;
        self.camera.resize(viewport);
        self.render_loop.set_viewport(viewport);
        self.stats.resizes += 1;

        debug!(width = viewport.width, height = viewport.height, aspect = self.camera.aspect(), "Resized");
        Ok(viewport)
    }

    /// Switches theme and resolves its palette.
    pub fn set_theme(&mut self, theme: Theme) {
        if theme != self.theme {
            self.theme = theme;
            self.palette = Palette::for_theme(theme);
            debug!(?theme, "Theme changed");
        }
    }

    pub fn start(&mut self) -> bool {
        self.render_loop.start()
    }

    pub fn stop(&mut self) -> bool {
        self.render_loop.stop()
    }

    pub fn is_running(&self) -> bool {
        self.render_loop.is_running()
    }

    /// One render-loop tick against the current scene.
    pub fn tick(&mut self) -> TickOutcome {
        self.render_loop
            .tick(&mut self.camera, &self.frames, self.links.segments(), &self.palette)
    }

    pub fn frames(&self) -> &FrameHierarchy {
        &self.frames
    }

    /// Current link segments.
    pub fn links(&self) -> &[LinkSegment] {
        self.links.segments()
    }

    pub fn link_synthesizer(&self) -> &LinkSynthesizer {
        &self.links
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    /// Mutable camera access for orbit/zoom input.
    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.render_loop
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn surface(&self) -> &SurfaceHandle {
        &self.surface
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            update: self.stats.updates_applied,
            frame_origins: self.frames.nodes().iter().map(|n| n.world_origin()).collect(),
            anchor: self.frames.anchor_world(),
            segments: self.links.segments().to_vec(),
            skipped_links: self.links.skipped(),
            composition_residual: self.frames.composition_residual(),
            camera_eye: self.camera.eye(),
            aspect: self.camera.aspect(),
        }
    }
}
